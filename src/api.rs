//! JSON bodies exchanged between the server and its clients.

use crate::models::Note;
use serde::{Deserialize, Serialize};

/// POST /signup
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// POST /login. Older clients send the credential as `email`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default, alias = "email")]
    pub credential: String,
    #[serde(default)]
    pub password: String,
}

/// PUT /editNote/{username}/{id}
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EditNoteRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// Generic success/failure envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            success: false,
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddNoteResponse {
    pub success: bool,
    pub message: String,
    pub note: Note,
}

/// GET /health
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub users: usize,
    pub notes: usize,
}
