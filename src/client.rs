//! HTTP client for the notes server.

use crate::api::{
    AddNoteResponse, EditNoteRequest, HealthResponse, LoginRequest, LoginResponse,
    MessageResponse, SignupRequest,
};
use crate::models::Note;
use anyhow::{anyhow, Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use std::path::Path;
use thiserror::Error;

/// A request the server answered with a non-success status
#[derive(Debug, Error)]
#[error("{message} (HTTP {status})")]
pub struct ApiFailure {
    pub status: u16,
    pub message: String,
}

pub struct NotesClient {
    base_url: Url,
    http: reqwest::Client,
}

impl NotesClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("Invalid server URL: {}", base_url))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("Server URL cannot be a base: {}", base_url));
        }
        Ok(Self {
            base_url,
            http: reqwest::Client::new(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL, percent-encoding each path segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("Server URL cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Register an account; returns the server's message
    pub async fn signup(&self, username: &str, email: &str, password: &str) -> Result<String> {
        let body = SignupRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self
            .http
            .post(self.endpoint(&["signup"])?)
            .json(&body)
            .send()
            .await
            .context("Signup request failed")?;
        let reply: MessageResponse = decode(response).await?;
        Ok(reply.message)
    }

    /// Log in by email; returns the account's username
    pub async fn login(&self, credential: &str, password: &str) -> Result<String> {
        let body = LoginRequest {
            credential: credential.to_string(),
            password: password.to_string(),
        };
        let response = self
            .http
            .post(self.endpoint(&["login"])?)
            .json(&body)
            .send()
            .await
            .context("Login request failed")?;
        let reply: LoginResponse = decode(response).await?;
        Ok(reply.username)
    }

    pub async fn add_note(
        &self,
        username: &str,
        title: &str,
        content: &str,
        attachment: Option<&Path>,
    ) -> Result<Note> {
        let mut form = Form::new()
            .text("username", username.to_string())
            .text("title", title.to_string())
            .text("content", content.to_string());

        if let Some(path) = attachment {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read attachment {}", path.display()))?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "attachment".to_string());
            form = form.part("file", Part::bytes(bytes).file_name(file_name));
        }

        let response = self
            .http
            .post(self.endpoint(&["addNote"])?)
            .multipart(form)
            .send()
            .await
            .context("Add note request failed")?;
        let reply: AddNoteResponse = decode(response).await?;
        Ok(reply.note)
    }

    /// Notes of one user, or all notes when `username` is `None`
    pub async fn list_notes(&self, username: Option<&str>) -> Result<Vec<Note>> {
        let url = match username {
            Some(username) => self.endpoint(&["notes", username])?,
            None => self.endpoint(&["notes"])?,
        };
        let response = self
            .http
            .get(url)
            .send()
            .await
            .context("List notes request failed")?;
        decode(response).await
    }

    pub async fn edit_note(
        &self,
        username: &str,
        id: &str,
        title: &str,
        content: &str,
    ) -> Result<String> {
        let body = EditNoteRequest {
            title: title.to_string(),
            content: content.to_string(),
        };
        let response = self
            .http
            .put(self.endpoint(&["editNote", username, id])?)
            .json(&body)
            .send()
            .await
            .context("Edit note request failed")?;
        let reply: MessageResponse = decode(response).await?;
        Ok(reply.message)
    }

    pub async fn delete_note(&self, username: &str, id: &str) -> Result<String> {
        let response = self
            .http
            .delete(self.endpoint(&["deleteNote", username, id])?)
            .send()
            .await
            .context("Delete note request failed")?;
        let reply: MessageResponse = decode(response).await?;
        Ok(reply.message)
    }

    /// Fetch a stored attachment's bytes
    pub async fn download(&self, filename: &str) -> Result<Vec<u8>> {
        let response = self
            .http
            .get(self.endpoint(&["uploads", filename])?)
            .send()
            .await
            .context("Download request failed")?;
        let response = check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self
            .http
            .get(self.endpoint(&["health"])?)
            .send()
            .await
            .context("Health request failed")?;
        decode(response).await
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<MessageResponse>(&text) {
        Ok(reply) => reply.message,
        Err(_) if text.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string(),
        Err(_) => text,
    };

    Err(ApiFailure {
        status: status.as_u16(),
        message,
    }
    .into())
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = check_status(response).await?;
    response
        .json::<T>()
        .await
        .context("Unexpected response from server")
}
