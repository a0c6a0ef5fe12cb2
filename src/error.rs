//! Error types for the record store and the note service.

use thiserror::Error;

/// Failures of the flat-file record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed collection {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("collection lock poisoned: {0}")]
    Poisoned(&'static str),
}

impl StoreError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn json(path: &std::path::Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Errors surfaced by note and user operations.
#[derive(Debug, Error)]
pub enum NotesError {
    #[error("{0}")]
    Conflict(String),
    #[error("Invalid credentials")]
    Unauthorized,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
    #[error("attachment failure: {0}")]
    Attachment(#[source] std::io::Error),
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

impl NotesError {
    pub fn note_not_found() -> Self {
        Self::NotFound("Note not found".to_string())
    }

    pub fn user_not_found() -> Self {
        Self::NotFound("User not found".to_string())
    }

    /// True for errors caused by the caller rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Conflict(_) | Self::Unauthorized | Self::NotFound(_) | Self::Validation(_)
        )
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
pub type NotesResult<T> = Result<T, NotesError>;
