//! HTTP routes for accounts and notes.

use super::AppState;
use crate::api::{
    AddNoteResponse, EditNoteRequest, HealthResponse, LoginRequest, LoginResponse,
    MessageResponse, SignupRequest,
};
use crate::error::{NotesError, NotesResult};
use crate::models::Note;
use crate::service::{NewNote, NotesService, Upload};
use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use secrecy::SecretString;

/// Create the API routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/signup", post(signup_handler))
        .route("/login", post(login_handler))
        .route("/addNote", post(add_note_handler))
        .route("/notes", get(list_all_notes_handler))
        .route("/notes/{username}", get(list_notes_handler))
        .route("/editNote/{username}/{id}", put(edit_note_handler))
        .route("/deleteNote/{username}/{id}", delete(delete_note_handler))
}

/// Failure of a request, rendered as a status code and a JSON message
#[derive(Debug)]
pub enum ApiError {
    Notes(NotesError),
    Rejected(StatusCode, String),
    Internal(String),
}

impl From<NotesError> for ApiError {
    fn from(e: NotesError) -> Self {
        Self::Notes(e)
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        Self::Rejected(e.status(), e.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Notes(e) => {
                let status = match &e {
                    NotesError::Conflict(_) => StatusCode::CONFLICT,
                    NotesError::Unauthorized => StatusCode::UNAUTHORIZED,
                    NotesError::NotFound(_) => StatusCode::NOT_FOUND,
                    NotesError::Validation(_) => StatusCode::BAD_REQUEST,
                    NotesError::Storage(_) | NotesError::Attachment(_) | NotesError::Hashing(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                if e.is_client_error() {
                    (status, e.to_string())
                } else {
                    tracing::error!("request failed: {}", e);
                    (status, "Internal server error".to_string())
                }
            }
            ApiError::Rejected(status, message) => (status, message),
            ApiError::Internal(detail) => {
                tracing::error!("request failed: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(MessageResponse::error(&message))).into_response()
    }
}

/// Run a store operation off the async workers
async fn blocking<T, F>(state: &AppState, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&NotesService) -> NotesResult<T> + Send + 'static,
{
    let service = state.service.clone();
    tokio::task::spawn_blocking(move || op(&service))
        .await
        .map_err(|e| ApiError::Internal(format!("worker task failed: {}", e)))?
        .map_err(ApiError::from)
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    let stats = blocking(&state, |service| service.stats()).await?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        users: stats.users,
        notes: stats.notes,
    }))
}

/// POST /signup
async fn signup_handler(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let password = SecretString::from(request.password);
    blocking(&state, move |service| {
        service.signup(&request.username, &request.email, &password)
    })
    .await?;
    Ok(Json(MessageResponse::ok("User registered successfully!")))
}

/// POST /login
async fn login_handler(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let password = SecretString::from(request.password);
    let credential = request.credential;
    let username = blocking(&state, move |service| service.login(&credential, &password)).await?;
    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful".to_string(),
        username,
    }))
}

/// POST /addNote (multipart: username, title, content, optional file)
async fn add_note_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AddNoteResponse>, ApiError> {
    let mut new = NewNote::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "username" => new.username = field.text().await?,
            "title" => new.title = field.text().await?,
            "content" => new.content = field.text().await?,
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                // Browsers send an empty, unnamed part when no file is picked
                if !file_name.is_empty() {
                    new.attachment = Some(Upload {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            other => tracing::debug!("ignoring multipart field {:?}", other),
        }
    }

    let note = blocking(&state, move |service| service.add_note(new)).await?;
    Ok(Json(AddNoteResponse {
        success: true,
        message: "Note added!".to_string(),
        note,
    }))
}

/// GET /notes - every note
async fn list_all_notes_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Note>>, ApiError> {
    let notes = blocking(&state, |service| service.list_notes(None)).await?;
    Ok(Json(notes))
}

/// GET /notes/{username}
async fn list_notes_handler(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<Note>>, ApiError> {
    let notes = blocking(&state, move |service| service.list_notes(Some(&username))).await?;
    Ok(Json(notes))
}

/// PUT /editNote/{username}/{id}
async fn edit_note_handler(
    State(state): State<AppState>,
    Path((username, id)): Path<(String, String)>,
    Json(request): Json<EditNoteRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    blocking(&state, move |service| {
        service.edit_note(&username, &id, &request.title, &request.content)
    })
    .await?;
    Ok(Json(MessageResponse::ok("Note updated!")))
}

/// DELETE /deleteNote/{username}/{id}
async fn delete_note_handler(
    State(state): State<AppState>,
    Path((username, id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    blocking(&state, move |service| service.delete_note(&username, &id)).await?;
    Ok(Json(MessageResponse::ok("Note deleted!")))
}
