//! cloudnotes - a small note-taking service
//!
//! This library provides the flat-file record store, the account and
//! note operations built on it, the HTTP server, and the client used by
//! the `cloudnotes` CLI.

pub mod api;
pub mod attachments;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod password;
pub mod server;
pub mod service;
pub mod session;
pub mod store;

pub use error::{NotesError, StoreError};
pub use service::NotesService;
