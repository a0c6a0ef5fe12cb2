//! Attachment files, stored flat in one upload directory as
//! `{millis}-{original name}`.

use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

const MAX_NAME_ATTEMPTS: i64 = 1000;

#[derive(Debug, Clone)]
pub struct AttachmentStore {
    dir: PathBuf,
}

impl AttachmentStore {
    /// Open the upload directory, creating it if needed
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write an upload and return its stored filename
    pub fn store(&self, original_name: &str, bytes: &[u8]) -> io::Result<String> {
        let clean = sanitize_file_name(original_name);
        let base = Utc::now().timestamp_millis();

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let filename = format!("{}-{}", base + attempt, clean);
            let path = self.dir.join(&filename);
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            };

            if let Err(e) = file.write_all(bytes).and_then(|_| file.sync_all()) {
                let _ = fs::remove_file(&path);
                return Err(e);
            }

            tracing::info!("stored attachment {} ({} bytes)", filename, bytes.len());
            return Ok(filename);
        }

        Err(io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free attachment name for {}", clean),
        ))
    }

    /// Resolve a stored filename to its path. Names that could escape the
    /// upload directory resolve to nothing.
    pub fn path(&self, filename: &str) -> Option<PathBuf> {
        if filename.is_empty() || sanitize_file_name(filename) != filename {
            return None;
        }
        Some(self.dir.join(filename))
    }

    /// Delete a stored file. Missing files are not an error.
    pub fn remove(&self, filename: &str) -> bool {
        let Some(path) = self.path(filename) else {
            tracing::warn!("refusing to remove attachment with unsafe name {:?}", filename);
            return false;
        };

        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::info!("removed attachment {}", filename);
                true
            }
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                tracing::warn!("failed to remove attachment {}: {}", path.display(), e);
                false
            }
        }
    }
}

/// Reduce a client-supplied filename to a safe single path component
pub fn sanitize_file_name(name: &str) -> String {
    let last = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = last
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "attachment".to_string()
    } else {
        cleaned
    }
}
