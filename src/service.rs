//! User and note operations over the record store.
//!
//! Each operation is one load -> mutate -> save cycle. Nothing is cached
//! between calls.

use crate::attachments::AttachmentStore;
use crate::error::{NotesError, NotesResult};
use crate::models::{next_note_id, now_display_date, Note, User};
use crate::password::{hash_password, verify_password};
use crate::store::{Collection, JsonStore};
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use std::path::Path;
use std::sync::Arc;

/// An uploaded file as received from the client
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Input to `add_note`
#[derive(Debug, Clone, Default)]
pub struct NewNote {
    pub username: String,
    pub title: String,
    pub content: String,
    pub attachment: Option<Upload>,
}

/// Record counts reported by the health endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub users: usize,
    pub notes: usize,
}

#[derive(Debug, Clone)]
pub struct NotesService {
    store: Arc<JsonStore>,
    attachments: AttachmentStore,
}

impl NotesService {
    pub fn new(store: JsonStore, attachments: AttachmentStore) -> Self {
        Self {
            store: Arc::new(store),
            attachments,
        }
    }

    /// Open the data and upload directories, initializing them if empty
    pub fn open(data_dir: &Path, upload_dir: &Path) -> NotesResult<Self> {
        let store = JsonStore::open(data_dir)?;
        let attachments = AttachmentStore::open(upload_dir).map_err(NotesError::Attachment)?;
        Ok(Self::new(store, attachments))
    }

    pub fn attachments(&self) -> &AttachmentStore {
        &self.attachments
    }

    /// Directory holding the JSON collections
    pub fn data_dir(&self) -> &Path {
        self.store.dir()
    }

    /// Register an account. Fields are stored exactly as given.
    pub fn signup(&self, username: &str, email: &str, password: &SecretString) -> NotesResult<()> {
        if username.is_empty() || email.is_empty() {
            return Err(NotesError::Validation("Missing fields".to_string()));
        }
        if password.expose_secret().is_empty() {
            return Err(NotesError::Validation("Missing fields".to_string()));
        }

        let password_hash = hash_password(password)?;

        self.store
            .update(Collection::Users, |users: &mut Vec<User>| {
                if users.iter().any(|u| u.username == username) {
                    return Err(NotesError::Conflict("Username already exists".to_string()));
                }
                if users.iter().any(|u| u.email.eq_ignore_ascii_case(email)) {
                    return Err(NotesError::Conflict("User already exists".to_string()));
                }
                users.push(User {
                    username: username.to_string(),
                    email: email.to_string(),
                    password_hash,
                });
                Ok(())
            })?;

        tracing::info!("registered user {}", username);
        Ok(())
    }

    /// Authenticate by exact email match; returns the account's username
    pub fn login(&self, credential: &str, password: &SecretString) -> NotesResult<String> {
        let users: Vec<User> = self.store.load(Collection::Users)?;

        users
            .into_iter()
            .find(|u| {
                u.email == credential && verify_password(password, &u.password_hash)
            })
            .map(|u| u.username)
            .ok_or(NotesError::Unauthorized)
    }

    pub fn add_note(&self, new: NewNote) -> NotesResult<Note> {
        if new.username.is_empty() || new.title.is_empty() || new.content.is_empty() {
            return Err(NotesError::Validation("Missing fields".to_string()));
        }

        let users: Vec<User> = self.store.load(Collection::Users)?;
        if !users.iter().any(|u| u.username == new.username) {
            return Err(NotesError::user_not_found());
        }

        let file = match &new.attachment {
            Some(upload) => Some(
                self.attachments
                    .store(&upload.file_name, &upload.bytes)
                    .map_err(NotesError::Attachment)?,
            ),
            None => None,
        };

        let result = self.store.update(Collection::Notes, |notes: &mut Vec<Note>| {
            let note = Note {
                id: next_note_id(notes, Utc::now()),
                username: new.username.clone(),
                title: new.title.clone(),
                content: new.content.clone(),
                date: now_display_date(),
                file: file.clone(),
            };
            notes.push(note.clone());
            Ok::<_, NotesError>(note)
        });

        match result {
            Ok(note) => {
                tracing::info!("added note {} for {}", note.id, note.username);
                Ok(note)
            }
            Err(e) => {
                if let Some(file) = &file {
                    self.attachments.remove(file);
                }
                Err(e)
            }
        }
    }

    /// Notes of one user in insertion order, or every note when `username` is `None`
    pub fn list_notes(&self, username: Option<&str>) -> NotesResult<Vec<Note>> {
        let notes: Vec<Note> = self.store.load(Collection::Notes)?;
        Ok(match username {
            Some(username) => notes
                .into_iter()
                .filter(|n| n.username == username)
                .collect(),
            None => notes,
        })
    }

    /// Replace title and content and refresh the date; id and file are kept
    pub fn edit_note(
        &self,
        username: &str,
        id: &str,
        title: &str,
        content: &str,
    ) -> NotesResult<Note> {
        let note = self
            .store
            .update(Collection::Notes, |notes: &mut Vec<Note>| {
                let note = notes
                    .iter_mut()
                    .find(|n| n.belongs_to(username, id))
                    .ok_or_else(NotesError::note_not_found)?;
                note.title = title.to_string();
                note.content = content.to_string();
                note.date = now_display_date();
                Ok::<_, NotesError>(note.clone())
            })?;

        tracing::info!("edited note {} for {}", id, username);
        Ok(note)
    }

    /// Remove a note, then its attachment (best effort)
    pub fn delete_note(&self, username: &str, id: &str) -> NotesResult<Note> {
        let removed = self
            .store
            .update(Collection::Notes, |notes: &mut Vec<Note>| {
                let index = notes
                    .iter()
                    .position(|n| n.belongs_to(username, id))
                    .ok_or_else(NotesError::note_not_found)?;
                Ok::<_, NotesError>(notes.remove(index))
            })?;

        if let Some(file) = &removed.file {
            self.attachments.remove(file);
        }

        tracing::info!("deleted note {} for {}", id, username);
        Ok(removed)
    }

    pub fn stats(&self) -> NotesResult<StoreStats> {
        let users: Vec<User> = self.store.load(Collection::Users)?;
        let notes: Vec<Note> = self.store.load(Collection::Notes)?;
        Ok(StoreStats {
            users: users.len(),
            notes: notes.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    fn service() -> (TempDir, NotesService) {
        let dir = tempdir().unwrap();
        let service =
            NotesService::open(&dir.path().join("db"), &dir.path().join("uploads")).unwrap();
        (dir, service)
    }

    fn with_alice() -> (TempDir, NotesService) {
        let (dir, service) = service();
        service
            .signup("alice", "alice@x.com", &secret("pw1"))
            .unwrap();
        (dir, service)
    }

    fn new_note(username: &str, title: &str, content: &str) -> NewNote {
        NewNote {
            username: username.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            attachment: None,
        }
    }

    fn notes_file(dir: &TempDir) -> String {
        fs::read_to_string(dir.path().join("db").join("notes.json")).unwrap()
    }

    #[test]
    fn test_signup_twice_conflicts() {
        let (_dir, service) = with_alice();

        let again = service.signup("alice", "alice@x.com", &secret("pw1"));
        assert!(matches!(again, Err(NotesError::Conflict(_))));

        let same_email = service.signup("alice2", "ALICE@x.com", &secret("pw1"));
        assert!(matches!(same_email, Err(NotesError::Conflict(_))));

        assert_eq!(service.stats().unwrap().users, 1);
    }

    #[test]
    fn test_signup_requires_fields() {
        let (_dir, service) = service();
        let result = service.signup("", "a@x.com", &secret("pw"));
        assert!(matches!(result, Err(NotesError::Validation(_))));
        let result = service.signup("a", "a@x.com", &secret(""));
        assert!(matches!(result, Err(NotesError::Validation(_))));
    }

    #[test]
    fn test_signup_does_not_store_plain_password() {
        let (dir, _service) = with_alice();
        let users = fs::read_to_string(dir.path().join("db").join("users.json")).unwrap();
        assert!(!users.contains("\"pw1\""));
        assert!(users.contains("$argon2"));
    }

    #[test]
    fn test_login_requires_exact_match() {
        let (_dir, service) = with_alice();

        assert_eq!(service.login("alice@x.com", &secret("pw1")).unwrap(), "alice");
        for (credential, password) in [
            ("alice@x.com", "pw2"),
            ("alice@x.com", ""),
            ("bob@x.com", "pw1"),
            ("alice", "pw1"),
            ("ALICE@x.com", "pw1"),
            ("ALICE@X.COM", "pw1"),
            (" alice@x.com", "pw1"),
        ] {
            let result = service.login(credential, &secret(password));
            assert!(
                matches!(result, Err(NotesError::Unauthorized)),
                "{} / {} should be rejected",
                credential,
                password
            );
        }
    }

    #[test]
    fn test_add_note_then_list() {
        let (_dir, service) = with_alice();

        let note = service
            .add_note(new_note("alice", "Groceries", "Milk, eggs"))
            .unwrap();
        assert!(!note.id.is_empty());
        assert!(note.file.is_none());

        let notes = service.list_notes(Some("alice")).unwrap();
        assert_eq!(notes, vec![note]);
    }

    #[test]
    fn test_add_note_unknown_user() {
        let (dir, service) = with_alice();
        let result = service.add_note(new_note("mallory", "t", "c"));
        assert!(matches!(result, Err(NotesError::NotFound(_))));
        assert_eq!(notes_file(&dir).trim(), "[]");
    }

    #[test]
    fn test_add_note_missing_fields() {
        let (_dir, service) = with_alice();
        let result = service.add_note(new_note("alice", "", "c"));
        assert!(matches!(result, Err(NotesError::Validation(_))));
    }

    #[test]
    fn test_note_ids_unique_when_added_quickly() {
        let (_dir, service) = with_alice();
        let ids: Vec<String> = (0..5)
            .map(|i| {
                service
                    .add_note(new_note("alice", &format!("n{}", i), "c"))
                    .unwrap()
                    .id
            })
            .collect();

        let mut deduped = ids.clone();
        deduped.dedup();
        assert_eq!(ids, deduped);
        let listed: Vec<String> = service
            .list_notes(Some("alice"))
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(listed, ids);
    }

    #[test]
    fn test_list_notes_filters_by_owner() {
        let (_dir, service) = with_alice();
        service.signup("bob", "bob@x.com", &secret("pw")).unwrap();
        service.add_note(new_note("alice", "a", "1")).unwrap();
        service.add_note(new_note("bob", "b", "2")).unwrap();

        assert_eq!(service.list_notes(Some("alice")).unwrap().len(), 1);
        assert_eq!(service.list_notes(Some("bob")).unwrap().len(), 1);
        assert!(service.list_notes(Some("carol")).unwrap().is_empty());
        assert_eq!(service.list_notes(None).unwrap().len(), 2);
    }

    #[test]
    fn test_edit_note_keeps_id_and_file() {
        let (_dir, service) = with_alice();
        let mut new = new_note("alice", "old", "old body");
        new.attachment = Some(Upload {
            file_name: "a.txt".to_string(),
            bytes: b"hello".to_vec(),
        });
        let original = service.add_note(new).unwrap();

        let stale = "1/1/2000, 12:00:00 AM";
        service
            .store
            .update(Collection::Notes, |notes: &mut Vec<Note>| {
                notes[0].date = stale.to_string();
                Ok::<_, NotesError>(())
            })
            .unwrap();

        let edited = service
            .edit_note("alice", &original.id, "new", "new body")
            .unwrap();
        assert_eq!(edited.id, original.id);
        assert_eq!(edited.file, original.file);
        assert_ne!(edited.date, stale);

        let listed = service.list_notes(Some("alice")).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, original.id);
        assert_eq!(listed[0].title, "new");
        assert_eq!(listed[0].content, "new body");
        assert_eq!(listed[0].file, original.file);
        assert_ne!(listed[0].date, stale);
        assert_eq!(listed[0].date, edited.date);
    }

    #[test]
    fn test_fields_are_taken_verbatim() {
        let (_dir, service) = service();
        service
            .signup("bob", " bob@x.com ", &secret("pw"))
            .unwrap();
        assert!(matches!(
            service.login("bob@x.com", &secret("pw")),
            Err(NotesError::Unauthorized)
        ));
        assert_eq!(service.login(" bob@x.com ", &secret("pw")).unwrap(), "bob");

        let note = service.add_note(new_note("bob", " ", " ")).unwrap();
        assert_eq!(note.title, " ");
        assert!(service.list_notes(Some(" bob")).unwrap().is_empty());
        assert!(matches!(
            service.delete_note(" bob", &note.id),
            Err(NotesError::NotFound(_))
        ));
    }

    #[test]
    fn test_edit_or_delete_missing_note_is_not_found() {
        let (dir, service) = with_alice();
        let note = service.add_note(new_note("alice", "t", "c")).unwrap();
        let before = notes_file(&dir);

        let edit = service.edit_note("alice", "does-not-exist", "x", "y");
        assert!(matches!(edit, Err(NotesError::NotFound(_))));
        let edit = service.edit_note("bob", &note.id, "x", "y");
        assert!(matches!(edit, Err(NotesError::NotFound(_))));
        let delete = service.delete_note("bob", &note.id);
        assert!(matches!(delete, Err(NotesError::NotFound(_))));

        assert_eq!(notes_file(&dir), before);
    }

    #[test]
    fn test_delete_note_removes_attachment() {
        let (_dir, service) = with_alice();
        let mut new = new_note("alice", "with file", "c");
        new.attachment = Some(Upload {
            file_name: "photo.png".to_string(),
            bytes: vec![1, 2, 3],
        });
        let note = service.add_note(new).unwrap();
        let file = note.file.clone().unwrap();
        let path = service.attachments().path(&file).unwrap();
        assert!(path.exists());

        service.delete_note("alice", &note.id).unwrap();
        assert!(!path.exists());
        assert!(service.list_notes(Some("alice")).unwrap().is_empty());
    }

    #[test]
    fn test_delete_tolerates_missing_attachment_file() {
        let (_dir, service) = with_alice();
        let mut new = new_note("alice", "t", "c");
        new.attachment = Some(Upload {
            file_name: "x.bin".to_string(),
            bytes: vec![0],
        });
        let note = service.add_note(new).unwrap();
        let path = service
            .attachments()
            .path(note.file.as_deref().unwrap())
            .unwrap();
        fs::remove_file(path).unwrap();

        assert!(service.delete_note("alice", &note.id).is_ok());
    }

    #[test]
    fn test_example_scenario() {
        let (_dir, service) = service();
        service
            .signup("alice", "alice@x.com", &secret("pw1"))
            .unwrap();
        assert!(matches!(
            service.signup("alice", "alice@x.com", &secret("pw1")),
            Err(NotesError::Conflict(_))
        ));
        assert_eq!(service.login("alice@x.com", &secret("pw1")).unwrap(), "alice");

        let note = service
            .add_note(new_note("alice", "Groceries", "Milk, eggs"))
            .unwrap();
        let listed = service.list_notes(Some("alice")).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, note.id);
        assert_eq!(listed[0].title, "Groceries");

        service.delete_note("alice", &note.id).unwrap();
        assert!(service.list_notes(Some("alice")).unwrap().is_empty());
    }
}
