//! Persisted records: users and their notes.

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A registered account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub email: String,
    /// Argon2 PHC string
    pub password_hash: String,
}

/// A note, stored flat and linked to its owner by `username`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub username: String,
    pub title: String,
    pub content: String,
    pub date: String,
    /// Stored attachment filename under the upload directory
    #[serde(default)]
    pub file: Option<String>,
}

impl Note {
    pub fn belongs_to(&self, username: &str, id: &str) -> bool {
        self.id == id && self.username == username
    }

    /// Numeric value of the id, if it is a millisecond timestamp
    pub fn id_millis(&self) -> Option<i64> {
        self.id.parse().ok()
    }
}

/// Next note id: current epoch millis, bumped past every existing id.
pub fn next_note_id(notes: &[Note], now: DateTime<Utc>) -> String {
    let now_ms = now.timestamp_millis();
    let next = notes
        .iter()
        .filter_map(Note::id_millis)
        .max()
        .map_or(now_ms, |max| now_ms.max(max.saturating_add(1)));
    next.to_string()
}

/// Human-readable note date, e.g. `6/10/2024, 9:13:20 AM`
pub fn display_date<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

pub fn now_display_date() -> String {
    display_date(&Local::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: &str) -> Note {
        Note {
            id: id.to_string(),
            username: "alice".to_string(),
            title: "t".to_string(),
            content: "c".to_string(),
            date: String::new(),
            file: None,
        }
    }

    #[test]
    fn test_next_note_id_uses_clock() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        assert_eq!(next_note_id(&[], now), "1700000000000");
    }

    #[test]
    fn test_next_note_id_is_strictly_increasing() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let notes = vec![note("1700000000000"), note("1700000000005")];
        assert_eq!(next_note_id(&notes, now), "1700000000006");
    }

    #[test]
    fn test_next_note_id_ignores_non_numeric_ids() {
        let now = Utc.timestamp_millis_opt(42).unwrap();
        assert_eq!(next_note_id(&[note("legacy")], now), "42");
    }

    #[test]
    fn test_next_note_id_saturates_at_largest_id() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let notes = vec![note("9223372036854775807")];
        assert_eq!(next_note_id(&notes, now), "9223372036854775807");
    }

    #[test]
    fn test_display_date_format() {
        let at = Utc.with_ymd_and_hms(2024, 6, 10, 21, 3, 7).unwrap();
        assert_eq!(display_date(&at), "6/10/2024, 9:03:07 PM");
    }

    #[test]
    fn test_note_missing_file_field_deserializes() {
        let json = r#"{"id":"1","username":"a","title":"t","content":"c","date":"d"}"#;
        let note: Note = serde_json::from_str(json).unwrap();
        assert!(note.file.is_none());
    }
}
