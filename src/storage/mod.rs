//! Local persisted key/value store standing in for a browser profile.
//!
//! Values are JSON strings under well-known keys (see [`keys`]). Readers are
//! lenient: a missing key, a failed read or malformed JSON all read as absent.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::models::decode_records;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub mod keys {
    pub const CURRENT_USER: &str = "currentUser";
    pub const STUDENT: &str = "student";
    pub const STUDENTS: &str = "students";
    pub const COURSES: &str = "courses";
    pub const INSTRUCTORS: &str = "instructors";
    pub const SESSIONS: &str = "sessions";
    pub const ENROLLMENTS: &str = "enrollments";
    /// Older pages wrote here; still read and merged, never written.
    pub const LEGACY_ENROLLMENT: &str = "enrollment";

    pub fn password_override(student_key: &str) -> String {
        format!("student-{}-password", student_key)
    }
}

/// Emitted after every successful write, like a storage event seen by other tabs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
}

pub(crate) const EVENT_BUFFER: usize = 64;

#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
    async fn remove(&self, key: &str) -> Result<(), AppError>;
    fn subscribe(&self) -> broadcast::Receiver<StorageEvent>;
}

pub async fn read_raw(store: &dyn LocalStore, key: &str) -> Option<String> {
    match store.get(key).await {
        Ok(value) => value,
        Err(e) => {
            warn!("failed to read local key {}: {}", key, e);
            None
        }
    }
}

pub async fn read_json<T: DeserializeOwned>(store: &dyn LocalStore, key: &str) -> Option<T> {
    let raw = read_raw(store, key).await?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("ignoring malformed local value under {}: {}", key, e);
            None
        }
    }
}

/// Reads an array under `key`, or `None` when the key is missing or holds something else.
pub async fn read_array_opt<T: DeserializeOwned>(store: &dyn LocalStore, key: &str) -> Option<Vec<T>> {
    let value: serde_json::Value = read_json(store, key).await?;
    let serde_json::Value::Array(items) = value else {
        debug!("local value under {} is not an array", key);
        return None;
    };

    Some(decode_records(items, key))
}

pub async fn read_array<T: DeserializeOwned>(store: &dyn LocalStore, key: &str) -> Vec<T> {
    read_array_opt(store, key).await.unwrap_or_default()
}

/// Reads the array under `key` untouched, nulls and unknown fields included.
///
/// Writers that append to a collection go through this so entries they can't
/// decode survive the rewrite.
pub async fn read_raw_array(store: &dyn LocalStore, key: &str) -> Vec<serde_json::Value> {
    match read_json(store, key).await {
        Some(serde_json::Value::Array(items)) => items,
        Some(_) => {
            debug!("local value under {} is not an array", key);
            Vec::new()
        }
        None => Vec::new(),
    }
}

pub async fn write_json<T: Serialize + ?Sized>(
    store: &dyn LocalStore,
    key: &str,
    value: &T,
) -> Result<(), AppError> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Enrollment;

    #[tokio::test]
    async fn malformed_json_reads_as_absent() {
        let store = MemoryStore::with_entries([(keys::ENROLLMENTS, "{not json")]);
        let value: Option<serde_json::Value> = read_json(&store, keys::ENROLLMENTS).await;
        assert!(value.is_none());
        let list: Vec<Enrollment> = read_array(&store, keys::ENROLLMENTS).await;
        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn non_array_reads_as_empty() {
        let store = MemoryStore::with_entries([(keys::ENROLLMENTS, r#"{"id":1}"#)]);
        let list: Vec<Enrollment> = read_array(&store, keys::ENROLLMENTS).await;
        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn bad_entries_are_skipped() {
        let store = MemoryStore::with_entries([(
            keys::ENROLLMENTS,
            r#"[null, {"id":1,"student_id":"7","course_id":3}, {"oops":true}]"#,
        )]);
        let list: Vec<Enrollment> = read_array(&store, keys::ENROLLMENTS).await;
        assert_eq!(list.len(), 1);
        assert!(list[0].is_for("7", "3"));
    }

    #[tokio::test]
    async fn raw_array_keeps_every_entry() {
        let store = MemoryStore::with_entries([(
            keys::ENROLLMENTS,
            r#"[null, 4, {"oops":true}]"#,
        )]);
        let items = read_raw_array(&store, keys::ENROLLMENTS).await;
        assert_eq!(items, vec![serde_json::Value::Null, 4.into(), serde_json::json!({"oops": true})]);

        let store = MemoryStore::with_entries([(keys::ENROLLMENTS, r#"{"id":1}"#)]);
        assert!(read_raw_array(&store, keys::ENROLLMENTS).await.is_empty());
    }
}
