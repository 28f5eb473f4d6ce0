//! Resolution of the logged-in user from stored session data.
//!
//! `currentUser` may hold a JSON object, a JSON string or plain text; the
//! `student` key is consulted as a fallback and only as an object. Both are
//! collapsed once into a [`Session`].

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::storage::{LocalStore, keys, read_raw};

/// Fields tried, in order, when a stored record names the user.
pub const ID_FIELDS: [&str; 4] = ["id", "nationalId", "student_id", "email"];

#[derive(Debug, Clone, PartialEq)]
pub enum SessionIdentity {
    Record(Map<String, Value>),
    Bare(String),
    Absent,
}

impl SessionIdentity {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return SessionIdentity::Absent;
        }

        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(map)) => SessionIdentity::Record(map),
            Ok(Value::String(s)) if !s.trim().is_empty() => SessionIdentity::Bare(s),
            Ok(_) => SessionIdentity::Absent,
            // Truncated objects or arrays are corrupt data, not an id.
            Err(e) if trimmed.starts_with('{') || trimmed.starts_with('[') => {
                debug!("ignoring malformed session data: {}", e);
                SessionIdentity::Absent
            }
            Err(_) => SessionIdentity::Bare(trimmed.to_string()),
        }
    }

    pub fn user_id(&self) -> Option<String> {
        match self {
            SessionIdentity::Record(map) => ID_FIELDS
                .iter()
                .find_map(|field| map.get(*field).and_then(identifier)),
            SessionIdentity::Bare(id) => Some(id.clone()),
            SessionIdentity::Absent => None,
        }
    }

    fn name(&self) -> Option<String> {
        match self {
            SessionIdentity::Record(map) => map
                .get("name")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            _ => None,
        }
    }
}

fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Canonical identity of the logged-in student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub user_id: String,
    pub name: Option<String>,
}

impl Session {
    pub async fn load(store: &dyn LocalStore) -> Option<Session> {
        let current = read_raw(store, keys::CURRENT_USER)
            .await
            .map(|raw| SessionIdentity::parse(&raw))
            .unwrap_or(SessionIdentity::Absent);
        if let Some(user_id) = current.user_id() {
            return Some(Session {
                user_id,
                name: current.name(),
            });
        }

        let student = read_raw(store, keys::STUDENT)
            .await
            .map(|raw| SessionIdentity::parse(&raw))
            .unwrap_or(SessionIdentity::Absent);
        match &student {
            SessionIdentity::Record(_) => student.user_id().map(|user_id| Session {
                user_id,
                name: student.name(),
            }),
            _ => None,
        }
    }
}

pub async fn resolve_current_user_id(store: &dyn LocalStore) -> Option<String> {
    Session::load(store).await.map(|session| session.user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn structured_record_resolves_id() {
        let store = MemoryStore::with_entries([(keys::CURRENT_USER, r#"{"id":"A1","name":"X"}"#)]);
        assert_eq!(resolve_current_user_id(&store).await.as_deref(), Some("A1"));

        let session = Session::load(&store).await.unwrap();
        assert_eq!(session.name.as_deref(), Some("X"));
    }

    #[tokio::test]
    async fn bare_string_resolves_id() {
        let store = MemoryStore::with_entries([(keys::CURRENT_USER, "A1")]);
        assert_eq!(resolve_current_user_id(&store).await.as_deref(), Some("A1"));

        let quoted = MemoryStore::with_entries([(keys::CURRENT_USER, r#""A1""#)]);
        assert_eq!(resolve_current_user_id(&quoted).await.as_deref(), Some("A1"));
    }

    #[tokio::test]
    async fn nothing_stored_resolves_none() {
        let store = MemoryStore::new();
        assert_eq!(resolve_current_user_id(&store).await, None);
    }

    #[tokio::test]
    async fn field_priority_and_number_coercion() {
        let store = MemoryStore::with_entries([(
            keys::CURRENT_USER,
            r#"{"id":"","nationalId":1234,"email":"a@b.c"}"#,
        )]);
        assert_eq!(resolve_current_user_id(&store).await.as_deref(), Some("1234"));

        let by_email = MemoryStore::with_entries([(keys::CURRENT_USER, r#"{"email":"a@b.c"}"#)]);
        assert_eq!(resolve_current_user_id(&by_email).await.as_deref(), Some("a@b.c"));
    }

    #[tokio::test]
    async fn falls_back_to_student_record() {
        let store = MemoryStore::with_entries([
            (keys::CURRENT_USER, r#"{"name":"no id"}"#),
            (keys::STUDENT, r#"{"nationalId":"99","name":"Sara"}"#),
        ]);
        let session = Session::load(&store).await.unwrap();
        assert_eq!(session.user_id, "99");
        assert_eq!(session.name.as_deref(), Some("Sara"));
    }

    #[tokio::test]
    async fn malformed_data_degrades_to_none() {
        let store = MemoryStore::with_entries([
            (keys::CURRENT_USER, r#"{"id": "A1""#),
            (keys::STUDENT, "not-json"),
        ]);
        assert_eq!(resolve_current_user_id(&store).await, None);

        let null = MemoryStore::with_entries([(keys::CURRENT_USER, "null")]);
        assert_eq!(resolve_current_user_id(&null).await, None);
    }
}
