use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Identifier as it appears in fixtures and local overrides.
///
/// The same id may show up as `7` in one file and `"7"` in another, so
/// equality and hashing go through the canonical string form.
///
/// Numbers outside `i64` (large unsigned or fractional) are kept as-is rather
/// than failing the whole record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Unsigned(u64),
    Float(f64),
    Text(String),
}

impl RecordId {
    /// Numeric id when `raw` is exactly the decimal form of an integer, text id otherwise.
    ///
    /// `"0123"`, `"+7"` and `" 7 "` stay text so the stored key equals `raw`.
    pub fn loose(raw: &str) -> Self {
        match raw.parse::<i64>() {
            Ok(n) if n.to_string() == raw => RecordId::Number(n),
            _ => RecordId::Text(raw.to_string()),
        }
    }

    pub fn key(&self) -> Cow<'_, str> {
        match self {
            RecordId::Number(n) => Cow::Owned(n.to_string()),
            RecordId::Unsigned(n) => Cow::Owned(n.to_string()),
            RecordId::Float(f) => Cow::Owned(f.to_string()),
            RecordId::Text(s) => Cow::Borrowed(s.as_str()),
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            RecordId::Number(n) => Some(*n),
            RecordId::Unsigned(n) => i64::try_from(*n).ok(),
            RecordId::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Some(*f as i64),
            RecordId::Float(_) => None,
            RecordId::Text(s) => s.trim().parse().ok(),
        }
    }

    /// True when some id is at least `i64::MAX`, so no larger integer id exists.
    pub fn is_past_i64(&self) -> bool {
        match self {
            RecordId::Number(n) => *n == i64::MAX,
            RecordId::Unsigned(n) => *n >= i64::MAX as u64,
            RecordId::Float(f) => *f >= i64::MAX as f64,
            RecordId::Text(_) => false,
        }
    }

    pub fn matches(&self, other: &str) -> bool {
        self.key() == other
    }
}

impl PartialEq for RecordId {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for RecordId {}

impl Hash for RecordId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        RecordId::Number(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::loose(s)
    }
}
