pub mod course;
pub mod enrollment;
pub mod id;
pub mod student;

pub use course::{Course, CourseStatus, Instructor, Material, Session};
pub use enrollment::Enrollment;
pub use id::RecordId;
pub use student::{CurrentUser, ProfileUpdate, SignupRequest, Student};

use serde::de::DeserializeOwned;
use tracing::warn;

/// Decodes the elements of a JSON array, skipping nulls and entries of the wrong shape.
pub fn decode_records<T: DeserializeOwned>(items: Vec<serde_json::Value>, origin: &str) -> Vec<T> {
    items
        .into_iter()
        .filter(|item| !item.is_null())
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("skipping malformed entry from {}: {}", origin, e);
                None
            }
        })
        .collect()
}
