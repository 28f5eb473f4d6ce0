//! Read-only baseline data shipped with the site.

pub mod dir;
pub mod http;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::error::AppError;
use crate::models::decode_records;

pub use dir::DirFixtureSource;
pub use http::HttpFixtureSource;

pub const STUDENTS: &str = "students.json";
pub const COURSES: &str = "courses.json";
pub const INSTRUCTORS: &str = "instructors.json";
pub const SESSIONS: &str = "sessions.json";
pub const MATERIALS: &str = "materials.json";
pub const ENROLLMENTS: &str = "enrollment.json";

#[async_trait]
pub trait FixtureSource: Send + Sync {
    async fn fetch(&self, name: &str) -> Result<Value, AppError>;
}

/// Typed access to a [`FixtureSource`]. Every failure degrades to an empty list.
#[derive(Clone)]
pub struct Fixtures {
    source: Arc<dyn FixtureSource>,
}

impl Fixtures {
    pub fn new(source: Arc<dyn FixtureSource>) -> Self {
        Self { source }
    }

    pub async fn load<T: DeserializeOwned>(&self, name: &str) -> Vec<T> {
        match self.source.fetch(name).await {
            Ok(Value::Array(items)) => decode_records(items, name),
            Ok(_) => {
                warn!("fixture {} is not an array, using empty collection", name);
                Vec::new()
            }
            Err(e) => {
                warn!("failed to load fixture {}: {}", name, e);
                Vec::new()
            }
        }
    }
}

/// Fixtures held in memory.
#[derive(Default)]
pub struct StaticFixtureSource {
    files: HashMap<String, Value>,
}

impl StaticFixtureSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: Value) -> Self {
        self.files.insert(name.to_string(), value);
        self
    }
}

#[async_trait]
impl FixtureSource for StaticFixtureSource {
    async fn fetch(&self, name: &str) -> Result<Value, AppError> {
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::Fetch(format!("{} not found", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Course;
    use serde_json::json;

    #[tokio::test]
    async fn missing_fixture_loads_empty() {
        let fixtures = Fixtures::new(Arc::new(StaticFixtureSource::new()));
        let courses: Vec<Course> = fixtures.load(COURSES).await;
        assert!(courses.is_empty());
    }

    #[tokio::test]
    async fn non_array_fixture_loads_empty() {
        let source = StaticFixtureSource::new().with(COURSES, json!({"id": 1}));
        let fixtures = Fixtures::new(Arc::new(source));
        let courses: Vec<Course> = fixtures.load(COURSES).await;
        assert!(courses.is_empty());
    }

    #[tokio::test]
    async fn array_fixture_is_decoded() {
        let source = StaticFixtureSource::new().with(
            COURSES,
            json!([{"id": 1, "title": "Rust", "status": "upcoming"}, null]),
        );
        let fixtures = Fixtures::new(Arc::new(source));
        let courses: Vec<Course> = fixtures.load(COURSES).await;
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].title, "Rust");
    }
}
