use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;

use super::FixtureSource;
use crate::error::AppError;

/// Reads fixture files from a local directory.
pub struct DirFixtureSource {
    root: PathBuf,
}

impl DirFixtureSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl FixtureSource for DirFixtureSource {
    async fn fetch(&self, name: &str) -> Result<Value, AppError> {
        let path = self.root.join(name);
        let body = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| AppError::Fetch(format!("{}: {}", path.display(), e)))?;
        Ok(serde_json::from_str(&body)?)
    }
}
