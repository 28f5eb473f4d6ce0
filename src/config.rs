use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::AppError;
use crate::fixtures::{DirFixtureSource, FixtureSource, HttpFixtureSource};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FixtureLocation {
    Http(String),
    Dir(PathBuf),
}

#[derive(Clone, Debug)]
pub struct PortalConfig {
    pub database_url: String,
    pub fixtures: FixtureLocation,
    pub bind_addr: SocketAddr,
}

impl PortalConfig {
    /// Reads `DATABASE_URL`, `FIXTURE_BASE_URL` / `FIXTURE_DIR` and `BIND_ADDR`.
    /// A base URL takes precedence over a directory.
    pub fn new_from_env() -> Result<Self, AppError> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://portal.db".to_string());

        let fixtures = match env::var("FIXTURE_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => FixtureLocation::Http(url),
            _ => FixtureLocation::Dir(PathBuf::from(
                env::var("FIXTURE_DIR").unwrap_or_else(|_| "assets/data".to_string()),
            )),
        };

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AppError::Validation(format!("BIND_ADDR is invalid: {}", e)))?;

        Ok(Self {
            database_url,
            fixtures,
            bind_addr,
        })
    }

    pub fn fixture_source(&self) -> Result<Arc<dyn FixtureSource>, AppError> {
        let source: Arc<dyn FixtureSource> = match &self.fixtures {
            FixtureLocation::Http(url) => Arc::new(HttpFixtureSource::new(url.clone())?),
            FixtureLocation::Dir(path) => Arc::new(DirFixtureSource::new(path.clone())),
        };
        Ok(source)
    }
}
