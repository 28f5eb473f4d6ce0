use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use portal::api::router;
use portal::config::PortalConfig;
use portal::fixtures::Fixtures;
use portal::services::EnrollmentEvent;
use portal::state::AppState;
use portal::storage::SqliteStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "portal=debug".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = PortalConfig::new_from_env()?;
    info!("fixtures from {:?}", config.fixtures);

    let store = SqliteStore::connect(&config.database_url).await?;
    let fixtures = Fixtures::new(config.fixture_source()?);
    let state = AppState::new(Arc::new(store), fixtures);

    let mut changes = state.enrollments.subscribe();
    tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(EnrollmentEvent::Changed(enrollment)) => info!(
                    "enrollments changed: student {} -> course {}",
                    enrollment.student_id, enrollment.course_id
                ),
                Err(RecvError::Lagged(missed)) => warn!("missed {} enrollment events", missed),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let app = router(state);

    info!("listening on http://{}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
