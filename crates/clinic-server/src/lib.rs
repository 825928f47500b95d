//! Clinic server library logic.

pub mod config;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use clinic_db::{ConnectionProvider, DbError};
use serde_json::{json, Value};
use thiserror::Error;
use tower_http::trace::TraceLayer;

/// The provider every handler reads the shared connection from.
pub type AppState = &'static ConnectionProvider;

/// Errors surfaced by the health check.
#[derive(Debug, Error)]
pub enum HealthError {
    /// The provider could not produce a connection.
    #[error(transparent)]
    Database(#[from] DbError),

    /// The catalog query failed.
    #[error("catalog query failed: {0}")]
    Query(#[from] rusqlite::Error),

    /// A previous holder of the connection panicked.
    #[error("database connection lock poisoned")]
    LockPoisoned,

    /// The blocking task did not complete.
    #[error("health check task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Counts the tables in the shared database.
pub fn count_tables(provider: &ConnectionProvider) -> Result<i64, HealthError> {
    let conn = provider.get_connection()?;
    let conn = conn.lock().map_err(|_| HealthError::LockPoisoned)?;
    let tables = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
        [],
        |row| row.get(0),
    )?;
    Ok(tables)
}

/// Health check handler.
///
/// Returns `200 OK` with server status, version, and the number of tables in
/// the shared database, or `500` if the database cannot be reached.
async fn health(State(provider): State<AppState>) -> (StatusCode, Json<Value>) {
    let result = tokio::task::spawn_blocking(move || count_tables(provider))
        .await
        .map_err(HealthError::from)
        .and_then(|r| r);

    match result {
        Ok(tables) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "version": env!("CARGO_PKG_VERSION"),
                "tables": tables,
            })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "error": e.to_string(),
                })),
            )
        }
    }
}

/// Builds the application router with all routes.
pub fn app(provider: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(provider)
}
