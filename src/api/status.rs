//! Status Routes
//!
//! Routes:
//! - GET / - Welcome message
//! - GET /health - Liveness plus database status

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::envelope::Envelope;
use crate::db::DbPool;
use crate::AppState;

/// Build status routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(welcome))
        .route("/health", get(health_check))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub database: DatabaseStatus,
}

#[derive(Debug, Serialize)]
pub struct DatabaseStatus {
    pub connected: bool,
    pub pool: PoolStats,
}

/// Connection counts of the shared pool.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStats {
    pub size: u32,
    pub idle: u32,
    pub max_connections: u32,
}

impl From<&DbPool> for PoolStats {
    fn from(pool: &DbPool) -> Self {
        Self {
            size: pool.size(),
            idle: pool.num_idle() as u32,
            max_connections: pool.options().get_max_connections(),
        }
    }
}

async fn welcome() -> Json<Envelope> {
    Json(Envelope::success(
        "Welcome",
        "Dreams manager API is running",
    ))
}

/// Reports 200 with a healthy status, or 500 when the database is down.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Envelope>) {
    let connected = state.store.is_live().await;
    let status = if connected {
        HealthStatus::Healthy
    } else {
        HealthStatus::Unhealthy
    };

    let body = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        database: DatabaseStatus {
            connected,
            pool: PoolStats::from(state.store.pool()),
        },
    };

    if connected {
        (
            StatusCode::OK,
            Json(Envelope::success("Healthy", "All systems operational").with_data(body)),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(
                Envelope::error(
                    "Database Error",
                    "Database is not connected, please check your database connection",
                )
                .with_data(body),
            ),
        )
    }
}
