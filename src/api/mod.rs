//! API Routes for the dreams manager
//!
//! This module combines all API routes into a single router.

mod entities;
pub mod envelope;
pub mod status;

use axum::{http::StatusCode, http::Uri, Json, Router};

use crate::middleware::require_database;
use crate::services::ENTITIES;
use crate::AppState;

use self::envelope::Envelope;

/// Build the complete API router.
///
/// Route structure:
/// - /, /health - Status (public)
/// - /{prefix}/* - Entity routes for every registered entity (database required)
/// - anything else - 404 envelope
pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(status::routes())
        .merge(entity_routes(state))
        .fallback(not_found)
}

fn entity_routes(state: AppState) -> Router<AppState> {
    ENTITIES
        .iter()
        .fold(Router::new(), |router, def| {
            router.nest(&format!("/{}", def.prefix), entities::routes(def))
        })
        .layer(axum::middleware::from_fn_with_state(state, require_database))
}

async fn not_found(uri: Uri) -> (StatusCode, Json<Envelope>) {
    (
        StatusCode::NOT_FOUND,
        Json(Envelope::error(
            "Resource Error",
            format!("The requested resource ( {} ) does not exist", uri.path()),
        )),
    )
}
