//! Middleware for the dreams manager.
//!
//! - `require_database` - refuse requests while the database is unreachable

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{error::Error, AppState};

/// Middleware that answers with a "Database Error" envelope when the
/// database does not respond to a health check.
///
/// # Example
///
/// ```rust,ignore
/// use axum::{Router, middleware};
/// use dreams_manager::middleware::require_database;
///
/// let app = Router::new()
///     .route("/products/count", get(count))
///     .layer(middleware::from_fn_with_state(state.clone(), require_database));
/// ```
pub async fn require_database(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if state.store.is_live().await {
        next.run(req).await
    } else {
        Error::Unavailable.into_response()
    }
}
