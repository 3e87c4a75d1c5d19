//! Entity Routes
//!
//! The same route set is mounted under every entity prefix.
//!
//! Routes:
//! - POST /:prefix/add - Validate and store a record
//! - GET /:prefix/paginated_report/:page_number/:page_size - Report table
//! - GET /:prefix/latest/:limit - Newest records
//! - GET /:prefix/count - Number of records
//! - GET /:prefix/select_array - Dropdown entries
//! - GET /:prefix/profile/:id - One record by integer id
//! - GET /:prefix/search?field=&q= - Substring search
//! - PATCH /:prefix/:id - Update by integer id
//! - DELETE /:prefix/:id - Delete by opaque id
//! - POST /user/register - Create an account
//! - GET /agents/change-role/:id/:action - Activate, suspend or deactivate

use axum::{
    extract::{Path, Query, State},
    routing::{get, patch, post},
    Extension, Json, Router,
};
use serde::Deserialize;

use crate::api::envelope::Envelope;
use crate::models::Record;
use crate::services::EntityDef;
use crate::{config, AppState, Error, Result};

/// Build the routes of one entity.
pub fn routes(def: &'static EntityDef) -> Router<AppState> {
    let mut router = Router::new()
        .route("/add", post(add))
        .route(
            "/paginated_report/:page_number/:page_size",
            get(paginated_report),
        )
        .route("/latest/:limit", get(latest))
        .route("/count", get(count))
        .route("/select_array", get(select_array))
        .route("/profile/:id", get(profile))
        .route("/search", get(search))
        .route("/:id", patch(update).delete(delete));

    match def.prefix {
        "user" => router = router.route("/register", post(add)),
        "agents" => router = router.route("/change-role/:id/:action", get(change_role)),
        _ => {}
    }

    router.layer(Extension(def))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub q: String,
}

async fn add(
    State(state): State<AppState>,
    Extension(def): Extension<&'static EntityDef>,
    Json(form): Json<Record>,
) -> Result<Json<Envelope>> {
    let message = state.entities.add(def, form).await?;

    let action = if def.collection == "user" {
        "login_page"
    } else {
        "reload_page"
    };

    Ok(Json(Envelope::success("Success", message).with_action(action)))
}

async fn paginated_report(
    State(state): State<AppState>,
    Extension(def): Extension<&'static EntityDef>,
    Path((page_number, page_size)): Path<(i64, i64)>,
) -> Result<Json<Envelope>> {
    let base_url = &config().pagination.report_base_url;
    let report = state
        .entities
        .report(def, page_number, page_size, base_url)
        .await;

    Ok(Json(
        Envelope::success("Success", format!("{} retrieved successfully", def.title))
            .with_data(report),
    ))
}

async fn latest(
    State(state): State<AppState>,
    Extension(def): Extension<&'static EntityDef>,
    Path(limit): Path<u64>,
) -> Result<Json<Envelope>> {
    let records = state.entities.latest(def, limit).await;

    Ok(Json(
        Envelope::success("Success", format!("Latest {} retrieved", def.prefix))
            .with_data(records),
    ))
}

async fn count(
    State(state): State<AppState>,
    Extension(def): Extension<&'static EntityDef>,
) -> Result<Json<Envelope>> {
    let total = state.entities.count(def).await;

    Ok(Json(
        Envelope::success("Success", format!("{} {}", total, def.prefix)).with_data(total),
    ))
}

async fn select_array(
    State(state): State<AppState>,
    Extension(def): Extension<&'static EntityDef>,
) -> Result<Json<Envelope>> {
    let options = state.entities.select_array(def).await;

    Ok(Json(
        Envelope::success("Success", format!("{} array retrieved successfully", def.title))
            .with_data(options),
    ))
}

async fn profile(
    State(state): State<AppState>,
    Extension(def): Extension<&'static EntityDef>,
    Path(id): Path<i64>,
) -> Result<Json<Envelope>> {
    let record = state.entities.profile(def, id).await?;

    Ok(Json(
        Envelope::success("Success", "Record retrieved successfully").with_data(record),
    ))
}

async fn search(
    State(state): State<AppState>,
    Extension(def): Extension<&'static EntityDef>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Envelope>> {
    let field = query.field.as_deref().unwrap_or(def.display_field);
    if query.q.trim().is_empty() {
        return Err(Error::Validation("q is required".to_string()));
    }

    let records = state.entities.search(def, field, query.q.trim()).await;

    Ok(Json(
        Envelope::success("Success", format!("{} matching records", records.len()))
            .with_data(records),
    ))
}

async fn update(
    State(state): State<AppState>,
    Extension(def): Extension<&'static EntityDef>,
    Path(id): Path<String>,
    Json(patch): Json<Record>,
) -> Result<Json<Envelope>> {
    let id: i64 = id
        .trim()
        .parse()
        .map_err(|_| Error::InvalidInput(format!("Expected an integer id, got {}", id)))?;
    let record = state.entities.update(def, id, patch).await?;

    Ok(Json(
        Envelope::success("Success", "Record updated successfully")
            .with_action("reload_page")
            .with_data(record),
    ))
}

async fn delete(
    State(state): State<AppState>,
    Extension(def): Extension<&'static EntityDef>,
    Path(oid): Path<String>,
) -> Result<Json<Envelope>> {
    state.entities.delete(def, &oid).await?;

    Ok(Json(
        Envelope::success("Success", "Record deleted successfully").with_action("reload_page"),
    ))
}

async fn change_role(
    State(state): State<AppState>,
    Path((id, action)): Path<(i64, String)>,
) -> Result<Json<Envelope>> {
    let message = state.entities.change_role(id, &action).await?;

    Ok(Json(
        Envelope::success("Account Modified", message)
            .with_color("info")
            .with_action("reload_page"),
    ))
}
