use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use rusqlite::params_from_iter;
use serde::Deserialize;

use crate::db::models::Resource;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::moderation::{self, SubmissionKind};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/listings", get(browse_listings).post(create_listing))
        .route("/listings/{id}", get(listing_details))
        .route("/marketplace", get(browse_items).post(create_item))
        .route("/marketplace/{id}", get(item_details))
}

/// Search filters. All present filters must match (AND), absent ones
/// are ignored.
#[derive(Deserialize)]
pub struct BrowseQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateResourceRequest {
    pub title: String,
    pub category: String,
    pub location: String,
    pub price: i64,
    #[serde(default)]
    pub currency: Option<String>,
}

const RESOURCE_COLUMNS: &str =
    "id, vendor_id, title, category, location, price, currency, status, created_at";

fn map_resource_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Resource> {
    Ok(Resource {
        id: row.get(0)?,
        vendor_id: row.get(1)?,
        title: row.get(2)?,
        category: row.get(3)?,
        location: row.get(4)?,
        price: row.get(5)?,
        currency: row.get(6)?,
        status: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Only active rows are browsable; filters compose with AND.
fn browse(state: &AppState, table: &str, query: &BrowseQuery) -> AppResult<Vec<Resource>> {
    let mut sql = format!(
        "SELECT {} FROM {} WHERE status = 'active'",
        RESOURCE_COLUMNS, table
    );
    let mut args: Vec<String> = Vec::new();

    if let Some(q) = query.q.as_deref().filter(|s| !s.trim().is_empty()) {
        args.push(format!("%{}%", q.trim()));
        sql.push_str(&format!(" AND title LIKE ?{}", args.len()));
    }
    if let Some(category) = query.category.as_deref().filter(|s| !s.trim().is_empty()) {
        args.push(category.trim().to_string());
        sql.push_str(&format!(" AND category = ?{}", args.len()));
    }
    if let Some(location) = query.location.as_deref().filter(|s| !s.trim().is_empty()) {
        args.push(format!("%{}%", location.trim()));
        sql.push_str(&format!(" AND location LIKE ?{}", args.len()));
    }

    sql.push_str(" ORDER BY created_at DESC");

    let conn = state.db.get()?;
    let mut stmt = conn.prepare(&sql)?;
    let resources = stmt
        .query_map(params_from_iter(args), map_resource_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(resources)
}

fn load_resource(state: &AppState, table: &str, id: &str) -> AppResult<Resource> {
    let conn = state.db.get()?;
    conn.query_row(
        &format!(
            "SELECT {} FROM {} WHERE id = ?1 AND status = 'active'",
            RESOURCE_COLUMNS, table
        ),
        [id],
        map_resource_row,
    )
    .map_err(|err| match err {
        rusqlite::Error::QueryReturnedNoRows => AppError::NotFound,
        other => other.into(),
    })
}

/// New resources land inactive and enter the moderation queue; only an
/// admin verdict activates them.
fn create_resource(
    state: &AppState,
    user: &CurrentUser,
    table: &str,
    kind: SubmissionKind,
    req: &CreateResourceRequest,
) -> AppResult<Resource> {
    if !user.role.can_vend() {
        return Err(AppError::Forbidden);
    }
    if !user.is_kyc_verified {
        return Err(AppError::Validation(
            "Identity verification is required before selling".into(),
        ));
    }
    if req.title.trim().is_empty() {
        return Err(AppError::Validation("Title is required".into()));
    }
    if req.category.trim().is_empty() {
        return Err(AppError::Validation("Category is required".into()));
    }
    if req.location.trim().is_empty() {
        return Err(AppError::Validation("Location is required".into()));
    }
    if req.price < 0 {
        return Err(AppError::Validation("Price cannot be negative".into()));
    }

    let id = uuid::Uuid::now_v7().to_string();
    let currency = req.currency.as_deref().unwrap_or("USD");

    let conn = state.db.get()?;
    conn.execute(
        &format!(
            "INSERT INTO {} (id, vendor_id, title, category, location, price, currency)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            table
        ),
        rusqlite::params![
            id,
            user.id,
            req.title.trim(),
            req.category.trim(),
            req.location.trim(),
            req.price,
            currency,
        ],
    )?;

    moderation::enqueue(&conn, kind, &id, &user.id)?;

    let resource = conn.query_row(
        &format!("SELECT {} FROM {} WHERE id = ?1", RESOURCE_COLUMNS, table),
        [&id],
        map_resource_row,
    )?;

    tracing::info!("New {} {} submitted for review", kind.as_str(), id);
    Ok(resource)
}

// -- Listings (bookable services) --

pub async fn browse_listings(
    State(state): State<AppState>,
    Query(query): Query<BrowseQuery>,
) -> AppResult<Json<Vec<Resource>>> {
    Ok(Json(browse(&state, "listings", &query)?))
}

pub async fn listing_details(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Resource>> {
    Ok(Json(load_resource(&state, "listings", &id)?))
}

pub async fn create_listing(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateResourceRequest>,
) -> AppResult<Response> {
    let resource = create_resource(&state, &user, "listings", SubmissionKind::Listing, &req)?;
    Ok((StatusCode::CREATED, Json(resource)).into_response())
}

// -- Marketplace items (for-sale goods) --

pub async fn browse_items(
    State(state): State<AppState>,
    Query(query): Query<BrowseQuery>,
) -> AppResult<Json<Vec<Resource>>> {
    Ok(Json(browse(&state, "items", &query)?))
}

pub async fn item_details(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Resource>> {
    Ok(Json(load_resource(&state, "items", &id)?))
}

pub async fn create_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateResourceRequest>,
) -> AppResult<Response> {
    let resource = create_resource(&state, &user, "items", SubmissionKind::Item, &req)?;
    Ok((StatusCode::CREATED, Json(resource)).into_response())
}
