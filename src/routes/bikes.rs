// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bike inventory routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::bike::{BikeUpdate, NewBike};
use crate::models::{Bike, BikeStatus, LocationRecord, MaintenanceLog, MaintenanceStatus, Review};
use crate::services::qr;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

const DEFAULT_HISTORY_LIMIT: u32 = 100;
const MAX_HISTORY_LIMIT: u32 = 1000;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/bikes", get(list_bikes).post(create_bike))
        .route("/api/bikes/types", get(list_bike_types))
        .route(
            "/api/bikes/{id}",
            get(get_bike).put(update_bike).delete(delete_bike),
        )
        .route("/api/bikes/{id}/availability", put(set_availability))
        .route("/api/bikes/{id}/lock", put(set_lock))
        .route("/api/bikes/{id}/location", put(set_location))
        .route("/api/bikes/{id}/location-history", get(location_history))
        .route(
            "/api/bikes/{id}/maintenance",
            get(maintenance_log).put(set_maintenance),
        )
        .route("/api/bikes/{id}/reviews", get(bike_reviews))
        .route("/api/bikes/{id}/qr.svg", get(qr_svg))
}

/// Load a bike or fail with 404.
pub(crate) async fn load_bike(state: &AppState, bike_id: &str) -> Result<Bike> {
    state
        .db
        .get_bike(bike_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Bike {}", bike_id)))
}

async fn save(state: &AppState, bike: &Bike) -> Result<()> {
    state.db.save_bike(bike).await?;
    state.analytics.invalidate_bikes();
    Ok(())
}

// ─── Listing ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct BikeFilter {
    status: Option<BikeStatus>,
    #[serde(rename = "type")]
    bike_type: Option<String>,
}

async fn list_bikes(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<BikeFilter>,
) -> Result<Json<Vec<Bike>>> {
    let bikes = state.db.list_bikes().await?;
    let bikes = bikes
        .into_iter()
        .filter(|b| filter.status.is_none_or(|s| b.status() == s))
        .filter(|b| {
            filter
                .bike_type
                .as_deref()
                .is_none_or(|t| b.bike_type.eq_ignore_ascii_case(t))
        })
        .collect();
    Ok(Json(bikes))
}

async fn list_bike_types(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>> {
    let bikes = state.analytics.bikes().await?;
    let types: BTreeSet<String> = bikes
        .iter()
        .map(|b| b.bike_type.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    Ok(Json(types.into_iter().collect()))
}

async fn get_bike(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Bike>> {
    Ok(Json(load_bike(&state, &id).await?))
}

// ─── Create / Edit / Delete ──────────────────────────────────

async fn create_bike(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Json(input): Json<NewBike>,
) -> Result<(StatusCode, Json<Bike>)> {
    input.validate()?;

    let code = match input.qr_code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => code.to_string(),
        _ => qr::generate_code(),
    };
    let holders = state.db.find_bikes_by_code(&code).await?;
    qr::ensure_unused(&code, &holders, None)?;

    let bike = Bike::from_new(uuid::Uuid::new_v4().to_string(), &input, code, Utc::now());
    save(&state, &bike).await?;

    tracing::info!(
        bike_id = %bike.id,
        qr_code = ?bike.qr_code,
        admin = %admin.uid,
        "Created bike"
    );
    Ok((StatusCode::CREATED, Json(bike)))
}

async fn update_bike(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<BikeUpdate>,
) -> Result<Json<Bike>> {
    update.validate()?;
    let mut bike = load_bike(&state, &id).await?;

    if let Some(code) = update.qr_code.as_deref().map(str::trim) {
        if bike.qr_code.as_deref() != Some(code) {
            let holders = state.db.find_bikes_by_code(code).await?;
            qr::ensure_unused(code, &holders, Some(&bike.id))?;
        }
    }

    bike.apply_update(&update, Utc::now());
    save(&state, &bike).await?;
    Ok(Json(bike))
}

async fn delete_bike(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let bike = load_bike(&state, &id).await?;
    if bike.is_in_use {
        return Err(AppError::Conflict(
            "Cannot delete a bike that is in use".to_string(),
        ));
    }

    state.db.delete_bike(&id).await?;
    state.analytics.invalidate_bikes();
    tracing::info!(bike_id = %id, admin = %admin.uid, "Bike deleted by admin");
    Ok(StatusCode::NO_CONTENT)
}

// ─── State Changes ───────────────────────────────────────────

#[derive(Deserialize)]
struct AvailabilityRequest {
    available: bool,
    #[serde(default)]
    force: bool,
}

async fn set_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<AvailabilityRequest>,
) -> Result<Json<Bike>> {
    let mut bike = load_bike(&state, &id).await?;
    bike.set_availability(body.available, body.force, Utc::now())?;
    save(&state, &bike).await?;
    Ok(Json(bike))
}

#[derive(Deserialize)]
struct LockRequest {
    locked: bool,
}

async fn set_lock(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<LockRequest>,
) -> Result<Json<Bike>> {
    let mut bike = load_bike(&state, &id).await?;
    bike.set_locked(body.locked, Utc::now())?;
    save(&state, &bike).await?;
    tracing::info!(bike_id = %id, locked = body.locked, admin = %admin.uid, "Bike lock changed");
    Ok(Json(bike))
}

#[derive(Deserialize)]
struct LocationRequest {
    latitude: f64,
    longitude: f64,
}

async fn set_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<LocationRequest>,
) -> Result<Json<Bike>> {
    if !crate::models::bike::is_valid_coordinate(body.latitude, body.longitude) {
        return Err(AppError::BadRequest("Invalid coordinates".to_string()));
    }

    let now = Utc::now();
    let mut bike = load_bike(&state, &id).await?;
    bike.move_to(body.latitude, body.longitude, now);
    save(&state, &bike).await?;

    state
        .db
        .add_location_record(&LocationRecord {
            bike_id: bike.id.clone(),
            latitude: body.latitude,
            longitude: body.longitude,
            timestamp: now,
        })
        .await?;

    Ok(Json(bike))
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<u32>,
}

async fn location_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<LocationRecord>>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    Ok(Json(state.db.list_location_history(&id, limit).await?))
}

// ─── Maintenance ─────────────────────────────────────────────

#[derive(Deserialize)]
struct MaintenanceRequest {
    status: MaintenanceStatus,
    #[serde(default)]
    notes: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MaintenanceResponse {
    bike: Bike,
    log_id: String,
}

async fn set_maintenance(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<MaintenanceRequest>,
) -> Result<Json<MaintenanceResponse>> {
    let now = Utc::now();
    let mut bike = load_bike(&state, &id).await?;
    let previous = bike.set_maintenance(body.status, &body.notes, now);
    save(&state, &bike).await?;

    let log = MaintenanceLog::status_change(
        &bike.id,
        previous,
        body.status,
        &body.notes,
        &admin.uid,
        now,
    );
    let log_id = state.db.add_maintenance_log(&log).await?;

    tracing::info!(
        bike_id = %id,
        from = previous.as_str(),
        to = body.status.as_str(),
        "Maintenance status updated"
    );
    Ok(Json(MaintenanceResponse { bike, log_id }))
}

async fn maintenance_log(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<MaintenanceLog>>> {
    Ok(Json(state.db.list_maintenance_logs(&id).await?))
}

async fn bike_reviews(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Review>>> {
    Ok(Json(state.db.list_reviews(Some(&id), None).await?))
}

// ─── QR Code ─────────────────────────────────────────────────

async fn qr_svg(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let bike = load_bike(&state, &id).await?;
    let code = bike
        .effective_qr_code()
        .ok_or_else(|| AppError::NotFound(format!("QR code for bike {}", id)))?;
    let svg = qr::render_svg(code)?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "private, max-age=300"),
        ],
        svg,
    ))
}
