// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ride tracking routes.

use crate::db::firestore::RideEnd;
use crate::db::RideCursor;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{LocationPoint, Ride, RideStatus};
use crate::services::maps;
use crate::services::ride_metrics::{self, RideMetrics};
use crate::time_utils;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_PER_PAGE: u32 = 50;
const MAX_PER_PAGE: u32 = 100;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/rides", get(list_rides).post(start_ride))
        .route("/api/rides/active", get(active_rides))
        .route("/api/rides/{id}", get(get_ride))
        .route("/api/rides/{id}/pause", post(pause_ride))
        .route("/api/rides/{id}/resume", post(resume_ride))
        .route("/api/rides/{id}/locations", post(record_location))
        .route("/api/rides/{id}/end", post(end_ride))
        .route("/api/rides/{id}/cancel", post(cancel_ride))
        .route(
            "/api/rides/{id}/emergency-response",
            post(acknowledge_emergency),
        )
        .route("/api/rides/{id}/path", get(ride_path))
}

async fn load_ride(state: &AppState, ride_id: &str) -> Result<Ride> {
    state
        .db
        .get_ride(ride_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Ride {}", ride_id)))
}

/// Rides and the bikes they hold changed; drop both snapshots.
fn invalidate(state: &AppState) {
    state.analytics.invalidate_rides();
    state.analytics.invalidate_bikes();
}

// ─── Listing ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct RidesQuery {
    status: Option<String>,
    /// Cursor for forward pagination (opaque token).
    cursor: Option<String>,
    #[serde(default = "default_per_page")]
    per_page: u32,
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

fn parse_cursor(cursor: Option<&str>) -> Result<Option<RideCursor>> {
    cursor
        .map(|raw| {
            let invalid_cursor = || AppError::BadRequest("Invalid 'cursor' parameter".to_string());

            let decoded = URL_SAFE_NO_PAD.decode(raw).map_err(|_| invalid_cursor())?;
            let decoded_str = std::str::from_utf8(&decoded).map_err(|_| invalid_cursor())?;

            let (start_time, ride_id) = decoded_str.split_once(':').ok_or_else(invalid_cursor)?;
            if ride_id.is_empty() {
                return Err(invalid_cursor());
            }

            Ok(RideCursor {
                start_time: start_time.parse().map_err(|_| invalid_cursor())?,
                ride_id: ride_id.to_string(),
            })
        })
        .transpose()
}

fn encode_cursor(cursor: &RideCursor) -> String {
    URL_SAFE_NO_PAD.encode(format!("{}:{}", cursor.start_time, cursor.ride_id))
}

#[derive(Serialize)]
struct RidesResponse {
    rides: Vec<Ride>,
    per_page: u32,
    next_cursor: Option<String>,
}

async fn list_rides(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RidesQuery>,
) -> Result<Json<RidesResponse>> {
    let limit = params.per_page.clamp(1, MAX_PER_PAGE);
    let status = params
        .status
        .as_deref()
        .filter(|s| !s.is_empty() && *s != "all")
        .map(str::parse::<RideStatus>)
        .transpose()?;
    let cursor = parse_cursor(params.cursor.as_deref())?;

    tracing::debug!(status = ?status, cursor = ?params.cursor, limit, "Fetching rides");

    // Fetch one extra item to determine if another page is available.
    let mut rides = state
        .db
        .list_rides_page(status, cursor.as_ref(), limit.saturating_add(1))
        .await?;

    let has_more = rides.len() > limit as usize;
    if has_more {
        rides.truncate(limit as usize);
    }
    let next_cursor = rides.last().filter(|_| has_more).map(|last| {
        encode_cursor(&RideCursor {
            start_time: last.start_time,
            ride_id: last.id.clone(),
        })
    });

    Ok(Json(RidesResponse {
        rides,
        per_page: limit,
        next_cursor,
    }))
}

async fn active_rides(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Ride>>> {
    Ok(Json(state.db.list_live_rides().await?))
}

#[derive(Serialize)]
struct RideDetail {
    #[serde(flatten)]
    ride: Ride,
    metrics: RideMetrics,
}

async fn get_ride(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RideDetail>> {
    let ride = load_ride(&state, &id).await?;
    let metrics = ride_metrics::process_ride(&ride, time_utils::to_millis(Utc::now()));
    Ok(Json(RideDetail { ride, metrics }))
}

// ─── Lifecycle ───────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartRideRequest {
    bike_id: String,
    user_id: String,
}

async fn start_ride(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Json(body): Json<StartRideRequest>,
) -> Result<(StatusCode, Json<Ride>)> {
    if body.bike_id.trim().is_empty() || body.user_id.trim().is_empty() {
        return Err(AppError::BadRequest(
            "bikeId and userId are required".to_string(),
        ));
    }

    let ride = state
        .db
        .start_ride_atomic(body.bike_id.trim(), body.user_id.trim())
        .await?;
    invalidate(&state);

    tracing::info!(ride_id = %ride.id, admin = %admin.uid, "Ride started by admin");
    Ok((StatusCode::CREATED, Json(ride)))
}

async fn pause_ride(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Ride>> {
    let ride = state
        .db
        .update_ride_atomic(&id, |ride| {
            Ok(ride.pause(time_utils::to_millis(Utc::now()))?)
        })
        .await?;
    state.analytics.invalidate_rides();
    Ok(Json(ride))
}

async fn resume_ride(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Ride>> {
    let ride = state
        .db
        .update_ride_atomic(&id, |ride| {
            Ok(ride.resume(time_utils::to_millis(Utc::now()))?)
        })
        .await?;
    state.analytics.invalidate_rides();
    Ok(Json(ride))
}

#[derive(Deserialize)]
struct LocationUpdate {
    latitude: f64,
    longitude: f64,
    speed: Option<f64>,
    accuracy: Option<f64>,
    /// Epoch milliseconds; defaults to the time of receipt
    timestamp: Option<i64>,
}

async fn record_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<LocationUpdate>,
) -> Result<Json<Ride>> {
    if !ride_metrics::is_valid_gps_coordinate(body.latitude, body.longitude) {
        return Err(AppError::BadRequest("Invalid GPS coordinate".to_string()));
    }

    let mut point = LocationPoint::at(
        body.latitude,
        body.longitude,
        body.timestamp
            .unwrap_or_else(|| time_utils::to_millis(Utc::now())),
    );
    point.speed = body.speed.filter(|s| s.is_finite() && *s >= 0.0);
    point.accuracy = body.accuracy.filter(|a| a.is_finite() && *a >= 0.0);

    let ride = state.db.record_ride_location_atomic(&id, point).await?;
    invalidate(&state);
    Ok(Json(ride))
}

#[derive(Deserialize)]
struct EndRideRequest {
    latitude: f64,
    longitude: f64,
}

async fn end_ride(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<EndRideRequest>,
) -> Result<Json<Ride>> {
    if !ride_metrics::is_valid_gps_coordinate(body.latitude, body.longitude) {
        return Err(AppError::BadRequest("Invalid end location".to_string()));
    }

    let ride = state
        .db
        .finish_ride_atomic(
            &id,
            RideEnd::Complete {
                latitude: body.latitude,
                longitude: body.longitude,
            },
        )
        .await?;
    invalidate(&state);

    tracing::info!(ride_id = %id, cost = ride.cost, admin = %admin.uid, "Ride completed by admin");
    Ok(Json(ride))
}

async fn cancel_ride(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Ride>> {
    let ride = state.db.finish_ride_atomic(&id, RideEnd::Cancel).await?;
    invalidate(&state);

    tracing::warn!(ride_id = %id, admin = %admin.uid, "Ride force-ended by admin");
    Ok(Json(ride))
}

async fn acknowledge_emergency(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Ride>> {
    let ride = state
        .db
        .update_ride_atomic(&id, |ride| {
            Ok(ride.acknowledge_emergency(time_utils::to_millis(Utc::now()))?)
        })
        .await?;
    invalidate(&state);

    tracing::warn!(ride_id = %id, user_id = %ride.user_id, admin = %admin.uid, "Emergency acknowledged");
    Ok(Json(ride))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PathResponse {
    ride_id: String,
    points: usize,
    polyline: String,
}

async fn ride_path(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PathResponse>> {
    let ride = load_ride(&state, &id).await?;
    let polyline = maps::encode_path(&ride.path)?;
    Ok(Json(PathResponse {
        ride_id: ride.id,
        points: ride.path.len(),
        polyline,
    }))
}
