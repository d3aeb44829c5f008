// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Booking routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::booking::NewBooking;
use crate::models::{Booking, BookingStatus, Notification};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/bookings", get(list_bookings).post(create_booking))
        .route("/api/bookings/availability", get(availability))
        .route("/api/bookings/{id}", delete(delete_booking))
        .route("/api/bookings/{id}/status", put(set_status))
}

/// Booking plus display fields computed on read.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BookingView {
    #[serde(flatten)]
    booking: Booking,
    duration: String,
}

impl From<Booking> for BookingView {
    fn from(booking: Booking) -> Self {
        Self {
            duration: booking.duration_label(),
            booking,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookingFilter {
    user_id: Option<String>,
    bike_id: Option<String>,
    /// Only bookings starting at or after this instant
    from: Option<DateTime<Utc>>,
    /// Only bookings starting at or before this instant
    to: Option<DateTime<Utc>>,
}

async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<BookingFilter>,
) -> Result<Json<Vec<BookingView>>> {
    let bookings = state
        .db
        .list_bookings(filter.user_id.as_deref(), filter.bike_id.as_deref())
        .await?;

    let bookings = bookings
        .into_iter()
        .filter(|b| filter.from.is_none_or(|from| b.start_time >= from))
        .filter(|b| filter.to.is_none_or(|to| b.start_time <= to))
        .map(BookingView::from)
        .collect();
    Ok(Json(bookings))
}

async fn create_booking(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Json(input): Json<NewBooking>,
) -> Result<(StatusCode, Json<BookingView>)> {
    input.validate()?;

    let mut booking = input.into_booking(Utc::now());
    if booking.user_name.is_empty() {
        if let Some(user) = state.db.get_user(&booking.user_id).await? {
            booking.user_name = user.name().to_string();
        }
    }

    let booking = state.db.create_booking_atomic(&booking).await?;
    tracing::info!(
        booking_id = %booking.id,
        bike_id = %booking.bike_id,
        admin = %admin.uid,
        "Booking created"
    );
    Ok((StatusCode::CREATED, Json(BookingView::from(booking))))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AvailabilityQuery {
    bike_id: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AvailabilityResponse {
    available: bool,
    conflicting_bookings: Vec<Booking>,
}

async fn availability(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>> {
    if query.end <= query.start {
        return Err(AppError::BadRequest("end must be after start".to_string()));
    }

    let conflicting_bookings: Vec<Booking> = state
        .db
        .list_blocking_bookings(&query.bike_id)
        .await?
        .into_iter()
        .filter(|b| b.conflicts_with(query.start, query.end))
        .collect();

    Ok(Json(AvailabilityResponse {
        available: conflicting_bookings.is_empty(),
        conflicting_bookings,
    }))
}

#[derive(Deserialize)]
struct StatusRequest {
    status: BookingStatus,
    reason: Option<String>,
}

/// Notification raised when a booking moves to `status`.
fn status_notification(
    booking: &Booking,
    status: BookingStatus,
    reason: Option<&str>,
    admin: &str,
    now: DateTime<Utc>,
) -> Option<Notification> {
    match status {
        BookingStatus::Confirmed => Some(Notification::booking_confirmed(booking, admin, now)),
        BookingStatus::Completed => Some(Notification::booking_completed(booking, admin, now)),
        BookingStatus::Cancelled => Some(Notification::booking_cancelled(
            booking, reason, admin, now,
        )),
        BookingStatus::Pending => None,
    }
}

async fn set_status(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<BookingView>> {
    let now = Utc::now();
    let mut booking = state
        .db
        .get_booking(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Booking {}", id)))?;

    booking.transition(body.status, now)?;
    state.db.save_booking(&booking).await?;

    if let Some(notification) =
        status_notification(&booking, body.status, body.reason.as_deref(), &admin.uid, now)
    {
        state.db.save_notification(&notification).await?;
    }

    tracing::info!(
        booking_id = %id,
        status = ?body.status,
        admin = %admin.uid,
        "Booking status updated"
    );
    Ok(Json(BookingView::from(booking)))
}

async fn delete_booking(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state
        .db
        .get_booking(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Booking {}", id)))?;
    state.db.delete_booking(&id).await?;
    tracing::info!(booking_id = %id, admin = %admin.uid, "Booking deleted");
    Ok(StatusCode::NO_CONTENT)
}
