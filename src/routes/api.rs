// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for signed-in administrators.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::user::UserResponse;
use crate::routes::{
    analytics, bikes, bookings, live, maps, notifications, payments, qr, reviews, rides, settings,
    support, users,
};
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Json, Router};
use std::sync::Arc;

/// API routes (require an admin session).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .merge(bikes::routes())
        .merge(qr::routes())
        .merge(users::routes())
        .merge(rides::routes())
        .merge(maps::routes())
        .merge(live::routes())
        .merge(analytics::routes())
        .merge(bookings::routes())
        .merge(notifications::routes())
        .merge(reviews::routes())
        .merge(settings::routes())
        .merge(payments::routes())
        .merge(support::routes())
}

/// Get the signed-in admin's profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let user = state
        .db
        .get_user(&admin.uid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", admin.uid)))?;
    Ok(Json(UserResponse::from(&user)))
}
