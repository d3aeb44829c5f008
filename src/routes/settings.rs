// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! App-wide settings read by the mobile app.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::TrackingSettings;
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Json, Router};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/api/settings/tracking",
        get(get_tracking).put(set_tracking),
    )
}

async fn get_tracking(State(state): State<Arc<AppState>>) -> Result<Json<TrackingSettings>> {
    let settings = state.db.get_tracking_settings().await?.unwrap_or_default();
    Ok(Json(settings))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackingUpdate {
    location_restriction_enabled: bool,
}

async fn set_tracking(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Json(body): Json<TrackingUpdate>,
) -> Result<Json<TrackingSettings>> {
    let settings = TrackingSettings {
        location_restriction_enabled: body.location_restriction_enabled,
        updated_at: Some(Utc::now()),
        updated_by: Some(admin.uid.clone()),
    };
    state.db.set_tracking_settings(&settings).await?;

    tracing::info!(
        enabled = settings.location_restriction_enabled,
        admin = %admin.uid,
        "Location restriction updated"
    );
    Ok(Json(settings))
}
