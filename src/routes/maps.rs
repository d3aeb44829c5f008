// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! GeoJSON map layers.

use crate::error::Result;
use crate::services::maps;
use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use geojson::FeatureCollection;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/map/bikes", get(bikes_layer))
        .route("/api/map/rides", get(rides_layer))
}

async fn bikes_layer(State(state): State<Arc<AppState>>) -> Result<Json<FeatureCollection>> {
    let bikes = state.db.list_bikes().await?;
    Ok(Json(maps::bikes_layer(&bikes)))
}

async fn rides_layer(State(state): State<Arc<AppState>>) -> Result<Json<FeatureCollection>> {
    let rides = state.db.list_live_rides().await?;
    Ok(Json(maps::rides_layer(&rides)))
}
