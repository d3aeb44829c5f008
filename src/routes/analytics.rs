// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard analytics routes.

use crate::error::Result;
use crate::models::stats::{RatingTrend, RevenueReport, RideCountPoint};
use crate::models::DashboardStats;
use crate::services::analytics::{ChartRange, RevenuePeriod};
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/analytics/summary", get(summary))
        .route("/api/analytics/rides", get(ride_activity))
        .route("/api/analytics/ratings", get(rating_trend))
        .route("/api/analytics/revenue", get(revenue))
}

#[derive(Deserialize)]
struct RangeQuery {
    #[serde(default)]
    range: ChartRange,
}

#[derive(Deserialize)]
struct PeriodQuery {
    #[serde(default = "default_period")]
    period: RevenuePeriod,
}

fn default_period() -> RevenuePeriod {
    RevenuePeriod::Month
}

async fn summary(State(state): State<Arc<AppState>>) -> Result<Json<DashboardStats>> {
    Ok(Json(state.analytics.summary().await?))
}

async fn ride_activity(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<RideCountPoint>>> {
    Ok(Json(state.analytics.ride_activity(query.range).await?))
}

async fn rating_trend(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<RatingTrend>> {
    Ok(Json(state.analytics.rating_trend(query.range).await?))
}

async fn revenue(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<RevenueReport>> {
    Ok(Json(state.analytics.revenue(query.period).await?))
}
