// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! QR code audit and migration routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::services::qr::{self, CollisionReport, MigrationResult, QrReport};
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/qr/report", get(report))
        .route("/api/qr/migrate", post(migrate))
        .route("/api/qr/collisions", get(collisions))
}

async fn report(State(state): State<Arc<AppState>>) -> Result<Json<QrReport>> {
    let bikes = state.db.list_bikes().await?;
    Ok(Json(qr::audit(&bikes, Utc::now())))
}

async fn migrate(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
) -> Result<Json<MigrationResult>> {
    let bikes = state.db.list_bikes().await?;
    let (migrated, result) = qr::plan_migration(&bikes, Utc::now());

    if !migrated.is_empty() {
        state.db.save_bikes(&migrated).await?;
        state.analytics.invalidate_bikes();
    }

    tracing::info!(
        total = result.total_bikes,
        migrated = result.migrated_count,
        skipped = result.skipped_count,
        admin = %admin.uid,
        "QR code migration finished"
    );
    Ok(Json(result))
}

#[derive(Deserialize)]
struct CollisionQuery {
    #[serde(default)]
    code: String,
}

async fn collisions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CollisionQuery>,
) -> Result<Json<CollisionReport>> {
    let code = query.code.trim();
    if code.is_empty() {
        return Err(AppError::BadRequest("code is required".to_string()));
    }
    let bikes = state.db.find_bikes_by_code(code).await?;
    Ok(Json(qr::find_collisions(code, &bikes)))
}
