// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin notification routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::notification::NewNotification;
use crate::models::Notification;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, put},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 500;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/notifications",
            get(list_notifications)
                .post(create_notification)
                .delete(clear_notifications),
        )
        .route("/api/notifications/unread-count", get(unread_count))
        .route("/api/notifications/{id}/read", put(mark_read))
        .route("/api/notifications/{id}", delete(delete_notification))
}

#[derive(Deserialize)]
struct NotificationQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
    limit: Option<u32>,
}

async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Vec<Notification>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let kind = query.kind.as_deref().filter(|k| !k.is_empty() && *k != "all");
    Ok(Json(state.db.list_notifications(kind, limit).await?))
}

#[derive(Serialize)]
struct UnreadCount {
    count: usize,
}

async fn unread_count(State(state): State<Arc<AppState>>) -> Result<Json<UnreadCount>> {
    let count = state.db.count_unread_notifications().await?;
    Ok(Json(UnreadCount { count }))
}

async fn create_notification(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Json(input): Json<NewNotification>,
) -> Result<(StatusCode, Json<Notification>)> {
    input.validate()?;
    let notification = input.into_notification(&admin.uid, Utc::now());
    let saved = state.db.save_notification(&notification).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn mark_read(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<Notification>> {
    let mut notification = state
        .db
        .get_notification(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Notification {}", id)))?;

    if !notification.read {
        notification.mark_read(&admin.uid, Utc::now());
        notification = state.db.save_notification(&notification).await?;
    }
    Ok(Json(notification))
}

async fn delete_notification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state
        .db
        .get_notification(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Notification {}", id)))?;
    state.db.delete_notification(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
struct ClearResponse {
    deleted: usize,
}

async fn clear_notifications(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
) -> Result<Json<ClearResponse>> {
    let deleted = state.db.clear_notifications().await?;
    tracing::info!(deleted, admin = %admin.uid, "Notifications cleared");
    Ok(Json(ClearResponse { deleted }))
}
