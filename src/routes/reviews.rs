// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Review moderation routes.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::Review;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

const MAX_LIMIT: u32 = 500;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/reviews", get(list_reviews))
        .route("/api/reviews/{id}", delete(delete_review))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewQuery {
    bike_id: Option<String>,
    limit: Option<u32>,
}

async fn list_reviews(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReviewQuery>,
) -> Result<Json<Vec<Review>>> {
    let bike_id = query.bike_id.as_deref().filter(|id| !id.is_empty());
    let limit = query.limit.map(|l| l.clamp(1, MAX_LIMIT));
    Ok(Json(state.db.list_reviews(bike_id, limit).await?))
}

async fn delete_review(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let review = state.db.delete_review(&id).await?;
    state.analytics.invalidate_reviews();
    state.analytics.invalidate_bikes();
    tracing::info!(review_id = %id, bike_id = %review.bike_id, admin = %admin.uid, "Review removed");
    Ok(StatusCode::NO_CONTENT)
}
