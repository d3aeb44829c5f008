// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! GCash payment review and the payment settings shown in the app.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::payment::{self, PaymentReviewStatus, PaymentStats};
use crate::models::{Payment, PaymentSettings};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/payments", get(list_payments))
        .route("/api/payments/stats", get(payment_stats))
        .route("/api/payments/{id}", get(get_payment))
        .route("/api/payments/{id}/status", put(review_payment))
        .route(
            "/api/settings/payment",
            get(get_payment_settings).put(set_payment_settings),
        )
}

#[derive(Deserialize)]
struct PaymentQuery {
    status: Option<String>,
    search: Option<String>,
}

async fn list_payments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PaymentQuery>,
) -> Result<Json<Vec<Payment>>> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(raw) => Some(raw.parse::<PaymentReviewStatus>()?),
    };
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let payments = state
        .db
        .list_payments()
        .await?
        .into_iter()
        .filter(|p| status.is_none_or(|s| p.status == s))
        .filter(|p| search.is_none_or(|term| p.matches_search(term)))
        .collect();
    Ok(Json(payments))
}

async fn payment_stats(State(state): State<Arc<AppState>>) -> Result<Json<PaymentStats>> {
    let payments = state.db.list_payments().await?;
    Ok(Json(payment::summarize(&payments)))
}

async fn get_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Payment>> {
    let payment = state
        .db
        .get_payment(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Payment {}", id)))?;
    Ok(Json(payment))
}

#[derive(Deserialize)]
struct ReviewRequest {
    status: String,
}

async fn review_payment(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<ReviewRequest>,
) -> Result<Json<Payment>> {
    let decision: PaymentReviewStatus = body.status.parse()?;
    if decision == PaymentReviewStatus::Pending {
        return Err(AppError::BadRequest(
            "A payment can only be CONFIRMED or REJECTED".to_string(),
        ));
    }

    // Record who reviewed it the way the dashboard shows it: email when known.
    let reviewer = state
        .db
        .get_user(&admin.uid)
        .await?
        .and_then(|user| user.email)
        .unwrap_or_else(|| admin.uid.clone());

    let payment = state
        .db
        .review_payment_atomic(&id, decision, &reviewer)
        .await?;
    tracing::info!(payment_id = %id, status = ?decision, admin = %admin.uid, "Payment status changed");
    Ok(Json(payment))
}

/// Current settings, or the defaults when none have been saved.
async fn get_payment_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PaymentSettings>> {
    let settings = state.db.get_payment_settings().await?.unwrap_or_default();
    Ok(Json(settings))
}

async fn set_payment_settings(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Json(body): Json<PaymentSettings>,
) -> Result<Json<PaymentSettings>> {
    let settings = body.normalized()?;
    state.db.set_payment_settings(&settings).await?;
    tracing::info!(
        gcash_number = %settings.gcash_number,
        admin = %admin.uid,
        "Payment settings updated"
    );
    Ok(Json(settings))
}
