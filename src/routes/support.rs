// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Support inbox and FAQ management.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::support::{FaqInput, MessageStatus, RESPONSE_FIELDS, STATUS_FIELDS};
use crate::models::{Faq, SupportMessage};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/support/messages", get(list_messages))
        .route("/api/support/messages/{id}/status", put(set_message_status))
        .route("/api/support/messages/{id}/response", post(respond_to_message))
        .route("/api/support/faqs", get(list_faqs).post(create_faq))
        .route("/api/support/faqs/{id}", put(update_faq).delete(delete_faq))
}

async fn load_message(state: &AppState, id: &str) -> Result<SupportMessage> {
    state
        .db
        .get_support_message(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Support message {}", id)))
}

#[derive(Deserialize)]
struct MessageQuery {
    status: Option<String>,
    search: Option<String>,
}

async fn list_messages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MessageQuery>,
) -> Result<Json<Vec<SupportMessage>>> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(raw) => Some(raw.parse::<MessageStatus>()?),
    };
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let messages = state
        .db
        .list_support_messages()
        .await?
        .into_iter()
        .filter(|m| status.is_none_or(|s| m.status == s))
        .filter(|m| search.is_none_or(|term| m.matches_search(term)))
        .collect();
    Ok(Json(messages))
}

#[derive(Deserialize)]
struct StatusRequest {
    status: String,
}

async fn set_message_status(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<SupportMessage>> {
    let status: MessageStatus = body.status.parse()?;

    let mut message = load_message(&state, &id).await?;
    message.set_status(status, Utc::now());
    state.db.patch_support_message(&message, &STATUS_FIELDS).await?;

    tracing::info!(message_id = %id, status = ?status, admin = %admin.uid, "Support message status changed");
    Ok(Json(message))
}

#[derive(Deserialize)]
struct ResponseRequest {
    response: String,
}

async fn respond_to_message(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<ResponseRequest>,
) -> Result<Json<SupportMessage>> {
    if body.response.trim().is_empty() {
        return Err(AppError::BadRequest("Response cannot be empty".to_string()));
    }

    let mut message = load_message(&state, &id).await?;
    message.respond(&body.response, Utc::now())?;
    state
        .db
        .patch_support_message(&message, &RESPONSE_FIELDS)
        .await?;

    tracing::info!(message_id = %id, admin = %admin.uid, "Support message answered");
    Ok(Json(message))
}

async fn list_faqs(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Faq>>> {
    Ok(Json(state.db.list_faqs().await?))
}

async fn create_faq(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Json(body): Json<FaqInput>,
) -> Result<(StatusCode, Json<Faq>)> {
    body.validate()?;

    let existing = state.db.list_faqs().await?;
    let last = existing.iter().map(|f| f.order as usize).max().unwrap_or(0);
    let faq = body.into_faq(last.max(existing.len()), Utc::now());
    state.db.save_faq(&faq).await?;

    tracing::info!(faq_id = %faq.id, admin = %admin.uid, "FAQ created");
    Ok((StatusCode::CREATED, Json(faq)))
}

async fn update_faq(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<FaqInput>,
) -> Result<Json<Faq>> {
    body.validate()?;

    let mut faq = state
        .db
        .get_faq(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("FAQ {}", id)))?;
    faq.apply(&body, Utc::now());
    state.db.update_faq(&faq).await?;

    tracing::info!(faq_id = %id, admin = %admin.uid, "FAQ updated");
    Ok(Json(faq))
}

async fn delete_faq(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    if state.db.get_faq(&id).await?.is_none() {
        return Err(AppError::NotFound(format!("FAQ {}", id)));
    }
    state.db.delete_faq(&id).await?;

    tracing::info!(faq_id = %id, admin = %admin.uid, "FAQ deleted");
    Ok(StatusCode::NO_CONTENT)
}
