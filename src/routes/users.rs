// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User management routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::user::{UserResponse, VerificationStatus};
use crate::models::{Ride, Role, User};
use crate::services::firebase_admin::AdminError;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users", get(list_users))
        .route("/api/users/roles", get(list_roles))
        .route("/api/users/{id}", get(get_user).delete(delete_user))
        .route("/api/users/{id}/role", put(set_role))
        .route("/api/users/{id}/verification", put(set_verification))
        .route("/api/users/{id}/block", put(set_blocked))
        .route("/api/users/{id}/rides", get(user_rides))
}

async fn load_user(state: &AppState, uid: &str) -> Result<User> {
    state
        .db
        .get_user(uid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {}", uid)))
}

async fn save(state: &AppState, user: &User) -> Result<()> {
    state.db.save_user(user).await?;
    state.analytics.invalidate_users();
    Ok(())
}

#[derive(Deserialize)]
struct UserFilter {
    role: Option<String>,
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<UserFilter>,
) -> Result<Json<Vec<UserResponse>>> {
    let users = state.db.list_users().await?;
    let role = filter.role.as_deref().map(str::trim).filter(|r| !r.is_empty());

    let users = users
        .iter()
        .filter(|u| role.is_none_or(|r| u.effective_role().as_str().eq_ignore_ascii_case(r)))
        .map(UserResponse::from)
        .collect();
    Ok(Json(users))
}

/// Roles in use, plus the built-in ones.
async fn list_roles(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>> {
    let users = state.analytics.users().await?;
    let mut roles: BTreeSet<String> = [Role::User, Role::Admin]
        .iter()
        .map(|r| r.as_str().to_string())
        .collect();
    roles.extend(users.iter().map(|u| u.effective_role().as_str().to_string()));
    Ok(Json(roles.into_iter().collect()))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>> {
    let user = load_user(&state, &id).await?;
    Ok(Json(UserResponse::from(&user)))
}

#[derive(Deserialize)]
struct RoleRequest {
    role: String,
}

async fn set_role(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<RoleRequest>,
) -> Result<Json<UserResponse>> {
    let role = Role::parse(&body.role)?;
    if id == admin.uid && !role.is_admin() {
        return Err(AppError::BadRequest(
            "You cannot remove your own admin role".to_string(),
        ));
    }

    let mut user = load_user(&state, &id).await?;
    user.set_role(role, Utc::now());
    save(&state, &user).await?;

    tracing::info!(
        uid = %id,
        role = user.effective_role().as_str(),
        admin = %admin.uid,
        "User role changed"
    );
    Ok(Json(UserResponse::from(&user)))
}

#[derive(Deserialize)]
struct VerificationRequest {
    status: VerificationStatus,
}

async fn set_verification(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<VerificationRequest>,
) -> Result<Json<UserResponse>> {
    let mut user = load_user(&state, &id).await?;
    user.id_verification_status = Some(body.status);
    user.updated_at = Some(Utc::now());
    save(&state, &user).await?;

    tracing::info!(uid = %id, status = ?body.status, admin = %admin.uid, "ID verification reviewed");
    Ok(Json(UserResponse::from(&user)))
}

#[derive(Deserialize)]
struct BlockRequest {
    blocked: bool,
}

async fn set_blocked(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<BlockRequest>,
) -> Result<Json<UserResponse>> {
    if id == admin.uid {
        return Err(AppError::BadRequest("You cannot block yourself".to_string()));
    }

    let mut user = load_user(&state, &id).await?;

    // Claim first so a failed Auth call leaves the profile unchanged.
    match state.firebase_admin.set_blocked_claim(&id, body.blocked).await {
        Ok(()) => {}
        Err(AdminError::UserNotFound) => {
            tracing::warn!(uid = %id, "No Firebase Auth account; updating profile only");
        }
        Err(e) => return Err(e.into()),
    }

    user.is_blocked = body.blocked;
    user.updated_at = Some(Utc::now());
    save(&state, &user).await?;

    tracing::info!(uid = %id, blocked = body.blocked, admin = %admin.uid, "User block changed");
    Ok(Json(UserResponse::from(&user)))
}

/// Delete the user's Firebase Auth account, then their profile document.
async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    if id == admin.uid {
        return Err(AppError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }

    load_user(&state, &id).await?;
    if state.db.user_has_live_ride(&id).await? {
        return Err(AppError::Conflict(
            "User has an active ride; end it before deleting the user".to_string(),
        ));
    }

    state.firebase_admin.delete_account(&id).await?;
    state.db.delete_user(&id).await?;
    state.analytics.invalidate_users();
    tracing::info!(uid = %id, admin = %admin.uid, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn user_rides(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Ride>>> {
    Ok(Json(state.db.list_rides_for_user(&id).await?))
}
