// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin sign-in: exchange a Firebase ID token for a session cookie.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_session_jwt, SESSION_COOKIE};
use crate::models::Role;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/session", post(create_session))
        .route("/auth/logout", post(logout))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRequest {
    #[serde(default)]
    id_token: String,
}

#[derive(Serialize)]
struct SessionResponse {
    uid: String,
    email: Option<String>,
    role: String,
}

fn session_cookie(value: String, max_age: time::Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}

fn cookies_secure(state: &AppState) -> bool {
    state.config.frontend_url.starts_with("https://")
}

/// Verify a Firebase sign-in and start an admin session.
async fn create_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<SessionRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    if body.id_token.trim().is_empty() {
        return Err(AppError::BadRequest("idToken is required".to_string()));
    }

    let identity = state.firebase_verifier.verify_id_token(&body.id_token).await?;

    let user = state
        .db
        .get_user(&identity.uid)
        .await?
        .ok_or_else(|| AppError::Forbidden("No user profile for this account".to_string()))?;

    if !user.is_administrator() {
        tracing::warn!(uid = %identity.uid, "Sign-in refused: not an administrator");
        return Err(AppError::Forbidden("Administrator access required".to_string()));
    }
    if user.is_blocked {
        tracing::warn!(uid = %identity.uid, "Sign-in refused: account blocked");
        return Err(AppError::Forbidden("Account is blocked".to_string()));
    }

    // An `isAdmin` flag without an admin role string still signs in as admin.
    let role = Some(user.effective_role())
        .filter(Role::is_admin)
        .unwrap_or(Role::Admin);

    let token = create_session_jwt(
        &identity.uid,
        &role,
        state.config.session_ttl_hours,
        &state.config.jwt_signing_key,
    )?;

    let cookie = session_cookie(
        token,
        time::Duration::hours(state.config.session_ttl_hours),
        cookies_secure(&state),
    );

    tracing::info!(uid = %identity.uid, role = role.as_str(), "Admin signed in");

    Ok((
        jar.add(cookie),
        Json(SessionResponse {
            uid: identity.uid,
            email: identity.email.or(user.email),
            role: role.as_str().to_string(),
        }),
    ))
}

/// Clear the session cookie.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, StatusCode) {
    let cleared = session_cookie(String::new(), time::Duration::ZERO, cookies_secure(&state));
    (jar.add(cleared), StatusCode::NO_CONTENT)
}
