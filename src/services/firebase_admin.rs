// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase Auth account administration.
//!
//! Deleting a rider removes their sign-in account, and blocking sets a
//! `blocked` custom claim the mobile app checks on its next token refresh.
//! Both go through the Identity Toolkit REST API with the service account's
//! OAuth token, or the Auth emulator when `FIREBASE_AUTH_EMULATOR_HOST` is set.

use crate::config::Config;
use crate::error::AppError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
/// The Auth emulator accepts this bearer token as an admin credential.
const EMULATOR_TOKEN: &str = "Bearer owner";

/// Account administration failures.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("no Firebase Auth account for this uid")]
    UserNotFound,
    #[error("credential error: {0}")]
    Credentials(String),
    #[error("Identity Toolkit request failed: {0}")]
    Request(String),
}

impl From<AdminError> for AppError {
    fn from(err: AdminError) -> Self {
        AppError::Internal(anyhow::anyhow!(err))
    }
}

enum AdminMode {
    Google(gcloud_sdk::GoogleAuthTokenGenerator),
    Emulator,
    /// No Auth backend (tests, Firestore-only local runs). Calls are logged
    /// and skipped.
    Disabled,
}

/// Client for the Firebase Auth admin operations the dashboard needs.
pub struct FirebaseAdmin {
    http_client: reqwest::Client,
    base_url: String,
    project_id: String,
    mode: AdminMode,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteAccountRequest<'a> {
    local_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateAccountRequest<'a> {
    local_id: &'a str,
    /// JSON-encoded claims object; replaces any existing custom claims.
    custom_attributes: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

impl FirebaseAdmin {
    /// Build the client the config asks for.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        if let Some(host) = &config.auth_emulator_host {
            tracing::info!(host = %host, "Using Firebase Auth emulator for account admin");
            return Self::new_emulator(&config.firebase_project_id, host);
        }
        if !config.auth_admin_enabled {
            tracing::warn!("Firebase Auth admin disabled; account changes stay in Firestore");
            return Self::disabled(&config.firebase_project_id);
        }

        let tokens = gcloud_sdk::GoogleAuthTokenGenerator::new(
            gcloud_sdk::TokenSourceType::Default,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
        )
        .await
        .context("failed loading Google credentials for Firebase Auth admin")?;

        tracing::info!(
            project_id = %config.firebase_project_id,
            "Initialized Firebase Auth admin client"
        );
        Self::build(
            IDENTITY_TOOLKIT_URL.to_string(),
            &config.firebase_project_id,
            AdminMode::Google(tokens),
        )
    }

    /// Client for the Auth emulator at `host` (e.g. `127.0.0.1:9099`).
    pub fn new_emulator(project_id: &str, host: &str) -> anyhow::Result<Self> {
        let host = host.trim_end_matches('/');
        let base = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("http://{host}")
        };
        Self::build(
            format!("{base}/identitytoolkit.googleapis.com"),
            project_id,
            AdminMode::Emulator,
        )
    }

    /// Client that performs no Auth calls.
    pub fn disabled(project_id: &str) -> anyhow::Result<Self> {
        Self::build(IDENTITY_TOOLKIT_URL.to_string(), project_id, AdminMode::Disabled)
    }

    fn build(base_url: String, project_id: &str, mode: AdminMode) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building Identity Toolkit HTTP client")?;

        Ok(Self {
            http_client,
            base_url,
            project_id: project_id.to_string(),
            mode,
        })
    }

    /// Delete the sign-in account. A uid with no account counts as deleted.
    pub async fn delete_account(&self, uid: &str) -> Result<(), AdminError> {
        match self
            .post("accounts:delete", &DeleteAccountRequest { local_id: uid })
            .await
        {
            Ok(()) => {
                tracing::info!(uid, "Deleted Firebase Auth account");
                Ok(())
            }
            Err(AdminError::UserNotFound) => {
                tracing::info!(uid, "No Firebase Auth account to delete");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Set the `blocked` custom claim.
    pub async fn set_blocked_claim(&self, uid: &str, blocked: bool) -> Result<(), AdminError> {
        let request = UpdateAccountRequest {
            local_id: uid,
            custom_attributes: blocked_claims(blocked),
        };
        self.post("accounts:update", &request).await?;
        tracing::info!(uid, blocked, "Updated Firebase Auth blocked claim");
        Ok(())
    }

    async fn authorization(&self) -> Result<Option<String>, AdminError> {
        match &self.mode {
            AdminMode::Google(tokens) => tokens
                .create_token()
                .await
                .map(|token| Some(token.header_value()))
                .map_err(|e| AdminError::Credentials(e.to_string())),
            AdminMode::Emulator => Ok(Some(EMULATOR_TOKEN.to_string())),
            AdminMode::Disabled => Ok(None),
        }
    }

    async fn post<B: Serialize>(&self, method: &str, body: &B) -> Result<(), AdminError> {
        let Some(authorization) = self.authorization().await? else {
            tracing::debug!(method, "Firebase Auth admin disabled; skipping call");
            return Ok(());
        };

        let url = format!(
            "{}/v1/projects/{}/{}",
            self.base_url, self.project_id, method
        );
        let response = self
            .http_client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .json(body)
            .send()
            .await
            .map_err(|e| AdminError::Request(format!("{method}: {e}")))?;

        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        match error_code(&text) {
            Some(code) if code.starts_with("USER_NOT_FOUND") => Err(AdminError::UserNotFound),
            Some(code) => Err(AdminError::Request(format!("{method}: {status} {code}"))),
            None => Err(AdminError::Request(format!("{method}: {status}"))),
        }
    }
}

/// Custom claims JSON for the blocked flag.
fn blocked_claims(blocked: bool) -> String {
    serde_json::json!({ "blocked": blocked }).to_string()
}

/// Error code from an Identity Toolkit error body, e.g. `USER_NOT_FOUND`.
fn error_code(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error.message)
        .filter(|message| !message.is_empty())
}
