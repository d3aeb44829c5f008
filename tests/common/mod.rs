// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use bikerental_admin::config::Config;
use bikerental_admin::db::FirestoreDb;
use bikerental_admin::middleware::auth::create_session_jwt;
use bikerental_admin::models::Role;
use bikerental_admin::routes::create_router;
use bikerental_admin::services::{AnalyticsService, FirebaseAdmin, FirebaseTokenVerifier};
use bikerental_admin::AppState;
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use std::sync::Arc;

/// Key id of the fixture RSA key pair.
#[allow(dead_code)]
pub const TEST_KID: &str = "test-kid";

const TEST_PRIVATE_KEY: &[u8] = include_bytes!("../fixtures/firebase_test_key.pem");
const TEST_PUBLIC_KEY: &[u8] = include_bytes!("../fixtures/firebase_test_key.pub.pem");

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Firebase verifier trusting only the fixture key.
#[allow(dead_code)]
pub fn test_verifier(config: &Config) -> FirebaseTokenVerifier {
    let key = DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY).expect("fixture public key");
    FirebaseTokenVerifier::new_with_static_key(config, TEST_KID, key)
        .expect("static verifier")
}

/// Signing key for fake Firebase ID tokens.
#[allow(dead_code)]
pub fn test_firebase_signing_key() -> EncodingKey {
    EncodingKey::from_rsa_pem(TEST_PRIVATE_KEY).expect("fixture private key")
}

/// Standard Firebase ID token claims for `uid` in the test project.
#[allow(dead_code)]
pub fn firebase_claims(uid: &str) -> serde_json::Value {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    serde_json::json!({
        "iss": "https://securetoken.google.com/test-project",
        "aud": "test-project",
        "sub": uid,
        "iat": now - 10,
        "exp": now + 3600,
        "auth_time": now - 10,
        "email": format!("{uid}@example.com"),
        "email_verified": true,
    })
}

/// Sign `claims` as a Firebase ID token with the fixture key.
#[allow(dead_code)]
pub fn sign_firebase_token(claims: &serde_json::Value, kid: &str) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    encode(&header, claims, &test_firebase_signing_key()).expect("sign firebase token")
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_frontend_url(frontend_url: &str) -> (axum::Router, Arc<AppState>) {
    let mut config = Config::test_default();
    config.frontend_url = frontend_url.to_string();
    create_test_app_with_config(config)
}

fn create_test_app_with_config(config: Config) -> (axum::Router, Arc<AppState>) {
    let db = test_db_offline();
    build_test_app(config, db)
}

/// API app backed by the Firestore emulator.
#[allow(dead_code)]
pub async fn create_emulator_app() -> (axum::Router, Arc<AppState>) {
    build_test_app(Config::test_default(), test_db().await)
}

fn build_test_app(config: Config, db: FirestoreDb) -> (axum::Router, Arc<AppState>) {
    let firebase_verifier = Arc::new(test_verifier(&config));
    let firebase_admin =
        Arc::new(FirebaseAdmin::disabled(&config.firebase_project_id).expect("admin client"));
    let analytics = AnalyticsService::new(db.clone());

    let state = Arc::new(AppState {
        config,
        db,
        firebase_verifier,
        firebase_admin,
        analytics,
    });

    (create_router(state.clone()), state)
}

/// Session token for `uid` with `role`, signed with the app's key.
#[allow(dead_code)]
pub fn session_token(state: &AppState, uid: &str, role: &Role) -> String {
    create_session_jwt(uid, role, 1, &state.config.jwt_signing_key).expect("session token")
}
