// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase ID token verification against the fixture signing key.

use bikerental_admin::config::Config;
use bikerental_admin::services::TokenError;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use std::time::{SystemTime, UNIX_EPOCH};

mod common;

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

async fn verify(token: &str) -> Result<String, TokenError> {
    let verifier = common::test_verifier(&Config::test_default());
    verifier.verify_id_token(token).await.map(|id| id.uid)
}

fn assert_invalid(result: Result<String, TokenError>) {
    assert!(
        matches!(result, Err(TokenError::Invalid(_))),
        "expected invalid token, got {result:?}"
    );
}

#[tokio::test]
async fn test_valid_token_yields_identity() {
    let claims = common::firebase_claims("admin-1");
    let token = common::sign_firebase_token(&claims, common::TEST_KID);

    let verifier = common::test_verifier(&Config::test_default());
    let identity = verifier.verify_id_token(&token).await.unwrap();

    assert_eq!(identity.uid, "admin-1");
    assert_eq!(identity.email.as_deref(), Some("admin-1@example.com"));
    assert!(identity.email_verified);
}

#[tokio::test]
async fn test_wrong_audience_rejected() {
    let mut claims = common::firebase_claims("admin-1");
    claims["aud"] = "other-project".into();

    assert_invalid(verify(&common::sign_firebase_token(&claims, common::TEST_KID)).await);
}

#[tokio::test]
async fn test_wrong_issuer_rejected() {
    let mut claims = common::firebase_claims("admin-1");
    claims["iss"] = "https://securetoken.google.com/other-project".into();

    assert_invalid(verify(&common::sign_firebase_token(&claims, common::TEST_KID)).await);
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let now = now_secs();
    let mut claims = common::firebase_claims("admin-1");
    claims["iat"] = (now - 7200).into();
    claims["auth_time"] = (now - 7200).into();
    claims["exp"] = (now - 3600).into();

    assert_invalid(verify(&common::sign_firebase_token(&claims, common::TEST_KID)).await);
}

#[tokio::test]
async fn test_unknown_kid_rejected() {
    let claims = common::firebase_claims("admin-1");

    assert_invalid(verify(&common::sign_firebase_token(&claims, "rotated-away")).await);
}

#[tokio::test]
async fn test_future_issued_at_rejected() {
    let mut claims = common::firebase_claims("admin-1");
    claims["iat"] = (now_secs() + 3600).into();

    assert_invalid(verify(&common::sign_firebase_token(&claims, common::TEST_KID)).await);
}

#[tokio::test]
async fn test_missing_issued_at_rejected() {
    let mut claims = common::firebase_claims("admin-1");
    claims.as_object_mut().unwrap().remove("iat");

    assert_invalid(verify(&common::sign_firebase_token(&claims, common::TEST_KID)).await);
}

#[tokio::test]
async fn test_empty_subject_rejected() {
    let claims = common::firebase_claims("");

    assert_invalid(verify(&common::sign_firebase_token(&claims, common::TEST_KID)).await);
}

#[tokio::test]
async fn test_hs256_token_rejected() {
    let claims = common::firebase_claims("admin-1");
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(common::TEST_KID.to_string());
    let token = encode(&header, &claims, &EncodingKey::from_secret(b"not-google")).unwrap();

    assert_invalid(verify(&token).await);
}

#[tokio::test]
async fn test_garbage_rejected() {
    assert_invalid(verify("definitely-not-a-jwt").await);
    assert_invalid(verify("   ").await);
}
