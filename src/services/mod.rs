// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod analytics;
pub mod cache;
pub mod firebase_admin;
pub mod firebase_auth;
pub mod maps;
pub mod qr;
pub mod ride_metrics;

pub use analytics::AnalyticsService;
pub use firebase_admin::FirebaseAdmin;
pub use firebase_auth::{FirebaseIdentity, FirebaseTokenVerifier, TokenError};
