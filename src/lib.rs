// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Bike rental admin API
//!
//! Backend for the fleet dashboard: bike inventory, users, ride tracking,
//! bookings and analytics over the rental app's Firestore data.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{AnalyticsService, FirebaseAdmin, FirebaseTokenVerifier};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub firebase_verifier: Arc<FirebaseTokenVerifier>,
    pub firebase_admin: Arc<FirebaseAdmin>,
    pub analytics: AnalyticsService,
}
