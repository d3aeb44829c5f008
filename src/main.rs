// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bike Rental Admin API Server
//!
//! Serves the fleet dashboard: admins sign in with Firebase and manage bikes,
//! riders, rides and bookings stored in Firestore.

use bikerental_admin::{
    config::Config,
    db::FirestoreDb,
    services::{AnalyticsService, FirebaseAdmin, FirebaseTokenVerifier},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Bike Rental Admin API");

    let db = FirestoreDb::new(&config.gcp_project_id).await?;

    let firebase_verifier = Arc::new(FirebaseTokenVerifier::new(&config)?);
    let firebase_admin = Arc::new(FirebaseAdmin::from_config(&config).await?);

    let analytics = AnalyticsService::new(db.clone());
    tracing::info!("Analytics snapshot cache initialized");

    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        firebase_verifier,
        firebase_admin,
        analytics,
    });

    let app = bikerental_admin::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bikerental_admin=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
