// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! BananaCare API Server
//!
//! Records banana-ripeness scan results and contact inquiries, keeps the
//! local user store in sync with Firebase Auth, and proxies image uploads
//! to Cloudinary.

use bananacare_api::{
    config::Config,
    db::FirestoreDb,
    services::{CloudinaryClient, FirebaseAuthClient, UserSyncService},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting BananaCare API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.firebase_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Initialize Firebase Auth client
    let firebase =
        Arc::new(FirebaseAuthClient::new(&config).expect("Failed to initialize Firebase Auth"));
    tracing::info!(
        project = %config.firebase_project_id,
        "Firebase Auth client initialized"
    );

    // Initialize Cloudinary client
    let cloudinary = CloudinaryClient::new(&config);

    // Initialize identity synchronization service
    let sync = UserSyncService::new(firebase.clone(), db.clone());

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        firebase,
        cloudinary,
        sync,
    });

    // Build router
    let app = bananacare_api::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bananacare_api=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
