// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use bananacare_api::config::Config;
use bananacare_api::db::FirestoreDb;
use bananacare_api::routes::create_router;
use bananacare_api::services::{CloudinaryClient, FirebaseAuthClient, UserSyncService};
use bananacare_api::AppState;
use std::sync::Arc;

/// Check if the Firestore emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Check if the Firebase Auth emulator is available via environment variable.
#[allow(dead_code)]
pub fn auth_emulator_available() -> bool {
    std::env::var("FIREBASE_AUTH_EMULATOR_HOST").is_ok()
}

/// Skip test with message if the Firestore emulator is not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Skip test with message unless both emulators are available.
#[macro_export]
macro_rules! require_both_emulators {
    () => {
        if !crate::common::emulator_available() || !crate::common::auth_emulator_available() {
            eprintln!(
                "⚠️  Skipping: FIRESTORE_EMULATOR_HOST and FIREBASE_AUTH_EMULATOR_HOST not both set"
            );
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

/// Create a test app around the given database.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app_with_db(db: FirestoreDb) -> (axum::Router, Arc<AppState>) {
    let config = Config::default();
    let firebase = Arc::new(FirebaseAuthClient::new(&config).expect("Firebase Auth client"));
    let cloudinary = CloudinaryClient::new(&config);
    let sync = UserSyncService::new(firebase.clone(), db.clone());

    let state = Arc::new(AppState {
        config,
        db,
        firebase,
        cloudinary,
        sync,
    });

    (create_router(state.clone()), state)
}

/// Create a test app with offline mock dependencies.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with_db(test_db_offline())
}
