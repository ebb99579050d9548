// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Administrative seed/sync script.
//!
//! Reconciles Firebase Auth identities into the local user store:
//!
//! ```text
//! seed <firebase-uid>     sync one identity (find-or-create the local row)
//! seed --all [max]        create local rows for every Firebase user
//! ```

use bananacare_api::{
    config::Config,
    db::FirestoreDb,
    services::{FirebaseAuthClient, UserSyncService},
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bananacare_api=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("Usage: seed <firebase-uid> | seed --all [max-results]");
        std::process::exit(2);
    }

    let config = Config::from_env()?;
    let db = FirestoreDb::new(&config.firebase_project_id).await?;
    let firebase = Arc::new(FirebaseAuthClient::new(&config)?);
    let sync = UserSyncService::new(firebase, db);

    if args[0] == "--all" {
        let max = args.get(1).and_then(|raw| raw.parse().ok()).unwrap_or(1000);
        let created = sync.sync_all(max).await?;
        tracing::info!(created, "Seed completed successfully");
    } else {
        let outcome = sync.sync_user(&args[0]).await?;
        tracing::info!(
            user_id = %outcome.user.id,
            created = outcome.created,
            "Seed completed successfully"
        );
    }

    Ok(())
}
