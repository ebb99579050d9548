// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! BananaCare API: backend for the banana-ripeness-scanning app.
//!
//! This crate provides the REST backend recording classifier scan results
//! and contact inquiries, synchronizing Firebase Auth identities with the
//! local user store, and proxying image uploads to Cloudinary.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{CloudinaryClient, FirebaseAuthClient, UserSyncService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub firebase: Arc<FirebaseAuthClient>,
    pub cloudinary: CloudinaryClient,
    pub sync: UserSyncService,
}
