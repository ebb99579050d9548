// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - external clients and business logic.

pub mod cloudinary;
pub mod firebase_auth;
pub mod sync;

pub use cloudinary::CloudinaryClient;
pub use firebase_auth::FirebaseAuthClient;
pub use sync::UserSyncService;
