// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile update route (dual-write to Firebase Auth and the local store).

use crate::error::{AppError, Result};
use crate::models::User;
use crate::services::firebase_auth::FirebaseUser;
use crate::services::sync::ProfileUpdate;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::put,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/profile/update/{uid}", put(update_profile))
}

/// Display fields accepted by the profile update. No validation beyond
/// presence; values are passed through to both systems as-is.
#[derive(Deserialize)]
struct ProfileUpdateRequest {
    name: Option<String>,
    email: Option<String>,
    #[serde(rename = "photoURL")]
    photo_url: Option<String>,
    #[serde(rename = "emailVerified")]
    email_verified: Option<bool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileUpdateResponse {
    message: String,
    firebase_user: FirebaseUser,
    user: User,
}

/// Update a user's profile in Firebase Auth first, then in the local store.
///
/// Every failure surfaces as a 500 carrying the error message, including a
/// local-store miss after the provider write already succeeded; the two
/// systems are then inconsistent until the next sync.
async fn update_profile(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    Json(body): Json<ProfileUpdateRequest>,
) -> Result<Json<ProfileUpdateResponse>> {
    let update = ProfileUpdate {
        name: body.name,
        email: body.email,
        photo_url: body.photo_url,
        email_verified: body.email_verified,
    };

    match state.sync.update_profile(&uid, update).await {
        Ok((firebase_user, user)) => Ok(Json(ProfileUpdateResponse {
            message: "User updated successfully".to_string(),
            firebase_user,
            user,
        })),
        Err(e) => {
            tracing::error!(uid = %uid, error = %e, "Profile update failed");
            Err(AppError::FirebaseAuth(e.to_string()))
        }
    }
}
