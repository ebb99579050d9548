// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Media upload route (proxied to Cloudinary).

use crate::error::{AppError, Result};
use crate::AppState;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Upload size cap (10 MB).
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/upload",
        post(upload_image).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
    )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    public_id: String,
    public_url: String,
}

/// Accept a single multipart `file` field and stream it to Cloudinary.
async fn upload_image(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let mut file: Option<(Vec<u8>, Option<String>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().map(ToString::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            file = Some((data.to_vec(), filename));
        }
    }

    let (data, filename) = file.ok_or_else(|| AppError::BadRequest("File not found".to_string()))?;

    let result = state.cloudinary.upload(data, filename).await?;

    Ok(Json(UploadResponse {
        public_id: result.public_id,
        public_url: result.secure_url,
    }))
}
