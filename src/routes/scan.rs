// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scan result routes.

use crate::error::{AppError, Result};
use crate::models::ScanResult;
use crate::routes::DataResponse;
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/scan", post(create_scan).get(list_scans))
        .route("/scan/{id}", delete(delete_scan))
}

/// Scan submission body. Every field is required; presence is checked by the
/// handler so a miss yields 400 rather than a body-decode rejection.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateScanRequest {
    address: Option<String>,
    percentage: Option<f64>,
    result: Option<String>,
    result_arr: Option<Vec<f64>>,
    img_url: Option<String>,
}

/// Record a classifier result (POST).
async fn create_scan(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateScanRequest>,
) -> Result<impl IntoResponse> {
    let missing = AppError::BadRequest("Missing required fields".to_string());

    let (Some(address), Some(percentage), Some(result), Some(result_arr), Some(img_url)) = (
        body.address,
        body.percentage,
        body.result,
        body.result_arr,
        body.img_url,
    ) else {
        return Err(missing);
    };

    // Empty strings count as missing.
    if address.is_empty() || result.is_empty() || img_url.is_empty() {
        return Err(missing);
    }

    let scan = ScanResult {
        id: uuid::Uuid::new_v4().to_string(),
        address,
        percentage,
        result,
        result_arr,
        img_url,
        created_at: now_rfc3339(),
    };

    state.db.create_scan(&scan).await?;

    tracing::info!(scan_id = %scan.id, "Scan result saved");

    Ok((StatusCode::CREATED, Json(DataResponse::new(scan))))
}

/// Fetch all scan results, newest first (GET).
async fn list_scans(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DataResponse<Vec<ScanResult>>>> {
    let results = state.db.list_scans().await?;
    Ok(Json(DataResponse::new(results)))
}

/// Delete a scan result by ID (DELETE).
async fn delete_scan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<ScanResult>>> {
    // Check existence first so a miss is a 404, not a silent no-op.
    let existing = state
        .db
        .get_scan(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Scan result not found".to_string()))?;

    state.db.delete_scan(&id).await?;

    tracing::info!(scan_id = %id, "Scan result deleted");

    Ok(Json(DataResponse::with_message(
        existing,
        "Scan result deleted successfully",
    )))
}
