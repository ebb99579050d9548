// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Contact inquiry routes.

use crate::error::{AppError, Result};
use crate::models::{InquiryMessage, InquiryStatus, InquiryUpdate};
use crate::routes::DataResponse;
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

const DEFAULT_PRIORITY: &str = "low";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/inquiries", post(create_inquiry).get(list_inquiries))
        .route(
            "/inquiries/{id}",
            get(get_inquiry)
                .patch(update_inquiry)
                .delete(delete_inquiry),
        )
}

#[derive(Deserialize)]
struct CreateInquiryRequest {
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    message: Option<String>,
    priority: Option<String>,
}

/// Create an inquiry (POST).
async fn create_inquiry(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateInquiryRequest>,
) -> Result<impl IntoResponse> {
    let missing =
        AppError::BadRequest("Name, email, and message are required.".to_string());

    let (Some(name), Some(email), Some(message)) = (body.name, body.email, body.message) else {
        return Err(missing);
    };
    if name.is_empty() || email.is_empty() || message.is_empty() {
        return Err(missing);
    }

    let now = now_rfc3339();
    let inquiry = InquiryMessage {
        id: uuid::Uuid::new_v4().to_string(),
        name,
        email,
        phone: body.phone,
        message,
        priority: body.priority.unwrap_or_else(|| DEFAULT_PRIORITY.to_string()),
        status: InquiryStatus::Unread,
        replied: false,
        reply: None,
        replied_at: None,
        created_at: now.clone(),
        updated_at: now,
    };

    state.db.create_inquiry(&inquiry).await?;

    tracing::info!(inquiry_id = %inquiry.id, "Inquiry received");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::with_message(inquiry, "Message received.")),
    ))
}

/// Fetch all inquiries, newest first (GET).
async fn list_inquiries(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DataResponse<Vec<InquiryMessage>>>> {
    let inquiries = state.db.list_inquiries().await?;
    Ok(Json(DataResponse::new(inquiries)))
}

/// Fetch a single inquiry (GET).
async fn get_inquiry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<InquiryMessage>>> {
    let inquiry = state
        .db
        .get_inquiry(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Inquiry not found.".to_string()))?;

    Ok(Json(DataResponse::new(inquiry)))
}

#[derive(Deserialize)]
struct UpdateInquiryRequest {
    status: Option<String>,
    replied: Option<bool>,
    reply: Option<String>,
}

/// Update an inquiry (PATCH).
///
/// `status` must be one of unread/read/replied when supplied; supplying a
/// `reply` forces `replied = true` and stamps `repliedAt` regardless of the
/// other fields in the same request.
async fn update_inquiry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateInquiryRequest>,
) -> Result<Json<DataResponse<InquiryMessage>>> {
    // An empty status string is ignored rather than rejected.
    let status = match body.status.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(
            InquiryStatus::parse(raw)
                .ok_or_else(|| AppError::BadRequest("Invalid status value".to_string()))?,
        ),
    };

    let update = InquiryUpdate {
        status,
        replied: body.replied,
        reply: body.reply,
    };

    let updated = state.db.update_inquiry(&id, &update).await.map_err(|e| {
        if e.is_not_found() {
            AppError::NotFound("Inquiry not found.".to_string())
        } else {
            e
        }
    })?;

    tracing::info!(inquiry_id = %id, "Inquiry updated");

    Ok(Json(DataResponse::with_message(
        updated,
        "Inquiry updated successfully.",
    )))
}

/// Delete an inquiry (DELETE).
async fn delete_inquiry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DataResponse<InquiryMessage>>> {
    let existing = state
        .db
        .get_inquiry(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Inquiry not found.".to_string()))?;

    state.db.delete_inquiry(&id).await?;

    tracing::info!(inquiry_id = %id, "Inquiry deleted");

    Ok(Json(DataResponse::with_message(
        existing,
        "Inquiry deleted successfully.",
    )))
}
