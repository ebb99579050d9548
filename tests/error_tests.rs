// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use bananacare_api::error::AppError;

fn status_of(err: AppError) -> StatusCode {
    err.into_response().status()
}

#[test]
fn test_error_status_mapping() {
    assert_eq!(
        status_of(AppError::NotFound("user".to_string())),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        status_of(AppError::BadRequest("missing field".to_string())),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        status_of(AppError::Conflict("duplicate uid".to_string())),
        StatusCode::CONFLICT
    );
    assert_eq!(
        status_of(AppError::FirebaseAuth("USER_DISABLED".to_string())),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        status_of(AppError::Database("offline".to_string())),
        StatusCode::INTERNAL_SERVER_ERROR
    );
    assert_eq!(
        status_of(AppError::Upload("stream closed".to_string())),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn test_is_not_found() {
    assert!(AppError::NotFound("x".to_string()).is_not_found());
    assert!(!AppError::Conflict("x".to_string()).is_not_found());
    assert!(!AppError::Database("x".to_string()).is_not_found());
}
