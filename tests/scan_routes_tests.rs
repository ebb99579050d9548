// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scan route validation tests (offline: no persistence call may succeed).

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use tower::ServiceExt;

mod common;

fn scan_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/scan")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_scan_missing_field_is_rejected() {
    let (app, _state) = common::create_test_app();

    // percentage is absent
    let response = app
        .oneshot(scan_request(serde_json::json!({
            "address": "0x1",
            "result": "ripe",
            "resultArr": [1.0, 2.0],
            "imgUrl": "http://x/y.png"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_scan_empty_string_counts_as_missing() {
    let (app, _state) = common::create_test_app();

    let response = app
        .oneshot(scan_request(serde_json::json!({
            "address": "",
            "percentage": 82.0,
            "result": "ripe",
            "resultArr": [1.0, 2.0],
            "imgUrl": "http://x/y.png"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_scan_valid_body_reaches_persistence() {
    let (app, _state) = common::create_test_app();

    // The offline mock errors on any database access, so a 500 here proves
    // validation passed and the handler attempted the write.
    let response = app
        .oneshot(scan_request(serde_json::json!({
            "address": "0x1",
            "percentage": 82.0,
            "result": "ripe",
            "resultArr": [1.0, 2.0],
            "imgUrl": "http://x/y.png"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_scan_list_surfaces_database_errors() {
    let (app, _state) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/scan")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_health_check() {
    let (app, _state) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
