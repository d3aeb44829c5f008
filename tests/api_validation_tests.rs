// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request validation tests.
//!
//! Each request here is malformed and must be rejected with 400 before the
//! handler touches the database (the test app runs against an offline DB,
//! so anything that reaches it would come back as 500).

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use bikerental_admin::models::Role;
use serde_json::{json, Value};
use tower::ServiceExt;

mod common;

const ADMIN_UID: &str = "admin-1";

async fn send(method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (app, state) = common::create_test_app();
    let token = common::session_token(&state, ADMIN_UID, &Role::Admin);

    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"));
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn assert_bad_request(status: StatusCode, body: &Value, needle: &str) {
    assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
    assert_eq!(body["error"], "bad_request");
    let details = body["details"].as_str().unwrap_or_default();
    assert!(
        details.contains(needle),
        "expected '{needle}' in details, got '{details}'"
    );
}

fn valid_bike() -> Value {
    json!({
        "name": "City Cruiser",
        "type": "city",
        "price": 2.5,
        "imageUrl": "https://img.example.com/cruiser.jpg",
        "latitude": 37.42,
        "longitude": -122.08
    })
}

// ─── Bikes ───────────────────────────────────────────────────

#[tokio::test]
async fn test_create_bike_rejects_zero_price() {
    let mut bike = valid_bike();
    bike["price"] = json!(0);

    let (status, body) = send("POST", "/api/bikes", Some(bike)).await;

    assert_bad_request(status, &body, "price");
}

#[tokio::test]
async fn test_create_bike_requires_location() {
    let mut bike = valid_bike();
    bike["latitude"] = json!(95.0);

    let (status, body) = send("POST", "/api/bikes", Some(bike)).await;

    assert_bad_request(status, &body, "Location");
}

#[tokio::test]
async fn test_create_bike_requires_image() {
    let mut bike = valid_bike();
    bike["imageUrl"] = json!("  ");

    let (status, body) = send("POST", "/api/bikes", Some(bike)).await;

    assert_bad_request(status, &body, "Image");
}

#[tokio::test]
async fn test_valid_bike_reaches_database() {
    let (status, body) = send("POST", "/api/bikes", Some(valid_bike())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "database_error");
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_update_bike_rejects_empty_name() {
    let (status, body) = send("PUT", "/api/bikes/b1", Some(json!({ "name": "" }))).await;

    assert_bad_request(status, &body, "Name");
}

#[tokio::test]
async fn test_update_bike_requires_both_coordinates() {
    let (status, body) = send("PUT", "/api/bikes/b1", Some(json!({ "latitude": 37.4 }))).await;

    assert_bad_request(status, &body, "together");
}

#[tokio::test]
async fn test_bike_location_rejects_out_of_range() {
    let (status, body) = send(
        "PUT",
        "/api/bikes/b1/location",
        Some(json!({ "latitude": 91.0, "longitude": 10.0 })),
    )
    .await;

    assert_bad_request(status, &body, "coordinates");
}

// ─── Rides ───────────────────────────────────────────────────

#[tokio::test]
async fn test_list_rides_rejects_bad_cursor() {
    let (status, body) = send("GET", "/api/rides?cursor=not-a-cursor!", None).await;

    assert_bad_request(status, &body, "cursor");
}

#[tokio::test]
async fn test_list_rides_rejects_unknown_status() {
    let (status, body) = send("GET", "/api/rides?status=bogus", None).await;

    assert_bad_request(status, &body, "bogus");
}

#[tokio::test]
async fn test_list_rides_all_status_is_unfiltered() {
    let (status, body) = send("GET", "/api/rides?status=all", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "database_error");
}

#[tokio::test]
async fn test_start_ride_requires_ids() {
    let (status, body) = send(
        "POST",
        "/api/rides",
        Some(json!({ "bikeId": " ", "userId": "u1" })),
    )
    .await;

    assert_bad_request(status, &body, "bikeId");
}

#[tokio::test]
async fn test_ride_location_rejects_null_island() {
    let (status, body) = send(
        "POST",
        "/api/rides/r1/locations",
        Some(json!({ "latitude": 0.0, "longitude": 0.0 })),
    )
    .await;

    assert_bad_request(status, &body, "GPS");
}

#[tokio::test]
async fn test_end_ride_rejects_invalid_location() {
    let (status, body) = send(
        "POST",
        "/api/rides/r1/end",
        Some(json!({ "latitude": 37.4, "longitude": 200.0 })),
    )
    .await;

    assert_bad_request(status, &body, "end location");
}

// ─── Bookings ────────────────────────────────────────────────

#[tokio::test]
async fn test_create_booking_rejects_reversed_times() {
    let (status, body) = send(
        "POST",
        "/api/bookings",
        Some(json!({
            "bikeId": "b1",
            "userId": "u1",
            "startTime": "2026-03-04T12:00:00Z",
            "endTime": "2026-03-04T10:00:00Z",
            "totalPrice": 10.0
        })),
    )
    .await;

    assert_bad_request(status, &body, "endTime");
}

#[tokio::test]
async fn test_create_booking_rejects_final_status() {
    let (status, body) = send(
        "POST",
        "/api/bookings",
        Some(json!({
            "bikeId": "b1",
            "userId": "u1",
            "startTime": "2026-03-04T10:00:00Z",
            "endTime": "2026-03-04T12:00:00Z",
            "totalPrice": 10.0,
            "status": "COMPLETED"
        })),
    )
    .await;

    assert_bad_request(status, &body, "PENDING");
}

#[tokio::test]
async fn test_booking_availability_rejects_empty_window() {
    let (status, body) = send(
        "GET",
        "/api/bookings/availability?bikeId=b1&start=2026-03-04T10:00:00Z&end=2026-03-04T10:00:00Z",
        None,
    )
    .await;

    assert_bad_request(status, &body, "end must be after start");
}

// ─── Notifications ───────────────────────────────────────────

#[tokio::test]
async fn test_create_notification_requires_title() {
    let (status, body) = send(
        "POST",
        "/api/notifications",
        Some(json!({ "title": "", "message": "Bike 7 needs service" })),
    )
    .await;

    assert_bad_request(status, &body, "Title");
}

// ─── Users ───────────────────────────────────────────────────

#[tokio::test]
async fn test_admin_cannot_block_self() {
    let (status, body) = send(
        "PUT",
        &format!("/api/users/{ADMIN_UID}/block"),
        Some(json!({ "blocked": true })),
    )
    .await;

    assert_bad_request(status, &body, "block yourself");
}

#[tokio::test]
async fn test_admin_cannot_delete_self() {
    let (status, body) = send("DELETE", &format!("/api/users/{ADMIN_UID}"), None).await;

    assert_bad_request(status, &body, "your own account");
}

#[tokio::test]
async fn test_admin_cannot_drop_own_admin_role() {
    let (status, body) = send(
        "PUT",
        &format!("/api/users/{ADMIN_UID}/role"),
        Some(json!({ "role": "user" })),
    )
    .await;

    assert_bad_request(status, &body, "admin role");
}

#[tokio::test]
async fn test_set_role_rejects_empty_role() {
    let (status, body) = send(
        "PUT",
        "/api/users/rider-1/role",
        Some(json!({ "role": "  " })),
    )
    .await;

    assert_bad_request(status, &body, "Role");
}

// ─── QR codes ────────────────────────────────────────────────

#[tokio::test]
async fn test_collision_check_requires_code() {
    let (status, body) = send("GET", "/api/qr/collisions", None).await;

    assert_bad_request(status, &body, "code");
}

// ─── Payments ────────────────────────────────────────────────

#[tokio::test]
async fn test_list_payments_rejects_unknown_status() {
    let (status, body) = send("GET", "/api/payments?status=refunded", None).await;

    assert_bad_request(status, &body, "Unknown payment status");
}

#[tokio::test]
async fn test_payment_cannot_be_reset_to_pending() {
    let (status, body) = send(
        "PUT",
        "/api/payments/pay-1/status",
        Some(json!({ "status": "PENDING" })),
    )
    .await;

    assert_bad_request(status, &body, "CONFIRMED or REJECTED");
}

#[tokio::test]
async fn test_payment_review_rejects_unknown_status() {
    let (status, body) = send(
        "PUT",
        "/api/payments/pay-1/status",
        Some(json!({ "status": "paid" })),
    )
    .await;

    assert_bad_request(status, &body, "Unknown payment status");
}

#[tokio::test]
async fn test_payment_settings_reject_bad_gcash_number() {
    let (status, body) = send(
        "PUT",
        "/api/settings/payment",
        Some(json!({ "gcashNumber": "12345", "businessName": "Bambike Cycles" })),
    )
    .await;

    assert_bad_request(status, &body, "GCash number");
}

// ─── Support ─────────────────────────────────────────────────

#[tokio::test]
async fn test_support_status_rejects_unknown_value() {
    let (status, body) = send(
        "PUT",
        "/api/support/messages/msg-1/status",
        Some(json!({ "status": "closed" })),
    )
    .await;

    assert_bad_request(status, &body, "Unknown message status");
}

#[tokio::test]
async fn test_support_response_cannot_be_blank() {
    let (status, body) = send(
        "POST",
        "/api/support/messages/msg-1/response",
        Some(json!({ "response": "   " })),
    )
    .await;

    assert_bad_request(status, &body, "Response cannot be empty");
}

#[tokio::test]
async fn test_create_faq_requires_answer() {
    let (status, body) = send(
        "POST",
        "/api/support/faqs",
        Some(json!({ "question": "How do I pay?", "answer": "" })),
    )
    .await;

    assert_bad_request(status, &body, "question and answer");
}

#[tokio::test]
async fn test_update_faq_requires_question() {
    let (status, body) = send(
        "PUT",
        "/api/support/faqs/faq-1",
        Some(json!({ "question": " ", "answer": "Scan the QR code." })),
    )
    .await;

    assert_bad_request(status, &body, "question and answer");
}
