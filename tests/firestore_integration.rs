// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (`FIRESTORE_EMULATOR_HOST` set); they skip themselves otherwise.

use bikerental_admin::db::firestore::RideEnd;
use bikerental_admin::error::AppError;
use bikerental_admin::models::bike::NewBike;
use bikerental_admin::models::booking::NewBooking;
use bikerental_admin::models::notification::NewNotification;
use bikerental_admin::models::payment::PaymentSettings;
use bikerental_admin::models::support::FaqInput;
use bikerental_admin::models::user::User;
use bikerental_admin::models::{Bike, Booking, BookingStatus, LocationPoint, Role, RideStatus};
use bikerental_admin::time_utils;
use chrono::{DateTime, Duration, Utc};

mod common;
use common::test_db;

/// Unique suffix for test isolation.
fn unique_id(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4().simple())
}

fn test_bike(id: &str) -> Bike {
    let input = NewBike {
        name: "Test Cruiser".to_string(),
        bike_type: "city".to_string(),
        price: 6.0,
        image_url: "https://img.example.com/cruiser.jpg".to_string(),
        latitude: 37.4219,
        longitude: -122.0841,
        description: None,
        qr_code: None,
        hardware_id: None,
    };
    Bike::from_new(id.to_string(), &input, format!("QR-{id}"), Utc::now())
}

fn test_user(uid: &str) -> User {
    User {
        id: uid.to_string(),
        doc_id: None,
        email: Some(format!("{uid}@example.com")),
        full_name: Some("Test Rider".to_string()),
        display_name: None,
        phone_number: None,
        role: None,
        is_admin: None,
        id_verification_status: None,
        is_blocked: false,
        created_at: Some(Utc::now()),
        updated_at: None,
    }
}

fn test_booking(bike_id: &str, user_id: &str, start: DateTime<Utc>) -> Booking {
    NewBooking {
        bike_id: bike_id.to_string(),
        user_id: user_id.to_string(),
        user_name: "Test Rider".to_string(),
        bike_name: "Test Cruiser".to_string(),
        start_time: start,
        end_time: start + Duration::hours(2),
        total_price: 12.0,
        status: BookingStatus::Pending,
        payment_status: Default::default(),
        is_hourly: true,
        notes: String::new(),
    }
    .into_booking(Utc::now())
}

#[tokio::test]
async fn test_bike_save_and_get() {
    require_emulator!();
    let db = test_db().await;
    let bike_id = unique_id("bike");

    db.save_bike(&test_bike(&bike_id)).await.unwrap();

    let loaded = db.get_bike(&bike_id).await.unwrap().expect("bike saved");
    assert_eq!(loaded.id, bike_id);
    assert_eq!(loaded.name, "Test Cruiser");
    assert!(loaded.is_available);
    assert!(loaded.is_locked);

    let holders = db.find_bikes_by_code(&format!("QR-{bike_id}")).await.unwrap();
    assert_eq!(holders.len(), 1);

    db.delete_bike(&bike_id).await.unwrap();
    assert!(db.get_bike(&bike_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_ride_lifecycle_is_atomic() {
    require_emulator!();
    let db = test_db().await;
    let bike_id = unique_id("bike");
    let uid = unique_id("rider");

    db.save_bike(&test_bike(&bike_id)).await.unwrap();
    db.save_user(&test_user(&uid)).await.unwrap();

    let ride = db.start_ride_atomic(&bike_id, &uid).await.unwrap();
    assert_eq!(ride.status, RideStatus::Active);

    let bike = db.get_bike(&bike_id).await.unwrap().unwrap();
    assert!(bike.is_in_use);
    assert_eq!(bike.current_ride_id.as_deref(), Some(ride.id.as_str()));
    assert!(db.user_has_live_ride(&uid).await.unwrap());

    // A second ride for the same rider is refused.
    let second = db.start_ride_atomic(&bike_id, &uid).await;
    assert!(matches!(second, Err(AppError::Conflict(_))));

    let point = LocationPoint::at(37.4230, -122.0850, ride.start_time + 30_000);
    let ride = db
        .record_ride_location_atomic(&ride.id, point)
        .await
        .unwrap();
    assert_eq!(ride.path.len(), 2);

    let ended = db
        .finish_ride_atomic(
            &ride.id,
            RideEnd::Complete {
                latitude: 37.4240,
                longitude: -122.0860,
            },
        )
        .await
        .unwrap();
    assert_eq!(ended.status, RideStatus::Completed);
    assert!(ended.end_time.is_some());

    let bike = db.get_bike(&bike_id).await.unwrap().unwrap();
    assert!(!bike.is_in_use);
    assert!(bike.is_locked);
    assert!(bike.current_ride_id.is_none());
    assert!((bike.latitude - 37.4240).abs() < 1e-9);
    assert!(!db.user_has_live_ride(&uid).await.unwrap());

    db.delete_bike(&bike_id).await.unwrap();
    db.delete_user(&uid).await.unwrap();
}

#[tokio::test]
async fn test_cancel_ride_releases_bike() {
    require_emulator!();
    let db = test_db().await;
    let bike_id = unique_id("bike");
    let uid = unique_id("rider");

    db.save_bike(&test_bike(&bike_id)).await.unwrap();
    db.save_user(&test_user(&uid)).await.unwrap();

    let ride = db.start_ride_atomic(&bike_id, &uid).await.unwrap();
    let cancelled = db.finish_ride_atomic(&ride.id, RideEnd::Cancel).await.unwrap();
    assert_eq!(cancelled.status, RideStatus::Cancelled);
    assert_eq!(cancelled.cost, 0.0);

    let bike = db.get_bike(&bike_id).await.unwrap().unwrap();
    assert!(!bike.is_in_use);

    db.delete_bike(&bike_id).await.unwrap();
    db.delete_user(&uid).await.unwrap();
}

#[tokio::test]
async fn test_blocked_user_cannot_start_ride() {
    require_emulator!();
    let db = test_db().await;
    let bike_id = unique_id("bike");
    let uid = unique_id("rider");

    db.save_bike(&test_bike(&bike_id)).await.unwrap();
    let mut user = test_user(&uid);
    user.is_blocked = true;
    db.save_user(&user).await.unwrap();

    let result = db.start_ride_atomic(&bike_id, &uid).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let bike = db.get_bike(&bike_id).await.unwrap().unwrap();
    assert!(!bike.is_in_use);

    db.delete_bike(&bike_id).await.unwrap();
    db.delete_user(&uid).await.unwrap();
}

#[tokio::test]
async fn test_booking_round_trip() {
    require_emulator!();
    let db = test_db().await;
    let bike_id = unique_id("bike");
    let start = Utc::now() + Duration::days(1);

    let mut booking = test_booking(&bike_id, "rider-1", start);
    booking.id = unique_id("booking");
    db.save_booking(&booking).await.unwrap();

    let blocking = db.list_blocking_bookings(&bike_id).await.unwrap();
    assert_eq!(blocking.len(), 1);

    booking
        .transition(BookingStatus::Cancelled, Utc::now())
        .unwrap();
    db.save_booking(&booking).await.unwrap();
    assert!(db.list_blocking_bookings(&bike_id).await.unwrap().is_empty());

    db.delete_booking(&booking.id).await.unwrap();
    assert!(db.get_booking(&booking.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_notifications_read_and_clear() {
    require_emulator!();
    let db = test_db().await;

    let notification = NewNotification {
        kind: "maintenance".to_string(),
        title: "Flat tire".to_string(),
        message: "Bike 7 reported a flat".to_string(),
        priority: Default::default(),
        user_id: None,
        bike_id: Some("bike-7".to_string()),
    }
    .into_notification("admin-1", Utc::now());

    let mut saved = db.save_notification(&notification).await.unwrap();
    assert!(!saved.id.is_empty());
    assert!(db.count_unread_notifications().await.unwrap() >= 1);

    saved.mark_read("admin-1", Utc::now());
    db.save_notification(&saved).await.unwrap();
    let loaded = db.get_notification(&saved.id).await.unwrap().unwrap();
    assert!(loaded.read);

    let deleted = db.clear_notifications().await.unwrap();
    assert!(deleted >= 1);
    assert!(db
        .list_notifications(None, 50)
        .await
        .unwrap()
        .is_empty());
}

// ─── Concurrent writers ──────────────────────────────────────

#[tokio::test]
async fn test_end_racing_location_update_leaves_bike_free() {
    require_emulator!();
    let db = test_db().await;
    let bike_id = unique_id("bike");
    let uid = unique_id("rider");

    db.save_bike(&test_bike(&bike_id)).await.unwrap();
    db.save_user(&test_user(&uid)).await.unwrap();
    let ride = db.start_ride_atomic(&bike_id, &uid).await.unwrap();

    let point = LocationPoint::at(37.4230, -122.0850, ride.start_time + 30_000);
    let (located, ended) = tokio::join!(
        db.record_ride_location_atomic(&ride.id, point),
        db.finish_ride_atomic(
            &ride.id,
            RideEnd::Complete {
                latitude: 37.4240,
                longitude: -122.0860,
            },
        ),
    );

    // The location write either landed first or saw the ride already ended.
    assert!(matches!(located, Ok(_) | Err(AppError::Conflict(_))));
    assert_eq!(ended.unwrap().status, RideStatus::Completed);

    let stored = db.get_ride(&ride.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RideStatus::Completed);
    let bike = db.get_bike(&bike_id).await.unwrap().unwrap();
    assert!(!bike.is_in_use);
    assert!(bike.current_ride_id.is_none());

    db.delete_bike(&bike_id).await.unwrap();
    db.delete_user(&uid).await.unwrap();
}

#[tokio::test]
async fn test_two_riders_racing_for_one_bike() {
    require_emulator!();
    let db = test_db().await;
    let bike_id = unique_id("bike");
    let first = unique_id("rider");
    let second = unique_id("rider");

    db.save_bike(&test_bike(&bike_id)).await.unwrap();
    db.save_user(&test_user(&first)).await.unwrap();
    db.save_user(&test_user(&second)).await.unwrap();

    let (a, b) = tokio::join!(
        db.start_ride_atomic(&bike_id, &first),
        db.start_ride_atomic(&bike_id, &second),
    );

    let (winner, loser) = match (a, b) {
        (Ok(ride), Err(e)) | (Err(e), Ok(ride)) => (ride, e),
        (a, b) => panic!("expected exactly one ride, got {a:?} and {b:?}"),
    };
    assert!(matches!(loser, AppError::Conflict(_)));

    let bike = db.get_bike(&bike_id).await.unwrap().unwrap();
    assert!(bike.is_in_use);
    assert_eq!(bike.current_ride_id.as_deref(), Some(winner.id.as_str()));

    db.finish_ride_atomic(&winner.id, RideEnd::Cancel).await.unwrap();
    db.delete_bike(&bike_id).await.unwrap();
    db.delete_user(&first).await.unwrap();
    db.delete_user(&second).await.unwrap();
}

#[tokio::test]
async fn test_pause_racing_end_never_reopens_ride() {
    require_emulator!();
    let db = test_db().await;
    let bike_id = unique_id("bike");
    let uid = unique_id("rider");

    db.save_bike(&test_bike(&bike_id)).await.unwrap();
    db.save_user(&test_user(&uid)).await.unwrap();
    let ride = db.start_ride_atomic(&bike_id, &uid).await.unwrap();

    let (paused, ended) = tokio::join!(
        db.update_ride_atomic(&ride.id, |ride| {
            Ok(ride.pause(time_utils::to_millis(Utc::now()))?)
        }),
        db.finish_ride_atomic(&ride.id, RideEnd::Cancel),
    );

    assert!(matches!(paused, Ok(_) | Err(AppError::Conflict(_))));
    assert_eq!(ended.unwrap().status, RideStatus::Cancelled);

    let stored = db.get_ride(&ride.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RideStatus::Cancelled);
    assert!(stored.paused_at.is_none());

    db.delete_bike(&bike_id).await.unwrap();
    db.delete_user(&uid).await.unwrap();
}

#[tokio::test]
async fn test_overlapping_bookings_racing() {
    require_emulator!();
    let db = test_db().await;
    let bike_id = unique_id("bike");
    db.save_bike(&test_bike(&bike_id)).await.unwrap();

    let start = Utc::now() + Duration::days(2);
    let morning = test_booking(&bike_id, "rider-1", start);
    let overlapping = test_booking(&bike_id, "rider-2", start + Duration::hours(1));

    let (a, b) = tokio::join!(
        db.create_booking_atomic(&morning),
        db.create_booking_atomic(&overlapping),
    );

    let (winner, loser) = match (a, b) {
        (Ok(booking), Err(e)) | (Err(e), Ok(booking)) => (booking, e),
        (a, b) => panic!("expected exactly one booking, got {a:?} and {b:?}"),
    };
    assert!(matches!(loser, AppError::Conflict(_)));
    assert_eq!(winner.bike_name, "Test Cruiser");
    assert_eq!(db.list_blocking_bookings(&bike_id).await.unwrap().len(), 1);

    db.delete_booking(&winner.id).await.unwrap();
    db.delete_bike(&bike_id).await.unwrap();
}

#[tokio::test]
async fn test_paused_time_is_not_billed() {
    require_emulator!();
    let db = test_db().await;
    let bike_id = unique_id("bike");
    let uid = unique_id("rider");

    db.save_bike(&test_bike(&bike_id)).await.unwrap();
    db.save_user(&test_user(&uid)).await.unwrap();
    let ride = db.start_ride_atomic(&bike_id, &uid).await.unwrap();

    let paused = db
        .update_ride_atomic(&ride.id, |ride| {
            Ok(ride.pause(time_utils::to_millis(Utc::now()))?)
        })
        .await
        .unwrap();
    assert_eq!(paused.status, RideStatus::Paused);

    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    db.update_ride_atomic(&ride.id, |ride| {
        Ok(ride.resume(time_utils::to_millis(Utc::now()))?)
    })
    .await
    .unwrap();

    let ended = db
        .finish_ride_atomic(
            &ride.id,
            RideEnd::Complete {
                latitude: 37.4240,
                longitude: -122.0860,
            },
        )
        .await
        .unwrap();

    let end_time = ended.end_time.unwrap();
    assert!(ended.total_paused_ms >= 250, "paused {}", ended.total_paused_ms);
    assert!(ended.billable_ms(end_time) < end_time - ended.start_time);

    db.delete_bike(&bike_id).await.unwrap();
    db.delete_user(&uid).await.unwrap();
}

// ─── API against the emulator ────────────────────────────────

#[tokio::test]
async fn test_deleting_missing_notification_is_404() {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    require_emulator!();
    let (app, state) = common::create_emulator_app().await;
    let token = common::session_token(&state, "admin-1", &Role::Admin);

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/notifications/{}", unique_id("missing")))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ─── Support and payment settings ────────────────────────────

#[tokio::test]
async fn test_faq_round_trip() {
    require_emulator!();
    let db = test_db().await;

    let faq = FaqInput {
        question: "How do I unlock a bike?".to_string(),
        answer: "Scan the QR code.".to_string(),
    }
    .into_faq(0, Utc::now());
    db.save_faq(&faq).await.unwrap();

    let mut loaded = db.get_faq(&faq.id).await.unwrap().expect("faq saved");
    assert_eq!(loaded.order, 1);

    let edit = FaqInput {
        question: "How do I unlock a bike?".to_string(),
        answer: "Scan the QR code on the frame.".to_string(),
    };
    loaded.apply(&edit, Utc::now());
    db.update_faq(&loaded).await.unwrap();

    let edited = db.get_faq(&faq.id).await.unwrap().unwrap();
    assert_eq!(edited.answer, "Scan the QR code on the frame.");
    assert_eq!(edited.order, 1);
    assert!(edited.updated_at.is_some());

    db.delete_faq(&faq.id).await.unwrap();
    assert!(db.get_faq(&faq.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_payment_settings_round_trip() {
    require_emulator!();
    let db = test_db().await;

    let settings = PaymentSettings {
        gcash_number: "09171234567".to_string(),
        business_name: "Test Cycles".to_string(),
        qr_code_url: String::new(),
    };
    db.set_payment_settings(&settings).await.unwrap();

    let loaded = db.get_payment_settings().await.unwrap().expect("settings saved");
    assert_eq!(loaded, settings);
}
