// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Bikes (inventory, location history, maintenance log)
//! - Users (profiles written by the mobile app)
//! - Rides (lifecycle changes applied atomically with the bike)
//! - Reviews, bookings, notifications and app settings
//! - Payments, support messages and FAQs

use crate::db::collections;
use crate::error::AppError;
use crate::models::ride::RideStatus;
use crate::models::payment::{self, PaymentReviewStatus};
use crate::models::{
    Bike, Booking, Document, Faq, LocationPoint, LocationRecord, MaintenanceLog, Notification,
    Payment, PaymentSettings, Review, Ride, SupportMessage, TrackingSettings, User,
};
use crate::time_utils;
use futures_util::{stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;

const MAX_CONCURRENT_DB_OPS: usize = 50;
// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;
const TRANSACTION_ATTEMPTS: u32 = 5;

/// Position in the newest-first ride listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RideCursor {
    pub start_time: i64,
    pub ride_id: String,
}

/// How a ride is being closed.
#[derive(Debug, Clone)]
pub enum RideEnd {
    /// Normal end: charge the rider and park the bike at this spot.
    Complete { latitude: f64, longitude: f64 },
    /// Admin force end: no charge, bike stays where it was last seen.
    Cancel,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

fn db_error(e: impl std::fmt::Display) -> AppError {
    AppError::Database(e.to_string())
}

/// Backoff before retrying a contended transaction.
fn retry_delay(attempt: u32) -> Duration {
    Duration::from_millis(50 * 2u64.pow(attempt.saturating_sub(1)))
}

/// A document write staged into a transaction.
#[derive(Debug, Clone)]
enum TxWrite {
    Ride(Ride),
    Bike(Bike),
    Booking(Booking),
    /// Only the review fields; the rest of the document belongs to the app.
    PaymentReview(Payment),
}

impl TxWrite {
    fn stage(
        &self,
        client: &firestore::FirestoreDb,
        transaction: &mut firestore::FirestoreTransaction<'_>,
    ) -> Result<(), AppError> {
        let (kind, result) = match self {
            TxWrite::Ride(ride) => (
                "ride",
                client
                    .fluent()
                    .update()
                    .in_col(collections::RIDES)
                    .document_id(&ride.id)
                    .object(ride)
                    .add_to_transaction(transaction)
                    .map(|_| ()),
            ),
            TxWrite::Bike(bike) => (
                "bike",
                client
                    .fluent()
                    .update()
                    .in_col(collections::BIKES)
                    .document_id(&bike.id)
                    .object(bike)
                    .add_to_transaction(transaction)
                    .map(|_| ()),
            ),
            TxWrite::Booking(booking) => (
                "booking",
                client
                    .fluent()
                    .update()
                    .in_col(collections::BOOKINGS)
                    .document_id(&booking.id)
                    .object(booking)
                    .add_to_transaction(transaction)
                    .map(|_| ()),
            ),
            TxWrite::PaymentReview(payment) => (
                "payment",
                client
                    .fluent()
                    .update()
                    .fields(payment::REVIEW_FIELDS)
                    .in_col(collections::PAYMENTS)
                    .document_id(&payment.id)
                    .object(payment)
                    .add_to_transaction(transaction)
                    .map(|_| ()),
            ),
        };
        result.map_err(|e| {
            AppError::Database(format!("Failed to add {} to transaction: {}", kind, e))
        })
    }
}

/// Read one document. With a transaction-scoped client the read joins the
/// transaction.
async fn read_doc<T>(
    client: &firestore::FirestoreDb,
    collection: &str,
    id: &str,
) -> Result<Option<T>, AppError>
where
    T: DeserializeOwned + Document + Send,
{
    let doc: Option<T> = client
        .fluent()
        .select()
        .by_id_in(collection)
        .obj()
        .one(id)
        .await
        .map_err(db_error)?;

    Ok(doc.map(|mut d| {
        d.adopt_doc_id();
        d
    }))
}

async fn rides_for_user(client: &firestore::FirestoreDb, uid: &str) -> Result<Vec<Ride>, AppError> {
    let rides: Vec<Ride> = client
        .fluent()
        .select()
        .from(collections::RIDES)
        .filter(|q| q.for_all([q.field("userId").eq(uid)]))
        .order_by([("startTime", firestore::FirestoreQueryDirection::Descending)])
        .obj()
        .query()
        .await
        .map_err(db_error)?;
    Ok(adopt_ids(rides))
}

/// Pending and confirmed bookings of a bike.
async fn blocking_bookings(
    client: &firestore::FirestoreDb,
    bike_id: &str,
) -> Result<Vec<Booking>, AppError> {
    let bookings: Vec<Booking> = client
        .fluent()
        .select()
        .from(collections::BOOKINGS)
        .filter(|q| q.for_all([q.field("bikeId").eq(bike_id)]))
        .obj()
        .query()
        .await
        .map_err(db_error)?;

    Ok(adopt_ids(bookings)
        .into_iter()
        .filter(|b| b.status.blocks_bike())
        .collect())
}

fn adopt_ids<T: Document>(docs: Vec<T>) -> Vec<T> {
    docs.into_iter()
        .map(|mut d| {
            d.adopt_doc_id();
            d
        })
        .collect()
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Generic Helpers ─────────────────────────────────────────

    async fn get_doc<T>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError>
    where
        T: DeserializeOwned + Document + Send,
    {
        read_doc(self.get_client()?, collection, id).await
    }

    async fn set_doc<T>(&self, collection: &str, id: &str, object: &T) -> Result<(), AppError>
    where
        T: Serialize + DeserializeOwned + Sync + Send,
    {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(object)
            .execute()
            .await
            .map_err(db_error)?;
        Ok(())
    }

    /// Update only `fields` of an existing document.
    async fn patch_doc<T>(
        &self,
        collection: &str,
        id: &str,
        object: &T,
        fields: &[&str],
    ) -> Result<(), AppError>
    where
        T: Serialize + DeserializeOwned + Sync + Send,
    {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(fields.iter().copied())
            .in_col(collection)
            .document_id(id)
            .object(object)
            .execute()
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn delete_doc(&self, collection: &str, id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collection)
            .document_id(id)
            .execute()
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn list_all<T>(&self, collection: &str) -> Result<Vec<T>, AppError>
    where
        T: DeserializeOwned + Document + Send,
    {
        let docs: Vec<T> = self
            .get_client()?
            .fluent()
            .select()
            .from(collection)
            .obj()
            .query()
            .await
            .map_err(db_error)?;
        Ok(adopt_ids(docs))
    }

    // ─── Bike Operations ─────────────────────────────────────────

    pub async fn list_bikes(&self) -> Result<Vec<Bike>, AppError> {
        self.list_all(collections::BIKES).await
    }

    pub async fn get_bike(&self, bike_id: &str) -> Result<Option<Bike>, AppError> {
        self.get_doc(collections::BIKES, bike_id).await
    }

    /// Create or replace a bike document.
    pub async fn save_bike(&self, bike: &Bike) -> Result<(), AppError> {
        self.set_doc(collections::BIKES, &bike.id, bike).await
    }

    pub async fn delete_bike(&self, bike_id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::BIKES, bike_id).await?;
        tracing::info!(bike_id, "Deleted bike");
        Ok(())
    }

    /// Bikes whose `qrCode` or legacy `hardwareId` equals `code`.
    pub async fn find_bikes_by_code(&self, code: &str) -> Result<Vec<Bike>, AppError> {
        let client = self.get_client()?;

        let by_qr: Vec<Bike> = client
            .fluent()
            .select()
            .from(collections::BIKES)
            .filter(|q| q.for_all([q.field("qrCode").eq(code)]))
            .obj()
            .query()
            .await
            .map_err(db_error)?;

        let by_hardware: Vec<Bike> = client
            .fluent()
            .select()
            .from(collections::BIKES)
            .filter(|q| q.for_all([q.field("hardwareId").eq(code)]))
            .obj()
            .query()
            .await
            .map_err(db_error)?;

        let mut bikes = adopt_ids(by_qr);
        for bike in adopt_ids(by_hardware) {
            if !bikes.iter().any(|b| b.id == bike.id) {
                bikes.push(bike);
            }
        }
        Ok(bikes)
    }

    /// Write many bikes with bounded concurrency.
    pub async fn save_bikes(&self, bikes: &[Bike]) -> Result<(), AppError> {
        let client = self.get_client()?;

        stream::iter(bikes.to_vec())
            .map(|bike| async move {
                let _: () = client
                    .fluent()
                    .update()
                    .in_col(collections::BIKES)
                    .document_id(&bike.id)
                    .object(&bike)
                    .execute()
                    .await
                    .map_err(db_error)?;

                Ok::<_, AppError>(())
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<(), AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<()>, AppError>>()?;

        Ok(())
    }

    pub async fn add_location_record(&self, record: &LocationRecord) -> Result<(), AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.set_doc(collections::BIKE_LOCATION_HISTORY, &id, record)
            .await
    }

    /// Location history of a bike, newest first.
    pub async fn list_location_history(
        &self,
        bike_id: &str,
        limit: u32,
    ) -> Result<Vec<LocationRecord>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::BIKE_LOCATION_HISTORY)
            .filter(|q| q.for_all([q.field("bikeId").eq(bike_id)]))
            .order_by([("timestamp", firestore::FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(db_error)
    }

    pub async fn add_maintenance_log(&self, log: &MaintenanceLog) -> Result<String, AppError> {
        let mut log = log.clone();
        log.id = uuid::Uuid::new_v4().to_string();
        self.set_doc(collections::MAINTENANCE_LOGS, &log.id, &log)
            .await?;
        Ok(log.id)
    }

    /// Maintenance log of a bike, newest first.
    pub async fn list_maintenance_logs(
        &self,
        bike_id: &str,
    ) -> Result<Vec<MaintenanceLog>, AppError> {
        let logs: Vec<MaintenanceLog> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::MAINTENANCE_LOGS)
            .filter(|q| q.for_all([q.field("bikeId").eq(bike_id)]))
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(db_error)?;
        Ok(adopt_ids(logs))
    }

    // ─── User Operations ─────────────────────────────────────────

    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.list_all(collections::USERS).await
    }

    /// Get a user by Firebase UID.
    pub async fn get_user(&self, uid: &str) -> Result<Option<User>, AppError> {
        self.get_doc(collections::USERS, uid).await
    }

    pub async fn save_user(&self, user: &User) -> Result<(), AppError> {
        self.set_doc(collections::USERS, &user.id, user).await
    }

    /// Delete the user profile document.
    ///
    /// Only the profile; the Auth account is handled by `FirebaseAdmin`.
    /// Rides, reviews and bookings stay as business records.
    pub async fn delete_user(&self, uid: &str) -> Result<(), AppError> {
        self.delete_doc(collections::USERS, uid).await?;
        tracing::info!(uid, "Deleted user profile");
        Ok(())
    }

    // ─── Ride Operations ─────────────────────────────────────────

    pub async fn get_ride(&self, ride_id: &str) -> Result<Option<Ride>, AppError> {
        self.get_doc(collections::RIDES, ride_id).await
    }

    /// Rides newest first, optionally filtered by status.
    ///
    /// After a cursor, rides that share the cursor's start time are fetched
    /// first (ordered by id), then strictly older ones.
    pub async fn list_rides_page(
        &self,
        status: Option<RideStatus>,
        cursor: Option<&RideCursor>,
        limit: u32,
    ) -> Result<Vec<Ride>, AppError> {
        let client = self.get_client()?;
        let status = status.map(|s| s.as_str());

        let Some(cursor) = cursor else {
            let rides: Vec<Ride> = client
                .fluent()
                .select()
                .from(collections::RIDES)
                .filter(|q| q.for_all([status.and_then(|s| q.field("status").eq(s))]))
                .order_by([("startTime", firestore::FirestoreQueryDirection::Descending)])
                .limit(limit)
                .obj()
                .query()
                .await
                .map_err(db_error)?;
            return Ok(adopt_ids(rides));
        };

        let same_time: Vec<Ride> = client
            .fluent()
            .select()
            .from(collections::RIDES)
            .filter(|q| {
                q.for_all([
                    q.field("startTime").eq(cursor.start_time),
                    q.field("id").less_than(cursor.ride_id.as_str()),
                    status.and_then(|s| q.field("status").eq(s)),
                ])
            })
            .order_by([("id", firestore::FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(db_error)?;

        let mut rides = adopt_ids(same_time);
        let remaining = limit.saturating_sub(rides.len() as u32);
        if remaining == 0 {
            return Ok(rides);
        }

        let older: Vec<Ride> = client
            .fluent()
            .select()
            .from(collections::RIDES)
            .filter(|q| {
                q.for_all([
                    q.field("startTime").less_than(cursor.start_time),
                    status.and_then(|s| q.field("status").eq(s)),
                ])
            })
            .order_by([
                ("startTime", firestore::FirestoreQueryDirection::Descending),
                ("id", firestore::FirestoreQueryDirection::Descending),
            ])
            .limit(remaining)
            .obj()
            .query()
            .await
            .map_err(db_error)?;

        rides.extend(adopt_ids(older));
        Ok(rides)
    }

    /// Rides still holding a bike (active, paused or emergency).
    pub async fn list_live_rides(&self) -> Result<Vec<Ride>, AppError> {
        let client = self.get_client()?;
        let mut rides = Vec::new();

        for status in [RideStatus::Active, RideStatus::Paused, RideStatus::Emergency] {
            let batch: Vec<Ride> = client
                .fluent()
                .select()
                .from(collections::RIDES)
                .filter(|q| q.for_all([q.field("status").eq(status.as_str())]))
                .obj()
                .query()
                .await
                .map_err(db_error)?;
            rides.extend(adopt_ids(batch));
        }

        rides.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(rides)
    }

    /// Ride history of a user, newest first.
    pub async fn list_rides_for_user(&self, uid: &str) -> Result<Vec<Ride>, AppError> {
        rides_for_user(self.get_client()?, uid).await
    }

    /// Whether the user currently holds a bike.
    pub async fn user_has_live_ride(&self, uid: &str) -> Result<bool, AppError> {
        Ok(self
            .list_rides_for_user(uid)
            .await?
            .iter()
            .any(|r| r.status.is_live()))
    }

    // ─── Atomic Ride Lifecycle ──────────────────────────────────

    /// Run `attempt` inside a read-write transaction and commit what it stages.
    ///
    /// `attempt` gets a client whose reads join the transaction, so Firestore
    /// detects concurrent writers to anything it read. Contention aborts are
    /// retried from a fresh read; lifecycle errors roll back and return as-is.
    async fn run_atomic<T, F, Fut>(&self, op: &'static str, attempt: F) -> Result<T, AppError>
    where
        F: Fn(firestore::FirestoreDb) -> Fut,
        Fut: Future<Output = Result<(T, Vec<TxWrite>), AppError>>,
    {
        let client = self.get_client()?;
        let mut last_error = None;

        for attempt_no in 1..=TRANSACTION_ATTEMPTS {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            let tx_client = client.clone_with_consistency_selector(
                firestore::FirestoreConsistencySelector::Transaction(
                    transaction.transaction_id().clone(),
                ),
            );

            let (value, writes) = match attempt(tx_client).await {
                Ok(staged) => staged,
                Err(e @ AppError::Database(_)) => {
                    let _ = transaction.rollback().await;
                    tracing::warn!(op, attempt = attempt_no, error = %e, "Transaction read failed");
                    last_error = Some(e);
                    tokio::time::sleep(retry_delay(attempt_no)).await;
                    continue;
                }
                Err(e) => {
                    let _ = transaction.rollback().await;
                    return Err(e);
                }
            };

            for write in &writes {
                if let Err(e) = write.stage(client, &mut transaction) {
                    let _ = transaction.rollback().await;
                    return Err(e);
                }
            }

            match transaction.commit().await {
                Ok(_) => return Ok(value),
                Err(firestore::errors::FirestoreError::DatabaseError(ref e)) if e.retry_possible => {
                    tracing::warn!(op, attempt = attempt_no, error = %e, "Transaction contended");
                    last_error = Some(AppError::Database(format!(
                        "Transaction commit failed: {}",
                        e
                    )));
                    tokio::time::sleep(retry_delay(attempt_no)).await;
                }
                Err(e) => {
                    return Err(AppError::Database(format!(
                        "Transaction commit failed: {}",
                        e
                    )))
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AppError::Database(format!("{} did not commit", op))))
    }

    /// Atomically start a ride: create the ride document and hand over the bike.
    ///
    /// The rider, their live rides and the bike are read inside the
    /// transaction, so two starts racing for one bike can't both commit.
    pub async fn start_ride_atomic(&self, bike_id: &str, user_id: &str) -> Result<Ride, AppError> {
        let ride = self
            .run_atomic("start_ride", move |tx| async move {
                let now = chrono::Utc::now();
                let now_ms = time_utils::to_millis(now);

                let user: User = read_doc(&tx, collections::USERS, user_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("User {}", user_id)))?;
                if user.is_blocked {
                    return Err(AppError::Conflict("User is blocked".to_string()));
                }
                if rides_for_user(&tx, user_id)
                    .await?
                    .iter()
                    .any(|r| r.status.is_live())
                {
                    return Err(AppError::Conflict(
                        "User already has an active ride".to_string(),
                    ));
                }

                let mut bike: Bike = read_doc(&tx, collections::BIKES, bike_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Bike {}", bike_id)))?;

                let ride_id = uuid::Uuid::new_v4().to_string();
                let ride = Ride::start(ride_id.clone(), &bike, user_id, now_ms);
                bike.begin_ride(user_id, &ride_id, now)?;

                Ok((
                    ride.clone(),
                    vec![TxWrite::Ride(ride), TxWrite::Bike(bike)],
                ))
            })
            .await?;

        tracing::info!(ride_id = %ride.id, bike_id, user_id, "Ride started");
        Ok(ride)
    }

    /// Append a GPS fix to a ride and move its bike to the same spot.
    pub async fn record_ride_location_atomic(
        &self,
        ride_id: &str,
        point: LocationPoint,
    ) -> Result<Ride, AppError> {
        let point = &point;
        let ride = self
            .run_atomic("record_ride_location", move |tx| async move {
                let now = chrono::Utc::now();

                let mut ride: Ride = read_doc(&tx, collections::RIDES, ride_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Ride {}", ride_id)))?;
                ride.record_location(point.clone())?;

                let bike: Option<Bike> = read_doc(&tx, collections::BIKES, &ride.bike_id).await?;
                let mut writes = vec![TxWrite::Ride(ride.clone())];
                if let Some(mut bike) =
                    bike.filter(|b| b.current_ride_id.as_deref() == Some(ride_id))
                {
                    bike.move_to(point.latitude, point.longitude, now);
                    writes.push(TxWrite::Bike(bike));
                }

                Ok((ride, writes))
            })
            .await?;

        tracing::debug!(
            ride_id,
            points = ride.path.len(),
            distance = ride.distance_traveled,
            "Ride location recorded"
        );
        Ok(ride)
    }

    /// Atomically end a ride and return its bike to the fleet.
    pub async fn finish_ride_atomic(&self, ride_id: &str, end: RideEnd) -> Result<Ride, AppError> {
        let end = &end;
        let ride = self
            .run_atomic("finish_ride", move |tx| async move {
                let now = chrono::Utc::now();
                let now_ms = time_utils::to_millis(now);

                let mut ride: Ride = read_doc(&tx, collections::RIDES, ride_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Ride {}", ride_id)))?;

                let (latitude, longitude) = match end {
                    RideEnd::Complete {
                        latitude,
                        longitude,
                    } => {
                        ride.complete(LocationPoint::at(*latitude, *longitude, now_ms), now_ms)?;
                        (*latitude, *longitude)
                    }
                    RideEnd::Cancel => {
                        ride.cancel(now_ms)?;
                        let last = ride.current_location.as_ref().unwrap_or(&ride.start_location);
                        (last.latitude, last.longitude)
                    }
                };

                let mut writes = vec![TxWrite::Ride(ride.clone())];
                match read_doc::<Bike>(&tx, collections::BIKES, &ride.bike_id).await? {
                    Some(mut bike) => {
                        bike.finish_ride(ride_id, latitude, longitude, now)?;
                        writes.push(TxWrite::Bike(bike));
                    }
                    None => {
                        tracing::warn!(ride_id, bike_id = %ride.bike_id, "Bike missing while ending ride");
                    }
                }

                Ok((ride, writes))
            })
            .await?;

        tracing::info!(
            ride_id,
            status = ride.status.as_str(),
            cost = ride.cost,
            "Ride ended"
        );
        Ok(ride)
    }

    /// Apply a status change (pause, resume, emergency response) to a ride
    /// read inside a transaction.
    pub async fn update_ride_atomic<C>(&self, ride_id: &str, change: C) -> Result<Ride, AppError>
    where
        C: Fn(&mut Ride) -> Result<(), AppError>,
    {
        let change = &change;
        let ride = self
            .run_atomic("update_ride", move |tx| async move {
                let mut ride: Ride = read_doc(&tx, collections::RIDES, ride_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Ride {}", ride_id)))?;
                change(&mut ride)?;
                Ok((ride.clone(), vec![TxWrite::Ride(ride)]))
            })
            .await?;

        tracing::debug!(ride_id, status = ride.status.as_str(), "Ride updated");
        Ok(ride)
    }

    // ─── Review Operations ───────────────────────────────────────

    /// Reviews newest first, optionally for one bike.
    pub async fn list_reviews(
        &self,
        bike_id: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<Review>, AppError> {
        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::REVIEWS)
            .filter(|q| q.for_all([bike_id.and_then(|id| q.field("bikeId").eq(id))]));

        let reviews: Vec<Review> = match limit {
            Some(limit) => query
                .order_by([("timestamp", firestore::FirestoreQueryDirection::Descending)])
                .limit(limit)
                .obj()
                .query()
                .await
                .map_err(db_error)?,
            None => query
                .order_by([("timestamp", firestore::FirestoreQueryDirection::Descending)])
                .obj()
                .query()
                .await
                .map_err(db_error)?,
        };
        Ok(adopt_ids(reviews))
    }

    /// Delete a review and recompute its bike's rating aggregate.
    pub async fn delete_review(&self, review_id: &str) -> Result<Review, AppError> {
        let review: Review = self
            .get_doc(collections::REVIEWS, review_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Review {}", review_id)))?;

        self.delete_doc(collections::REVIEWS, review_id).await?;

        // Recalculated from the remaining reviews, not decremented.
        let remaining = self.list_reviews(Some(&review.bike_id), None).await?;
        let summary = crate::models::review::summarize(&remaining);

        if let Some(mut bike) = self.get_bike(&review.bike_id).await? {
            bike.average_rating = Some(summary.average_rating);
            bike.total_reviews = Some(summary.total_reviews);
            bike.last_updated = Some(chrono::Utc::now());
            self.save_bike(&bike).await?;
        }

        tracing::info!(
            review_id,
            bike_id = %review.bike_id,
            total_reviews = summary.total_reviews,
            "Deleted review"
        );
        Ok(review)
    }

    // ─── Booking Operations ──────────────────────────────────────

    /// Bookings newest first, optionally for one user and/or bike.
    pub async fn list_bookings(
        &self,
        user_id: Option<&str>,
        bike_id: Option<&str>,
    ) -> Result<Vec<Booking>, AppError> {
        let bookings: Vec<Booking> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::BOOKINGS)
            .filter(|q| {
                q.for_all([
                    user_id.and_then(|id| q.field("userId").eq(id)),
                    bike_id.and_then(|id| q.field("bikeId").eq(id)),
                ])
            })
            .order_by([("startTime", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(db_error)?;
        Ok(adopt_ids(bookings))
    }

    /// Pending and confirmed bookings of a bike.
    pub async fn list_blocking_bookings(&self, bike_id: &str) -> Result<Vec<Booking>, AppError> {
        blocking_bookings(self.get_client()?, bike_id).await
    }

    /// Store a new booking unless it overlaps a pending or confirmed one.
    ///
    /// The bike and its blocking bookings are read inside the transaction and
    /// the bike is rewritten, so two overlapping requests can't both commit.
    pub async fn create_booking_atomic(&self, booking: &Booking) -> Result<Booking, AppError> {
        let created = self
            .run_atomic("create_booking", move |tx| async move {
                let bike: Bike = read_doc(&tx, collections::BIKES, &booking.bike_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Bike {}", booking.bike_id)))?;

                if let Some(conflict) = blocking_bookings(&tx, &bike.id)
                    .await?
                    .into_iter()
                    .find(|b| b.conflicts_with(booking.start_time, booking.end_time))
                {
                    return Err(AppError::Conflict(format!(
                        "Bike is already booked by booking {}",
                        conflict.id
                    )));
                }

                let mut booking = booking.clone();
                if booking.id.is_empty() {
                    booking.id = uuid::Uuid::new_v4().to_string();
                }
                if booking.bike_name.is_empty() {
                    booking.bike_name = bike.name.clone();
                }
                // The bike is written back unchanged: new bookings are fresh
                // documents, so the bike is what two overlapping requests
                // collide on.
                Ok((
                    booking.clone(),
                    vec![TxWrite::Booking(booking), TxWrite::Bike(bike)],
                ))
            })
            .await?;

        tracing::debug!(booking_id = %created.id, bike_id = %created.bike_id, "Booking stored");
        Ok(created)
    }

    pub async fn get_booking(&self, booking_id: &str) -> Result<Option<Booking>, AppError> {
        self.get_doc(collections::BOOKINGS, booking_id).await
    }

    pub async fn save_booking(&self, booking: &Booking) -> Result<(), AppError> {
        self.set_doc(collections::BOOKINGS, &booking.id, booking)
            .await
    }

    pub async fn delete_booking(&self, booking_id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::BOOKINGS, booking_id).await
    }

    // ─── Notification Operations ─────────────────────────────────

    /// Notifications newest first, optionally of one type.
    pub async fn list_notifications(
        &self,
        kind: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Notification>, AppError> {
        let notifications: Vec<Notification> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::NOTIFICATIONS)
            .filter(|q| q.for_all([kind.and_then(|k| q.field("type").eq(k))]))
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(db_error)?;
        Ok(adopt_ids(notifications))
    }

    pub async fn count_unread_notifications(&self) -> Result<usize, AppError> {
        let unread: Vec<Notification> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::NOTIFICATIONS)
            .filter(|q| q.for_all([q.field("read").eq(false)]))
            .obj()
            .query()
            .await
            .map_err(db_error)?;
        Ok(unread.len())
    }

    pub async fn get_notification(&self, id: &str) -> Result<Option<Notification>, AppError> {
        self.get_doc(collections::NOTIFICATIONS, id).await
    }

    /// Store a notification, assigning an id when it has none.
    pub async fn save_notification(
        &self,
        notification: &Notification,
    ) -> Result<Notification, AppError> {
        let mut notification = notification.clone();
        if notification.id.is_empty() {
            notification.id = uuid::Uuid::new_v4().to_string();
        }
        self.set_doc(collections::NOTIFICATIONS, &notification.id, &notification)
            .await?;
        Ok(notification)
    }

    pub async fn delete_notification(&self, id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::NOTIFICATIONS, id).await
    }

    /// Delete every notification. Returns how many were removed.
    pub async fn clear_notifications(&self) -> Result<usize, AppError> {
        let all: Vec<Notification> = self.list_all(collections::NOTIFICATIONS).await?;
        let count = all.len();
        self.batch_delete(&all, collections::NOTIFICATIONS, |n: &Notification| {
            n.id.clone()
        })
        .await?;
        tracing::info!(count, "Cleared notifications");
        Ok(count)
    }

    // ─── Settings Operations ─────────────────────────────────────

    pub async fn get_tracking_settings(&self) -> Result<Option<TrackingSettings>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::APP_CONFIG)
            .obj()
            .one(collections::SETTINGS_DOC)
            .await
            .map_err(db_error)
    }

    pub async fn set_tracking_settings(&self, settings: &TrackingSettings) -> Result<(), AppError> {
        self.set_doc(collections::APP_CONFIG, collections::SETTINGS_DOC, settings)
            .await
    }

    // ─── Payment Operations ──────────────────────────────────────

    /// Every payment, newest first.
    pub async fn list_payments(&self) -> Result<Vec<Payment>, AppError> {
        let mut payments: Vec<Payment> = self.list_all(collections::PAYMENTS).await?;
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }

    pub async fn get_payment(&self, payment_id: &str) -> Result<Option<Payment>, AppError> {
        self.get_doc(collections::PAYMENTS, payment_id).await
    }

    /// Confirm or reject a pending payment, read and written in one transaction.
    pub async fn review_payment_atomic(
        &self,
        payment_id: &str,
        decision: PaymentReviewStatus,
        reviewer: &str,
    ) -> Result<Payment, AppError> {
        let payment = self
            .run_atomic("review_payment", move |tx| async move {
                let mut payment: Payment = read_doc(&tx, collections::PAYMENTS, payment_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Payment {}", payment_id)))?;
                payment.review(decision, reviewer, chrono::Utc::now())?;
                Ok((payment.clone(), vec![TxWrite::PaymentReview(payment)]))
            })
            .await?;

        tracing::info!(payment_id, status = ?payment.status, reviewer, "Payment reviewed");
        Ok(payment)
    }

    pub async fn get_payment_settings(&self) -> Result<Option<PaymentSettings>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::SETTINGS)
            .obj()
            .one(collections::PAYMENT_SETTINGS_DOC)
            .await
            .map_err(db_error)
    }

    pub async fn set_payment_settings(&self, settings: &PaymentSettings) -> Result<(), AppError> {
        self.patch_doc(
            collections::SETTINGS,
            collections::PAYMENT_SETTINGS_DOC,
            settings,
            &["gcashNumber", "businessName", "qrCodeUrl"],
        )
        .await
    }

    // ─── Support Operations ──────────────────────────────────────

    /// Support inbox, newest first.
    pub async fn list_support_messages(&self) -> Result<Vec<SupportMessage>, AppError> {
        let mut messages: Vec<SupportMessage> =
            self.list_all(collections::SUPPORT_MESSAGES).await?;
        messages.sort_by(|a, b| b.date_created.cmp(&a.date_created));
        Ok(messages)
    }

    pub async fn get_support_message(&self, id: &str) -> Result<Option<SupportMessage>, AppError> {
        self.get_doc(collections::SUPPORT_MESSAGES, id).await
    }

    /// Write `fields` of a support message, leaving what the app wrote alone.
    pub async fn patch_support_message(
        &self,
        message: &SupportMessage,
        fields: &[&str],
    ) -> Result<(), AppError> {
        self.patch_doc(collections::SUPPORT_MESSAGES, &message.id, message, fields)
            .await
    }

    /// FAQs in display order.
    pub async fn list_faqs(&self) -> Result<Vec<Faq>, AppError> {
        let mut faqs: Vec<Faq> = self.list_all(collections::FAQS).await?;
        faqs.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
        Ok(faqs)
    }

    pub async fn get_faq(&self, faq_id: &str) -> Result<Option<Faq>, AppError> {
        self.get_doc(collections::FAQS, faq_id).await
    }

    pub async fn save_faq(&self, faq: &Faq) -> Result<(), AppError> {
        self.set_doc(collections::FAQS, &faq.id, faq).await
    }

    pub async fn update_faq(&self, faq: &Faq) -> Result<(), AppError> {
        self.patch_doc(
            collections::FAQS,
            &faq.id,
            faq,
            &crate::models::support::FAQ_EDIT_FIELDS,
        )
        .await
    }

    pub async fn delete_faq(&self, faq_id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::FAQS, faq_id).await
    }

    // ─── Helper Methods ────────────────────────────────────────────

    /// Helper to batch delete documents using transactions.
    async fn batch_delete<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        F: Fn(&T) -> String,
    {
        let client = self.get_client()?;

        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for item in chunk {
                let doc_id = id_extractor(item);
                client
                    .fluent()
                    .delete()
                    .from(collection)
                    .document_id(&doc_id)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add deletion to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch deletion: {}", e))
            })?;
        }

        Ok(())
    }
}
