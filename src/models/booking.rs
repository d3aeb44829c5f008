// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Advance bookings of a bike for a time window.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Bookings in these states hold the bike.
    pub fn blocks_bike(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }

    pub fn is_final(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
}

/// Booking document at `bookings/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(default)]
    pub id: String,
    /// Firestore document ID, filled in on read
    #[serde(default, rename = "_firestore_id", skip_serializing)]
    pub doc_id: Option<String>,
    pub bike_id: String,
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub bike_name: String,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub total_price: f64,
    #[serde(default)]
    pub status: BookingStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default = "default_hourly")]
    pub is_hourly: bool,
    #[serde(default)]
    pub notes: String,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_hourly() -> bool {
    true
}

impl Booking {
    pub fn display_bike(&self) -> &str {
        if self.bike_name.is_empty() {
            "bike"
        } else {
            &self.bike_name
        }
    }

    /// Whether this booking holds the bike at any point in `[start, end]`.
    ///
    /// Both ends are inclusive, so back-to-back bookings sharing an instant
    /// conflict.
    pub fn conflicts_with(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.status.blocks_bike() && self.start_time <= end && self.end_time >= start
    }

    /// "2h 30m" for hourly bookings, "3 days" for daily ones.
    pub fn duration_label(&self) -> String {
        let minutes = (self.end_time - self.start_time).num_minutes().max(0);
        if self.is_hourly {
            format!("{}h {}m", minutes / 60, minutes % 60)
        } else {
            let days = (minutes + 24 * 60 - 1) / (24 * 60);
            format!("{} day{}", days, if days == 1 { "" } else { "s" })
        }
    }

    /// Move to `next`. Completed and cancelled bookings are final.
    pub fn transition(&mut self, next: BookingStatus, now: DateTime<Utc>) -> Result<(), AppError> {
        if self.status.is_final() {
            return Err(AppError::Conflict(format!(
                "Booking is already {:?}",
                self.status
            )));
        }
        if next == self.status {
            return Err(AppError::Conflict(format!("Booking is already {:?}", next)));
        }
        self.status = next;
        self.updated_at = Some(now);
        Ok(())
    }
}

/// Request body for creating a booking.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub bike_id: String,
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub bike_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_price: f64,
    #[serde(default)]
    pub status: BookingStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default = "default_hourly")]
    pub is_hourly: bool,
    #[serde(default)]
    pub notes: String,
}

impl NewBooking {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.bike_id.trim().is_empty() {
            return Err(AppError::BadRequest("bikeId is required".to_string()));
        }
        if self.user_id.trim().is_empty() {
            return Err(AppError::BadRequest("userId is required".to_string()));
        }
        if self.end_time <= self.start_time {
            return Err(AppError::BadRequest(
                "endTime must be after startTime".to_string(),
            ));
        }
        if !self.total_price.is_finite() || self.total_price < 0.0 {
            return Err(AppError::BadRequest(
                "totalPrice must be zero or more".to_string(),
            ));
        }
        if self.status.is_final() {
            return Err(AppError::BadRequest(
                "New bookings must be PENDING or CONFIRMED".to_string(),
            ));
        }
        Ok(())
    }

    pub fn into_booking(self, now: DateTime<Utc>) -> Booking {
        Booking {
            id: String::new(),
            doc_id: None,
            bike_id: self.bike_id.trim().to_string(),
            user_id: self.user_id.trim().to_string(),
            user_name: self.user_name,
            bike_name: self.bike_name,
            start_time: self.start_time,
            end_time: self.end_time,
            total_price: self.total_price,
            status: self.status,
            payment_status: self.payment_status,
            is_hourly: self.is_hourly,
            notes: self.notes,
            created_at: Some(now),
            updated_at: None,
        }
    }
}
