// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ride model and lifecycle.
//!
//! Times are epoch milliseconds, matching what the mobile app writes.

use crate::error::AppError;
use crate::models::bike::Bike;
use crate::services::ride_metrics;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Ride status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum RideStatus {
    Active,
    Paused,
    Completed,
    Cancelled,
    /// Raised by the rider from the app
    Emergency,
}

impl RideStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Active => "active",
            RideStatus::Paused => "paused",
            RideStatus::Completed => "completed",
            RideStatus::Cancelled => "cancelled",
            RideStatus::Emergency => "emergency",
        }
    }

    /// Rides still holding a bike.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            RideStatus::Active | RideStatus::Paused | RideStatus::Emergency
        )
    }
}

impl std::str::FromStr for RideStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(RideStatus::Active),
            "paused" => Ok(RideStatus::Paused),
            "completed" => Ok(RideStatus::Completed),
            "cancelled" => Ok(RideStatus::Cancelled),
            "emergency" => Ok(RideStatus::Emergency),
            other => Err(AppError::BadRequest(format!(
                "Unknown ride status '{}'",
                other
            ))),
        }
    }
}

/// A GPS fix recorded during a ride.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct LocationPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Epoch milliseconds
    #[serde(default)]
    pub timestamp: i64,
    /// Reported speed in km/h
    #[serde(default)]
    pub speed: Option<f64>,
    /// Horizontal accuracy in metres
    #[serde(default)]
    pub accuracy: Option<f64>,
}

impl LocationPoint {
    pub fn at(latitude: f64, longitude: f64, timestamp: i64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
            speed: None,
            accuracy: None,
        }
    }
}

/// Ride document stored at `rides/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ride {
    #[serde(default)]
    pub id: String,
    /// Firestore document ID, filled in on read
    #[serde(default, rename = "_firestore_id", skip_serializing)]
    pub doc_id: Option<String>,
    pub bike_id: String,
    pub user_id: String,
    pub status: RideStatus,
    pub start_time: i64,
    #[serde(default)]
    pub end_time: Option<i64>,
    pub start_location: LocationPoint,
    #[serde(default)]
    pub end_location: Option<LocationPoint>,
    #[serde(default)]
    pub current_location: Option<LocationPoint>,
    #[serde(default)]
    pub path: Vec<LocationPoint>,
    /// Metres
    #[serde(default)]
    pub distance_traveled: f64,
    /// km/h
    #[serde(default)]
    pub max_speed: f64,
    /// km/h
    #[serde(default)]
    pub average_speed: f64,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub price_per_hour: f64,
    #[serde(default)]
    pub paused_at: Option<i64>,
    #[serde(default)]
    pub total_paused_ms: i64,
    #[serde(default)]
    pub emergency_responded: bool,
    #[serde(default)]
    pub emergency_response_time: Option<i64>,
}

/// Reasons a ride transition is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RideStateError {
    #[error("ride is {0}, expected {1}")]
    WrongStatus(&'static str, &'static str),
    #[error("ride has already ended")]
    Ended,
    #[error("ride has no emergency to acknowledge")]
    NoEmergency,
    #[error("emergency was already acknowledged")]
    AlreadyAcknowledged,
    #[error("invalid GPS coordinate")]
    InvalidLocation,
}

impl From<RideStateError> for AppError {
    fn from(err: RideStateError) -> Self {
        match err {
            RideStateError::InvalidLocation => AppError::BadRequest(err.to_string()),
            _ => AppError::Conflict(err.to_string()),
        }
    }
}

const MS_PER_HOUR: f64 = 3_600_000.0;

impl Ride {
    /// New active ride on `bike`, starting where the bike is parked.
    pub fn start(id: String, bike: &Bike, user_id: &str, now_ms: i64) -> Self {
        let origin = LocationPoint::at(bike.latitude, bike.longitude, now_ms);
        Self {
            id,
            doc_id: None,
            bike_id: bike.id.clone(),
            user_id: user_id.to_string(),
            status: RideStatus::Active,
            start_time: now_ms,
            end_time: None,
            current_location: Some(origin.clone()),
            path: vec![origin.clone()],
            start_location: origin,
            end_location: None,
            distance_traveled: 0.0,
            max_speed: 0.0,
            average_speed: 0.0,
            cost: 0.0,
            price_per_hour: bike.price_value,
            paused_at: None,
            total_paused_ms: 0,
            emergency_responded: false,
            emergency_response_time: None,
        }
    }

    pub fn pause(&mut self, now_ms: i64) -> Result<(), RideStateError> {
        if self.status != RideStatus::Active {
            return Err(RideStateError::WrongStatus(self.status.as_str(), "active"));
        }
        self.status = RideStatus::Paused;
        self.paused_at = Some(now_ms);
        Ok(())
    }

    pub fn resume(&mut self, now_ms: i64) -> Result<(), RideStateError> {
        if self.status != RideStatus::Paused {
            return Err(RideStateError::WrongStatus(self.status.as_str(), "paused"));
        }
        self.close_pause(now_ms);
        self.status = RideStatus::Active;
        Ok(())
    }

    fn close_pause(&mut self, now_ms: i64) {
        if let Some(paused_at) = self.paused_at.take() {
            self.total_paused_ms += (now_ms - paused_at).max(0);
        }
    }

    /// Append a GPS fix and refresh the running distance and speeds.
    pub fn record_location(&mut self, point: LocationPoint) -> Result<(), RideStateError> {
        if !matches!(self.status, RideStatus::Active | RideStatus::Emergency) {
            return Err(RideStateError::WrongStatus(self.status.as_str(), "active"));
        }
        if !ride_metrics::is_valid_gps_coordinate(point.latitude, point.longitude) {
            return Err(RideStateError::InvalidLocation);
        }

        if let Some(step) = self
            .path
            .last()
            .and_then(|prev| ride_metrics::segment_distance(prev, &point))
        {
            self.distance_traveled += step;
        }

        self.current_location = Some(point.clone());
        self.path.push(point);

        let speeds = ride_metrics::speeds_from_path(&self.path);
        if speeds.max_speed > 0.0 {
            self.max_speed = speeds.max_speed;
            self.average_speed = speeds.average_speed;
        } else if let Some(last) = self.path.last() {
            let moving_hours =
                (last.timestamp - self.start_time - self.total_paused_ms) as f64 / MS_PER_HOUR;
            if moving_hours > 0.0 {
                self.average_speed = (self.distance_traveled / 1000.0) / moving_hours;
            }
        }
        Ok(())
    }

    /// Time the rider is billed for: elapsed time minus pauses.
    pub fn billable_ms(&self, now_ms: i64) -> i64 {
        let end = self.end_time.unwrap_or(now_ms);
        let open_pause = self.paused_at.map(|p| (end - p).max(0)).unwrap_or(0);
        (end - self.start_time - self.total_paused_ms - open_pause).max(0)
    }

    /// Complete the ride at `end`, returning the charged cost.
    pub fn complete(&mut self, end: LocationPoint, now_ms: i64) -> Result<f64, RideStateError> {
        if !self.status.is_live() {
            return Err(RideStateError::Ended);
        }
        self.close_pause(now_ms);
        self.end_time = Some(now_ms);
        self.cost = ride_cost(self.price_per_hour, self.billable_ms(now_ms));
        self.current_location = Some(end.clone());
        self.end_location = Some(end);
        self.status = RideStatus::Completed;
        Ok(self.cost)
    }

    /// End the ride without charging the rider.
    pub fn cancel(&mut self, now_ms: i64) -> Result<(), RideStateError> {
        if !self.status.is_live() {
            return Err(RideStateError::Ended);
        }
        self.close_pause(now_ms);
        self.end_time = Some(now_ms);
        self.end_location = self.current_location.clone();
        self.cost = 0.0;
        self.status = RideStatus::Cancelled;
        Ok(())
    }

    /// Record that an admin responded to the rider's emergency.
    pub fn acknowledge_emergency(&mut self, now_ms: i64) -> Result<(), RideStateError> {
        if self.status != RideStatus::Emergency {
            return Err(RideStateError::NoEmergency);
        }
        if self.emergency_responded {
            return Err(RideStateError::AlreadyAcknowledged);
        }
        self.emergency_responded = true;
        self.emergency_response_time = Some(now_ms);
        Ok(())
    }
}

/// Hourly price applied to billable time, rounded to centavos.
pub fn ride_cost(price_per_hour: f64, billable_ms: i64) -> f64 {
    let raw = price_per_hour * billable_ms.max(0) as f64 / MS_PER_HOUR;
    (raw * 100.0).round() / 100.0
}
