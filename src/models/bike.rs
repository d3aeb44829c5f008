// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Bike inventory model and its lock / availability state machine.
//!
//! The dashboard and the mobile app both write to `bikes/{id}`, so every
//! state change goes through the methods below. They keep a bike from being
//! locked while ridden, or available while in use.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Maintenance state set by fleet staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "kebab-case")]
pub enum MaintenanceStatus {
    #[default]
    Operational,
    Maintenance,
    Repair,
    OutOfService,
}

impl MaintenanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaintenanceStatus::Operational => "operational",
            MaintenanceStatus::Maintenance => "maintenance",
            MaintenanceStatus::Repair => "repair",
            MaintenanceStatus::OutOfService => "out-of-service",
        }
    }
}

/// Fleet status derived from the stored flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum BikeStatus {
    Available,
    InUse,
    Maintenance,
}

/// Bike document stored at `bikes/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bike {
    /// Document ID (UUID)
    #[serde(default)]
    pub id: String,
    /// Firestore document ID, filled in on read
    #[serde(default, rename = "_firestore_id", skip_serializing)]
    pub doc_id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub bike_type: String,
    /// Display price, e.g. "₱25/hr"
    #[serde(default)]
    pub price: String,
    /// Hourly price used for billing
    #[serde(default)]
    pub price_value: f64,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub is_available: bool,
    #[serde(default)]
    pub is_in_use: bool,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub current_user_id: Option<String>,
    #[serde(default)]
    pub current_ride_id: Option<String>,
    /// Code printed on the bike and scanned by the app to unlock it
    #[serde(default)]
    pub qr_code: Option<String>,
    /// Legacy identifier that predates `qr_code`
    #[serde(default)]
    pub hardware_id: Option<String>,
    #[serde(default)]
    pub maintenance_status: MaintenanceStatus,
    #[serde(default)]
    pub maintenance_notes: String,
    #[serde(default = "default_battery")]
    pub battery_level: u8,
    #[serde(default)]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub total_reviews: Option<u32>,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub last_location_update: Option<DateTime<Utc>>,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_battery() -> u8 {
    100
}

/// Reasons a bike state change is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BikeStateError {
    #[error("bike is not available for use")]
    NotAvailable,
    #[error("bike is already unlocked; relock it before starting a ride")]
    AlreadyUnlocked,
    #[error("bike is already in use")]
    InUse,
    #[error("bike is not operational ({0})")]
    NotOperational(&'static str),
    #[error("bike has no active ride")]
    NoActiveRide,
    #[error("ride {0} does not belong to this bike")]
    RideMismatch(String),
}

impl From<BikeStateError> for AppError {
    fn from(err: BikeStateError) -> Self {
        AppError::Conflict(err.to_string())
    }
}

impl Bike {
    /// Build a fresh bike from validated input.
    pub fn from_new(id: String, input: &NewBike, qr_code: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            doc_id: None,
            name: input.name.trim().to_string(),
            bike_type: input.bike_type.trim().to_string(),
            price: price_label(input.price),
            price_value: input.price,
            image_url: input.image_url.trim().to_string(),
            description: input.description.clone().unwrap_or_default(),
            latitude: input.latitude,
            longitude: input.longitude,
            is_available: true,
            is_in_use: false,
            is_locked: true,
            current_user_id: None,
            current_ride_id: None,
            qr_code: Some(qr_code),
            hardware_id: input.hardware_id.clone(),
            maintenance_status: MaintenanceStatus::Operational,
            maintenance_notes: String::new(),
            battery_level: 100,
            average_rating: None,
            total_reviews: None,
            last_location_update: Some(now),
            last_updated: Some(now),
            created_at: Some(now),
        }
    }

    /// Derived fleet status.
    pub fn status(&self) -> BikeStatus {
        if self.is_in_use {
            BikeStatus::InUse
        } else if self.is_available && self.maintenance_status == MaintenanceStatus::Operational {
            BikeStatus::Available
        } else {
            BikeStatus::Maintenance
        }
    }

    /// QR code to print: `qr_code`, falling back to the legacy hardware id.
    pub fn effective_qr_code(&self) -> Option<&str> {
        self.qr_code
            .as_deref()
            .filter(|c| !c.is_empty())
            .or_else(|| self.hardware_id.as_deref().filter(|c| !c.is_empty()))
    }

    /// Hand the bike to a rider.
    pub fn begin_ride(
        &mut self,
        user_id: &str,
        ride_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), BikeStateError> {
        if self.is_in_use {
            return Err(BikeStateError::InUse);
        }
        if self.maintenance_status != MaintenanceStatus::Operational {
            return Err(BikeStateError::NotOperational(
                self.maintenance_status.as_str(),
            ));
        }
        if !self.is_available {
            return Err(BikeStateError::NotAvailable);
        }
        if !self.is_locked {
            return Err(BikeStateError::AlreadyUnlocked);
        }

        self.is_locked = false;
        self.is_available = false;
        self.is_in_use = true;
        self.current_user_id = Some(user_id.to_string());
        self.current_ride_id = Some(ride_id.to_string());
        self.last_updated = Some(now);
        Ok(())
    }

    /// Take the bike back at the end of a ride and park it at `(lat, lng)`.
    pub fn finish_ride(
        &mut self,
        ride_id: &str,
        latitude: f64,
        longitude: f64,
        now: DateTime<Utc>,
    ) -> Result<(), BikeStateError> {
        match self.current_ride_id.as_deref() {
            Some(current) if current == ride_id => {}
            Some(_) => return Err(BikeStateError::RideMismatch(ride_id.to_string())),
            // A bike released by an earlier force end can still close its ride.
            None if !self.is_in_use => {}
            None => return Err(BikeStateError::NoActiveRide),
        }

        self.is_locked = true;
        self.is_in_use = false;
        self.is_available = self.maintenance_status == MaintenanceStatus::Operational;
        self.current_user_id = None;
        self.current_ride_id = None;
        self.latitude = latitude;
        self.longitude = longitude;
        self.last_location_update = Some(now);
        self.last_updated = Some(now);
        Ok(())
    }

    /// Toggle rental availability.
    ///
    /// Making a non-operational bike available needs `force`.
    pub fn set_availability(
        &mut self,
        available: bool,
        force: bool,
        now: DateTime<Utc>,
    ) -> Result<(), BikeStateError> {
        if available {
            if self.is_in_use {
                return Err(BikeStateError::InUse);
            }
            if self.maintenance_status != MaintenanceStatus::Operational && !force {
                return Err(BikeStateError::NotOperational(
                    self.maintenance_status.as_str(),
                ));
            }
        }
        self.is_available = available;
        self.last_updated = Some(now);
        Ok(())
    }

    /// Lock or unlock the bike remotely.
    pub fn set_locked(&mut self, locked: bool, now: DateTime<Utc>) -> Result<(), BikeStateError> {
        if locked && self.is_in_use {
            return Err(BikeStateError::InUse);
        }
        self.is_locked = locked;
        self.last_updated = Some(now);
        Ok(())
    }

    /// Change the maintenance status. Returns the previous status.
    pub fn set_maintenance(
        &mut self,
        status: MaintenanceStatus,
        notes: &str,
        now: DateTime<Utc>,
    ) -> MaintenanceStatus {
        let previous = self.maintenance_status;
        self.maintenance_status = status;
        self.maintenance_notes = notes.to_string();
        if status != MaintenanceStatus::Operational && !self.is_in_use {
            self.is_available = false;
        }
        self.last_updated = Some(now);
        previous
    }

    /// Move the bike on the map.
    pub fn move_to(&mut self, latitude: f64, longitude: f64, now: DateTime<Utc>) {
        self.latitude = latitude;
        self.longitude = longitude;
        self.last_location_update = Some(now);
        self.last_updated = Some(now);
    }

    /// Apply a partial edit of descriptive fields.
    pub fn apply_update(&mut self, update: &BikeUpdate, now: DateTime<Utc>) {
        if let Some(name) = &update.name {
            self.name = name.trim().to_string();
        }
        if let Some(bike_type) = &update.bike_type {
            self.bike_type = bike_type.trim().to_string();
        }
        if let Some(price) = update.price {
            self.price_value = price;
            self.price = price_label(price);
        }
        if let Some(image_url) = &update.image_url {
            self.image_url = image_url.trim().to_string();
        }
        if let Some(description) = &update.description {
            self.description = description.clone();
        }
        if let Some(qr_code) = &update.qr_code {
            self.qr_code = Some(qr_code.trim().to_string());
        }
        if let Some(battery) = update.battery_level {
            self.battery_level = battery;
        }
        if let (Some(lat), Some(lng)) = (update.latitude, update.longitude) {
            self.move_to(lat, lng, now);
        }
        self.last_updated = Some(now);
    }
}

/// Display price label stored alongside the numeric price.
pub fn price_label(price: f64) -> String {
    if price.fract() == 0.0 {
        format!("₱{}/hr", price as i64)
    } else {
        format!("₱{:.2}/hr", price)
    }
}

/// Check that a coordinate pair can be placed on a map.
pub fn is_valid_coordinate(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && latitude.abs() <= 90.0
        && longitude.abs() <= 180.0
}

/// Request body for creating a bike.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBike {
    pub name: String,
    #[serde(rename = "type")]
    pub bike_type: String,
    pub price: f64,
    pub image_url: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub qr_code: Option<String>,
    #[serde(default)]
    pub hardware_id: Option<String>,
}

impl NewBike {
    /// Form validation, first failure wins.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("Name is required".to_string()));
        }
        if self.bike_type.trim().is_empty() {
            return Err(AppError::BadRequest("Type is required".to_string()));
        }
        validate_price(self.price)?;
        if self.image_url.trim().is_empty() {
            return Err(AppError::BadRequest("Image is required".to_string()));
        }
        if !is_valid_coordinate(self.latitude, self.longitude) {
            return Err(AppError::BadRequest("Location is required".to_string()));
        }
        if let Some(code) = &self.qr_code {
            validate_qr_code(code)?;
        }
        Ok(())
    }
}

/// Partial bike edit.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BikeUpdate {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub bike_type: Option<String>,
    pub price: Option<f64>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub qr_code: Option<String>,
    pub battery_level: Option<u8>,
}

impl BikeUpdate {
    pub fn validate(&self) -> Result<(), AppError> {
        if matches!(&self.name, Some(n) if n.trim().is_empty()) {
            return Err(AppError::BadRequest("Name cannot be empty".to_string()));
        }
        if matches!(&self.bike_type, Some(t) if t.trim().is_empty()) {
            return Err(AppError::BadRequest("Type cannot be empty".to_string()));
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) if !is_valid_coordinate(lat, lng) => {
                return Err(AppError::BadRequest("Invalid coordinates".to_string()));
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(AppError::BadRequest(
                    "Latitude and longitude must be updated together".to_string(),
                ));
            }
            _ => {}
        }
        if let Some(code) = &self.qr_code {
            validate_qr_code(code)?;
        }
        if matches!(self.battery_level, Some(b) if b > 100) {
            return Err(AppError::BadRequest(
                "Battery level must be between 0 and 100".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_price(price: f64) -> Result<(), AppError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(AppError::BadRequest("Valid price is required".to_string()));
    }
    Ok(())
}

const MAX_QR_CODE_LEN: usize = 64;

fn validate_qr_code(code: &str) -> Result<(), AppError> {
    let code = code.trim();
    if code.is_empty() || code.len() > MAX_QR_CODE_LEN {
        return Err(AppError::BadRequest(format!(
            "QR code must be 1-{} characters",
            MAX_QR_CODE_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn make_bike(id: &str) -> Bike {
        let input = NewBike {
            name: "Trail Runner".to_string(),
            bike_type: "Mountain".to_string(),
            price: 25.0,
            image_url: "https://example.com/bike.jpg".to_string(),
            latitude: 14.5995,
            longitude: 120.9842,
            description: None,
            qr_code: None,
            hardware_id: None,
        };
        Bike::from_new(id.to_string(), &input, format!("BIKE-{id}"), Utc::now())
    }

    #[test]
    fn test_new_bike_is_available_and_locked() {
        let bike = make_bike("b1");
        assert!(bike.is_available);
        assert!(bike.is_locked);
        assert!(!bike.is_in_use);
        assert_eq!(bike.status(), BikeStatus::Available);
        assert_eq!(bike.price, "₱25/hr");
    }

    #[test]
    fn test_begin_and_finish_ride() {
        let mut bike = make_bike("b1");
        let now = Utc::now();

        bike.begin_ride("u1", "r1", now).unwrap();
        assert!(bike.is_in_use);
        assert!(!bike.is_locked);
        assert!(!bike.is_available);
        assert_eq!(bike.current_ride_id.as_deref(), Some("r1"));
        assert_eq!(bike.status(), BikeStatus::InUse);

        bike.finish_ride("r1", 14.6, 121.0, now).unwrap();
        assert!(bike.is_locked);
        assert!(bike.is_available);
        assert!(!bike.is_in_use);
        assert_eq!(bike.current_user_id, None);
        assert_eq!(bike.latitude, 14.6);
    }

    #[test]
    fn test_begin_ride_requires_locked_bike() {
        let mut bike = make_bike("b1");
        bike.set_locked(false, Utc::now()).unwrap();
        assert_eq!(
            bike.begin_ride("u1", "r1", Utc::now()),
            Err(BikeStateError::AlreadyUnlocked)
        );
    }

    #[test]
    fn test_begin_ride_rejects_second_rider() {
        let mut bike = make_bike("b1");
        bike.begin_ride("u1", "r1", Utc::now()).unwrap();
        assert_eq!(
            bike.begin_ride("u2", "r2", Utc::now()),
            Err(BikeStateError::InUse)
        );
    }

    #[test]
    fn test_begin_ride_rejects_bike_under_repair() {
        let mut bike = make_bike("b1");
        bike.set_maintenance(MaintenanceStatus::Repair, "flat tire", Utc::now());
        assert!(!bike.is_available);
        assert_eq!(
            bike.begin_ride("u1", "r1", Utc::now()),
            Err(BikeStateError::NotOperational("repair"))
        );
    }

    #[test]
    fn test_cannot_lock_bike_in_use() {
        let mut bike = make_bike("b1");
        bike.begin_ride("u1", "r1", Utc::now()).unwrap();
        assert_eq!(bike.set_locked(true, Utc::now()), Err(BikeStateError::InUse));
        assert_eq!(
            bike.set_availability(true, true, Utc::now()),
            Err(BikeStateError::InUse)
        );
    }

    #[test]
    fn test_availability_needs_force_when_not_operational() {
        let mut bike = make_bike("b1");
        bike.set_maintenance(MaintenanceStatus::Maintenance, "", Utc::now());

        assert!(bike.set_availability(true, false, Utc::now()).is_err());
        bike.set_availability(true, true, Utc::now()).unwrap();
        assert!(bike.is_available);
        // Still reported as maintenance until it is operational again
        assert_eq!(bike.status(), BikeStatus::Maintenance);
    }

    #[test]
    fn test_finish_ride_with_wrong_ride_id() {
        let mut bike = make_bike("b1");
        bike.begin_ride("u1", "r1", Utc::now()).unwrap();
        assert!(matches!(
            bike.finish_ride("r2", 0.0, 0.0, Utc::now()),
            Err(BikeStateError::RideMismatch(_))
        ));
    }

    #[test]
    fn test_effective_qr_code_falls_back_to_hardware_id() {
        let mut bike = make_bike("b1");
        bike.qr_code = None;
        bike.hardware_id = Some("HW-42".to_string());
        assert_eq!(bike.effective_qr_code(), Some("HW-42"));

        bike.qr_code = Some(String::new());
        assert_eq!(bike.effective_qr_code(), Some("HW-42"));

        bike.hardware_id = None;
        assert_eq!(bike.effective_qr_code(), None);
    }

    #[test]
    fn test_new_bike_validation() {
        let mut input = NewBike {
            name: "City".to_string(),
            bike_type: "Hybrid".to_string(),
            price: 0.0,
            image_url: "https://example.com/x.jpg".to_string(),
            latitude: 10.0,
            longitude: 10.0,
            description: None,
            qr_code: None,
            hardware_id: None,
        };
        assert!(input.validate().is_err());

        input.price = 12.5;
        assert!(input.validate().is_ok());

        input.latitude = 91.0;
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_price_label() {
        assert_eq!(price_label(30.0), "₱30/hr");
        assert_eq!(price_label(12.5), "₱12.50/hr");
    }
}
