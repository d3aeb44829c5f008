// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Maintenance log entries and bike location history records.

use crate::models::bike::MaintenanceStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entry at `maintenanceLogs/{id}`, one per status change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceLog {
    #[serde(default)]
    pub id: String,
    /// Firestore document ID, filled in on read
    #[serde(default, rename = "_firestore_id", skip_serializing)]
    pub doc_id: Option<String>,
    pub bike_id: String,
    pub action: String,
    pub old_status: MaintenanceStatus,
    pub new_status: MaintenanceStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: String,
}

impl MaintenanceLog {
    pub fn status_change(
        bike_id: &str,
        old_status: MaintenanceStatus,
        new_status: MaintenanceStatus,
        notes: &str,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let description = if old_status == new_status {
            format!("Maintenance notes updated ({})", new_status.as_str())
        } else {
            format!(
                "Status changed from {} to {}",
                old_status.as_str(),
                new_status.as_str()
            )
        };
        Self {
            id: String::new(),
            doc_id: None,
            bike_id: bike_id.to_string(),
            action: "status_change".to_string(),
            old_status,
            new_status,
            notes: notes.to_string(),
            description,
            created_at: now,
            created_by: created_by.to_string(),
        }
    }
}

/// Entry at `bikeLocationHistory/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    pub bike_id: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub timestamp: DateTime<Utc>,
}
