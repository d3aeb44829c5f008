// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Mobile app settings controlled from the dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Document at `app_config/settings`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingSettings {
    /// Whether the app restricts rides to the service area
    #[serde(default)]
    pub location_restriction_enabled: bool,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_by: Option<String>,
}
