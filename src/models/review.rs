// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bike reviews left by riders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Review document at `reviews/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(default)]
    pub id: String,
    /// Firestore document ID, filled in on read
    #[serde(default, rename = "_firestore_id", skip_serializing)]
    pub doc_id: Option<String>,
    pub bike_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    /// 1 to 5 stars
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub comment: String,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Review {
    /// Ratings outside 1..=5 come from broken clients and are not counted.
    pub fn has_valid_rating(&self) -> bool {
        (1.0..=5.0).contains(&self.rating)
    }
}

/// Aggregate kept on the bike document.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RatingSummary {
    pub average_rating: f64,
    pub total_reviews: u32,
}

/// Recompute a bike's rating aggregate from its remaining reviews.
pub fn summarize(reviews: &[Review]) -> RatingSummary {
    let valid: Vec<f64> = reviews
        .iter()
        .filter(|r| r.has_valid_rating())
        .map(|r| r.rating)
        .collect();

    if valid.is_empty() {
        return RatingSummary::default();
    }

    let average = valid.iter().sum::<f64>() / valid.len() as f64;
    RatingSummary {
        average_rating: (average * 10.0).round() / 10.0,
        total_reviews: valid.len() as u32,
    }
}
