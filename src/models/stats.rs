//! Dashboard analytics payloads.
//!
//! Computed on demand from cached collection snapshots, never stored.

use serde::Serialize;

/// Headline counters for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    // ─── Fleet ───────────────────────────────────────────────────
    pub total_bikes: usize,
    /// Available and not in use
    pub active_bikes: usize,
    pub in_use_bikes: usize,
    /// Everything neither available nor in use
    pub maintenance_bikes: usize,

    // ─── Users ───────────────────────────────────────────────────
    pub total_users: usize,
    pub verified_users: usize,

    // ─── Rides ───────────────────────────────────────────────────
    pub active_rides: usize,
    pub total_rides: usize,

    // ─── Reviews ─────────────────────────────────────────────────
    pub total_reviews: u64,
    /// Rounded to one decimal
    pub average_rating: f64,
}

/// One bucket of the ride activity chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RideCountPoint {
    pub label: String,
    pub rides: u32,
}

/// One bucket of the rating trend chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingPoint {
    pub label: String,
    /// `None` when nobody reviewed in this bucket
    pub average_rating: Option<f64>,
    pub reviews: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingTrend {
    pub points: Vec<RatingPoint>,
    pub overall_average: Option<f64>,
}

/// Revenue over a calendar period.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueReport {
    pub period: String,
    pub total_revenue: f64,
    /// Bookings that started in the period, paid or not
    pub bookings: usize,
    pub start_date: chrono::DateTime<chrono::Utc>,
    pub end_date: chrono::DateTime<chrono::Utc>,
}
