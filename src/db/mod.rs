//! Database layer (Firestore).

pub mod firestore;

pub use firestore::{FirestoreDb, RideCursor};

/// Collection names as constants.
///
/// These are shared with the mobile app, hence the mixed naming.
pub mod collections {
    pub const BIKES: &str = "bikes";
    pub const USERS: &str = "users";
    pub const RIDES: &str = "rides";
    pub const REVIEWS: &str = "reviews";
    pub const BOOKINGS: &str = "bookings";
    pub const NOTIFICATIONS: &str = "notifications";
    pub const MAINTENANCE_LOGS: &str = "maintenanceLogs";
    pub const BIKE_LOCATION_HISTORY: &str = "bikeLocationHistory";
    pub const PAYMENTS: &str = "payments";
    pub const SUPPORT_MESSAGES: &str = "supportMessages";
    pub const FAQS: &str = "faqs";
    /// Settings the mobile app reads at startup
    pub const APP_CONFIG: &str = "app_config";
    pub const SETTINGS_DOC: &str = "settings";
    /// Dashboard-owned settings (payment details)
    pub const SETTINGS: &str = "settings";
    pub const PAYMENT_SETTINGS_DOC: &str = "payment";
}
