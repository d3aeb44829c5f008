// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin notifications, mostly raised by booking changes.

use crate::error::AppError;
use crate::models::booking::Booking;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// Notification document at `notifications/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(default)]
    pub id: String,
    /// Firestore document ID, filled in on read
    #[serde(default, rename = "_firestore_id", skip_serializing)]
    pub doc_id: Option<String>,
    /// cancellation, confirmation, completion, general, ...
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub booking_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub bike_id: Option<String>,
    #[serde(default)]
    pub bike_name: Option<String>,
    #[serde(default)]
    pub cancel_reason: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub read_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub read_by: Option<String>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: String,
}

impl Notification {
    fn for_booking(
        booking: &Booking,
        kind: &str,
        title: &str,
        message: String,
        priority: Priority,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: String::new(),
            doc_id: None,
            kind: kind.to_string(),
            title: title.to_string(),
            message,
            booking_id: Some(booking.id.clone()),
            user_id: Some(booking.user_id.clone()),
            bike_id: Some(booking.bike_id.clone()),
            bike_name: Some(booking.bike_name.clone()),
            cancel_reason: None,
            priority,
            category: "booking".to_string(),
            read: false,
            read_at: None,
            read_by: None,
            created_at: now,
            created_by: created_by.to_string(),
        }
    }

    pub fn booking_confirmed(booking: &Booking, created_by: &str, now: DateTime<Utc>) -> Self {
        Self::for_booking(
            booking,
            "confirmation",
            "Booking Confirmed",
            format!("Booking for {} has been confirmed.", booking.display_bike()),
            Priority::Medium,
            created_by,
            now,
        )
    }

    pub fn booking_completed(booking: &Booking, created_by: &str, now: DateTime<Utc>) -> Self {
        Self::for_booking(
            booking,
            "completion",
            "Booking Completed",
            format!("Booking for {} has been completed.", booking.display_bike()),
            Priority::Low,
            created_by,
            now,
        )
    }

    pub fn booking_cancelled(
        booking: &Booking,
        reason: Option<&str>,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let reason = reason.map(str::trim).filter(|r| !r.is_empty());
        let message = match reason {
            Some(r) => format!(
                "Booking for {} has been cancelled. Reason: {}",
                booking.display_bike(),
                r
            ),
            None => format!("Booking for {} has been cancelled.", booking.display_bike()),
        };
        let mut n = Self::for_booking(
            booking,
            "cancellation",
            "Booking Cancelled",
            message,
            Priority::High,
            created_by,
            now,
        );
        n.cancel_reason = reason.map(str::to_string);
        n
    }

    pub fn mark_read(&mut self, by: &str, now: DateTime<Utc>) {
        self.read = true;
        self.read_at = Some(now);
        self.read_by = Some(by.to_string());
    }
}

/// Request body for an admin-authored notification.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub bike_id: Option<String>,
}

fn default_kind() -> String {
    "general".to_string()
}

impl NewNotification {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::BadRequest("Title is required".to_string()));
        }
        if self.message.trim().is_empty() {
            return Err(AppError::BadRequest("Message is required".to_string()));
        }
        if self.kind.trim().is_empty() {
            return Err(AppError::BadRequest("Type cannot be empty".to_string()));
        }
        Ok(())
    }

    pub fn into_notification(self, created_by: &str, now: DateTime<Utc>) -> Notification {
        Notification {
            id: String::new(),
            doc_id: None,
            kind: self.kind.trim().to_string(),
            title: self.title.trim().to_string(),
            message: self.message.trim().to_string(),
            booking_id: None,
            user_id: self.user_id,
            bike_id: self.bike_id,
            bike_name: None,
            cancel_reason: None,
            priority: self.priority,
            category: "admin".to_string(),
            read: false,
            read_at: None,
            read_by: None,
            created_at: now,
            created_by: created_by.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::booking::tests::make_booking;

    #[test]
    fn test_cancellation_message_includes_reason() {
        let booking = make_booking("bk1");
        let n = Notification::booking_cancelled(&booking, Some(" flat tire "), "admin1", Utc::now());
        assert_eq!(n.kind, "cancellation");
        assert_eq!(n.priority, Priority::High);
        assert_eq!(
            n.message,
            "Booking for Trail Runner has been cancelled. Reason: flat tire"
        );
        assert_eq!(n.cancel_reason.as_deref(), Some("flat tire"));
    }

    #[test]
    fn test_cancellation_without_reason() {
        let booking = make_booking("bk1");
        let n = Notification::booking_cancelled(&booking, Some("  "), "admin1", Utc::now());
        assert_eq!(n.message, "Booking for Trail Runner has been cancelled.");
        assert_eq!(n.cancel_reason, None);
    }

    #[test]
    fn test_new_notification_requires_title() {
        let input = NewNotification {
            kind: "general".to_string(),
            title: " ".to_string(),
            message: "hello".to_string(),
            priority: Priority::Low,
            user_id: None,
            bike_id: None,
        };
        assert!(input.validate().is_err());
    }
}
