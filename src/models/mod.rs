// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod bike;
pub mod booking;
pub mod maintenance;
pub mod notification;
pub mod payment;
pub mod review;
pub mod ride;
pub mod settings;
pub mod stats;
pub mod support;
pub mod user;

pub use bike::{Bike, BikeStatus, MaintenanceStatus};
pub use booking::{Booking, BookingStatus};
pub use maintenance::{LocationRecord, MaintenanceLog};
pub use notification::Notification;
pub use payment::{Payment, PaymentSettings};
pub use review::Review;
pub use ride::{LocationPoint, Ride, RideStatus};
pub use settings::TrackingSettings;
pub use stats::DashboardStats;
pub use support::{Faq, SupportMessage};
pub use user::{Role, User};

/// Firestore documents keyed by an `id` field.
///
/// The mobile app does not always write `id` into the document body, so
/// reads fall back to the document name.
pub trait Document {
    fn id(&self) -> &str;
    fn adopt_doc_id(&mut self);
}

macro_rules! impl_document {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Document for $ty {
                fn id(&self) -> &str {
                    &self.id
                }

                fn adopt_doc_id(&mut self) {
                    if let Some(doc_id) = self.doc_id.take() {
                        if self.id.is_empty() {
                            self.id = doc_id;
                        }
                    }
                }
            }
        )+
    };
}

impl_document!(
    Bike,
    Booking,
    Faq,
    MaintenanceLog,
    Notification,
    Payment,
    Review,
    Ride,
    SupportMessage,
    User,
);
