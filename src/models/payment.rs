// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! GCash payments submitted from the mobile app for admin review.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Field names written when an admin reviews a payment.
pub const REVIEW_FIELDS: [&str; 3] = ["status", "processedAt", "processedBy"];

/// Default GCash account shown before an admin configures one.
const DEFAULT_GCASH_NUMBER: &str = "09123456789";
const DEFAULT_BUSINESS_NAME: &str = "Bambike Cycles";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentReviewStatus {
    #[default]
    Pending,
    Confirmed,
    Rejected,
}

impl std::str::FromStr for PaymentReviewStatus {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "CONFIRMED" => Ok(Self::Confirmed),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(AppError::BadRequest(format!(
                "Unknown payment status '{}'",
                other
            ))),
        }
    }
}

/// Amount as written by the app: usually a number, sometimes a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Number(f64),
    Text(String),
}

impl Amount {
    /// Numeric value; unparseable text counts as zero.
    pub fn value(&self) -> f64 {
        match self {
            Amount::Number(n) if n.is_finite() => *n,
            Amount::Number(_) => 0.0,
            Amount::Text(s) => s.trim().parse().ok().filter(|n: &f64| n.is_finite()).unwrap_or(0.0),
        }
    }
}

impl Default for Amount {
    fn default() -> Self {
        Amount::Number(0.0)
    }
}

/// Payment document at `payments/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(default)]
    pub id: String,
    /// Firestore document ID, filled in on read
    #[serde(default, rename = "_firestore_id", skip_serializing)]
    pub doc_id: Option<String>,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub amount: Amount,
    #[serde(default)]
    pub status: PaymentReviewStatus,
    #[serde(default)]
    pub mobile_number: Option<String>,
    #[serde(default)]
    pub reference_number: Option<String>,
    #[serde(default)]
    pub bike_type: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub screenshot_url: Option<String>,
    #[serde(default)]
    pub booking_id: Option<String>,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub processed_by: Option<String>,
}

impl Payment {
    /// Confirm or reject a pending payment.
    pub fn review(
        &mut self,
        decision: PaymentReviewStatus,
        reviewer: &str,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        if decision == PaymentReviewStatus::Pending {
            return Err(AppError::BadRequest(
                "A payment can only be CONFIRMED or REJECTED".to_string(),
            ));
        }
        if self.status != PaymentReviewStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Payment is already {:?}",
                self.status
            )));
        }
        self.status = decision;
        self.processed_at = Some(now);
        self.processed_by = Some(reviewer.to_string());
        Ok(())
    }

    /// Case-insensitive match on mobile number, reference number or bike type.
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        [&self.mobile_number, &self.reference_number, &self.bike_type]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&term))
    }
}

/// Counts shown above the payments table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PaymentStats {
    pub total: usize,
    pub pending: usize,
    pub confirmed: usize,
    pub rejected: usize,
}

pub fn summarize(payments: &[Payment]) -> PaymentStats {
    payments
        .iter()
        .fold(PaymentStats::default(), |mut stats, payment| {
            stats.total += 1;
            match payment.status {
                PaymentReviewStatus::Pending => stats.pending += 1,
                PaymentReviewStatus::Confirmed => stats.confirmed += 1,
                PaymentReviewStatus::Rejected => stats.rejected += 1,
            }
            stats
        })
}

/// Document at `settings/payment`: where riders send GCash payments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSettings {
    pub gcash_number: String,
    pub business_name: String,
    #[serde(default)]
    pub qr_code_url: String,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            gcash_number: DEFAULT_GCASH_NUMBER.to_string(),
            business_name: DEFAULT_BUSINESS_NAME.to_string(),
            qr_code_url: String::new(),
        }
    }
}

impl PaymentSettings {
    /// Trim fields and check the GCash number is `09` plus nine digits.
    pub fn normalized(self) -> Result<Self, AppError> {
        let gcash_number = self.gcash_number.trim().to_string();
        let business_name = self.business_name.trim().to_string();

        if gcash_number.is_empty() || business_name.is_empty() {
            return Err(AppError::BadRequest(
                "GCash number and business name are required".to_string(),
            ));
        }
        if !is_gcash_number(&gcash_number) {
            return Err(AppError::BadRequest(
                "GCash number must look like 09XXXXXXXXX".to_string(),
            ));
        }

        Ok(Self {
            gcash_number,
            business_name,
            qr_code_url: self.qr_code_url.trim().to_string(),
        })
    }
}

fn is_gcash_number(number: &str) -> bool {
    number.len() == 11 && number.starts_with("09") && number.bytes().all(|b| b.is_ascii_digit())
}
