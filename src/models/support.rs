// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Customer support inbox and the FAQ list shown in the app.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const STATUS_FIELDS: [&str; 2] = ["status", "lastUpdated"];
pub const RESPONSE_FIELDS: [&str; 4] = ["response", "status", "respondedAt", "lastUpdated"];
pub const FAQ_EDIT_FIELDS: [&str; 3] = ["question", "answer", "updatedAt"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MessageStatus {
    #[default]
    New,
    InProgress,
    Resolved,
}

impl std::str::FromStr for MessageStatus {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(Self::New),
            "in-progress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            other => Err(AppError::BadRequest(format!(
                "Unknown message status '{}'",
                other
            ))),
        }
    }
}

/// Message document at `supportMessages/{id}`, written by the app.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportMessage {
    #[serde(default)]
    pub id: String,
    /// Firestore document ID, filled in on read
    #[serde(default, rename = "_firestore_id", skip_serializing)]
    pub doc_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub user_avatar: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: MessageStatus,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub responded_at: Option<DateTime<Utc>>,
}

impl SupportMessage {
    pub fn set_status(&mut self, status: MessageStatus, now: DateTime<Utc>) {
        self.status = status;
        self.last_updated = Some(now);
    }

    /// Answer the message; answering resolves it.
    pub fn respond(&mut self, response: &str, now: DateTime<Utc>) -> Result<(), AppError> {
        let response = response.trim();
        if response.is_empty() {
            return Err(AppError::BadRequest("Response cannot be empty".to_string()));
        }
        self.response = Some(response.to_string());
        self.status = MessageStatus::Resolved;
        self.responded_at = Some(now);
        self.last_updated = Some(now);
        Ok(())
    }

    /// Case-insensitive match on sender name, subject or body.
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        [&self.user_name, &self.subject, &self.message]
            .into_iter()
            .any(|field| field.to_lowercase().contains(&term))
    }
}

/// FAQ document at `faqs/{id}`, shown in the app ordered by `order`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Faq {
    #[serde(default)]
    pub id: String,
    /// Firestore document ID, filled in on read
    #[serde(default, rename = "_firestore_id", skip_serializing)]
    pub doc_id: Option<String>,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Request body for creating or editing a FAQ.
#[derive(Debug, Clone, Deserialize)]
pub struct FaqInput {
    pub question: String,
    pub answer: String,
}

impl FaqInput {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.question.trim().is_empty() || self.answer.trim().is_empty() {
            return Err(AppError::BadRequest(
                "Both question and answer are required".to_string(),
            ));
        }
        Ok(())
    }

    /// New FAQ placed after the `existing` ones.
    pub fn into_faq(self, existing: usize, now: DateTime<Utc>) -> Faq {
        Faq {
            id: uuid::Uuid::new_v4().to_string(),
            doc_id: None,
            question: self.question.trim().to_string(),
            answer: self.answer.trim().to_string(),
            order: u32::try_from(existing).unwrap_or(u32::MAX).saturating_add(1),
            created_at: Some(now),
            updated_at: None,
        }
    }
}

impl Faq {
    pub fn apply(&mut self, input: &FaqInput, now: DateTime<Utc>) {
        self.question = input.question.trim().to_string();
        self.answer = input.answer.trim().to_string();
        self.updated_at = Some(now);
    }
}
