// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bike QR codes: generation, SVG rendering and fleet audits.
//!
//! Older bikes only carry a `hardwareId`; the app accepts either field when a
//! rider scans a code, so both are checked for collisions.

use crate::error::AppError;
use crate::models::Bike;
use chrono::{DateTime, Utc};
use qrcode::render::svg;
use qrcode::QrCode;
use serde::Serialize;
use std::collections::HashMap;

const SVG_MIN_SIZE: u32 = 256;

/// New printable code, e.g. `BIKE-3F2A9C01`.
pub fn generate_code() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("BIKE-{}", id[..8].to_ascii_uppercase())
}

/// Render `code` as a standalone SVG document.
pub fn render_svg(code: &str) -> Result<String, AppError> {
    let qr = QrCode::new(code.as_bytes())
        .map_err(|e| AppError::BadRequest(format!("Cannot encode QR code: {}", e)))?;
    Ok(qr
        .render::<svg::Color>()
        .min_dimensions(SVG_MIN_SIZE, SVG_MIN_SIZE)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build())
}

/// Field a code was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CodeField {
    QrCode,
    HardwareId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Collision {
    pub bike_id: String,
    pub bike_name: String,
    pub field: CodeField,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollisionReport {
    pub has_collisions: bool,
    pub collisions: Vec<Collision>,
}

/// Every place `code` is already used among `bikes`.
pub fn find_collisions(code: &str, bikes: &[Bike]) -> CollisionReport {
    let mut collisions = Vec::new();
    for bike in bikes {
        let fields = [
            (CodeField::QrCode, bike.qr_code.as_deref()),
            (CodeField::HardwareId, bike.hardware_id.as_deref()),
        ];
        for (field, value) in fields {
            if value == Some(code) {
                collisions.push(Collision {
                    bike_id: bike.id.clone(),
                    bike_name: bike.name.clone(),
                    field,
                    value: code.to_string(),
                });
            }
        }
    }
    CollisionReport {
        has_collisions: !collisions.is_empty(),
        collisions,
    }
}

/// Check that `code` is free, ignoring the bike that already owns it.
pub fn ensure_unused(code: &str, bikes: &[Bike], owner: Option<&str>) -> Result<(), AppError> {
    let taken_by = bikes
        .iter()
        .filter(|b| Some(b.id.as_str()) != owner)
        .find(|b| b.qr_code.as_deref() == Some(code) || b.hardware_id.as_deref() == Some(code));

    match taken_by {
        Some(bike) => Err(AppError::Conflict(format!(
            "QR code {} is already used by bike {}",
            code, bike.id
        ))),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCode {
    pub code: String,
    pub bikes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MismatchedCodes {
    pub bike_id: String,
    pub qr_code: String,
    pub hardware_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrSummary {
    pub total_bikes: usize,
    pub bikes_with_qr_code: usize,
    pub bikes_with_hardware_id: usize,
    pub bikes_without_identifiers: usize,
    pub duplicate_qr_codes: usize,
    pub total_issues: usize,
}

/// Fleet-wide QR audit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrReport {
    pub timestamp: DateTime<Utc>,
    pub summary: QrSummary,
    pub duplicate_qr_codes: Vec<DuplicateCode>,
    pub duplicate_hardware_ids: Vec<DuplicateCode>,
    /// Bikes with neither identifier
    pub missing_identifiers: Vec<String>,
    pub mismatches: Vec<MismatchedCodes>,
    pub recommendations: Vec<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Group bike ids by code, keeping codes used more than once.
fn duplicates<'a>(codes: impl Iterator<Item = (&'a str, &'a str)>) -> Vec<DuplicateCode> {
    let mut by_code: HashMap<&str, Vec<String>> = HashMap::new();
    let mut order = Vec::new();
    for (code, bike_id) in codes {
        let ids = by_code.entry(code).or_default();
        if ids.is_empty() {
            order.push(code);
        }
        ids.push(bike_id.to_string());
    }
    order
        .into_iter()
        .filter_map(|code| {
            let bikes = by_code.remove(code)?;
            (bikes.len() > 1).then(|| DuplicateCode {
                code: code.to_string(),
                bikes,
            })
        })
        .collect()
}

pub fn audit(bikes: &[Bike], now: DateTime<Utc>) -> QrReport {
    let with_qr = bikes.iter().filter(|b| present(&b.qr_code).is_some()).count();
    let with_hardware = bikes
        .iter()
        .filter(|b| present(&b.hardware_id).is_some())
        .count();
    let only_hardware = bikes
        .iter()
        .filter(|b| present(&b.qr_code).is_none() && present(&b.hardware_id).is_some())
        .count();

    let duplicate_qr_codes = duplicates(
        bikes
            .iter()
            .filter_map(|b| Some((present(&b.qr_code)?, b.id.as_str()))),
    );
    let duplicate_hardware_ids = duplicates(
        bikes
            .iter()
            .filter_map(|b| Some((present(&b.hardware_id)?, b.id.as_str()))),
    );

    let missing_identifiers: Vec<String> = bikes
        .iter()
        .filter(|b| b.effective_qr_code().is_none())
        .map(|b| b.id.clone())
        .collect();

    let mismatches: Vec<MismatchedCodes> = bikes
        .iter()
        .filter_map(|b| {
            let qr = present(&b.qr_code)?;
            let hardware = present(&b.hardware_id)?;
            (qr != hardware).then(|| MismatchedCodes {
                bike_id: b.id.clone(),
                qr_code: qr.to_string(),
                hardware_id: hardware.to_string(),
            })
        })
        .collect();

    let total_issues = duplicate_hardware_ids.len() + missing_identifiers.len() + mismatches.len();

    let mut recommendations = Vec::new();
    if !missing_identifiers.is_empty() {
        recommendations.push(format!(
            "{} bikes have neither a QR code nor a hardware ID. Assign codes to them.",
            missing_identifiers.len()
        ));
    }
    if !duplicate_qr_codes.is_empty() {
        recommendations.push(format!(
            "{} QR codes are shared by several bikes. Resolve these manually.",
            duplicate_qr_codes.len()
        ));
    }
    if only_hardware > 0 {
        recommendations.push(format!(
            "{} bikes only have a hardware ID. Run the migration to copy it to the QR code field.",
            only_hardware
        ));
    }
    if total_issues == 0 && duplicate_qr_codes.is_empty() && only_hardware == 0 {
        recommendations.push("All bikes have a valid QR code.".to_string());
    }

    QrReport {
        timestamp: now,
        summary: QrSummary {
            total_bikes: bikes.len(),
            bikes_with_qr_code: with_qr,
            bikes_with_hardware_id: with_hardware,
            bikes_without_identifiers: missing_identifiers.len(),
            duplicate_qr_codes: duplicate_qr_codes.len(),
            total_issues,
        },
        duplicate_qr_codes,
        duplicate_hardware_ids,
        missing_identifiers,
        mismatches,
        recommendations,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationResult {
    pub total_bikes: usize,
    pub migrated_count: usize,
    pub skipped_count: usize,
}

/// Copy `hardwareId` into `qrCode` where the latter is missing.
///
/// Returns the bikes that changed; the caller persists them.
pub fn plan_migration(bikes: &[Bike], now: DateTime<Utc>) -> (Vec<Bike>, MigrationResult) {
    let migrated: Vec<Bike> = bikes
        .iter()
        .filter(|b| present(&b.qr_code).is_none())
        .filter_map(|b| {
            let hardware = present(&b.hardware_id)?.to_string();
            let mut bike = b.clone();
            bike.qr_code = Some(hardware);
            bike.last_updated = Some(now);
            Some(bike)
        })
        .collect();

    let result = MigrationResult {
        total_bikes: bikes.len(),
        migrated_count: migrated.len(),
        skipped_count: bikes.len() - migrated.len(),
    };
    (migrated, result)
}
