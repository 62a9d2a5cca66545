//! Raw record normalization
//!
//! Digitized claim records arrive with wildly inconsistent key spelling:
//! OCR output uses `CLAIMANT_NAME`, scanned registers use `Block/Tehsil`,
//! older exports use `tehsil` or `taxpayer`. This module folds every known
//! spelling onto the canonical claims-table column names and parses the
//! typed fields (age, income, flags, dates) leniently, so the engine only
//! ever sees one field shape. Normalization never fails; a value that
//! cannot be parsed becomes "absent" and is simply not contributed.

use chrono::NaiveDate;
use fra_common::db::models::{CandidateClaim, ClaimStatus};
use serde_json::Value;
use tracing::debug;

/// Fold a raw key onto canonical form: trim, lowercase, then map spaces,
/// slashes, and hyphens to underscores and collapse runs of underscores.
///
/// `"Block/Tehsil"`, `"BLOCK_TEHSIL"`, and `"block - tehsil"` all become
/// `block_tehsil`.
pub fn canonical_key(raw: &str) -> String {
    let mut key = String::with_capacity(raw.len());
    for ch in raw.trim().chars() {
        let mapped = match ch {
            ' ' | '/' | '-' => '_',
            c => c.to_ascii_lowercase(),
        };
        if mapped == '_' && key.ends_with('_') {
            continue;
        }
        key.push(mapped);
    }
    key.trim_matches('_').to_string()
}

/// Map legacy and alternate canonical keys onto the column name used today.
fn resolve_alias(key: &str) -> &str {
    match key {
        "tehsil" => "block_tehsil",
        "identity_id" => "aadhaar_no",
        "aadhar_no" => "aadhaar_no",
        "taxpayer" => "tax_payer",
        "nearby_water_body" => "water_body",
        "area_of_land_claimed" => "land_claimed",
        other => other,
    }
}

/// Normalize one raw record into a [`CandidateClaim`].
///
/// Unknown keys are logged at debug level and dropped. Values that fail to
/// parse for their field type (a non-numeric age, an unrecognized date
/// format) are treated as absent rather than failing the whole record.
pub fn normalize(raw: &serde_json::Map<String, Value>) -> CandidateClaim {
    let mut candidate = CandidateClaim::default();

    for (raw_key, value) in raw {
        let key = canonical_key(raw_key);
        let text = value_text(value);

        match resolve_alias(&key) {
            "claimant_name" => candidate.claimant_name = text,
            "spouse_name" => candidate.spouse_name = text,
            "age" => candidate.age = parse_age(&text),
            "gender" => candidate.gender = text,
            "aadhaar_no" => candidate.aadhaar_no = text,
            "category" => candidate.category = text,
            "village" => candidate.village = text,
            "gram_panchayat" => candidate.gram_panchayat = text,
            "block_tehsil" => candidate.block_tehsil = text,
            "district" => candidate.district = text,
            "state" => candidate.state = text,
            "claim_type" => candidate.claim_type = text,
            "land_claimed" => candidate.land_claimed = text,
            "land_use" => candidate.land_use = text,
            "annual_income" => candidate.annual_income = parse_money(&text),
            "tax_payer" => candidate.tax_payer = parse_flag(&text),
            "boundary_description" => candidate.boundary_description = text,
            "geo_coordinates" => candidate.geo_coordinates = text,
            "status_of_claim" => candidate.status_of_claim = text,
            "date_of_submission" => candidate.date_of_submission = parse_date(&text),
            "date_of_decision" => candidate.date_of_decision = parse_date(&text),
            "patta_title_no" => candidate.patta_title_no = text,
            "water_body" => candidate.water_body = text,
            "irrigation_source" => candidate.irrigation_source = text,
            "infrastructure_present" => candidate.infrastructure_present = text,
            "claim_status" => candidate.claim_status = ClaimStatus::parse(&text),
            unknown => {
                debug!(key = unknown, "Ignoring unrecognized field in raw record");
            }
        }
    }

    // Registers record workflow state in the free-text status column
    if candidate.claim_status.is_none() && !candidate.status_of_claim.trim().is_empty() {
        candidate.claim_status = ClaimStatus::parse(&candidate.status_of_claim);
    }

    candidate
}

/// Render a JSON value as trimmed text. Non-scalar values are dropped.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => {
            debug!("Dropping non-scalar value in raw record");
            String::new()
        }
    }
}

fn parse_age(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let age = match trimmed.parse::<i64>() {
        Ok(n) => n,
        // OCR sometimes yields "45.0"
        Err(_) => trimmed.parse::<f64>().ok().filter(|f| f.is_finite())? as i64,
    };
    (0..=150).contains(&age).then_some(age)
}

fn parse_money(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|c| *c != ',').collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite() && *f >= 0.0)
}

fn parse_flag(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => Some(true),
        "no" | "n" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// Registers write dates as `15/03/2021`; newer exports use ISO `2021-03-15`.
fn parse_date(text: &str) -> Option<NaiveDate> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"))
        .ok()
}
