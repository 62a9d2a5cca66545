//! Database models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a claim record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Pending,
    Approved,
    Rejected,
    ProcessingError,
}

impl ClaimStatus {
    /// Stored form, also used in log output
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Pending => "pending",
            ClaimStatus::Approved => "approved",
            ClaimStatus::Rejected => "rejected",
            ClaimStatus::ProcessingError => "processing_error",
        }
    }

    /// Parse a status from digitized text, tolerating case and spacing noise
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "pending" => Some(ClaimStatus::Pending),
            "approved" => Some(ClaimStatus::Approved),
            "rejected" => Some(ClaimStatus::Rejected),
            "processing_error" | "processing error" => Some(ClaimStatus::ProcessingError),
            _ => None,
        }
    }
}

impl Default for ClaimStatus {
    fn default() -> Self {
        ClaimStatus::Pending
    }
}

impl std::fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reconciled claim record
///
/// Text fields use the empty string for "not captured"; numeric and date
/// fields use NULL. `aadhaar_no` is the identity key when non-empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Claim {
    pub claim_id: Uuid,
    pub claimant_name: String,
    pub spouse_name: String,
    pub age: Option<i64>,
    pub gender: String,
    pub aadhaar_no: String,
    pub category: String,
    pub village: String,
    pub gram_panchayat: String,
    pub block_tehsil: String,
    pub district: String,
    pub state: String,
    pub claim_type: String,
    pub land_claimed: String,
    pub land_use: String,
    pub annual_income: Option<f64>,
    pub tax_payer: Option<bool>,
    pub boundary_description: String,
    pub geo_coordinates: String,
    pub status_of_claim: String,
    pub date_of_submission: Option<NaiveDate>,
    pub date_of_decision: Option<NaiveDate>,
    pub patta_title_no: String,
    pub water_body: String,
    pub irrigation_source: String,
    pub infrastructure_present: String,
    pub claim_status: ClaimStatus,
    pub update_count: i64,
    pub last_update_source: String,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An incoming record after normalization, before reconciliation
///
/// Same field shape as [`Claim`] minus the system-managed columns. Absent
/// values are the empty string or `None`, which reconciliation treats as
/// "nothing to contribute".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateClaim {
    pub claimant_name: String,
    pub spouse_name: String,
    pub age: Option<i64>,
    pub gender: String,
    pub aadhaar_no: String,
    pub category: String,
    pub village: String,
    pub gram_panchayat: String,
    pub block_tehsil: String,
    pub district: String,
    pub state: String,
    pub claim_type: String,
    pub land_claimed: String,
    pub land_use: String,
    pub annual_income: Option<f64>,
    pub tax_payer: Option<bool>,
    pub boundary_description: String,
    pub geo_coordinates: String,
    pub status_of_claim: String,
    pub date_of_submission: Option<NaiveDate>,
    pub date_of_decision: Option<NaiveDate>,
    pub patta_title_no: String,
    pub water_body: String,
    pub irrigation_source: String,
    pub infrastructure_present: String,
    pub claim_status: Option<ClaimStatus>,
}

/// One append-only audit trail entry for a merge that changed stored fields
///
/// Inserts and no-op merges leave no audit row; the trail exists to show
/// what each later upload overwrote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimAuditRecord {
    pub audit_id: Uuid,
    pub claim_id: Uuid,
    /// Claim as stored before the merge
    pub old_data: Claim,
    /// Claim as stored after the merge
    pub new_data: Claim,
    pub changed_fields: Vec<String>,
    pub update_source: String,
    /// Operator or pipeline identity behind the upload, when known
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One row of the scheme score store
///
/// Mirrors the batch scorer snapshot: denormalized claim context plus the
/// five per-scheme priorities. Priorities default to 0 when the scorer
/// emitted nothing parseable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemeScoreRow {
    pub claim_id: String,
    pub claimant_name: String,
    pub age: Option<f64>,
    pub gender: String,
    pub state: String,
    pub district: String,
    pub block_tehsil: String,
    pub gram_panchayat: String,
    pub village: String,
    pub category: String,
    pub tax_payer: String,
    pub claim_type: String,
    pub status_of_claim: String,
    pub annual_income: Option<f64>,
    pub jal_jeevan_mission_priority: f64,
    pub dajgua_priority: f64,
    pub mgnrega_priority: f64,
    pub pm_kisan_priority: f64,
    pub pmay_priority: f64,
}
