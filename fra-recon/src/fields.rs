//! Mergeable claim field table
//!
//! Single allowlist describing every claim field the reconciliation engine
//! is permitted to touch. Each entry knows how to read the field from an
//! incoming candidate, read the stored value from a claim row, and write a
//! new value back. The merge loop in [`crate::engine`] walks this table so
//! that adding a field is a one-line change here rather than a scattered
//! edit across matcher, engine, and audit code.
//!
//! `claim_status` is deliberately absent: workflow state is owned by the
//! review process, not by incoming digitized records.

use chrono::NaiveDate;
use fra_common::db::models::{CandidateClaim, Claim};

/// Typed value of a single claim field, used for empty checks and
/// change comparison during a merge.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Int(Option<i64>),
    Float(Option<f64>),
    Bool(Option<bool>),
    Date(Option<NaiveDate>),
}

impl FieldValue {
    /// An empty value never overwrites stored data.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::Int(v) => v.is_none(),
            FieldValue::Float(v) => v.is_none(),
            FieldValue::Bool(v) => v.is_none(),
            FieldValue::Date(v) => v.is_none(),
        }
    }
}

/// Accessors for one mergeable field.
pub struct FieldSpec {
    /// Canonical field name as stored in audit records.
    pub name: &'static str,
    /// Read the field from an incoming candidate record.
    pub candidate: fn(&CandidateClaim) -> FieldValue,
    /// Read the currently stored value from a claim row.
    pub current: fn(&Claim) -> FieldValue,
    /// Write a new value into the claim row.
    pub apply: fn(&mut Claim, FieldValue),
}

/// All fields the engine may insert or merge, in claims-table column order.
pub static FIELD_SPECS: &[FieldSpec] = &[
    FieldSpec {
        name: "claimant_name",
        candidate: |c| FieldValue::Text(c.claimant_name.clone()),
        current: |c| FieldValue::Text(c.claimant_name.clone()),
        apply: |c, v| {
            if let FieldValue::Text(s) = v {
                c.claimant_name = s;
            }
        },
    },
    FieldSpec {
        name: "spouse_name",
        candidate: |c| FieldValue::Text(c.spouse_name.clone()),
        current: |c| FieldValue::Text(c.spouse_name.clone()),
        apply: |c, v| {
            if let FieldValue::Text(s) = v {
                c.spouse_name = s;
            }
        },
    },
    FieldSpec {
        name: "age",
        candidate: |c| FieldValue::Int(c.age),
        current: |c| FieldValue::Int(c.age),
        apply: |c, v| {
            if let FieldValue::Int(n) = v {
                c.age = n;
            }
        },
    },
    FieldSpec {
        name: "gender",
        candidate: |c| FieldValue::Text(c.gender.clone()),
        current: |c| FieldValue::Text(c.gender.clone()),
        apply: |c, v| {
            if let FieldValue::Text(s) = v {
                c.gender = s;
            }
        },
    },
    FieldSpec {
        name: "aadhaar_no",
        candidate: |c| FieldValue::Text(c.aadhaar_no.clone()),
        current: |c| FieldValue::Text(c.aadhaar_no.clone()),
        apply: |c, v| {
            if let FieldValue::Text(s) = v {
                c.aadhaar_no = s;
            }
        },
    },
    FieldSpec {
        name: "category",
        candidate: |c| FieldValue::Text(c.category.clone()),
        current: |c| FieldValue::Text(c.category.clone()),
        apply: |c, v| {
            if let FieldValue::Text(s) = v {
                c.category = s;
            }
        },
    },
    FieldSpec {
        name: "village",
        candidate: |c| FieldValue::Text(c.village.clone()),
        current: |c| FieldValue::Text(c.village.clone()),
        apply: |c, v| {
            if let FieldValue::Text(s) = v {
                c.village = s;
            }
        },
    },
    FieldSpec {
        name: "gram_panchayat",
        candidate: |c| FieldValue::Text(c.gram_panchayat.clone()),
        current: |c| FieldValue::Text(c.gram_panchayat.clone()),
        apply: |c, v| {
            if let FieldValue::Text(s) = v {
                c.gram_panchayat = s;
            }
        },
    },
    FieldSpec {
        name: "block_tehsil",
        candidate: |c| FieldValue::Text(c.block_tehsil.clone()),
        current: |c| FieldValue::Text(c.block_tehsil.clone()),
        apply: |c, v| {
            if let FieldValue::Text(s) = v {
                c.block_tehsil = s;
            }
        },
    },
    FieldSpec {
        name: "district",
        candidate: |c| FieldValue::Text(c.district.clone()),
        current: |c| FieldValue::Text(c.district.clone()),
        apply: |c, v| {
            if let FieldValue::Text(s) = v {
                c.district = s;
            }
        },
    },
    FieldSpec {
        name: "state",
        candidate: |c| FieldValue::Text(c.state.clone()),
        current: |c| FieldValue::Text(c.state.clone()),
        apply: |c, v| {
            if let FieldValue::Text(s) = v {
                c.state = s;
            }
        },
    },
    FieldSpec {
        name: "claim_type",
        candidate: |c| FieldValue::Text(c.claim_type.clone()),
        current: |c| FieldValue::Text(c.claim_type.clone()),
        apply: |c, v| {
            if let FieldValue::Text(s) = v {
                c.claim_type = s;
            }
        },
    },
    FieldSpec {
        name: "land_claimed",
        candidate: |c| FieldValue::Text(c.land_claimed.clone()),
        current: |c| FieldValue::Text(c.land_claimed.clone()),
        apply: |c, v| {
            if let FieldValue::Text(s) = v {
                c.land_claimed = s;
            }
        },
    },
    FieldSpec {
        name: "land_use",
        candidate: |c| FieldValue::Text(c.land_use.clone()),
        current: |c| FieldValue::Text(c.land_use.clone()),
        apply: |c, v| {
            if let FieldValue::Text(s) = v {
                c.land_use = s;
            }
        },
    },
    FieldSpec {
        name: "annual_income",
        candidate: |c| FieldValue::Float(c.annual_income),
        current: |c| FieldValue::Float(c.annual_income),
        apply: |c, v| {
            if let FieldValue::Float(n) = v {
                c.annual_income = n;
            }
        },
    },
    FieldSpec {
        name: "tax_payer",
        candidate: |c| FieldValue::Bool(c.tax_payer),
        current: |c| FieldValue::Bool(c.tax_payer),
        apply: |c, v| {
            if let FieldValue::Bool(b) = v {
                c.tax_payer = b;
            }
        },
    },
    FieldSpec {
        name: "boundary_description",
        candidate: |c| FieldValue::Text(c.boundary_description.clone()),
        current: |c| FieldValue::Text(c.boundary_description.clone()),
        apply: |c, v| {
            if let FieldValue::Text(s) = v {
                c.boundary_description = s;
            }
        },
    },
    FieldSpec {
        name: "geo_coordinates",
        candidate: |c| FieldValue::Text(c.geo_coordinates.clone()),
        current: |c| FieldValue::Text(c.geo_coordinates.clone()),
        apply: |c, v| {
            if let FieldValue::Text(s) = v {
                c.geo_coordinates = s;
            }
        },
    },
    FieldSpec {
        name: "status_of_claim",
        candidate: |c| FieldValue::Text(c.status_of_claim.clone()),
        current: |c| FieldValue::Text(c.status_of_claim.clone()),
        apply: |c, v| {
            if let FieldValue::Text(s) = v {
                c.status_of_claim = s;
            }
        },
    },
    FieldSpec {
        name: "date_of_submission",
        candidate: |c| FieldValue::Date(c.date_of_submission),
        current: |c| FieldValue::Date(c.date_of_submission),
        apply: |c, v| {
            if let FieldValue::Date(d) = v {
                c.date_of_submission = d;
            }
        },
    },
    FieldSpec {
        name: "date_of_decision",
        candidate: |c| FieldValue::Date(c.date_of_decision),
        current: |c| FieldValue::Date(c.date_of_decision),
        apply: |c, v| {
            if let FieldValue::Date(d) = v {
                c.date_of_decision = d;
            }
        },
    },
    FieldSpec {
        name: "patta_title_no",
        candidate: |c| FieldValue::Text(c.patta_title_no.clone()),
        current: |c| FieldValue::Text(c.patta_title_no.clone()),
        apply: |c, v| {
            if let FieldValue::Text(s) = v {
                c.patta_title_no = s;
            }
        },
    },
    FieldSpec {
        name: "water_body",
        candidate: |c| FieldValue::Text(c.water_body.clone()),
        current: |c| FieldValue::Text(c.water_body.clone()),
        apply: |c, v| {
            if let FieldValue::Text(s) = v {
                c.water_body = s;
            }
        },
    },
    FieldSpec {
        name: "irrigation_source",
        candidate: |c| FieldValue::Text(c.irrigation_source.clone()),
        current: |c| FieldValue::Text(c.irrigation_source.clone()),
        apply: |c, v| {
            if let FieldValue::Text(s) = v {
                c.irrigation_source = s;
            }
        },
    },
    FieldSpec {
        name: "infrastructure_present",
        candidate: |c| FieldValue::Text(c.infrastructure_present.clone()),
        current: |c| FieldValue::Text(c.infrastructure_present.clone()),
        apply: |c, v| {
            if let FieldValue::Text(s) = v {
                c.infrastructure_present = s;
            }
        },
    },
];

/// True when the candidate carries no usable value in any mergeable field.
/// Such records cannot be matched or stored and are rejected up front.
pub fn candidate_is_empty(candidate: &CandidateClaim) -> bool {
    FIELD_SPECS
        .iter()
        .all(|spec| (spec.candidate)(candidate).is_empty())
}
