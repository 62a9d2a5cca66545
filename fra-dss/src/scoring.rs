//! Per-scheme priority scoring.
//!
//! `score_claim` is a pure function of the claim record: the same claim
//! always produces the same five priorities, with no database or clock
//! access. The batch scorer, the resync importer, and the just-in-time
//! fallback all agree because they share these formulas.

use fra_common::db::models::{Claim, SchemeScoreRow};
use serde::Serialize;

use crate::schemes::Scheme;

/// Annual income above which the income signal bottoms out at zero.
pub const INCOME_CEILING: f64 = 300_000.0;

/// States given the regional bonus for water-access prioritization.
pub const PRIORITY_STATES: [&str; 5] =
    ["Tripura", "Jharkhand", "Chhattisgarh", "Odisha", "Telangana"];

/// The five scheme priorities computed for one claim, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SchemePriorities {
    pub jal_jeevan_mission: f64,
    pub dajgua: f64,
    pub mgnrega: f64,
    pub pm_kisan: f64,
    pub pmay: f64,
}

impl SchemePriorities {
    pub fn get(&self, scheme: Scheme) -> f64 {
        match scheme {
            Scheme::JalJeevanMission => self.jal_jeevan_mission,
            Scheme::Dajgua => self.dajgua,
            Scheme::Mgnrega => self.mgnrega,
            Scheme::PmKisan => self.pm_kisan,
            Scheme::Pmay => self.pmay,
        }
    }
}

/// Score one claim against all five schemes.
pub fn score_claim(claim: &Claim) -> SchemePriorities {
    // Absent income scores as zero income, the strongest need signal.
    let income = claim.annual_income.unwrap_or(0.0);
    let income_score = clamp01((INCOME_CEILING - income) / INCOME_CEILING);

    let category_bonus = if is_category(claim, "ST") || is_category(claim, "SC") {
        0.3
    } else {
        0.1
    };
    let region_bonus = if PRIORITY_STATES
        .iter()
        .any(|state| text_eq(&claim.state, state))
    {
        0.2
    } else {
        0.0
    };

    let farms = text_eq(&claim.land_use, "Agriculture");
    let employment_need = if farms { 0.1 } else { 0.3 };

    SchemePriorities {
        jal_jeevan_mission: clamp01(0.4 + 0.3 * income_score + category_bonus + region_bonus),
        dajgua: clamp01(0.3 + 0.4 * income_score + 1.5 * category_bonus),
        mgnrega: clamp01(0.2 + 0.3 * income_score + employment_need + category_bonus),
        // Unknown tax status does not qualify.
        pm_kisan: if farms && claim.tax_payer == Some(false) {
            1.0
        } else {
            0.0
        },
        pmay: if is_category(claim, "ST") {
            clamp01(0.6 + 0.4 * income_score)
        } else {
            clamp01(0.3 + 0.3 * income_score)
        },
    }
}

/// Build the denormalized score-store row for a claim and its priorities.
pub fn score_row_for(claim: &Claim, priorities: SchemePriorities) -> SchemeScoreRow {
    SchemeScoreRow {
        claim_id: claim.claim_id.to_string(),
        claimant_name: claim.claimant_name.clone(),
        age: claim.age.map(|age| age as f64),
        gender: claim.gender.clone(),
        state: claim.state.clone(),
        district: claim.district.clone(),
        block_tehsil: claim.block_tehsil.clone(),
        gram_panchayat: claim.gram_panchayat.clone(),
        village: claim.village.clone(),
        category: claim.category.clone(),
        tax_payer: match claim.tax_payer {
            Some(true) => "Yes".to_string(),
            Some(false) => "No".to_string(),
            None => String::new(),
        },
        claim_type: claim.claim_type.clone(),
        status_of_claim: claim.status_of_claim.clone(),
        annual_income: claim.annual_income,
        jal_jeevan_mission_priority: priorities.jal_jeevan_mission,
        dajgua_priority: priorities.dajgua,
        mgnrega_priority: priorities.mgnrega,
        pm_kisan_priority: priorities.pm_kisan,
        pmay_priority: priorities.pmay,
    }
}

fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

fn is_category(claim: &Claim, category: &str) -> bool {
    text_eq(&claim.category, category)
}

fn text_eq(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b)
}
