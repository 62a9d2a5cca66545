//! Recommendation compiler.
//!
//! Turns one score row into the structured payload shown to review staff:
//! the two eligibility rules first, then the three priority schemes ranked
//! against each other, then a plain-language summary. The wording here is a
//! published contract; downstream consumers match on it.

use std::cmp::Ordering;

use fra_common::db::models::SchemeScoreRow;
use serde::Serialize;

use crate::schemes::Scheme;

/// Priority floor a scheme must strictly exceed to be surfaced.
pub const RECOMMEND_FLOOR: f64 = 0.6;

/// Distance from the top priority within which a scheme is still marked
/// recommended rather than considered.
pub const CLOSENESS_THRESHOLD: f64 = 0.05;

/// Complete decision-support payload for one claim.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub claim_id: String,
    pub claimant_name: String,
    pub location: Location,
    pub demographics: Demographics,
    pub dss_scores: DssScores,
    pub recommendations: Vec<RecommendationEntry>,
    pub analysis: Analysis,
    pub summary: Summary,
}

#[derive(Debug, Clone, Serialize)]
pub struct Location {
    pub state: String,
    pub district: String,
    pub village: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Demographics {
    pub category: String,
    pub annual_income: Option<f64>,
}

/// The five raw priorities, echoed back so the caller sees what the
/// recommendations were derived from.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DssScores {
    pub jal_jeevan_mission: f64,
    pub dajgua: f64,
    pub mgnrega: f64,
    pub pm_kisan: f64,
    pub pmay: f64,
}

/// How an entry earned its place in the visible list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecommendationKind {
    #[serde(rename = "eligible")]
    Eligible,
    #[serde(rename = "priority-based")]
    PriorityBased,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationStatus {
    Recommended,
    Considered,
}

/// One scheme in the visible recommendation list.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationEntry {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub priority: f64,
    pub status: RecommendationStatus,
    pub reasoning: String,
    pub description: &'static str,
    pub benefits: &'static [&'static str],
}

/// Per-scheme reasoning, present for every scheme whether or not it made
/// the visible list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub pm_kisan: EligibilityAnalysis,
    pub pmay: EligibilityAnalysis,
    pub jal_jeevan_mission: PriorityAnalysis,
    pub dajgua: PriorityAnalysis,
    pub mgnrega: PriorityAnalysis,
}

#[derive(Debug, Clone, Serialize)]
pub struct EligibilityAnalysis {
    pub eligible: bool,
    pub reasoning: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PriorityAnalysis {
    pub score: f64,
    pub recommended: bool,
    pub reasoning: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_recommended: usize,
    pub highest_priority: String,
    pub eligible_schemes: usize,
    pub priority_schemes: usize,
    pub message: String,
}

/// Compile the recommendation payload for one score row.
pub fn compile_scores(row: &SchemeScoreRow) -> Recommendation {
    let mut entries: Vec<RecommendationEntry> = Vec::new();

    // Rule 1: PM-KISAN is a binary eligibility, full score means qualified.
    let pm_kisan = if row.pm_kisan_priority >= 1.0 {
        entries.push(RecommendationEntry {
            name: Scheme::PmKisan.display_name(),
            kind: RecommendationKind::Eligible,
            priority: 1.0,
            status: RecommendationStatus::Recommended,
            reasoning: "Beneficiary is eligible for PM-KISAN scheme as a farmer".to_string(),
            description: Scheme::PmKisan.description(),
            benefits: Scheme::PmKisan.benefits(),
        });
        EligibilityAnalysis {
            eligible: true,
            reasoning: "Meets eligibility criteria as agricultural land holder".to_string(),
        }
    } else {
        EligibilityAnalysis {
            eligible: false,
            reasoning: "Not eligible - either not a farmer or does not meet land ownership criteria"
                .to_string(),
        }
    };

    // Rule 2: PMAY eligibility.
    let pmay = if row.pmay_priority >= 1.0 {
        entries.push(RecommendationEntry {
            name: Scheme::Pmay.display_name(),
            kind: RecommendationKind::Eligible,
            priority: 1.0,
            status: RecommendationStatus::Recommended,
            reasoning: "Beneficiary is eligible for PMAY housing scheme".to_string(),
            description: Scheme::Pmay.description(),
            benefits: Scheme::Pmay.benefits(),
        });
        EligibilityAnalysis {
            eligible: true,
            reasoning: "Meets eligibility criteria for housing assistance".to_string(),
        }
    } else {
        EligibilityAnalysis {
            eligible: false,
            reasoning: "Not eligible - may already have pucca house or income exceeds limit"
                .to_string(),
        }
    };

    // Rule 3: the remaining schemes compete on priority.
    let highest = [
        row.jal_jeevan_mission_priority,
        row.dajgua_priority,
        row.mgnrega_priority,
    ]
    .into_iter()
    .fold(f64::NEG_INFINITY, f64::max);

    let jal_jeevan_mission = priority_rule(
        Scheme::JalJeevanMission,
        row.jal_jeevan_mission_priority,
        highest,
        &mut entries,
    );
    let dajgua = priority_rule(Scheme::Dajgua, row.dajgua_priority, highest, &mut entries);
    let mgnrega = priority_rule(Scheme::Mgnrega, row.mgnrega_priority, highest, &mut entries);

    // Stable sort keeps eligibility entries ahead of priority ties.
    entries.sort_by(|a, b| b.priority.partial_cmp(&a.priority).unwrap_or(Ordering::Equal));

    let summary = summarize(&entries, &row.claimant_name);

    Recommendation {
        claim_id: row.claim_id.clone(),
        claimant_name: row.claimant_name.clone(),
        location: Location {
            state: row.state.clone(),
            district: row.district.clone(),
            village: row.village.clone(),
        },
        demographics: Demographics {
            category: row.category.clone(),
            annual_income: row.annual_income,
        },
        dss_scores: DssScores {
            jal_jeevan_mission: row.jal_jeevan_mission_priority,
            dajgua: row.dajgua_priority,
            mgnrega: row.mgnrega_priority,
            pm_kisan: row.pm_kisan_priority,
            pmay: row.pmay_priority,
        },
        recommendations: entries,
        analysis: Analysis {
            pm_kisan,
            pmay,
            jal_jeevan_mission,
            dajgua,
            mgnrega,
        },
        summary,
    }
}

/// Apply the inclusion floor and closeness band to one priority scheme,
/// appending a visible entry when it clears the floor.
fn priority_rule(
    scheme: Scheme,
    score: f64,
    highest: f64,
    entries: &mut Vec<RecommendationEntry>,
) -> PriorityAnalysis {
    let percent = score * 100.0;

    if score <= RECOMMEND_FLOOR {
        return PriorityAnalysis {
            score,
            recommended: false,
            reasoning: format!(
                "Low priority score {percent:.1}% - below recommendation threshold"
            ),
        };
    }

    let status = if highest - score <= CLOSENESS_THRESHOLD {
        RecommendationStatus::Recommended
    } else {
        RecommendationStatus::Considered
    };
    let reasoning = match status {
        RecommendationStatus::Recommended if score >= highest => {
            format!("Highest priority scheme with score {percent:.1}%")
        }
        RecommendationStatus::Recommended => format!(
            "High priority scheme with score {percent:.1}% (within {CLOSENESS_THRESHOLD} of highest)"
        ),
        RecommendationStatus::Considered => {
            format!("Moderate priority with score {percent:.1}%")
        }
    };

    entries.push(RecommendationEntry {
        name: scheme.display_name(),
        kind: RecommendationKind::PriorityBased,
        priority: score,
        status,
        reasoning: reasoning.clone(),
        description: scheme.description(),
        benefits: scheme.benefits(),
    });

    PriorityAnalysis {
        score,
        recommended: status == RecommendationStatus::Recommended,
        reasoning,
    }
}

fn summarize(entries: &[RecommendationEntry], claimant_name: &str) -> Summary {
    let recommended: Vec<&RecommendationEntry> = entries
        .iter()
        .filter(|e| e.status == RecommendationStatus::Recommended)
        .collect();

    let message = if recommended.is_empty() {
        "No schemes are currently recommended based on the DSS analysis. \
         Consider reviewing eligibility criteria or improving priority factors."
            .to_string()
    } else {
        let eligible = recommended
            .iter()
            .filter(|e| e.kind == RecommendationKind::Eligible)
            .count();
        let priority = recommended
            .iter()
            .filter(|e| e.kind == RecommendationKind::PriorityBased)
            .count();
        let mut message = format!(
            "Based on DSS analysis, {} scheme(s) are recommended for {}.",
            recommended.len(),
            claimant_name
        );
        if eligible > 0 {
            message.push_str(&format!(" {eligible} scheme(s) based on direct eligibility."));
        }
        if priority > 0 {
            message.push_str(&format!(" {priority} scheme(s) based on high priority scores."));
        }
        message
    };

    Summary {
        total_recommended: recommended.len(),
        highest_priority: recommended
            .first()
            .map(|e| e.name.to_string())
            .unwrap_or_else(|| "None".to_string()),
        eligible_schemes: entries
            .iter()
            .filter(|e| e.kind == RecommendationKind::Eligible)
            .count(),
        priority_schemes: entries
            .iter()
            .filter(|e| {
                e.kind == RecommendationKind::PriorityBased
                    && e.status == RecommendationStatus::Recommended
            })
            .count(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(jjm: f64, dajgua: f64, mgnrega: f64, pm_kisan: f64, pmay: f64) -> SchemeScoreRow {
        SchemeScoreRow {
            claim_id: "c2a3a77e-6f3e-4ac5-9a67-1f5f2f3f1a2b".to_string(),
            claimant_name: "Ram Lal".to_string(),
            state: "Tripura".to_string(),
            district: "Dhalai".to_string(),
            village: "Dumburnagar".to_string(),
            category: "ST".to_string(),
            annual_income: Some(0.0),
            jal_jeevan_mission_priority: jjm,
            dajgua_priority: dajgua,
            mgnrega_priority: mgnrega,
            pm_kisan_priority: pm_kisan,
            pmay_priority: pmay,
            ..Default::default()
        }
    }

    fn names(entries: &[RecommendationEntry]) -> Vec<&'static str> {
        entries.iter().map(|e| e.name).collect()
    }

    #[test]
    fn maximal_profile_recommends_four_of_five() {
        let rec = compile_scores(&row(1.0, 1.0, 0.9, 1.0, 1.0));

        assert_eq!(
            names(&rec.recommendations),
            vec![
                Scheme::PmKisan.display_name(),
                Scheme::Pmay.display_name(),
                Scheme::JalJeevanMission.display_name(),
                Scheme::Dajgua.display_name(),
                Scheme::Mgnrega.display_name(),
            ]
        );

        // MGNREGA at 0.9 is 0.1 behind the 1.0 leaders, so considered only.
        let mgnrega = &rec.recommendations[4];
        assert_eq!(mgnrega.status, RecommendationStatus::Considered);
        assert_eq!(mgnrega.reasoning, "Moderate priority with score 90.0%");

        assert_eq!(rec.summary.total_recommended, 4);
        assert_eq!(rec.summary.highest_priority, Scheme::PmKisan.display_name());
        assert_eq!(rec.summary.eligible_schemes, 2);
        assert_eq!(rec.summary.priority_schemes, 2);
        assert_eq!(
            rec.summary.message,
            "Based on DSS analysis, 4 scheme(s) are recommended for Ram Lal. \
             2 scheme(s) based on direct eligibility. \
             2 scheme(s) based on high priority scores."
        );

        assert!(rec.analysis.pm_kisan.eligible);
        assert!(rec.analysis.pmay.eligible);
        assert!(rec.analysis.jal_jeevan_mission.recommended);
        assert!(!rec.analysis.mgnrega.recommended);
    }

    #[test]
    fn floor_is_strictly_above_0_6() {
        let at_floor = compile_scores(&row(0.6, 0.0, 0.0, 0.0, 0.0));
        assert!(at_floor.recommendations.is_empty());
        assert_eq!(
            at_floor.analysis.jal_jeevan_mission.reasoning,
            "Low priority score 60.0% - below recommendation threshold"
        );

        let just_over = compile_scores(&row(0.6000001, 0.0, 0.0, 0.0, 0.0));
        assert_eq!(just_over.recommendations.len(), 1);
        assert_eq!(
            just_over.recommendations[0].reasoning,
            "Highest priority scheme with score 60.0%"
        );
        assert_eq!(just_over.summary.total_recommended, 1);
    }

    #[test]
    fn closeness_band_splits_recommended_from_considered() {
        let rec = compile_scores(&row(0.74, 0.70, 0.65, 0.0, 0.0));

        let jjm = &rec.recommendations[0];
        assert_eq!(jjm.name, Scheme::JalJeevanMission.display_name());
        assert_eq!(jjm.status, RecommendationStatus::Recommended);
        assert_eq!(jjm.reasoning, "Highest priority scheme with score 74.0%");

        let dajgua = &rec.recommendations[1];
        assert_eq!(dajgua.status, RecommendationStatus::Recommended);
        assert_eq!(
            dajgua.reasoning,
            "High priority scheme with score 70.0% (within 0.05 of highest)"
        );

        let mgnrega = &rec.recommendations[2];
        assert_eq!(mgnrega.status, RecommendationStatus::Considered);
        assert_eq!(mgnrega.reasoning, "Moderate priority with score 65.0%");

        assert_eq!(rec.summary.total_recommended, 2);
        assert_eq!(rec.summary.eligible_schemes, 0);
        assert_eq!(rec.summary.priority_schemes, 2);
        assert_eq!(
            rec.summary.message,
            "Based on DSS analysis, 2 scheme(s) are recommended for Ram Lal. \
             2 scheme(s) based on high priority scores."
        );
    }

    #[test]
    fn near_miss_eligibility_stays_out_of_the_visible_list() {
        let rec = compile_scores(&row(0.0, 0.0, 0.0, 0.85, 1.0));
        assert_eq!(names(&rec.recommendations), vec![Scheme::Pmay.display_name()]);
        assert!(!rec.analysis.pm_kisan.eligible);
        assert_eq!(
            rec.analysis.pm_kisan.reasoning,
            "Not eligible - either not a farmer or does not meet land ownership criteria"
        );
        assert!(rec.analysis.pmay.eligible);
    }

    #[test]
    fn empty_scores_produce_the_no_schemes_summary() {
        let rec = compile_scores(&row(0.0, 0.0, 0.0, 0.0, 0.0));
        assert!(rec.recommendations.is_empty());
        assert_eq!(rec.summary.total_recommended, 0);
        assert_eq!(rec.summary.highest_priority, "None");
        assert_eq!(
            rec.summary.message,
            "No schemes are currently recommended based on the DSS analysis. \
             Consider reviewing eligibility criteria or improving priority factors."
        );
        assert_eq!(rec.analysis.dajgua.reasoning, "Low priority score 0.0% - below recommendation threshold");
    }

    #[test]
    fn tied_leaders_are_both_highest() {
        let rec = compile_scores(&row(0.8, 0.8, 0.1, 0.0, 0.0));
        assert_eq!(rec.recommendations.len(), 2);
        for entry in &rec.recommendations {
            assert_eq!(entry.status, RecommendationStatus::Recommended);
            assert_eq!(entry.reasoning, "Highest priority scheme with score 80.0%");
        }
        // Stable sort keeps the fixed evaluation order for exact ties.
        assert_eq!(
            names(&rec.recommendations),
            vec![
                Scheme::JalJeevanMission.display_name(),
                Scheme::Dajgua.display_name(),
            ]
        );
    }

    #[test]
    fn payload_uses_the_published_json_keys() {
        let value = serde_json::to_value(compile_scores(&row(1.0, 0.2, 0.3, 1.0, 0.0)))
            .expect("recommendation serializes");

        for key in [
            "claimId",
            "claimantName",
            "location",
            "demographics",
            "dssScores",
            "recommendations",
            "analysis",
            "summary",
        ] {
            assert!(value.get(key).is_some(), "missing key {key}");
        }

        let scores = &value["dssScores"];
        assert!(scores.get("jalJeevanMission").is_some());
        assert!(scores.get("pmKisan").is_some());

        assert_eq!(value["demographics"]["annualIncome"], 0.0);

        let first = &value["recommendations"][0];
        assert_eq!(first["type"], "eligible");
        assert_eq!(first["status"], "recommended");

        let jjm_entry = &value["recommendations"][1];
        assert_eq!(jjm_entry["type"], "priority-based");

        assert_eq!(value["analysis"]["pmKisan"]["eligible"], true);
        assert!(value["analysis"]["jalJeevanMission"].get("score").is_some());
        assert!(value["summary"].get("totalRecommended").is_some());
        assert!(value["summary"].get("highestPriority").is_some());
    }
}
