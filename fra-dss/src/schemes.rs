//! Catalog of the five welfare schemes evaluated for every claim.
//!
//! Scheme names, descriptions, and benefit lists are fixed text surfaced
//! verbatim in recommendation payloads, so they live here as constants
//! rather than configuration.

use std::fmt;

use fra_common::db::models::SchemeScoreRow;

/// One of the five schemes a claim is scored against.
///
/// [`Scheme::PmKisan`] and [`Scheme::Pmay`] are eligibility schemes: their
/// score is binary and a claim either qualifies or it does not. The other
/// three carry a continuous priority in `[0, 1]` and compete for ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    JalJeevanMission,
    Dajgua,
    Mgnrega,
    PmKisan,
    Pmay,
}

/// All schemes, in score-row column order.
pub const ALL_SCHEMES: [Scheme; 5] = [
    Scheme::JalJeevanMission,
    Scheme::Dajgua,
    Scheme::Mgnrega,
    Scheme::PmKisan,
    Scheme::Pmay,
];

/// The three priority-ranked schemes, in ranking-input order.
pub const PRIORITY_SCHEMES: [Scheme; 3] =
    [Scheme::JalJeevanMission, Scheme::Dajgua, Scheme::Mgnrega];

impl Scheme {
    /// Short machine identifier, used for statistics keys and CLI arguments.
    pub fn slug(&self) -> &'static str {
        match self {
            Scheme::JalJeevanMission => "jal_jeevan_mission",
            Scheme::Dajgua => "dajgua",
            Scheme::Mgnrega => "mgnrega",
            Scheme::PmKisan => "pm_kisan",
            Scheme::Pmay => "pmay",
        }
    }

    /// Full display name as it appears in recommendation payloads.
    pub fn display_name(&self) -> &'static str {
        match self {
            Scheme::JalJeevanMission => "Jal Jeevan Mission",
            Scheme::Dajgua => "DAJGUA (Development of Aspirational Blocks Program)",
            Scheme::Mgnrega => {
                "MGNREGA (Mahatma Gandhi National Rural Employment Guarantee Act)"
            }
            Scheme::PmKisan => "PM-KISAN (Pradhan Mantri Kisan Samman Nidhi)",
            Scheme::Pmay => "PM Awas Yojana (Pradhan Mantri Awas Yojana)",
        }
    }

    /// One-line description surfaced alongside the recommendation.
    pub fn description(&self) -> &'static str {
        match self {
            Scheme::JalJeevanMission => {
                "Functional Household Tap Connection (FHTC) to every rural household"
            }
            Scheme::Dajgua => "Integrated development program for backward blocks",
            Scheme::Mgnrega => {
                "Employment guarantee scheme providing 100 days of wage employment"
            }
            Scheme::PmKisan => {
                "Direct income support of \u{20b9}6,000 per year to small and marginal farmers"
            }
            Scheme::Pmay => "Housing assistance for rural poor and homeless families",
        }
    }

    /// Concrete benefits listed under the recommendation.
    pub fn benefits(&self) -> &'static [&'static str] {
        match self {
            Scheme::JalJeevanMission => &[
                "Piped water supply to household",
                "Water quality monitoring",
                "Community participation in water management",
            ],
            Scheme::Dajgua => &[
                "Infrastructure development",
                "Skill development programs",
                "Health and education improvement",
            ],
            Scheme::Mgnrega => &[
                "Guaranteed 100 days employment",
                "Wage payment within 15 days",
                "Asset creation in rural areas",
            ],
            Scheme::PmKisan => &[
                "\u{20b9}2,000 transferred in 3 installments",
                "Direct benefit transfer to bank account",
            ],
            Scheme::Pmay => &[
                "Financial assistance for house construction",
                "Technical support for construction",
            ],
        }
    }

    /// True for the two schemes gated on eligibility rather than ranked
    /// by priority.
    pub fn is_eligibility_scheme(&self) -> bool {
        matches!(self, Scheme::PmKisan | Scheme::Pmay)
    }

    /// This scheme's priority column from a stored score row.
    pub fn priority_in(&self, row: &SchemeScoreRow) -> f64 {
        match self {
            Scheme::JalJeevanMission => row.jal_jeevan_mission_priority,
            Scheme::Dajgua => row.dajgua_priority,
            Scheme::Mgnrega => row.mgnrega_priority,
            Scheme::PmKisan => row.pm_kisan_priority,
            Scheme::Pmay => row.pmay_priority,
        }
    }

    /// Parse a scheme from user-supplied text. Accepts the slug plus the
    /// common abbreviations, ignoring case and `-`/space separators.
    pub fn parse(s: &str) -> Option<Scheme> {
        let key: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c })
            .collect();
        match key.as_str() {
            "jal_jeevan_mission" | "jaljeevanmission" | "jjm" => {
                Some(Scheme::JalJeevanMission)
            }
            "dajgua" => Some(Scheme::Dajgua),
            "mgnrega" => Some(Scheme::Mgnrega),
            "pm_kisan" | "pmkisan" => Some(Scheme::PmKisan),
            "pmay" | "pm_awas_yojana" => Some(Scheme::Pmay),
            _ => None,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_are_the_published_ones() {
        assert_eq!(
            Scheme::PmKisan.display_name(),
            "PM-KISAN (Pradhan Mantri Kisan Samman Nidhi)"
        );
        assert_eq!(
            Scheme::Pmay.display_name(),
            "PM Awas Yojana (Pradhan Mantri Awas Yojana)"
        );
        assert_eq!(Scheme::JalJeevanMission.display_name(), "Jal Jeevan Mission");
        assert_eq!(
            Scheme::Dajgua.display_name(),
            "DAJGUA (Development of Aspirational Blocks Program)"
        );
        assert_eq!(
            Scheme::Mgnrega.display_name(),
            "MGNREGA (Mahatma Gandhi National Rural Employment Guarantee Act)"
        );
    }

    #[test]
    fn eligibility_partition() {
        let eligibility: Vec<Scheme> = ALL_SCHEMES
            .iter()
            .copied()
            .filter(Scheme::is_eligibility_scheme)
            .collect();
        assert_eq!(eligibility, vec![Scheme::PmKisan, Scheme::Pmay]);
        for scheme in PRIORITY_SCHEMES {
            assert!(!scheme.is_eligibility_scheme());
        }
    }

    #[test]
    fn parse_accepts_common_spellings() {
        assert_eq!(Scheme::parse("JJM"), Some(Scheme::JalJeevanMission));
        assert_eq!(Scheme::parse("jal-jeevan-mission"), Some(Scheme::JalJeevanMission));
        assert_eq!(Scheme::parse("PM-KISAN"), Some(Scheme::PmKisan));
        assert_eq!(Scheme::parse("pm kisan"), Some(Scheme::PmKisan));
        assert_eq!(Scheme::parse(" pmay "), Some(Scheme::Pmay));
        assert_eq!(Scheme::parse("dajgua"), Some(Scheme::Dajgua));
        assert_eq!(Scheme::parse("mgnrega"), Some(Scheme::Mgnrega));
        assert_eq!(Scheme::parse("unknown"), None);
    }

    #[test]
    fn priority_in_reads_the_matching_column() {
        let row = SchemeScoreRow {
            jal_jeevan_mission_priority: 0.1,
            dajgua_priority: 0.2,
            mgnrega_priority: 0.3,
            pm_kisan_priority: 1.0,
            pmay_priority: 0.5,
            ..Default::default()
        };
        assert_eq!(Scheme::JalJeevanMission.priority_in(&row), 0.1);
        assert_eq!(Scheme::Dajgua.priority_in(&row), 0.2);
        assert_eq!(Scheme::Mgnrega.priority_in(&row), 0.3);
        assert_eq!(Scheme::PmKisan.priority_in(&row), 1.0);
        assert_eq!(Scheme::Pmay.priority_in(&row), 0.5);
    }

    #[test]
    fn every_scheme_lists_benefits() {
        for scheme in ALL_SCHEMES {
            assert!(!scheme.benefits().is_empty(), "{} has no benefits", scheme);
            assert!(!scheme.description().is_empty());
        }
    }
}
