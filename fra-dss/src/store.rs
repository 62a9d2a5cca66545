//! Scheme score store.
//!
//! SQLite-backed copy of the scorer's output, keyed by claim identity.
//! The store is the first stop for every score read; the snapshot file
//! and just-in-time scoring only cover for it when it fails.

use std::collections::BTreeMap;

use fra_common::db::models::SchemeScoreRow;
use fra_common::Result;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, warn};

use crate::schemes::Scheme;

/// Filters for score listing. All present filters are exact matches,
/// combined with AND.
#[derive(Debug, Clone, Default)]
pub struct ScoreQuery {
    pub claim_id: Option<String>,
    pub state: Option<String>,
    pub district: Option<String>,
    pub village: Option<String>,
}

impl ScoreQuery {
    pub fn is_unfiltered(&self) -> bool {
        self.claim_id.is_none()
            && self.state.is_none()
            && self.district.is_none()
            && self.village.is_none()
    }

    /// The same predicate the SQL filters apply, for rows already in
    /// memory (the snapshot fallback path).
    pub fn matches(&self, row: &SchemeScoreRow) -> bool {
        fn accept(filter: &Option<String>, value: &str) -> bool {
            filter.as_deref().map_or(true, |wanted| wanted == value)
        }
        accept(&self.claim_id, &row.claim_id)
            && accept(&self.state, &row.state)
            && accept(&self.district, &row.district)
            && accept(&self.village, &row.village)
    }
}

/// Outcome tally of importing scored rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub inserted: usize,
    pub updated: usize,
    pub errors: usize,
}

#[derive(Debug, Clone)]
pub struct ScoreStore {
    db: Pool<Sqlite>,
}

impl ScoreStore {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    /// Insert or refresh one scored row, keyed by claim_id. Returns true
    /// when the row was new.
    pub async fn upsert_row(&self, row: &SchemeScoreRow) -> Result<bool> {
        let existing = sqlx::query("SELECT id FROM scheme_scores WHERE claim_id = ?")
            .bind(&row.claim_id)
            .fetch_optional(&self.db)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO scheme_scores (
                claim_id, claimant_name, age, gender, state, district,
                block_tehsil, gram_panchayat, village, category, tax_payer,
                claim_type, status_of_claim, annual_income,
                jal_jeevan_mission_priority, dajgua_priority, mgnrega_priority,
                pm_kisan_priority, pmay_priority
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(claim_id) DO UPDATE SET
                claimant_name = excluded.claimant_name,
                age = excluded.age,
                gender = excluded.gender,
                state = excluded.state,
                district = excluded.district,
                block_tehsil = excluded.block_tehsil,
                gram_panchayat = excluded.gram_panchayat,
                village = excluded.village,
                category = excluded.category,
                tax_payer = excluded.tax_payer,
                claim_type = excluded.claim_type,
                status_of_claim = excluded.status_of_claim,
                annual_income = excluded.annual_income,
                jal_jeevan_mission_priority = excluded.jal_jeevan_mission_priority,
                dajgua_priority = excluded.dajgua_priority,
                mgnrega_priority = excluded.mgnrega_priority,
                pm_kisan_priority = excluded.pm_kisan_priority,
                pmay_priority = excluded.pmay_priority,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&row.claim_id)
        .bind(&row.claimant_name)
        .bind(row.age)
        .bind(&row.gender)
        .bind(&row.state)
        .bind(&row.district)
        .bind(&row.block_tehsil)
        .bind(&row.gram_panchayat)
        .bind(&row.village)
        .bind(&row.category)
        .bind(&row.tax_payer)
        .bind(&row.claim_type)
        .bind(&row.status_of_claim)
        .bind(row.annual_income)
        .bind(row.jal_jeevan_mission_priority)
        .bind(row.dajgua_priority)
        .bind(row.mgnrega_priority)
        .bind(row.pm_kisan_priority)
        .bind(row.pmay_priority)
        .execute(&self.db)
        .await?;

        Ok(existing.is_none())
    }

    /// Import scored rows with per-row error isolation. A failed upsert is
    /// counted and logged, never fatal to the rest of the batch.
    pub async fn import(&self, rows: &[SchemeScoreRow]) -> ImportSummary {
        let mut summary = ImportSummary::default();
        for row in rows {
            match self.upsert_row(row).await {
                Ok(true) => summary.inserted += 1,
                Ok(false) => summary.updated += 1,
                Err(e) => {
                    warn!(claim_id = %row.claim_id, error = %e, "Failed to import score row");
                    summary.errors += 1;
                }
            }
        }
        debug!(
            inserted = summary.inserted,
            updated = summary.updated,
            errors = summary.errors,
            "Imported score rows"
        );
        summary
    }

    /// List stored scores matching the query, ordered by claim_id.
    pub async fn list(&self, query: &ScoreQuery) -> Result<Vec<SchemeScoreRow>> {
        let mut sql = String::from("SELECT * FROM scheme_scores");
        let mut clauses: Vec<&str> = Vec::new();

        if query.claim_id.is_some() {
            clauses.push("claim_id = ?");
        }
        if query.state.is_some() {
            clauses.push("state = ?");
        }
        if query.district.is_some() {
            clauses.push("district = ?");
        }
        if query.village.is_some() {
            clauses.push("village = ?");
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY claim_id");

        let mut q = sqlx::query(&sql);
        if let Some(claim_id) = &query.claim_id {
            q = q.bind(claim_id);
        }
        if let Some(state) = &query.state {
            q = q.bind(state);
        }
        if let Some(district) = &query.district {
            q = q.bind(district);
        }
        if let Some(village) = &query.village {
            q = q.bind(village);
        }

        let rows = q.fetch_all(&self.db).await?;
        rows.iter().map(score_from_row).collect()
    }

    /// Fetch the stored score row for one claim.
    pub async fn get_by_claim(&self, claim_id: &str) -> Result<Option<SchemeScoreRow>> {
        let row = sqlx::query("SELECT * FROM scheme_scores WHERE claim_id = ?")
            .bind(claim_id)
            .fetch_optional(&self.db)
            .await?;
        row.as_ref().map(score_from_row).transpose()
    }
}

fn score_from_row(row: &SqliteRow) -> Result<SchemeScoreRow> {
    Ok(SchemeScoreRow {
        claim_id: row.try_get("claim_id")?,
        claimant_name: nullable_text(row, "claimant_name")?,
        age: row.try_get("age")?,
        gender: nullable_text(row, "gender")?,
        state: nullable_text(row, "state")?,
        district: nullable_text(row, "district")?,
        block_tehsil: nullable_text(row, "block_tehsil")?,
        gram_panchayat: nullable_text(row, "gram_panchayat")?,
        village: nullable_text(row, "village")?,
        category: nullable_text(row, "category")?,
        tax_payer: nullable_text(row, "tax_payer")?,
        claim_type: nullable_text(row, "claim_type")?,
        status_of_claim: nullable_text(row, "status_of_claim")?,
        annual_income: row.try_get("annual_income")?,
        jal_jeevan_mission_priority: row.try_get("jal_jeevan_mission_priority")?,
        dajgua_priority: row.try_get("dajgua_priority")?,
        mgnrega_priority: row.try_get("mgnrega_priority")?,
        pm_kisan_priority: row.try_get("pm_kisan_priority")?,
        pmay_priority: row.try_get("pmay_priority")?,
    })
}

// Context columns are nullable in the schema even though this crate
// always writes a value.
fn nullable_text(row: &SqliteRow, column: &str) -> Result<String> {
    Ok(row.try_get::<Option<String>, _>(column)?.unwrap_or_default())
}

/// Counts of claims clearing each scheme's attention threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchemeCounts {
    pub jal_jeevan_mission: usize,
    pub dajgua: usize,
    pub mgnrega: usize,
    pub pm_kisan: usize,
    pub pmay: usize,
}

/// Aggregate view over a set of score rows.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchemeStatistics {
    pub total_claims: usize,
    pub by_state: BTreeMap<String, usize>,
    pub by_scheme: SchemeCounts,
    pub high_priority_claims: usize,
}

/// Compute summary statistics over score rows, wherever they came from.
/// A scheme counts a claim at priority above 0.5; a claim is high
/// priority when its best scheme exceeds 0.7.
pub fn aggregate_statistics(rows: &[SchemeScoreRow]) -> SchemeStatistics {
    let mut stats = SchemeStatistics {
        total_claims: rows.len(),
        ..Default::default()
    };

    for row in rows {
        *stats.by_state.entry(row.state.clone()).or_insert(0) += 1;

        if row.jal_jeevan_mission_priority > 0.5 {
            stats.by_scheme.jal_jeevan_mission += 1;
        }
        if row.dajgua_priority > 0.5 {
            stats.by_scheme.dajgua += 1;
        }
        if row.mgnrega_priority > 0.5 {
            stats.by_scheme.mgnrega += 1;
        }
        if row.pm_kisan_priority > 0.5 {
            stats.by_scheme.pm_kisan += 1;
        }
        if row.pmay_priority > 0.5 {
            stats.by_scheme.pmay += 1;
        }

        let best = [
            row.jal_jeevan_mission_priority,
            row.dajgua_priority,
            row.mgnrega_priority,
            row.pm_kisan_priority,
            row.pmay_priority,
        ]
        .into_iter()
        .fold(f64::NEG_INFINITY, f64::max);
        if best > 0.7 {
            stats.high_priority_claims += 1;
        }
    }

    stats
}

/// One village's standing for a scheme.
#[derive(Debug, Clone, Serialize)]
pub struct VillagePriority {
    pub state: String,
    pub district: String,
    pub village: String,
    pub claims: usize,
    pub avg_priority: f64,
    pub avg_income: Option<f64>,
}

/// Rank villages by average priority for one scheme. Rows with a zero
/// priority do not participate.
pub fn top_villages(rows: &[SchemeScoreRow], scheme: Scheme, limit: usize) -> Vec<VillagePriority> {
    struct Tally {
        claims: usize,
        priority_sum: f64,
        income_sum: f64,
        income_count: usize,
    }

    let mut groups: BTreeMap<(String, String, String), Tally> = BTreeMap::new();
    for row in rows {
        let priority = scheme.priority_in(row);
        if priority <= 0.0 {
            continue;
        }
        let key = (row.state.clone(), row.district.clone(), row.village.clone());
        let tally = groups.entry(key).or_insert(Tally {
            claims: 0,
            priority_sum: 0.0,
            income_sum: 0.0,
            income_count: 0,
        });
        tally.claims += 1;
        tally.priority_sum += priority;
        if let Some(income) = row.annual_income {
            tally.income_sum += income;
            tally.income_count += 1;
        }
    }

    let mut ranked: Vec<VillagePriority> = groups
        .into_iter()
        .map(|((state, district, village), tally)| VillagePriority {
            state,
            district,
            village,
            claims: tally.claims,
            avg_priority: tally.priority_sum / tally.claims as f64,
            avg_income: (tally.income_count > 0)
                .then(|| tally.income_sum / tally.income_count as f64),
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.avg_priority
            .partial_cmp(&a.avg_priority)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(limit);
    ranked
}
