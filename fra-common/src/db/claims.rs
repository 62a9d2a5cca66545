//! Claim row access shared by the reconciliation and decision-support crates

use crate::db::models::{Claim, ClaimStatus};
use crate::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Optional filters for claim listings
#[derive(Debug, Clone, Default)]
pub struct ClaimQuery {
    pub state: Option<String>,
    pub district: Option<String>,
    pub status: Option<ClaimStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Aggregate counts over the claims table
#[derive(Debug, Clone, serde::Serialize)]
pub struct ClaimStatistics {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub processing_error: i64,
    pub distinct_states: i64,
    pub distinct_districts: i64,
}

fn claim_from_row(row: &SqliteRow) -> Result<Claim> {
    let claim_id: String = row.try_get("claim_id")?;
    let claim_id = Uuid::parse_str(&claim_id)
        .map_err(|e| Error::Internal(format!("Invalid claim_id in database: {}", e)))?;

    let status: String = row.try_get("claim_status")?;
    let claim_status = ClaimStatus::parse(&status)
        .ok_or_else(|| Error::Internal(format!("Unknown claim_status in database: {}", status)))?;

    Ok(Claim {
        claim_id,
        claimant_name: row.try_get("claimant_name")?,
        spouse_name: row.try_get("spouse_name")?,
        age: row.try_get("age")?,
        gender: row.try_get("gender")?,
        aadhaar_no: row.try_get("aadhaar_no")?,
        category: row.try_get("category")?,
        village: row.try_get("village")?,
        gram_panchayat: row.try_get("gram_panchayat")?,
        block_tehsil: row.try_get("block_tehsil")?,
        district: row.try_get("district")?,
        state: row.try_get("state")?,
        claim_type: row.try_get("claim_type")?,
        land_claimed: row.try_get("land_claimed")?,
        land_use: row.try_get("land_use")?,
        annual_income: row.try_get("annual_income")?,
        tax_payer: row.try_get("tax_payer")?,
        boundary_description: row.try_get("boundary_description")?,
        geo_coordinates: row.try_get("geo_coordinates")?,
        status_of_claim: row.try_get("status_of_claim")?,
        date_of_submission: row.try_get("date_of_submission")?,
        date_of_decision: row.try_get("date_of_decision")?,
        patta_title_no: row.try_get("patta_title_no")?,
        water_body: row.try_get("water_body")?,
        irrigation_source: row.try_get("irrigation_source")?,
        infrastructure_present: row.try_get("infrastructure_present")?,
        claim_status,
        update_count: row.try_get("update_count")?,
        last_update_source: row.try_get("last_update_source")?,
        submitted_at: row.try_get("submitted_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Insert a fully-populated claim row
pub async fn insert_claim(pool: &SqlitePool, claim: &Claim) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO claims (
            claim_id, claimant_name, spouse_name, age, gender, aadhaar_no,
            category, village, gram_panchayat, block_tehsil, district, state,
            claim_type, land_claimed, land_use, annual_income, tax_payer,
            boundary_description, geo_coordinates, status_of_claim,
            date_of_submission, date_of_decision, patta_title_no, water_body,
            irrigation_source, infrastructure_present, claim_status,
            update_count, last_update_source, submitted_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(claim.claim_id.to_string())
    .bind(&claim.claimant_name)
    .bind(&claim.spouse_name)
    .bind(claim.age)
    .bind(&claim.gender)
    .bind(&claim.aadhaar_no)
    .bind(&claim.category)
    .bind(&claim.village)
    .bind(&claim.gram_panchayat)
    .bind(&claim.block_tehsil)
    .bind(&claim.district)
    .bind(&claim.state)
    .bind(&claim.claim_type)
    .bind(&claim.land_claimed)
    .bind(&claim.land_use)
    .bind(claim.annual_income)
    .bind(claim.tax_payer)
    .bind(&claim.boundary_description)
    .bind(&claim.geo_coordinates)
    .bind(&claim.status_of_claim)
    .bind(claim.date_of_submission)
    .bind(claim.date_of_decision)
    .bind(&claim.patta_title_no)
    .bind(&claim.water_body)
    .bind(&claim.irrigation_source)
    .bind(&claim.infrastructure_present)
    .bind(claim.claim_status.as_str())
    .bind(claim.update_count)
    .bind(&claim.last_update_source)
    .bind(claim.submitted_at)
    .bind(claim.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Write back every merge-managed column of an existing claim row
///
/// `submitted_at` is never rewritten; the caller stamps `updated_at`,
/// `update_count`, and `last_update_source` before calling.
pub async fn update_claim(pool: &SqlitePool, claim: &Claim) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE claims SET
            claimant_name = ?, spouse_name = ?, age = ?, gender = ?, aadhaar_no = ?,
            category = ?, village = ?, gram_panchayat = ?, block_tehsil = ?,
            district = ?, state = ?, claim_type = ?, land_claimed = ?, land_use = ?,
            annual_income = ?, tax_payer = ?, boundary_description = ?,
            geo_coordinates = ?, status_of_claim = ?, date_of_submission = ?,
            date_of_decision = ?, patta_title_no = ?, water_body = ?,
            irrigation_source = ?, infrastructure_present = ?, claim_status = ?,
            update_count = ?, last_update_source = ?, updated_at = ?
        WHERE claim_id = ?
        "#,
    )
    .bind(&claim.claimant_name)
    .bind(&claim.spouse_name)
    .bind(claim.age)
    .bind(&claim.gender)
    .bind(&claim.aadhaar_no)
    .bind(&claim.category)
    .bind(&claim.village)
    .bind(&claim.gram_panchayat)
    .bind(&claim.block_tehsil)
    .bind(&claim.district)
    .bind(&claim.state)
    .bind(&claim.claim_type)
    .bind(&claim.land_claimed)
    .bind(&claim.land_use)
    .bind(claim.annual_income)
    .bind(claim.tax_payer)
    .bind(&claim.boundary_description)
    .bind(&claim.geo_coordinates)
    .bind(&claim.status_of_claim)
    .bind(claim.date_of_submission)
    .bind(claim.date_of_decision)
    .bind(&claim.patta_title_no)
    .bind(&claim.water_body)
    .bind(&claim.irrigation_source)
    .bind(&claim.infrastructure_present)
    .bind(claim.claim_status.as_str())
    .bind(claim.update_count)
    .bind(&claim.last_update_source)
    .bind(claim.updated_at)
    .bind(claim.claim_id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Claim {} not found", claim.claim_id)));
    }

    Ok(())
}

/// Fetch a single claim by id
pub async fn get_claim(pool: &SqlitePool, claim_id: &Uuid) -> Result<Option<Claim>> {
    let row = sqlx::query("SELECT * FROM claims WHERE claim_id = ?")
        .bind(claim_id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(claim_from_row).transpose()
}

/// Fetch the claim holding an exact identity number, if any
pub async fn find_by_identity(pool: &SqlitePool, aadhaar_no: &str) -> Result<Option<Claim>> {
    let row = sqlx::query("SELECT * FROM claims WHERE aadhaar_no = ?")
        .bind(aadhaar_no)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(claim_from_row).transpose()
}

/// Fetch the oldest identity-less claim matching (name, village, district)
///
/// Comparison is case-insensitive. Rows that already carry an identity
/// number are never candidates here; those are matched by identity alone.
pub async fn find_by_fallback_key(
    pool: &SqlitePool,
    claimant_name: &str,
    village: &str,
    district: &str,
) -> Result<Option<Claim>> {
    let row = sqlx::query(
        r#"
        SELECT * FROM claims
        WHERE aadhaar_no = ''
          AND LOWER(claimant_name) = LOWER(?)
          AND LOWER(village) = LOWER(?)
          AND LOWER(district) = LOWER(?)
        ORDER BY rowid
        LIMIT 1
        "#,
    )
    .bind(claimant_name)
    .bind(village)
    .bind(district)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(claim_from_row).transpose()
}

/// List claims, newest submissions first
pub async fn list_claims(pool: &SqlitePool, query: &ClaimQuery) -> Result<Vec<Claim>> {
    let mut sql = String::from("SELECT * FROM claims");
    let mut clauses: Vec<&str> = Vec::new();

    if query.state.is_some() {
        clauses.push("state = ?");
    }
    if query.district.is_some() {
        clauses.push("district = ?");
    }
    if query.status.is_some() {
        clauses.push("claim_status = ?");
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY submitted_at DESC, rowid DESC LIMIT ? OFFSET ?");

    let mut q = sqlx::query(&sql);
    if let Some(state) = &query.state {
        q = q.bind(state);
    }
    if let Some(district) = &query.district {
        q = q.bind(district);
    }
    if let Some(status) = &query.status {
        q = q.bind(status.as_str());
    }
    q = q.bind(query.limit.unwrap_or(100)).bind(query.offset.unwrap_or(0));

    let rows = q.fetch_all(pool).await?;
    rows.iter().map(claim_from_row).collect()
}

/// Aggregate claim counts for reporting
pub async fn claim_statistics(pool: &SqlitePool) -> Result<ClaimStatistics> {
    // Empty string means "not captured", keep it out of the distinct counts
    let row: (i64, i64, i64, i64, i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COUNT(*),
            COALESCE(SUM(CASE WHEN claim_status = 'pending' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN claim_status = 'approved' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN claim_status = 'rejected' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN claim_status = 'processing_error' THEN 1 ELSE 0 END), 0),
            COUNT(DISTINCT CASE WHEN state <> '' THEN state END),
            COUNT(DISTINCT CASE WHEN district <> '' THEN district END)
        FROM claims
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(ClaimStatistics {
        total: row.0,
        pending: row.1,
        approved: row.2,
        rejected: row.3,
        processing_error: row.4,
        distinct_states: row.5,
        distinct_districts: row.6,
    })
}
