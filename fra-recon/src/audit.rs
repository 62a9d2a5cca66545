//! Claim audit trail
//!
//! Append-only record of merges that changed stored fields. Audit failures
//! never fail the write they describe; the engine logs and moves on, so a
//! broken audit table degrades traceability without blocking digitization.

use chrono::Utc;
use fra_common::db::models::{Claim, ClaimAuditRecord};
use fra_common::{Error, Result};
use sqlx::{Pool, Row, Sqlite};
use uuid::Uuid;

/// Append one audit entry for a merge.
///
/// `old_data` and `new_data` are the full claim before and after the write;
/// `changed_fields` names exactly the fields that differ between them.
pub async fn record_merge(
    pool: &Pool<Sqlite>,
    old_data: &Claim,
    new_data: &Claim,
    changed_fields: &[String],
    update_source: &str,
    updated_by: Option<&str>,
) -> Result<()> {
    let old_json = serde_json::to_string(old_data)
        .map_err(|e| Error::Internal(format!("Failed to encode old claim snapshot: {}", e)))?;
    let new_json = serde_json::to_string(new_data)
        .map_err(|e| Error::Internal(format!("Failed to encode new claim snapshot: {}", e)))?;
    let fields_json = serde_json::to_string(changed_fields)
        .map_err(|e| Error::Internal(format!("Failed to encode changed fields: {}", e)))?;

    sqlx::query(
        r#"
        INSERT INTO claim_audit
            (audit_id, claim_id, old_data, new_data, changed_fields, update_source, updated_by, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(new_data.claim_id.to_string())
    .bind(old_json)
    .bind(new_json)
    .bind(fields_json)
    .bind(update_source)
    .bind(updated_by)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Full audit history for one claim, oldest entry first.
pub async fn claim_history(pool: &Pool<Sqlite>, claim_id: &Uuid) -> Result<Vec<ClaimAuditRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT audit_id, claim_id, old_data, new_data, changed_fields,
               update_source, updated_by, created_at
        FROM claim_audit
        WHERE claim_id = ?
        ORDER BY created_at ASC, rowid ASC
        "#,
    )
    .bind(claim_id.to_string())
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let audit_id: String = row.try_get("audit_id")?;
        let claim_id: String = row.try_get("claim_id")?;
        let old_json: String = row.try_get("old_data")?;
        let new_json: String = row.try_get("new_data")?;
        let fields_json: String = row.try_get("changed_fields")?;

        records.push(ClaimAuditRecord {
            audit_id: Uuid::parse_str(&audit_id)
                .map_err(|e| Error::Internal(format!("Invalid audit_id in database: {}", e)))?,
            claim_id: Uuid::parse_str(&claim_id)
                .map_err(|e| Error::Internal(format!("Invalid claim_id in database: {}", e)))?,
            old_data: serde_json::from_str(&old_json)
                .map_err(|e| Error::Internal(format!("Invalid old_data in database: {}", e)))?,
            new_data: serde_json::from_str(&new_json)
                .map_err(|e| Error::Internal(format!("Invalid new_data in database: {}", e)))?,
            changed_fields: serde_json::from_str(&fields_json).map_err(|e| {
                Error::Internal(format!("Invalid changed_fields in database: {}", e))
            })?,
            update_source: row.try_get("update_source")?,
            updated_by: row.try_get("updated_by")?,
            created_at: row.try_get("created_at")?,
        });
    }

    Ok(records)
}
