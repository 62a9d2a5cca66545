//! Score snapshot CSV.
//!
//! The batch scorer maintains one canonical CSV next to its working
//! directory; this module is the read/write half of that contract. Parsing
//! is tolerant: columns are located by header name, malformed rows are
//! counted and skipped, and missing priorities default to zero. Only the
//! `claim_id` column is mandatory.

use std::collections::HashMap;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use fra_common::db::models::SchemeScoreRow;
use fra_common::{Error, Result};
use tracing::{debug, warn};

/// Snapshot column order, as written by the batch scorer.
pub const SNAPSHOT_HEADERS: [&str; 19] = [
    "claim_id",
    "Claimant Name",
    "Age",
    "Gender",
    "State",
    "District",
    "Block/Tehsil",
    "Gram Panchayat",
    "Village",
    "Category",
    "Tax Payer",
    "Claim Type",
    "Status of Claim",
    "Annual Income",
    "Jal_Jeevan_Mission_Priority",
    "DAJGUA_Priority",
    "MGNREGA_Priority",
    "PM_KISAN_Priority",
    "PMAY_Priority",
];

/// Result of parsing a snapshot: the usable rows plus a count of rows
/// that had to be skipped.
#[derive(Debug, Default)]
pub struct ParsedSnapshot {
    pub rows: Vec<SchemeScoreRow>,
    pub errors: usize,
}

/// Read and parse the snapshot file.
pub async fn read_snapshot(path: &Path) -> Result<ParsedSnapshot> {
    let content = tokio::fs::read_to_string(path).await?;
    let parsed = parse_snapshot(&content)?;
    debug!(
        path = %path.display(),
        rows = parsed.rows.len(),
        errors = parsed.errors,
        "Parsed score snapshot"
    );
    Ok(parsed)
}

/// Parse snapshot CSV text.
pub fn parse_snapshot(content: &str) -> Result<ParsedSnapshot> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(Error::Csv)?
        .iter()
        .enumerate()
        .map(|(index, name)| (name.to_string(), index))
        .collect::<HashMap<String, usize>>();

    let claim_id_col = *headers
        .get("claim_id")
        .ok_or_else(|| Error::InvalidInput("Snapshot has no claim_id column".to_string()))?;

    let mut parsed = ParsedSnapshot::default();
    for (row_number, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!(row = row_number + 1, error = %e, "Skipping malformed snapshot row");
                parsed.errors += 1;
                continue;
            }
        };

        let claim_id = record.get(claim_id_col).unwrap_or("").trim();
        if claim_id.is_empty() {
            warn!(row = row_number + 1, "Skipping snapshot row without claim_id");
            parsed.errors += 1;
            continue;
        }

        parsed.rows.push(SchemeScoreRow {
            claim_id: claim_id.to_string(),
            claimant_name: text(&record, &headers, "Claimant Name"),
            age: number(&record, &headers, "Age"),
            gender: text(&record, &headers, "Gender"),
            state: text(&record, &headers, "State"),
            district: text(&record, &headers, "District"),
            block_tehsil: text(&record, &headers, "Block/Tehsil"),
            gram_panchayat: text(&record, &headers, "Gram Panchayat"),
            village: text(&record, &headers, "Village"),
            category: text(&record, &headers, "Category"),
            tax_payer: text(&record, &headers, "Tax Payer"),
            claim_type: text(&record, &headers, "Claim Type"),
            status_of_claim: text(&record, &headers, "Status of Claim"),
            annual_income: number(&record, &headers, "Annual Income"),
            jal_jeevan_mission_priority: priority(&record, &headers, "Jal_Jeevan_Mission_Priority"),
            dajgua_priority: priority(&record, &headers, "DAJGUA_Priority"),
            mgnrega_priority: priority(&record, &headers, "MGNREGA_Priority"),
            pm_kisan_priority: priority(&record, &headers, "PM_KISAN_Priority"),
            pmay_priority: priority(&record, &headers, "PMAY_Priority"),
        });
    }

    Ok(parsed)
}

/// Write rows as a snapshot file, sorted by claim_id, creating parent
/// directories as needed.
pub async fn write_snapshot(path: &Path, rows: &[SchemeScoreRow]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut sorted: Vec<&SchemeScoreRow> = rows.iter().collect();
    sorted.sort_by(|a, b| a.claim_id.cmp(&b.claim_id));

    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(SNAPSHOT_HEADERS).map_err(Error::Csv)?;
    for row in sorted {
        writer
            .write_record([
                row.claim_id.as_str(),
                row.claimant_name.as_str(),
                &optional_number(row.age),
                row.gender.as_str(),
                row.state.as_str(),
                row.district.as_str(),
                row.block_tehsil.as_str(),
                row.gram_panchayat.as_str(),
                row.village.as_str(),
                row.category.as_str(),
                row.tax_payer.as_str(),
                row.claim_type.as_str(),
                row.status_of_claim.as_str(),
                &optional_number(row.annual_income),
                &row.jal_jeevan_mission_priority.to_string(),
                &row.dajgua_priority.to_string(),
                &row.mgnrega_priority.to_string(),
                &row.pm_kisan_priority.to_string(),
                &row.pmay_priority.to_string(),
            ])
            .map_err(Error::Csv)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Internal(format!("Failed to flush snapshot: {e}")))?;
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

fn text(record: &StringRecord, headers: &HashMap<String, usize>, column: &str) -> String {
    headers
        .get(column)
        .and_then(|&index| record.get(index))
        .unwrap_or("")
        .trim()
        .to_string()
}

fn number(record: &StringRecord, headers: &HashMap<String, usize>, column: &str) -> Option<f64> {
    let value = text(record, headers, column);
    if value.is_empty() {
        return None;
    }
    value.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn priority(record: &StringRecord, headers: &HashMap<String, usize>, column: &str) -> f64 {
    number(record, headers, column).unwrap_or(0.0)
}

fn optional_number(value: Option<f64>) -> String {
    value.map(|n| n.to_string()).unwrap_or_default()
}
