//! Bulk CSV import
//!
//! Feeds legacy register exports through the reconciliation engine one row
//! at a time. Each row becomes a raw record keyed by the CSV headers, then
//! goes through the same normalize and reconcile path as any other source.
//! A bad row is counted and logged, never fatal; the archives this ingests
//! are too messy for all-or-nothing imports.

use std::path::Path;
use std::sync::Arc;

use fra_common::Result;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::engine::{ReconcileEngine, ReconcileOperation};
use crate::normalizer;

/// Tally of one bulk import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkImportSummary {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub errors: usize,
}

impl BulkImportSummary {
    pub fn total_rows(&self) -> usize {
        self.inserted + self.updated + self.unchanged + self.errors
    }
}

/// Imports claim CSV files through the reconciliation engine.
pub struct BulkImporter {
    engine: Arc<ReconcileEngine>,
}

impl BulkImporter {
    pub fn new(engine: Arc<ReconcileEngine>) -> Self {
        Self { engine }
    }

    /// Import every row of `path`, reconciling against existing claims.
    ///
    /// Rows are processed in file order so that a register exported with
    /// correction rows after the original entry merges deterministically.
    pub async fn import_csv(&self, path: &Path, source: &str) -> Result<BulkImportSummary> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;
        let headers = reader.headers()?.clone();

        let mut summary = BulkImportSummary::default();
        for record in reader.records() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    summary.errors += 1;
                    warn!(error = %e, "Skipping unreadable CSV row");
                    continue;
                }
            };
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            let raw = row_to_raw(&headers, &record);
            let candidate = normalizer::normalize(&raw);
            match self.engine.reconcile(&candidate, source, None).await {
                Ok(outcome) => match outcome.operation {
                    ReconcileOperation::Inserted => summary.inserted += 1,
                    ReconcileOperation::Updated => summary.updated += 1,
                    ReconcileOperation::Unchanged => summary.unchanged += 1,
                },
                Err(e) => {
                    summary.errors += 1;
                    warn!(line, error = %e, "CSV row failed reconciliation");
                }
            }
        }

        info!(
            file = %path.display(),
            inserted = summary.inserted,
            updated = summary.updated,
            unchanged = summary.unchanged,
            errors = summary.errors,
            "Bulk import finished"
        );
        Ok(summary)
    }
}

/// Pair header names with row values into a raw record for normalization.
fn row_to_raw(headers: &csv::StringRecord, record: &csv::StringRecord) -> serde_json::Map<String, Value> {
    headers
        .iter()
        .zip(record.iter())
        .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
        .collect()
}
