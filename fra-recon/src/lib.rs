//! Claim record reconciliation
//!
//! Turns raw digitized claim records into canonical rows in the claims
//! table. Incoming records are normalized to the shared field set, matched
//! against existing claims by identity number or fallback key, and either
//! inserted, merged field by field, or left untouched when nothing new
//! arrived. Merges that change stored fields land in the claim audit trail
//! with full before and after snapshots.

pub mod audit;
pub mod bulk;
pub mod engine;
pub mod fields;
pub mod matcher;
pub mod normalizer;

pub use crate::bulk::{BulkImporter, BulkImportSummary};
pub use crate::engine::{ReconcileEngine, ReconcileOperation, ReconcileOutcome};
pub use crate::matcher::{ClaimMatch, ClaimMatcher};
