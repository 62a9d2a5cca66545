//! Reconciliation engine
//!
//! Core write path for incoming claim records. For each normalized
//! candidate the engine matches against stored claims, then inserts a new
//! row, merges changed fields into the matched row, or does nothing when
//! the candidate contributes no new data. Writes to the same person are
//! serialized through per-identity advisory locks so that two concurrent
//! submissions of one claimant cannot both insert.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use fra_common::db::models::{CandidateClaim, Claim};
use fra_common::db::claims;
use fra_common::events::{EventBus, FraEvent};
use fra_common::{Error, Result};
use serde::Serialize;
use sqlx::{Pool, Sqlite};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audit;
use crate::fields::{self, FIELD_SPECS};
use crate::matcher::{ClaimMatch, ClaimMatcher};

/// What reconciliation did with a candidate record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileOperation {
    Inserted,
    Updated,
    Unchanged,
}

impl ReconcileOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOperation::Inserted => "inserted",
            ReconcileOperation::Updated => "updated",
            ReconcileOperation::Unchanged => "unchanged",
        }
    }
}

impl std::fmt::Display for ReconcileOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of reconciling one candidate record.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileOutcome {
    pub operation: ReconcileOperation,
    /// The claim as stored after the call.
    pub claim: Claim,
    /// Field names written during a merge, empty for inserts and no-ops.
    pub changed_fields: Vec<String>,
}

impl ReconcileOutcome {
    pub fn claim_id(&self) -> Uuid {
        self.claim.claim_id
    }
}

/// Reconciles candidate records into the claims table.
pub struct ReconcileEngine {
    db: Pool<Sqlite>,
    event_bus: EventBus,
    matcher: ClaimMatcher,
    /// Advisory locks keyed by identity number or fallback key. Held only
    /// for the duration of one reconcile call.
    write_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ReconcileEngine {
    pub fn new(db: Pool<Sqlite>, event_bus: EventBus) -> Self {
        Self {
            matcher: ClaimMatcher::new(db.clone()),
            db,
            event_bus,
            write_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Reconcile one candidate record from `source`, optionally attributed
    /// to `actor` in the audit trail.
    ///
    /// **Algorithm:**
    /// 1. Reject candidates with no usable field at all
    /// 2. Serialize against concurrent writes for the same person
    /// 3. Match by identity number, then fallback key
    /// 4. No match: insert a new claim. Match: merge non-empty differing
    ///    fields, or report [`ReconcileOperation::Unchanged`] without
    ///    touching the row
    ///
    /// Merges that changed fields append an audit entry with before and
    /// after snapshots; an audit failure is logged but never fails the
    /// write itself. Inserts and merges emit [`FraEvent::ClaimReconciled`].
    pub async fn reconcile(
        &self,
        candidate: &CandidateClaim,
        source: &str,
        actor: Option<&str>,
    ) -> Result<ReconcileOutcome> {
        if fields::candidate_is_empty(candidate) {
            return Err(Error::InvalidInput(
                "Candidate record has no usable fields".to_string(),
            ));
        }

        let lock_key = self.lock_key(candidate);
        let guard = match &lock_key {
            Some(key) => Some(self.acquire_write_lock(key.clone()).await),
            None => None,
        };

        let outcome = match self.matcher.find_match(candidate).await {
            Ok(ClaimMatch::NoMatch) => self.insert_new(candidate, source).await,
            Ok(ClaimMatch::ByIdentity(claim)) | Ok(ClaimMatch::ByFallbackKey(claim)) => {
                self.merge_into(claim, candidate, source, actor).await
            }
            Err(e) => Err(e),
        };

        drop(guard);
        if let Some(key) = lock_key {
            self.release_write_lock(&key).await;
        }

        outcome
    }

    /// Advisory lock key for a candidate: identity number when present,
    /// otherwise the lowercased fallback key. Candidates with neither take
    /// no lock; they can only ever insert.
    fn lock_key(&self, candidate: &CandidateClaim) -> Option<String> {
        let aadhaar = candidate.aadhaar_no.trim();
        if !aadhaar.is_empty() {
            return Some(format!("id:{}", aadhaar));
        }

        let name = candidate.claimant_name.trim();
        let village = candidate.village.trim();
        let district = candidate.district.trim();
        if name.is_empty() || village.is_empty() || district.is_empty() {
            return None;
        }
        Some(format!(
            "fk:{}|{}|{}",
            name.to_lowercase(),
            village.to_lowercase(),
            district.to_lowercase()
        ))
    }

    async fn acquire_write_lock(&self, key: String) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.write_locks.lock().await;
            locks
                .entry(key)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Drop the map entry once nothing else holds or awaits the lock.
    async fn release_write_lock(&self, key: &str) {
        let mut locks = self.write_locks.lock().await;
        if let Some(lock) = locks.get(key) {
            if Arc::strong_count(lock) == 1 {
                locks.remove(key);
            }
        }
    }

    async fn insert_new(&self, candidate: &CandidateClaim, source: &str) -> Result<ReconcileOutcome> {
        let now = Utc::now();
        let mut claim = Claim {
            claim_id: Uuid::new_v4(),
            claim_status: candidate.claim_status.unwrap_or_default(),
            last_update_source: source.to_string(),
            submitted_at: now,
            updated_at: now,
            ..Default::default()
        };

        for spec in FIELD_SPECS {
            let value = (spec.candidate)(candidate);
            if !value.is_empty() {
                (spec.apply)(&mut claim, value);
            }
        }
        if claim.gender.trim().is_empty() {
            claim.gender = "Not Specified".to_string();
        }

        claims::insert_claim(&self.db, &claim).await?;
        info!(
            claim_id = %claim.claim_id,
            claimant_name = %claim.claimant_name,
            source,
            "Inserted new claim"
        );

        self.event_bus.emit_lossy(FraEvent::ClaimReconciled {
            claim_id: claim.claim_id,
            operation: "inserted".to_string(),
            changed_fields: vec![],
            source: source.to_string(),
            timestamp: Utc::now(),
        });

        Ok(ReconcileOutcome {
            operation: ReconcileOperation::Inserted,
            claim,
            changed_fields: vec![],
        })
    }

    async fn merge_into(
        &self,
        mut claim: Claim,
        candidate: &CandidateClaim,
        source: &str,
        actor: Option<&str>,
    ) -> Result<ReconcileOutcome> {
        let before = claim.clone();
        let mut changed_fields = Vec::new();
        for spec in FIELD_SPECS {
            let value = (spec.candidate)(candidate);
            // An absent candidate value never clears stored data
            if value.is_empty() {
                continue;
            }
            if value != (spec.current)(&claim) {
                (spec.apply)(&mut claim, value);
                changed_fields.push(spec.name.to_string());
            }
        }

        if changed_fields.is_empty() {
            debug!(claim_id = %claim.claim_id, "Candidate contributed nothing new, no write");
            return Ok(ReconcileOutcome {
                operation: ReconcileOperation::Unchanged,
                claim,
                changed_fields,
            });
        }

        claim.update_count += 1;
        claim.last_update_source = source.to_string();
        claim.updated_at = Utc::now();
        claims::update_claim(&self.db, &claim).await?;
        info!(
            claim_id = %claim.claim_id,
            changed = changed_fields.len(),
            source,
            "Merged candidate into existing claim"
        );

        if let Err(e) =
            audit::record_merge(&self.db, &before, &claim, &changed_fields, source, actor).await
        {
            warn!(claim_id = %claim.claim_id, error = %e, "Failed to write audit entry");
        }
        self.event_bus.emit_lossy(FraEvent::ClaimReconciled {
            claim_id: claim.claim_id,
            operation: "updated".to_string(),
            changed_fields: changed_fields.clone(),
            source: source.to_string(),
            timestamp: Utc::now(),
        });

        Ok(ReconcileOutcome {
            operation: ReconcileOperation::Updated,
            claim,
            changed_fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fra_common::db::init::{create_claim_audit_table, create_claims_table};
    use fra_common::db::models::ClaimStatus;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_engine() -> (ReconcileEngine, Pool<Sqlite>, EventBus) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        create_claims_table(&pool).await.unwrap();
        create_claim_audit_table(&pool).await.unwrap();
        let bus = EventBus::new(16);
        let engine = ReconcileEngine::new(pool.clone(), bus.clone());
        (engine, pool, bus)
    }

    fn identified_candidate() -> CandidateClaim {
        CandidateClaim {
            claimant_name: "Ram Lal".to_string(),
            aadhaar_no: "123456789012".to_string(),
            village: "Dumburnagar".to_string(),
            district: "Dhalai".to_string(),
            state: "Tripura".to_string(),
            category: "ST".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn insert_applies_defaults() {
        let (engine, pool, _bus) = setup_engine().await;

        let outcome = engine.reconcile(&identified_candidate(), "ocr", None).await.unwrap();
        assert_eq!(outcome.operation, ReconcileOperation::Inserted);
        assert!(outcome.changed_fields.is_empty());

        let claim = claims::get_claim(&pool, &outcome.claim_id())
            .await
            .unwrap()
            .expect("claim row should exist");
        assert_eq!(claim.gender, "Not Specified");
        assert_eq!(claim.claim_status, ClaimStatus::Pending);
        assert_eq!(claim.update_count, 0);
        assert_eq!(claim.last_update_source, "ocr");
        assert_eq!(claim.submitted_at, claim.updated_at);
    }

    #[tokio::test]
    async fn empty_candidate_rejected() {
        let (engine, _pool, _bus) = setup_engine().await;

        let result = engine.reconcile(&CandidateClaim::default(), "ocr", None).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn status_only_candidate_rejected() {
        let (engine, _pool, _bus) = setup_engine().await;

        let candidate = CandidateClaim {
            claim_status: Some(ClaimStatus::Approved),
            ..Default::default()
        };
        let result = engine.reconcile(&candidate, "ocr", None).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn merge_applies_only_differing_fields() {
        let (engine, pool, _bus) = setup_engine().await;
        let first = engine.reconcile(&identified_candidate(), "ocr", None).await.unwrap();

        let mut second = identified_candidate();
        second.spouse_name = "Kamala Devi".to_string();
        second.annual_income = Some(48000.0);
        let outcome = engine.reconcile(&second, "csv_import", None).await.unwrap();

        assert_eq!(outcome.claim_id(), first.claim_id());
        assert_eq!(outcome.operation, ReconcileOperation::Updated);
        assert_eq!(outcome.changed_fields, vec!["spouse_name", "annual_income"]);

        let claim = claims::get_claim(&pool, &first.claim_id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claim.spouse_name, "Kamala Devi");
        assert_eq!(claim.annual_income, Some(48000.0));
        assert_eq!(claim.village, "Dumburnagar", "unchanged field must survive");
        assert_eq!(claim.update_count, 1);
        assert_eq!(claim.last_update_source, "csv_import");
        assert!(claim.updated_at > claim.submitted_at);
    }

    #[tokio::test]
    async fn merge_never_clears_stored_values() {
        let (engine, pool, _bus) = setup_engine().await;
        let mut first = identified_candidate();
        first.annual_income = Some(48000.0);
        first.spouse_name = "Kamala Devi".to_string();
        let inserted = engine.reconcile(&first, "ocr", None).await.unwrap();

        // Sparse re-digitization of the same person: income and spouse absent
        let mut second = identified_candidate();
        second.age = Some(52);
        let outcome = engine.reconcile(&second, "ocr", None).await.unwrap();
        assert_eq!(outcome.changed_fields, vec!["age"]);

        let claim = claims::get_claim(&pool, &inserted.claim_id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claim.annual_income, Some(48000.0));
        assert_eq!(claim.spouse_name, "Kamala Devi");
        assert_eq!(claim.age, Some(52));
    }

    #[tokio::test]
    async fn identical_resubmission_is_unchanged() {
        let (engine, pool, _bus) = setup_engine().await;
        let first = engine.reconcile(&identified_candidate(), "ocr", None).await.unwrap();
        let before = claims::get_claim(&pool, &first.claim_id())
            .await
            .unwrap()
            .unwrap();

        let outcome = engine.reconcile(&identified_candidate(), "ocr", None).await.unwrap();
        assert_eq!(outcome.operation, ReconcileOperation::Unchanged);
        assert!(outcome.changed_fields.is_empty());

        let after = claims::get_claim(&pool, &first.claim_id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.update_count, 0);
        assert_eq!(after.updated_at, before.updated_at, "no-op must not touch the row");

        let history = audit::claim_history(&pool, &first.claim_id()).await.unwrap();
        assert!(history.is_empty(), "neither insert nor no-op leaves an audit row");
    }

    #[tokio::test]
    async fn workflow_status_never_merged() {
        let (engine, pool, _bus) = setup_engine().await;
        let first = engine.reconcile(&identified_candidate(), "ocr", None).await.unwrap();

        let mut second = identified_candidate();
        second.claim_status = Some(ClaimStatus::Approved);
        second.age = Some(40);
        let outcome = engine.reconcile(&second, "ocr", None).await.unwrap();
        assert_eq!(outcome.operation, ReconcileOperation::Updated);

        let claim = claims::get_claim(&pool, &first.claim_id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            claim.claim_status,
            ClaimStatus::Pending,
            "merge must not move workflow state"
        );
    }

    #[tokio::test]
    async fn candidate_status_applies_on_insert() {
        let (engine, pool, _bus) = setup_engine().await;

        let mut candidate = identified_candidate();
        candidate.claim_status = Some(ClaimStatus::Approved);
        let outcome = engine.reconcile(&candidate, "csv_import", None).await.unwrap();

        let claim = claims::get_claim(&pool, &outcome.claim_id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(claim.claim_status, ClaimStatus::Approved);
    }

    #[tokio::test]
    async fn writes_emit_events_and_audit() {
        let (engine, pool, bus) = setup_engine().await;
        let mut rx = bus.subscribe();

        let first = engine.reconcile(&identified_candidate(), "ocr", None).await.unwrap();
        let mut second = identified_candidate();
        second.age = Some(45);
        engine
            .reconcile(&second, "csv_import", Some("qc-team"))
            .await
            .unwrap();
        // No-op emits nothing
        engine
            .reconcile(&second, "csv_import", Some("qc-team"))
            .await
            .unwrap();

        match rx.try_recv().unwrap() {
            FraEvent::ClaimReconciled {
                claim_id,
                operation,
                source,
                ..
            } => {
                assert_eq!(claim_id, first.claim_id());
                assert_eq!(operation, "inserted");
                assert_eq!(source, "ocr");
            }
            other => panic!("unexpected event {:?}", other),
        }
        match rx.try_recv().unwrap() {
            FraEvent::ClaimReconciled {
                operation,
                changed_fields,
                ..
            } => {
                assert_eq!(operation, "updated");
                assert_eq!(changed_fields, vec!["age"]);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(rx.try_recv().is_err(), "no event for a no-op merge");

        let history = audit::claim_history(&pool, &first.claim_id()).await.unwrap();
        assert_eq!(history.len(), 1, "only the field-changing merge is audited");
        assert_eq!(history[0].changed_fields, vec!["age"]);
        assert_eq!(history[0].old_data.age, None);
        assert_eq!(history[0].new_data.age, Some(45));
        assert_eq!(history[0].old_data.update_count, 0);
        assert_eq!(history[0].new_data.update_count, 1);
        assert_eq!(history[0].update_source, "csv_import");
        assert_eq!(history[0].updated_by.as_deref(), Some("qc-team"));
    }

    #[tokio::test]
    async fn fallback_match_merges_identity_less_claims() {
        let (engine, _pool, _bus) = setup_engine().await;

        let keyless = CandidateClaim {
            claimant_name: "Soma Debbarma".to_string(),
            village: "Ambassa".to_string(),
            district: "Dhalai".to_string(),
            ..Default::default()
        };
        let first = engine.reconcile(&keyless, "ocr", None).await.unwrap();
        assert_eq!(first.operation, ReconcileOperation::Inserted);

        let mut richer = keyless.clone();
        richer.age = Some(37);
        let second = engine.reconcile(&richer, "ocr", None).await.unwrap();
        assert_eq!(second.claim_id(), first.claim_id());
        assert_eq!(second.operation, ReconcileOperation::Updated);
    }

    #[tokio::test]
    async fn lock_keys_partition_by_identity() {
        let (engine, _pool, _bus) = setup_engine().await;

        let with_id = identified_candidate();
        assert_eq!(engine.lock_key(&with_id).as_deref(), Some("id:123456789012"));

        let mut keyless = identified_candidate();
        keyless.aadhaar_no.clear();
        assert_eq!(
            engine.lock_key(&keyless).as_deref(),
            Some("fk:ram lal|dumburnagar|dhalai")
        );

        let mut bare = CandidateClaim::default();
        bare.spouse_name = "Kamala Devi".to_string();
        assert_eq!(engine.lock_key(&bare), None);
    }

    #[tokio::test]
    async fn lock_map_drains_after_release() {
        let (engine, _pool, _bus) = setup_engine().await;

        engine.reconcile(&identified_candidate(), "ocr", None).await.unwrap();
        let remaining = engine.write_locks.lock().await.len();
        assert_eq!(remaining, 0, "released locks must not accumulate");
    }
}
