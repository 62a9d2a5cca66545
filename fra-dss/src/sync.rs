//! Score sync and read fallback orchestration.
//!
//! [`DssService`] is the one entry point for score reads and resyncs. A
//! read walks a staged chain: the score store first, then the snapshot
//! CSV, then (for a single claim) scoring the claim record inline. Each
//! answer reports its origin so callers and logs can tell a degraded read
//! from a healthy one.
//!
//! A resync runs the external scorer and re-imports the snapshot. Only one
//! resync runs at a time; triggering while one is in flight is
//! acknowledged, not queued.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use fra_common::config::ScorerCommand;
use fra_common::db::models::SchemeScoreRow;
use fra_common::db::{claims, settings};
use fra_common::events::{EventBus, FraEvent};
use fra_common::{Error, Result};
use serde::Serialize;
use sqlx::{Pool, Sqlite};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::cache::ScoreCache;
use crate::recommend::{self, Recommendation};
use crate::runner::ScorerRunner;
use crate::schemes::Scheme;
use crate::scoring;
use crate::snapshot;
use crate::store::{self, ImportSummary, ScoreQuery, ScoreStore, SchemeStatistics, VillagePriority};

const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_SCORER_TIMEOUT_SECS: u64 = 1800;

/// Which stage of the fallback chain produced an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreOrigin {
    Store,
    Snapshot,
    Computed,
}

impl ScoreOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreOrigin::Store => "store",
            ScoreOrigin::Snapshot => "snapshot",
            ScoreOrigin::Computed => "computed",
        }
    }
}

impl std::fmt::Display for ScoreOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A score listing plus where it came from.
#[derive(Debug, Clone)]
pub struct ScoreListing {
    pub rows: Arc<Vec<SchemeScoreRow>>,
    pub origin: ScoreOrigin,
}

/// Acknowledgement for a fire-and-forget resync trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerAck {
    Started,
    AlreadyRunning,
}

/// How the most recent resync ended.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ResyncReport {
    Completed {
        finished_at: DateTime<Utc>,
        inserted: usize,
        updated: usize,
        errors: usize,
        scorer_ran: bool,
    },
    Failed {
        finished_at: DateTime<Utc>,
        reason: String,
    },
    Cancelled {
        finished_at: DateTime<Utc>,
    },
}

/// Point-in-time view of the resync worker.
#[derive(Debug, Clone, Serialize)]
pub struct ResyncStatus {
    pub running: bool,
    pub running_since: Option<DateTime<Utc>>,
    pub last: Option<ResyncReport>,
}

/// Handle onto the resync worker, cheap to clone and hand out.
#[derive(Clone)]
pub struct ResyncHandle {
    shared: Arc<ResyncShared>,
}

impl ResyncHandle {
    pub async fn status(&self) -> ResyncStatus {
        let state = self.shared.state.lock().await;
        ResyncStatus {
            running: self.shared.in_flight.load(Ordering::SeqCst),
            running_since: state.running_since,
            last: state.last.clone(),
        }
    }

    /// Ask a running resync to stop. Returns false when none is running.
    pub async fn cancel(&self) -> bool {
        if !self.shared.in_flight.load(Ordering::SeqCst) {
            return false;
        }
        self.shared.cancel.lock().await.cancel();
        true
    }
}

#[derive(Default)]
struct ResyncShared {
    in_flight: AtomicBool,
    cancel: Mutex<CancellationToken>,
    state: Mutex<ResyncState>,
}

#[derive(Default)]
struct ResyncState {
    running_since: Option<DateTime<Utc>>,
    last: Option<ResyncReport>,
}

/// One claim's entry in a batch recommendation response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRecommendation {
    pub claim_id: Uuid,
    #[serde(flatten)]
    pub outcome: RecommendationOutcome,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecommendationOutcome {
    Ok { recommendation: Recommendation },
    NotAvailable,
    Failed { error: String },
}

/// Decision-support service: score reads with fallback, recommendations,
/// aggregations, and the resync worker.
pub struct DssService {
    db: Pool<Sqlite>,
    event_bus: EventBus,
    store: ScoreStore,
    cache: ScoreCache,
    snapshot_path: PathBuf,
    runner: ScorerRunner,
    resync: Arc<ResyncShared>,
}

impl DssService {
    pub fn new(
        db: Pool<Sqlite>,
        event_bus: EventBus,
        snapshot_path: PathBuf,
        scorer: ScorerCommand,
    ) -> Self {
        Self {
            store: ScoreStore::new(db.clone()),
            cache: ScoreCache::new(),
            runner: ScorerRunner::new(scorer),
            resync: Arc::new(ResyncShared::default()),
            db,
            event_bus,
            snapshot_path,
        }
    }

    pub fn resync_handle(&self) -> ResyncHandle {
        ResyncHandle {
            shared: Arc::clone(&self.resync),
        }
    }

    /// List scores matching the query.
    ///
    /// The store answers first. If it fails, the snapshot is parsed and
    /// filtered in memory. Only the unfiltered listing is served from the
    /// cache.
    pub async fn scores(&self, query: &ScoreQuery) -> Result<ScoreListing> {
        let cacheable = query.is_unfiltered();
        if cacheable {
            if let Some(rows) = self.cache.get(self.cache_ttl().await).await {
                debug!(rows = rows.len(), "Serving cached score listing");
                return Ok(ScoreListing {
                    rows,
                    origin: ScoreOrigin::Store,
                });
            }
        }

        let store_error = match self.store.list(query).await {
            Ok(rows) => {
                let rows = if cacheable {
                    self.cache.put(rows).await
                } else {
                    Arc::new(rows)
                };
                return Ok(ScoreListing {
                    rows,
                    origin: ScoreOrigin::Store,
                });
            }
            Err(e) => e,
        };
        warn!(error = %store_error, "Score store unavailable, reading snapshot");

        match snapshot::read_snapshot(&self.snapshot_path).await {
            Ok(parsed) => {
                let mut rows: Vec<SchemeScoreRow> = parsed
                    .rows
                    .into_iter()
                    .filter(|row| query.matches(row))
                    .collect();
                rows.sort_by(|a, b| a.claim_id.cmp(&b.claim_id));
                Ok(ScoreListing {
                    rows: Arc::new(rows),
                    origin: ScoreOrigin::Snapshot,
                })
            }
            Err(snapshot_error) => {
                error!(
                    store_error = %store_error,
                    snapshot_error = %snapshot_error,
                    "Every score source failed"
                );
                Err(Error::Internal(format!(
                    "Score store failed ({store_error}) and snapshot fallback failed \
                     ({snapshot_error})"
                )))
            }
        }
    }

    /// Resolve one claim's scores through the fallback chain: stored row,
    /// snapshot row, then scoring the claim record inline. `None` means
    /// the claim is unknown everywhere.
    pub async fn score_for_claim(
        &self,
        claim_id: &Uuid,
    ) -> Result<Option<(SchemeScoreRow, ScoreOrigin)>> {
        let key = claim_id.to_string();

        match self.store.get_by_claim(&key).await {
            Ok(Some(row)) => return Ok(Some((row, ScoreOrigin::Store))),
            Ok(None) => debug!(claim_id = %claim_id, "No stored score, trying snapshot"),
            Err(e) => {
                warn!(claim_id = %claim_id, error = %e, "Score store unavailable, trying snapshot")
            }
        }

        match snapshot::read_snapshot(&self.snapshot_path).await {
            Ok(parsed) => {
                if let Some(row) = parsed.rows.into_iter().find(|row| row.claim_id == key) {
                    return Ok(Some((row, ScoreOrigin::Snapshot)));
                }
                debug!(claim_id = %claim_id, "No snapshot score, scoring inline");
            }
            Err(e) => {
                debug!(claim_id = %claim_id, error = %e, "Snapshot unavailable, scoring inline")
            }
        }

        match claims::get_claim(&self.db, claim_id).await? {
            Some(claim) => {
                let row = scoring::score_row_for(&claim, scoring::score_claim(&claim));
                // Keep the computed row for next time; losing it only costs
                // a recompute.
                if let Err(e) = self.store.upsert_row(&row).await {
                    debug!(claim_id = %claim_id, error = %e, "Could not persist computed score");
                }
                info!(claim_id = %claim_id, "Scored claim inline");
                Ok(Some((row, ScoreOrigin::Computed)))
            }
            None => Ok(None),
        }
    }

    /// Compile the recommendation payload for one claim. `None` means no
    /// score could be produced anywhere (the claim is unknown).
    pub async fn recommend_for_claim(&self, claim_id: &Uuid) -> Result<Option<Recommendation>> {
        match self.score_for_claim(claim_id).await? {
            Some((row, origin)) => {
                debug!(claim_id = %claim_id, origin = %origin, "Compiling recommendation");
                Ok(Some(recommend::compile_scores(&row)))
            }
            None => Ok(None),
        }
    }

    /// Recommendations for many claims, with per-claim error isolation.
    pub async fn recommend_batch(&self, claim_ids: &[Uuid]) -> Vec<BatchRecommendation> {
        let mut results = Vec::with_capacity(claim_ids.len());
        for claim_id in claim_ids {
            let outcome = match self.recommend_for_claim(claim_id).await {
                Ok(Some(recommendation)) => RecommendationOutcome::Ok { recommendation },
                Ok(None) => RecommendationOutcome::NotAvailable,
                Err(e) => {
                    warn!(claim_id = %claim_id, error = %e, "Recommendation failed");
                    RecommendationOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            results.push(BatchRecommendation {
                claim_id: *claim_id,
                outcome,
            });
        }
        results
    }

    /// Aggregate statistics over all scores, from whichever source answers.
    pub async fn score_statistics(&self) -> Result<(SchemeStatistics, ScoreOrigin)> {
        let listing = self.scores(&ScoreQuery::default()).await?;
        Ok((
            store::aggregate_statistics(listing.rows.as_slice()),
            listing.origin,
        ))
    }

    /// Villages ranked by average priority for one scheme.
    pub async fn top_villages(
        &self,
        scheme: Scheme,
        limit: usize,
    ) -> Result<(Vec<VillagePriority>, ScoreOrigin)> {
        let listing = self.scores(&ScoreQuery::default()).await?;
        Ok((
            store::top_villages(listing.rows.as_slice(), scheme, limit),
            listing.origin,
        ))
    }

    /// Start a resync in the background. Returns immediately with whether
    /// this call started one.
    pub async fn trigger_resync(self: Arc<Self>) -> TriggerAck {
        let Some(cancel) = self.begin_resync().await else {
            debug!("Resync trigger ignored, one is already running");
            return TriggerAck::AlreadyRunning;
        };

        info!("Score resync started in the background");
        let service = Arc::clone(&self);
        tokio::spawn(async move {
            let outcome = service.run_resync(&cancel, false).await;
            service.finish_resync(&outcome, &cancel).await;
        });
        TriggerAck::Started
    }

    /// Run a resync to completion on the caller's task.
    pub async fn resync_now(&self, skip_scorer: bool) -> Result<ImportSummary> {
        let Some(cancel) = self.begin_resync().await else {
            return Err(Error::InvalidInput(
                "A resync is already running".to_string(),
            ));
        };

        let outcome = self.run_resync(&cancel, skip_scorer).await;
        self.finish_resync(&outcome, &cancel).await;
        outcome.map(|(summary, _)| summary)
    }

    /// Take the single-flight guard, or None when a resync is running.
    async fn begin_resync(&self) -> Option<CancellationToken> {
        if self
            .resync
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return None;
        }

        let cancel = CancellationToken::new();
        *self.resync.cancel.lock().await = cancel.clone();
        self.resync.state.lock().await.running_since = Some(Utc::now());
        Some(cancel)
    }

    /// Scorer run, snapshot re-read, store import, cache invalidation.
    /// A scorer failure degrades to importing the snapshot it left behind;
    /// a snapshot read failure fails the resync.
    async fn run_resync(
        &self,
        cancel: &CancellationToken,
        skip_scorer: bool,
    ) -> Result<(ImportSummary, bool)> {
        self.event_bus.emit_lossy(FraEvent::ResyncStarted {
            timestamp: Utc::now(),
        });

        let mut scorer_ran = false;
        if !skip_scorer {
            match self.runner.run(self.scorer_timeout().await, cancel).await {
                Ok(()) => scorer_ran = true,
                Err(e) if cancel.is_cancelled() => return Err(e),
                Err(e) => {
                    warn!(error = %e, "DSS engine failed, using existing CSV");
                }
            }
        }

        let parsed = snapshot::read_snapshot(&self.snapshot_path).await?;
        let mut summary = self.store.import(&parsed.rows).await;
        summary.errors += parsed.errors;

        self.cache.invalidate().await;
        self.event_bus.emit_lossy(FraEvent::ScoresImported {
            inserted: summary.inserted,
            updated: summary.updated,
            errors: summary.errors,
            timestamp: Utc::now(),
        });
        info!(
            inserted = summary.inserted,
            updated = summary.updated,
            errors = summary.errors,
            scorer_ran,
            "Resync imported snapshot"
        );
        Ok((summary, scorer_ran))
    }

    /// Record the outcome, emit the terminal event, release the guard.
    async fn finish_resync(
        &self,
        outcome: &Result<(ImportSummary, bool)>,
        cancel: &CancellationToken,
    ) {
        let finished_at = Utc::now();
        let report = match outcome {
            Ok((summary, scorer_ran)) => {
                self.event_bus.emit_lossy(FraEvent::ResyncCompleted {
                    inserted: summary.inserted,
                    updated: summary.updated,
                    errors: summary.errors,
                    timestamp: finished_at,
                });
                ResyncReport::Completed {
                    finished_at,
                    inserted: summary.inserted,
                    updated: summary.updated,
                    errors: summary.errors,
                    scorer_ran: *scorer_ran,
                }
            }
            Err(_) if cancel.is_cancelled() => {
                info!("Resync cancelled");
                self.event_bus.emit_lossy(FraEvent::ResyncFailed {
                    reason: "Cancelled".to_string(),
                    timestamp: finished_at,
                });
                ResyncReport::Cancelled { finished_at }
            }
            Err(e) => {
                error!(error = %e, "Resync failed");
                self.event_bus.emit_lossy(FraEvent::ResyncFailed {
                    reason: e.to_string(),
                    timestamp: finished_at,
                });
                ResyncReport::Failed {
                    finished_at,
                    reason: e.to_string(),
                }
            }
        };

        let mut state = self.resync.state.lock().await;
        state.running_since = None;
        state.last = Some(report);
        self.resync.in_flight.store(false, Ordering::SeqCst);
    }

    async fn cache_ttl(&self) -> Duration {
        match settings::get_dss_cache_ttl_secs(&self.db).await {
            Ok(secs) => Duration::from_secs(secs),
            Err(e) => {
                debug!(error = %e, "Falling back to the default cache TTL");
                Duration::from_secs(DEFAULT_CACHE_TTL_SECS)
            }
        }
    }

    async fn scorer_timeout(&self) -> Duration {
        match settings::get_dss_scorer_timeout_secs(&self.db).await {
            Ok(secs) => Duration::from_secs(secs),
            Err(e) => {
                debug!(error = %e, "Falling back to the default scorer timeout");
                Duration::from_secs(DEFAULT_SCORER_TIMEOUT_SECS)
            }
        }
    }
}
