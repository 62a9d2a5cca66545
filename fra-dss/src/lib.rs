//! Decision support for reconciled forest-rights claims.
//!
//! Scores every claim against five welfare schemes, compiles structured
//! recommendations, and keeps the score store in sync with the external
//! batch scorer. Reads degrade gracefully: store, then snapshot CSV, then
//! scoring the claim inline.

pub mod cache;
pub mod recommend;
pub mod runner;
pub mod schemes;
pub mod scoring;
pub mod snapshot;
pub mod store;
pub mod sync;

pub use crate::recommend::{compile_scores, Recommendation};
pub use crate::schemes::Scheme;
pub use crate::scoring::{score_claim, score_row_for, SchemePriorities};
pub use crate::store::{ImportSummary, ScoreQuery, ScoreStore};
pub use crate::sync::{DssService, ResyncHandle, ScoreOrigin, TriggerAck};
