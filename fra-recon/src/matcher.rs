//! Claim matching
//!
//! Decides whether an incoming candidate record refers to a claim that is
//! already on file. Matching is two-tier: an exact identity number match
//! when the candidate carries one, otherwise a composite key over claimant
//! name, village, and district. A candidate with an identity number never
//! falls through to the composite key, since two different people can share
//! a name and village but never an identity number.

use fra_common::db::claims;
use fra_common::db::models::{CandidateClaim, Claim};
use fra_common::Result;
use sqlx::{Pool, Sqlite};
use tracing::debug;

/// Outcome of matching a candidate against the claims table.
#[derive(Debug, Clone)]
pub enum ClaimMatch {
    /// Identity number matched an existing claim exactly.
    ByIdentity(Claim),
    /// Name, village, and district matched a claim with no identity number
    /// on file.
    ByFallbackKey(Claim),
    /// No existing claim corresponds to this candidate.
    NoMatch,
}

/// Matches candidate records against stored claims.
pub struct ClaimMatcher {
    db: Pool<Sqlite>,
}

impl ClaimMatcher {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    /// Find the stored claim this candidate refers to, if any.
    ///
    /// **Decision order:**
    /// 1. Candidate has an identity number: exact match or [`ClaimMatch::NoMatch`]
    /// 2. Candidate has name, village, and district: composite key match
    ///    against identity-less claims, case-insensitive
    /// 3. Otherwise: [`ClaimMatch::NoMatch`]
    pub async fn find_match(&self, candidate: &CandidateClaim) -> Result<ClaimMatch> {
        let aadhaar = candidate.aadhaar_no.trim();
        if !aadhaar.is_empty() {
            if let Some(claim) = claims::find_by_identity(&self.db, aadhaar).await? {
                debug!(
                    claim_id = %claim.claim_id,
                    "Candidate matched existing claim by identity number"
                );
                return Ok(ClaimMatch::ByIdentity(claim));
            }
            debug!("Identity number not on file, candidate is a new claim");
            return Ok(ClaimMatch::NoMatch);
        }

        let name = candidate.claimant_name.trim();
        let village = candidate.village.trim();
        let district = candidate.district.trim();
        if name.is_empty() || village.is_empty() || district.is_empty() {
            debug!("Candidate has no identity number and an incomplete fallback key");
            return Ok(ClaimMatch::NoMatch);
        }

        if let Some(claim) = claims::find_by_fallback_key(&self.db, name, village, district).await?
        {
            debug!(
                claim_id = %claim.claim_id,
                claimant_name = name,
                "Candidate matched existing claim by fallback key"
            );
            return Ok(ClaimMatch::ByFallbackKey(claim));
        }

        Ok(ClaimMatch::NoMatch)
    }
}
