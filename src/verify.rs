//! Verification status resolution
//!
//! Resolves a member handle to a tri-state verification outcome by scanning
//! the configured record-store ranges in priority order. "Unknown" is a
//! first-class variant, never a nullable boolean: an unreachable store and a
//! rejected member must stay distinguishable at every call site.

use crate::config::{VERIFY_CACHE_MAX_ENTRIES, VERIFY_CACHE_TTL_SECS};
use crate::sheets::StoreError;
use async_trait::async_trait;
use moka::future::Cache;
use std::time::Duration;
use tracing::{debug, warn};

/// Membership category, determining which lookup ranges apply
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemberCategory {
    /// Applicant going through first-time admission
    NewMember,
    /// Returning member re-verifying
    OldMember,
}

impl MemberCategory {
    /// Short identifier used in callback data and logs
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::NewMember => "new",
            Self::OldMember => "old",
        }
    }

    /// Human-readable label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NewMember => "new member",
            Self::OldMember => "old member",
        }
    }
}

/// Result of resolving a handle against the record store.
///
/// `Pending` covers both "decision not made yet" and "store unavailable";
/// the reason string tells them apart for display, but callers must treat
/// either as "do not proceed, do not reject".
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// A decision row exists and the member is verified
    Verified {
        /// Free-text note from the decision row
        reason: String,
    },
    /// A decision row exists and the member is not verified, or no row exists
    Rejected {
        /// Free-text note from the decision row, or "not found"
        reason: String,
    },
    /// No decision yet, or the store could not be consulted
    Pending {
        /// Why the outcome is undecided
        reason: String,
    },
}

impl VerificationOutcome {
    /// The reason string attached to any variant
    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Self::Verified { reason } | Self::Rejected { reason } | Self::Pending { reason } => {
                reason
            }
        }
    }

    /// True for the `Pending` variants caused by store failure or absence.
    ///
    /// These are the outcomes that must not be cached, so a refresh tap
    /// retries immediately instead of replaying the failure.
    #[must_use]
    pub fn is_infrastructure_pending(&self) -> bool {
        matches!(
            self,
            Self::Pending { reason }
                if reason == REASON_STORE_ERROR || reason == REASON_NOT_CONFIGURED
        )
    }
}

/// Reason shown when the store is not configured at all
pub const REASON_NOT_CONFIGURED: &str = "Verification store is not configured";
/// Reason shown when a row exists but carries no decision
pub const REASON_UNDER_REVIEW: &str = "Under review";
/// Reason shown when no row matches the handle anywhere
pub const REASON_NOT_FOUND: &str = "Not found in database";
/// Reason shown when the store could not be reached or parsed
pub const REASON_STORE_ERROR: &str = "Error accessing database";
/// Reason substituted when a decision row has an empty note cell
pub const REASON_DEFAULT: &str = "No reason provided";

/// Status cell value that marks a member verified (case-insensitive)
const STATUS_VERIFIED: &str = "VERIFIED";

/// Abstract source of record rows, one ordered batch per named range.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Fetches all rows of `range` in sheet order.
    async fn fetch_rows(&self, range: &str) -> Result<Vec<Vec<String>>, StoreError>;
}

/// Normalizes a handle for comparison: trims, strips one leading `@`,
/// case-folds.
#[must_use]
pub fn normalize_handle(handle: &str) -> String {
    handle.trim().trim_start_matches('@').to_lowercase()
}

/// Reduces a matching record row to an outcome.
///
/// Row shape: `[handle, status, reason, ...]`; missing cells are treated
/// as blank.
fn outcome_from_row(row: &[String]) -> VerificationOutcome {
    let status = row.get(1).map(|s| s.trim()).unwrap_or_default();
    if status.is_empty() {
        return VerificationOutcome::Pending {
            reason: REASON_UNDER_REVIEW.to_string(),
        };
    }

    let reason = row
        .get(2)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .unwrap_or(REASON_DEFAULT)
        .to_string();

    if status.eq_ignore_ascii_case(STATUS_VERIFIED) {
        VerificationOutcome::Verified { reason }
    } else {
        VerificationOutcome::Rejected { reason }
    }
}

/// Resolves handles to verification outcomes against a row source.
///
/// An unconfigured verifier (`source: None`) answers immediately without
/// network access. Decided and under-review outcomes are cached briefly so
/// refresh-button taps do not hammer the store.
pub struct Verifier<S> {
    source: Option<S>,
    new_member_ranges: Vec<String>,
    old_member_ranges: Vec<String>,
    cache: Cache<(String, MemberCategory), VerificationOutcome>,
}

impl<S: RowSource> Verifier<S> {
    /// Creates a verifier over `source`, scanning the given ranges per
    /// category in declared order.
    #[must_use]
    pub fn new(
        source: Option<S>,
        new_member_ranges: Vec<String>,
        old_member_ranges: Vec<String>,
    ) -> Self {
        let cache = Cache::builder()
            .max_capacity(VERIFY_CACHE_MAX_ENTRIES)
            .time_to_live(Duration::from_secs(VERIFY_CACHE_TTL_SECS))
            .build();

        Self {
            source,
            new_member_ranges,
            old_member_ranges,
            cache,
        }
    }

    /// Whether a record store is configured at all
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.source.is_some()
    }

    fn ranges(&self, category: MemberCategory) -> &[String] {
        match category {
            MemberCategory::NewMember => &self.new_member_ranges,
            MemberCategory::OldMember => &self.old_member_ranges,
        }
    }

    /// Resolves `handle` within `category`.
    ///
    /// Never fails: store errors degrade to a `Pending` outcome. Safe to
    /// call repeatedly; reads have no side effects beyond the cache.
    pub async fn resolve(&self, handle: &str, category: MemberCategory) -> VerificationOutcome {
        let Some(source) = self.source.as_ref() else {
            return VerificationOutcome::Pending {
                reason: REASON_NOT_CONFIGURED.to_string(),
            };
        };

        let normalized = normalize_handle(handle);
        let key = (normalized.clone(), category);
        if let Some(cached) = self.cache.get(&key).await {
            debug!("Verification cache hit for {} ({})", normalized, category.slug());
            return cached;
        }

        let outcome = match scan_ranges(source, self.ranges(category), &normalized).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Verification store error for {}: {}", normalized, e);
                VerificationOutcome::Pending {
                    reason: REASON_STORE_ERROR.to_string(),
                }
            }
        };

        if !outcome.is_infrastructure_pending() {
            self.cache.insert(key, outcome.clone()).await;
        }
        outcome
    }
}

/// Scans `ranges` in order and stops at the first row whose normalized
/// handle cell equals `normalized`; later ranges are never fetched once a
/// match is found.
async fn scan_ranges<S: RowSource>(
    source: &S,
    ranges: &[String],
    normalized: &str,
) -> Result<VerificationOutcome, StoreError> {
    for range in ranges {
        let rows = source.fetch_rows(range).await?;
        for row in &rows {
            let Some(cell) = row.first() else {
                continue;
            };
            if normalize_handle(cell) == normalized {
                return Ok(outcome_from_row(row));
            }
        }
    }

    Ok(VerificationOutcome::Rejected {
        reason: REASON_NOT_FOUND.to_string(),
    })
}
