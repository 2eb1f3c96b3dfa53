//! Verification resolver behavior against a scripted row source: matching
//! rules, tri-state degradation, range short-circuiting, and cache policy.

use async_trait::async_trait;
use gatedesk::sheets::StoreError;
use gatedesk::verify::{
    MemberCategory, RowSource, VerificationOutcome, Verifier, REASON_NOT_FOUND,
    REASON_STORE_ERROR, REASON_UNDER_REVIEW,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Scripted row source: fixed rows per range, a global failure switch, and
/// a fetch counter per range.
#[derive(Default)]
struct MockSource {
    rows: HashMap<String, Vec<Vec<String>>>,
    failing: Mutex<bool>,
    fetches: Mutex<HashMap<String, usize>>,
    total_fetches: AtomicUsize,
}

impl MockSource {
    fn with_range(mut self, range: &str, rows: &[&[&str]]) -> Self {
        self.rows.insert(
            range.to_string(),
            rows.iter()
                .map(|r| r.iter().map(|c| (*c).to_string()).collect())
                .collect(),
        );
        self
    }

    fn set_failing(&self, failing: bool) {
        *self.failing.lock().expect("lock") = failing;
    }

    fn fetch_count(&self, range: &str) -> usize {
        self.fetches
            .lock()
            .expect("lock")
            .get(range)
            .copied()
            .unwrap_or(0)
    }

    fn total(&self) -> usize {
        self.total_fetches.load(Ordering::SeqCst)
    }
}

/// Shared handle to the mock, so tests keep access to the counters after
/// handing the source to the verifier.
struct SharedSource(Arc<MockSource>);

#[async_trait]
impl RowSource for SharedSource {
    async fn fetch_rows(&self, range: &str) -> Result<Vec<Vec<String>>, StoreError> {
        *self
            .0
            .fetches
            .lock()
            .expect("lock")
            .entry(range.to_string())
            .or_insert(0) += 1;
        self.0.total_fetches.fetch_add(1, Ordering::SeqCst);

        if *self.0.failing.lock().expect("lock") {
            return Err(StoreError::Status(
                reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            ));
        }
        Ok(self.0.rows.get(range).cloned().unwrap_or_default())
    }
}

fn verifier_over(source: Arc<MockSource>, new: &[&str], old: &[&str]) -> Verifier<SharedSource> {
    Verifier::new(
        Some(SharedSource(source)),
        new.iter().map(|r| (*r).to_string()).collect(),
        old.iter().map(|r| (*r).to_string()).collect(),
    )
}

#[tokio::test]
async fn resolve_matches_case_and_at_insensitively() {
    let source = Arc::new(MockSource::default().with_range(
        "Sheet1!A:Q",
        &[&["@Alice", "Verified", "docs complete"]],
    ));
    let verifier = verifier_over(source, &["Sheet1!A:Q"], &[]);

    for query in ["alice", "ALICE", "@Alice", "  @alice  "] {
        let outcome = verifier.resolve(query, MemberCategory::NewMember).await;
        assert_eq!(
            outcome,
            VerificationOutcome::Verified {
                reason: "docs complete".to_string()
            },
            "query {query:?} should match the stored row"
        );
    }
}

#[tokio::test]
async fn blank_status_resolves_to_under_review() {
    let source = Arc::new(
        MockSource::default().with_range("Sheet1!A:Q", &[&["bob", "", "ignored note"]]),
    );
    let verifier = verifier_over(source, &["Sheet1!A:Q"], &[]);

    assert_eq!(
        verifier.resolve("bob", MemberCategory::NewMember).await,
        VerificationOutcome::Pending {
            reason: REASON_UNDER_REVIEW.to_string()
        }
    );
}

#[tokio::test]
async fn non_verified_status_resolves_to_rejected_with_reason() {
    let source = Arc::new(MockSource::default().with_range(
        "Sheet1!A:Q",
        &[&["carol", "DECLINED", "photo mismatch"]],
    ));
    let verifier = verifier_over(source, &["Sheet1!A:Q"], &[]);

    assert_eq!(
        verifier.resolve("carol", MemberCategory::NewMember).await,
        VerificationOutcome::Rejected {
            reason: "photo mismatch".to_string()
        }
    );
}

#[tokio::test]
async fn absent_handle_resolves_to_not_found_rejection() {
    let source = Arc::new(MockSource::default().with_range("Sheet1!A:Q", &[&["alice", "VERIFIED"]]));
    let verifier = verifier_over(source, &["Sheet1!A:Q"], &[]);

    assert_eq!(
        verifier.resolve("nobody", MemberCategory::NewMember).await,
        VerificationOutcome::Rejected {
            reason: REASON_NOT_FOUND.to_string()
        }
    );
}

#[tokio::test]
async fn unreachable_store_degrades_to_pending() {
    let source = Arc::new(MockSource::default().with_range("Sheet1!A:Q", &[]));
    source.set_failing(true);
    let verifier = verifier_over(source, &["Sheet1!A:Q"], &[]);

    assert_eq!(
        verifier.resolve("alice", MemberCategory::NewMember).await,
        VerificationOutcome::Pending {
            reason: REASON_STORE_ERROR.to_string()
        }
    );
}

#[tokio::test]
async fn range_scan_short_circuits_on_match() {
    let source = Arc::new(
        MockSource::default()
            .with_range("Sheet1!A:Q", &[&["alice", "VERIFIED", "ok"]])
            .with_range("Sheet2!A:D", &[&["alice", "DECLINED", "stale row"]]),
    );
    let verifier = verifier_over(source.clone(), &["Sheet1!A:Q", "Sheet2!A:D"], &[]);

    let outcome = verifier.resolve("alice", MemberCategory::NewMember).await;
    assert!(matches!(outcome, VerificationOutcome::Verified { .. }));

    // The earlier range satisfied the lookup; the later one is untouched
    assert_eq!(source.fetch_count("Sheet1!A:Q"), 1);
    assert_eq!(source.fetch_count("Sheet2!A:D"), 0);
}

#[tokio::test]
async fn later_ranges_are_consulted_when_earlier_miss() {
    let source = Arc::new(
        MockSource::default()
            .with_range("Sheet1!A:Q", &[&["someone_else", "VERIFIED", "ok"]])
            .with_range("Sheet2!A:D", &[&["dave", "VERIFIED", "legacy import"]]),
    );
    let verifier = verifier_over(source.clone(), &["Sheet1!A:Q", "Sheet2!A:D"], &[]);

    let outcome = verifier.resolve("dave", MemberCategory::NewMember).await;
    assert_eq!(
        outcome,
        VerificationOutcome::Verified {
            reason: "legacy import".to_string()
        }
    );
    assert_eq!(source.fetch_count("Sheet1!A:Q"), 1);
    assert_eq!(source.fetch_count("Sheet2!A:D"), 1);
}

#[tokio::test]
async fn decided_outcomes_are_served_from_cache() {
    let source = Arc::new(
        MockSource::default().with_range("Sheet1!A:Q", &[&["alice", "VERIFIED", "ok"]]),
    );
    let verifier = verifier_over(source.clone(), &["Sheet1!A:Q"], &[]);

    let first = verifier.resolve("alice", MemberCategory::NewMember).await;
    let second = verifier.resolve("@ALICE", MemberCategory::NewMember).await;
    assert_eq!(first, second);

    // Second call hits the cache under the normalized key
    assert_eq!(source.fetch_count("Sheet1!A:Q"), 1);
}

#[tokio::test]
async fn error_outcomes_are_never_cached() {
    let source = Arc::new(
        MockSource::default().with_range("Sheet1!A:Q", &[&["alice", "VERIFIED", "ok"]]),
    );
    let verifier = verifier_over(source.clone(), &["Sheet1!A:Q"], &[]);

    source.set_failing(true);
    let degraded = verifier.resolve("alice", MemberCategory::NewMember).await;
    assert_eq!(
        degraded,
        VerificationOutcome::Pending {
            reason: REASON_STORE_ERROR.to_string()
        }
    );

    // Store recovers; the next resolve must refetch instead of replaying
    // the failure
    source.set_failing(false);
    let recovered = verifier.resolve("alice", MemberCategory::NewMember).await;
    assert_eq!(
        recovered,
        VerificationOutcome::Verified {
            reason: "ok".to_string()
        }
    );
    assert_eq!(source.total(), 2);
}

#[tokio::test]
async fn categories_resolve_against_their_own_ranges() {
    let source = Arc::new(
        MockSource::default()
            .with_range("Sheet1!A:Q", &[&["erin", "VERIFIED", "new intake"]])
            .with_range("Sheet3!A:D", &[&["erin", "DECLINED", "lapsed"]]),
    );
    let verifier = verifier_over(source, &["Sheet1!A:Q"], &["Sheet3!A:D"]);

    assert!(matches!(
        verifier.resolve("erin", MemberCategory::NewMember).await,
        VerificationOutcome::Verified { .. }
    ));
    assert!(matches!(
        verifier.resolve("erin", MemberCategory::OldMember).await,
        VerificationOutcome::Rejected { .. }
    ));
}
