//! Per-identity sliding-window rate limiter
//!
//! Guards the user -> operator relay path against flooding. Each identity
//! owns an ordered list of admission timestamps, pruned lazily on every
//! check; rejected attempts are never recorded, so a flooding user cannot
//! extend their own lockout.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// In-memory sliding-window rate limiter keyed by chat/user ID.
///
/// Cross-identity checks never interact; a single coarse lock is enough
/// because each check is pure in-memory bookkeeping.
pub struct RateLimiter {
    windows: Mutex<HashMap<i64, Vec<Instant>>>,
    max_events: usize,
    window: Duration,
}

impl RateLimiter {
    /// Creates a limiter admitting at most `max_events` per `window`.
    #[must_use]
    pub fn new(max_events: usize, window: Duration) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            max_events,
            window,
        }
    }

    /// Checks whether an event for `identity` is admitted right now.
    ///
    /// Admitted events are recorded; rejected ones are not.
    pub fn admit(&self, identity: i64) -> bool {
        self.admit_at(identity, Instant::now())
    }

    /// Clock-injectable variant of [`admit`](Self::admit).
    ///
    /// `now` must not go backwards between calls for the same identity;
    /// callers other than tests should use [`admit`](Self::admit).
    pub fn admit_at(&self, identity: i64, now: Instant) -> bool {
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let window = windows.entry(identity).or_default();
        window.retain(|t| now.duration_since(*t) < self.window);

        if window.len() < self.max_events {
            window.push(now);
            true
        } else {
            false
        }
    }

    /// Number of identities currently tracked (stale entries included).
    #[must_use]
    pub fn tracked_identities(&self) -> usize {
        self.windows
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}
