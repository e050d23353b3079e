//! Replay/rate guard.
//!
//! Per-subject sliding window over check-in attempts. The guard exists to
//! stop brute-force token guessing, not to be a precise limiter, so it fails
//! open: if its own state is unusable (poisoned lock) the attempt is allowed
//! and a warning logged rather than blocking legitimate attendance.

use rollcall_types::{RejectReason, SubjectId, Timestamp};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::warn;

/// Sliding-window attempt limiter keyed by subject.
pub struct ReplayGuard {
    window_secs: u64,
    max_attempts: u32,
    attempts: Mutex<HashMap<SubjectId, Vec<Timestamp>>>,
}

impl ReplayGuard {
    pub fn new(window_secs: u64, max_attempts: u32) -> Self {
        Self {
            window_secs,
            max_attempts,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Record one attempt by `subject` at `now`.
    ///
    /// Entries older than the window are pruned first; if the pruned list is
    /// already at the cap the attempt is rejected with a retry hint and *not*
    /// recorded (a limited attempt never extends its own lockout).
    pub fn check(&self, subject: SubjectId, now: Timestamp) -> Result<(), RejectReason> {
        let mut attempts = match self.attempts.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                // Fail open: recover the map rather than deny attendance.
                warn!(%subject, "replay guard lock poisoned, failing open");
                poisoned.into_inner()
            }
        };

        let list = attempts.entry(subject).or_default();
        list.retain(|at| at.elapsed_since(now) < self.window_secs);

        if list.len() >= self.max_attempts as usize {
            let oldest = list.iter().min().copied().unwrap_or(now);
            let retry_after_secs = self
                .window_secs
                .saturating_sub(oldest.elapsed_since(now))
                .max(1);
            return Err(RejectReason::RateLimited { retry_after_secs });
        }

        list.push(now);
        Ok(())
    }

    /// Drop subjects whose whole history has aged out. Keeps the map bounded
    /// across long-running processes; call opportunistically.
    pub fn prune(&self, now: Timestamp) {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.retain(|_, list| {
                list.retain(|at| at.elapsed_since(now) < self.window_secs);
                !list.is_empty()
            });
        }
    }

    /// Number of subjects currently tracked, pruned or not.
    pub fn tracked_subjects(&self) -> usize {
        self.attempts.lock().map(|map| map.len()).unwrap_or(0)
    }

    /// Attempts currently on record for a subject (test introspection).
    pub fn attempt_count(&self, subject: SubjectId, now: Timestamp) -> usize {
        self.attempts
            .lock()
            .map(|map| {
                map.get(&subject)
                    .map(|list| {
                        list.iter()
                            .filter(|at| at.elapsed_since(now) < self.window_secs)
                            .count()
                    })
                    .unwrap_or(0)
            })
            .unwrap_or(0)
    }
}
