//! Deduplicating measurement cache
//!
//! One map tracks every content id in one of two states: a measurement that
//! is still being computed, or a finished one. Callers asking for a content
//! id that is already being measured join the same computation instead of
//! starting their own.
//!
//! The computation runs as its own tokio task, so dropping every waiter does
//! not cancel it. When it finishes, its result is written back only if the
//! entry it was started for is still current. A `clear` or `invalidate`
//! issued while a measurement is running therefore discards that result, and
//! the next caller starts fresh.

use crate::error::{NormalizerError, Result};
use futures_util::future::{BoxFuture, FutureExt, Shared};
use soul_core::ContentId;
use soul_loudness::LoudnessMeasurement;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

type SharedOutcome = Shared<BoxFuture<'static, Result<LoudnessMeasurement>>>;

enum CacheEntry {
    InFlight { ticket: u64, outcome: SharedOutcome },
    Cached(LoudnessMeasurement),
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<ContentId, CacheEntry>,
    next_ticket: u64,
}

/// Content-keyed measurement cache with in-flight deduplication
///
/// Cloning is cheap and every clone shares the same entries.
#[derive(Clone, Default)]
pub struct MeasurementCache {
    state: Arc<Mutex<CacheState>>,
}

impl MeasurementCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Finished measurement for `id`, if any
    pub fn get(&self, id: &ContentId) -> Option<LoudnessMeasurement> {
        match self.lock().entries.get(id) {
            Some(CacheEntry::Cached(measurement)) => Some(*measurement),
            _ => None,
        }
    }

    /// Whether a measurement for `id` is currently running
    pub fn is_in_flight(&self, id: &ContentId) -> bool {
        matches!(self.lock().entries.get(id), Some(CacheEntry::InFlight { .. }))
    }

    /// Number of finished measurements
    pub fn len(&self) -> usize {
        self.lock()
            .entries
            .values()
            .filter(|entry| matches!(entry, CacheEntry::Cached(_)))
            .count()
    }

    /// Whether no finished measurement is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store a finished measurement computed elsewhere
    ///
    /// Replaces any entry for `id`. A computation still running for it
    /// loses its ticket, so it cannot overwrite this value.
    pub fn insert(&self, id: &ContentId, measurement: LoudnessMeasurement) {
        self.lock()
            .entries
            .insert(id.clone(), CacheEntry::Cached(measurement));
        debug!(content_id = %id, "Measurement recorded");
    }

    /// Drop every entry, finished or in flight
    pub fn clear(&self) {
        let mut state = self.lock();
        let dropped = state.entries.len();
        state.entries.clear();
        debug!(entries = dropped, "Measurement cache cleared");
    }

    /// Drop the entry for one content id
    ///
    /// Returns `true` if there was an entry.
    pub fn invalidate(&self, id: &ContentId) -> bool {
        let removed = self.lock().entries.remove(id).is_some();
        if removed {
            debug!(content_id = %id, "Measurement invalidated");
        }
        removed
    }

    /// Measurement for `id`, computing it with `compute` at most once
    ///
    /// - Finished entry: returned immediately, `compute` is not called
    /// - Running entry: the caller waits for that computation
    /// - No entry: `compute` is called once and its future is spawned
    ///
    /// A failed computation leaves no entry behind, so a later call retries.
    ///
    /// # Errors
    /// Returns whatever the computation failed with, or
    /// `NormalizerError::Task` if the task was lost.
    pub async fn measure<F, Fut>(&self, id: &ContentId, compute: F) -> Result<LoudnessMeasurement>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<LoudnessMeasurement>> + Send + 'static,
    {
        let outcome = {
            let mut state = self.lock();
            match state.entries.get(id) {
                Some(CacheEntry::Cached(measurement)) => {
                    debug!(content_id = %id, "Measurement cache hit");
                    return Ok(*measurement);
                }
                Some(CacheEntry::InFlight { outcome, .. }) => {
                    debug!(content_id = %id, "Joining in-flight measurement");
                    outcome.clone()
                }
                None => {
                    let ticket = state.next_ticket;
                    state.next_ticket = state.next_ticket.wrapping_add(1);

                    debug!(content_id = %id, ticket, "Starting measurement");
                    let outcome = self.spawn(id.clone(), ticket, compute());
                    state.entries.insert(
                        id.clone(),
                        CacheEntry::InFlight {
                            ticket,
                            outcome: outcome.clone(),
                        },
                    );
                    outcome
                }
            }
        };

        outcome.await
    }

    fn spawn<Fut>(&self, id: ContentId, ticket: u64, work: Fut) -> SharedOutcome
    where
        Fut: Future<Output = Result<LoudnessMeasurement>> + Send + 'static,
    {
        let task_state = Arc::clone(&self.state);
        let task_id = id.clone();
        let handle = tokio::spawn(async move {
            let result = match AssertUnwindSafe(work).catch_unwind().await {
                Ok(result) => result,
                Err(_) => Err(NormalizerError::Task("measurement panicked".to_string())),
            };
            settle(&task_state, &task_id, ticket, &result);
            result
        });

        let join_state = Arc::clone(&self.state);
        async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => {
                    let result = Err(NormalizerError::Task(e.to_string()));
                    settle(&join_state, &id, ticket, &result);
                    result
                }
            }
        }
        .boxed()
        .shared()
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        lock_state(&self.state)
    }
}

impl std::fmt::Debug for MeasurementCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        let in_flight = state
            .entries
            .values()
            .filter(|entry| matches!(entry, CacheEntry::InFlight { .. }))
            .count();
        f.debug_struct("MeasurementCache")
            .field("cached", &(state.entries.len() - in_flight))
            .field("in_flight", &in_flight)
            .finish()
    }
}

/// Write a finished computation back if its entry is still current
fn settle(
    state: &Mutex<CacheState>,
    id: &ContentId,
    ticket: u64,
    result: &Result<LoudnessMeasurement>,
) {
    let mut state = lock_state(state);

    let current = matches!(
        state.entries.get(id),
        Some(CacheEntry::InFlight { ticket: t, .. }) if *t == ticket
    );
    if !current {
        debug!(content_id = %id, ticket, "Discarding result of invalidated measurement");
        return;
    }

    match result {
        Ok(measurement) => {
            state.entries.insert(id.clone(), CacheEntry::Cached(*measurement));
        }
        Err(e) => {
            warn!(content_id = %id, error = %e, "Measurement failed, not cached");
            state.entries.remove(id);
        }
    }
}

fn lock_state(state: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
