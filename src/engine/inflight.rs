//! Dedup registry and task descriptors.
//!
//! The registry maps every key that has outstanding work to its completion
//! signal. An entry lives exactly as long as its task is unresolved: the
//! task's [`Claim`] removes it in the same critical section that resolves
//! the signal, so a later request for the same key starts a fresh attempt.

use super::kind::ResourceKind;
use super::signal::{Outcome, Signal};
use crate::error::Error;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use uuid::Uuid;

/// Per-kind map of in-flight keys.
///
/// Uses a blocking mutex: no critical section awaits, and [`Claim`] must be
/// able to release its entry from `Drop`.
#[derive(Debug)]
pub(crate) struct InFlight<K> {
    entries: Mutex<HashMap<K, Arc<Signal>>>,
}

impl<K: Eq + Hash + Clone> InFlight<K> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, HashMap<K, Arc<Signal>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    /// Resolve `signal` and drop its entry, atomically with respect to
    /// [`super::pipeline::Pipeline::acquire_or_join`].
    fn settle(&self, key: &K, signal: &Arc<Signal>, outcome: Outcome) {
        let mut entries = self.lock();
        if entries.get(key).is_some_and(|s| Arc::ptr_eq(s, signal)) {
            entries.remove(key);
        }
        signal.settle(outcome);
    }
}

/// The owner's handle on an in-flight key. Exactly one exists per entry.
///
/// Dropping an unresolved claim resolves it as [`Outcome::Abandoned`], so
/// waiters never hang on a task that was lost to a worker crash.
#[derive(Debug)]
pub(crate) struct Claim<K: Eq + Hash + Clone> {
    key: K,
    signal: Arc<Signal>,
    inflight: Arc<InFlight<K>>,
}

impl<K: Eq + Hash + Clone> Claim<K> {
    pub(crate) fn new(key: K, signal: Arc<Signal>, inflight: Arc<InFlight<K>>) -> Self {
        Self {
            key,
            signal,
            inflight,
        }
    }

    fn settle(&self, outcome: Outcome) {
        self.inflight.settle(&self.key, &self.signal, outcome);
    }
}

impl<K: Eq + Hash + Clone> Drop for Claim<K> {
    fn drop(&mut self) {
        if !self.signal.is_resolved() {
            self.settle(Outcome::Abandoned);
        }
    }
}

/// Immutable descriptor for one generation, created by the first caller for a key.
pub struct Task<R: ResourceKind> {
    pub id: Uuid,
    pub input: R::Input,
    pub enqueued_at: Instant,
    claim: Claim<R::Key>,
}

impl<R: ResourceKind> Task<R> {
    pub(crate) fn new(input: R::Input, claim: Claim<R::Key>) -> Self {
        Self {
            id: Uuid::new_v4(),
            input,
            enqueued_at: Instant::now(),
            claim,
        }
    }

    pub fn key(&self) -> &R::Key {
        &self.claim.key
    }

    pub(crate) fn succeed(self) {
        self.claim.settle(Outcome::Succeeded);
    }

    pub(crate) fn fail(self, cause: Error) {
        self.claim.settle(Outcome::Failed(Arc::new(cause)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim(inflight: &Arc<InFlight<String>>, key: &str) -> (Claim<String>, Arc<Signal>) {
        let signal = Arc::new(Signal::new());
        inflight
            .lock()
            .insert(key.to_string(), Arc::clone(&signal));
        let claim = Claim::new(key.to_string(), Arc::clone(&signal), Arc::clone(inflight));
        (claim, signal)
    }

    #[test]
    fn settling_removes_the_entry() {
        let inflight = Arc::new(InFlight::new());
        let (claim, signal) = claim(&inflight, "Haus");
        assert_eq!(inflight.len(), 1);

        claim.settle(Outcome::Succeeded);
        assert_eq!(inflight.len(), 0);
        assert!(matches!(signal.outcome(), Some(Outcome::Succeeded)));
    }

    #[test]
    fn dropping_an_unresolved_claim_abandons_it() {
        let inflight = Arc::new(InFlight::new());
        let (claim, signal) = claim(&inflight, "Baum");

        drop(claim);
        assert_eq!(inflight.len(), 0);
        assert!(matches!(signal.outcome(), Some(Outcome::Abandoned)));
    }

    #[test]
    fn stale_claim_leaves_a_newer_entry_alone() {
        let inflight = Arc::new(InFlight::new());
        let (old, _) = claim(&inflight, "Hund");
        let newer = Arc::new(Signal::new());
        inflight
            .lock()
            .insert("Hund".to_string(), Arc::clone(&newer));

        drop(old);
        let entries = inflight.lock();
        assert!(Arc::ptr_eq(entries.get("Hund").unwrap(), &newer));
    }
}
