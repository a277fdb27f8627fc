//! Completion signal: a one-shot, level-triggered gate shared by every
//! caller waiting on the same in-flight key.

use crate::error::Error;
use std::sync::Arc;
use tokio::sync::watch;

/// Terminal state of a signal.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The resource was persisted (or was already there).
    Succeeded,
    /// Generation or persistence failed. Every waiter sees the same cause.
    Failed(Arc<Error>),
    /// The task was dropped before it resolved (worker crash, queue dropped).
    Abandoned,
}

/// Single-use completion signal.
///
/// Backed by a `watch` channel so that waiters arriving after resolution
/// observe the stored outcome instead of waiting for a wakeup.
#[derive(Debug)]
pub struct Signal {
    state: watch::Sender<Option<Outcome>>,
}

impl Signal {
    pub fn new() -> Self {
        let (state, _) = watch::channel(None);
        Self { state }
    }

    /// Wait until the signal resolves and return its outcome.
    pub async fn wait(&self) -> Outcome {
        let mut rx = self.state.subscribe();
        match rx.wait_for(Option::is_some).await {
            Ok(state) => match &*state {
                Some(outcome) => outcome.clone(),
                None => Outcome::Abandoned,
            },
            // Unreachable while `self` owns the sender.
            Err(_) => Outcome::Abandoned,
        }
    }

    pub fn resolve_ok(&self) -> bool {
        self.settle(Outcome::Succeeded)
    }

    pub fn resolve_error(&self, cause: Error) -> bool {
        self.settle(Outcome::Failed(Arc::new(cause)))
    }

    /// Move out of the pending state. Returns false if already resolved;
    /// the first outcome wins.
    pub(crate) fn settle(&self, outcome: Outcome) -> bool {
        self.state.send_if_modified(|state| {
            if state.is_none() {
                *state = Some(outcome);
                true
            } else {
                false
            }
        })
    }

    pub fn is_resolved(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// The captured failure, if the signal resolved with one.
    pub fn is_error(&self) -> Option<Arc<Error>> {
        match &*self.state.borrow() {
            Some(Outcome::Failed(cause)) => Some(Arc::clone(cause)),
            _ => None,
        }
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.state.borrow().clone()
    }
}

impl Default for Signal {
    fn default() -> Self {
        Self::new()
    }
}
