//! One generation pipeline: dedup registry, bounded queue and single worker
//! for a resource kind.

use super::BrokerConfig;
use super::inflight::{Claim, InFlight, Task};
use super::kind::{DurableStore, GenerationBackend, ResourceKind};
use super::signal::{Outcome, Signal};
use super::supervisor;
use crate::error::{Error, Result};
use crate::telemetry::metrics;
use crate::telemetry::task::{record_outcome, start_generation_span};
use opentelemetry::KeyValue;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, warn};

/// Result of [`Pipeline::acquire_or_join`].
#[derive(Debug, Clone)]
pub struct Acquired {
    pub signal: Arc<Signal>,
    /// True if this call created the task; false if it joined one in flight.
    pub is_new_owner: bool,
}

pub struct Pipeline<R: ResourceKind> {
    worker: Worker<R>,
    inflight: Arc<InFlight<R::Key>>,
    sender: mpsc::Sender<Task<R>>,
    capacity: usize,
    restart_cooldown: Duration,
    handle: Mutex<Option<JoinHandle<()>>>,
    shutdown: watch::Sender<bool>,
}

impl<R: ResourceKind> Pipeline<R> {
    pub fn new(
        store: Arc<dyn DurableStore<R>>,
        backend: Arc<dyn GenerationBackend<R>>,
        config: &BrokerConfig,
    ) -> Self {
        let capacity = config.queue_capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        let (shutdown, _) = watch::channel(false);
        Self {
            worker: Worker {
                store,
                backend,
                receiver: Arc::new(tokio::sync::Mutex::new(receiver)),
            },
            inflight: Arc::new(InFlight::new()),
            sender,
            capacity,
            restart_cooldown: config.restart_cooldown,
            handle: Mutex::new(None),
            shutdown,
        }
    }

    /// Return the resource for `key`, generating it at most once no matter
    /// how many callers ask concurrently.
    ///
    /// `input` is only called if this call ends up creating the task.
    pub async fn materialize<F>(&self, key: R::Key, input: F) -> Result<R::Record>
    where
        F: FnOnce() -> R::Input + Send,
    {
        if let Some(record) = self.worker.store.lookup(&key).await? {
            record_request(R::NAME, "hit");
            return Ok(record);
        }

        let acquired = self.acquire_or_join(key.clone(), input)?;
        record_request(
            R::NAME,
            if acquired.is_new_owner {
                "enqueued"
            } else {
                "joined"
            },
        );

        match acquired.signal.wait().await {
            Outcome::Succeeded => {
                self.worker
                    .store
                    .lookup(&key)
                    .await?
                    .ok_or_else(|| Error::InconsistentState {
                        kind: R::NAME,
                        key: key.to_string(),
                    })
            }
            Outcome::Failed(cause) => Err(Error::GenerationFailed {
                kind: R::NAME,
                key: key.to_string(),
                cause,
            }),
            Outcome::Abandoned => Err(Error::Abandoned {
                kind: R::NAME,
                key: key.to_string(),
            }),
        }
    }

    /// Join the in-flight task for `key`, or create and enqueue one.
    ///
    /// Registry insertion and queue push happen under one lock, so a burst of
    /// callers for the same key enqueues exactly one task. A full queue fails
    /// with [`Error::QueueSaturated`] and leaves no entry behind.
    pub fn acquire_or_join<F>(&self, key: R::Key, input: F) -> Result<Acquired>
    where
        F: FnOnce() -> R::Input,
    {
        let mut entries = self.inflight.lock();
        if let Some(signal) = entries.get(&key) {
            return Ok(Acquired {
                signal: Arc::clone(signal),
                is_new_owner: false,
            });
        }
        if *self.shutdown.borrow() {
            drop(entries);
            record_request(R::NAME, "stopped");
            return Err(Error::WorkerStopped(R::NAME));
        }

        let signal = Arc::new(Signal::new());
        let claim = Claim::new(key.clone(), Arc::clone(&signal), Arc::clone(&self.inflight));
        let task = Task::new(input(), claim);
        let task_id = task.id;

        match self.sender.try_send(task) {
            Ok(()) => {
                entries.insert(key.clone(), Arc::clone(&signal));
                drop(entries);
                info!(kind = R::NAME, %key, %task_id, "queued generation task");
                Ok(Acquired {
                    signal,
                    is_new_owner: true,
                })
            }
            Err(rejected) => {
                // The rejected task's claim takes the registry lock when it drops.
                drop(entries);
                let (err, result) = match &rejected {
                    TrySendError::Full(_) => (
                        Error::QueueSaturated {
                            kind: R::NAME,
                            capacity: self.capacity,
                        },
                        "saturated",
                    ),
                    TrySendError::Closed(_) => (Error::WorkerStopped(R::NAME), "stopped"),
                };
                drop(rejected);
                record_request(R::NAME, result);
                warn!(kind = R::NAME, %key, "could not queue generation task: {err}");
                Err(err)
            }
        }
    }

    /// Spawn the supervised worker loop.
    ///
    /// # Errors
    /// [`Error::AlreadyRunning`] if the worker was already started.
    pub fn start(&self) -> Result<()> {
        let mut handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if handle.is_some() {
            return Err(Error::AlreadyRunning(R::NAME));
        }
        *handle = Some(tokio::spawn(supervisor::supervise(
            self.worker.clone(),
            self.restart_cooldown,
            self.shutdown.subscribe(),
        )));
        Ok(())
    }

    /// Ask the worker to stop once its current task is done.
    ///
    /// New keys are refused with [`Error::WorkerStopped`] from here on. Tasks
    /// still queued are dropped unprocessed and their waiters see
    /// [`Error::Abandoned`].
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
        // A running loop drains the queue itself. Without one (never started,
        // or between restarts) nothing else would.
        if let Ok(mut receiver) = self.worker.receiver.try_lock() {
            drain_abandoned::<R>(&mut receiver);
        }
    }

    /// Wait for the worker to stop. Returns immediately if it was never started.
    pub async fn join(&self) {
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(kind = R::NAME, "supervisor task failed: {e}");
            }
        }
    }

    /// Tasks waiting in the queue.
    pub fn queued(&self) -> usize {
        self.capacity - self.sender.capacity()
    }

    /// Keys with outstanding work (queued or running).
    pub fn in_flight(&self) -> usize {
        self.inflight.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

fn record_request(kind: &'static str, result: &'static str) {
    metrics::broker_requests().add(
        1,
        &[KeyValue::new("kind", kind), KeyValue::new("result", result)],
    );
}

/// Close the queue so later sends fail, then drop every buffered task. Each
/// dropped claim resolves its signal as abandoned.
fn drain_abandoned<R: ResourceKind>(receiver: &mut mpsc::Receiver<Task<R>>) {
    receiver.close();
    let mut abandoned = 0_usize;
    while let Ok(task) = receiver.try_recv() {
        drop(task);
        abandoned += 1;
    }
    if abandoned > 0 {
        warn!(kind = R::NAME, abandoned, "abandoned queued tasks on shutdown");
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// The sole consumer of a kind's queue.
///
/// The receiver sits behind an async mutex so a restarted loop picks up the
/// same queue; the lock is released when a crashed loop unwinds.
pub(crate) struct Worker<R: ResourceKind> {
    store: Arc<dyn DurableStore<R>>,
    backend: Arc<dyn GenerationBackend<R>>,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<Task<R>>>>,
}

impl<R: ResourceKind> Clone for Worker<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            backend: Arc::clone(&self.backend),
            receiver: Arc::clone(&self.receiver),
        }
    }
}

/// How a task was satisfied.
enum Fate {
    Generated,
    AlreadyStored,
}

impl<R: ResourceKind> Worker<R> {
    /// Process tasks in FIFO order until shutdown or the queue closes.
    pub(crate) async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut receiver = self.receiver.lock().await;
        info!(kind = R::NAME, "worker started");

        loop {
            let task = tokio::select! {
                biased;
                _ = shutdown.wait_for(|stop| *stop) => {
                    info!(kind = R::NAME, "worker shutting down");
                    drain_abandoned::<R>(&mut receiver);
                    return;
                }
                task = receiver.recv() => task,
            };

            let Some(task) = task else {
                info!(kind = R::NAME, "queue closed, worker exiting");
                return;
            };
            self.process(task).await;
        }
    }

    /// Close the queue and abandon whatever is still in it.
    pub(crate) async fn abandon_queued(&self) {
        let mut receiver = self.receiver.lock().await;
        drain_abandoned::<R>(&mut receiver);
    }

    /// Run one task to resolution. Errors are captured into the task's signal.
    async fn process(&self, task: Task<R>) {
        let key = task.key().to_string();
        let span = start_generation_span(R::NAME, &key, &task.id);
        let task_span = span.clone();

        async move {
            debug!(
                queued_ms = task.enqueued_at.elapsed().as_millis() as u64,
                "processing generation task"
            );
            let started = std::time::Instant::now();
            let result = self.generate(&task).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            let outcome = match result {
                Ok(Fate::Generated) => {
                    info!(duration_ms, "generated and persisted");
                    task.succeed();
                    "generated"
                }
                Ok(Fate::AlreadyStored) => {
                    info!("already stored, skipping generation");
                    task.succeed();
                    "already_stored"
                }
                Err(e) => {
                    error!(duration_ms, error = %e, "generation failed");
                    task.fail(e);
                    "failed"
                }
            };

            record_outcome(&task_span, outcome);
            metrics::generation_outcomes().add(
                1,
                &[
                    KeyValue::new("kind", R::NAME),
                    KeyValue::new("outcome", outcome),
                ],
            );
            metrics::generation_duration_ms()
                .record(duration_ms as f64, &[KeyValue::new("kind", R::NAME)]);
        }
        .instrument(span)
        .await
    }

    async fn generate(&self, task: &Task<R>) -> Result<Fate> {
        // Another process, or an earlier run of this one, may have produced it.
        if self.store.lookup(task.key()).await?.is_some() {
            return Ok(Fate::AlreadyStored);
        }
        let generated = self.backend.generate(&task.input).await?;
        self.store.persist(task.key(), generated).await?;
        Ok(Fate::Generated)
    }
}
