//! Generation broker: single-flight, queued, supervised generation per resource kind.

pub mod broker;
pub(crate) mod inflight;
pub mod kind;
pub mod offload;
pub mod pipeline;
pub mod signal;
pub mod supervisor;

pub use broker::{Broker, BrokerStats, KindStats, PipelineParts};
pub use inflight::Task;
pub use kind::{DurableStore, GenerationBackend, Illustrations, Meanings, ResourceKind, Sounds};
pub use offload::{CpuPool, JobHandle};
pub use pipeline::{Acquired, Pipeline};
pub use signal::{Outcome, Signal};

use std::time::Duration;

/// Default capacity of each kind's work queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Tunables shared by all pipelines.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Maximum tasks waiting per kind before callers get `QueueSaturated`.
    pub queue_capacity: usize,
    /// Pause before a crashed worker loop is restarted.
    pub restart_cooldown: Duration,
    /// Concurrent CPU-bound jobs (image decoding and writing).
    pub offload_workers: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            restart_cooldown: supervisor::DEFAULT_RESTART_COOLDOWN,
            offload_workers: offload::DEFAULT_OFFLOAD_WORKERS,
        }
    }
}
