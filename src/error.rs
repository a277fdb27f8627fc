//! Error types for klang-rs.

use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid {kind} key {key:?}: {reason}")]
    InvalidKey {
        kind: &'static str,
        key: String,
        reason: &'static str,
    },

    #[error("backend failure: {0}")]
    Backend(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store failure: {0}")]
    Store(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{kind} queue is saturated ({capacity} tasks pending)")]
    QueueSaturated { kind: &'static str, capacity: usize },

    #[error("{kind} generation failed for {key}: {cause}")]
    GenerationFailed {
        kind: &'static str,
        key: String,
        #[source]
        cause: Arc<Error>,
    },

    #[error("{kind} generation for {key} was abandoned before it resolved")]
    Abandoned { kind: &'static str, key: String },

    #[error("{kind} generation for {key} reported success but the store has no record")]
    InconsistentState { kind: &'static str, key: String },

    #[error("{0} worker is already running")]
    AlreadyRunning(&'static str),

    #[error("{0} worker has stopped")]
    WorkerStopped(&'static str),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// The external generation call failed or returned something unusable.
    pub fn is_backend_failure(&self) -> bool {
        match self {
            Error::Backend(_) | Error::Http(_) => true,
            Error::GenerationFailed { cause, .. } => cause.is_backend_failure(),
            _ => false,
        }
    }

    /// The persistence layer failed.
    pub fn is_store_failure(&self) -> bool {
        match self {
            Error::Store(_) | Error::Database(_) | Error::Io(_) => true,
            Error::GenerationFailed { cause, .. } => cause.is_store_failure(),
            _ => false,
        }
    }

    /// Backpressure: the caller should retry later.
    pub fn is_retry_later(&self) -> bool {
        matches!(self, Error::QueueSaturated { .. } | Error::Abandoned { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
