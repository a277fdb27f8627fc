//! Generation task span helpers.

use tracing::Span;
use uuid::Uuid;

/// Start a span for one dequeued generation task.
///
/// The `task.outcome` field is declared empty and is filled by
/// [`record_outcome`].
pub fn start_generation_span(kind: &str, key: &str, task_id: &Uuid) -> Span {
    tracing::info_span!(
        "generation",
        "task.kind" = kind,
        "task.key" = key,
        "task.id" = %task_id,
        "task.outcome" = tracing::field::Empty,
    )
}

/// Record how the task resolved.
pub fn record_outcome(span: &Span, outcome: &str) {
    span.record("task.outcome", outcome);
}
