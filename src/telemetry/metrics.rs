//! Metric instrument factories for klang-rs.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"klang-rs"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for klang-rs instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("klang-rs")
}

/// Counter: materialize requests.
/// Labels: `kind`, `result` ("hit" | "joined" | "enqueued" | "saturated").
pub fn broker_requests() -> Counter<u64> {
    meter()
        .u64_counter("klang.broker.requests")
        .with_description("Number of materialize requests by how they were served")
        .build()
}

/// Counter: resolved generation tasks.
/// Labels: `kind`, `outcome` ("generated" | "already_stored" | "failed").
pub fn generation_outcomes() -> Counter<u64> {
    meter()
        .u64_counter("klang.generation.outcomes")
        .with_description("Number of generation tasks resolved by the workers")
        .build()
}

/// Histogram: time from dequeue to resolution in milliseconds.
/// Labels: `kind`.
pub fn generation_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("klang.generation.duration_ms")
        .with_description("Generation task duration in milliseconds")
        .with_unit("ms")
        .build()
}

/// Counter: worker loops restarted after a crash.
/// Labels: `kind`.
pub fn worker_restarts() -> Counter<u64> {
    meter()
        .u64_counter("klang.worker.restarts")
        .with_description("Number of worker loop restarts")
        .build()
}

/// Counter: amounts billed by generation providers.
/// Labels: `request_type`, `direction` ("input" | "output").
pub fn llm_usage() -> Counter<u64> {
    meter()
        .u64_counter("klang.llm.usage")
        .with_description("Generation provider usage (tokens, pixels or seconds)")
        .build()
}
