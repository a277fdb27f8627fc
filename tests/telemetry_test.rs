//! Integration tests for telemetry initialization and span helpers.

use klang_rs::model::Usage;
use klang_rs::telemetry::{TelemetryConfig, genai, init_telemetry, task};
use uuid::Uuid;

#[test]
fn telemetry_initializes_without_endpoint() {
    // A global subscriber can only be set once per process; another test
    // may have won the race, which is fine here.
    let config = TelemetryConfig {
        endpoint: None,
        service_name: "klang-test".to_string(),
        log_level: "debug".to_string(),
    };
    if let Ok(guard) = init_telemetry(config) {
        assert!(!guard.is_exporting());
        guard.force_flush();
    }
}

#[test]
fn genai_spans_accept_usage() {
    let span = genai::start_chat_span("gpt-4o", "openai");
    genai::record_usage(
        &span,
        Usage {
            amount_in: 120,
            amount_out: 480,
        },
    );

    let _image = genai::start_image_span("dall-e-3", "1024x1024");
    let speech = genai::start_speech_span("Klara");
    speech.record("duration_secs", 2);
}

#[test]
fn generation_span_records_outcome() {
    let span = task::start_generation_span("meanings", "Haus", &Uuid::new_v4());
    task::record_outcome(&span, "generated");
}

#[test]
fn metric_instruments_build_without_a_provider() {
    use opentelemetry::KeyValue;
    use klang_rs::telemetry::metrics;

    metrics::broker_requests().add(1, &[KeyValue::new("kind", "sound")]);
    metrics::generation_outcomes().add(1, &[KeyValue::new("outcome", "failed")]);
    metrics::generation_duration_ms().record(12.5, &[]);
    metrics::worker_restarts().add(1, &[]);
    metrics::llm_usage().add(1024, &[KeyValue::new("direction", "output")]);
}
