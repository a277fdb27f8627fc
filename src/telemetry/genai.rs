//! Spans around provider calls, named after the OTel GenAI conventions
//! (`gen_ai.operation.name`, `gen_ai.request.model`, `gen_ai.provider.name`,
//! `gen_ai.usage.*`).

use crate::model::Usage;
use tracing::Span;

/// Chat completion span. Usage is filled in by [`record_usage`].
pub fn start_chat_span(model: &str, provider: &str) -> Span {
    tracing::info_span!(
        "gen_ai.chat",
        "gen_ai.operation.name" = "chat",
        "gen_ai.request.model" = model,
        "gen_ai.provider.name" = provider,
        "gen_ai.usage.input_tokens" = tracing::field::Empty,
        "gen_ai.usage.output_tokens" = tracing::field::Empty,
    )
}

pub fn start_image_span(model: &str, size: &str) -> Span {
    tracing::info_span!(
        "gen_ai.image",
        "gen_ai.operation.name" = "image_generation",
        "gen_ai.request.model" = model,
        "gen_ai.provider.name" = "openai",
        "gen_ai.request.image_size" = size,
    )
}

/// Text-to-speech span. `duration_secs` is recorded once the provider
/// reports it.
pub fn start_speech_span(voice: &str) -> Span {
    tracing::info_span!(
        "gen_ai.speech",
        "gen_ai.operation.name" = "text_to_speech",
        "gen_ai.provider.name" = "narakeet",
        "gen_ai.request.voice" = voice,
        "duration_secs" = tracing::field::Empty,
    )
}

/// Record usage on a span from [`start_chat_span`].
pub fn record_usage(span: &Span, usage: Usage) {
    span.record("gen_ai.usage.input_tokens", usage.amount_in);
    span.record("gen_ai.usage.output_tokens", usage.amount_out);
}
