//! Generation backends.
//!
//! Meanings come from a chat model driven through rig-core. Illustrations
//! and sounds are plain HTTP APIs called with reqwest.
//!
//! # Example
//! ```no_run
//! use klang_rs::llm::{openai_client, meaning::LlmMeaningBackend};
//! use secrecy::SecretString;
//!
//! let key = SecretString::from("sk-...");
//! let client = openai_client(&key).expect("failed to create OpenAI client");
//! let backend = LlmMeaningBackend::from_client(&client, "gpt-4o");
//! ```

pub mod image;
pub mod meaning;
pub mod speech;

pub use image::OpenAiImageBackend;
pub use meaning::LlmMeaningBackend;
pub use speech::NarakeetSpeechBackend;

use crate::error::Result;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

/// Context shared by every prompt sent to a model.
pub const SYSTEM_CONTEXT: &str =
    "You are generating a content for a high quality word learning website.";

/// Upper bound for one provider call. Image generation is the slow one.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Create an OpenAI client from a secret API key.
///
/// # Errors
/// Returns an error if the underlying HTTP client cannot be constructed.
pub fn openai_client(
    api_key: &SecretString,
) -> std::result::Result<rig::providers::openai::Client, rig::http_client::Error> {
    rig::providers::openai::Client::new(api_key.expose_secret())
}

/// HTTP client for the image and speech providers.
pub fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("klang-rs/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Read an error response body for the log, without failing on it.
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    let status = response.status();
    match response.text().await {
        Ok(body) if !body.is_empty() => format!("{status}: {body}"),
        _ => status.to_string(),
    }
}
