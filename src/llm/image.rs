//! Illustrations from the OpenAI images API.

use super::error_body;
use crate::engine::{GenerationBackend, Illustrations};
use crate::error::{Error, Result};
use crate::model::Usage;
use crate::model::media::{GeneratedImage, IllustrationPrompt};
use crate::telemetry::genai::start_image_span;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{Instrument, debug};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const IMAGE_SIZE: &str = "1024x1024";

/// Ledger units for one image: its edge length in pixels.
const IMAGE_UNITS: i64 = 1024;

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: String,
    size: &'a str,
    quality: &'a str,
    response_format: &'a str,
    n: u8,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    b64_json: Option<String>,
}

pub struct OpenAiImageBackend {
    http: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl OpenAiImageBackend {
    pub fn new(http: reqwest::Client, api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            http,
            api_key,
            model: model.into(),
            base_url: OPENAI_BASE_URL.to_string(),
        }
    }

    /// Point the backend at another API root (a proxy, or a mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

pub fn illustration_prompt(prompt: &IllustrationPrompt) -> String {
    format!(
        "Draw illustration to concept \"{}. {}\" without any words on a picture, \
         just the illustration with a relatively simple and straightforward style",
        prompt.word, prompt.description,
    )
}

#[async_trait]
impl GenerationBackend<Illustrations> for OpenAiImageBackend {
    async fn generate(&self, prompt: &IllustrationPrompt) -> Result<GeneratedImage> {
        let request = ImageRequest {
            model: &self.model,
            prompt: illustration_prompt(prompt),
            size: IMAGE_SIZE,
            quality: "standard",
            response_format: "b64_json",
            n: 1,
        };

        let span = start_image_span(&self.model, IMAGE_SIZE);
        let response = self
            .http
            .post(format!("{}/images/generations", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .instrument(span)
            .await?;

        if !response.status().is_success() {
            return Err(Error::Backend(format!(
                "image generation for {:?} failed with {}",
                prompt.word,
                error_body(response).await
            )));
        }

        let body: ImageResponse = response.json().await?;
        let b64_png = body
            .data
            .into_iter()
            .next()
            .and_then(|d| d.b64_json)
            .ok_or_else(|| Error::Backend("image response carried no b64_json payload".to_string()))?;
        debug!(word = %prompt.word, payload = b64_png.len(), "image generated");

        Ok(GeneratedImage {
            b64_png,
            prompt: prompt.clone(),
            usage: Usage {
                amount_in: 0,
                amount_out: IMAGE_UNITS,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_word_and_description() {
        let prompt = illustration_prompt(&IllustrationPrompt {
            word: "house".to_string(),
            description: "a building for living".to_string(),
        });
        assert!(prompt.starts_with("Draw illustration to concept \"house. a building for living\""));
        assert!(prompt.contains("without any words"));
    }

    #[test]
    fn request_asks_for_a_single_base64_image() {
        let request = ImageRequest {
            model: "dall-e-3",
            prompt: "p".to_string(),
            size: IMAGE_SIZE,
            quality: "standard",
            response_format: "b64_json",
            n: 1,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["size"], "1024x1024");
        assert_eq!(json["response_format"], "b64_json");
        assert_eq!(json["n"], 1);
    }
}
