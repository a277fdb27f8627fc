//! Pronunciations from the Narakeet text-to-speech API.

use super::error_body;
use crate::engine::{GenerationBackend, Sounds};
use crate::error::{Error, Result};
use crate::model::media::GeneratedSound;
use crate::telemetry::genai::start_speech_span;
use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap};
use secrecy::{ExposeSecret, SecretString};
use tracing::{Instrument, debug, error};

pub const NARAKEET_BASE_URL: &str = "https://api.narakeet.com";
pub const DEFAULT_VOICES: [&str; 2] = ["Andreas", "Klara"];
pub const VOICE_SPEED: &str = "0.9";

const DURATION_HEADER: &str = "x-duration-seconds";

pub struct NarakeetSpeechBackend {
    http: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    voices: Vec<String>,
}

impl NarakeetSpeechBackend {
    pub fn new(http: reqwest::Client, api_key: SecretString) -> Self {
        Self {
            http,
            api_key,
            base_url: NARAKEET_BASE_URL.to_string(),
            voices: DEFAULT_VOICES.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Voices to pick from at random. An empty list keeps the current voices.
    pub fn with_voices(mut self, voices: Vec<String>) -> Self {
        if !voices.is_empty() {
            self.voices = voices;
        }
        self
    }

    fn pick_voice(&self) -> String {
        self.voices
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| DEFAULT_VOICES[0].to_string())
    }
}

#[async_trait]
impl GenerationBackend<Sounds> for NarakeetSpeechBackend {
    async fn generate(&self, text: &String) -> Result<GeneratedSound> {
        let voice = self.pick_voice();
        let span = start_speech_span(&voice);

        let response = self
            .http
            .post(format!("{}/text-to-speech/mp3", self.base_url))
            .query(&[("voice", voice.as_str()), ("voice-speed", VOICE_SPEED)])
            .header(ACCEPT, "application/octet-stream")
            .header(CONTENT_TYPE, "text/plain")
            .header("x-api-key", self.api_key.expose_secret())
            .body(text.clone())
            .send()
            .instrument(span.clone())
            .await?;

        if !response.status().is_success() {
            return Err(Error::Backend(format!(
                "speech synthesis for {text:?} failed with {}",
                error_body(response).await
            )));
        }

        let duration_secs = duration_from_headers(response.headers()).unwrap_or_else(|| {
            error!(
                %text,
                header = ?response.headers().get(DURATION_HEADER),
                "missing or malformed duration header"
            );
            0
        });
        span.record("duration_secs", duration_secs);

        let audio = response.bytes().instrument(span).await?.to_vec();
        if audio.is_empty() {
            return Err(Error::Backend(format!("speech synthesis for {text:?} returned no audio")));
        }
        debug!(%text, %voice, bytes = audio.len(), "sound synthesized");

        Ok(GeneratedSound {
            audio,
            duration_secs,
            voice,
        })
    }
}

fn duration_from_headers(headers: &HeaderMap) -> Option<i64> {
    headers
        .get(DURATION_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn duration_header_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(duration_from_headers(&headers), None);

        headers.insert(DURATION_HEADER, HeaderValue::from_static("2"));
        assert_eq!(duration_from_headers(&headers), Some(2));

        headers.insert(DURATION_HEADER, HeaderValue::from_static("1.5"));
        assert_eq!(duration_from_headers(&headers), None);
    }

    #[test]
    fn voice_comes_from_the_configured_list() {
        let backend = NarakeetSpeechBackend::new(reqwest::Client::new(), SecretString::from("k"))
            .with_voices(vec!["Klara".to_string()]);
        assert_eq!(backend.pick_voice(), "Klara");

        let backend = backend.with_voices(Vec::new());
        assert_eq!(backend.pick_voice(), "Klara");
    }
}
