//! Illustration and sound types.

use crate::model::Usage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What to draw for one word meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IllustrationPrompt {
    /// The meaning's English translation.
    pub word: String,
    /// The English description of that meaning.
    pub description: String,
}

/// Image backend output: a base64-encoded PNG.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub b64_png: String,
    pub prompt: IllustrationPrompt,
    pub usage: Usage,
}

/// A stored illustration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Illustration {
    pub meaning_id: i64,
    pub path: PathBuf,
}

/// Speech backend output.
#[derive(Debug, Clone)]
pub struct GeneratedSound {
    pub audio: Vec<u8>,
    /// Duration hint reported by the provider; 0 when it was missing or malformed.
    pub duration_secs: i64,
    pub voice: String,
}

/// A stored pronunciation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sound {
    pub text: String,
    pub path: PathBuf,
}
