//! Core data model.
//!
//! Three resources are generated on demand: the meanings of a word, an
//! illustration per meaning and a pronunciation per rendered word.

pub mod media;
pub mod meaning;

use serde::{Deserialize, Serialize};

/// Amounts reported for one generation, recorded in the generation ledger.
///
/// Units depend on the request type: characters for text, pixels per side
/// for images, seconds for sound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub amount_in: i64,
    pub amount_out: i64,
}

/// A row of the generation ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationLog {
    /// "translation", "illustration" or "sound".
    pub request_type: String,
    pub request_data: String,
    pub response_data: String,
    pub usage: Usage,
}
