//! Word meanings and their translations.

use crate::error::{Error, Result};
use crate::model::Usage;
use serde::{Deserialize, Serialize};

/// Ratings assigned to generated meanings, in the order the model returned them.
/// Only as many meanings as there are ratings are kept.
pub const RATINGS: [i32; 3] = [100_000, 50_000, 10_000];

// ---------------------------------------------------------------------------
// Part of speech / gender
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartOfSpeech {
    Noun,
    Verb,
    Adjective,
    Adverb,
    Other,
}

impl std::fmt::Display for PartOfSpeech {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PartOfSpeech::Noun => "noun",
            PartOfSpeech::Verb => "verb",
            PartOfSpeech::Adjective => "adjective",
            PartOfSpeech::Adverb => "adverb",
            PartOfSpeech::Other => "other",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for PartOfSpeech {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "noun" => Ok(PartOfSpeech::Noun),
            "verb" => Ok(PartOfSpeech::Verb),
            "adjective" => Ok(PartOfSpeech::Adjective),
            "adverb" => Ok(PartOfSpeech::Adverb),
            "other" => Ok(PartOfSpeech::Other),
            other => Err(Error::Store(format!("unknown part of speech: {other}"))),
        }
    }
}

/// Grammatical gender of a noun.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Neutral,
}

impl Gender {
    /// German definite article.
    pub fn article(self) -> &'static str {
        match self {
            Gender::Male => "der",
            Gender::Female => "die",
            Gender::Neutral => "das",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Neutral => "neutral",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Gender {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "neutral" => Ok(Gender::Neutral),
            other => Err(Error::Store(format!("unknown gender: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Stored records
// ---------------------------------------------------------------------------

/// One meaning of a word, as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordMeaning {
    pub id: i64,
    pub word: String,
    pub part_of_speech: PartOfSpeech,
    pub gender: Option<Gender>,
    pub translations: Vec<WordMeaningTranslation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordMeaningTranslation {
    pub id: i64,
    pub word_meaning_id: i64,
    pub rating: i32,
    /// ISO 639-1 code ("en", "ru").
    pub language: String,
    pub translation: String,
    pub description: String,
}

impl WordMeaning {
    /// Translation into the given language, if one was generated.
    pub fn translation(&self, language: &str) -> Option<&WordMeaningTranslation> {
        self.translations.iter().find(|t| t.language == language)
    }

    /// Rating of this meaning (all translations of a meaning share it).
    pub fn rating(&self) -> i32 {
        self.translations.first().map_or(0, |t| t.rating)
    }

    /// The word as it is pronounced on its own: nouns carry their article.
    ///
    /// A noun without a gender cannot be rendered.
    pub fn full_word(&self) -> Result<String> {
        match (self.part_of_speech, self.gender) {
            (PartOfSpeech::Noun, Some(gender)) => Ok(format!("{} {}", gender.article(), self.word)),
            (PartOfSpeech::Noun, None) => Err(Error::Other(format!(
                "no gender for noun {} {}",
                self.word, self.id
            ))),
            _ => Ok(self.word.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Generated (not yet stored)
// ---------------------------------------------------------------------------

/// A translation produced by the meaning backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub translation: String,
    pub description: String,
}

/// One meaning candidate produced by the meaning backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeaningCandidate {
    pub part_of_speech: PartOfSpeech,
    pub gender: Option<Gender>,
    pub english_translation: Translation,
    pub russian_translation: Translation,
}

impl MeaningCandidate {
    /// Translations keyed by language code.
    pub fn translations(&self) -> [(&'static str, &Translation); 2] {
        [
            ("en", &self.english_translation),
            ("ru", &self.russian_translation),
        ]
    }
}

/// Backend output for one word, ranked best first.
#[derive(Debug, Clone)]
pub struct GeneratedMeanings {
    /// The word as the model spelled it.
    pub word: String,
    pub candidates: Vec<MeaningCandidate>,
    /// Raw model response, kept for the generation ledger.
    pub response: String,
    pub usage: Usage,
}

impl GeneratedMeanings {
    /// Candidates paired with their rating, highest first. Extra candidates are dropped.
    pub fn rated(&self) -> impl Iterator<Item = (&MeaningCandidate, i32)> {
        self.candidates.iter().zip(RATINGS)
    }
}
