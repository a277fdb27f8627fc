//! Word meanings from a chat model.

use super::SYSTEM_CONTEXT;
use crate::engine::{GenerationBackend, Meanings};
use crate::error::{Error, Result};
use crate::model::Usage;
use crate::model::meaning::{GeneratedMeanings, MeaningCandidate, RATINGS};
use crate::telemetry::genai::{record_usage, start_chat_span};
use async_trait::async_trait;
use rig::agent::Agent;
use rig::client::CompletionClient;
use rig::completion::{CompletionModel, Prompt};
use serde::Deserialize;
use tracing::{Instrument, debug};

/// Shape the model is asked to answer in.
#[derive(Debug, Deserialize)]
struct LlmWord {
    word: String,
    meanings: Vec<MeaningCandidate>,
}

pub struct LlmMeaningBackend<M: CompletionModel> {
    agent: Agent<M>,
    model: String,
}

impl<M: CompletionModel> LlmMeaningBackend<M> {
    pub fn new(agent: Agent<M>, model: impl Into<String>) -> Self {
        Self {
            agent,
            model: model.into(),
        }
    }

    /// Build the agent from a provider client.
    pub fn from_client<C>(client: &C, model: &str) -> Self
    where
        C: CompletionClient<CompletionModel = M>,
    {
        let agent = client
            .agent(model)
            .preamble(SYSTEM_CONTEXT)
            .temperature(0.2)
            .build();
        Self::new(agent, model)
    }
}

#[async_trait]
impl<M> GenerationBackend<Meanings> for LlmMeaningBackend<M>
where
    M: CompletionModel + 'static,
{
    async fn generate(&self, word: &String) -> Result<GeneratedMeanings> {
        let prompt = meaning_prompt(word);
        let span = start_chat_span(&self.model, "openai");

        let response = async { self.agent.prompt(prompt.as_str()).await }
            .instrument(span.clone())
            .await
            .map_err(|e| Error::Backend(format!("meaning request for {word:?} failed: {e}")))?;

        // rig's prompt API does not surface token counts; characters stand in.
        let usage = Usage {
            amount_in: prompt.chars().count() as i64,
            amount_out: response.chars().count() as i64,
        };
        record_usage(&span, usage);

        let generated = parse_meanings(&response, usage)?;
        debug!(%word, candidates = generated.candidates.len(), "parsed meanings");
        Ok(generated)
    }
}

pub fn meaning_prompt(word: &str) -> String {
    format!(
        "Translation of a german word \"{word}\" to russian and english, \
         with description, maximum {max} most popular meanings, \
         avoid duplicates and close synonyms. \
         Answer with a single JSON object and nothing else, in the form \
         {{\"word\": string, \"meanings\": [{{\"part_of_speech\": \
         \"noun\"|\"verb\"|\"adjective\"|\"adverb\"|\"other\", \
         \"gender\": \"male\"|\"female\"|\"neutral\"|null, \
         \"english_translation\": {{\"translation\": string, \"description\": string}}, \
         \"russian_translation\": {{\"translation\": string, \"description\": string}}}}]}}. \
         Order meanings from the most to the least popular. \
         Gender is set for nouns only.",
        max = RATINGS.len(),
    )
}

/// Parse a model answer, tolerating a markdown code fence around the JSON.
pub fn parse_meanings(response: &str, usage: Usage) -> Result<GeneratedMeanings> {
    let json = strip_code_fence(response);
    let parsed: LlmWord = serde_json::from_str(json)
        .map_err(|e| Error::Backend(format!("model answered with malformed meanings: {e}")))?;

    if parsed.meanings.is_empty() {
        return Err(Error::Backend(format!(
            "model returned no meanings for {:?}",
            parsed.word
        )));
    }

    Ok(GeneratedMeanings {
        word: parsed.word,
        candidates: parsed.meanings,
        response: json.to_string(),
        usage,
    })
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") up to the first newline.
    let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::meaning::{Gender, PartOfSpeech};

    const HAUS: &str = r#"{
        "word": "Haus",
        "meanings": [
            {
                "part_of_speech": "noun",
                "gender": "neutral",
                "english_translation": {"translation": "house", "description": "a building for living"},
                "russian_translation": {"translation": "дом", "description": "здание для жилья"}
            },
            {
                "part_of_speech": "noun",
                "gender": "neutral",
                "english_translation": {"translation": "household", "description": "the people living together"},
                "russian_translation": {"translation": "хозяйство", "description": "домашнее хозяйство"}
            }
        ]
    }"#;

    #[test]
    fn prompt_names_the_word() {
        let prompt = meaning_prompt("Haus");
        assert!(prompt.contains("german word \"Haus\""));
        assert!(prompt.contains("maximum 3 most popular meanings"));
    }

    #[test]
    fn parses_plain_json() {
        let generated = parse_meanings(HAUS, Usage::default()).unwrap();
        assert_eq!(generated.word, "Haus");
        assert_eq!(generated.candidates.len(), 2);
        let first = &generated.candidates[0];
        assert_eq!(first.part_of_speech, PartOfSpeech::Noun);
        assert_eq!(first.gender, Some(Gender::Neutral));
        assert_eq!(first.russian_translation.translation, "дом");
    }

    #[test]
    fn parses_fenced_json() {
        let fenced = format!("```json\n{HAUS}\n```");
        let generated = parse_meanings(&fenced, Usage::default()).unwrap();
        assert_eq!(generated.candidates[1].english_translation.translation, "household");
        assert!(generated.response.starts_with('{'));
    }

    #[test]
    fn rejects_empty_and_malformed_answers() {
        let empty = r#"{"word": "Xyz", "meanings": []}"#;
        assert!(parse_meanings(empty, Usage::default()).unwrap_err().is_backend_failure());
        assert!(parse_meanings("I don't know this word", Usage::default()).is_err());
        let bad_gender = HAUS.replace("neutral", "neuter");
        assert!(parse_meanings(&bad_gender, Usage::default()).is_err());
    }
}
