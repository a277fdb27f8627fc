//! The broker: the public API for materializing generated resources.
//!
//! Owns one pipeline per resource kind. Construct it once at startup from
//! its stores and backends and share it behind an `Arc`.

use super::BrokerConfig;
use super::kind::{DurableStore, GenerationBackend, Illustrations, Meanings, ResourceKind, Sounds};
use super::pipeline::Pipeline;
use crate::error::{Error, Result};
use crate::model::meaning::WordMeaning;
use crate::model::media::{Illustration, IllustrationPrompt, Sound};
use std::sync::Arc;
use tracing::info;

/// Store and backend for one kind.
pub struct PipelineParts<R: ResourceKind> {
    pub store: Arc<dyn DurableStore<R>>,
    pub backend: Arc<dyn GenerationBackend<R>>,
}

impl<R: ResourceKind> PipelineParts<R> {
    pub fn new(store: Arc<dyn DurableStore<R>>, backend: Arc<dyn GenerationBackend<R>>) -> Self {
        Self { store, backend }
    }
}

/// Queue and registry sizes, per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindStats {
    pub queued: usize,
    pub in_flight: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrokerStats {
    pub meanings: KindStats,
    pub illustrations: KindStats,
    pub sounds: KindStats,
}

pub struct Broker {
    meanings: Pipeline<Meanings>,
    illustrations: Pipeline<Illustrations>,
    sounds: Pipeline<Sounds>,
}

impl Broker {
    pub fn new(
        config: &BrokerConfig,
        meanings: PipelineParts<Meanings>,
        illustrations: PipelineParts<Illustrations>,
        sounds: PipelineParts<Sounds>,
    ) -> Self {
        Self {
            meanings: Pipeline::new(meanings.store, meanings.backend, config),
            illustrations: Pipeline::new(illustrations.store, illustrations.backend, config),
            sounds: Pipeline::new(sounds.store, sounds.backend, config),
        }
    }

    /// Start the supervised worker of every kind.
    ///
    /// # Errors
    /// [`Error::AlreadyRunning`] if the broker was already started.
    pub fn start(&self) -> Result<()> {
        self.meanings.start()?;
        self.illustrations.start()?;
        self.sounds.start()?;
        info!("generation broker started");
        Ok(())
    }

    /// Stop all workers after their current task.
    pub fn shutdown(&self) {
        self.meanings.shutdown();
        self.illustrations.shutdown();
        self.sounds.shutdown();
    }

    /// Wait for all workers to stop.
    pub async fn join(&self) {
        self.meanings.join().await;
        self.illustrations.join().await;
        self.sounds.join().await;
        info!("generation broker stopped");
    }

    /// Meanings of `word`, generated on first request.
    pub async fn meanings(&self, word: &str) -> Result<Vec<WordMeaning>> {
        self.meanings
            .materialize(word.to_string(), || word.to_string())
            .await
    }

    /// Illustration for a word meaning, drawn from `prompt` on first request.
    pub async fn illustration(
        &self,
        meaning_id: i64,
        prompt: IllustrationPrompt,
    ) -> Result<Illustration> {
        self.illustrations.materialize(meaning_id, || prompt).await
    }

    /// Illustration for a stored meaning, prompted by its English translation.
    pub async fn illustration_for(&self, meaning: &WordMeaning) -> Result<Illustration> {
        let english = meaning.translation("en").ok_or_else(|| {
            Error::NotFound(format!(
                "no en translation for word meaning with id {}",
                meaning.id
            ))
        })?;
        let prompt = IllustrationPrompt {
            word: english.translation.clone(),
            description: english.description.clone(),
        };
        self.illustration(meaning.id, prompt).await
    }

    /// Pronunciation of `text`, synthesized on first request.
    pub async fn sound(&self, text: &str) -> Result<Sound> {
        self.sounds
            .materialize(text.to_string(), || text.to_string())
            .await
    }

    /// Pronunciation of a stored meaning, with its article for nouns.
    pub async fn sound_for(&self, meaning: &WordMeaning) -> Result<Sound> {
        let text = meaning.full_word()?;
        self.sound(&text).await
    }

    pub fn stats(&self) -> BrokerStats {
        BrokerStats {
            meanings: stats_of(&self.meanings),
            illustrations: stats_of(&self.illustrations),
            sounds: stats_of(&self.sounds),
        }
    }
}

fn stats_of<R: ResourceKind>(pipeline: &Pipeline<R>) -> KindStats {
    KindStats {
        queued: pipeline.queued(),
        in_flight: pipeline.in_flight(),
    }
}
