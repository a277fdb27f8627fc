//! Resource kinds and the collaborator contracts a pipeline is built from.

use crate::error::Result;
use crate::model::meaning::{GeneratedMeanings, WordMeaning};
use crate::model::media::{
    GeneratedImage, GeneratedSound, Illustration, IllustrationPrompt, Sound,
};
use async_trait::async_trait;
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Type-level description of one generation pipeline.
pub trait ResourceKind: Send + Sync + 'static {
    /// Short name used in logs, metrics and errors.
    const NAME: &'static str;

    /// Deduplication and lookup key.
    type Key: Clone + Eq + Hash + Debug + Display + Send + Sync + 'static;

    /// Everything the backend needs to produce one resource.
    type Input: Debug + Send + Sync + 'static;

    /// Raw backend output, handed to the store to persist.
    type Generated: Send + 'static;

    /// What callers get back once the resource exists.
    type Record: Send + 'static;
}

/// Persistence for already generated resources.
///
/// `lookup` may run concurrently with `persist` for a different key.
/// Concurrent `persist` calls for the same key never happen: a kind has a
/// single worker.
#[async_trait]
pub trait DurableStore<R: ResourceKind>: Send + Sync {
    async fn lookup(&self, key: &R::Key) -> Result<Option<R::Record>>;

    /// Make a generated resource visible to `lookup`. Must not expose a
    /// partially written record.
    async fn persist(&self, key: &R::Key, generated: R::Generated) -> Result<()>;
}

/// The expensive external call.
#[async_trait]
pub trait GenerationBackend<R: ResourceKind>: Send + Sync {
    async fn generate(&self, input: &R::Input) -> Result<R::Generated>;
}

/// Meanings of a lexical word, with English and Russian translations.
pub struct Meanings;

impl ResourceKind for Meanings {
    const NAME: &'static str = "meanings";
    type Key = String;
    type Input = String;
    type Generated = GeneratedMeanings;
    type Record = Vec<WordMeaning>;
}

/// One illustration per word meaning id.
pub struct Illustrations;

impl ResourceKind for Illustrations {
    const NAME: &'static str = "illustration";
    type Key = i64;
    type Input = IllustrationPrompt;
    type Generated = GeneratedImage;
    type Record = Illustration;
}

/// Pronunciation of a rendered word ("das Haus").
pub struct Sounds;

impl ResourceKind for Sounds {
    const NAME: &'static str = "sound";
    type Key = String;
    type Input = String;
    type Generated = GeneratedSound;
    type Record = Sound;
}
