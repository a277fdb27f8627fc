//! Postgres-backed meaning store.

use crate::db::Db;
use crate::engine::{DurableStore, Meanings};
use crate::error::{Error, Result};
use crate::model::GenerationLog;
use crate::model::meaning::{GeneratedMeanings, WordMeaning};
use async_trait::async_trait;
use tracing::info;

pub struct PgMeaningStore {
    db: Db,
}

impl PgMeaningStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DurableStore<Meanings> for PgMeaningStore {
    async fn lookup(&self, word: &String) -> Result<Option<Vec<WordMeaning>>> {
        let meanings = self.db.word_meanings(word).await?;
        Ok((!meanings.is_empty()).then_some(meanings))
    }

    async fn persist(&self, word: &String, generated: GeneratedMeanings) -> Result<()> {
        if generated.candidates.is_empty() {
            return Err(Error::Backend(format!("no meanings generated for {word:?}")));
        }
        if generated.word != *word {
            info!(%word, spelled = %generated.word, "model respelled the word, storing under the requested key");
        }

        let log = GenerationLog {
            request_type: "translation".to_string(),
            request_data: word.clone(),
            response_data: generated.response.clone(),
            usage: generated.usage,
        };
        let ids = self.db.insert_word_meanings(word, &generated, &log).await?;

        info!(%word, meanings = ids.len(), "stored generated meanings");
        Ok(())
    }
}
