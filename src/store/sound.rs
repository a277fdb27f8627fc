//! Sound files: `<dir>/<text>.mp3`, named after the rendered word.

use super::files::write_atomic_async;
use crate::db::Db;
use crate::engine::{DurableStore, Sounds};
use crate::error::{Error, Result};
use crate::model::media::{GeneratedSound, Sound};
use crate::model::{GenerationLog, Usage};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

const MAX_NAME_LEN: usize = 200;

pub struct SoundFiles {
    dir: PathBuf,
    ledger: Option<Db>,
}

impl SoundFiles {
    /// Open (and create if missing) the sounds directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir, ledger: None })
    }

    /// Record every stored sound in the generation ledger.
    pub fn with_ledger(mut self, db: Db) -> Self {
        self.ledger = Some(db);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for `text`, or `InvalidKey` if it cannot be a file name.
    pub fn path_for(&self, text: &str) -> Result<PathBuf> {
        validate_text(text)?;
        Ok(self.dir.join(format!("{text}.mp3")))
    }
}

fn validate_text(text: &str) -> Result<()> {
    let reason = if text.trim().is_empty() {
        "empty"
    } else if text.len() > MAX_NAME_LEN {
        "too long"
    } else if text.starts_with('.') {
        "starts with a dot"
    } else if text.contains(['/', '\\', '\0']) {
        "contains a path separator or NUL"
    } else {
        return Ok(());
    };
    Err(Error::InvalidKey {
        kind: "sound",
        key: text.to_string(),
        reason,
    })
}

#[async_trait]
impl DurableStore<Sounds> for SoundFiles {
    async fn lookup(&self, text: &String) -> Result<Option<Sound>> {
        let path = self.path_for(text)?;
        if tokio::fs::try_exists(&path).await? {
            Ok(Some(Sound {
                text: text.clone(),
                path,
            }))
        } else {
            Ok(None)
        }
    }

    async fn persist(&self, text: &String, generated: GeneratedSound) -> Result<()> {
        let path = self.path_for(text)?;
        write_atomic_async(&path, &generated.audio).await?;

        if let Some(db) = &self.ledger {
            db.record_generation(&GenerationLog {
                request_type: "sound".to_string(),
                request_data: text.clone(),
                response_data: generated.voice.clone(),
                usage: Usage {
                    amount_in: 0,
                    amount_out: generated.duration_secs,
                },
            })
            .await?;
        }

        info!(%text, voice = %generated.voice, bytes = generated.audio.len(), "stored sound");
        Ok(())
    }
}
