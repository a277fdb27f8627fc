//! Illustration files: `<dir>/<meaning id>.png`.

use super::files::write_atomic;
use crate::db::Db;
use crate::engine::{CpuPool, DurableStore, Illustrations};
use crate::error::{Error, Result};
use crate::model::GenerationLog;
use crate::model::media::{GeneratedImage, Illustration};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Decoding and writing run on a [`CpuPool`]: a 1024x1024 PNG is a few
/// megabytes of base64.
pub struct IllustrationFiles {
    dir: PathBuf,
    pool: CpuPool,
    ledger: Option<Db>,
}

impl IllustrationFiles {
    /// Open (and create if missing) the illustrations directory.
    pub async fn open(dir: impl Into<PathBuf>, pool: CpuPool) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            pool,
            ledger: None,
        })
    }

    /// Record every stored image in the generation ledger.
    pub fn with_ledger(mut self, db: Db) -> Self {
        self.ledger = Some(db);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, meaning_id: i64) -> PathBuf {
        self.dir.join(format!("{meaning_id}.png"))
    }
}

#[async_trait]
impl DurableStore<Illustrations> for IllustrationFiles {
    async fn lookup(&self, meaning_id: &i64) -> Result<Option<Illustration>> {
        let path = self.path_for(*meaning_id);
        if tokio::fs::try_exists(&path).await? {
            Ok(Some(Illustration {
                meaning_id: *meaning_id,
                path,
            }))
        } else {
            Ok(None)
        }
    }

    async fn persist(&self, meaning_id: &i64, generated: GeneratedImage) -> Result<()> {
        let path = self.path_for(*meaning_id);
        let target = path.clone();
        let b64 = generated.b64_png;

        let size = self
            .pool
            .submit(move || {
                let png = decode_png(&b64)?;
                write_atomic(&target, &png)?;
                Ok(png.len())
            })
            .join()
            .await?;
        debug!(meaning_id, size, path = %path.display(), "illustration written");

        if let Some(db) = &self.ledger {
            db.record_generation(&GenerationLog {
                request_type: "illustration".to_string(),
                request_data: generated.prompt.description,
                response_data: path.display().to_string(),
                usage: generated.usage,
            })
            .await?;
        }

        info!(meaning_id, "stored illustration");
        Ok(())
    }
}

/// Decode a base64 image payload and check that it is a PNG.
pub fn decode_png(b64: &str) -> Result<Vec<u8>> {
    let bytes = STANDARD
        .decode(b64.trim())
        .map_err(|e| Error::Backend(format!("image payload is not valid base64: {e}")))?;
    if !bytes.starts_with(PNG_SIGNATURE) {
        return Err(Error::Backend("image payload is not a PNG".to_string()));
    }
    Ok(bytes)
}
