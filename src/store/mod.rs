//! Durable stores backing the three pipelines.
//!
//! Meanings live in Postgres. Illustrations and sounds are files served
//! as static assets, so the file itself is the record: it exists only once
//! fully written.

mod files;
pub mod illustration;
pub mod meaning;
pub mod sound;

pub use illustration::IllustrationFiles;
pub use meaning::PgMeaningStore;
pub use sound::SoundFiles;
