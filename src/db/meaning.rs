//! Word meaning queries.

use super::ledger;
use crate::error::Result;
use crate::model::GenerationLog;
use crate::model::meaning::*;
use std::collections::HashMap;

impl super::Db {
    /// All meanings stored for `word`, with their translations. Empty if the
    /// word was never generated.
    pub async fn word_meanings(&self, word: &str) -> Result<Vec<WordMeaning>> {
        let rows: Vec<WordMeaningRow> = sqlx::query_as(
            "SELECT id, word, part_of_speech, gender
             FROM word_meanings WHERE word = $1 ORDER BY id",
        )
        .bind(word)
        .fetch_all(self.pool())
        .await?;

        self.attach_translations(rows).await
    }

    /// A single meaning by id.
    pub async fn word_meaning(&self, id: i64) -> Result<Option<WordMeaning>> {
        let row: Option<WordMeaningRow> = sqlx::query_as(
            "SELECT id, word, part_of_speech, gender FROM word_meanings WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(self.attach_translations(vec![row]).await?.pop())
    }

    /// Insert generated meanings for `word` and their ledger row in one
    /// transaction, rated in candidate order. Returns the new meaning ids.
    pub async fn insert_word_meanings(
        &self,
        word: &str,
        generated: &GeneratedMeanings,
        log: &GenerationLog,
    ) -> Result<Vec<i64>> {
        let mut tx = self.pool().begin().await?;
        let mut ids = Vec::with_capacity(RATINGS.len());

        for (candidate, rating) in generated.rated() {
            let (id,): (i64,) = sqlx::query_as(
                "INSERT INTO word_meanings (word, part_of_speech, gender)
                 VALUES ($1, $2, $3)
                 RETURNING id",
            )
            .bind(word)
            .bind(candidate.part_of_speech.to_string())
            .bind(candidate.gender.map(|g| g.to_string()))
            .fetch_one(&mut *tx)
            .await?;

            for (language, translation) in candidate.translations() {
                sqlx::query(
                    "INSERT INTO word_meaning_translations
                        (word_meaning_id, rating, language, translation, description)
                     VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(id)
                .bind(rating)
                .bind(language)
                .bind(&translation.translation)
                .bind(&translation.description)
                .execute(&mut *tx)
                .await?;
            }
            ids.push(id);
        }
        ledger::insert_log(&mut *tx, log).await?;

        tx.commit().await?;
        ledger::count_usage(log);
        Ok(ids)
    }

    async fn attach_translations(&self, rows: Vec<WordMeaningRow>) -> Result<Vec<WordMeaning>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let translations: Vec<TranslationRow> = sqlx::query_as(
            "SELECT id, word_meaning_id, rating, language, translation, description
             FROM word_meaning_translations
             WHERE word_meaning_id = ANY($1)
             ORDER BY rating DESC, id",
        )
        .bind(&ids)
        .fetch_all(self.pool())
        .await?;

        let mut by_meaning: HashMap<i64, Vec<WordMeaningTranslation>> = HashMap::new();
        for t in translations {
            by_meaning
                .entry(t.word_meaning_id)
                .or_default()
                .push(t.into());
        }

        rows.into_iter()
            .map(|row| {
                let translations = by_meaning.remove(&row.id).unwrap_or_default();
                row.try_into_meaning(translations)
            })
            .collect()
    }
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct WordMeaningRow {
    id: i64,
    word: String,
    part_of_speech: String,
    gender: Option<String>,
}

impl WordMeaningRow {
    fn try_into_meaning(self, translations: Vec<WordMeaningTranslation>) -> Result<WordMeaning> {
        Ok(WordMeaning {
            id: self.id,
            word: self.word,
            part_of_speech: self.part_of_speech.parse()?,
            gender: self.gender.as_deref().map(str::parse::<Gender>).transpose()?,
            translations,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TranslationRow {
    id: i64,
    word_meaning_id: i64,
    rating: i32,
    language: String,
    translation: String,
    description: String,
}

impl From<TranslationRow> for WordMeaningTranslation {
    fn from(row: TranslationRow) -> Self {
        Self {
            id: row.id,
            word_meaning_id: row.word_meaning_id,
            rating: row.rating,
            language: row.language,
            translation: row.translation,
            description: row.description,
        }
    }
}
