//! Generation ledger: one row per paid provider call.

use crate::error::Result;
use crate::model::{GenerationLog, Usage};
use crate::telemetry::metrics;
use opentelemetry::KeyValue;

impl super::Db {
    /// Record a generation and count its usage.
    pub async fn record_generation(&self, entry: &GenerationLog) -> Result<i64> {
        let id = insert_log(self.pool(), entry).await?;
        count_usage(entry);
        Ok(id)
    }

    /// Ledger rows for one request, oldest first.
    pub async fn generations_for(
        &self,
        request_type: &str,
        request_data: &str,
    ) -> Result<Vec<GenerationLog>> {
        let rows: Vec<(String, String, String, i64, i64)> = sqlx::query_as(
            "SELECT request_type, request_data, response_data, amount_in, amount_out
             FROM llm_log WHERE request_type = $1 AND request_data = $2 ORDER BY id",
        )
        .bind(request_type)
        .bind(request_data)
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(request_type, request_data, response_data, amount_in, amount_out)| {
                    GenerationLog {
                        request_type,
                        request_data,
                        response_data,
                        usage: Usage {
                            amount_in,
                            amount_out,
                        },
                    }
                },
            )
            .collect())
    }

    /// Total usage recorded for a request type since `since`.
    pub async fn usage_since(
        &self,
        request_type: &str,
        since: chrono::DateTime<chrono::Utc>,
    ) -> Result<(i64, i64)> {
        let row: (Option<i64>, Option<i64>) = sqlx::query_as(
            "SELECT SUM(amount_in)::BIGINT, SUM(amount_out)::BIGINT
             FROM llm_log WHERE request_type = $1 AND request_time >= $2",
        )
        .bind(request_type)
        .bind(since)
        .fetch_one(self.pool())
        .await?;
        Ok((row.0.unwrap_or(0), row.1.unwrap_or(0)))
    }
}

/// Insert a ledger row on any executor, so callers can write it inside their
/// own transaction.
pub(crate) async fn insert_log<'e, E>(executor: E, entry: &GenerationLog) -> Result<i64>
where
    E: sqlx::PgExecutor<'e>,
{
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO llm_log (request_type, request_data, response_data, amount_in, amount_out)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id",
    )
    .bind(&entry.request_type)
    .bind(&entry.request_data)
    .bind(&entry.response_data)
    .bind(entry.usage.amount_in)
    .bind(entry.usage.amount_out)
    .fetch_one(executor)
    .await?;
    Ok(id)
}

/// Add a committed ledger row to the usage counter.
pub(crate) fn count_usage(entry: &GenerationLog) {
    for (direction, amount) in [
        ("input", entry.usage.amount_in),
        ("output", entry.usage.amount_out),
    ] {
        metrics::llm_usage().add(
            amount.max(0) as u64,
            &[
                KeyValue::new("request_type", entry.request_type.clone()),
                KeyValue::new("direction", direction),
            ],
        );
    }
}
