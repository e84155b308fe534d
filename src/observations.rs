use chrono::NaiveDate;
use log::debug;
use sqlx::postgres::{PgExecutor, PgPool};

use crate::error::{AppError, Result};
use crate::model::{NewObservation, Observation};

/// One rate per pair and calendar date.
#[derive(Debug, Clone)]
pub struct ObservationStore {
    pool: PgPool,
}

impl ObservationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts or overwrites the rate of `(pair, date)` in a single statement.
    /// Fails with `NotFound` when no pair has the given codes.
    pub async fn upsert(&self, observation: &NewObservation) -> Result<Observation> {
        let stored = sqlx::query_as::<_, Observation>(
            "INSERT INTO rate_observation (pair_id, date, rate) \
             SELECT id, $3, $4 FROM currency_pair WHERE from_code = $1 AND to_code = $2 \
             ON CONFLICT (pair_id, date) DO UPDATE SET rate = EXCLUDED.rate \
             RETURNING pair_id, date, rate",
        )
        .bind(&observation.pair.from)
        .bind(&observation.pair.to)
        .bind(observation.date)
        .bind(observation.rate)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(observation.pair.to_string()))?;

        debug!(
            "Recorded {} = {} for pair {} on {}",
            observation.pair, stored.rate, stored.pair_id, stored.date
        );
        Ok(stored)
    }

    /// Recorded history of one pair, oldest first.
    pub async fn for_pair(&self, pair_id: i64) -> Result<Vec<Observation>> {
        let observations = sqlx::query_as::<_, Observation>(
            "SELECT pair_id, date, rate FROM rate_observation WHERE pair_id = $1 ORDER BY date",
        )
        .bind(pair_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(observations)
    }

    pub async fn window(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<Observation>> {
        observations_between(&self.pool, start, end).await
    }

    /// Removes every observation. Returns the rows removed.
    pub async fn clear(&self) -> Result<u64> {
        let removed = sqlx::query("DELETE FROM rate_observation")
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(removed)
    }
}

/// Observations dated within `start..=end`, ordered by pair then date.
pub(crate) async fn observations_between<'e, E>(
    executor: E,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Observation>>
where
    E: PgExecutor<'e>,
{
    let observations = sqlx::query_as::<_, Observation>(
        "SELECT pair_id, date, rate FROM rate_observation \
         WHERE date BETWEEN $1 AND $2 ORDER BY pair_id, date",
    )
    .bind(start)
    .bind(end)
    .fetch_all(executor)
    .await?;

    Ok(observations)
}
