use log::debug;
use sqlx::postgres::{PgExecutor, PgPool};

use crate::error::{AppError, Result};
use crate::model::{CurrencyPair, Pair};

pub const MAX_PAGE_SIZE: i64 = 100;

/// Offset and limit of a pair listing, already clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: i64,
    pub limit: i64,
}

impl Page {
    /// Limits outside `1..=100` fall back to 100, negative offsets to 0.
    pub fn new(offset: Option<i64>, limit: Option<i64>) -> Self {
        let limit = match limit {
            Some(limit) if (1..=MAX_PAGE_SIZE).contains(&limit) => limit,
            _ => MAX_PAGE_SIZE,
        };
        let offset = offset.unwrap_or(0).max(0);

        Self { offset, limit }
    }

    /// Same clamp over raw query text. Out-of-range integers saturate,
    /// anything non-numeric counts as absent.
    pub fn from_query(offset: Option<&str>, limit: Option<&str>) -> Self {
        Self::new(offset.and_then(saturating_int), limit.and_then(saturating_int))
    }
}

fn saturating_int(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(value) = text.parse::<i64>() {
        return Some(value);
    }

    let (negative, digits) = match text.strip_prefix('-') {
        Some(digits) => (true, digits),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some(if negative { i64::MIN } else { i64::MAX })
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// The set of known currency pairs.
#[derive(Debug, Clone)]
pub struct PairRegistry {
    pool: PgPool,
}

impl PairRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, pair: &CurrencyPair) -> Result<Pair> {
        let created = sqlx::query_as::<_, Pair>(
            "INSERT INTO currency_pair (from_code, to_code) VALUES ($1, $2) \
             RETURNING id, from_code, to_code",
        )
        .bind(&pair.from)
        .bind(&pair.to)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| AppError::on_write(err, pair.to_string()))?;

        debug!("Registered {} as id {}", pair, created.id);
        Ok(created)
    }

    pub async fn get(&self, id: i64) -> Result<Pair> {
        sqlx::query_as::<_, Pair>("SELECT id, from_code, to_code FROM currency_pair WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("pair {}", id)))
    }

    pub async fn list(&self, page: Page) -> Result<Vec<Pair>> {
        let pairs = sqlx::query_as::<_, Pair>(
            "SELECT id, from_code, to_code FROM currency_pair ORDER BY id LIMIT $1 OFFSET $2",
        )
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(pairs)
    }

    /// Replaces the codes of an existing pair. Unknown ids are `NotFound`.
    pub async fn update(&self, id: i64, pair: &CurrencyPair) -> Result<Pair> {
        let updated = sqlx::query_as::<_, Pair>(
            "UPDATE currency_pair SET from_code = $1, to_code = $2 WHERE id = $3 \
             RETURNING id, from_code, to_code",
        )
        .bind(&pair.from)
        .bind(&pair.to)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| AppError::on_write(err, pair.to_string()))?
        .ok_or_else(|| AppError::NotFound(format!("pair {}", id)))?;

        debug!("Updated pair {} to {}", id, pair);
        Ok(updated)
    }

    /// Removes a pair and, by cascade, its observations. Returns the rows removed.
    pub async fn delete(&self, id: i64) -> Result<u64> {
        let removed = sqlx::query("DELETE FROM currency_pair WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        debug!("Deleted pair {} ({} row(s))", id, removed);
        Ok(removed)
    }

    pub async fn delete_by_pair(&self, pair: &CurrencyPair) -> Result<u64> {
        let removed = sqlx::query("DELETE FROM currency_pair WHERE from_code = $1 AND to_code = $2")
            .bind(&pair.from)
            .bind(&pair.to)
            .execute(&self.pool)
            .await?
            .rows_affected();

        debug!("Deleted {} ({} row(s))", pair, removed);
        Ok(removed)
    }

    pub async fn all(&self) -> Result<Vec<Pair>> {
        all_pairs(&self.pool).await
    }

    /// Drops every pair and observation and restarts id assignment.
    pub async fn clear(&self) -> Result<()> {
        sqlx::query("TRUNCATE TABLE currency_pair RESTART IDENTITY CASCADE")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Every registered pair ordered by id.
pub(crate) async fn all_pairs<'e, E>(executor: E) -> Result<Vec<Pair>>
where
    E: PgExecutor<'e>,
{
    let pairs =
        sqlx::query_as::<_, Pair>("SELECT id, from_code, to_code FROM currency_pair ORDER BY id")
            .fetch_all(executor)
            .await?;

    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_defaults_to_max_limit() {
        assert_eq!(Page::default(), Page { offset: 0, limit: 100 });
    }

    #[test]
    fn page_limit_outside_range_is_forced_to_max() {
        assert_eq!(Page::new(None, Some(0)).limit, 100);
        assert_eq!(Page::new(None, Some(-5)).limit, 100);
        assert_eq!(Page::new(None, Some(101)).limit, 100);
        assert_eq!(Page::new(None, Some(1)).limit, 1);
        assert_eq!(Page::new(None, Some(100)).limit, 100);
        assert_eq!(Page::new(None, Some(25)).limit, 25);
    }

    #[test]
    fn query_text_overflow_and_garbage_fall_into_the_clamp() {
        assert_eq!(
            Page::from_query(None, Some("99999999999999999999")),
            Page { offset: 0, limit: 100 }
        );
        assert_eq!(Page::from_query(None, Some("abc")).limit, 100);
        assert_eq!(Page::from_query(None, Some("-3")).limit, 100);
        assert_eq!(Page::from_query(None, Some(" 20 ")).limit, 20);

        assert_eq!(Page::from_query(Some("-99999999999999999999"), None).offset, 0);
        assert_eq!(Page::from_query(Some("99999999999999999999"), None).offset, i64::MAX);
        assert_eq!(Page::from_query(Some("1.5"), None).offset, 0);
        assert_eq!(Page::from_query(Some("+7"), Some("")).offset, 7);
    }

    #[test]
    fn page_offset_is_never_negative() {
        assert_eq!(Page::new(Some(-3), None).offset, 0);
        assert_eq!(Page::new(Some(40), None).offset, 40);
    }
}
