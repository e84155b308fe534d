//! Rolling 7-day rate and average per pair.
//!
//! A pair only gets figures for a date once every day of the week ending at
//! that date has an observation; otherwise both fields carry the
//! "insufficient data" marker.

use std::collections::{BTreeSet, HashMap};

use chrono::{Days, NaiveDate};
use log::debug;
use rust_decimal::Decimal;
use sqlx::postgres::PgPool;

use crate::error::{AppError, Result};
use crate::model::{Observation, Pair, RateValue, TrackRow};
use crate::observations::observations_between;
use crate::registry::all_pairs;

/// Calendar days in the window, the target date included.
pub const WINDOW_DAYS: u64 = 7;

/// Distinct observed dates required before a figure is reported.
pub const MIN_DISTINCT_DATES: usize = 7;

#[derive(Debug, Clone)]
pub struct RateTracker {
    pool: PgPool,
}

impl RateTracker {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// One row per registered pair, by pair id, for the week ending at `date`.
    pub async fn track(&self, date: NaiveDate) -> Result<Vec<TrackRow>> {
        let start = window_start(date)?;

        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;
        let pairs = all_pairs(&mut *tx).await?;
        let observations = observations_between(&mut *tx, start, date).await?;
        tx.commit().await?;

        debug!(
            "Tracking {} pair(s) over {}..={} with {} observation(s)",
            pairs.len(),
            start,
            date,
            observations.len()
        );

        Ok(build_rows(pairs, &observations, date))
    }
}

/// First day of the window ending at `date`.
pub fn window_start(date: NaiveDate) -> Result<NaiveDate> {
    date.checked_sub_days(Days::new(WINDOW_DAYS - 1))
        .ok_or_else(|| AppError::validation(format!("Can't get window start for {}", date)))
}

/// Joins pairs with their observations. Pairs without any still get a row.
pub fn build_rows(pairs: Vec<Pair>, observations: &[Observation], date: NaiveDate) -> Vec<TrackRow> {
    let mut by_pair: HashMap<i64, Vec<&Observation>> = HashMap::new();
    for observation in observations {
        by_pair.entry(observation.pair_id).or_default().push(observation);
    }

    pairs
        .into_iter()
        .map(|pair| {
            let window = Window::new(
                date,
                by_pair.get(&pair.id).into_iter().flatten().copied(),
            );

            TrackRow {
                pair_id: pair.id,
                from: pair.from,
                to: pair.to,
                rate: window.rate(),
                week_avg: window.average(),
            }
        })
        .collect()
}

/// Observations of a single pair falling inside the week ending at `date`.
#[derive(Debug)]
pub struct Window<'a> {
    date: NaiveDate,
    points: Vec<&'a Observation>,
}

impl<'a> Window<'a> {
    pub fn new(date: NaiveDate, observations: impl IntoIterator<Item = &'a Observation>) -> Self {
        let start = date.checked_sub_days(Days::new(WINDOW_DAYS - 1));
        let points = observations
            .into_iter()
            .filter(|o| o.date <= date && start.is_none_or(|start| o.date >= start))
            .collect();

        Self { date, points }
    }

    pub fn distinct_dates(&self) -> usize {
        self.points.iter().map(|o| o.date).collect::<BTreeSet<_>>().len()
    }

    fn is_complete(&self) -> bool {
        self.distinct_dates() >= MIN_DISTINCT_DATES
    }

    /// Rate on the target date, or the latest one in the window.
    pub fn rate(&self) -> RateValue {
        if !self.is_complete() {
            return RateValue::Insufficient;
        }

        self.points
            .iter()
            .find(|o| o.date == self.date)
            .or_else(|| self.points.iter().max_by_key(|o| o.date))
            .map(|o| o.rate)
            .into()
    }

    /// Arithmetic mean of every rate in the window.
    pub fn average(&self) -> RateValue {
        if !self.is_complete() {
            return RateValue::Insufficient;
        }

        mean(self.points.iter().map(|o| o.rate)).into()
    }
}

fn mean(values: impl Iterator<Item = Decimal> + Clone) -> Option<Decimal> {
    let count = Decimal::from(values.clone().count());
    if count.is_zero() {
        return None;
    }

    let total = values
        .clone()
        .try_fold(Decimal::ZERO, |total, value| total.checked_add(value));
    let mean = match total {
        Some(total) => total.checked_div(count)?,
        // Sum overflowed, divide first.
        None => values
            .map(|value| value / count)
            .try_fold(Decimal::ZERO, |total, value| total.checked_add(value))?,
    };

    Some(mean.normalize())
}
