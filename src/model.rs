use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use sqlx::FromRow;

use crate::error::{AppError, Result};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const INSUFFICIENT_DATA: &str = "insufficient data";
const MAX_CODE_LEN: usize = 12;
const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;

/// A registered currency pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Pair {
    pub id: i64,
    #[sqlx(rename = "from_code")]
    pub from: String,
    #[sqlx(rename = "to_code")]
    pub to: String,
}

/// Validated `from`/`to` codes of a pair, without an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrencyPair {
    pub from: String,
    pub to: String,
}

impl CurrencyPair {
    pub fn new(from: &str, to: &str) -> Result<Self> {
        let from = currency_code("from", from)?;
        let to = currency_code("to", to)?;
        if from == to {
            return Err(AppError::validation(format!(
                "from and to must differ, got {} for both",
                from
            )));
        }

        Ok(Self { from, to })
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pair {}/{}", self.from, self.to)
    }
}

fn currency_code(field: &str, value: &str) -> Result<String> {
    let code = value.trim();
    if code.is_empty() || code.len() > MAX_CODE_LEN {
        return Err(AppError::validation(format!(
            "{} must be 1 to {} characters long",
            field, MAX_CODE_LEN
        )));
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::validation(format!(
            "{} must be alphanumeric, got {:?}",
            field, code
        )));
    }

    Ok(code.to_string())
}

/// Body of pair create, update and delete-by-codes requests.
#[derive(Debug, Clone, Deserialize)]
pub struct PairPayload {
    pub from: String,
    pub to: String,
}

impl TryFrom<PairPayload> for CurrencyPair {
    type Error = AppError;

    fn try_from(payload: PairPayload) -> Result<Self> {
        CurrencyPair::new(&payload.from, &payload.to)
    }
}

/// One recorded rate of a pair on one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Observation {
    pub pair_id: i64,
    pub date: NaiveDate,
    pub rate: Decimal,
}

/// Rate as sent by callers: decimal text or a plain JSON number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RateText {
    Text(String),
    Number(serde_json::Number),
}

impl RateText {
    pub fn to_decimal(&self) -> Result<Decimal> {
        match self {
            RateText::Text(text) => parse_rate(text),
            RateText::Number(number) => parse_rate(&number.to_string()),
        }
    }
}

/// Body of a daily observation request.
#[derive(Debug, Clone, Deserialize)]
pub struct DailyRatePayload {
    pub date: String,
    pub from: String,
    pub to: String,
    pub rate: RateText,
}

/// A validated daily observation addressed by currency codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewObservation {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub pair: CurrencyPair,
    pub rate: Decimal,
}

impl TryFrom<DailyRatePayload> for NewObservation {
    type Error = AppError;

    fn try_from(payload: DailyRatePayload) -> Result<Self> {
        Ok(Self {
            date: parse_date(&payload.date)?,
            pair: CurrencyPair::new(&payload.from, &payload.to)?,
            rate: payload.rate.to_decimal()?,
        })
    }
}

/// Body of a tracking request.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackPayload {
    pub date: String,
}

/// Parses `YYYY-MM-DD`, years 1 to 9999 only.
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    let date = NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).map_err(|err| {
        AppError::validation(format!("invalid date {:?}, expected YYYY-MM-DD: {}", text, err))
    })?;
    if !(MIN_YEAR..=MAX_YEAR).contains(&date.year()) {
        return Err(AppError::validation(format!(
            "invalid date {:?}, year must be between {} and {}",
            text, MIN_YEAR, MAX_YEAR
        )));
    }

    Ok(date)
}

/// Parses a finite decimal rate, in plain or scientific notation.
pub fn parse_rate(text: &str) -> Result<Decimal> {
    let text = text.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|_| AppError::validation(format!("invalid rate {:?}, expected a decimal number", text)))
}

/// A derived figure, or the marker for a window without a full week of data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateValue {
    Value(Decimal),
    Insufficient,
}

impl RateValue {
    pub fn value(self) -> Option<Decimal> {
        match self {
            RateValue::Value(value) => Some(value),
            RateValue::Insufficient => None,
        }
    }
}

impl From<Option<Decimal>> for RateValue {
    fn from(value: Option<Decimal>) -> Self {
        value.map_or(RateValue::Insufficient, RateValue::Value)
    }
}

impl fmt::Display for RateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateValue::Value(value) => write!(f, "{}", value),
            RateValue::Insufficient => f.write_str(INSUFFICIENT_DATA),
        }
    }
}

impl Serialize for RateValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Tracking result for one pair on one date. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackRow {
    pub pair_id: i64,
    pub from: String,
    pub to: String,
    pub rate: RateValue,
    #[serde(rename = "7_day_avg")]
    pub week_avg: RateValue,
}
