//! Slack-style `seconds.micros` timestamps kept in their exact decimal form.

use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

const NANOS_DIGITS: usize = 9;

/// A message timestamp as issued by the remote service.
///
/// The original string is retained so equality stays exact; ordering is
/// numeric on the decimal value with the raw text as the final tie-breaker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp {
    raw: String,
    secs: i64,
    nanos: u32,
}

impl Timestamp {
    pub fn parse(input: &str) -> Result<Self> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(anyhow!("timestamp is empty"));
        }
        let (whole, fraction) = match raw.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (raw, ""),
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(anyhow!("invalid timestamp `{raw}`"));
        }
        if !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(anyhow!("invalid timestamp `{raw}`"));
        }
        let secs = whole
            .parse::<i64>()
            .map_err(|_| anyhow!("timestamp out of range `{raw}`"))?;

        let mut digits: String = fraction.chars().take(NANOS_DIGITS).collect();
        while digits.len() < NANOS_DIGITS {
            digits.push('0');
        }
        let nanos = digits
            .parse::<u32>()
            .map_err(|_| anyhow!("invalid timestamp fraction `{raw}`"))?;

        Ok(Self {
            raw: raw.to_string(),
            secs,
            nanos,
        })
    }

    /// Canonical form for a whole second, e.g. `1700000000.000000`.
    pub fn from_epoch_secs(secs: i64) -> Self {
        Self {
            raw: format!("{secs}.000000"),
            secs,
            nanos: 0,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(self.secs, self.nanos).unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// Calendar day in UTC, independent of the host time zone.
    pub fn utc_date(&self) -> NaiveDate {
        self.to_datetime().date_naive()
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.secs
            .cmp(&other.secs)
            .then(self.nanos.cmp(&other.nanos))
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Timestamp {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Timestamp {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Timestamp> for String {
    fn from(value: Timestamp) -> Self {
        value.raw
    }
}

/// Deserialize an optional timestamp, mapping blank or malformed values to `None`.
pub fn lenient<'de, D>(deserializer: D) -> std::result::Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|value| Timestamp::parse(&value).ok()))
}
