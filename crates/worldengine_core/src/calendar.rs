//! World calendar dates and date spans.
//!
//! # Responsibility
//! - Parse authored `[-]YYYY-M-D` date strings.
//! - Compute ages as whole-unit spans between two dates.
//!
//! # Invariants
//! - The calendar is synthetic: 12 months of 30 days, 360 days per year.
//!   Authored vaults depend on this convention, so it must not be swapped for
//!   a Gregorian calendar.
//! - A leading `-` marks a negative (BCE) year.
//! - Year magnitude is capped at `MAX_YEAR_MAGNITUDE`, so day counts and
//!   spans of parsed dates never overflow.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub const DAYS_PER_MONTH: i64 = 30;
pub const DAYS_PER_YEAR: i64 = 360;
pub const MAX_YEAR_MAGNITUDE: i64 = 1_000_000_000;

static WORLD_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(-?)(\d+)-(\d{1,2})-(\d{1,2})$").expect("valid world date regex"));

/// Returns whether `value` is a syntactically valid world date.
pub fn is_world_date(value: &str) -> bool {
    WORLD_DATE_RE.is_match(value.trim())
}

/// One day on the world calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorldDate {
    pub year: i64,
    pub month: i64,
    pub day: i64,
}

impl WorldDate {
    pub fn new(year: i64, month: i64, day: i64) -> Self {
        Self { year, month, day }
    }

    /// Day count on the synthetic calendar; saturates for hand-built
    /// dates beyond the parseable range.
    pub fn total_days(&self) -> i64 {
        self.year
            .saturating_mul(DAYS_PER_YEAR)
            .saturating_add(self.month.saturating_mul(DAYS_PER_MONTH))
            .saturating_add(self.day)
    }

    /// Absolute span between `self` and `other`.
    pub fn span_to(&self, other: &WorldDate) -> DateSpan {
        DateSpan::from_days(
            other
                .total_days()
                .saturating_sub(self.total_days())
                .saturating_abs(),
        )
    }
}

/// Malformed date string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateParseError(pub String);

impl Display for DateParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid world date `{}` (expected [-]YYYY-M-D)", self.0)
    }
}

impl std::error::Error for DateParseError {}

impl FromStr for WorldDate {
    type Err = DateParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let caps = WORLD_DATE_RE
            .captures(trimmed)
            .ok_or_else(|| DateParseError(value.to_string()))?;
        let number = |idx: usize| -> Result<i64, DateParseError> {
            caps[idx]
                .parse::<i64>()
                .map_err(|_| DateParseError(value.to_string()))
        };
        let magnitude = number(2)?;
        if magnitude > MAX_YEAR_MAGNITUDE {
            return Err(DateParseError(value.to_string()));
        }
        let year = if &caps[1] == "-" { -magnitude } else { magnitude };
        Ok(Self {
            year,
            month: number(3)?,
            day: number(4)?,
        })
    }
}

impl Display for WorldDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.year, self.month, self.day)
    }
}

impl Serialize for WorldDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WorldDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Elapsed time decomposed into calendar units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateSpan {
    pub years: i64,
    pub months: i64,
    pub days: i64,
}

impl DateSpan {
    /// Splits a non-negative day count by 360, then by 30.
    pub fn from_days(total: i64) -> Self {
        let years = total / DAYS_PER_YEAR;
        let remainder = total % DAYS_PER_YEAR;
        Self {
            years,
            months: remainder / DAYS_PER_MONTH,
            days: remainder % DAYS_PER_MONTH,
        }
    }

    pub fn total_days(&self) -> i64 {
        self.years * DAYS_PER_YEAR + self.months * DAYS_PER_MONTH + self.days
    }
}

impl Display for DateSpan {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}y {}m {}d", self.years, self.months, self.days)
    }
}
