use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PERIOD_START: i32 = 2019;
pub const DEFAULT_PERIOD_END: i32 = 2021;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodBucket {
    Pre,
    During,
    Post,
    #[default]
    Unknown,
}

impl PeriodBucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodBucket::Pre => "pre",
            PeriodBucket::During => "during",
            PeriodBucket::Post => "post",
            PeriodBucket::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PeriodBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive `[start, end]` year range of the "during" bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodBounds {
    pub start: i32,
    pub end: i32,
}

impl Default for PeriodBounds {
    fn default() -> Self {
        Self {
            start: DEFAULT_PERIOD_START,
            end: DEFAULT_PERIOD_END,
        }
    }
}

impl PeriodBounds {
    pub fn classify(&self, year: Option<i32>) -> PeriodBucket {
        match year {
            None => PeriodBucket::Unknown,
            Some(year) if year < self.start => PeriodBucket::Pre,
            Some(year) if year <= self.end => PeriodBucket::During,
            Some(_) => PeriodBucket::Post,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporalFeatures {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub bucket: PeriodBucket,
}

pub fn derive(date: Option<NaiveDate>, bounds: &PeriodBounds) -> TemporalFeatures {
    let year = date.map(|d| d.year());
    TemporalFeatures {
        year,
        month: date.map(|d| d.month()),
        bucket: bounds.classify(year),
    }
}
