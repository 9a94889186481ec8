use std::{cmp::Ordering, fmt};

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::coerce::parse_flag;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single typed cell of a [`Frame`](crate::frame::Frame).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for Value {}

impl Value {
    pub fn as_display(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    format!("{f:.1}")
                } else {
                    f.to_string()
                }
            }
            Value::Boolean(b) => b.to_string(),
            Value::Date(d) => d.format(DATE_FORMAT).to_string(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Boolean(_) => 0,
            Value::Integer(_) | Value::Float(_) => 1,
            Value::Date(_) => 2,
            Value::String(_) => 3,
        }
    }

    /// Parses `raw` into the same variant as `self`, used to type filter operands.
    pub fn parse_like(&self, raw: &str) -> Result<Value> {
        let trimmed = raw.trim();
        let parsed = match self {
            Value::String(_) => Value::String(raw.to_string()),
            Value::Integer(_) => match trimmed.parse::<i64>() {
                Ok(i) => Value::Integer(i),
                Err(_) => Value::Float(
                    trimmed
                        .parse::<f64>()
                        .with_context(|| format!("Failed to parse '{raw}' as a number"))?,
                ),
            },
            Value::Float(_) => Value::Float(
                trimmed
                    .parse::<f64>()
                    .with_context(|| format!("Failed to parse '{raw}' as a number"))?,
            ),
            Value::Boolean(_) => Value::Boolean(
                parse_flag(trimmed).ok_or_else(|| anyhow!("Failed to parse '{raw}' as boolean"))?,
            ),
            Value::Date(_) => Value::Date(
                NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
                    .with_context(|| format!("Failed to parse '{raw}' as date"))?,
            ),
        };
        Ok(parsed)
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => unsigned_zero(*a).total_cmp(&unsigned_zero(*b)),
            (Value::Integer(a), Value::Float(b)) => (*a as f64).total_cmp(&unsigned_zero(*b)),
            (Value::Float(a), Value::Integer(b)) => unsigned_zero(*a).total_cmp(&(*b as f64)),
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

// `total_cmp` orders -0.0 below 0.0.
fn unsigned_zero(value: f64) -> f64 {
    if value == 0.0 { 0.0 } else { value }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// Null-aware ordering wrapper: nulls sort before every value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComparableValue(pub Option<Value>);

impl Ord for ComparableValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (&self.0, &other.0) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(left), Some(right)) => left.cmp(right),
        }
    }
}

impl PartialOrd for ComparableValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub fn display_cell(value: Option<&Value>) -> String {
    value.map(Value::as_display).unwrap_or_default()
}
