use std::sync::OnceLock;

use regex::Regex;

/// Scale between minor currency units (cents) and major units.
pub const MINOR_UNITS_PER_MAJOR: f64 = 100.0;

fn digit_run() -> &'static Regex {
    static DIGIT_RUN: OnceLock<Regex> = OnceLock::new();
    DIGIT_RUN.get_or_init(|| Regex::new(r"[0-9]+").expect("digit run pattern is valid"))
}

pub fn to_float(raw: Option<&str>) -> Option<f64> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(|value| if value == 0.0 { 0.0 } else { value })
}

/// Integer cast that also accepts integral-looking floats (`"12.0"`, `"1e3"`),
/// truncating toward zero.
pub fn to_integer(raw: Option<&str>) -> Option<i64> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = trimmed.parse::<i64>() {
        return Some(value);
    }
    let float = trimmed.parse::<f64>().ok().filter(|value| value.is_finite())?;
    let truncated = float.trunc();
    if truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
        Some(truncated as i64)
    } else {
        None
    }
}

/// First contiguous digit run anywhere in the text, e.g. `"PEGI 16+"` -> 16.
pub fn extract_first_integer(raw: Option<&str>) -> Option<i64> {
    let found = digit_run().find(raw?)?;
    found.as_str().parse::<i64>().ok()
}

pub fn minor_to_major(minor: Option<f64>) -> Option<f64> {
    minor.map(|value| value / MINOR_UNITS_PER_MAJOR)
}

pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

/// Count of trimmed, non-empty comma-separated tokens.
pub fn count_list_items(raw: Option<&str>) -> Option<i64> {
    let raw = raw?;
    Some(
        raw.split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .count() as i64,
    )
}

/// Outcome of coercing a field, distinguishing "absent" from "present but unusable".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coerced<T> {
    Missing,
    Value(T),
    Uncastable,
}

impl<T> Coerced<T> {
    pub fn from_attempt(raw: Option<&str>, attempt: impl FnOnce(Option<&str>) -> Option<T>) -> Self {
        match raw {
            None => Coerced::Missing,
            Some(text) if text.trim().is_empty() => Coerced::Missing,
            Some(_) => match attempt(raw) {
                Some(value) => Coerced::Value(value),
                None => Coerced::Uncastable,
            },
        }
    }

    pub fn is_uncastable(&self) -> bool {
        matches!(self, Coerced::Uncastable)
    }

    pub fn value(self) -> Option<T> {
        match self {
            Coerced::Value(value) => Some(value),
            Coerced::Missing | Coerced::Uncastable => None,
        }
    }
}
