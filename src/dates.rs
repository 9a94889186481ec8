//! Release date cleanup and parsing. Patterns support `yyyy`, `MMMM`, `MMM`,
//! `MM`, `M`, `dd` and `d`; any other character matches literally.

use std::{borrow::Cow, sync::OnceLock};

use chrono::NaiveDate;
use regex::{Captures, Regex};

use crate::error::PipelineError;

pub const DEFAULT_DATE_FORMATS: &[&str] = &[
    "MMM d yyyy",
    "MMM dd yyyy",
    "yyyy-MM-dd",
    "dd MMM yyyy",
    "d MMM yyyy",
];

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

fn dash_digits() -> &'static Regex {
    static DASH_DIGITS: OnceLock<Regex> = OnceLock::new();
    DASH_DIGITS.get_or_init(|| Regex::new(r"-([0-9]+)").expect("dash digit pattern is valid"))
}

/// Applies the textual clean-up that precedes pattern matching.
///
/// Already-clean canonical dates pass through unchanged.
pub fn clean_date_text(raw: &str) -> String {
    let without_commas: Cow<'_, str> = if raw.contains(',') {
        Cow::Owned(raw.replace(',', ""))
    } else {
        Cow::Borrowed(raw)
    };
    let dashed: Cow<'_, str> = if without_commas.contains('/') {
        Cow::Owned(without_commas.replace('/', "-"))
    } else {
        without_commas
    };
    // A run of exactly one digit after '-' is the only thing padded; longer
    // runs are left alone.
    dash_digits()
        .replace_all(&dashed, |caps: &Captures<'_>| {
            let digits = &caps[1];
            if digits.len() == 1 {
                format!("-0{digits}")
            } else {
                format!("-{digits}")
            }
        })
        .into_owned()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateField {
    Year,
    MonthNumber,
    MonthShortName,
    MonthLongName,
    Day,
}

/// One compiled candidate format.
#[derive(Debug, Clone)]
pub struct DatePattern {
    source: String,
    regex: Regex,
    fields: Vec<DateField>,
}

impl DatePattern {
    pub fn compile(pattern: &str) -> Result<Self, PipelineError> {
        let invalid = |reason: String| PipelineError::InvalidDatePattern {
            pattern: pattern.to_string(),
            reason,
        };
        let mut expression = String::from("^");
        let mut fields = Vec::new();
        let mut chars = pattern.chars().peekable();
        while let Some(ch) = chars.next() {
            if !ch.is_ascii_alphabetic() {
                expression.push_str(&regex::escape(ch.encode_utf8(&mut [0u8; 4])));
                continue;
            }
            let mut width = 1usize;
            while chars.peek() == Some(&ch) {
                chars.next();
                width += 1;
            }
            let (field, fragment) = match (ch, width) {
                ('y', 4) => (DateField::Year, "([0-9]{4})"),
                ('M', 1) => (DateField::MonthNumber, "([0-9]{1,2})"),
                ('M', 2) => (DateField::MonthNumber, "([0-9]{2})"),
                ('M', 3) => (DateField::MonthShortName, "([A-Za-z]{3})"),
                ('M', 4) => (DateField::MonthLongName, "([A-Za-z]+)"),
                ('d', 1) => (DateField::Day, "([0-9]{1,2})"),
                ('d', 2) => (DateField::Day, "([0-9]{2})"),
                _ => {
                    let token = ch.to_string().repeat(width);
                    return Err(invalid(format!("unsupported token '{token}'")));
                }
            };
            let kind = field_kind(field);
            if fields.iter().any(|existing| field_kind(*existing) == kind) {
                return Err(invalid(format!("{kind} appears more than once")));
            }
            fields.push(field);
            expression.push_str(fragment);
        }
        expression.push('$');
        for kind in ["year", "month", "day"] {
            if !fields.iter().any(|field| field_kind(*field) == kind) {
                return Err(invalid(format!("missing {kind} component")));
            }
        }
        let regex = Regex::new(&expression).map_err(|err| invalid(err.to_string()))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
            fields,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parses `text` when the whole string matches and names a real calendar day.
    pub fn parse(&self, text: &str) -> Option<NaiveDate> {
        let caps = self.regex.captures(text)?;
        let mut year = None;
        let mut month = None;
        let mut day = None;
        for (idx, field) in self.fields.iter().enumerate() {
            let token = caps.get(idx + 1)?.as_str();
            match field {
                DateField::Year => year = token.parse::<i32>().ok(),
                DateField::MonthNumber => month = token.parse::<u32>().ok(),
                DateField::MonthShortName => month = month_from_name(token, true),
                DateField::MonthLongName => month = month_from_name(token, false),
                DateField::Day => day = token.parse::<u32>().ok(),
            }
        }
        NaiveDate::from_ymd_opt(year?, month?, day?)
    }
}

fn field_kind(field: DateField) -> &'static str {
    match field {
        DateField::Year => "year",
        DateField::MonthNumber | DateField::MonthShortName | DateField::MonthLongName => "month",
        DateField::Day => "day",
    }
}

fn month_from_name(token: &str, abbreviated: bool) -> Option<u32> {
    let lowered = token.to_ascii_lowercase();
    MONTH_NAMES
        .iter()
        .position(|name| {
            if abbreviated {
                name.get(..3) == Some(lowered.as_str())
            } else {
                *name == lowered
            }
        })
        .map(|idx| idx as u32 + 1)
}

/// Result of normalizing a single raw date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDate {
    pub cleaned: String,
    pub date: Option<NaiveDate>,
}

/// Ordered, first-match-wins list of candidate patterns.
#[derive(Debug, Clone)]
pub struct DateNormalizer {
    patterns: Vec<DatePattern>,
}

impl DateNormalizer {
    pub fn new<S: AsRef<str>>(formats: &[S]) -> Result<Self, PipelineError> {
        let patterns = formats
            .iter()
            .map(|format| DatePattern::compile(format.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn patterns(&self) -> &[DatePattern] {
        &self.patterns
    }

    /// Returns the parsed date and the position of the pattern that matched.
    pub fn parse_with_position(&self, cleaned: &str) -> Option<(NaiveDate, usize)> {
        self.patterns
            .iter()
            .enumerate()
            .find_map(|(idx, pattern)| pattern.parse(cleaned).map(|date| (date, idx)))
    }

    pub fn parse(&self, cleaned: &str) -> Option<NaiveDate> {
        self.parse_with_position(cleaned).map(|(date, _)| date)
    }

    pub fn normalize(&self, raw: &str) -> NormalizedDate {
        let cleaned = clean_date_text(raw);
        let date = self.parse(&cleaned);
        NormalizedDate { cleaned, date }
    }
}

impl Default for DateNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_DATE_FORMATS).expect("default date formats compile")
    }
}
