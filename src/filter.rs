use anyhow::{Context, Result, anyhow};

use crate::data::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Eq,
    NotEq,
    Gt,
    Ge,
    Lt,
    Le,
    Contains,
    StartsWith,
    EndsWith,
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    pub column: String,
    pub operator: ComparisonOperator,
    pub raw_value: String,
}

impl FilterCondition {
    pub fn parse(filter: &str) -> Result<Self> {
        parse_filter(filter)
    }
}

pub fn parse_filters(filters: &[String]) -> Result<Vec<FilterCondition>> {
    filters.iter().map(|f| parse_filter(f)).collect()
}

fn parse_filter(filter: &str) -> Result<FilterCondition> {
    let trimmed = filter.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Empty filter expression"));
    }

    let lowered = trimmed.to_ascii_lowercase();
    for (suffix, op) in [
        (" is not null", ComparisonOperator::IsNotNull),
        (" is null", ComparisonOperator::IsNull),
    ] {
        if let Some(column) = lowered.strip_suffix(suffix) {
            let column = trimmed[..column.len()].trim();
            if column.is_empty() {
                return Err(anyhow!("Filter '{trimmed}' is missing a column"));
            }
            return Ok(FilterCondition {
                column: column.to_string(),
                operator: op,
                raw_value: String::new(),
            });
        }
    }

    for (needle, op) in [
        (" contains ", ComparisonOperator::Contains),
        (" startswith ", ComparisonOperator::StartsWith),
        (" endswith ", ComparisonOperator::EndsWith),
    ] {
        if let Some(idx) = lowered.find(needle) {
            let (left, right_with_space) = trimmed.split_at(idx);
            let right = right_with_space[needle.len()..].trim();
            return Ok(FilterCondition {
                column: left.trim().to_string(),
                operator: op,
                raw_value: unquote(right).to_string(),
            });
        }
    }

    for needle in ["!=", ">=", "<=", "=", ">", "<"] {
        if let Some(idx) = trimmed.find(needle) {
            let op = match needle {
                "=" => ComparisonOperator::Eq,
                "!=" => ComparisonOperator::NotEq,
                ">" => ComparisonOperator::Gt,
                ">=" => ComparisonOperator::Ge,
                "<" => ComparisonOperator::Lt,
                "<=" => ComparisonOperator::Le,
                _ => unreachable!(),
            };
            let left = trimmed[..idx].trim();
            if left.is_empty() {
                return Err(anyhow!("Filter '{trimmed}' is missing a column"));
            }
            let right = trimmed[idx + needle.len()..].trim();
            return Ok(FilterCondition {
                column: left.to_string(),
                operator: op,
                raw_value: unquote(right).to_string(),
            });
        }
    }

    Err(anyhow!("Failed to parse filter expression '{trimmed}'"))
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2 {
        let bytes = value.as_bytes();
        if (bytes[0] == b'"' && bytes[value.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[value.len() - 1] == b'\'')
        {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Evaluates one condition against a cell. The operand is typed after the
/// cell, so `price_major > 10` compares numerically and
/// `release_date >= 2020-01-01` compares dates.
pub fn evaluate_condition(condition: &FilterCondition, cell: Option<&Value>) -> Result<bool> {
    use ComparisonOperator::*;
    match condition.operator {
        IsNull => Ok(cell.is_none()),
        IsNotNull => Ok(cell.is_some()),
        Contains | StartsWith | EndsWith => {
            let Some(value) = cell else {
                return Ok(false);
            };
            let haystack = value.as_display();
            let needle = condition.raw_value.as_str();
            Ok(match condition.operator {
                Contains => haystack.contains(needle),
                StartsWith => haystack.starts_with(needle),
                EndsWith => haystack.ends_with(needle),
                _ => unreachable!(),
            })
        }
        Eq | NotEq | Gt | Ge | Lt | Le => {
            let Some(left) = cell else {
                return Ok(matches!(condition.operator, NotEq));
            };
            let right = left
                .parse_like(&condition.raw_value)
                .with_context(|| format!("Filter on column '{}'", condition.column))?;
            Ok(match condition.operator {
                Eq => left.cmp(&right).is_eq(),
                NotEq => !left.cmp(&right).is_eq(),
                Gt => left > &right,
                Ge => left >= &right,
                Lt => left < &right,
                Le => left <= &right,
                _ => unreachable!(),
            })
        }
    }
}
