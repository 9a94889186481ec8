use rayon::prelude::*;
use regex::Regex;

use crate::{
    data::Value,
    error::PipelineError,
    frame::Frame,
    games::{GameRecord, GameTable},
    temporal::PeriodBucket,
};

pub const DEFAULT_CATEGORY_DELIMITER: &str = r",\s*";

#[derive(Debug, Clone)]
pub struct CategorySplitter {
    delimiter: Regex,
}

impl CategorySplitter {
    pub fn new(pattern: &str) -> Result<Self, PipelineError> {
        let delimiter =
            Regex::new(pattern).map_err(|source| PipelineError::InvalidCategoryDelimiter {
                pattern: pattern.to_string(),
                source,
            })?;
        Ok(Self { delimiter })
    }

    /// Trimmed, non-empty tokens in their original order.
    pub fn split(&self, raw: Option<&str>) -> Vec<String> {
        let Some(raw) = raw else {
            return Vec::new();
        };
        self.delimiter
            .split(raw)
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl Default for CategorySplitter {
    fn default() -> Self {
        Self::new(DEFAULT_CATEGORY_DELIMITER).expect("default category delimiter compiles")
    }
}

/// One (entity, category) membership with the attributes per-category
/// aggregation needs.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryRow {
    pub entity_id: String,
    pub category: String,
    pub external_id: Option<i64>,
    pub name: Option<String>,
    pub price: Option<f64>,
    pub price_major: Option<f64>,
    pub positive: Option<i64>,
    pub negative: Option<i64>,
    pub total_reviews: Option<i64>,
    pub positive_ratio: Option<f64>,
    pub platform_windows: bool,
    pub platform_mac: bool,
    pub platform_linux: bool,
    pub period_bucket: PeriodBucket,
}

pub const CATEGORY_COLUMNS: &[&str] = &[
    "entity_id",
    "category",
    "external_id",
    "name",
    "price",
    "price_major",
    "positive",
    "negative",
    "total_reviews",
    "positive_ratio",
    "platform_windows",
    "platform_mac",
    "platform_linux",
    "period_bucket",
];

impl CategoryRow {
    fn from_record(record: &GameRecord, category: &str) -> Self {
        Self {
            entity_id: record.entity_id.clone(),
            category: category.to_string(),
            external_id: record.external_id,
            name: record.name.clone(),
            price: record.price,
            price_major: record.price_major,
            positive: record.positive,
            negative: record.negative,
            total_reviews: record.total_reviews,
            positive_ratio: record.positive_ratio,
            platform_windows: record.platform_windows,
            platform_mac: record.platform_mac,
            platform_linux: record.platform_linux,
            period_bucket: record.period_bucket,
        }
    }

    pub fn to_row(&self) -> Vec<Option<Value>> {
        vec![
            Some(Value::String(self.entity_id.clone())),
            Some(Value::String(self.category.clone())),
            self.external_id.map(Value::Integer),
            self.name.clone().map(Value::String),
            self.price.map(Value::Float),
            self.price_major.map(Value::Float),
            self.positive.map(Value::Integer),
            self.negative.map(Value::Integer),
            self.total_reviews.map(Value::Integer),
            self.positive_ratio.map(Value::Float),
            Some(Value::Boolean(self.platform_windows)),
            Some(Value::Boolean(self.platform_mac)),
            Some(Value::Boolean(self.platform_linux)),
            Some(Value::String(self.period_bucket.as_str().to_string())),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryTable {
    rows: Vec<CategoryRow>,
}

impl CategoryTable {
    pub fn rows(&self) -> &[CategoryRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_frame(&self) -> Frame {
        let rows = self.rows.par_iter().map(CategoryRow::to_row).collect();
        Frame::new(CATEGORY_COLUMNS.iter().map(|c| c.to_string()).collect(), rows)
    }
}

/// Materializes one row per element of every record's `category_list`.
pub fn explode(games: &GameTable) -> CategoryTable {
    let rows = games
        .records()
        .par_iter()
        .flat_map_iter(|record| {
            record
                .category_list
                .iter()
                .map(move |category| CategoryRow::from_record(record, category))
        })
        .collect();
    CategoryTable { rows }
}
