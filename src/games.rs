use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;

use crate::{
    data::Value,
    frame::Frame,
    platforms::PlatformProfile,
    temporal::PeriodBucket,
};

/// Separator used when `category_list` is rendered into a single cell.
pub const CATEGORY_LIST_SEPARATOR: &str = "|";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GameRecord {
    pub entity_id: String,
    pub external_id: Option<i64>,
    pub name: Option<String>,
    pub category_raw: Option<String>,
    pub publisher: Option<String>,
    pub developer: Option<String>,
    pub product_type: Option<String>,
    pub price_raw: Option<String>,
    pub initial_price_raw: Option<String>,
    pub discount_raw: Option<String>,
    pub age_rating_raw: Option<String>,
    pub positive_count_raw: Option<String>,
    pub negative_count_raw: Option<String>,
    pub languages_raw: Option<String>,
    pub owners_raw: Option<String>,
    pub ccu_raw: Option<String>,
    pub platform_windows: bool,
    pub platform_mac: bool,
    pub platform_linux: bool,
    pub release_date_raw: Option<String>,

    pub price: Option<f64>,
    pub initial_price: Option<f64>,
    pub discount: Option<f64>,
    pub price_major: Option<f64>,
    pub initial_price_major: Option<f64>,
    pub age_numeric: Option<i64>,
    pub positive: Option<i64>,
    pub negative: Option<i64>,
    pub ccu: Option<i64>,
    pub language_count: Option<i64>,
    pub total_reviews: Option<i64>,
    pub positive_ratio: Option<f64>,
    pub release_date_clean: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub release_year: Option<i32>,
    pub release_month: Option<u32>,
    pub period_bucket: PeriodBucket,
    pub platform_profile: PlatformProfile,
    pub category_list: Vec<String>,
}

pub const GAME_COLUMNS: &[&str] = &[
    "entity_id",
    "external_id",
    "name",
    "category_raw",
    "publisher",
    "developer",
    "product_type",
    "price_raw",
    "initial_price_raw",
    "discount_raw",
    "age_rating_raw",
    "positive_count_raw",
    "negative_count_raw",
    "languages_raw",
    "owners_raw",
    "ccu_raw",
    "platform_windows",
    "platform_mac",
    "platform_linux",
    "release_date_raw",
    "price",
    "initial_price",
    "discount",
    "price_major",
    "initial_price_major",
    "age_numeric",
    "positive",
    "negative",
    "ccu",
    "language_count",
    "total_reviews",
    "positive_ratio",
    "release_date_clean",
    "release_date",
    "release_year",
    "release_month",
    "period_bucket",
    "platform_profile",
    "category_list",
];

fn text(value: &Option<String>) -> Option<Value> {
    value.clone().map(Value::String)
}

fn int(value: Option<i64>) -> Option<Value> {
    value.map(Value::Integer)
}

fn float(value: Option<f64>) -> Option<Value> {
    value.map(Value::Float)
}

fn flag(value: bool) -> Option<Value> {
    Some(Value::Boolean(value))
}

impl GameRecord {
    /// Cells in [`GAME_COLUMNS`] order.
    pub fn to_row(&self) -> Vec<Option<Value>> {
        vec![
            Some(Value::String(self.entity_id.clone())),
            int(self.external_id),
            text(&self.name),
            text(&self.category_raw),
            text(&self.publisher),
            text(&self.developer),
            text(&self.product_type),
            text(&self.price_raw),
            text(&self.initial_price_raw),
            text(&self.discount_raw),
            text(&self.age_rating_raw),
            text(&self.positive_count_raw),
            text(&self.negative_count_raw),
            text(&self.languages_raw),
            text(&self.owners_raw),
            text(&self.ccu_raw),
            flag(self.platform_windows),
            flag(self.platform_mac),
            flag(self.platform_linux),
            text(&self.release_date_raw),
            float(self.price),
            float(self.initial_price),
            float(self.discount),
            float(self.price_major),
            float(self.initial_price_major),
            int(self.age_numeric),
            int(self.positive),
            int(self.negative),
            int(self.ccu),
            int(self.language_count),
            int(self.total_reviews),
            float(self.positive_ratio),
            text(&self.release_date_clean),
            self.release_date.map(Value::Date),
            int(self.release_year.map(i64::from)),
            int(self.release_month.map(i64::from)),
            Some(Value::String(self.period_bucket.as_str().to_string())),
            Some(Value::String(self.platform_profile.as_str().to_string())),
            Some(Value::String(
                self.category_list.join(CATEGORY_LIST_SEPARATOR),
            )),
        ]
    }
}

/// Immutable-by-convention table value handed from stage to stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameTable {
    records: Vec<GameRecord>,
}

impl GameTable {
    pub fn new(records: Vec<GameRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[GameRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, entity_id: &str) -> Option<&GameRecord> {
        self.records.iter().find(|r| r.entity_id == entity_id)
    }

    /// Applies a per-record transformation in parallel, keeping input order.
    pub fn map_records<F>(self, f: F) -> Self
    where
        F: Fn(GameRecord) -> GameRecord + Sync + Send,
    {
        Self {
            records: self.records.into_par_iter().map(f).collect(),
        }
    }

    pub fn concat(tables: impl IntoIterator<Item = GameTable>) -> Self {
        Self {
            records: tables.into_iter().flat_map(|t| t.records).collect(),
        }
    }

    pub fn to_frame(&self) -> Frame {
        let rows = self.records.par_iter().map(GameRecord::to_row).collect();
        Frame::new(GAME_COLUMNS.iter().map(|c| c.to_string()).collect(), rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_width_matches_column_list() {
        let record = GameRecord {
            entity_id: "1".into(),
            category_list: vec!["Action".into(), "RPG".into()],
            ..GameRecord::default()
        };
        let row = record.to_row();
        assert_eq!(row.len(), GAME_COLUMNS.len());
        let last = row.last().unwrap().as_ref().unwrap();
        assert_eq!(last, &Value::String("Action|RPG".into()));
    }

    #[test]
    fn map_records_preserves_order() {
        let table = GameTable::new(
            (0..100)
                .map(|i| GameRecord {
                    entity_id: i.to_string(),
                    ..GameRecord::default()
                })
                .collect(),
        );
        let mapped = table.map_records(|mut r| {
            r.name = Some(format!("game {}", r.entity_id));
            r
        });
        assert_eq!(mapped.records()[42].name.as_deref(), Some("game 42"));
        assert_eq!(mapped.records()[99].entity_id, "99");
    }
}
