use rayon::prelude::*;
use serde_json::Value as JsonValue;

use crate::{
    coerce::{parse_flag, to_integer},
    error::PipelineError,
    games::{GameRecord, GameTable},
};

pub const IDENTIFIER_FIELD: &str = "id";

/// Source paths of the projected columns, in output order.
pub const FIELD_PATHS: &[(&str, &str)] = &[
    ("external_id", "data.appid"),
    ("name", "data.name"),
    ("category_raw", "data.genre"),
    ("publisher", "data.publisher"),
    ("developer", "data.developer"),
    ("product_type", "data.type"),
    ("price_raw", "data.price"),
    ("initial_price_raw", "data.initialprice"),
    ("discount_raw", "data.discount"),
    ("age_rating_raw", "data.required_age"),
    ("positive_count_raw", "data.positive"),
    ("negative_count_raw", "data.negative"),
    ("languages_raw", "data.languages"),
    ("owners_raw", "data.owners"),
    ("ccu_raw", "data.ccu"),
    ("platform_windows", "data.platforms.windows"),
    ("platform_mac", "data.platforms.mac"),
    ("platform_linux", "data.platforms.linux"),
    ("release_date_raw", "data.release_date"),
];

fn source_path(column: &str) -> &'static str {
    FIELD_PATHS
        .iter()
        .find(|(name, _)| *name == column)
        .map(|(_, path)| *path)
        .unwrap_or("")
}

pub fn lookup<'a>(record: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    path.split('.')
        .try_fold(record, |current, segment| current.get(segment))
}

/// Scalar at `path` rendered as text; containers and nulls are absent.
pub fn text_at(record: &JsonValue, path: &str) -> Option<String> {
    match lookup(record, path)? {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}

/// Platform-style flag at `path`; anything unrecognised counts as false.
pub fn flag_at(record: &JsonValue, path: &str) -> bool {
    match lookup(record, path) {
        Some(JsonValue::Bool(b)) => *b,
        Some(JsonValue::String(s)) => parse_flag(s).unwrap_or(false),
        Some(JsonValue::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    }
}

pub fn identifier(record: &JsonValue) -> Option<String> {
    match record.get(IDENTIFIER_FIELD)? {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Flattens one record, or `None` when it has no usable identifier.
pub fn flatten_record(record: &JsonValue) -> Option<GameRecord> {
    let entity_id = identifier(record)?;
    let field = |column: &str| text_at(record, source_path(column));
    let flag = |column: &str| flag_at(record, source_path(column));
    Some(GameRecord {
        entity_id,
        external_id: to_integer(field("external_id").as_deref()),
        name: field("name"),
        category_raw: field("category_raw"),
        publisher: field("publisher"),
        developer: field("developer"),
        product_type: field("product_type"),
        price_raw: field("price_raw"),
        initial_price_raw: field("initial_price_raw"),
        discount_raw: field("discount_raw"),
        age_rating_raw: field("age_rating_raw"),
        positive_count_raw: field("positive_count_raw"),
        negative_count_raw: field("negative_count_raw"),
        languages_raw: field("languages_raw"),
        owners_raw: field("owners_raw"),
        ccu_raw: field("ccu_raw"),
        platform_windows: flag("platform_windows"),
        platform_mac: flag("platform_mac"),
        platform_linux: flag("platform_linux"),
        release_date_raw: field("release_date_raw"),
        ..GameRecord::default()
    })
}

#[derive(Debug)]
pub struct Flattened {
    pub table: GameTable,
    pub skipped_missing_id: usize,
}

pub fn has_identifier_field(record: &JsonValue) -> bool {
    record.get(IDENTIFIER_FIELD).is_some()
}

/// Flattens a batch, dropping and counting records without an identifier.
pub fn flatten_records(records: &[JsonValue]) -> Flattened {
    let flattened: Vec<Option<GameRecord>> = records.par_iter().map(flatten_record).collect();
    let skipped_missing_id = flattened.iter().filter(|r| r.is_none()).count();
    Flattened {
        table: GameTable::new(flattened.into_iter().flatten().collect()),
        skipped_missing_id,
    }
}

/// Like [`flatten_records`], but fails when the identifier column is absent
/// from every record of a non-empty input.
pub fn flatten_all(records: &[JsonValue]) -> Result<Flattened, PipelineError> {
    if !records.is_empty() && !records.par_iter().any(has_identifier_field) {
        return Err(PipelineError::MissingIdentifierColumn {
            field: IDENTIFIER_FIELD,
            records: records.len(),
        });
    }
    Ok(flatten_records(records))
}
