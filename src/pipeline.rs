use std::collections::BTreeMap;

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::{
    categories::{self, CategorySplitter, CategoryTable},
    coerce::{self, Coerced},
    config::{CompiledConfig, PipelineConfig},
    dates::DateNormalizer,
    error::PipelineError,
    flatten,
    games::{GameRecord, GameTable},
    platforms::PlatformProfile,
    popularity,
    temporal::{self, PeriodBounds},
};

/// Columns whose coercion failures are tallied in [`RunSummary::uncastable`].
pub const COERCED_COLUMNS: &[&str] = &[
    "price",
    "initial_price",
    "discount",
    "age_numeric",
    "positive",
    "negative",
    "ccu",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub records_read: usize,
    pub records_kept: usize,
    pub skipped_missing_id: usize,
    pub dates_unparsed: usize,
    pub uncastable: BTreeMap<String, usize>,
    pub category_rows: usize,
}

impl RunSummary {
    pub fn merge(mut self, other: RunSummary) -> RunSummary {
        self.records_read += other.records_read;
        self.records_kept += other.records_kept;
        self.skipped_missing_id += other.skipped_missing_id;
        self.dates_unparsed += other.dates_unparsed;
        self.category_rows += other.category_rows;
        for (column, count) in other.uncastable {
            *self.uncastable.entry(column).or_insert(0) += count;
        }
        self
    }

    pub fn skipped_ratio(&self) -> f64 {
        if self.records_read == 0 {
            0.0
        } else {
            self.skipped_missing_id as f64 / self.records_read as f64
        }
    }

    pub fn total_uncastable(&self) -> usize {
        self.uncastable.values().sum()
    }

    fn observe(mut self, record: &GameRecord) -> RunSummary {
        self.records_kept += 1;
        self.category_rows += record.category_list.len();
        if present(&record.release_date_raw) && record.release_date.is_none() {
            self.dates_unparsed += 1;
        }
        for (column, raw, failed) in [
            ("price", &record.price_raw, record.price.is_none()),
            ("initial_price", &record.initial_price_raw, record.initial_price.is_none()),
            ("discount", &record.discount_raw, record.discount.is_none()),
            ("age_numeric", &record.age_rating_raw, record.age_numeric.is_none()),
            ("positive", &record.positive_count_raw, record.positive.is_none()),
            ("negative", &record.negative_count_raw, record.negative.is_none()),
            ("ccu", &record.ccu_raw, record.ccu.is_none()),
        ] {
            if failed && present(raw) {
                *self.uncastable.entry(column.to_string()).or_insert(0) += 1;
            }
        }
        self
    }

    fn with_zeroed_columns(mut self) -> RunSummary {
        for column in COERCED_COLUMNS {
            self.uncastable.entry(column.to_string()).or_insert(0);
        }
        self
    }
}

fn present(raw: &Option<String>) -> bool {
    raw.as_deref().is_some_and(|text| !text.trim().is_empty())
}

#[derive(Debug)]
pub struct PipelineOutput {
    pub games: GameTable,
    pub categories: CategoryTable,
    pub summary: RunSummary,
}

pub fn coerce_stage(table: GameTable) -> GameTable {
    table.map_records(coerce_record)
}

fn coerce_record(mut record: GameRecord) -> GameRecord {
    let float = |raw: &Option<String>| Coerced::from_attempt(raw.as_deref(), coerce::to_float).value();
    let integer =
        |raw: &Option<String>| Coerced::from_attempt(raw.as_deref(), coerce::to_integer).value();

    record.price = float(&record.price_raw);
    record.initial_price = float(&record.initial_price_raw);
    record.discount = float(&record.discount_raw);
    record.price_major = coerce::minor_to_major(record.price);
    record.initial_price_major = coerce::minor_to_major(record.initial_price);
    record.age_numeric =
        Coerced::from_attempt(record.age_rating_raw.as_deref(), coerce::extract_first_integer)
            .value();
    record.positive = integer(&record.positive_count_raw);
    record.negative = integer(&record.negative_count_raw);
    record.ccu = integer(&record.ccu_raw);
    record.language_count = coerce::count_list_items(record.languages_raw.as_deref());
    record
}

pub fn date_stage(table: GameTable, dates: &DateNormalizer) -> GameTable {
    table.map_records(|mut record| {
        match record.release_date_raw.as_deref() {
            Some(raw) => {
                let normalized = dates.normalize(raw);
                record.release_date_clean = Some(normalized.cleaned);
                record.release_date = normalized.date;
            }
            None => {
                record.release_date_clean = None;
                record.release_date = None;
            }
        }
        record
    })
}

pub fn temporal_stage(table: GameTable, bounds: &PeriodBounds) -> GameTable {
    table.map_records(|mut record| {
        let features = temporal::derive(record.release_date, bounds);
        record.release_year = features.year;
        record.release_month = features.month;
        record.period_bucket = features.bucket;
        record
    })
}

pub fn popularity_stage(table: GameTable) -> GameTable {
    table.map_records(|mut record| {
        let metrics = popularity::compute(record.positive, record.negative);
        record.total_reviews = metrics.total_reviews;
        record.positive_ratio = metrics.positive_ratio;
        record
    })
}

pub fn platform_stage(table: GameTable) -> GameTable {
    table.map_records(|mut record| {
        record.platform_profile = PlatformProfile::classify(
            record.platform_windows,
            record.platform_mac,
            record.platform_linux,
        );
        record
    })
}

pub fn category_stage(table: GameTable, splitter: &CategorySplitter) -> GameTable {
    table.map_records(|mut record| {
        record.category_list = splitter.split(record.category_raw.as_deref());
        record
    })
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    compiled: CompiledConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        let compiled = config.compile()?;
        Ok(Self { config, compiled })
    }

    /// Runs every derivation stage over an already flattened table.
    pub fn derive(&self, table: GameTable) -> GameTable {
        let table = coerce_stage(table);
        let table = date_stage(table, &self.compiled.dates);
        let table = temporal_stage(table, &self.compiled.bounds);
        let table = popularity_stage(table);
        let table = platform_stage(table);
        category_stage(table, &self.compiled.categories)
    }

    pub fn run(&self, records: &[JsonValue]) -> Result<PipelineOutput, PipelineError> {
        let flattened = flatten::flatten_all(records)?;
        debug!(
            "Flattened {} record(s), {} without identifier",
            flattened.table.len(),
            flattened.skipped_missing_id
        );
        let games = self.derive(flattened.table);
        let categories = categories::explode(&games);
        let summary = RunSummary {
            records_read: records.len(),
            skipped_missing_id: flattened.skipped_missing_id,
            ..summarize(&games)
        };
        self.report(&summary);
        Ok(PipelineOutput {
            games,
            categories,
            summary,
        })
    }

    /// Same result as [`Pipeline::run`], processing the input in independent
    /// partitions of `chunk_size` records.
    pub fn run_chunked(
        &self,
        records: &[JsonValue],
        chunk_size: usize,
    ) -> Result<PipelineOutput, PipelineError> {
        let chunk_size = chunk_size.max(1);
        if !records.is_empty() && !records.par_iter().any(flatten::has_identifier_field) {
            return Err(PipelineError::MissingIdentifierColumn {
                field: flatten::IDENTIFIER_FIELD,
                records: records.len(),
            });
        }
        let partials = records
            .par_chunks(chunk_size)
            .map(|chunk| {
                let flattened = flatten::flatten_records(chunk);
                let games = self.derive(flattened.table);
                let summary = RunSummary {
                    records_read: chunk.len(),
                    skipped_missing_id: flattened.skipped_missing_id,
                    ..summarize(&games)
                };
                (games, summary)
            })
            .collect::<Vec<_>>();

        let mut tables = Vec::with_capacity(partials.len());
        let mut summary = RunSummary::default().with_zeroed_columns();
        for (games, partial) in partials {
            tables.push(games);
            summary = summary.merge(partial);
        }
        let games = GameTable::concat(tables);
        let categories = categories::explode(&games);
        debug!(
            "Processed {} partition(s) of up to {chunk_size} record(s)",
            records.len().div_ceil(chunk_size)
        );
        self.report(&summary);
        Ok(PipelineOutput {
            games,
            categories,
            summary,
        })
    }

    fn report(&self, summary: &RunSummary) {
        info!(
            "Read {} record(s); kept {}, skipped {} without identifier",
            summary.records_read, summary.records_kept, summary.skipped_missing_id
        );
        info!(
            "{} unparsed release date(s), {} uncastable value(s), {} category row(s)",
            summary.dates_unparsed,
            summary.total_uncastable(),
            summary.category_rows
        );
        if summary.skipped_ratio() > self.config.max_skipped_ratio {
            warn!(
                "{:.1}% of records were dropped for a missing identifier (threshold {:.1}%)",
                summary.skipped_ratio() * 100.0,
                self.config.max_skipped_ratio * 100.0
            );
        }
    }
}

pub fn summarize(games: &GameTable) -> RunSummary {
    games
        .records()
        .par_iter()
        .fold(RunSummary::default, RunSummary::observe)
        .reduce(RunSummary::default, RunSummary::merge)
        .with_zeroed_columns()
}
