mod common;

use catalog_prep::{
    config::PipelineConfig,
    error::PipelineError,
    pipeline::{self, Pipeline},
    platforms::PlatformProfile,
    temporal::PeriodBucket,
};
use chrono::NaiveDate;
use common::fixture_records;
use serde_json::json;

fn default_pipeline() -> Pipeline {
    Pipeline::new(PipelineConfig::default()).expect("default config compiles")
}

#[test]
fn fixture_normalizes_every_derived_column() {
    let records = fixture_records("catalog_sample.json");
    let output = default_pipeline().run(&records).expect("run pipeline");

    assert_eq!(output.games.len(), 4);
    let cs = output.games.get("10").expect("record 10");
    assert_eq!(cs.external_id, Some(10));
    assert_eq!(cs.price, Some(999.0));
    assert_eq!(cs.price_major, Some(9.99));
    assert_eq!(cs.age_numeric, Some(0));
    assert_eq!(cs.language_count, Some(3));
    assert_eq!(cs.ccu, Some(12000));
    assert_eq!(cs.release_date, NaiveDate::from_ymd_opt(2000, 11, 1));
    assert_eq!(cs.release_year, Some(2000));
    assert_eq!(cs.period_bucket, PeriodBucket::Pre);
    assert_eq!(cs.total_reviews, Some(100));
    assert_eq!(cs.positive_ratio, Some(0.9));
    assert_eq!(cs.platform_profile, PlatformProfile::WindowsMacLinux);
    assert_eq!(cs.owners_raw.as_deref(), Some("10,000,000 .. 20,000,000"));

    let tfc = output.games.get("20").expect("record 20");
    assert_eq!(tfc.release_date_clean.as_deref(), Some("2020-03-01"));
    assert_eq!(tfc.period_bucket, PeriodBucket::During);
    assert_eq!(tfc.age_numeric, Some(16));
    assert_eq!(tfc.positive_ratio, Some(0.75));
    assert_eq!(tfc.platform_profile, PlatformProfile::WindowsLinux);
    assert_eq!(tfc.category_list, vec!["Action", "Indie"]);

    let dod = output.games.get("30").expect("record 30");
    assert_eq!(dod.price, None);
    assert_eq!(dod.release_date, None);
    assert_eq!(dod.period_bucket, PeriodBucket::Unknown);
    assert_eq!(dod.total_reviews, Some(0));
    assert_eq!(dod.positive_ratio, None);
    assert_eq!(dod.platform_profile, PlatformProfile::WindowsOnly);
    assert_eq!(dod.category_list, vec!["Indie", "RPG"]);

    let dmc = output.games.get("40").expect("record 40");
    assert_eq!(dmc.release_date, NaiveDate::from_ymd_opt(2022, 6, 23));
    assert_eq!(dmc.period_bucket, PeriodBucket::Post);
    assert!(dmc.category_list.is_empty());
    assert_eq!(dmc.platform_profile, PlatformProfile::WindowsMac);
}

#[test]
fn fixture_summary_counts() {
    let records = fixture_records("catalog_sample.json");
    let summary = default_pipeline().run(&records).expect("run").summary;
    assert_eq!(summary.records_read, 5);
    assert_eq!(summary.records_kept, 4);
    assert_eq!(summary.skipped_missing_id, 1);
    assert_eq!(summary.dates_unparsed, 1);
    assert_eq!(summary.uncastable["price"], 1);
    assert_eq!(summary.total_uncastable(), 1);
    assert_eq!(summary.category_rows, 5);
}

#[test]
fn every_bucket_is_assigned() {
    let records = fixture_records("catalog_sample.json");
    let output = default_pipeline().run(&records).expect("run");
    let mut buckets: Vec<PeriodBucket> = output
        .games
        .records()
        .iter()
        .map(|g| g.period_bucket)
        .collect();
    buckets.sort();
    assert_eq!(
        buckets,
        vec![
            PeriodBucket::Pre,
            PeriodBucket::During,
            PeriodBucket::Post,
            PeriodBucket::Unknown
        ]
    );
}

#[test]
fn configured_period_moves_bucket_edges() {
    let config = PipelineConfig::from_yaml_str("period_start: 2000\nperiod_end: 2000\n")
        .expect("config parses");
    let records = fixture_records("catalog_sample.json");
    let output = Pipeline::new(config).expect("compile").run(&records).expect("run");
    assert_eq!(
        output.games.get("10").unwrap().period_bucket,
        PeriodBucket::During
    );
    assert_eq!(output.games.get("20").unwrap().period_bucket, PeriodBucket::Post);
}

#[test]
fn configured_date_formats_replace_defaults() {
    let config = PipelineConfig::from_yaml_str("date_formats: [\"dd-MM-yyyy\"]\n").unwrap();
    let records = vec![
        json!({"id": "a", "data": {"release_date": "05/7/2019"}}),
        json!({"id": "b", "data": {"release_date": "Oct 21, 2008"}}),
    ];
    let output = Pipeline::new(config).unwrap().run(&records).unwrap();
    assert_eq!(
        output.games.get("a").unwrap().release_date,
        NaiveDate::from_ymd_opt(2019, 7, 5)
    );
    assert_eq!(output.games.get("b").unwrap().release_date, None);
    assert_eq!(output.summary.dates_unparsed, 1);
}

#[test]
fn category_relation_points_back_to_games() {
    let records = fixture_records("catalog_sample.json");
    let output = default_pipeline().run(&records).expect("run");
    assert_eq!(output.categories.len(), 5);
    for row in output.categories.rows() {
        let game = output.games.get(&row.entity_id).expect("owning game");
        assert!(game.category_list.contains(&row.category));
        assert_eq!(row.positive, game.positive);
        assert_eq!(row.period_bucket, game.period_bucket);
    }
}

#[test]
fn chunked_run_matches_whole_run_on_fixture() {
    let records = fixture_records("catalog_sample.json");
    let pipeline = default_pipeline();
    let whole = pipeline.run(&records).unwrap();
    let chunked = pipeline.run_chunked(&records, 2).unwrap();
    assert_eq!(whole.summary, chunked.summary);
    assert_eq!(whole.games, chunked.games);
    assert_eq!(pipeline::summarize(&whole.games).records_kept, 4);
}

#[test]
fn input_without_identifiers_fails() {
    let records = vec![json!({"data": {"name": "a"}}), json!({"data": {}})];
    let err = default_pipeline().run(&records).unwrap_err();
    assert!(matches!(err, PipelineError::MissingIdentifierColumn { .. }));
    assert!(err.to_string().contains("id"));
}
