use catalog_prep::{
    categories::CategorySplitter,
    coerce::{extract_first_integer, to_float, to_integer},
    dates::{DateNormalizer, clean_date_text},
    popularity,
    temporal::{PeriodBounds, PeriodBucket},
};
use chrono::NaiveDate;
use proptest::prelude::*;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

proptest! {
    #[test]
    fn coercion_is_total(raw in ".{0,24}") {
        let _ = to_float(Some(&raw));
        let _ = to_integer(Some(&raw));
        let _ = extract_first_integer(Some(&raw));
        if let Some(value) = to_float(Some(&raw)) {
            prop_assert!(value.is_finite());
        }
    }

    #[test]
    fn digits_embedded_in_words_are_extracted(prefix in "[A-Za-z +]{0,8}", n in 0u32..1000, suffix in "[A-Za-z+ ]{0,8}") {
        let raw = format!("{prefix}{n}{suffix}");
        prop_assert_eq!(extract_first_integer(Some(&raw)), Some(i64::from(n)));
    }

    #[test]
    fn date_cleaning_is_idempotent(raw in "[0-9A-Za-z ,/-]{0,20}") {
        let once = clean_date_text(&raw);
        prop_assert_eq!(clean_date_text(&once), once.clone());
        prop_assert!(!once.contains(','));
        prop_assert!(!once.contains('/'));
    }

    #[test]
    fn normalizer_never_panics(raw in ".{0,32}") {
        let normalizer = DateNormalizer::default();
        let normalized = normalizer.normalize(&raw);
        prop_assert_eq!(normalized.cleaned, clean_date_text(&raw));
    }

    #[test]
    fn listing_style_dates_parse(year in 1990i32..2030, month in 1u32..=12, day in 1u32..=28) {
        let raw = format!("{} {day}, {year}", MONTHS[(month - 1) as usize]);
        let expected = NaiveDate::from_ymd_opt(year, month, day);
        prop_assert_eq!(DateNormalizer::default().normalize(&raw).date, expected);

        let slashed = format!("{year}/{month}/{day}");
        prop_assert_eq!(DateNormalizer::default().normalize(&slashed).date, expected);
    }

    #[test]
    fn buckets_are_total(year in proptest::option::of(-5000i32..5000)) {
        let bucket = PeriodBounds::default().classify(year);
        prop_assert_eq!(year.is_none(), bucket == PeriodBucket::Unknown);
    }

    #[test]
    fn ratio_only_for_positive_totals(positive in proptest::option::of(0i64..1_000_000), negative in proptest::option::of(0i64..1_000_000)) {
        let metrics = popularity::compute(positive, negative);
        match metrics.total_reviews {
            Some(total) if total > 0 => {
                let ratio = metrics.positive_ratio.expect("ratio for positive total");
                prop_assert!((0.0..=1.0).contains(&ratio));
            }
            _ => prop_assert!(metrics.positive_ratio.is_none()),
        }
    }

    #[test]
    fn category_tokens_are_trimmed_and_non_empty(raw in "[A-Za-z ,]{0,40}") {
        let tokens = CategorySplitter::default().split(Some(&raw));
        for token in &tokens {
            prop_assert!(!token.is_empty());
            prop_assert_eq!(token.trim(), token.as_str());
        }
    }
}
