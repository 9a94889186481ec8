//! YAML run configuration; every key is optional.
//!
//! ```yaml
//! period_start: 2019
//! period_end: 2021
//! date_formats: ["MMM d yyyy", "MMM dd yyyy", "yyyy-MM-dd", "dd MMM yyyy", "d MMM yyyy"]
//! category_delimiter: ",\\s*"
//! max_skipped_ratio: 0.05
//! reporting:
//!   min_reviews_category: 10000
//!   min_positive_rate: 0.85
//! ```

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    categories::{CategorySplitter, DEFAULT_CATEGORY_DELIMITER},
    dates::{DEFAULT_DATE_FORMATS, DateNormalizer},
    error::PipelineError,
    temporal::{DEFAULT_PERIOD_END, DEFAULT_PERIOD_START, PeriodBounds},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub period_start: i32,
    pub period_end: i32,
    pub date_formats: Vec<String>,
    pub category_delimiter: String,
    pub max_skipped_ratio: f64,
    pub reporting: ReportingThresholds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportingThresholds {
    pub min_reviews_category: u64,
    pub min_positive_rate: f64,
}

impl Default for ReportingThresholds {
    fn default() -> Self {
        Self {
            min_reviews_category: 10_000,
            min_positive_rate: 0.85,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            period_start: DEFAULT_PERIOD_START,
            period_end: DEFAULT_PERIOD_END,
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect(),
            category_delimiter: DEFAULT_CATEGORY_DELIMITER.to_string(),
            max_skipped_ratio: 0.05,
            reporting: ReportingThresholds::default(),
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        let config: PipelineConfig =
            serde_yaml::from_reader(reader).context("Parsing config YAML")?;
        config
            .validate()
            .with_context(|| format!("Validating config file {path:?}"))?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_yaml_str(input: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(input).context("Parsing config YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing config to YAML")
    }

    pub fn period_bounds(&self) -> PeriodBounds {
        PeriodBounds {
            start: self.period_start,
            end: self.period_end,
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        self.compile().map(|_| ())
    }

    /// Builds the compiled matchers the stages run with.
    pub fn compile(&self) -> Result<CompiledConfig, PipelineError> {
        if self.period_start > self.period_end {
            return Err(PipelineError::InvalidPeriod {
                start: self.period_start,
                end: self.period_end,
            });
        }
        Ok(CompiledConfig {
            bounds: self.period_bounds(),
            dates: DateNormalizer::new(self.date_formats.as_slice())?,
            categories: CategorySplitter::new(&self.category_delimiter)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CompiledConfig {
    pub bounds: PeriodBounds,
    pub dates: DateNormalizer,
    pub categories: CategorySplitter,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_yields_defaults() {
        let config = PipelineConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.date_formats[0], "MMM d yyyy");
        assert_eq!(config.period_bounds(), PeriodBounds::default());
    }

    #[test]
    fn partial_yaml_overrides_only_given_keys() {
        let config = PipelineConfig::from_yaml_str(
            "period_start: 2020\nperiod_end: 2022\nreporting:\n  min_positive_rate: 0.9\n",
        )
        .unwrap();
        assert_eq!(config.period_start, 2020);
        assert_eq!(config.reporting.min_positive_rate, 0.9);
        assert_eq!(config.reporting.min_reviews_category, 10_000);
        assert_eq!(config.category_delimiter, DEFAULT_CATEGORY_DELIMITER);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        assert!(PipelineConfig::from_yaml_str("period_start: 2023\nperiod_end: 2020\n").is_err());
        assert!(PipelineConfig::from_yaml_str("date_formats: [\"yyyy-QQ\"]\n").is_err());
        assert!(PipelineConfig::from_yaml_str("category_delimiter: \"(\"\n").is_err());
        assert!(PipelineConfig::from_yaml_str("unknown_key: 1\n").is_err());
    }

    #[test]
    fn yaml_round_trips() {
        let config = PipelineConfig::default();
        let rendered = config.to_yaml_string().unwrap();
        assert_eq!(PipelineConfig::from_yaml_str(&rendered).unwrap(), config);
    }
}
