use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Normalize game catalog dumps into typed, query-ready tables",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Flatten, coerce and enrich catalog records into the games and category tables
    Normalize(NormalizeArgs),
    /// Filter, group, aggregate and sort a normalized relation
    Query(QueryArgs),
    /// Print the effective configuration as YAML
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    /// Input JSON file (array, keyed object or JSON lines); `-` reads stdin
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Games table CSV output (stdout if omitted or `-`)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Entity-category relation CSV output
    #[arg(long = "categories")]
    pub categories: Option<PathBuf>,
    /// Write the run summary as JSON to this path
    #[arg(long = "summary")]
    pub summary: Option<PathBuf>,
    /// YAML configuration file
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Print the first N normalized rows as a table to stderr
    #[arg(long = "preview")]
    pub preview: Option<usize>,
    /// Process the input in partitions of this many records
    #[arg(long = "chunk-size")]
    pub chunk_size: Option<usize>,
    /// CSV delimiter for the written tables (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter, default_value = ",")]
    pub delimiter: u8,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Input JSON file (array, keyed object or JSON lines); `-` reads stdin
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Relation to query
    #[arg(long = "relation", value_enum, default_value = "games")]
    pub relation: Relation,
    /// Row-level filters such as `total_reviews>=1000` or `release_date is null`
    #[arg(long = "filter", action = clap::ArgAction::Append)]
    pub filters: Vec<String>,
    /// Comma-separated grouping columns
    #[arg(long = "group-by", value_delimiter = ',')]
    pub group_by: Vec<String>,
    /// Aggregations of the form `reducer:column[:alias]`, `count` or `p90:column`
    #[arg(long = "agg", action = clap::ArgAction::Append)]
    pub aggregations: Vec<String>,
    /// Sort directives of the form `column[:asc|desc]`
    #[arg(long = "sort", action = clap::ArgAction::Append)]
    pub sort: Vec<String>,
    /// Restrict output to this comma-separated list of columns
    #[arg(short = 'C', long = "columns", value_delimiter = ',')]
    pub columns: Vec<String>,
    /// Limit number of rows emitted
    #[arg(long)]
    pub limit: Option<usize>,
    /// YAML configuration file
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Output CSV file instead of a rendered table on stdout
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// CSV delimiter for `--output` (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter, default_value = ",")]
    pub delimiter: u8,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// YAML configuration file to validate and echo; defaults are printed when omitted
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum Relation {
    #[default]
    Games,
    Categories,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
