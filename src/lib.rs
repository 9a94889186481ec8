pub mod categories;
pub mod cli;
pub mod coerce;
pub mod config;
pub mod data;
pub mod dates;
pub mod error;
pub mod filter;
pub mod flatten;
pub mod frame;
pub mod games;
pub mod io_utils;
pub mod pipeline;
pub mod platforms;
pub mod popularity;
pub mod table;
pub mod temporal;

use std::{env, fs::File, io::BufWriter, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    cli::{Cli, Commands, ConfigArgs, NormalizeArgs, QueryArgs, Relation},
    config::PipelineConfig,
    frame::Frame,
    pipeline::{Pipeline, PipelineOutput, RunSummary},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("catalog_prep", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Normalize(args) => handle_normalize(&args),
        Commands::Query(args) => handle_query(&args),
        Commands::Config(args) => handle_config(&args),
    }
}

fn load_and_run(
    input: &Path,
    encoding: Option<&str>,
    config: Option<&Path>,
    chunk_size: Option<usize>,
) -> Result<PipelineOutput> {
    let config = PipelineConfig::load_or_default(config)?;
    let pipeline = Pipeline::new(config).context("Compiling pipeline configuration")?;
    let encoding = io_utils::resolve_encoding(encoding)?;
    let records = io_utils::read_records(input, encoding)?;
    debug!("Loaded {} raw record(s) from {input:?}", records.len());
    let output = match chunk_size {
        Some(size) => pipeline.run_chunked(&records, size),
        None => pipeline.run(&records),
    }
    .with_context(|| format!("Normalizing records from {input:?}"))?;
    Ok(output)
}

fn handle_normalize(args: &NormalizeArgs) -> Result<()> {
    info!(
        "Normalizing '{}' with delimiter '{}'",
        args.input.display(),
        printable_delimiter(args.delimiter)
    );
    let output = load_and_run(
        &args.input,
        args.input_encoding.as_deref(),
        args.config.as_deref(),
        args.chunk_size,
    )?;

    let games = output.games.to_frame();
    io_utils::write_frame_to_path(&games, args.output.as_deref(), args.delimiter)
        .context("Writing games table")?;
    if let Some(path) = &args.categories {
        io_utils::write_frame_to_path(&output.categories.to_frame(), Some(path), args.delimiter)
            .with_context(|| format!("Writing category relation to {path:?}"))?;
        info!(
            "Category relation with {} row(s) written to {path:?}",
            output.categories.len()
        );
    }
    if let Some(path) = &args.summary {
        write_summary(&output.summary, path)?;
        info!("Run summary written to {path:?}");
    }
    if let Some(rows) = args.preview {
        let preview = games.limit(Some(rows));
        eprint!("{}", table::render_frame(&preview));
    }
    Ok(())
}

fn write_summary(summary: &RunSummary, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Creating summary file {path:?}"))?;
    serde_json::to_writer_pretty(BufWriter::new(file), summary)
        .with_context(|| format!("Writing summary to {path:?}"))
}

fn handle_query(args: &QueryArgs) -> Result<()> {
    let filters = filter::parse_filters(&args.filters)?;
    let aggregations = frame::parse_aggregations(&args.aggregations)?;
    let sorts = frame::parse_sort_directives(&args.sort)?;

    let output = load_and_run(
        &args.input,
        args.input_encoding.as_deref(),
        args.config.as_deref(),
        None,
    )?;
    let relation: Frame = match args.relation {
        Relation::Games => output.games.to_frame(),
        Relation::Categories => output.categories.to_frame(),
    };
    debug!(
        "Querying {:?} relation with {} row(s)",
        args.relation,
        relation.len()
    );

    let mut result = relation
        .filter(&filters)
        .context("Applying filters")?;
    if !args.group_by.is_empty() || !aggregations.is_empty() {
        result = result
            .group_by(&args.group_by, &aggregations)
            .context("Aggregating rows")?;
    }
    result = result.order_by(&sorts).context("Sorting rows")?;
    if !args.columns.is_empty() {
        result = result.select(&args.columns).context("Selecting columns")?;
    }
    let result = result.limit(args.limit);

    match &args.output {
        Some(path) => {
            io_utils::write_frame_to_path(&result, Some(path), args.delimiter)?;
            info!("{} row(s) written to {path:?}", result.len());
        }
        None => table::print_frame(&result),
    }
    Ok(())
}

fn handle_config(args: &ConfigArgs) -> Result<()> {
    let config = PipelineConfig::load_or_default(args.config.as_deref())?;
    print!("{}", config.to_yaml_string()?);
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
