//! JSON record input (array, keyed object or JSON lines) and CSV output.

use std::{
    fs::File,
    io::{self, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use encoding_rs::{Encoding, UTF_8};
use serde_json::Value as JsonValue;

use crate::{data::display_cell, error::PipelineError, flatten::IDENTIFIER_FIELD, frame::Frame};

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

fn read_all(path: &Path) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    if is_dash(path) {
        io::stdin()
            .lock()
            .read_to_end(&mut buffer)
            .context("Reading stdin")?;
    } else {
        File::open(path)
            .with_context(|| format!("Opening input file {path:?}"))?
            .read_to_end(&mut buffer)
            .with_context(|| format!("Reading input file {path:?}"))?;
    }
    Ok(buffer)
}

pub fn read_records(path: &Path, encoding: &'static Encoding) -> Result<Vec<JsonValue>> {
    let bytes = read_all(path)?;
    let text = decode_bytes(&bytes, encoding)
        .with_context(|| format!("Decoding input file {path:?}"))?;
    parse_records(&text).with_context(|| format!("Parsing records from {path:?}"))
}

/// Accepts the three layouts catalog dumps come in.
pub fn parse_records(text: &str) -> Result<Vec<JsonValue>, PipelineError> {
    let trimmed = text.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return match serde_json::from_str::<JsonValue>(trimmed) {
            Ok(JsonValue::Array(items)) => Ok(items),
            Ok(other) => Err(PipelineError::UnsupportedInputShape(kind(&other).into())),
            Err(err) => Err(PipelineError::MalformedLine {
                line: err.line(),
                source: err,
            }),
        };
    }
    // A single document is either a keyed map of records or the first of
    // several JSON lines.
    if let Ok(document) = serde_json::from_str::<JsonValue>(trimmed) {
        return match document {
            JsonValue::Object(map) => {
                let keyed = !map.contains_key(IDENTIFIER_FIELD)
                    && map.values().all(JsonValue::is_object);
                if keyed {
                    Ok(map.into_iter().map(|(_, record)| record).collect())
                } else {
                    Ok(vec![JsonValue::Object(map)])
                }
            }
            other => Err(PipelineError::UnsupportedInputShape(kind(&other).into())),
        };
    }
    trimmed
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str::<JsonValue>(line).map_err(|source| PipelineError::MalformedLine {
                line: idx + 1,
                source,
            })
        })
        .collect()
}

fn kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

pub fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(io::stdout()),
    })
}

pub fn write_frame_csv<W: Write>(frame: &Frame, writer: W, delimiter: u8) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);
    writer
        .write_record(frame.columns())
        .context("Writing output headers")?;
    for (idx, row) in frame.rows().iter().enumerate() {
        writer
            .write_record(row.iter().map(|cell| display_cell(cell.as_ref())))
            .with_context(|| format!("Writing output row {}", idx + 1))?;
    }
    writer.flush().context("Flushing output")?;
    Ok(())
}

pub fn write_frame_to_path(frame: &Frame, path: Option<&Path>, delimiter: u8) -> Result<()> {
    let output = open_output(path)?;
    write_frame_csv(frame, output, delimiter)
}
