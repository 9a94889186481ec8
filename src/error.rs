use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("None of the {records} input record(s) carries the '{field}' identifier")]
    MissingIdentifierColumn { field: &'static str, records: usize },
    #[error("Input is not a JSON array, object, or JSON-lines stream: {0}")]
    UnsupportedInputShape(String),
    #[error("Malformed JSON on line {line}: {source}")]
    MalformedLine {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid date pattern '{pattern}': {reason}")]
    InvalidDatePattern { pattern: String, reason: String },
    #[error("Invalid category delimiter '{pattern}': {source}")]
    InvalidCategoryDelimiter {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("period_start ({start}) must not be after period_end ({end})")]
    InvalidPeriod { start: i32, end: i32 },
}
