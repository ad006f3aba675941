//! Error taxonomy for loading and transforming fleet datasets.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Missing column `{column}` in {table}")]
    MissingColumn { table: &'static str, column: &'static str },

    #[error("Invalid value {value:?} in column `{column}` at line {line}: {reason}")]
    InvalidValue {
        line: u64,
        column: &'static str,
        value: String,
        reason: String,
    },

    #[error("Malformed trajectory at line {line}: {reason}")]
    Parse { line: u64, reason: String },

    #[error("Invalid animation config: {0}")]
    InvalidConfig(String),

    #[error("Frame sink closed")]
    SinkClosed,

    #[error("Animation task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// Missing columns and badly typed cells: fatal for the whole load.
    pub fn is_schema(&self) -> bool {
        matches!(
            self,
            PipelineError::MissingColumn { .. } | PipelineError::InvalidValue { .. }
        )
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, PipelineError::Parse { .. })
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
