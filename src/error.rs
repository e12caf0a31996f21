//! Error types for the report pipeline.

use std::fmt;

use thiserror::Error;

/// Pipeline stage that detected a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Normalize,
    Filter,
    Requirement,
    Aggregate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Normalize => "normalize",
            Stage::Filter => "filter",
            Stage::Requirement => "requirement",
            Stage::Aggregate => "aggregate",
        };
        f.write_str(name)
    }
}

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Unknown comparison operator '{0}'")]
    UnknownOperator(String),

    #[error("Unknown field '{field}' (detected during {stage})")]
    UnknownField { field: String, stage: Stage },

    #[error("Malformed date '{value}' at row {row}, column '{column}'")]
    MalformedDate {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Cannot compare {left} with {right}")]
    IncomparableValues { left: String, right: String },

    #[error("Column '{0}' is produced more than once")]
    DuplicateColumn(String),

    #[error("Column '{column}' holds non-numeric value '{value}'")]
    NonNumeric { column: String, value: String },

    #[error("Integer sum of column '{0}' overflows")]
    Overflow(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
