//! Error types for the benchmark harness.
//!
//! Three classes matter to the runner:
//! - configuration and schema errors are fatal and surface before any trial runs;
//! - decode errors are fatal to the current trial only.

use thiserror::Error;

use crate::schema::TypeTag;

/// Top-level error for corpus setup, codec setup and runner misuse.
#[derive(Error, Debug)]
pub enum BenchError {
    /// Bad schema file, missing message type, runner misuse.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// A corpus must hold at least one record.
    #[error("Invalid corpus size: {count} (must be at least 1)")]
    InvalidCorpusSize { count: usize },

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A codec collaborator could not be initialized for the named trial.
    #[error("Trial `{trial}` failed to initialize: {source}")]
    TrialSetup {
        trial: String,
        #[source]
        source: Box<BenchError>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BenchError {
    pub fn configuration(message: impl Into<String>) -> Self {
        BenchError::Configuration {
            message: message.into(),
        }
    }

    /// Attach the trial name to a setup failure.
    pub fn for_trial(self, trial: impl Into<String>) -> Self {
        BenchError::TrialSetup {
            trial: trial.into(),
            source: Box::new(self),
        }
    }
}

/// Errors raised while declaring a record type or building a record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Unsupported type `{tag}` for field `{field}`")]
    UnsupportedType { field: String, tag: String },

    #[error("Field `{field}` declared twice on `{record}`")]
    DuplicateField { record: String, field: String },

    #[error("Record type `{record}` declares no fields")]
    Empty { record: String },

    #[error("Record `{record}` expects {expected} values, got {actual}")]
    ArityMismatch {
        record: String,
        expected: usize,
        actual: usize,
    },

    #[error("Field `{field}` expects {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: TypeTag,
        actual: TypeTag,
    },
}

/// A round trip failed or produced something other than what went in.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The codec collaborator itself raised.
    #[error("{codec}: {reason}")]
    Codec { codec: &'static str, reason: String },

    #[error("{remaining} trailing bytes after last field")]
    TrailingBytes { remaining: usize },

    #[error("Field `{field}` does not round-trip: {reason}")]
    Mismatch { field: String, reason: String },

    #[error("Field `{field}` value {value} is out of range")]
    OutOfRange { field: String, value: u64 },
}

impl DecodeError {
    pub fn codec(codec: &'static str, err: impl std::fmt::Display) -> Self {
        DecodeError::Codec {
            codec,
            reason: err.to_string(),
        }
    }

    pub fn mismatch(field: impl Into<String>, reason: impl Into<String>) -> Self {
        DecodeError::Mismatch {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;
