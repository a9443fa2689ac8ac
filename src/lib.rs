use clap::ValueEnum;

pub mod codec;
pub mod corpus;
pub mod error;
pub mod harness;
pub mod person;
pub mod record;
pub mod report;
pub mod runner;
pub mod schema;

pub use error::{BenchError, DecodeError, SchemaError};

/// Codec trial(s) to run.
#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum CodecKind {
    /// Run every codec trial (bincode, json, protobuf).
    #[default]
    All,
    /// Schema-driven compact binary, fields encoded with bincode.
    Bincode,
    /// serde_json text round trip.
    Json,
    /// Protobuf message compiled from a .proto file at startup.
    Protobuf,
}

impl CodecKind {
    pub fn includes(&self, other: CodecKind) -> bool {
        *self == CodecKind::All || *self == other
    }
}
