use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Reading the host's CPU, memory or disk counters failed.
#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("system metrics are not supported on this platform")]
    Unsupported,
    #[error("no disk mounted at {mount}")]
    NoDisk { mount: String },
    #[error("total memory reported as zero")]
    MemoryUnavailable,
    #[error("{metric} value {value} is outside 0..=100")]
    OutOfRange { metric: &'static str, value: f64 },
    #[error("sampler worker failed: {0}")]
    Worker(String),
}

/// The persistence layer could not be reached, written or read.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to open database at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("failed to create database directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("storage call timed out after {0:?}")]
    Timeout(Duration),
    #[error("caller gave up before the write was committed")]
    Abandoned,
    #[error("database thread terminated unexpectedly")]
    WorkerGone,
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("database version ({found}) is newer than supported schema ({supported})")]
    SchemaTooNew { found: i32, supported: i32 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("sampling interval must be between {min} and {max} seconds, got {value}")]
    InvalidInterval { value: u64, min: u64, max: u64 },
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Sampling(#[from] SamplingError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("already recording since {since}")]
    AlreadyRecording { since: DateTime<Utc> },
    #[error("not recording")]
    NotRecording,
}

pub type Result<T> = std::result::Result<T, Error>;
