//! Error taxonomy for the two-stage pipeline.
//!
//! `PipelineError` covers failures that abort a run; `RowError` covers
//! per-row parse failures, which callers count and skip rather than
//! propagate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing or unreadable input/output path.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The input file exists but could not be interpreted at all.
    #[error("format error: {0}")]
    Format(String),

    /// Plot rendering failure. Callers treat this as non-fatal: CSV
    /// artifacts are written before any plotting starts.
    #[error("plot error: {0}")]
    Plot(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// A single malformed row. Never escapes a component: the reader logs it
/// at debug level, bumps a skip counter, and moves on.
#[derive(Debug, Error)]
pub enum RowError {
    #[error("missing timestamp field")]
    MissingTimestamp,

    #[error("unparsable timestamp: {0:?}")]
    BadTimestamp(String),

    #[error("row has {got} fields, header has {expected}")]
    FieldCount { expected: usize, got: usize },
}
