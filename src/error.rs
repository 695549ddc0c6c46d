//! Error types for `text_relations`.
//!
//! Configuration problems surface as [`Error::InvalidArgument`] before any
//! computation starts. Per-document anomalies ([`Error::EmptyDocument`]) are
//! only returned when the caller asked for fail-fast behaviour; by default
//! such documents are skipped and listed in the result. A zero marginal in
//! the phi coefficient is not an error at all, it resolves to `0.0`.

use std::io;

use thiserror::Error;

/// All errors produced by this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed configuration (n < 1, negative thresholds, unknown modes).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A document yielded no terms, so term frequency is undefined.
    #[error("Empty document: `{0}` contains no terms after filtering")]
    EmptyDocument(String),

    /// The pairwise step would exceed a caller-set limit.
    #[error(
        "Capacity exceeded: {what} is {actual}, limit is {limit} \
         (raise --min-group-frequency or reduce --ngram)"
    )]
    CapacityExceeded {
        what: &'static str,
        actual: usize,
        limit: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Error::InvalidArgument(msg.into())
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
