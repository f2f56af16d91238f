//! Unified error types for the TLR ecosystem
//!
//! This module provides a common error type [`TlrError`] that can represent
//! errors from any part of the system. The propagation policy follows the
//! smallest-enclosing-scope rule: only [`TlrError::Config`] and
//! [`TlrError::DataShape`] (and I/O failures while loading inputs) abort a
//! run; everything else is recovered locally and counted in
//! [`crate::diagnostics::Diagnostics`].

use chrono::NaiveDateTime;
use thiserror::Error;

/// Unified error type for all TLR operations.
#[derive(Error, Debug)]
pub enum TlrError {
    /// I/O errors (file access, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Missing or out-of-range configuration or conductor parameter
    #[error("Configuration error: {0}")]
    Config(String),

    /// Inconsistent station schemas or malformed route data
    #[error("Data shape error: {0}")]
    DataShape(String),

    /// Fewer than two valid stations for a requested hour
    #[error("Coverage error at {hour}: {stations} valid station(s), need at least 2")]
    Coverage { hour: NaiveDateTime, stations: usize },

    /// Singular kriging system or non-finite solution for an hour
    #[error("Interpolation error at {hour}: {detail}")]
    Interpolation { hour: NaiveDateTime, detail: String },

    /// Thermal solver failed to bracket or converge
    #[error("Solver error: {0}")]
    Solver(String),

    /// Non-finite values propagating through a computation
    #[error("Numeric error: {0}")]
    Numeric(String),

    /// Cooperative cancellation observed
    #[error("Cancelled")]
    Cancelled,
}

/// Convenience type alias for Results using TlrError.
pub type TlrResult<T> = Result<T, TlrError>;

impl TlrError {
    /// Whether this error aborts the whole run (vs. local recovery).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TlrError::Io(_) | TlrError::Parse(_) | TlrError::Config(_) | TlrError::DataShape(_)
        )
    }
}

// Conversion from anyhow::Error for boundaries that use anyhow internally
impl From<anyhow::Error> for TlrError {
    fn from(err: anyhow::Error) -> Self {
        TlrError::Parse(err.to_string())
    }
}

impl From<String> for TlrError {
    fn from(s: String) -> Self {
        TlrError::Numeric(s)
    }
}
