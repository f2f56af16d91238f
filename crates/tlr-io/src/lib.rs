//! # tlr-io: Input and Output Collaborators
//!
//! File-format boundaries around the numerical core: CSV importers for
//! stations, route vertices, and current schedules; a JSON loader for
//! conductor parameters; the canonical result CSV exporter; and input
//! cross-validation.
//!
//! Schema violations surface as [`tlr_core::TlrError::DataShape`] and are
//! fatal; the core never sees malformed data.

pub mod exporters;
pub mod importers;
pub mod validate;
