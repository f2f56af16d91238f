//! CLI wiring for the `tlr` binary: argument definitions and command
//! implementations. The numerical work lives in `tlr-algo`; this crate
//! loads inputs, applies configuration overrides, and writes outputs.

pub mod cli;
pub mod commands;
