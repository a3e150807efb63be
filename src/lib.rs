//! file-relay library
//!
//! A scheduled file-relay agent: on configurable time triggers it inspects a
//! source location (SFTP, FTPS or a local directory), identifies at most one
//! new file per logical stream using prefix/date heuristics, stages it
//! locally, then forwards it to an HTTP endpoint as a multipart upload,
//! retrying on failure.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;

// Re-export commonly used types for convenience
pub use config::{Config, ConfigFormat};
pub use errors::{AppError, Result};
