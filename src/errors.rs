//! Error types for the file-relay agent
//!
//! Errors are grouped by pipeline stage. Nothing here crosses the process
//! boundary: every error ultimately ends up in the log for the tick that
//! produced it, and the scheduler carries on.

use std::path::PathBuf;

use thiserror::Error;

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found or unreadable
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// YAML parsing error
    #[error("Invalid YAML configuration")]
    Yaml(#[from] serde_yaml::Error),

    /// Required environment variable missing (yaml-base64 and env modes)
    #[error("Environment variable {var} is not set")]
    MissingEnv { var: String },

    /// Base64 payload in the named environment variable could not be decoded
    #[error("Environment variable {var} does not contain valid base64")]
    Base64 {
        var: String,
        source: base64::DecodeError,
    },

    /// File prefix is not a valid regular expression
    #[error("Invalid file_prefix pattern '{pattern}' for job '{job}'")]
    Pattern {
        job: String,
        pattern: String,
        source: regex::Error,
    },

    /// Semantic validation failure
    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid { field: String, reason: String },
}

/// Source connector errors (dial/auth, listing, fetching)
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// Could not establish or authenticate the session
    #[error("Failed to connect to {host}:{port}: {reason}")]
    Connection {
        host: String,
        port: String,
        reason: String,
    },

    /// Directory listing failed
    #[error("Failed to list directory {folder}: {reason}")]
    List { folder: String, reason: String },

    /// File retrieval failed
    #[error("Failed to fetch {path}: {reason}")]
    Fetch { path: String, reason: String },

    /// Local I/O error while staging the transient file
    #[error("I/O error while staging file")]
    Io(#[from] std::io::Error),
}

/// Upload errors, retried in place by the uploader
#[derive(Error, Debug)]
pub enum UploadError {
    /// Transport-level failure building or sending the request
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// Target answered with anything other than 200
    #[error("Upload rejected with status {status}")]
    Status { status: u16 },

    /// Staged file could not be read back for the multipart body
    #[error("Failed to read staged file {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Connector error
    #[error(transparent)]
    Connector(#[from] ConnectorError),

    /// Upload error
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Blocking stage task failed to complete
    #[error("Blocking pipeline stage panicked or was cancelled")]
    Join(#[from] tokio::task::JoinError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
