//! Application constants for the file-relay agent
//!
//! Centralizes the handful of fixed values used throughout the pipeline,
//! organized by functional domain.

use std::time::Duration;

/// Upload behaviour
pub mod upload {
    use super::Duration;

    /// Fixed delay between upload retry attempts
    pub const RETRY_DELAY: Duration = Duration::from_secs(5);

    /// Default per-request timeout in seconds when the target does not
    /// configure one
    pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
}

/// Source connector defaults
pub mod source {
    /// Default SFTP port when the source omits one
    pub const DEFAULT_SFTP_PORT: &str = "22";

    /// Default FTPS port when the source omits one
    pub const DEFAULT_FTPS_PORT: &str = "21";
}

/// Environment variable names for env-mode configuration
pub mod env {
    pub const SOURCE_TYPE: &str = "SOURCE_TYPE";
    pub const SOURCE_HOST: &str = "SOURCE_HOST";
    pub const SOURCE_PORT: &str = "SOURCE_PORT";
    pub const SOURCE_USERNAME: &str = "SOURCE_USERNAME";
    pub const SOURCE_PASSWORD: &str = "SOURCE_PASSWORD";

    pub const TARGET_HOST: &str = "TARGET_HOST";
    pub const TARGET_HEADER: &str = "TARGET_HEADER";
    pub const TARGET_UPLOAD_PARAM: &str = "TARGET_UPLOAD_PARAM";
    pub const TIMEOUT: &str = "TIMEOUT";

    pub const CRON_NAME: &str = "CRON_NAME";
    pub const CRON_TYPE: &str = "CRON_TYPE";
    pub const CRON_EVERY: &str = "CRON_EVERY";
    pub const CRON_SPECIFIC_DAY: &str = "CRON_SPECIFIC_DAY";
    pub const CRON_AT: &str = "CRON_AT";

    pub const TASK_FOLDER: &str = "TASK_FOLDER";
    pub const TASK_FILE: &str = "TASK_FILE";
    pub const TASK_FILE_PREFIX: &str = "TASK_FILE_PREFIX";
    pub const TASK_FILE_PREFIX_DELIMITER: &str = "TASK_FILE_PREFIX_DELIMITER";
    pub const TASK_FILE_PREFIX_INDEX: &str = "TASK_FILE_PREFIX_INDEX";
}

// Re-export commonly used constants for convenience
pub use upload::{DEFAULT_TIMEOUT_SECS, RETRY_DELAY};
