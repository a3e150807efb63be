//! Command-line argument parsing for the file-relay agent

use clap::Parser;

use crate::config::ConfigFormat;

/// file-relay - scheduled SFTP/FTPS/local to HTTP relay
#[derive(Parser, Debug)]
#[command(
    name = "file-relay",
    version,
    about = "Relay new files from an SFTP/FTPS/local source to an HTTP endpoint on a schedule"
)]
pub struct Cli {
    /// Configuration location: a file path for yaml, an environment variable
    /// name for yaml-base64, ignored for env
    #[arg(long, value_name = "FILE_OR_VAR", default_value = "config.yaml")]
    pub config: String,

    /// How the configuration should be located and decoded
    #[arg(long, value_enum, default_value_t = ConfigFormat::Yaml)]
    pub config_format: ConfigFormat,

    /// Validate the configuration and exit without scheduling anything
    #[arg(long)]
    pub check: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long)]
    pub very_verbose: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Effective log level for the tracing filter
    pub fn log_level(&self) -> &'static str {
        if self.very_verbose {
            "trace"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}
