//! file-relay binary
//!
//! Thin wrapper: parse arguments, initialize logging, hand off to the CLI
//! handler.

use std::process;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use file_relay::cli::{self, Cli};

#[tokio::main]
async fn main() {
    // Load environment variables from .env if present
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    init_logging(&cli);

    info!("file-relay v{} starting", env!("CARGO_PKG_VERSION"));

    if let Err(e) = cli::run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Initialize logging based on CLI verbosity settings
fn init_logging(cli: &Cli) {
    let filter = EnvFilter::from_default_env().add_directive(
        format!("file_relay={}", cli.log_level())
            .parse()
            .expect("static directive is valid"),
    );

    fmt().with_env_filter(filter).with_target(false).init();
}
