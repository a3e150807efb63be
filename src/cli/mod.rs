//! Command-line interface for the file-relay agent

mod args;
mod commands;

pub use args::Cli;
pub use commands::run;
