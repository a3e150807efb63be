//! Source connectors
//!
//! A connector exposes the two operations the pipeline needs from a source:
//! list a folder and fetch a file's bytes. Three variants exist (SFTP, FTPS,
//! local filesystem), chosen by the source configuration. The underlying
//! protocol clients are blocking, so the trait is synchronous and ticks drive
//! it from the blocking thread pool.
//!
//! Connectors authenticate eagerly at construction; a dial or auth failure
//! aborts the tick that attempted it and the next scheduled tick reconnects
//! from scratch.

mod ftps;
mod local;
mod sftp;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::SourceConfig;
use crate::errors::ConnectorError;

pub use ftps::FtpsConnector;
pub use local::LocalConnector;
pub use sftp::SftpConnector;

/// One file (or directory) seen in a source folder listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Base name within the listed folder
    pub name: String,
    /// Last modification timestamp
    pub modified: DateTime<Utc>,
}

/// Capability a source must provide to the delivery pipeline
pub trait SourceConnector: Send {
    /// Lists the entries of `folder`.
    fn list(&mut self, folder: &str) -> Result<Vec<DirectoryEntry>, ConnectorError>;

    /// Retrieves the contents of the file at `path`.
    fn fetch(&mut self, path: &str) -> Result<Vec<u8>, ConnectorError>;

    /// Releases the underlying session. Idempotent; never fails observably.
    fn close(&mut self);
}

/// Source protocol variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Sftp,
    Ftps,
    Local,
}

impl SourceKind {
    /// Parses the configured source type. Unrecognized or empty values fall
    /// back to SFTP.
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "ftps" => Self::Ftps,
            "local" => Self::Local,
            _ => Self::Sftp,
        }
    }
}

/// Builds and authenticates a connector for the configured source.
pub fn connect(source: &SourceConfig) -> Result<Box<dyn SourceConnector>, ConnectorError> {
    let kind = SourceKind::parse(&source.kind);
    debug!(?kind, host = %source.host, "opening source connector");

    match kind {
        SourceKind::Sftp => Ok(Box::new(SftpConnector::connect(source)?)),
        SourceKind::Ftps => Ok(Box::new(FtpsConnector::connect(source)?)),
        SourceKind::Local => Ok(Box::new(LocalConnector::new())),
    }
}
