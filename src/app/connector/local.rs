//! Local filesystem connector
//!
//! Used when the "remote" source is a directory on the same machine. `fetch`
//! simply reads the already-addressable file and `close` is a no-op.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::errors::ConnectorError;

use super::{DirectoryEntry, SourceConnector};

/// Connector over a plain local directory
#[derive(Debug, Default)]
pub struct LocalConnector;

impl LocalConnector {
    pub fn new() -> Self {
        Self
    }
}

impl SourceConnector for LocalConnector {
    fn list(&mut self, folder: &str) -> Result<Vec<DirectoryEntry>, ConnectorError> {
        let read_dir = fs::read_dir(folder).map_err(|e| ConnectorError::List {
            folder: folder.to_string(),
            reason: e.to_string(),
        })?;

        let mut entries = Vec::new();
        for item in read_dir {
            let item = item.map_err(|e| ConnectorError::List {
                folder: folder.to_string(),
                reason: e.to_string(),
            })?;

            let metadata = match item.metadata() {
                Ok(m) => m,
                Err(e) => {
                    debug!(path = %item.path().display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            let Ok(modified) = metadata.modified() else {
                debug!(path = %item.path().display(), "entry has no modification time, skipping");
                continue;
            };

            entries.push(DirectoryEntry {
                name: item.file_name().to_string_lossy().into_owned(),
                modified: DateTime::<Utc>::from(modified),
            });
        }

        Ok(entries)
    }

    fn fetch(&mut self, path: &str) -> Result<Vec<u8>, ConnectorError> {
        fs::read(Path::new(path)).map_err(|e| ConnectorError::Fetch {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    fn close(&mut self) {}
}
