//! FTPS connector backed by suppaftp with explicit TLS
//!
//! Connects in the clear, upgrades to TLS, then logs in, all at construction
//! time. Listing lines are parsed with suppaftp's LIST parser; unparseable
//! lines are skipped rather than failing the whole listing.

use chrono::{DateTime, Utc};
use suppaftp::list::File;
use suppaftp::native_tls::TlsConnector;
use suppaftp::{NativeTlsConnector, NativeTlsFtpStream};
use tracing::debug;

use crate::config::SourceConfig;
use crate::constants::source::DEFAULT_FTPS_PORT;
use crate::errors::ConnectorError;

use super::{DirectoryEntry, SourceConnector};

/// Connector over an authenticated FTPS session
pub struct FtpsConnector {
    stream: Option<NativeTlsFtpStream>,
}

impl FtpsConnector {
    /// Dials, upgrades to TLS and logs in against the configured source.
    pub fn connect(source: &SourceConfig) -> Result<Self, ConnectorError> {
        let port = if source.port.is_empty() {
            DEFAULT_FTPS_PORT
        } else {
            source.port.as_str()
        };
        let addr = format!("{}:{}", source.host, port);

        let connection_error = |reason: String| ConnectorError::Connection {
            host: source.host.clone(),
            port: port.to_string(),
            reason,
        };

        let plain =
            NativeTlsFtpStream::connect(&addr).map_err(|e| connection_error(e.to_string()))?;

        let tls = TlsConnector::new().map_err(|e| connection_error(e.to_string()))?;
        let mut stream = plain
            .into_secure(NativeTlsConnector::from(tls), &source.host)
            .map_err(|e| connection_error(e.to_string()))?;

        stream
            .login(&source.username, &source.password)
            .map_err(|e| connection_error(format!("authentication failed: {}", e)))?;

        debug!(host = %source.host, "FTPS session established");
        Ok(Self {
            stream: Some(stream),
        })
    }

    fn stream(&mut self) -> Result<&mut NativeTlsFtpStream, ConnectorError> {
        self.stream.as_mut().ok_or_else(|| ConnectorError::List {
            folder: String::new(),
            reason: "session already closed".to_string(),
        })
    }
}

impl SourceConnector for FtpsConnector {
    fn list(&mut self, folder: &str) -> Result<Vec<DirectoryEntry>, ConnectorError> {
        let lines = self
            .stream()?
            .list(Some(folder))
            .map_err(|e| ConnectorError::List {
                folder: folder.to_string(),
                reason: e.to_string(),
            })?;

        let entries = lines
            .iter()
            .filter_map(|line| {
                let file = match File::try_from(line.as_str()) {
                    Ok(file) => file,
                    Err(e) => {
                        debug!(line = %line, error = %e, "unparseable LIST line, skipping");
                        return None;
                    }
                };
                Some(DirectoryEntry {
                    name: file.name().to_string(),
                    modified: DateTime::<Utc>::from(file.modified()),
                })
            })
            .collect();

        Ok(entries)
    }

    fn fetch(&mut self, path: &str) -> Result<Vec<u8>, ConnectorError> {
        let buffer = self
            .stream()
            .map_err(|_| ConnectorError::Fetch {
                path: path.to_string(),
                reason: "session already closed".to_string(),
            })?
            .retr_as_buffer(path)
            .map_err(|e| ConnectorError::Fetch {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        Ok(buffer.into_inner())
    }

    fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.quit() {
                debug!(error = %e, "FTPS quit failed");
            }
        }
    }
}

impl Drop for FtpsConnector {
    fn drop(&mut self) {
        self.close();
    }
}
