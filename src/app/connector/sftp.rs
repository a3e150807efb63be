//! SFTP connector backed by libssh2
//!
//! Dials TCP, performs the SSH handshake and password authentication, then
//! opens an SFTP channel, all at construction time. Host keys are not
//! verified: the agent typically runs against partner drop boxes addressed by
//! IP where no key registry exists.

use std::io::Read;
use std::net::TcpStream;
use std::path::Path;

use chrono::DateTime;
use ssh2::Session;
use tracing::debug;

use crate::config::SourceConfig;
use crate::constants::source::DEFAULT_SFTP_PORT;
use crate::errors::ConnectorError;

use super::{DirectoryEntry, SourceConnector};

/// Connector over an authenticated SFTP session
pub struct SftpConnector {
    session: Session,
    sftp: ssh2::Sftp,
    closed: bool,
}

impl SftpConnector {
    /// Dials and authenticates against the configured source.
    pub fn connect(source: &SourceConfig) -> Result<Self, ConnectorError> {
        let port = if source.port.is_empty() {
            DEFAULT_SFTP_PORT
        } else {
            source.port.as_str()
        };
        let addr = format!("{}:{}", source.host, port);

        let connection_error = |reason: String| ConnectorError::Connection {
            host: source.host.clone(),
            port: port.to_string(),
            reason,
        };

        let tcp = TcpStream::connect(&addr).map_err(|e| connection_error(e.to_string()))?;

        let mut session = Session::new().map_err(|e| connection_error(e.to_string()))?;
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| connection_error(e.to_string()))?;
        session
            .userauth_password(&source.username, &source.password)
            .map_err(|e| connection_error(format!("authentication failed: {}", e)))?;

        let sftp = session.sftp().map_err(|e| connection_error(e.to_string()))?;

        debug!(host = %source.host, "SFTP session established");
        Ok(Self {
            session,
            sftp,
            closed: false,
        })
    }
}

impl SourceConnector for SftpConnector {
    fn list(&mut self, folder: &str) -> Result<Vec<DirectoryEntry>, ConnectorError> {
        let listing = self
            .sftp
            .readdir(Path::new(folder))
            .map_err(|e| ConnectorError::List {
                folder: folder.to_string(),
                reason: e.to_string(),
            })?;

        let entries = listing
            .into_iter()
            .filter_map(|(path, stat)| {
                let name = path.file_name()?.to_string_lossy().into_owned();
                let modified = stat
                    .mtime
                    .and_then(|secs| DateTime::from_timestamp(secs as i64, 0))
                    .unwrap_or_default();
                Some(DirectoryEntry { name, modified })
            })
            .collect();

        Ok(entries)
    }

    fn fetch(&mut self, path: &str) -> Result<Vec<u8>, ConnectorError> {
        let fetch_error = |reason: String| ConnectorError::Fetch {
            path: path.to_string(),
            reason,
        };

        let mut remote = self
            .sftp
            .open(Path::new(path))
            .map_err(|e| fetch_error(e.to_string()))?;

        let mut bytes = Vec::new();
        remote
            .read_to_end(&mut bytes)
            .map_err(|e| fetch_error(e.to_string()))?;

        Ok(bytes)
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.session.disconnect(None, "session closed", None) {
            debug!(error = %e, "SFTP disconnect failed");
        }
    }
}

impl Drop for SftpConnector {
    fn drop(&mut self) {
        self.close();
    }
}
