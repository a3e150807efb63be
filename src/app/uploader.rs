//! Multipart upload with in-place retry
//!
//! Builds one multipart POST per staged file from the configured upload
//! table: the pair whose key equals its value becomes the file attachment
//! (field name = key, filename = the staged file's base name), every other
//! pair becomes a literal form field. Delivery succeeds only on HTTP 200;
//! anything else, including other 2xx codes and transport errors, is retried
//! after a fixed delay with no attempt cap. A persistently unreachable target
//! therefore stalls this job's tick until it recovers, by design.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use tracing::{info, warn};

use crate::config::TargetConfig;
use crate::constants::upload::RETRY_DELAY;
use crate::errors::UploadError;

/// Uploads staged files to the configured HTTP target
#[derive(Debug, Clone)]
pub struct Uploader {
    client: reqwest::Client,
    target: TargetConfig,
    retry_delay: Duration,
}

impl Uploader {
    /// Builds an uploader with the target's request timeout applied.
    pub fn new(target: TargetConfig) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(target.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            target,
            retry_delay: RETRY_DELAY,
        })
    }

    /// Overrides the fixed retry delay. Intended for tests.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Delivers the staged file, retrying until the target answers 200.
    ///
    /// The staged file is deleted only after the 200 arrives; if the process
    /// dies mid-retry the file stays on disk.
    pub async fn send(&self, local_path: &Path) -> Result<(), UploadError> {
        loop {
            match self.send_once(local_path).await {
                Ok(()) => {
                    if let Err(e) = tokio::fs::remove_file(local_path).await {
                        warn!(path = %local_path.display(), error = %e, "failed to remove staged file");
                    }
                    info!(path = %local_path.display(), "uploaded successfully");
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        path = %local_path.display(),
                        error = %e,
                        retry_in = ?self.retry_delay,
                        "upload failed, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }

    /// One upload attempt.
    async fn send_once(&self, local_path: &Path) -> Result<(), UploadError> {
        let mut form = Form::new();
        for pair in &self.target.upload {
            if pair.is_file_marker() {
                let bytes =
                    tokio::fs::read(local_path)
                        .await
                        .map_err(|source| UploadError::Read {
                            path: local_path.to_path_buf(),
                            source,
                        })?;
                let file_name = local_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                form = form.part(pair.key.clone(), Part::bytes(bytes).file_name(file_name));
            } else {
                form = form.text(pair.key.clone(), pair.value.clone());
            }
        }

        let mut request = self.client.post(&self.target.host).multipart(form);
        for header in &self.target.headers {
            request = request.header(header.key.as_str(), header.value.as_str());
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        if status != 200 {
            return Err(UploadError::Status { status });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeyValue;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn target_for(server: &MockServer) -> TargetConfig {
        TargetConfig {
            host: server.uri(),
            headers: vec![KeyValue {
                key: "Authorization".into(),
                value: "Bearer abc123".into(),
            }],
            upload: vec![
                KeyValue {
                    key: "file".into(),
                    value: "file".into(),
                },
                KeyValue {
                    key: "channel".into(),
                    value: "CIMB".into(),
                },
            ],
            timeout_secs: 5,
        }
    }

    fn staged_file(dir: &tempfile::TempDir, name: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"col1,col2\n1,2\n").unwrap();
        path
    }

    #[tokio::test]
    async fn builds_one_file_part_and_literal_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("Authorization", "Bearer abc123"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let path = staged_file(&dir, "A_20240101.csv");

        let uploader = Uploader::new(target_for(&server)).unwrap();
        uploader.send(&path).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);

        let body = String::from_utf8_lossy(&requests[0].body);
        // Exactly one file attachment, named after the staged file
        assert_eq!(body.matches("filename=").count(), 1);
        assert!(body.contains("name=\"file\""));
        assert!(body.contains("filename=\"A_20240101.csv\""));
        // The literal pair arrives as a plain form field
        assert!(body.contains("name=\"channel\""));
        assert!(body.contains("CIMB"));

        let content_type = requests[0].headers.get("content-type").unwrap();
        assert!(content_type
            .to_str()
            .unwrap()
            .starts_with("multipart/form-data; boundary="));
    }

    #[tokio::test]
    async fn retries_until_target_answers_200() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let path = staged_file(&dir, "retry.csv");

        let uploader = Uploader::new(target_for(&server))
            .unwrap()
            .with_retry_delay(Duration::from_millis(10));
        uploader.send(&path).await.unwrap();

        // Two failures then the success: three requests total, and the staged
        // file is gone only now that the 200 arrived.
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn non_200_success_codes_are_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let path = staged_file(&dir, "strict.csv");

        let uploader = Uploader::new(target_for(&server)).unwrap();
        let err = uploader.send_once(&path).await.unwrap_err();

        assert!(matches!(err, UploadError::Status { status: 201 }));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn staged_file_survives_failed_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let path = staged_file(&dir, "kept.csv");

        let uploader = Uploader::new(target_for(&server)).unwrap();
        assert!(uploader.send_once(&path).await.is_err());
        assert!(path.exists());
    }
}
