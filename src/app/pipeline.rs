//! Per-tick delivery pipeline
//!
//! One tick is strictly sequential: connect, list, select, fetch, stage to a
//! transient local file, upload, clean up. The connector phase is blocking
//! (ssh2/suppaftp), so it runs on the blocking thread pool; the upload phase
//! is async.
//!
//! Transient files are staged under `<work_dir>/<job name>/<file name>` so
//! jobs that pick up identically named source files cannot collide, while the
//! base name (which the uploader reuses as the multipart filename) is
//! preserved.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Local;
use tracing::info;

use crate::app::connector::{self, SourceConnector};
use crate::app::selector::{self, DedupState, SelectionRule};
use crate::app::uploader::Uploader;
use crate::config::{JobConfig, SourceConfig, TargetConfig};
use crate::errors::{AppError, ConnectorError, Result};

/// Runs the select-fetch-upload sequence for one job
pub struct DeliveryPipeline {
    source: SourceConfig,
    job: JobConfig,
    rule: SelectionRule,
    state: Arc<Mutex<DedupState>>,
    uploader: Uploader,
    work_dir: PathBuf,
}

impl DeliveryPipeline {
    /// Builds the pipeline for one job, compiling its matching rule and
    /// constructing the uploader up front so bad configuration fails at
    /// startup rather than on the first tick.
    pub fn new(source: SourceConfig, target: TargetConfig, job: JobConfig) -> Result<Self> {
        let rule = job.task.selection_rule(&job.name)?;
        let uploader = Uploader::new(target)?;

        Ok(Self {
            source,
            job,
            rule,
            state: Arc::new(Mutex::new(DedupState::new())),
            uploader,
            work_dir: PathBuf::from("."),
        })
    }

    /// Overrides the staging root (defaults to the working directory).
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    /// Swaps the uploader. Intended for tests that tune the retry delay.
    pub fn with_uploader(mut self, uploader: Uploader) -> Self {
        self.uploader = uploader;
        self
    }

    pub fn job_name(&self) -> &str {
        &self.job.name
    }

    /// Executes one tick.
    ///
    /// Connector and listing failures abort the tick; the next scheduled tick
    /// starts over. Once a file is staged, the upload retries in place until
    /// the target accepts it, so this method only returns an upload error for
    /// non-retryable construction problems.
    pub async fn run(&self) -> Result<()> {
        let source = self.source.clone();
        let job = self.job.clone();
        let rule = self.rule.clone();
        let state = Arc::clone(&self.state);
        let work_dir = self.work_dir.clone();

        let staged = tokio::task::spawn_blocking(move || {
            let mut state = lock_state(&state);
            stage(&source, &job, &rule, &mut state, &work_dir)
        })
        .await
        .map_err(AppError::Join)??;

        let Some(path) = staged else {
            return Ok(());
        };

        self.uploader.send(&path).await?;
        Ok(())
    }
}

/// Runs the blocking half of a tick: connect, list, select, fetch, stage.
fn stage(
    source: &SourceConfig,
    job: &JobConfig,
    rule: &SelectionRule,
    state: &mut DedupState,
    work_dir: &Path,
) -> std::result::Result<Option<PathBuf>, ConnectorError> {
    let mut connector = connector::connect(source)?;
    let result = stage_with(
        connector.as_mut(),
        job,
        rule,
        state,
        work_dir,
        Local::now().date_naive(),
    );
    // Runs on every exit path, early aborts included
    connector.close();
    result
}

fn stage_with(
    connector: &mut dyn SourceConnector,
    job: &JobConfig,
    rule: &SelectionRule,
    state: &mut DedupState,
    work_dir: &Path,
    today: chrono::NaiveDate,
) -> std::result::Result<Option<PathBuf>, ConnectorError> {
    let entries = connector.list(&job.task.folder)?;

    let Some(name) = selector::select(&entries, rule, state, today) else {
        info!(job = %job.name, "no new file to relay");
        return Ok(None);
    };

    let remote_path = format!("{}/{}", job.task.folder, name);
    info!(job = %job.name, file = %remote_path, "downloading selected file");
    let bytes = connector.fetch(&remote_path)?;

    let staging_dir = work_dir.join(&job.name);
    std::fs::create_dir_all(&staging_dir)?;
    let local_path = staging_dir.join(&name);

    let mut staged = File::create(&local_path)?;
    staged.write_all(&bytes)?;
    staged.sync_all()?;

    info!(job = %job.name, path = %local_path.display(), "file staged for upload");
    Ok(Some(local_path))
}

fn lock_state(state: &Mutex<DedupState>) -> MutexGuard<'_, DedupState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::connector::DirectoryEntry;
    use crate::config::TaskRule;
    use chrono::{NaiveDate, Utc};

    /// Scripted connector for exercising the staging sequence without a
    /// network.
    struct StubConnector {
        entries: Vec<DirectoryEntry>,
        list_fails: bool,
        fetch_fails: bool,
        closed: bool,
    }

    impl StubConnector {
        fn with_entries(entries: Vec<DirectoryEntry>) -> Self {
            Self {
                entries,
                list_fails: false,
                fetch_fails: false,
                closed: false,
            }
        }
    }

    impl SourceConnector for StubConnector {
        fn list(&mut self, folder: &str) -> std::result::Result<Vec<DirectoryEntry>, ConnectorError> {
            if self.list_fails {
                return Err(ConnectorError::List {
                    folder: folder.to_string(),
                    reason: "stubbed failure".to_string(),
                });
            }
            Ok(self.entries.clone())
        }

        fn fetch(&mut self, path: &str) -> std::result::Result<Vec<u8>, ConnectorError> {
            if self.fetch_fails {
                return Err(ConnectorError::Fetch {
                    path: path.to_string(),
                    reason: "stubbed failure".to_string(),
                });
            }
            Ok(b"payload".to_vec())
        }

        fn close(&mut self) {
            self.closed = true;
        }
    }

    fn pattern_job(name: &str) -> JobConfig {
        JobConfig {
            name: name.to_string(),
            task: TaskRule {
                folder: "/outbound".to_string(),
                file_prefix: r".*\.csv$".to_string(),
                file_prefix_delimiter: "_".to_string(),
                file_prefix_index: 0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn fresh_entry(name: &str) -> DirectoryEntry {
        DirectoryEntry {
            name: name.to_string(),
            modified: Utc::now(),
        }
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    #[test]
    fn stages_selected_file_under_job_directory() {
        let job = pattern_job("acme-feed");
        let rule = job.task.selection_rule(&job.name).unwrap();
        let mut state = DedupState::new();
        let mut connector = StubConnector::with_entries(vec![fresh_entry("A_20240101.csv")]);
        let work_dir = tempfile::TempDir::new().unwrap();

        let staged = stage_with(
            &mut connector,
            &job,
            &rule,
            &mut state,
            work_dir.path(),
            today(),
        )
        .unwrap()
        .unwrap();

        assert_eq!(
            staged,
            work_dir.path().join("acme-feed").join("A_20240101.csv")
        );
        assert_eq!(std::fs::read(&staged).unwrap(), b"payload");
    }

    #[test]
    fn empty_selection_is_a_clean_no_op() {
        let job = pattern_job("quiet");
        let rule = job.task.selection_rule(&job.name).unwrap();
        let mut state = DedupState::new();
        let mut connector = StubConnector::with_entries(vec![]);
        let work_dir = tempfile::TempDir::new().unwrap();

        let staged = stage_with(
            &mut connector,
            &job,
            &rule,
            &mut state,
            work_dir.path(),
            today(),
        )
        .unwrap();

        assert!(staged.is_none());
    }

    #[test]
    fn list_failure_aborts_the_tick() {
        let job = pattern_job("listless");
        let rule = job.task.selection_rule(&job.name).unwrap();
        let mut state = DedupState::new();
        let mut connector = StubConnector::with_entries(vec![fresh_entry("A_x.csv")]);
        connector.list_fails = true;
        let work_dir = tempfile::TempDir::new().unwrap();

        let err = stage_with(
            &mut connector,
            &job,
            &rule,
            &mut state,
            work_dir.path(),
            today(),
        )
        .unwrap_err();

        assert!(matches!(err, ConnectorError::List { .. }));
        assert!(state.is_empty());
    }

    #[test]
    fn fetch_failure_still_advances_dedup_state() {
        // Selection-time advancement: a failed transfer leaves the file
        // recorded, so the next tick skips it permanently.
        let job = pattern_job("lossy");
        let rule = job.task.selection_rule(&job.name).unwrap();
        let mut state = DedupState::new();
        let work_dir = tempfile::TempDir::new().unwrap();

        let mut failing = StubConnector::with_entries(vec![fresh_entry("A_x.csv")]);
        failing.fetch_fails = true;
        let err = stage_with(
            &mut failing,
            &job,
            &rule,
            &mut state,
            work_dir.path(),
            today(),
        )
        .unwrap_err();
        assert!(matches!(err, ConnectorError::Fetch { .. }));
        assert_eq!(state.record("A").unwrap().last_name, "A_x.csv");

        // Same listing with fetch healthy again: nothing is selected.
        let mut healthy = StubConnector::with_entries(vec![fresh_entry("A_x.csv")]);
        let staged = stage_with(
            &mut healthy,
            &job,
            &rule,
            &mut state,
            work_dir.path(),
            today(),
        )
        .unwrap();
        assert!(staged.is_none());
    }

    #[test]
    fn fetch_uses_folder_joined_remote_path() {
        struct PathRecordingConnector {
            fetched: Option<String>,
        }

        impl SourceConnector for PathRecordingConnector {
            fn list(
                &mut self,
                _folder: &str,
            ) -> std::result::Result<Vec<DirectoryEntry>, ConnectorError> {
                Ok(vec![DirectoryEntry {
                    name: "A_x.csv".to_string(),
                    modified: Utc::now(),
                }])
            }

            fn fetch(&mut self, path: &str) -> std::result::Result<Vec<u8>, ConnectorError> {
                self.fetched = Some(path.to_string());
                Ok(Vec::new())
            }

            fn close(&mut self) {}
        }

        let job = pattern_job("paths");
        let rule = job.task.selection_rule(&job.name).unwrap();
        let mut state = DedupState::new();
        let mut connector = PathRecordingConnector { fetched: None };
        let work_dir = tempfile::TempDir::new().unwrap();

        stage_with(
            &mut connector,
            &job,
            &rule,
            &mut state,
            work_dir.path(),
            today(),
        )
        .unwrap();

        assert_eq!(connector.fetched.as_deref(), Some("/outbound/A_x.csv"));
    }
}
