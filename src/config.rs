//! Configuration management for the file-relay agent
//!
//! Configuration arrives in one of three shapes: a YAML file, a base64-encoded
//! YAML blob held in an environment variable, or (for single-job deployments)
//! a flat set of environment variables. All three funnel into the same
//! [`Config`] value, which is validated once at startup and read-only
//! afterwards.

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::app::selector::SelectionRule;
use crate::constants::{env as env_keys, upload};
use crate::errors::ConfigError;

/// How the configuration should be located and decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ConfigFormat {
    /// Read a YAML file from the path given to `--config`
    Yaml,
    /// `--config` names an environment variable holding base64-encoded YAML
    YamlBase64,
    /// Assemble a single-job configuration from `SOURCE_*` / `TARGET_*` /
    /// `CRON_*` / `TASK_*` environment variables
    Env,
}

/// A single `key`/`value` pair as it appears in header and upload tables
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    /// An upload pair whose key equals its value marks the file attachment
    /// rather than a literal form field.
    pub fn is_file_marker(&self) -> bool {
        self.key == self.value
    }
}

/// Source endpoint: where files are picked up from
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceConfig {
    /// `sftp`, `ftps` or `local`; anything else falls back to SFTP
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Source-level folder as found in upstream configs; listing always uses
    /// each job's task folder, so this field is carried but not consulted
    #[serde(default)]
    pub folder: String,
}

/// Target endpoint: where staged files are POSTed to
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    #[serde(default)]
    pub host: String,
    /// Static headers attached to every upload request
    #[serde(rename = "header", default)]
    pub headers: Vec<KeyValue>,
    /// Multipart field table; exactly one pair must be the file marker
    #[serde(rename = "upload", default)]
    pub upload: Vec<KeyValue>,
    /// Per-request timeout in seconds
    #[serde(rename = "timeout", default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            headers: Vec::new(),
            upload: Vec::new(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    upload::DEFAULT_TIMEOUT_SECS
}

/// File matching rules for one job
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskRule {
    /// Folder on the source to inspect each tick
    #[serde(default)]
    pub folder: String,
    /// Literal filename; when set, pattern matching and dedup are bypassed
    #[serde(default)]
    pub file: String,
    /// Unanchored regular expression a candidate name must match
    #[serde(default)]
    pub file_prefix: String,
    /// Delimiter used to split the filename into segments
    #[serde(default)]
    pub file_prefix_delimiter: String,
    /// Index of the segment that carries the dedup token
    #[serde(default)]
    pub file_prefix_index: usize,
}

impl TaskRule {
    /// Returns whether this rule is in literal mode (no prefix pattern).
    pub fn is_literal(&self) -> bool {
        self.file_prefix.is_empty()
    }

    /// Compiles this rule into the form the selector consumes.
    pub fn selection_rule(&self, job: &str) -> Result<SelectionRule, ConfigError> {
        if self.is_literal() {
            return Ok(SelectionRule::Literal {
                file: self.file.clone(),
            });
        }

        let prefix =
            regex::Regex::new(&self.file_prefix).map_err(|source| ConfigError::Pattern {
                job: job.to_string(),
                pattern: self.file_prefix.clone(),
                source,
            })?;

        Ok(SelectionRule::Pattern {
            prefix,
            delimiter: self.file_prefix_delimiter.clone(),
            index: self.file_prefix_index,
        })
    }
}

/// One scheduled transfer job
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobConfig {
    #[serde(default)]
    pub name: String,
    /// Schedule unit: `second`, `minute`, `hour` or `day` (plural accepted)
    #[serde(rename = "type", default)]
    pub unit: String,
    /// Optional weekday pin for day-unit schedules (e.g. `monday`)
    #[serde(default)]
    pub specific_day: String,
    /// Optional wall-clock pin, `HH:MM`
    #[serde(default)]
    pub at: String,
    /// Run every N units
    #[serde(default)]
    pub every: u64,
    pub task: TaskRule,
}

/// Root configuration: one source, one target, any number of jobs
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(rename = "cron", default)]
    pub jobs: Vec<JobConfig>,
}

impl Config {
    /// Load configuration in the requested format.
    ///
    /// `location` is a file path for [`ConfigFormat::Yaml`], an environment
    /// variable name for [`ConfigFormat::YamlBase64`], and unused for
    /// [`ConfigFormat::Env`].
    pub fn load(format: ConfigFormat, location: &str) -> Result<Self, ConfigError> {
        let config = match format {
            ConfigFormat::Yaml => Self::from_yaml_file(Path::new(location))?,
            ConfigFormat::YamlBase64 => Self::from_base64_env(location)?,
            ConfigFormat::Env => Self::from_env()?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML configuration file.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(path = %path.display(), "loaded configuration file");
        Ok(serde_yaml::from_str(&raw)?)
    }

    /// Parse base64-encoded YAML held in the named environment variable.
    pub fn from_base64_env(var: &str) -> Result<Self, ConfigError> {
        let encoded = std::env::var(var).map_err(|_| ConfigError::MissingEnv {
            var: var.to_string(),
        })?;

        let raw = BASE64_STANDARD
            .decode(encoded.trim())
            .map_err(|source| ConfigError::Base64 {
                var: var.to_string(),
                source,
            })?;

        Ok(serde_yaml::from_slice(&raw)?)
    }

    /// Assemble a single-job configuration from flat environment variables.
    ///
    /// Header and upload tables use `;`-separated `key:value` lists. Numeric
    /// variables that fail to parse fall back to their defaults, matching the
    /// lenient behaviour operators rely on in container deployments.
    pub fn from_env() -> Result<Self, ConfigError> {
        let source = SourceConfig {
            kind: env_or_default(env_keys::SOURCE_TYPE),
            host: env_or_default(env_keys::SOURCE_HOST),
            port: env_or_default(env_keys::SOURCE_PORT),
            username: env_or_default(env_keys::SOURCE_USERNAME),
            password: env_or_default(env_keys::SOURCE_PASSWORD),
            folder: env_or_default(env_keys::TASK_FOLDER),
        };

        let target = TargetConfig {
            host: env_or_default(env_keys::TARGET_HOST),
            headers: parse_pair_list(&env_or_default(env_keys::TARGET_HEADER)),
            upload: parse_pair_list(&env_or_default(env_keys::TARGET_UPLOAD_PARAM)),
            timeout_secs: env_or_default(env_keys::TIMEOUT)
                .parse()
                .unwrap_or(upload::DEFAULT_TIMEOUT_SECS),
        };

        let job = JobConfig {
            name: env_or_default(env_keys::CRON_NAME),
            unit: env_or_default(env_keys::CRON_TYPE),
            specific_day: env_or_default(env_keys::CRON_SPECIFIC_DAY),
            at: env_or_default(env_keys::CRON_AT),
            every: env_or_default(env_keys::CRON_EVERY).parse().unwrap_or(0),
            task: TaskRule {
                folder: env_or_default(env_keys::TASK_FOLDER),
                file: env_or_default(env_keys::TASK_FILE),
                file_prefix: env_or_default(env_keys::TASK_FILE_PREFIX),
                file_prefix_delimiter: env_or_default(env_keys::TASK_FILE_PREFIX_DELIMITER),
                file_prefix_index: env_or_default(env_keys::TASK_FILE_PREFIX_INDEX)
                    .parse()
                    .unwrap_or(0),
            },
        };

        Ok(Self {
            source,
            target,
            jobs: vec![job],
        })
    }

    /// Semantic validation, run once after load.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.target.host).map_err(|e| ConfigError::Invalid {
            field: "target.host".to_string(),
            reason: format!("'{}' is not a valid URL: {}", self.target.host, e),
        })?;

        let file_markers = self
            .target
            .upload
            .iter()
            .filter(|kv| kv.is_file_marker())
            .count();
        if file_markers != 1 {
            return Err(ConfigError::Invalid {
                field: "target.upload".to_string(),
                reason: format!(
                    "expected exactly one file marker pair (key == value), found {}",
                    file_markers
                ),
            });
        }

        if self.jobs.is_empty() {
            return Err(ConfigError::Invalid {
                field: "cron".to_string(),
                reason: "at least one job must be configured".to_string(),
            });
        }

        for job in &self.jobs {
            if job.name.is_empty() {
                return Err(ConfigError::Invalid {
                    field: "cron.name".to_string(),
                    reason: "job name must not be empty".to_string(),
                });
            }
            if job.every == 0 {
                return Err(ConfigError::Invalid {
                    field: format!("cron[{}].every", job.name),
                    reason: "schedule interval must be at least 1".to_string(),
                });
            }
            if !job.task.is_literal() && job.task.file_prefix_delimiter.is_empty() {
                return Err(ConfigError::Invalid {
                    field: format!("cron[{}].task.file_prefix_delimiter", job.name),
                    reason: "pattern mode requires a delimiter".to_string(),
                });
            }
            // Surface bad patterns and schedules at startup, not on the
            // first tick
            job.task.selection_rule(&job.name)?;
            crate::app::schedule::Schedule::from_job(job)?;
        }

        Ok(())
    }
}

fn env_or_default(key: &str) -> String {
    std::env::var(key).unwrap_or_default()
}

/// Parses a `;`-separated list of `key:value` pairs. Entries without a colon
/// are silently dropped.
fn parse_pair_list(raw: &str) -> Vec<KeyValue> {
    raw.split(';')
        .filter_map(|item| {
            let (key, value) = item.split_once(':')?;
            Some(KeyValue {
                key: key.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}
