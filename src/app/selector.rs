//! File selection and de-duplication
//!
//! Each tick, the selector scans a directory listing and decides which single
//! file (if any) counts as "new" for the job. In pattern mode a dedup token is
//! extracted from every candidate name (split on the configured delimiter,
//! take the configured segment) and tracked across ticks; in literal mode the
//! configured name is returned unconditionally and no state is kept.
//!
//! Dedup state lives in memory only. A process restart forgets everything and
//! the next tick starts from a clean slate; that is a stated property of the
//! agent, not an oversight.

use std::collections::HashMap;

use chrono::{DateTime, Local, NaiveDate, Utc};
use regex::Regex;
use tracing::debug;

use crate::app::connector::DirectoryEntry;

/// Matching rule for one job, compiled from its configuration
#[derive(Debug, Clone)]
pub enum SelectionRule {
    /// Always transfer this exact filename; selection is stateless
    Literal { file: String },
    /// Regex match plus delimiter/index token extraction
    Pattern {
        prefix: Regex,
        delimiter: String,
        index: usize,
    },
}

/// What was last seen for one dedup token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    /// Modification time of the last selected file for this token
    pub last_modified: DateTime<Utc>,
    /// Name of the last selected file for this token
    pub last_name: String,
}

/// Per-job dedup memory: token -> last selected file
///
/// Owned exclusively by one job's runner and mutated only from that job's
/// ticks.
#[derive(Debug, Default)]
pub struct DedupState {
    records: HashMap<String, TokenRecord>,
}

impl DedupState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the record for a token, if any tick has selected one.
    pub fn record(&self, token: &str) -> Option<&TokenRecord> {
        self.records.get(token)
    }

    fn update(&mut self, token: &str, modified: DateTime<Utc>, name: &str) {
        self.records.insert(
            token.to_string(),
            TokenRecord {
                last_modified: modified,
                last_name: name.to_string(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Picks at most one filename from `entries` for this tick.
///
/// `today` is the current local calendar date; only entries modified on that
/// date, in local time, are eligible. Entries are considered in listing order and a later
/// qualifying entry replaces an earlier tentative pick. An entry whose name
/// equals the token's previously selected name suppresses any tentative pick
/// made so far this tick.
///
/// Dedup state advances the moment an entry qualifies, before any transfer is
/// attempted. A download or upload failure after selection therefore skips
/// that file for good; the next tick will not reconsider it.
pub fn select(
    entries: &[DirectoryEntry],
    rule: &SelectionRule,
    state: &mut DedupState,
    today: NaiveDate,
) -> Option<String> {
    let (prefix, delimiter, index) = match rule {
        // An empty literal name means the job has nothing configured to
        // transfer; treat the tick as a no-op.
        SelectionRule::Literal { file } if file.is_empty() => return None,
        SelectionRule::Literal { file } => return Some(file.clone()),
        SelectionRule::Pattern {
            prefix,
            delimiter,
            index,
        } => (prefix, delimiter, *index),
    };

    let mut selection: Option<String> = None;

    for entry in entries {
        let is_match = prefix.is_match(&entry.name);
        let is_today = entry.modified.with_timezone(&Local).date_naive() == today;

        let Some(token) = entry.name.split(delimiter.as_str()).nth(index) else {
            debug!(name = %entry.name, index, "name has too few segments, skipping");
            continue;
        };

        let is_newer = state
            .record(token)
            .map(|r| entry.modified > r.last_modified)
            .unwrap_or(true);
        let is_different = state
            .record(token)
            .map(|r| r.last_name != entry.name)
            .unwrap_or(true);

        // An exact repeat of the last upload cancels this tick's tentative
        // pick outright, even if an earlier entry qualified.
        if !is_different {
            selection = None;
            continue;
        }

        if is_match && is_today && is_newer && is_different {
            state.update(token, entry.modified, &entry.name);
            selection = Some(entry.name.clone());
        }
    }

    selection
}
