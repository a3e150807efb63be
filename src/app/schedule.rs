//! Recurring schedule computation
//!
//! Jobs run every N units (seconds, minutes, hours or days), optionally
//! pinned to a wall-clock time of day and, for day-unit schedules, to a
//! specific weekday. This module turns a job's schedule configuration into a
//! period plus a first-run delay; the runner does the actual sleeping.

use std::time::Duration;

use chrono::{Datelike, NaiveDateTime, NaiveTime, Weekday};

use crate::config::JobConfig;
use crate::errors::ConfigError;

/// Schedule interval unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleUnit {
    Second,
    Minute,
    Hour,
    Day,
}

impl ScheduleUnit {
    /// Parses a unit name, singular or plural. Unrecognized values fall back
    /// to days.
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().trim_end_matches('s') {
            "second" => Self::Second,
            "minute" => Self::Minute,
            "hour" => Self::Hour,
            _ => Self::Day,
        }
    }

    fn seconds(self) -> u64 {
        match self {
            Self::Second => 1,
            Self::Minute => 60,
            Self::Hour => 3_600,
            Self::Day => 86_400,
        }
    }
}

/// Resolved schedule for one job
#[derive(Debug, Clone)]
pub struct Schedule {
    every: u64,
    unit: ScheduleUnit,
    at: Option<NaiveTime>,
    day: Option<Weekday>,
}

impl Schedule {
    /// Resolves a job's schedule configuration, rejecting malformed `at`
    /// times and weekday names at startup.
    pub fn from_job(job: &JobConfig) -> Result<Self, ConfigError> {
        let at = if job.at.is_empty() {
            None
        } else {
            Some(
                NaiveTime::parse_from_str(&job.at, "%H:%M").map_err(|e| ConfigError::Invalid {
                    field: format!("cron[{}].at", job.name),
                    reason: format!("'{}' is not a valid HH:MM time: {}", job.at, e),
                })?,
            )
        };

        let day = if job.specific_day.is_empty() {
            None
        } else {
            Some(
                job.specific_day
                    .parse::<Weekday>()
                    .map_err(|_| ConfigError::Invalid {
                        field: format!("cron[{}].specific_day", job.name),
                        reason: format!("'{}' is not a weekday name", job.specific_day),
                    })?,
            )
        };

        Ok(Self {
            every: job.every,
            unit: ScheduleUnit::parse(&job.unit),
            at,
            day,
        })
    }

    /// The recurring interval between ticks.
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.every * self.unit.seconds())
    }

    /// Delay before the first tick, relative to `now` (local wall-clock).
    ///
    /// Zero when the schedule has no wall-clock or weekday pin; the runner
    /// then waits one full period instead.
    pub fn initial_delay(&self, now: NaiveDateTime) -> Duration {
        if self.at.is_none() && self.day.is_none() {
            return Duration::ZERO;
        }

        let time = self.at.unwrap_or(NaiveTime::MIN);
        let mut target = now.date().and_time(time);

        // At most a week of forward scan: one day past the pinned weekday.
        for _ in 0..8 {
            let day_matches = self.day.map_or(true, |d| target.weekday() == d);
            if target > now && day_matches {
                break;
            }
            target += chrono::Duration::days(1);
        }

        (target - now).to_std().unwrap_or(Duration::ZERO)
    }
}
