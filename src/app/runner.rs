//! Per-job task runner
//!
//! Each configured job gets one runner, spawned as its own tokio task. The
//! runner owns the job's delivery pipeline (and with it the job's dedup
//! state), sleeps out the schedule, and fires a tick per period. A tick that
//! outlives the next trigger — typically a slow upload retry loop — is
//! guarded against: an overlapping trigger is skipped with a warning rather
//! than run concurrently.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::app::pipeline::DeliveryPipeline;
use crate::app::schedule::Schedule;
use crate::config::{Config, JobConfig};
use crate::errors::Result;

/// Wires one job's schedule to its delivery pipeline
pub struct TaskRunner {
    name: String,
    schedule: Schedule,
    pipeline: DeliveryPipeline,
    in_flight: tokio::sync::Mutex<()>,
}

impl TaskRunner {
    /// Builds the runner for one configured job.
    pub fn new(config: &Config, job: JobConfig) -> Result<Self> {
        let schedule = Schedule::from_job(&job)?;
        let pipeline =
            DeliveryPipeline::new(config.source.clone(), config.target.clone(), job)?;

        Ok(Self::from_parts(schedule, pipeline))
    }

    /// Assembles a runner from pre-built parts.
    pub fn from_parts(schedule: Schedule, pipeline: DeliveryPipeline) -> Self {
        Self {
            name: pipeline.job_name().to_string(),
            schedule,
            pipeline,
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Time until this runner's first tick, for the startup banner.
    pub fn first_wait(&self) -> Duration {
        let delay = self.schedule.initial_delay(Local::now().naive_local());
        if delay.is_zero() {
            self.schedule.period()
        } else {
            delay
        }
    }

    /// Runs the job forever. Never returns; errors are logged per tick.
    pub async fn run(self: Arc<Self>) {
        info!(
            job = %self.name,
            period = ?self.schedule.period(),
            first_run_in = ?self.first_wait(),
            "job registered"
        );

        tokio::time::sleep(self.first_wait()).await;

        let mut interval = tokio::time::interval(self.schedule.period());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // The first tick of a fresh interval completes immediately, so
            // the sleep above sets the actual start time.
            interval.tick().await;
            self.tick().await;
        }
    }

    /// Executes one tick unless the previous one is still in flight.
    ///
    /// Returns whether the tick actually ran.
    pub async fn tick(&self) -> bool {
        let Ok(_guard) = self.in_flight.try_lock() else {
            warn!(job = %self.name, "previous run still in progress, skipping tick");
            return false;
        };

        info!(job = %self.name, "tick started");
        match self.pipeline.run().await {
            Ok(()) => info!(job = %self.name, "tick finished"),
            Err(e) => warn!(job = %self.name, error = %e, "tick aborted"),
        }
        true
    }
}
