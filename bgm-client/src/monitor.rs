//! Polling monitor
//!
//! Once a job id exists, a spawned task queries the job status on a fixed
//! interval and publishes the derived `UiState` until the job completes, fails,
//! or the monitor is cancelled.
//!
//! Guarantees:
//! - At most one status query is outstanding. Ticks that come due while a slow
//!   query is pending are skipped, not queued, so responses apply in order.
//! - A failed query is logged and ignored; the displayed progress is kept.
//! - After `cancel()` returns (or the monitor is dropped) no further query is
//!   started and no state is published, even for a response already in flight.
//! - A terminal state is published exactly once and stops the loop.

use crate::backend::JobBackend;
use crate::ui_state::{
    ArtifactRef, StateGate, UiState, UiStateSender, CONNECTION_LOST_MESSAGE,
    JOB_TIMED_OUT_MESSAGE,
};
use bgm_common::api::{JobStatus, JobStatusResponse};
use bgm_common::config::PollingConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Polling behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Time between status queries; the first query happens one interval after start
    pub interval: Duration,

    /// Give up after this long (None: poll until a terminal status or teardown)
    pub max_wait: Option<Duration>,

    /// Give up after this many failed queries in a row (None: never)
    pub max_consecutive_failures: Option<u32>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::from(&PollingConfig::default())
    }
}

impl From<&PollingConfig> for PollConfig {
    fn from(config: &PollingConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.interval_ms.max(1)),
            max_wait: config.max_wait_secs.map(Duration::from_secs),
            max_consecutive_failures: config.max_consecutive_failures,
        }
    }
}

/// Client-side view of one server job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    /// Last reported progress, clamped to 0-100
    pub progress: u8,
    /// Finished artifact, set only once the job completed with a file id
    pub result: Option<ArtifactRef>,
}

impl Job {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Submitted,
            progress: 0,
            result: None,
        }
    }

    /// Apply one status response; returns true once the job is terminal
    ///
    /// Progress is taken as reported, including drops. A "completed" status
    /// without a file id does not finish the job.
    pub fn apply(
        &mut self,
        response: JobStatusResponse,
        artifact_url: impl FnOnce(&str) -> String,
    ) -> bool {
        self.status = response.status;
        self.progress = response.progress.clamp(0, 100) as u8;

        if response.status == JobStatus::Completed {
            match response.file_id.filter(|id| !id.trim().is_empty()) {
                Some(file_id) => {
                    self.result = Some(ArtifactRef {
                        download_url: artifact_url(&file_id),
                        file_id,
                    });
                }
                None => warn!(job_id = %self.id, "Job reported completed without a file id"),
            }
        }

        self.is_terminal()
    }

    pub fn is_terminal(&self) -> bool {
        match self.status {
            JobStatus::Failed => true,
            JobStatus::Completed => self.result.is_some(),
            JobStatus::Submitted | JobStatus::Running => false,
        }
    }
}

/// Handle owning the polling task of one job
///
/// `Default` is a monitor that was never started.
#[derive(Default)]
pub struct PollingMonitor {
    job_id: Option<String>,
    token: CancellationToken,
    gate: Option<Arc<StateGate>>,
    handle: Option<JoinHandle<()>>,
}

impl PollingMonitor {
    /// Start polling `job_id`, publishing into `tx`
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        backend: Arc<dyn JobBackend>,
        job_id: String,
        config: PollConfig,
        tx: UiStateSender,
    ) -> Self {
        let token = CancellationToken::new();
        let gate = Arc::new(StateGate::new(tx));

        debug!(job_id = %job_id, interval = ?config.interval, "Starting status polling");

        let task = PollTask {
            backend,
            job: Job::new(job_id.clone()),
            config,
            gate: gate.clone(),
            token: token.clone(),
        };
        let handle = tokio::spawn(task.run());

        Self {
            job_id: Some(job_id),
            token,
            gate: Some(gate),
            handle: Some(handle),
        }
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    /// True while the loop may still publish
    pub fn is_active(&self) -> bool {
        self.handle.is_some() && !self.token.is_cancelled()
    }

    /// Stop polling. Safe to call any number of times, before or after the job finished.
    pub fn cancel(&mut self) {
        let was_open = self.gate.as_ref().map(|g| g.close()).unwrap_or(false);
        self.token.cancel();

        if let Some(handle) = self.handle.take() {
            handle.abort();
        }

        if was_open {
            if let Some(job_id) = &self.job_id {
                info!(job_id = %job_id, "Status polling cancelled");
            }
        }
    }
}

impl Drop for PollingMonitor {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct PollTask {
    backend: Arc<dyn JobBackend>,
    job: Job,
    config: PollConfig,
    gate: Arc<StateGate>,
    token: CancellationToken,
}

impl PollTask {
    async fn run(mut self) {
        let started = Instant::now();
        let mut ticker = time::interval_at(started + self.config.interval, self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut consecutive_failures: u32 = 0;
        let mut ticks: u64 = 0;

        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                _ = ticker.tick() => {}
            }
            ticks += 1;

            if let Some(max_wait) = self.config.max_wait {
                if started.elapsed() >= max_wait {
                    warn!(job_id = %self.job.id, ?max_wait, "Giving up on job: deadline passed");
                    self.finish(UiState::failed(JOB_TIMED_OUT_MESSAGE));
                    break;
                }
            }

            let response = tokio::select! {
                biased;
                _ = self.token.cancelled() => break,
                response = self.backend.job_status(&self.job.id) => response,
            };

            match response {
                Ok(status) => {
                    consecutive_failures = 0;

                    let backend = &self.backend;
                    let terminal = self.job.apply(status, |file_id| backend.artifact_url(file_id));
                    debug!(
                        job_id = %self.job.id,
                        tick = ticks,
                        status = ?self.job.status,
                        progress = self.job.progress,
                        "Status check"
                    );

                    let state = UiState::from_job(&self.job);
                    if terminal {
                        info!(job_id = %self.job.id, status = ?self.job.status, "Job finished");
                        self.finish(state);
                        break;
                    }

                    if !self.gate.publish(state) {
                        break;
                    }
                }
                Err(e) => {
                    consecutive_failures += 1;
                    warn!(
                        job_id = %self.job.id,
                        tick = ticks,
                        consecutive_failures,
                        "Status check failed, retrying next interval: {}",
                        e
                    );

                    if let Some(max) = self.config.max_consecutive_failures {
                        if consecutive_failures >= max {
                            warn!(job_id = %self.job.id, "Giving up on job: too many failed status checks");
                            self.finish(UiState::failed(CONNECTION_LOST_MESSAGE));
                            break;
                        }
                    }
                }
            }
        }

        debug!(job_id = %self.job.id, ticks, "Status polling stopped");
    }

    /// Publish the last state and tear the loop down
    fn finish(&self, state: UiState) {
        self.gate.publish_final(state);
        self.token.cancel();
    }
}
