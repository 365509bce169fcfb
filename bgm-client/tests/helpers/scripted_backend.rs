//! In-memory `JobBackend` driven by a script
//!
//! Submissions and status responses are popped from queues in order. Status
//! queries can be slowed down to exercise overlap handling, and submissions
//! can be held open so a test can inspect the state mid-upload.

use async_trait::async_trait;
use bgm_client::{JobBackend, PollError, SubmissionError, SubmissionPayload, UploadProgress};
use bgm_common::api::JobStatusResponse;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// Handshake for pausing a submission inside the backend
#[derive(Default)]
pub struct SubmitHold {
    /// Notified when a submission reaches the backend
    pub entered: Notify,
    /// Notify to let the held submission continue
    pub release: Notify,
}

pub struct ScriptedBackend {
    submissions: Mutex<VecDeque<Result<String, SubmissionError>>>,
    statuses: Mutex<VecDeque<Result<JobStatusResponse, PollError>>>,
    poll_delay: Duration,
    hold: Option<Arc<SubmitHold>>,
    payloads: Mutex<Vec<SubmissionPayload>>,
    polled_ids: Mutex<Vec<String>>,
    submit_calls: AtomicUsize,
    poll_calls: AtomicUsize,
    polls_in_flight: AtomicUsize,
    max_polls_in_flight: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            submissions: Mutex::new(VecDeque::new()),
            statuses: Mutex::new(VecDeque::new()),
            poll_delay: Duration::ZERO,
            hold: None,
            payloads: Mutex::new(Vec::new()),
            polled_ids: Mutex::new(Vec::new()),
            submit_calls: AtomicUsize::new(0),
            poll_calls: AtomicUsize::new(0),
            polls_in_flight: AtomicUsize::new(0),
            max_polls_in_flight: AtomicUsize::new(0),
        }
    }

    /// Next submission succeeds with `job_id`
    pub fn with_job(self, job_id: &str) -> Self {
        self.submissions
            .lock()
            .unwrap()
            .push_back(Ok(job_id.to_string()));
        self
    }

    /// Next submission fails with `error`
    pub fn with_submit_error(self, error: SubmissionError) -> Self {
        self.submissions.lock().unwrap().push_back(Err(error));
        self
    }

    /// Status responses, one per query; a network error once exhausted
    pub fn with_statuses(
        self,
        statuses: impl IntoIterator<Item = Result<JobStatusResponse, PollError>>,
    ) -> Self {
        self.statuses.lock().unwrap().extend(statuses);
        self
    }

    /// Every status query takes this long to answer
    pub fn with_poll_delay(mut self, delay: Duration) -> Self {
        self.poll_delay = delay;
        self
    }

    /// Park every submission until `SubmitHold::release` is notified
    pub fn with_submit_hold(mut self) -> (Self, Arc<SubmitHold>) {
        let hold = Arc::new(SubmitHold::default());
        self.hold = Some(hold.clone());
        (self, hold)
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn poll_calls(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }

    /// Highest number of status queries ever outstanding at once
    pub fn max_polls_in_flight(&self) -> usize {
        self.max_polls_in_flight.load(Ordering::SeqCst)
    }

    pub fn polled_ids(&self) -> Vec<String> {
        self.polled_ids.lock().unwrap().clone()
    }

    pub fn last_payload(&self) -> Option<SubmissionPayload> {
        self.payloads.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl JobBackend for ScriptedBackend {
    async fn submit_job(
        &self,
        payload: SubmissionPayload,
        progress: UploadProgress,
    ) -> Result<String, SubmissionError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.payloads.lock().unwrap().push(payload);

        if let Some(hold) = &self.hold {
            hold.entered.notify_one();
            hold.release.notified().await;
        }

        progress(50);
        progress(100);

        self.submissions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SubmissionError::Network("no scripted submission".to_string())))
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatusResponse, PollError> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        self.polled_ids.lock().unwrap().push(job_id.to_string());

        let in_flight = self.polls_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_polls_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        if !self.poll_delay.is_zero() {
            tokio::time::sleep(self.poll_delay).await;
        }
        self.polls_in_flight.fetch_sub(1, Ordering::SeqCst);

        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(PollError::Network("script exhausted".to_string())))
    }

    fn artifact_url(&self, file_id: &str) -> String {
        format!("mem://download/{}", file_id)
    }
}
