//! Upload session: the interactive widget
//!
//! Ties the form, the submission client and the polling monitor to one
//! `UiState` channel. Creating a session mounts the widget; `teardown()` (or
//! dropping the session) unmounts it and stops every timer and pending update
//! it owns.

use crate::backend::{JobBackend, UploadProgress};
use crate::error::ClientError;
use crate::form::FormState;
use crate::monitor::{PollConfig, PollingMonitor};
use crate::submission::SubmissionClient;
use crate::ui_state::{StateGate, UiState, UiStateSender};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub struct UploadSession {
    form: FormState,
    backend: Arc<dyn JobBackend>,
    submitter: SubmissionClient,
    poll_config: PollConfig,
    tx: UiStateSender,
    /// Gate for upload progress of the current attempt
    upload_gate: Option<Arc<StateGate>>,
    monitor: PollingMonitor,
    torn_down: bool,
}

impl UploadSession {
    pub fn new(backend: Arc<dyn JobBackend>, poll_config: PollConfig) -> Self {
        let (tx, _rx) = watch::channel(UiState::Idle);
        Self {
            form: FormState::new(),
            submitter: SubmissionClient::new(backend.clone()),
            backend,
            poll_config,
            tx: Arc::new(tx),
            upload_gate: None,
            monitor: PollingMonitor::default(),
            torn_down: false,
        }
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormState {
        &mut self.form
    }

    /// Current UI state
    pub fn state(&self) -> UiState {
        self.tx.borrow().clone()
    }

    /// Receive every UI state change
    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.tx.subscribe()
    }

    /// Job id being polled, if any
    pub fn active_job_id(&self) -> Option<&str> {
        if self.monitor.is_active() {
            self.monitor.job_id()
        } else {
            None
        }
    }

    /// A submission is in flight or a job is being polled
    pub fn is_busy(&self) -> bool {
        self.submitter.is_in_flight() || self.monitor.is_active()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Validate the form, submit it, and start polling the new job
    ///
    /// Rejected without any network call when the form is invalid, a job is
    /// already active, or the session was torn down. Any previous result or
    /// error is cleared before the request is sent.
    pub async fn submit(&mut self) -> Result<String, ClientError> {
        if self.torn_down {
            return Err(ClientError::TornDown);
        }
        if self.is_busy() {
            return Err(ClientError::JobActive);
        }
        self.form.validate()?;

        // The previous attempt is over; nothing from it may publish again
        self.monitor.cancel();
        self.close_upload_gate();

        let gate = Arc::new(StateGate::new(self.tx.clone()));
        gate.publish(UiState::Submitting { upload_percent: 0 });
        self.upload_gate = Some(gate.clone());

        let progress: UploadProgress = {
            let gate = gate.clone();
            Arc::new(move |upload_percent| {
                gate.publish(UiState::Submitting { upload_percent });
            })
        };

        let result = self.submitter.submit(&self.form, progress).await;
        self.close_upload_gate();

        match result {
            Ok(job_id) => {
                info!(job_id = %job_id, "Polling job status");
                self.tx.send_replace(UiState::Polling {
                    job_id: job_id.clone(),
                    progress: 0,
                });
                self.monitor = PollingMonitor::start(
                    self.backend.clone(),
                    job_id.clone(),
                    self.poll_config.clone(),
                    self.tx.clone(),
                );
                Ok(job_id)
            }
            Err(e) => {
                warn!("Job submission failed: {}", e);
                self.tx.send_replace(UiState::failed(e.user_message()));
                Err(e.into())
            }
        }
    }

    /// Unmount: stop polling and drop pending updates. Idempotent.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.monitor.cancel();
        self.close_upload_gate();
        debug!("Upload session torn down");
    }

    fn close_upload_gate(&mut self) {
        if let Some(gate) = self.upload_gate.take() {
            gate.close();
        }
    }
}

impl Drop for UploadSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
