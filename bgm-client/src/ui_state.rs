//! Derived UI state and the gate all state updates pass through
//!
//! `UiState` is the one value a front end renders. It is replaced as a whole,
//! never patched field by field, so contradictory combinations (uploading while
//! a download link is shown) cannot be represented.

use crate::monitor::Job;
use bgm_common::api::JobStatus;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

/// Message shown when the service reports a failed job
pub const JOB_FAILED_MESSAGE: &str = "Video processing failed. Please try again.";

/// Message shown when the optional polling deadline expires
pub const JOB_TIMED_OUT_MESSAGE: &str =
    "Video processing is taking too long. Please try again later.";

/// Message shown when the optional consecutive-failure cap is reached
pub const CONNECTION_LOST_MESSAGE: &str =
    "Lost connection to the processing service. Please try again.";

/// Reference to a finished artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    /// Opaque identifier reported by the service
    pub file_id: String,
    /// Absolute download address derived from `file_id`
    pub download_url: String,
}

/// What the upload widget shows
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UiState {
    /// Submit affordance
    #[default]
    Idle,
    /// Request body is being sent
    Submitting { upload_percent: u8 },
    /// Job accepted; progress as last reported by the service
    Polling { job_id: String, progress: u8 },
    /// Download affordance
    Completed { artifact: ArtifactRef },
    /// Error message; the form accepts a fresh submission
    Failed { message: String },
}

impl UiState {
    /// Map a job to what the user sees
    pub fn from_job(job: &Job) -> UiState {
        match (job.status, &job.result) {
            (JobStatus::Failed, _) => UiState::failed(JOB_FAILED_MESSAGE),
            (JobStatus::Completed, Some(artifact)) => UiState::Completed {
                artifact: artifact.clone(),
            },
            _ => UiState::Polling {
                job_id: job.id.clone(),
                progress: job.progress,
            },
        }
    }

    pub fn failed(message: impl Into<String>) -> UiState {
        UiState::Failed {
            message: message.into(),
        }
    }

    /// Percentage for the progress indicator
    pub fn progress(&self) -> Option<u8> {
        match self {
            UiState::Submitting { upload_percent } => Some(*upload_percent),
            UiState::Polling { progress, .. } => Some(*progress),
            _ => None,
        }
    }

    /// Label shown under the progress indicator
    pub fn phase_label(&self) -> Option<&'static str> {
        match self {
            UiState::Submitting { upload_percent } if *upload_percent < 100 => Some("Uploading..."),
            UiState::Submitting { .. } => Some("Processing your video..."),
            UiState::Polling { progress, .. } => Some(match progress {
                0..=24 => "Preparing audio...",
                25..=59 => "Looping and mixing audio...",
                60..=89 => "Rendering video...",
                _ => "Finalizing video...",
            }),
            _ => None,
        }
    }

    /// Submission or polling in progress
    pub fn is_active(&self) -> bool {
        matches!(self, UiState::Submitting { .. } | UiState::Polling { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UiState::Completed { .. } | UiState::Failed { .. })
    }

    pub fn download(&self) -> Option<&ArtifactRef> {
        match self {
            UiState::Completed { artifact } => Some(artifact),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            UiState::Failed { message } => Some(message),
            _ => None,
        }
    }
}

/// Publishing end of the UI state channel, shared by a session and its tasks
pub type UiStateSender = Arc<watch::Sender<UiState>>;

/// Guarded access to the UI state channel
///
/// Each submission attempt gets its own gate. Closing it is synchronous: once
/// `close()` returns, no publish through this gate can land, even from a task
/// that is mid-way through handling a response. Publishing and closing take
/// the same lock.
pub struct StateGate {
    open: Mutex<bool>,
    tx: UiStateSender,
}

impl StateGate {
    pub fn new(tx: UiStateSender) -> Self {
        Self {
            open: Mutex::new(true),
            tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.open.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Publish a new state; returns false if the gate is closed
    pub fn publish(&self, state: UiState) -> bool {
        let open = self.lock();
        if !*open {
            return false;
        }
        self.tx.send_replace(state);
        true
    }

    /// Publish a last state and close the gate in one step
    pub fn publish_final(&self, state: UiState) -> bool {
        let mut open = self.lock();
        if !*open {
            return false;
        }
        self.tx.send_replace(state);
        *open = false;
        true
    }

    /// Close the gate; returns whether it was open. Idempotent.
    pub fn close(&self) -> bool {
        let mut open = self.lock();
        std::mem::replace(&mut *open, false)
    }

    pub fn is_open(&self) -> bool {
        *self.lock()
    }
}
