//! Processing service boundary
//!
//! `JobBackend` is the seam between the state machine and the network. The
//! HTTP implementation lives in `http`; tests substitute scripted backends.

use crate::error::{PollError, SubmissionError};
use async_trait::async_trait;
use bgm_common::api::JobStatusResponse;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

/// Callback receiving the upload percentage (0-100) while a request body is sent
pub type UploadProgress = Arc<dyn Fn(u8) + Send + Sync>;

/// Progress callback that discards updates
pub fn no_progress() -> UploadProgress {
    Arc::new(|_| {})
}

/// One file part of a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadFile {
    /// Multipart field name
    pub field: &'static str,
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Everything one job submission sends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionPayload {
    pub audio: PayloadFile,
    pub image: Option<PayloadFile>,
    /// Text fields in send order
    pub fields: Vec<(&'static str, String)>,
}

impl SubmissionPayload {
    /// Value of a text field, if sent
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value.as_str())
    }

    /// Size of all file parts
    pub fn total_file_bytes(&self) -> u64 {
        let image = self.image.as_ref().map(|f| f.bytes.len()).unwrap_or(0);
        (self.audio.bytes.len() + image) as u64
    }
}

/// Turns "bytes handed to the transport" into upload percentages
///
/// Reports each percentage at most once and never goes backwards.
pub struct UploadTracker {
    total: u64,
    sent: AtomicU64,
    last_reported: AtomicU8,
    callback: UploadProgress,
}

impl UploadTracker {
    pub fn new(total: u64, callback: UploadProgress) -> Self {
        Self {
            total,
            sent: AtomicU64::new(0),
            last_reported: AtomicU8::new(0),
            callback,
        }
    }

    /// Record `bytes` more sent
    pub fn advance(&self, bytes: u64) {
        let sent = self.sent.fetch_add(bytes, Ordering::AcqRel) + bytes;
        let percent = if self.total == 0 {
            100
        } else {
            (sent.min(self.total) * 100 / self.total) as u8
        };

        if self.last_reported.fetch_max(percent, Ordering::AcqRel) < percent {
            (self.callback)(percent);
        }
    }
}

/// Media-processing service operations the client state machine needs
#[async_trait]
pub trait JobBackend: Send + Sync + 'static {
    /// Create a job; returns the job id assigned by the service
    async fn submit_job(
        &self,
        payload: SubmissionPayload,
        progress: UploadProgress,
    ) -> Result<String, SubmissionError>;

    /// Query the status of one job
    async fn job_status(&self, job_id: &str) -> Result<JobStatusResponse, PollError>;

    /// Download address for a finished artifact
    fn artifact_url(&self, file_id: &str) -> String;
}
