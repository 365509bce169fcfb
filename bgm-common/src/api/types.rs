//! Request/response bodies of the media-processing service
//!
//! Field names follow the service's JSON exactly.

use serde::{Deserialize, Serialize};

// ========================================
// Job Submission
// ========================================

/// Response to a successful job submission
///
/// # Examples
///
/// ```
/// use bgm_common::api::types::SubmitJobResponse;
///
/// let body = r#"{"job_id": "abc", "message": "Processing started"}"#;
/// let response: SubmitJobResponse = serde_json::from_str(body).unwrap();
/// assert_eq!(response.job_id, "abc");
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubmitJobResponse {
    /// Opaque identifier assigned by the service
    pub job_id: String,

    /// Informational message (ignored by the client)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ========================================
// Job Status
// ========================================

/// Server-side job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Accepted, not started yet (the service reports this as "pending")
    #[serde(alias = "pending")]
    Submitted,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// True for statuses the service never leaves
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Response to a status query
///
/// `progress` is whatever the service reports. It is not guaranteed to be
/// monotonic or within 0-100; consumers clamp it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct JobStatusResponse {
    pub status: JobStatus,

    #[serde(default)]
    pub progress: i64,

    /// Artifact identifier, present once the job completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
}

impl JobStatusResponse {
    pub fn running(progress: i64) -> Self {
        Self {
            status: JobStatus::Running,
            progress,
            file_id: None,
        }
    }

    pub fn completed(file_id: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Completed,
            progress: 100,
            file_id: Some(file_id.into()),
        }
    }

    pub fn failed() -> Self {
        Self {
            status: JobStatus::Failed,
            progress: 0,
            file_id: None,
        }
    }
}

// ========================================
// Health
// ========================================

/// Body of the service root route
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthResponse {
    pub message: String,
}
