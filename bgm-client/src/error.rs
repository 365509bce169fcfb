//! Error types for bgm-client
//!
//! Every error kind is scoped to one submission attempt. None of them is
//! fatal to the session, and all of them reduce to a user-facing string via
//! `user_message()`.

use thiserror::Error;

/// Message shown for any failed job submission
pub const SUBMISSION_FAILED_MESSAGE: &str = "Error processing your request. Please try again.";

/// Local form validation failure (never reaches the network)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no audio file selected")]
    NoAudioFile,

    #[error("{field} must be between {min} and {max} (got {value})")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

/// Job creation failure
///
/// Variants exist for logging; the UI shows `SUBMISSION_FAILED_MESSAGE` for all of them.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("a submission is already in flight")]
    AlreadyInFlight,

    #[error("form rejected: {0}")]
    Invalid(#[from] ValidationError),

    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl SubmissionError {
    pub fn user_message(&self) -> String {
        SUBMISSION_FAILED_MESSAGE.to_string()
    }
}

/// Failure of a single status query
///
/// Swallowed by the polling loop; the next tick retries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PollError {
    #[error("network error: {0}")]
    Network(String),

    #[error("service returned {0}")]
    Status(u16),

    #[error("malformed status body: {0}")]
    MalformedResponse(String),
}

/// Artifact retrieval failure
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("network error: {0}")]
    Network(String),

    #[error("service returned {0}")]
    Status(u16),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Session-level error returned by `UploadSession::submit`
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    /// A job is already being submitted or polled
    #[error("a job is already active")]
    JobActive,

    /// The session was torn down
    #[error("session has been torn down")]
    TornDown,
}

impl ClientError {
    /// Normalize to the string shown to the user
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(e) => capitalize(&e.to_string()),
            ClientError::Submission(e) => e.user_message(),
            ClientError::JobActive => "A video is already being created.".to_string(),
            ClientError::TornDown => "The upload form is no longer available.".to_string(),
        }
    }
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
