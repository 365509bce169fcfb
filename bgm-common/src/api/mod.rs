//! Media-processing service API definitions
//!
//! Contains ONLY the wire contract of the processing service (routes,
//! multipart field names, response bodies). HTTP plumbing lives in the
//! client crate.

pub mod types;

pub use types::{HealthResponse, JobStatus, JobStatusResponse, SubmitJobResponse};

/// Job submission route (multipart POST)
pub const PROCESS_PATH: &str = "api/process";

/// Job status route prefix; the job id is appended as the last path segment
pub const STATUS_PATH: &str = "api/status";

/// Artifact download route prefix; the file id is appended as the last path segment
pub const DOWNLOAD_PATH: &str = "api/download";

/// Multipart field names accepted by the submission route
pub mod fields {
    pub const AUDIO_FILE: &str = "audio_file";
    pub const IMAGE_FILE: &str = "image_file";
    pub const DURATION: &str = "duration";
    pub const FREQUENCY: &str = "frequency";
    pub const FADE_IN: &str = "fade_in";
    pub const FADE_OUT: &str = "fade_out";
    pub const ADD_MOTION: &str = "add_motion";
    pub const AUDIO_PROFILE: &str = "audio_profile";
    pub const APPLY_FREQUENCY_OPTIMIZATION: &str = "apply_frequency_optimization";
}

/// File name the processing service gives a finished artifact
pub fn artifact_file_name(file_id: &str) -> String {
    format!("bgm_{}.mp4", file_id)
}
