//! bgm-client library interface
//!
//! Client for the BGM Creator media-processing service: submit an audio file
//! (plus optional image), follow the job until the rendered video is ready,
//! and download it.
//!
//! Data flows one way: `FormState` → `SubmissionClient` → job id →
//! `PollingMonitor` → terminal `UiState`. `UploadSession` owns all three.

pub mod backend;
pub mod error;
pub mod form;
pub mod http;
pub mod monitor;
pub mod render;
pub mod session;
pub mod submission;
pub mod ui_state;

pub use crate::backend::{JobBackend, SubmissionPayload, UploadProgress};
pub use crate::error::{ClientError, DownloadError, PollError, SubmissionError, ValidationError};
pub use crate::form::{AudioProfile, FormState, FrequencyFactor, MediaFile};
pub use crate::http::HttpBackend;
pub use crate::monitor::{Job, PollConfig, PollingMonitor};
pub use crate::session::UploadSession;
pub use crate::ui_state::{ArtifactRef, UiState};
