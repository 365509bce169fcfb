//! Submission client
//!
//! Serializes a `FormState` into a `SubmissionPayload`, sends it through the
//! backend and returns the job id. At most one submission is in flight per
//! client.

use crate::backend::{JobBackend, PayloadFile, SubmissionPayload, UploadProgress};
use crate::error::{SubmissionError, ValidationError};
use crate::form::{FormState, MediaFile};
use bgm_common::api::fields;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

const FALLBACK_MIME: &str = "application/octet-stream";

/// Text fields for a form, in send order
///
/// `frequency` is omitted when no adjustment is selected.
pub fn payload_fields(form: &FormState) -> Vec<(&'static str, String)> {
    let mut out = vec![(fields::DURATION, form.duration_seconds().to_string())];

    if let Some(factor) = form.frequency_factor() {
        out.push((fields::FREQUENCY, factor.factor().to_string()));
    }

    out.push((fields::FADE_IN, form.fade_in_seconds().to_string()));
    out.push((fields::FADE_OUT, form.fade_out_seconds().to_string()));
    out.push((fields::ADD_MOTION, form.motion_enabled().to_string()));
    out.push((fields::AUDIO_PROFILE, form.audio_profile().as_str().to_string()));
    out.push((
        fields::APPLY_FREQUENCY_OPTIMIZATION,
        form.frequency_optimization_enabled().to_string(),
    ));

    out
}

/// Read the selected files and assemble the full payload
pub async fn build_payload(form: &FormState) -> Result<SubmissionPayload, SubmissionError> {
    form.validate()?;

    let audio = match form.audio_file() {
        Some(file) => read_media(fields::AUDIO_FILE, file).await?,
        None => return Err(ValidationError::NoAudioFile.into()),
    };

    let image = match form.image_file() {
        Some(file) => Some(read_media(fields::IMAGE_FILE, file).await?),
        None => None,
    };

    Ok(SubmissionPayload {
        audio,
        image,
        fields: payload_fields(form),
    })
}

async fn read_media(field: &'static str, file: &MediaFile) -> Result<PayloadFile, SubmissionError> {
    let bytes = tokio::fs::read(file.path())
        .await
        .map_err(|source| SubmissionError::ReadFile {
            path: file.path().display().to_string(),
            source,
        })?;

    let mime = infer::get(&bytes)
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| FALLBACK_MIME.to_string());

    debug!(
        field = field,
        file = %file.path().display(),
        bytes = bytes.len(),
        mime = %mime,
        "Read upload file"
    );

    Ok(PayloadFile {
        field,
        file_name: file.file_name(),
        mime,
        bytes,
    })
}

/// Sends submissions, one at a time
pub struct SubmissionClient {
    backend: Arc<dyn JobBackend>,
    in_flight: AtomicBool,
}

impl SubmissionClient {
    pub fn new(backend: Arc<dyn JobBackend>) -> Self {
        Self {
            backend,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Submit the form and return the job id
    ///
    /// A call made while another is outstanding fails with
    /// `AlreadyInFlight` without touching the network. No retry is attempted.
    pub async fn submit(
        &self,
        form: &FormState,
        progress: UploadProgress,
    ) -> Result<String, SubmissionError> {
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(SubmissionError::AlreadyInFlight)?;

        let payload = build_payload(form).await?;
        info!(
            audio = %payload.audio.file_name,
            image = payload.image.as_ref().map(|f| f.file_name.as_str()).unwrap_or("-"),
            upload_bytes = payload.total_file_bytes(),
            "Submitting job"
        );

        let job_id = self.backend.submit_job(payload, progress).await?;
        let job_id = job_id.trim();
        if job_id.is_empty() {
            return Err(SubmissionError::MalformedResponse(
                "empty job_id in response".to_string(),
            ));
        }

        info!(job_id = %job_id, "Job accepted");
        Ok(job_id.to_string())
    }
}

/// Holds the in-flight flag; released on drop, including when the submit future is dropped
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
