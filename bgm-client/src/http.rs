//! HTTP implementation of the processing service boundary

use crate::backend::{JobBackend, PayloadFile, SubmissionPayload, UploadProgress, UploadTracker};
use crate::error::{DownloadError, PollError, SubmissionError};
use crate::ui_state::ArtifactRef;
use async_trait::async_trait;
use bgm_common::api::{
    HealthResponse, JobStatusResponse, SubmitJobResponse, DOWNLOAD_PATH, PROCESS_PATH, STATUS_PATH,
};
use bgm_common::config::parse_backend_url;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Url};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

const USER_AGENT: &str = concat!("bgm-client/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Bound for a single status query or health check
const QUERY_TIMEOUT: Duration = Duration::from_secs(15);
/// Upload bodies are streamed in chunks of this size
const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// Processing service client over HTTP
pub struct HttpBackend {
    http_client: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> bgm_common::Result<Self> {
        let base_url = parse_backend_url(base_url)?;

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| bgm_common::Error::Config(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/{route}[/{id}]`, with `id` percent-encoded as one path segment
    fn endpoint(&self, route: &str, id: Option<&str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            segments.extend(route.split('/'));
            if let Some(id) = id {
                segments.push(id);
            }
        }
        url
    }

    /// Check the service answers on its root route
    pub async fn health(&self) -> Result<HealthResponse, PollError> {
        let response = self
            .http_client
            .get(self.base_url.clone())
            .timeout(QUERY_TIMEOUT)
            .send()
            .await
            .map_err(|e| PollError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PollError::Status(response.status().as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| PollError::MalformedResponse(e.to_string()))
    }

    /// Stream a finished artifact to `dest`; returns the number of bytes written
    ///
    /// Data goes to `<dest>.part` first and is renamed into place once complete.
    pub async fn download_artifact(
        &self,
        artifact: &ArtifactRef,
        dest: &Path,
    ) -> Result<u64, DownloadError> {
        let response = self
            .http_client
            .get(&artifact.download_url)
            .send()
            .await
            .map_err(|e| DownloadError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DownloadError::Status(response.status().as_u16()));
        }

        let partial = partial_path(dest);
        let written = match stream_to_file(response, &partial, dest).await {
            Ok(written) => written,
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e);
            }
        };

        tracing::info!(
            file_id = %artifact.file_id,
            dest = %dest.display(),
            bytes = written,
            "Artifact downloaded"
        );
        Ok(written)
    }
}

/// Write the body to `partial`, then move it to `dest`
async fn stream_to_file(
    response: reqwest::Response,
    partial: &Path,
    dest: &Path,
) -> Result<u64, DownloadError> {
    let mut file = tokio::fs::File::create(partial).await?;
    let mut written: u64 = 0;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| DownloadError::Network(e.to_string()))?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    drop(file);
    tokio::fs::rename(partial, dest).await?;
    Ok(written)
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

/// Build the multipart body; file parts report progress as they are streamed out
fn multipart_form(payload: SubmissionPayload, progress: UploadProgress) -> Result<Form, SubmissionError> {
    let tracker = Arc::new(UploadTracker::new(payload.total_file_bytes(), progress));

    let mut form = Form::new();
    let SubmissionPayload {
        audio,
        image,
        fields,
    } = payload;

    let audio_field = audio.field;
    form = form.part(audio_field, streamed_part(audio, tracker.clone())?);

    if let Some(image) = image {
        let image_field = image.field;
        form = form.part(image_field, streamed_part(image, tracker)?);
    }

    for (name, value) in fields {
        form = form.text(name, value);
    }

    Ok(form)
}

fn streamed_part(file: PayloadFile, tracker: Arc<UploadTracker>) -> Result<Part, SubmissionError> {
    let length = file.bytes.len() as u64;
    let chunks: Vec<Vec<u8>> = file
        .bytes
        .chunks(UPLOAD_CHUNK_BYTES)
        .map(<[u8]>::to_vec)
        .collect();

    let stream = futures::stream::iter(chunks).map(move |chunk| {
        tracker.advance(chunk.len() as u64);
        Ok::<_, std::io::Error>(chunk)
    });

    Part::stream_with_length(Body::wrap_stream(stream), length)
        .file_name(file.file_name)
        .mime_str(&file.mime)
        .map_err(|e| SubmissionError::Network(format!("invalid content type {:?}: {}", file.mime, e)))
}

#[async_trait]
impl JobBackend for HttpBackend {
    async fn submit_job(
        &self,
        payload: SubmissionPayload,
        progress: UploadProgress,
    ) -> Result<String, SubmissionError> {
        let url = self.endpoint(PROCESS_PATH, None);
        let form = multipart_form(payload, progress)?;

        tracing::debug!(url = %url, "Posting job submission");

        let response = self
            .http_client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SubmissionError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SubmissionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: SubmitJobResponse = response
            .json()
            .await
            .map_err(|e| SubmissionError::MalformedResponse(e.to_string()))?;

        Ok(body.job_id)
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatusResponse, PollError> {
        let response = self
            .http_client
            .get(self.endpoint(STATUS_PATH, Some(job_id)))
            .timeout(QUERY_TIMEOUT)
            .send()
            .await
            .map_err(|e| PollError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PollError::Status(status.as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| PollError::MalformedResponse(e.to_string()))
    }

    fn artifact_url(&self, file_id: &str) -> String {
        self.endpoint(DOWNLOAD_PATH, Some(file_id)).to_string()
    }
}
