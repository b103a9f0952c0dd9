use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};
use serde::de::DeserializeOwned;

use crate::error::{JobError, Result};
use crate::job::{GenerationResult, Job, TaskStatus};
use crate::models::{ApiErrorBody, TaskEnvelope, TaskOutput, TaskUsage};
use crate::presets::MediaKind;
use crate::request::GenerationRequest;
use crate::tensor::decode_image;
use crate::transport::{
    Headers, HttpTransport, RawResponse, ThreadSleeper, Transport, Waiter,
};
use crate::types::{ApiKey, Endpoints};
use crate::utils::{unique_output_file_name, video_extension_for_url};

pub const DEFAULT_VIDEO_DIR: &str = "videos";

/// Drives one request from parameters to a materialized result: submit, poll, download.
///
/// Every call is independent; nothing is cached between jobs.
pub struct JobClient<T = HttpTransport, W = ThreadSleeper> {
    api_key: ApiKey,
    endpoints: Endpoints,
    transport: T,
    waiter: W,
    output_dir: PathBuf,
}

impl<T: Transport, W: Waiter> JobClient<T, W> {
    pub fn with_parts(api_key: ApiKey, endpoints: Endpoints, transport: T, waiter: W) -> Self {
        debug!(
            "Job client for {} using API key {}",
            endpoints.base_url(),
            api_key.masked()
        );
        Self {
            api_key,
            endpoints,
            transport,
            waiter,
            output_dir: PathBuf::from(DEFAULT_VIDEO_DIR),
        }
    }

    /// Directory downloaded videos are written to by [`JobClient::await_result`].
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    /// Submits a job and returns it in whatever state the service reports, usually PENDING.
    pub fn submit(&self, request: &GenerationRequest) -> Result<Job> {
        request.validate()?;

        let preset = request.preset();
        let url = self.endpoints.submit_url(preset.service);
        let payload = request.to_payload();

        info!("Submitting {} job with model {} to {}", preset.label, request.model, url);
        debug!("Request payload: {}", redact_payload(&payload));

        let mut headers = self.auth_headers();
        headers.push(("X-DashScope-Async", "enable".to_string()));

        let response = self.transport.post_json(&url, &headers, &payload)?;
        let envelope: TaskEnvelope = parse_json(&response)?;
        let output = envelope
            .output
            .ok_or_else(|| unexpected_shape("missing 'output'", &response))?;

        let task_id = output
            .task_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| unexpected_shape("missing 'output.task_id'", &response))?;
        let status: TaskStatus = output
            .task_status
            .ok_or_else(|| unexpected_shape("missing 'output.task_status'", &response))?
            .parse()?;

        info!("Task created with ID: {task_id}, status: {status}");

        Ok(Job {
            task_id,
            status,
            mode: request.mode,
            request_id: envelope.request_id,
        })
    }

    /// Polls until the job is terminal and materializes the asset. Videos go to the
    /// client's output directory.
    pub fn await_result(&self, job: &Job) -> Result<GenerationResult> {
        self.await_result_in(job, &self.output_dir)
    }

    pub fn await_result_in(&self, job: &Job, output_dir: &Path) -> Result<GenerationResult> {
        let output = self.poll(job)?;

        match job.mode.media() {
            MediaKind::Image => {
                let first = output
                    .results
                    .as_ref()
                    .and_then(|results| results.first())
                    .ok_or_else(|| {
                        JobError::Protocol("succeeded task has no 'output.results[0]'".into())
                    })?;
                // A SUCCEEDED task can still carry a per-image failure instead of a URL.
                let url = match (&first.url, &first.code) {
                    (Some(url), _) => url.clone(),
                    (None, Some(code)) => {
                        return Err(JobError::JobFailed {
                            code: code.clone(),
                            message: first
                                .message
                                .clone()
                                .unwrap_or_else(|| "Unknown error".to_string()),
                        });
                    }
                    (None, None) => {
                        return Err(JobError::Protocol(
                            "succeeded task has no 'output.results[0].url'".into(),
                        ));
                    }
                };
                let image = decode_image(&self.download(&url)?)?;
                Ok(GenerationResult::Image { image, url })
            }
            MediaKind::Video => {
                let url = output.video_url.clone().ok_or_else(|| {
                    JobError::Protocol("succeeded task has no 'output.video_url'".into())
                })?;
                let bytes = self.download(&url)?;

                fs::create_dir_all(output_dir)?;
                let file_name = unique_output_file_name(
                    job.mode.preset().file_prefix,
                    &video_extension_for_url(&url),
                );
                let path = output_dir.join(file_name);
                fs::write(&path, &bytes)?;
                info!("Video downloaded and saved to: {}", path.display());

                Ok(GenerationResult::Video { path, url })
            }
        }
    }

    /// `submit` followed by `await_result`.
    pub fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        let job = self.submit(request)?;
        self.await_result(&job)
    }

    /// Returns the final task output once the job has SUCCEEDED.
    fn poll(&self, job: &Job) -> Result<TaskOutput> {
        let policy = job.mode.preset().poll_policy();
        let url = self.endpoints.task_url(&job.task_id);
        let headers = self.auth_headers();

        for attempt in 1..=policy.max_attempts {
            debug!(
                "Polling task {}, attempt {attempt}/{}",
                job.task_id, policy.max_attempts
            );

            let response = self.transport.get(&url, &headers)?;
            let envelope: TaskEnvelope = parse_json(&response)?;
            let output = envelope
                .output
                .ok_or_else(|| unexpected_shape("missing 'output'", &response))?;
            let status: TaskStatus = output
                .task_status
                .as_deref()
                .ok_or_else(|| unexpected_shape("missing 'output.task_status'", &response))?
                .parse()?;

            debug!("Task {} status: {status}", job.task_id);

            match status {
                TaskStatus::Succeeded => {
                    info!("Task {} succeeded after {attempt} poll(s)", job.task_id);
                    log_completion(&job.task_id, &output, envelope.usage.as_ref());
                    return Ok(output);
                }
                TaskStatus::Failed => {
                    let code = output.code.unwrap_or_else(|| "Unknown".to_string());
                    let message = output.message.unwrap_or_else(|| "Unknown error".to_string());
                    warn!("Task {} failed: {code}: {message}", job.task_id);
                    return Err(JobError::JobFailed { code, message });
                }
                TaskStatus::Pending | TaskStatus::Running => {
                    if attempt < policy.max_attempts {
                        self.waiter.wait(policy.interval);
                    }
                }
            }
        }

        warn!(
            "Task {} still running after {} attempts; leaving it unobserved",
            job.task_id, policy.max_attempts
        );
        Err(JobError::Timeout {
            attempts: policy.max_attempts,
        })
    }

    /// Asset URLs are pre-signed, so no credential is attached.
    fn download(&self, url: &str) -> Result<Vec<u8>> {
        debug!("Downloading asset from {url}");
        let response = self.transport.get(url, &Vec::new())?;
        if !response.is_success() {
            return Err(http_error(&response));
        }
        Ok(response.body)
    }

    fn auth_headers(&self) -> Headers {
        vec![
            (
                "Authorization",
                format!("Bearer {}", self.api_key.expose()),
            ),
            ("Content-Type", "application/json".to_string()),
        ]
    }
}

/// Poll interval and ceiling multiplied out, for progress messages.
pub fn expected_wait(media: MediaKind) -> Duration {
    let policy = media.poll_policy();
    policy.interval * policy.max_attempts
}

fn parse_json<D: DeserializeOwned>(response: &RawResponse) -> Result<D> {
    if !response.is_success() {
        return Err(http_error(response));
    }

    serde_json::from_slice(&response.body).map_err(|err| {
        JobError::Protocol(format!(
            "response is not the expected JSON ({err}): {}",
            preview(&response.text())
        ))
    })
}

fn log_completion(task_id: &str, output: &TaskOutput, usage: Option<&TaskUsage>) {
    if let (Some(submitted), Some(ended)) = (&output.submit_time, &output.end_time) {
        debug!("Task {task_id} submitted at {submitted}, finished at {ended}");
    }
    if let Some(usage) = usage {
        match (usage.image_count, usage.video_count, usage.video_duration) {
            (Some(images), _, _) => info!("Task {task_id} billed for {images} image(s)"),
            (_, Some(videos), Some(seconds)) => {
                info!("Task {task_id} billed for {videos} video(s), {seconds}s")
            }
            (_, Some(videos), None) => info!("Task {task_id} billed for {videos} video(s)"),
            _ => {}
        }
    }
}

fn http_error(response: &RawResponse) -> JobError {
    let text = response.text();
    match serde_json::from_slice::<ApiErrorBody>(&response.body) {
        Ok(ApiErrorBody {
            request_id,
            code,
            message: Some(message),
        }) => {
            if let Some(request_id) = request_id {
                warn!("Request {request_id} rejected with status {}", response.status);
            }
            JobError::Http {
                status: response.status,
                code,
                message,
            }
        }
        _ => JobError::Http {
            status: response.status,
            code: None,
            message: text,
        },
    }
}

fn unexpected_shape(what: &str, response: &RawResponse) -> JobError {
    JobError::Protocol(format!("{what}: {}", preview(&response.text())))
}

fn preview(text: &str) -> String {
    const LIMIT: usize = 500;
    if text.chars().count() <= LIMIT {
        return text.to_string();
    }
    let head: String = text.chars().take(LIMIT).collect();
    format!("{head}...")
}

/// Data URLs can be megabytes long; keep them out of the debug log.
fn redact_payload(payload: &serde_json::Value) -> serde_json::Value {
    let mut copy = payload.clone();
    if let Some(input) = copy.get_mut("input").and_then(|v| v.as_object_mut()) {
        for value in input.values_mut() {
            redact_value(value);
        }
    }
    copy
}

fn redact_value(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::String(text) if text.starts_with("data:") => {
            let len = text.len();
            *text = format!("<inline data, {len} bytes>");
        }
        serde_json::Value::Array(items) => items.iter_mut().for_each(redact_value),
        _ => {}
    }
}
