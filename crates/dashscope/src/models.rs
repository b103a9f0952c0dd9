use serde::Deserialize;

/// Body of both the submission response and the task status response.
#[derive(Debug, Deserialize)]
pub struct TaskEnvelope {
    pub request_id: Option<String>,
    pub output: Option<TaskOutput>,
    pub usage: Option<TaskUsage>,
}

#[derive(Debug, Deserialize)]
pub struct TaskOutput {
    pub task_id: Option<String>,
    pub task_status: Option<String>,
    /// Image modes: one entry per generated image.
    pub results: Option<Vec<TaskResultItem>>,
    /// Video modes.
    pub video_url: Option<String>,
    pub code: Option<String>,
    pub message: Option<String>,
    pub submit_time: Option<String>,
    pub end_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TaskResultItem {
    pub url: Option<String>,
    pub code: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TaskUsage {
    pub image_count: Option<u32>,
    pub video_count: Option<u32>,
    pub video_duration: Option<f32>,
}

/// Error body returned with non-success statuses.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub request_id: Option<String>,
    pub code: Option<String>,
    pub message: Option<String>,
}
