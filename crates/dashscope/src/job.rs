use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::JobError;
use crate::presets::Mode;
use crate::tensor::ImageTensor;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Succeeded => "SUCCEEDED",
            TaskStatus::Failed => "FAILED",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = JobError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "PENDING" => Ok(TaskStatus::Pending),
            "RUNNING" => Ok(TaskStatus::Running),
            "SUCCEEDED" => Ok(TaskStatus::Succeeded),
            "FAILED" => Ok(TaskStatus::Failed),
            other => Err(JobError::Protocol(format!("Unexpected task status: {other}"))),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task accepted by the service. Only polling moves it forward.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Job {
    pub task_id: String,
    pub status: TaskStatus,
    pub mode: Mode,
    pub request_id: Option<String>,
}

#[derive(Debug)]
pub enum GenerationResult {
    Image { image: ImageTensor, url: String },
    Video { path: PathBuf, url: String },
}

impl GenerationResult {
    pub fn url(&self) -> &str {
        match self {
            GenerationResult::Image { url, .. } | GenerationResult::Video { url, .. } => url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing() {
        assert_eq!("RUNNING".parse::<TaskStatus>().unwrap(), TaskStatus::Running);
        assert_eq!("SUCCEEDED".parse::<TaskStatus>().unwrap(), TaskStatus::Succeeded);
        assert_eq!(TaskStatus::Pending.to_string(), "PENDING");
        assert!(matches!(
            "CANCELED".parse::<TaskStatus>(),
            Err(JobError::Protocol(_))
        ));
        assert!("running".parse::<TaskStatus>().is_err());
    }
}
