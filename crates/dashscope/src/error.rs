use thiserror::Error;

pub type Result<T> = std::result::Result<T, JobError>;

/// Everything that can abort a generation job, from credential lookup to saving the asset.
#[derive(Error, Debug)]
pub enum JobError {
    /// Missing or unusable credential. Raised before any network call.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The request violates a mode allow-list or invariant. Raised before any network call.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Connection, DNS, timeout or body read failure.
    #[error("API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("{}", describe_http_failure(*status, code.as_deref(), message))]
    Http {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// A success response whose JSON does not have the expected shape.
    #[error("Unexpected API response: {0}")]
    Protocol(String),

    /// The service reported the task as FAILED.
    #[error("Task failed with code: {code}, message: {message}")]
    JobFailed { code: String, message: String },

    /// The poll ceiling was reached while the task was still PENDING or RUNNING.
    #[error("Task did not complete within the expected time ({attempts} attempts)")]
    Timeout { attempts: u32 },

    #[error("Failed to decode generated image: {0}")]
    Decode(#[from] image::ImageError),

    /// A host image could not be encoded for upload.
    #[error("Failed to encode image for upload: {0}")]
    Encode(String),

    #[error("Generated image has an unexpected layout: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl JobError {
    /// True for failures of the network exchange itself, including non-success statuses.
    pub fn is_transport(&self) -> bool {
        matches!(self, JobError::Transport(_) | JobError::Http { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            JobError::Http { status, .. } => Some(*status),
            JobError::Transport(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}

fn describe_http_failure(status: u16, code: Option<&str>, message: &str) -> String {
    let details = match code {
        Some(code) => format!("{code}: {message}"),
        None => message.to_string(),
    };

    match status {
        401 => format!(
            "API request failed: 401 Unauthorized. The API key is invalid or not properly configured. Error details: {details}"
        ),
        403 => format!(
            "API request failed: 403 Forbidden. The API key is valid but has no access to this model. Error details: {details}"
        ),
        400 => format!(
            "API request failed: 400 Bad Request. The request format was rejected. Error details: {details}"
        ),
        _ => format!("API request failed: {status}. Response: {details}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_message_names_credential() {
        let err = JobError::Http {
            status: 401,
            code: Some("InvalidApiKey".into()),
            message: "Invalid API-key provided.".into(),
        };
        let text = err.to_string();
        assert!(text.contains("401 Unauthorized"));
        assert!(text.contains("API key is invalid"));
        assert!(text.contains("InvalidApiKey: Invalid API-key provided."));
        assert!(err.is_transport());
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn test_forbidden_message_names_model_access() {
        let err = JobError::Http {
            status: 403,
            code: Some("AccessDenied".into()),
            message: "Access denied.".into(),
        };
        let text = err.to_string();
        assert!(text.contains("403 Forbidden"));
        assert!(text.contains("no access to this model"));
        assert!(text.contains("AccessDenied: Access denied."));
        assert_eq!(err.status(), Some(403));
    }

    #[test]
    fn test_bad_request_message_names_format() {
        let err = JobError::Http {
            status: 400,
            code: Some("InvalidParameter".into()),
            message: "size is invalid".into(),
        };
        let text = err.to_string();
        assert!(text.contains("400 Bad Request"));
        assert!(text.contains("request format was rejected"));
        assert!(text.contains("InvalidParameter: size is invalid"));
    }

    #[test]
    fn test_other_status_passes_body_through() {
        let err = JobError::Http {
            status: 503,
            code: None,
            message: "upstream busy".into(),
        };
        assert_eq!(err.to_string(), "API request failed: 503. Response: upstream busy");
    }

    #[test]
    fn test_job_failed_keeps_remote_fields() {
        let err = JobError::JobFailed {
            code: "E1".into(),
            message: "bad input".into(),
        };
        assert_eq!(err.to_string(), "Task failed with code: E1, message: bad input");
        assert!(!err.is_transport());
    }
}
