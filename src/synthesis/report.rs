use super::JobState;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportLevel {
    Info,
    Success,
    Error,
}

/// What the user is shown for a job state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub level: ReportLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl StatusReport {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: ReportLevel::Info,
            message: message.into(),
            download_url: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: ReportLevel::Error,
            message: message.into(),
            download_url: None,
        }
    }
}

impl From<&JobState> for StatusReport {
    fn from(state: &JobState) -> Self {
        match state {
            JobState::Submitted => {
                StatusReport::info("Batch avatar synthesis job submitted, waiting for it to start")
            }
            JobState::Running { status } => StatusReport::info(format!(
                "Batch avatar synthesis job is still running, status [{}]",
                status
            )),
            JobState::Succeeded { result } => StatusReport {
                level: ReportLevel::Success,
                message: "Your avatar video is ready, click the link to download".to_string(),
                download_url: Some(result.url.clone()),
            },
            JobState::Failed => StatusReport::error("Batch avatar synthesis job failed"),
            JobState::Error { message } => {
                StatusReport::error(format!("Batch avatar synthesis job errored: {}", message))
            }
            JobState::Timeout => StatusReport::error(
                "Gave up waiting for the batch avatar synthesis job, it may still finish later",
            ),
            JobState::Cancelled => StatusReport::info("Stopped waiting for the job"),
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.download_url {
            Some(url) => write!(f, "{}: {}", self.message, url),
            None => f.write_str(&self.message),
        }
    }
}
