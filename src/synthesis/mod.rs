use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

mod azure;
mod error;
pub mod poller;
pub mod report;
pub mod request;

pub use azure::AzureAvatarClient;
pub use error::SynthesisError;
pub use poller::{wait_for_completion, JobState, PollPolicy};
pub use report::{ReportLevel, StatusReport};
pub use request::{OutputOptions, SynthesisRequest, SynthesisRequestBuilder};

#[cfg(test)]
pub(crate) mod mock;

/// Prebuilt platform voices offered to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
pub enum Voice {
    #[default]
    #[serde(rename = "en-US-JennyNeural")]
    JennyNeural,
    #[serde(rename = "en-US-GuyNeural")]
    GuyNeural,
    #[serde(rename = "en-US-AriaNeural")]
    AriaNeural,
    #[serde(rename = "en-US-AvaMultilingualNeural")]
    AvaMultilingualNeural,
    #[serde(rename = "en-US-AndrewMultilingualNeural")]
    AndrewMultilingualNeural,
}

impl Voice {
    pub const ALL: [Voice; 5] = [
        Voice::JennyNeural,
        Voice::GuyNeural,
        Voice::AriaNeural,
        Voice::AvaMultilingualNeural,
        Voice::AndrewMultilingualNeural,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::JennyNeural => "en-US-JennyNeural",
            Voice::GuyNeural => "en-US-GuyNeural",
            Voice::AriaNeural => "en-US-AriaNeural",
            Voice::AvaMultilingualNeural => "en-US-AvaMultilingualNeural",
            Voice::AndrewMultilingualNeural => "en-US-AndrewMultilingualNeural",
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Voice {
    type Err = SynthesisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Voice::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SynthesisError::invalid_input(format!("unsupported voice: {}", s)))
    }
}

/// Styles of the prebuilt `lisa` avatar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AvatarStyle {
    GracefulSitting,
    GracefulStanding,
    #[default]
    TechnicalSitting,
    TechnicalStanding,
    CasualSitting,
}

impl AvatarStyle {
    pub const ALL: [AvatarStyle; 5] = [
        AvatarStyle::GracefulSitting,
        AvatarStyle::GracefulStanding,
        AvatarStyle::TechnicalSitting,
        AvatarStyle::TechnicalStanding,
        AvatarStyle::CasualSitting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AvatarStyle::GracefulSitting => "graceful-sitting",
            AvatarStyle::GracefulStanding => "graceful-standing",
            AvatarStyle::TechnicalSitting => "technical-sitting",
            AvatarStyle::TechnicalStanding => "technical-standing",
            AvatarStyle::CasualSitting => "casual-sitting",
        }
    }
}

impl fmt::Display for AvatarStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AvatarStyle {
    type Err = SynthesisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AvatarStyle::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                SynthesisError::invalid_input(format!("unsupported avatar style: {}", s))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VideoFormat {
    #[default]
    Webm,
    Mp4,
}

impl VideoFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            VideoFormat::Webm => "webm",
            VideoFormat::Mp4 => "mp4",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    #[default]
    Vp9,
    H264,
    Hevc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleType {
    #[default]
    SoftEmbedded,
    HardEmbedded,
    ExternalFile,
    None,
}

/// Identifier the service hands out for one submitted job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    Unknown(String),
}

impl JobStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "NotStarted" => JobStatus::NotStarted,
            "Running" => JobStatus::Running,
            "Succeeded" => JobStatus::Succeeded,
            "Failed" => JobStatus::Failed,
            other => JobStatus::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::NotStarted => "NotStarted",
            JobStatus::Running => "Running",
            JobStatus::Succeeded => "Succeeded",
            JobStatus::Failed => "Failed",
            JobStatus::Unknown(s) => s.as_str(),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for JobStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(JobStatus::parse(&s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SynthesisResult {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Running(JobStatus),
    Succeeded(SynthesisResult),
    Failed,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub id: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_action_date_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct JobList {
    #[serde(default)]
    pub values: Vec<JobSummary>,
    #[serde(
        rename = "@nextLink",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub next_link: Option<String>,
}

#[async_trait]
pub trait AvatarSynthesisClient: Send + Sync {
    async fn submit(&self, request: &SynthesisRequest) -> Result<JobHandle, SynthesisError>;
    async fn poll(&self, handle: &JobHandle) -> Result<PollOutcome, SynthesisError>;
    async fn list(&self, skip: u32, top: u32) -> Result<JobList, SynthesisError>;
}
