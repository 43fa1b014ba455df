use super::{
    AvatarSynthesisClient, JobHandle, JobList, JobStatus, PollOutcome, SynthesisError,
    SynthesisRequest, SynthesisResult,
};
use crate::config::{SpeechConfig, ENV_SUBSCRIPTION_KEY};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

const AUTH_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Batch talking-avatar synthesis on Azure Speech
/// https://learn.microsoft.com/azure/ai-services/speech-service/text-to-speech-avatar/batch-synthesis-avatar
#[derive(Debug)]
pub struct AzureAvatarClient {
    http_client: HttpClient,
    subscription_key: String,
    jobs_url: Url,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JobResponse {
    status: Option<String>,
    outputs: Option<JobOutputs>,
}

#[derive(Debug, Deserialize)]
struct JobOutputs {
    result: Option<String>,
    summary: Option<String>,
}

impl AzureAvatarClient {
    pub fn new(config: &SpeechConfig) -> Result<Self> {
        if config.subscription_key.is_empty() {
            return Err(anyhow!(
                "Speech subscription key not configured, please set {} environment variable or specify speech.subscription_key in configuration",
                ENV_SUBSCRIPTION_KEY
            ));
        }

        let base = match config.endpoint.as_deref() {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => {
                if config.region.is_empty() {
                    return Err(anyhow!("Speech service region not configured"));
                }
                format!("https://{}.{}", config.region, config.service_host)
            }
        };
        let jobs_url = Url::parse(&format!(
            "{}/api/texttospeech/{}/batchsynthesis/talkingavatar",
            base, config.api_version
        ))?;
        if jobs_url.cannot_be_a_base() {
            return Err(anyhow!("Invalid speech endpoint: {}", jobs_url));
        }

        let http_client = HttpClient::builder()
            .timeout(Duration::from_millis(config.timeout_ms.unwrap_or(30_000)))
            .user_agent(crate::version::get_useragent())
            .build()?;

        debug!("Using batch avatar synthesis endpoint: {}", jobs_url);
        Ok(Self {
            http_client,
            subscription_key: config.subscription_key.clone(),
            jobs_url,
        })
    }

    pub fn jobs_url(&self) -> &Url {
        &self.jobs_url
    }

    fn job_url(&self, handle: &JobHandle) -> Url {
        let mut url = self.jobs_url.clone();
        // jobs_url is checked to be a base in new()
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(handle.as_str());
        }
        url
    }

    async fn get(&self, url: Url) -> Result<String, SynthesisError> {
        let response = self
            .http_client
            .get(url)
            .header(AUTH_HEADER, &self.subscription_key)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if status.as_u16() >= 400 {
            return Err(SynthesisError::RemoteRejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl AvatarSynthesisClient for AzureAvatarClient {
    async fn submit(&self, request: &SynthesisRequest) -> Result<JobHandle, SynthesisError> {
        let response = self
            .http_client
            .post(self.jobs_url.clone())
            .header(AUTH_HEADER, &self.subscription_key)
            .json(&request.payload())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status.as_u16() >= 400 {
            error!("Failed to submit batch avatar synthesis job: {} {}", status, body);
            return Err(SynthesisError::RemoteRejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SubmitResponse = serde_json::from_str(&body).map_err(|e| {
            SynthesisError::MalformedResponse(format!("submit response is not valid JSON: {}", e))
        })?;
        match parsed.id.filter(|id| !id.is_empty()) {
            Some(id) => {
                info!("Batch avatar synthesis job submitted successfully, job id: {}", id);
                Ok(JobHandle::new(id))
            }
            None => Err(SynthesisError::MalformedResponse(
                "submit response has no job id".to_string(),
            )),
        }
    }

    async fn poll(&self, handle: &JobHandle) -> Result<PollOutcome, SynthesisError> {
        let body = self.get(self.job_url(handle)).await?;
        debug!("Get batch synthesis job {}: {}", handle, body);

        let parsed: JobResponse =
            serde_json::from_str(&body).map_err(|e| SynthesisError::Decode(e.to_string()))?;
        let status = parsed
            .status
            .map(|s| JobStatus::parse(&s))
            .ok_or_else(|| SynthesisError::Decode("job response has no status".to_string()))?;

        match status {
            JobStatus::Succeeded => {
                let outputs = parsed.outputs.ok_or_else(|| {
                    SynthesisError::MalformedResponse(
                        "succeeded job has no outputs".to_string(),
                    )
                })?;
                let url = outputs.result.filter(|u| !u.is_empty()).ok_or_else(|| {
                    SynthesisError::MalformedResponse(
                        "succeeded job has no outputs.result".to_string(),
                    )
                })?;
                info!("Batch synthesis job succeeded, download URL: {}", url);
                Ok(PollOutcome::Succeeded(SynthesisResult {
                    url,
                    summary: outputs.summary,
                }))
            }
            JobStatus::Failed => Ok(PollOutcome::Failed),
            JobStatus::Unknown(s) => {
                warn!("Job {} reported unknown status {:?}, treating as running", handle, s);
                Ok(PollOutcome::Running(JobStatus::Unknown(s)))
            }
            _ => Ok(PollOutcome::Running(status)),
        }
    }

    async fn list(&self, skip: u32, top: u32) -> Result<JobList, SynthesisError> {
        let mut url = self.jobs_url.clone();
        url.query_pairs_mut()
            .append_pair("skip", &skip.to_string())
            .append_pair("top", &top.to_string());

        let body = self.get(url).await?;
        let list: JobList =
            serde_json::from_str(&body).map_err(|e| SynthesisError::Decode(e.to_string()))?;
        info!(
            "List batch synthesis jobs successfully, got {} jobs",
            list.values.len()
        );
        Ok(list)
    }
}
