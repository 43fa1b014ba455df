use crate::synthesis::{
    AvatarStyle, OutputOptions, PollPolicy, SynthesisError, SynthesisRequest, Voice,
};
use anyhow::Error;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const ENV_SUBSCRIPTION_KEY: &str = "SUBSCRIPTION_KEY";
pub const ENV_SERVICE_REGION: &str = "SERVICE_REGION";

#[derive(Parser, Debug)]
#[command(
    version = crate::version::get_short_version(),
    long_version = crate::version::get_version_info(),
    about
)]
pub struct Cli {
    #[clap(long, default_value = "avatarsynth.toml")]
    pub conf: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the web form
    Serve,
    /// Submit text and wait for the avatar video
    Submit {
        /// Text the avatar should speak
        #[arg(short, long)]
        text: String,

        #[arg(short, long, default_value_t = Voice::default().to_string())]
        voice: String,

        #[arg(short, long, default_value_t = AvatarStyle::default().to_string())]
        style: String,

        /// Print the job id and return without polling
        #[arg(long)]
        detach: bool,
    },
    /// Resume polling a job that was already submitted
    Status {
        job_id: String,

        /// Poll exactly once and print the current state
        #[arg(long)]
        once: bool,
    },
    /// List synthesis jobs in the subscription
    List {
        #[arg(long, default_value = "0")]
        skip: u32,

        #[arg(long, default_value = "100")]
        top: u32,
    },
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    pub http_addr: String,
    pub log_level: Option<String>,
    pub log_file: Option<String>,
    /// Finished jobs are dropped from the web registry after this long.
    pub job_ttl_secs: u64,
    pub speech: SpeechConfig,
    pub poll: PollConfig,
    pub output: OutputOptions,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SpeechConfig {
    pub subscription_key: String,
    pub region: String,
    pub service_host: String,
    pub api_version: String,
    /// Replaces `https://{region}.{service_host}`, e.g. for a local proxy.
    pub endpoint: Option<String>,
    pub timeout_ms: Option<u64>,
    pub display_name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct PollConfig {
    pub interval_secs: u64,
    pub max_attempts: Option<u32>,
    pub deadline_secs: Option<u64>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            subscription_key: String::new(),
            region: "westeurope".to_string(),
            service_host: "customvoice.api.speech.microsoft.com".to_string(),
            api_version: "3.1-preview1".to_string(),
            endpoint: None,
            timeout_ms: None,
            display_name: None,
            description: None,
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: 5,
            max_attempts: None,
            deadline_secs: Some(30 * 60),
        }
    }
}

impl PollConfig {
    pub fn policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_secs(self.interval_secs),
            max_attempts: self.max_attempts,
            deadline: self.deadline_secs.map(Duration::from_secs),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8080".to_string(),
            log_level: Some("info".to_string()),
            log_file: None,
            job_ttl_secs: 60 * 60,
            speech: SpeechConfig::default(),
            poll: PollConfig::default(),
            output: OutputOptions::default(),
        }
    }
}

impl Config {
    pub fn job_ttl(&self) -> Duration {
        Duration::from_secs(self.job_ttl_secs)
    }

    pub fn load(path: &str) -> Result<Self, Error> {
        let config = toml::from_str(
            &std::fs::read_to_string(path).map_err(|e| anyhow::anyhow!("{}: {}", e, path))?,
        )?;
        Ok(config)
    }

    /// Builds a request from user input, filling in the configured output
    /// settings and job metadata.
    pub fn build_request(
        &self,
        text: &str,
        voice: &str,
        style: &str,
    ) -> Result<SynthesisRequest, SynthesisError> {
        let mut builder = SynthesisRequest::builder(text)
            .voice(voice.parse()?)
            .style(style.parse()?)
            .options(self.output.clone());
        if let Some(ref name) = self.speech.display_name {
            builder = builder.display_name(name);
        }
        if let Some(ref description) = self.speech.description {
            builder = builder.description(description);
        }
        builder.build()
    }

    /// Applies `SUBSCRIPTION_KEY` / `SERVICE_REGION` from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_SUBSCRIPTION_KEY).filter(|v| !v.is_empty()) {
            self.speech.subscription_key = key;
        }
        if let Some(region) = lookup(ENV_SERVICE_REGION).filter(|v| !v.is_empty()) {
            self.speech.region = region;
        }
    }
}
