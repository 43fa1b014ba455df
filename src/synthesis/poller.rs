use super::{AvatarSynthesisClient, JobHandle, JobStatus, PollOutcome, SynthesisError, SynthesisResult};
use serde::Serialize;
use std::time::Duration;
use tokio::select;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How long and how often a job is polled.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
    pub deadline: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: None,
            deadline: Some(Duration::from_secs(30 * 60)),
        }
    }
}

/// Lifecycle of one job as seen by the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    Submitted,
    Running { status: JobStatus },
    Succeeded { result: SynthesisResult },
    Failed,
    Error { message: String },
    Timeout,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Submitted | JobState::Running { .. })
    }

    /// Folds the result of a single poll into the next state.
    ///
    /// Returns the error back when it is transient and the previous state
    /// should be kept.
    pub fn from_poll(
        result: Result<PollOutcome, SynthesisError>,
    ) -> Result<JobState, SynthesisError> {
        match result {
            Ok(PollOutcome::Running(status)) => Ok(JobState::Running { status }),
            Ok(PollOutcome::Succeeded(result)) => Ok(JobState::Succeeded { result }),
            Ok(PollOutcome::Failed) => Ok(JobState::Failed),
            Err(e) if e.is_retryable() => Err(e),
            Err(e) => Ok(JobState::Error {
                message: e.to_string(),
            }),
        }
    }
}

/// Polls `handle` until the job reaches a terminal state.
///
/// `on_update` sees every state change along with the 1-based attempt number.
/// Cancelling `token` stops the loop within one poll interval, including an
/// in-flight request.
pub async fn wait_for_completion<F>(
    client: &dyn AvatarSynthesisClient,
    handle: &JobHandle,
    policy: &PollPolicy,
    token: CancellationToken,
    mut on_update: F,
) -> JobState
where
    F: FnMut(u32, &JobState),
{
    let started = Instant::now();
    let deadline = policy.deadline.map(|d| started + d);
    let mut state = JobState::Submitted;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let result = select! {
            _ = token.cancelled() => None,
            r = client.poll(handle) => Some(r),
        };
        let Some(result) = result else {
            info!("Polling of job {} cancelled", handle);
            state = JobState::Cancelled;
            on_update(attempt, &state);
            return state;
        };

        match JobState::from_poll(result) {
            Ok(next) => {
                if next != state {
                    debug!("Job {} moved to {:?}", handle, next);
                }
                state = next;
                on_update(attempt, &state);
                if state.is_terminal() {
                    return state;
                }
            }
            Err(e) => {
                warn!("Polling job {} failed (attempt {}), retrying: {}", handle, attempt, e);
            }
        }

        if policy.max_attempts.is_some_and(|max| attempt >= max) {
            warn!("Job {} still not finished after {} polls", handle, attempt);
            state = JobState::Timeout;
            on_update(attempt, &state);
            return state;
        }

        let mut wake = Instant::now() + policy.interval;
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                warn!("Job {} passed its deadline of {:?}", handle, policy.deadline);
                state = JobState::Timeout;
                on_update(attempt, &state);
                return state;
            }
            wake = wake.min(deadline);
        }

        select! {
            _ = token.cancelled() => {
                info!("Polling of job {} cancelled", handle);
                state = JobState::Cancelled;
                on_update(attempt, &state);
                return state;
            }
            _ = tokio::time::sleep_until(wake) => {}
        }
    }
}
