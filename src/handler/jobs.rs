use crate::app::{prune_finished, AppState, JobEntry};
use crate::synthesis::{AvatarStyle, JobHandle, JobState, StatusReport, SynthesisError, Voice};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/options", get(get_options))
        .route("/api/jobs", get(list_jobs).post(submit_job))
        .route("/api/jobs/{id}", get(get_job))
}

#[derive(Debug, Deserialize)]
pub struct SubmitForm {
    pub text: String,
    pub voice: Option<String>,
    pub style: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub skip: Option<u32>,
    pub top: Option<u32>,
}

#[derive(Debug, Serialize)]
struct JobView<'a> {
    id: &'a str,
    #[serde(flatten)]
    state: &'a JobState,
    polls: u32,
    report: StatusReport,
}

fn job_response(handle: &JobHandle, entry: &JobEntry, report: StatusReport) -> Response {
    Json(JobView {
        id: handle.as_str(),
        state: &entry.state,
        polls: entry.polls,
        report,
    })
    .into_response()
}

fn error_response(e: &SynthesisError) -> Response {
    let status = match e {
        SynthesisError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::BAD_GATEWAY,
    };
    (status, Json(json!({ "report": StatusReport::error(e.to_string()) }))).into_response()
}

async fn get_options(State(state): State<AppState>) -> Response {
    Json(json!({
        "voices": Voice::ALL.iter().map(|v| v.as_str()).collect::<Vec<_>>(),
        "styles": AvatarStyle::ALL.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
        "default_voice": Voice::default().as_str(),
        "default_style": AvatarStyle::default().as_str(),
        "poll_interval_ms": state.config.poll.interval_secs * 1000,
    }))
    .into_response()
}

async fn submit_job(State(state): State<AppState>, Json(form): Json<SubmitForm>) -> Response {
    let voice = form.voice.unwrap_or_else(|| Voice::default().to_string());
    let style = form.style.unwrap_or_else(|| AvatarStyle::default().to_string());
    let request = match state.config.build_request(&form.text, &voice, &style) {
        Ok(request) => request,
        Err(e) => {
            info!("Rejected synthesis request: {}", e);
            return error_response(&e);
        }
    };

    let handle = match state.client.submit(&request).await {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to submit batch avatar synthesis job: {}", e);
            return error_response(&e);
        }
    };

    let entry = JobEntry::new(JobState::Submitted);
    let report = StatusReport::from(&entry.state);
    let response = job_response(&handle, &entry, report);
    let mut jobs = state.jobs.lock().await;
    prune_finished(&mut jobs, state.config.job_ttl(), Utc::now());
    jobs.insert(handle, entry);
    response
}

/// Polls the job once. Terminal states are answered from the registry so a
/// page refresh never reaches the service again. A job past the configured
/// attempt cap or deadline is moved to `Timeout` without polling.
async fn get_job(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let handle = JobHandle::new(id);
    let policy = state.config.poll.policy();
    {
        let mut jobs = state.jobs.lock().await;
        let now = Utc::now();
        prune_finished(&mut jobs, state.config.job_ttl(), now);
        if let Some(entry) = jobs.get_mut(&handle) {
            if !entry.state.is_terminal() && entry.is_overdue(&policy, now) {
                warn!(
                    "Job {} still not finished after {} polls, giving up",
                    handle, entry.polls
                );
                entry.state = JobState::Timeout;
                entry.updated_at = now;
            }
            if entry.state.is_terminal() {
                return job_response(&handle, entry, StatusReport::from(&entry.state));
            }
        }
    }

    let result = JobState::from_poll(state.client.poll(&handle).await);

    let mut jobs = state.jobs.lock().await;
    let known = jobs.contains_key(&handle);
    let mut entry = jobs
        .remove(&handle)
        .unwrap_or_else(|| JobEntry::new(JobState::Submitted));
    entry.polls += 1;
    entry.updated_at = Utc::now();

    let polled = result.is_ok();
    let report = match result {
        Ok(next) => {
            entry.state = next;
            StatusReport::from(&entry.state)
        }
        Err(e) => {
            warn!("Polling job {} failed, will retry: {}", handle, e);
            StatusReport::info(format!(
                "Could not fetch the job status this time, retrying: {}",
                e
            ))
        }
    };
    let response = job_response(&handle, &entry, report);

    // unknown ids are only remembered once the service has recognised them
    let recognised = polled && !matches!(entry.state, JobState::Error { .. });
    if known || recognised {
        jobs.insert(handle, entry);
    }
    response
}

async fn list_jobs(State(state): State<AppState>, Query(params): Query<ListParams>) -> Response {
    match state
        .client
        .list(params.skip.unwrap_or(0), params.top.unwrap_or(100))
        .await
    {
        Ok(list) => Json(list).into_response(),
        Err(e) => {
            error!("Failed to list batch synthesis jobs: {}", e);
            error_response(&e)
        }
    }
}
