//! Terminal front end: submits a job, drives the poll loop and prints what the
//! status reporter says about each step.
use crate::config::Config;
use crate::synthesis::{
    wait_for_completion, AvatarSynthesisClient, JobHandle, JobState, StatusReport,
};
use anyhow::Result;
use std::io::Write;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub struct SubmitArgs<'a> {
    pub text: &'a str,
    pub voice: &'a str,
    pub style: &'a str,
    pub detach: bool,
}

/// Returns the final state, or `None` when nothing was polled.
pub async fn submit<W: Write>(
    out: &mut W,
    config: &Config,
    client: &dyn AvatarSynthesisClient,
    args: SubmitArgs<'_>,
    token: CancellationToken,
) -> Result<Option<JobState>> {
    let request = match config.build_request(args.text, args.voice, args.style) {
        Ok(request) => request,
        Err(e) => {
            writeln!(out, "{}", StatusReport::error(e.to_string()))?;
            return Ok(None);
        }
    };

    let handle = match client.submit(&request).await {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to submit batch avatar synthesis job: {}", e);
            writeln!(out, "{}", StatusReport::error(e.to_string()))?;
            return Ok(None);
        }
    };
    writeln!(out, "Submitted job {}", handle)?;
    if args.detach {
        return Ok(None);
    }

    let state = follow(out, config, client, &handle, token).await?;
    Ok(Some(state))
}

pub async fn status<W: Write>(
    out: &mut W,
    config: &Config,
    client: &dyn AvatarSynthesisClient,
    job_id: &str,
    once: bool,
    token: CancellationToken,
) -> Result<JobState> {
    let handle = JobHandle::new(job_id);
    if once {
        let state = match JobState::from_poll(client.poll(&handle).await) {
            Ok(state) => state,
            Err(e) => JobState::Error {
                message: e.to_string(),
            },
        };
        writeln!(out, "{}", StatusReport::from(&state))?;
        return Ok(state);
    }
    follow(out, config, client, &handle, token).await
}

pub async fn list<W: Write>(
    out: &mut W,
    client: &dyn AvatarSynthesisClient,
    skip: u32,
    top: u32,
) -> Result<()> {
    match client.list(skip, top).await {
        Ok(list) => {
            for job in &list.values {
                let created = job
                    .created_date_time
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "-".to_string());
                writeln!(
                    out,
                    "{}\t{}\t{}\t{}",
                    job.id,
                    job.status,
                    created,
                    job.display_name.as_deref().unwrap_or("")
                )?;
            }
            if list.next_link.is_some() {
                writeln!(out, "(more jobs available, use --skip {})", skip + top)?;
            }
        }
        Err(e) => {
            error!("Failed to list batch synthesis jobs: {}", e);
            writeln!(out, "{}", StatusReport::error(e.to_string()))?;
        }
    }
    Ok(())
}

async fn follow<W: Write>(
    out: &mut W,
    config: &Config,
    client: &dyn AvatarSynthesisClient,
    handle: &JobHandle,
    token: CancellationToken,
) -> Result<JobState> {
    let policy = config.poll.policy();
    let mut last: Option<JobState> = None;
    let state = wait_for_completion(client, handle, &policy, token, |attempt, state| {
        if last.as_ref() != Some(state) {
            info!("Job {} poll #{}: {:?}", handle, attempt, state);
            writeln!(out, "{}", StatusReport::from(state)).ok();
            last = Some(state.clone());
        }
    })
    .await;
    Ok(state)
}
