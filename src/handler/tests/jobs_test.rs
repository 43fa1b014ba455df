use crate::{
    app::{create_router, AppState, AppStateBuilder},
    config::Config,
    synthesis::{
        mock::{poll_script, MockAvatarClient},
        JobHandle, JobStatus, PollOutcome, SynthesisError, SynthesisResult,
    },
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

async fn serve(client: MockAvatarClient) -> String {
    serve_with(Config::default(), client).await.0
}

async fn serve_with(config: Config, client: MockAvatarClient) -> (String, AppState) {
    let state = AppStateBuilder::new()
        .config(config)
        .client(Arc::new(client))
        .build()
        .expect("Failed to build app state");
    let app = create_router(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), state)
}

async fn submit_hello(http: &reqwest::Client, base: &str) -> Value {
    http.post(format!("{}/api/jobs", base))
        .json(&json!({ "text": "Hello world" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_index_page_has_form() {
    let base = serve(MockAvatarClient::new()).await;
    let body = reqwest::get(&base).await.unwrap().text().await.unwrap();
    assert!(body.contains("<form"));
}

#[tokio::test]
async fn test_options_list_choices() {
    let base = serve(MockAvatarClient::new()).await;
    let options: Value = reqwest::get(format!("{}/api/options", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let voices = options["voices"].as_array().unwrap();
    assert!(voices.contains(&json!("en-US-JennyNeural")));
    let styles = options["styles"].as_array().unwrap();
    assert!(styles.contains(&json!("graceful-sitting")));
    assert_eq!(options["poll_interval_ms"], 5000);
}

#[tokio::test]
async fn test_empty_text_never_submitted() {
    let mut client = MockAvatarClient::new();
    client.expect_submit().never();
    let base = serve(client).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/jobs", base))
        .json(&json!({ "text": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["report"]["level"], "error");
}

#[tokio::test]
async fn test_submit_then_refresh_uses_registry() {
    let mut client = MockAvatarClient::new();
    client
        .expect_submit()
        .withf(|request| {
            request.text() == "Hello world" && request.style().as_str() == "graceful-sitting"
        })
        .times(1)
        .returning(|_| Ok(JobHandle::new("job-123")));
    client.expect_poll().times(2).returning(poll_script(vec![
        Ok(PollOutcome::Running(JobStatus::Running)),
        Ok(PollOutcome::Succeeded(SynthesisResult {
            url: "https://x/y.webm".to_string(),
            summary: None,
        })),
    ]));
    let base = serve(client).await;
    let http = reqwest::Client::new();

    let submitted: Value = http
        .post(format!("{}/api/jobs", base))
        .json(&json!({
            "text": "Hello world",
            "voice": "en-US-JennyNeural",
            "style": "graceful-sitting"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(submitted["id"], "job-123");
    assert_eq!(submitted["state"], "submitted");

    let job_url = format!("{}/api/jobs/job-123", base);
    let running: Value = http.get(&job_url).send().await.unwrap().json().await.unwrap();
    assert_eq!(running["state"], "running");
    assert_eq!(running["status"], "Running");
    assert_eq!(running["report"]["level"], "info");

    let done: Value = http.get(&job_url).send().await.unwrap().json().await.unwrap();
    assert_eq!(done["state"], "succeeded");
    assert_eq!(done["report"]["download_url"], "https://x/y.webm");

    // terminal: answered without a third poll
    let again: Value = http.get(&job_url).send().await.unwrap().json().await.unwrap();
    assert_eq!(again["state"], "succeeded");
    assert_eq!(again["polls"], 2);
}

#[tokio::test]
async fn test_resume_unknown_handle() {
    let mut client = MockAvatarClient::new();
    client
        .expect_poll()
        .withf(|handle| handle.as_str() == "issued-elsewhere")
        .times(1)
        .returning(|_| Ok(PollOutcome::Failed));
    let base = serve(client).await;

    let body: Value = reqwest::get(format!("{}/api/jobs/issued-elsewhere", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["state"], "failed");
    assert_eq!(body["report"]["level"], "error");
}

#[tokio::test]
async fn test_transient_poll_error_keeps_state() {
    let mut client = MockAvatarClient::new();
    client.expect_poll().times(1).returning(|_| {
        Err(SynthesisError::RemoteRejected {
            status: 503,
            body: "busy".to_string(),
        })
    });
    let base = serve(client).await;

    let response = reqwest::get(format!("{}/api/jobs/job-9", base)).await.unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["state"], "submitted");
    assert_eq!(body["report"]["level"], "info");
}

#[tokio::test]
async fn test_submit_rejected_reports_body() {
    let mut client = MockAvatarClient::new();
    client.expect_submit().times(1).returning(|_| {
        Err(SynthesisError::RemoteRejected {
            status: 429,
            body: "quota exceeded".to_string(),
        })
    });
    let base = serve(client).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/jobs", base))
        .json(&json!({ "text": "Hello world" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 502);
    let body: Value = response.json().await.unwrap();
    assert!(body["report"]["message"]
        .as_str()
        .unwrap()
        .contains("quota exceeded"));
}

#[tokio::test]
async fn test_attempt_cap_times_out_without_polling() {
    let mut config = Config::default();
    config.poll.max_attempts = Some(1);
    config.poll.deadline_secs = None;

    let mut client = MockAvatarClient::new();
    client
        .expect_submit()
        .returning(|_| Ok(JobHandle::new("job-123")));
    client
        .expect_poll()
        .times(1)
        .returning(|_| Ok(PollOutcome::Running(JobStatus::Running)));
    let (base, _) = serve_with(config, client).await;
    let http = reqwest::Client::new();
    submit_hello(&http, &base).await;

    let job_url = format!("{}/api/jobs/job-123", base);
    let running: Value = http.get(&job_url).send().await.unwrap().json().await.unwrap();
    assert_eq!(running["state"], "running");

    for _ in 0..3 {
        let body: Value = http.get(&job_url).send().await.unwrap().json().await.unwrap();
        assert_eq!(body["state"], "timeout");
        assert_eq!(body["polls"], 1);
        assert_eq!(body["report"]["level"], "error");
    }
}

#[tokio::test]
async fn test_elapsed_deadline_times_out() {
    let mut config = Config::default();
    config.poll.deadline_secs = Some(0);

    let mut client = MockAvatarClient::new();
    client
        .expect_submit()
        .returning(|_| Ok(JobHandle::new("job-123")));
    client.expect_poll().never();
    let (base, _) = serve_with(config, client).await;
    let http = reqwest::Client::new();
    submit_hello(&http, &base).await;

    let body: Value = http
        .get(format!("{}/api/jobs/job-123", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["state"], "timeout");
    assert_eq!(body["polls"], 0);
}

#[tokio::test]
async fn test_unrecognised_ids_are_not_registered() {
    let mut client = MockAvatarClient::new();
    client.expect_poll().returning(|handle| {
        if handle.as_str() == "busy" {
            Err(SynthesisError::RemoteRejected {
                status: 503,
                body: "busy".to_string(),
            })
        } else {
            Err(SynthesisError::RemoteRejected {
                status: 404,
                body: "not found".to_string(),
            })
        }
    });
    let (base, state) = serve_with(Config::default(), client).await;

    for id in ["x1", "x2", "x3"] {
        let body: Value = reqwest::get(format!("{}/api/jobs/{}", base, id))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["state"], "error");
    }
    let body: Value = reqwest::get(format!("{}/api/jobs/busy", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["report"]["level"], "info");

    assert!(state.jobs.lock().await.is_empty());
}

#[tokio::test]
async fn test_finished_jobs_expire_from_registry() {
    let mut config = Config::default();
    config.job_ttl_secs = 0;

    let mut client = MockAvatarClient::new();
    client
        .expect_submit()
        .returning(|_| Ok(JobHandle::new("job-123")));
    client
        .expect_poll()
        .times(2)
        .returning(|_| Ok(PollOutcome::Failed));
    let (base, state) = serve_with(config, client).await;
    let http = reqwest::Client::new();
    submit_hello(&http, &base).await;

    let job_url = format!("{}/api/jobs/job-123", base);
    let first: Value = http.get(&job_url).send().await.unwrap().json().await.unwrap();
    assert_eq!(first["state"], "failed");

    // expired, so the service is asked again as for a fresh handle
    let second: Value = http.get(&job_url).send().await.unwrap().json().await.unwrap();
    assert_eq!(second["state"], "failed");
    assert_eq!(second["polls"], 1);
    assert_eq!(state.jobs.lock().await.len(), 1);
}
