use crate::config::Config;
use crate::synthesis::{AvatarSynthesisClient, AzureAvatarClient, JobHandle, JobState, PollPolicy};
use anyhow::Result;
use axum::{
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use std::{collections::HashMap, net::SocketAddr};
use tokio::net::TcpListener;
use tokio::select;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::info;

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Last known state of a job submitted or resumed through the web form.
#[derive(Debug, Clone)]
pub struct JobEntry {
    pub state: JobState,
    pub polls: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobEntry {
    pub fn new(state: JobState) -> Self {
        let now = Utc::now();
        Self {
            state,
            polls: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// True once the poll policy's attempt cap or deadline is used up.
    pub fn is_overdue(&self, policy: &PollPolicy, now: DateTime<Utc>) -> bool {
        if policy.max_attempts.is_some_and(|max| self.polls >= max) {
            return true;
        }
        policy.deadline.is_some_and(|deadline| {
            (now - self.created_at)
                .to_std()
                .is_ok_and(|elapsed| elapsed >= deadline)
        })
    }
}

/// Drops finished jobs that have not been touched for `ttl`.
pub fn prune_finished(
    jobs: &mut HashMap<JobHandle, JobEntry>,
    ttl: Duration,
    now: DateTime<Utc>,
) {
    jobs.retain(|_, entry| {
        !entry.state.is_terminal()
            || (now - entry.updated_at)
                .to_std()
                .map_or(true, |idle| idle < ttl)
    });
}

pub struct AppStateInner {
    pub config: Arc<Config>,
    pub client: Arc<dyn AvatarSynthesisClient>,
    pub token: CancellationToken,
    pub jobs: Mutex<HashMap<JobHandle, JobEntry>>,
}

pub type AppState = Arc<AppStateInner>;

pub struct AppStateBuilder {
    pub config: Option<Config>,
    pub client: Option<Arc<dyn AvatarSynthesisClient>>,
}

impl AppStateBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            client: None,
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn client(mut self, client: Arc<dyn AvatarSynthesisClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> Result<AppState> {
        let config = Arc::new(self.config.unwrap_or_default());
        let client = match self.client {
            Some(client) => client,
            None => Arc::new(AzureAvatarClient::new(&config.speech)?),
        };

        Ok(Arc::new(AppStateInner {
            config,
            client,
            token: CancellationToken::new(),
            jobs: Mutex::new(HashMap::new()),
        }))
    }
}

impl Default for AppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn run(state: AppState) -> Result<()> {
    let token = state.token.clone();

    let app = create_router(state.clone());
    let addr: SocketAddr = state.config.http_addr.parse()?;
    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            return Err(anyhow::anyhow!("Failed to bind to {}: {}", addr, e));
        }
    };
    info!("Serving avatar synthesis form on http://{}", addr);

    select! {
        http_result = axum::serve(listener, app) => {
            match http_result {
                Ok(_) => info!("Server shut down gracefully"),
                Err(e) => {
                    tracing::error!("Server error: {}", e);
                    return Err(anyhow::anyhow!("Server error: {}", e));
                }
            }
        }
        _ = token.cancelled() => {
            info!("Application shutting down due to cancellation");
        }
    }
    token.cancel();
    Ok(())
}

async fn index_handler() -> impl IntoResponse {
    Html(INDEX_HTML)
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
            axum::http::header::ORIGIN,
        ]);

    let job_routes = crate::handler::router().with_state(state);

    Router::new()
        .route("/", get(index_handler))
        .merge(job_routes)
        .layer(cors)
}
