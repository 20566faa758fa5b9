use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::llm::LlmClient;
use crate::observability::{Metrics, Tracer};
use crate::session::SessionStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: Arc<SessionStore>,
    pub http_client: reqwest::Client,
    pub llm: LlmClient,
    pub metrics: Arc<Metrics>,
    pub tracer: Arc<Tracer>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()?;

        let metrics = Arc::new(Metrics::new());
        let llm = LlmClient::new(http_client.clone(), config.llm.clone(), metrics.clone());
        let sessions = Arc::new(SessionStore::new(config.session.max_history_turns));

        Ok(Self {
            config,
            sessions,
            http_client,
            llm,
            metrics,
            tracer: Arc::new(Tracer::new()),
        })
    }
}
