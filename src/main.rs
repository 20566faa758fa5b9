use std::time::Duration;

use tracing_subscriber::EnvFilter;

use travel_concierge::config::Config;
use travel_concierge::session::spawn_sweeper;
use travel_concierge::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    let state = AppState::new(config.clone())?;
    tracing::info!(
        "LLM provider: {} ({})",
        state.llm.provider_name(),
        state.llm.model()
    );
    tracing::info!(
        "Embeddings: {} ({} at {})",
        config.embedding.provider,
        config.embedding.model,
        config.embedding.base_url
    );
    if !config.web_search.enabled {
        tracing::info!("Web search disabled");
    }

    spawn_sweeper(
        state.sessions.clone(),
        Duration::from_secs(config.session.ttl_secs),
        Duration::from_secs(config.session.sweep_interval_secs.max(1)),
    );

    let app = travel_concierge::app(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
