//! # travel-concierge
//!
//! A travel-planning web backend. Chat and itinerary requests are forwarded
//! to a hosted (Gemini) or self-hosted (Ollama) LLM, optionally enriched with
//! snippets from documents the user uploaded and with web search results.
//! All state lives in process memory.
//!
//! ## Request flow
//!
//! ```text
//!          ┌──────────────────────┐
//!          │  POST /chat, /plan   │
//!          └──────────┬───────────┘
//!                     │
//!                     ▼
//!          ┌──────────────────────┐
//!          │  Session lookup or   │
//!          │  creation (UUID v4)  │
//!          └──────────┬───────────┘
//!                     │
//!        ┌────────────┼─────────────────┐
//!        ▼            ▼                 ▼
//! ┌─────────────┐ ┌──────────────┐ ┌──────────────┐
//! │ Top-k chunks│ │ LLM place    │ │ DuckDuckGo   │
//! │ cosine/kw   │ │ lookups      │ │ web search   │
//! └──────┬──────┘ └──────┬───────┘ └──────┬───────┘
//!        └───────────────┼────────────────┘
//!                        ▼
//!          ┌──────────────────────┐
//!          │ Prompt: system text, │
//!          │ context, last turns  │
//!          └──────────┬───────────┘
//!                     ▼
//!          ┌──────────────────────┐
//!          │ LLM call, N attempts │
//!          │ then canned fallback │
//!          └──────────┬───────────┘
//!                     ▼
//!          ┌──────────────────────┐
//!          │    JSON response     │
//!          └──────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for server, LLM, embeddings, sessions and RAG
//! - [`models`] - Request/response types shared by the API and the agents
//! - [`session`] - In-memory session store with idle eviction
//! - [`ingest`] - Text extraction (PDF, DOCX, TXT) and sliding-window chunking
//! - [`rag`] - Top-k chunk retrieval by cosine similarity with a keyword fallback
//! - [`llm::client`] - Gemini/Ollama text generation with retries and a canned fallback
//! - [`llm::embeddings`] - Batch embedding generation via Ollama or OpenAI-compatible APIs
//! - [`llm::places`] - Attraction, restaurant, hotel, weather and tip lookups answered by the LLM
//! - [`web_search`] - DuckDuckGo HTML search
//! - [`agents`] - Chat and trip-planning orchestration
//! - [`observability`] - Request metrics and in-flight traces
//! - [`api`] - Axum HTTP handlers

pub mod agents;
pub mod api;
pub mod config;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod observability;
pub mod rag;
pub mod session;
pub mod state;
pub mod web_search;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use state::AppState;

/// Multipart framing on top of the file itself
const UPLOAD_BODY_SLACK: usize = 1024 * 1024;

/// Build the HTTP router.
pub fn app(state: AppState) -> Router {
    // Any origin: the browser frontend is served separately and there is no auth
    let cors = CorsLayer::permissive();
    let body_limit = state.config.max_upload_bytes() + UPLOAD_BODY_SLACK;

    Router::new()
        .route("/", get(api::health::root))
        .route("/health", get(api::health::health))
        .route("/metrics", get(api::health::metrics))
        .route("/metrics/summary", get(api::health::metrics_summary))
        .route("/traces", get(api::health::traces))
        .route("/chat", post(api::chat::chat))
        .route("/plan", post(api::plan::plan))
        .route("/upload", post(api::upload::upload))
        .route(
            "/session/{id}",
            get(api::session::get_session).delete(api::session::clear_session),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            observability::track_requests,
        ))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
