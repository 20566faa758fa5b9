use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,
    /// LLM provider configuration
    pub llm: LlmConfig,
    /// Embedding service used for document retrieval
    pub embedding: EmbeddingConfig,
    /// Web search configuration
    pub web_search: WebSearchConfig,
    /// Session lifetime and history settings
    pub session: SessionConfig,
    /// Chunking and retrieval settings
    pub rag: RagConfig,
    /// Maximum upload size in MB
    pub max_upload_size_mb: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL for a self-hosted Ollama server
    pub ollama_base_url: String,
    /// Ollama model name
    pub ollama_model: String,
    /// Gemini API key. When set, Gemini is used instead of Ollama.
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Total attempts per generation before the canned fallback is returned
    pub max_retries: usize,
    /// Fixed delay between attempts
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "ollama" or "openai"
    pub provider: String,
    pub base_url: String,
    pub model: String,
    /// API key (only needed for cloud providers)
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchConfig {
    pub enabled: bool,
    /// DuckDuckGo HTML endpoint root
    pub base_url: String,
    pub max_results: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Inactivity window after which a session is evicted
    pub ttl_secs: u64,
    /// How often the sweeper looks for expired sessions
    pub sweep_interval_secs: u64,
    /// Number of turns (user + assistant messages) kept per session
    pub max_history_turns: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Window size in characters
    pub chunk_size: usize,
    /// Characters shared between consecutive windows
    pub chunk_overlap: usize,
    /// Number of chunks pulled into a chat prompt
    pub top_k: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            llm: LlmConfig::default(),
            embedding: EmbeddingConfig::default(),
            web_search: WebSearchConfig::default(),
            session: SessionConfig::default(),
            rag: RagConfig::default(),
            max_upload_size_mb: 10,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            ollama_base_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3:8b".to_string(),
            gemini_api_key: None,
            gemini_model: "gemini-2.0-flash-exp".to_string(),
            gemini_base_url: "https://generativelanguage.googleapis.com".to_string(),
            timeout_secs: 60,
            max_retries: 3,
            retry_backoff_ms: 500,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            model: "all-minilm".to_string(),
            api_key: None,
        }
    }
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://html.duckduckgo.com".to_string(),
            max_results: 5,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            sweep_interval_secs: 60,
            max_history_turns: 10,
        }
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 3,
        }
    }
}

impl LlmConfig {
    pub fn use_gemini(&self) -> bool {
        self.gemini_api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("TRAVEL_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(val) = std::env::var("MAX_UPLOAD_SIZE_MB") {
            if let Ok(v) = val.parse() {
                config.max_upload_size_mb = v;
            }
        }

        // LLM
        if let Ok(url) = std::env::var("OLLAMA_BASE_URL") {
            config.llm.ollama_base_url = url;
        }
        if let Ok(model) = std::env::var("OLLAMA_MODEL") {
            config.llm.ollama_model = model;
        }
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            if !key.trim().is_empty() {
                config.llm.gemini_api_key = Some(key);
            }
        }
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            config.llm.gemini_model = model;
        }
        if let Ok(url) = std::env::var("GEMINI_BASE_URL") {
            config.llm.gemini_base_url = url;
        }
        if let Ok(val) = std::env::var("LLM_TIMEOUT_SECS") {
            if let Ok(v) = val.parse() {
                config.llm.timeout_secs = v;
            }
        }
        if let Ok(val) = std::env::var("LLM_MAX_RETRIES") {
            if let Ok(v) = val.parse::<usize>() {
                config.llm.max_retries = v.max(1);
            }
        }
        if let Ok(val) = std::env::var("LLM_RETRY_BACKOFF_MS") {
            if let Ok(v) = val.parse() {
                config.llm.retry_backoff_ms = v;
            }
        }

        // Embeddings
        if let Ok(provider) = std::env::var("EMBEDDING_PROVIDER") {
            config.embedding.provider = provider;
        }
        if let Ok(url) = std::env::var("EMBEDDING_BASE_URL") {
            config.embedding.base_url = url;
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            config.embedding.model = model;
        }
        if let Ok(key) = std::env::var("EMBEDDING_API_KEY") {
            config.embedding.api_key = Some(key);
        }

        // Web search
        if let Ok(val) = std::env::var("WEB_SEARCH_ENABLED") {
            if let Ok(v) = val.parse() {
                config.web_search.enabled = v;
            }
        }
        if let Ok(url) = std::env::var("WEB_SEARCH_BASE_URL") {
            config.web_search.base_url = url;
        }
        if let Ok(val) = std::env::var("MAX_SEARCH_RESULTS") {
            if let Ok(v) = val.parse() {
                config.web_search.max_results = v;
            }
        }

        // Sessions
        if let Ok(val) = std::env::var("SESSION_TTL_SECS") {
            if let Ok(v) = val.parse() {
                config.session.ttl_secs = v;
            }
        }
        if let Ok(val) = std::env::var("SESSION_SWEEP_SECS") {
            if let Ok(v) = val.parse::<u64>() {
                config.session.sweep_interval_secs = v.max(1);
            }
        }
        if let Ok(val) = std::env::var("MAX_HISTORY_TURNS") {
            if let Ok(v) = val.parse() {
                config.session.max_history_turns = v;
            }
        }

        // RAG
        if let Ok(val) = std::env::var("RAG_CHUNK_SIZE") {
            if let Ok(v) = val.parse::<usize>() {
                config.rag.chunk_size = v.max(1);
            }
        }
        if let Ok(val) = std::env::var("RAG_CHUNK_OVERLAP") {
            if let Ok(v) = val.parse() {
                config.rag.chunk_overlap = v;
            }
        }
        if let Ok(val) = std::env::var("RAG_TOP_K") {
            if let Ok(v) = val.parse() {
                config.rag.top_k = v;
            }
        }

        config
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_size_mb * 1024 * 1024
    }
}
