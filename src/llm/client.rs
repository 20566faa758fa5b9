use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::LlmConfig;
use crate::observability::Metrics;

/// Returned when every attempt against the LLM has failed.
pub const FALLBACK_RESPONSE: &str = "I apologize, but I'm currently unable to process your request. \
     The AI service may be temporarily unavailable. Please try again in a moment.";

const HEALTH_TIMEOUT_SECS: u64 = 5;

/// Sampling parameters for a single generation.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub system: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            system: None,
            max_tokens: 1000,
            temperature: 0.7,
        }
    }
}

impl GenerateOptions {
    pub fn new(max_tokens: u32, temperature: f32) -> Self {
        Self {
            system: None,
            max_tokens,
            temperature,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// Result of a generation. `fell_back` marks the canned apology text.
#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    pub tokens: u64,
    pub fell_back: bool,
}

/// Text-generation client for Gemini (when an API key is configured) or Ollama.
#[derive(Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    config: Arc<LlmConfig>,
    metrics: Arc<Metrics>,
}

impl LlmClient {
    pub fn new(http: reqwest::Client, config: LlmConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            http,
            config: Arc::new(config),
            metrics,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        if self.config.use_gemini() {
            "Gemini"
        } else {
            "Ollama"
        }
    }

    pub fn model(&self) -> &str {
        if self.config.use_gemini() {
            &self.config.gemini_model
        } else {
            &self.config.ollama_model
        }
    }

    /// Generate text, retrying failed or empty responses. After the last
    /// attempt the canned fallback text is returned instead of an error.
    pub async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Generation {
        let attempts = self.config.max_retries.max(1);
        let backoff = Duration::from_millis(self.config.retry_backoff_ms);

        for attempt in 1..=attempts {
            let start = Instant::now();
            match self.generate_once(prompt, options).await {
                Ok((text, tokens)) if !text.trim().is_empty() => {
                    let duration = start.elapsed();
                    self.metrics.record_llm_call(self.model(), tokens, duration);
                    tracing::debug!(
                        "{} returned {} chars ({tokens} tokens) in {:.2}s",
                        self.provider_name(),
                        text.len(),
                        duration.as_secs_f64()
                    );
                    return Generation {
                        text: text.trim().to_string(),
                        tokens,
                        fell_back: false,
                    };
                }
                Ok(_) => {
                    tracing::warn!(
                        "{} returned empty text (attempt {attempt}/{attempts})",
                        self.provider_name()
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "{} call failed (attempt {attempt}/{attempts}): {e:#}",
                        self.provider_name()
                    );
                }
            }

            if attempt < attempts && !backoff.is_zero() {
                tokio::time::sleep(backoff).await;
            }
        }

        self.metrics.record_error("unavailable", "llm");
        Generation {
            text: FALLBACK_RESPONSE.to_string(),
            tokens: 0,
            fell_back: true,
        }
    }

    async fn generate_once(&self, prompt: &str, options: &GenerateOptions) -> Result<(String, u64)> {
        if self.config.use_gemini() {
            self.generate_gemini(prompt, options).await
        } else {
            self.generate_ollama(prompt, options).await
        }
    }

    /// Whether the backing service is reachable. A configured Gemini key is
    /// assumed to work.
    pub async fn is_healthy(&self) -> bool {
        if self.config.use_gemini() {
            return true;
        }

        let url = format!("{}/api/tags", self.config.ollama_base_url);
        match self
            .http
            .get(&url)
            .timeout(Duration::from_secs(HEALTH_TIMEOUT_SECS))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!("Ollama health check failed: {e}");
                false
            }
        }
    }

    // ─── Ollama ──────────────────────────────────────────────

    async fn generate_ollama(&self, prompt: &str, options: &GenerateOptions) -> Result<(String, u64)> {
        let url = format!("{}/api/generate", self.config.ollama_base_url);

        let req = OllamaGenerateRequest {
            model: &self.config.ollama_model,
            prompt,
            stream: false,
            system: options.system.as_deref(),
            options: OllamaOptions {
                num_predict: options.max_tokens,
                temperature: options.temperature,
            },
        };

        let resp = self
            .http
            .post(&url)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .json(&req)
            .send()
            .await
            .context("Failed to call Ollama generate API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Ollama generate API returned {status}: {body}");
        }

        let body: OllamaGenerateResponse = resp
            .json()
            .await
            .context("Failed to parse Ollama generate response")?;

        let tokens = body.prompt_eval_count.unwrap_or(0) + body.eval_count.unwrap_or(0);
        Ok((body.response, tokens))
    }

    // ─── Gemini ──────────────────────────────────────────────

    async fn generate_gemini(&self, prompt: &str, options: &GenerateOptions) -> Result<(String, u64)> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.gemini_base_url, self.config.gemini_model
        );
        let api_key = self.config.gemini_api_key.as_deref().unwrap_or_default();

        // Gemini gets the system text inline
        let text = match options.system.as_deref() {
            Some(system) => format!("{system}\n\n{prompt}"),
            None => prompt.to_string(),
        };

        let req = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_tokens,
                candidate_count: 1,
            },
        };

        let resp = self
            .http
            .post(&url)
            .query(&[("key", api_key)])
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .json(&req)
            .send()
            .await
            .context("Failed to call Gemini generateContent API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let body: String = body.chars().take(500).collect();
            anyhow::bail!("Gemini API returned {status}: {body}");
        }

        let body: GeminiResponse = resp
            .json()
            .await
            .context("Failed to parse Gemini response")?;

        let tokens = body
            .usage_metadata
            .map(|u| u.total_token_count)
            .unwrap_or(0);
        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text)
            .unwrap_or_default();

        Ok((text, tokens))
    }
}

#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    num_predict: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct OllamaGenerateResponse {
    #[serde(default)]
    response: String,
    prompt_eval_count: Option<u64>,
    eval_count: Option<u64>,
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    candidate_count: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    total_token_count: u64,
}
