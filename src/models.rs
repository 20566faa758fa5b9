use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MAX_CHAT_MESSAGE_LEN: usize = 2000;
pub const MAX_TRIP_DAYS: u32 = 30;

/// A single conversation turn (user or assistant)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

// ─── Chat ────────────────────────────────────────────────

/// Chat request
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Optional session to continue. A new one is created when absent.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Where a piece of prompt context came from
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Source {
    Document {
        filename: String,
        content: String,
        distance: f32,
    },
    LlmSearch {
        query: String,
    },
    Web {
        title: String,
        url: String,
    },
}

/// Chat response. Empty `sources` / `tool_calls` serialize as null.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub message: String,
    pub sources: Option<Vec<Source>>,
    pub tool_calls: Option<Vec<String>>,
    pub session_id: String,
}

// ─── Trip planning ───────────────────────────────────────

fn default_currency() -> String {
    "USD".to_string()
}

/// Trip planning request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripPlanRequest {
    pub destination: String,
    pub duration_days: u32,
    pub budget: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub dietary_preferences: Vec<String>,
}

impl TripPlanRequest {
    /// Check field bounds, returning a client-facing message on failure.
    pub fn validate(&self) -> Result<(), String> {
        if self.destination.trim().chars().count() < 2 {
            return Err("Destination must be at least 2 characters".to_string());
        }
        if self.duration_days < 1 || self.duration_days > MAX_TRIP_DAYS {
            return Err(format!(
                "duration_days must be between 1 and {MAX_TRIP_DAYS}"
            ));
        }
        if !(self.budget > 0.0) || !self.budget.is_finite() {
            return Err("Budget must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn daily_budget(&self) -> f64 {
        self.budget / f64::from(self.duration_days.max(1))
    }
}

/// Single day of an itinerary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayPlan {
    pub day: u32,
    pub morning: String,
    pub afternoon: String,
    pub evening: String,
    pub meals: BTreeMap<String, String>,
    pub estimated_cost: f64,
}

/// A complete itinerary option
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Itinerary {
    pub title: String,
    /// budget, balanced or luxury
    pub budget_type: String,
    pub total_cost: f64,
    pub currency: String,
    pub days: Vec<DayPlan>,
    pub accommodation_suggestions: Vec<String>,
    pub packing_list: Vec<String>,
    pub tips: Vec<String>,
}

/// Trip planning response
#[derive(Debug, Clone, Serialize)]
pub struct TripPlanResponse {
    pub destination: String,
    pub duration: u32,
    pub options: Vec<Itinerary>,
    pub weather_info: Option<serde_json::Value>,
    pub map_link: String,
}

// ─── Documents ───────────────────────────────────────────

/// Response after a document upload
#[derive(Debug, Clone, Serialize)]
pub struct DocumentUploadResponse {
    pub filename: String,
    pub pages: usize,
    pub chunks: usize,
    pub status: String,
    pub message: String,
    pub session_id: String,
}

/// Summary of an uploaded document held by a session
#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
    pub chunks: usize,
}

/// A slice of uploaded document text, produced once at upload time.
#[derive(Debug, Clone)]
pub struct DocumentChunk {
    pub filename: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub content: String,
    /// `None` when the embedding service was unavailable during upload.
    pub embedding: Option<Vec<f32>>,
}

// ─── Search ──────────────────────────────────────────────

/// Single web search hit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// A place suggested by the LLM place search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Place {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amenities: Option<String>,
}

impl Place {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ..Self::default()
        }
    }
}
