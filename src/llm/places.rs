//! Place lookups answered from the LLM's own knowledge.
//!
//! Attractions, restaurants and hotels come back as a JSON list of places.
//! Weather and travel tips come back as short prose summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::llm::json::parse_json_object;
use crate::llm::{GenerateOptions, LlmClient};
use crate::models::Place;

const PLACES_MAX_TOKENS: u32 = 3000;
const WEATHER_MAX_TOKENS: u32 = 200;
const TIPS_MAX_TOKENS: u32 = 400;
const SEARCH_TEMPERATURE: f32 = 0.3;

/// Places found for one city and category.
#[derive(Debug, Clone, Serialize)]
pub struct PlaceSearch {
    pub city: String,
    pub query: String,
    pub places: Vec<Place>,
    pub timestamp: DateTime<Utc>,
}

/// A free-text answer about a destination. `summary` is empty when the LLM
/// was unavailable.
#[derive(Debug, Clone, Serialize)]
pub struct TextSearch {
    pub subject: String,
    pub query: String,
    pub summary: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Deserialize)]
struct PlacesPayload {
    #[serde(default)]
    places: Vec<Place>,
}

pub async fn search_attractions(llm: &LlmClient, city: &str) -> PlaceSearch {
    let prompt = format!(
        r#"List the top 15 most popular tourist attractions in {city}.
For each attraction, provide:
- Exact name (as locals call it)
- Brief description (1 sentence)
- Typical entry fee (if applicable)
- Best visiting hours

Respond with ONLY valid JSON, no markdown:
{{
    "places": [
        {{
            "name": "Exact Attraction Name",
            "description": "Brief description",
            "price": "Entry fee or Free",
            "hours": "Opening hours"
        }}
    ]
}}"#
    );
    let system = "You are a travel expert with deep knowledge of destinations worldwide. \
                  Provide accurate, real information.";

    search_places(llm, city, format!("attractions in {city}"), &prompt, system).await
}

pub async fn search_restaurants(llm: &LlmClient, city: &str) -> PlaceSearch {
    let prompt = format!(
        r#"List 15 popular, highly-rated restaurants in {city}.
Include a mix of local cuisine and international options, different price ranges.
For each restaurant, provide:
- Exact name
- Cuisine type
- Price range ($, $$, $$$)
- Brief description (1 sentence)

Respond with ONLY valid JSON, no markdown:
{{
    "places": [
        {{
            "name": "Restaurant Name",
            "description": "What they're known for",
            "price": "$$",
            "cuisine": "Cuisine type"
        }}
    ]
}}"#
    );
    let system = "You are a food critic with extensive knowledge of restaurants worldwide. \
                  Provide real restaurant names.";

    search_places(llm, city, format!("restaurants in {city}"), &prompt, system).await
}

pub async fn search_hotels(llm: &LlmClient, city: &str) -> PlaceSearch {
    let prompt = format!(
        r#"List 12 popular hotels in {city} across different price ranges (budget, mid-range, luxury).
For each hotel, provide:
- Exact hotel name
- Approximate price per night
- Brief description (1 sentence)
- Key amenities

Respond with ONLY valid JSON, no markdown:
{{
    "places": [
        {{
            "name": "Hotel Name",
            "description": "Brief description and location",
            "price": "$50-80/night",
            "amenities": "Pool, Spa, WiFi"
        }}
    ]
}}"#
    );
    let system = "You are a travel accommodation expert with knowledge of hotels worldwide. \
                  Provide real hotel names.";

    search_places(llm, city, format!("hotels in {city}"), &prompt, system).await
}

pub async fn search_weather(llm: &LlmClient, city: &str) -> TextSearch {
    let prompt = format!(
        "Provide typical weather information for {city} at this time of year.\n\
         Include temperature, conditions, and what to expect.\n\
         Keep it brief (2-3 sentences)."
    );
    let system = "You are a weather expert. Provide typical weather patterns.";

    search_text(llm, city, format!("weather in {city}"), &prompt, system, WEATHER_MAX_TOKENS).await
}

pub async fn search_travel_tips(llm: &LlmClient, destination: &str) -> TextSearch {
    let prompt = format!(
        "Provide 5 essential travel tips for visiting {destination}.\n\
         Include practical advice about transportation, money, customs, safety, and best times to visit.\n\
         Keep each tip to 1-2 sentences."
    );
    let system = "You are a travel advisor with extensive destination knowledge.";

    search_text(
        llm,
        destination,
        format!("travel tips for {destination}"),
        &prompt,
        system,
        TIPS_MAX_TOKENS,
    )
    .await
}

async fn search_places(
    llm: &LlmClient,
    city: &str,
    query: String,
    prompt: &str,
    system: &str,
) -> PlaceSearch {
    let options = GenerateOptions::new(PLACES_MAX_TOKENS, SEARCH_TEMPERATURE).with_system(system);
    let generation = llm.generate(prompt, &options).await;

    let places = if generation.fell_back {
        Vec::new()
    } else {
        match parse_json_object::<PlacesPayload>(&generation.text) {
            Ok(payload) => {
                let places: Vec<Place> = payload
                    .places
                    .into_iter()
                    .filter(|p| !p.name.trim().is_empty())
                    .collect();
                tracing::info!("Found {} {query}", places.len());
                places
            }
            Err(e) => {
                let preview: String = generation.text.chars().take(200).collect();
                tracing::warn!("Could not parse {query}: {e:#}. Response was: {preview}");
                Vec::new()
            }
        }
    };

    PlaceSearch {
        city: city.to_string(),
        query,
        places,
        timestamp: Utc::now(),
    }
}

async fn search_text(
    llm: &LlmClient,
    subject: &str,
    query: String,
    prompt: &str,
    system: &str,
    max_tokens: u32,
) -> TextSearch {
    let options = GenerateOptions::new(max_tokens, SEARCH_TEMPERATURE).with_system(system);
    let generation = llm.generate(prompt, &options).await;

    let summary = if generation.fell_back {
        String::new()
    } else {
        generation.text
    };

    TextSearch {
        subject: subject.to_string(),
        query,
        summary,
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmConfig;
    use crate::observability::Metrics;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn llm_replying(text: &str) -> (MockServer, LlmClient) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "response": text })),
            )
            .mount(&server)
            .await;

        let config = LlmConfig {
            ollama_base_url: server.uri(),
            retry_backoff_ms: 0,
            ..LlmConfig::default()
        };
        let llm = LlmClient::new(reqwest::Client::new(), config, Arc::new(Metrics::new()));
        (server, llm)
    }

    #[tokio::test]
    async fn test_attractions_parsed_from_fenced_json() {
        let reply = "```json\n{\"places\": [{\"name\": \"Senso-ji\", \"description\": \"Temple\", \"price\": \"Free\", \"hours\": \"6am-5pm\"}, {\"name\": \"\"}]}\n```";
        let (_server, llm) = llm_replying(reply).await;

        let result = search_attractions(&llm, "Tokyo").await;
        assert_eq!(result.city, "Tokyo");
        assert_eq!(result.query, "attractions in Tokyo");
        assert_eq!(result.places.len(), 1);
        assert_eq!(result.places[0].name, "Senso-ji");
        assert_eq!(result.places[0].hours.as_deref(), Some("6am-5pm"));
    }

    #[tokio::test]
    async fn test_unparseable_places_are_empty() {
        let (_server, llm) = llm_replying("Sorry, I can't list hotels right now.").await;
        let result = search_hotels(&llm, "Rome").await;
        assert!(result.places.is_empty());
        assert_eq!(result.query, "hotels in Rome");
    }

    #[tokio::test]
    async fn test_weather_summary() {
        let (_server, llm) = llm_replying("Mild and sunny, around 20C.").await;
        let result = search_weather(&llm, "Lisbon").await;
        assert_eq!(result.summary, "Mild and sunny, around 20C.");
        assert_eq!(result.query, "weather in Lisbon");
    }

    #[tokio::test]
    async fn test_fallback_gives_empty_results() {
        let config = LlmConfig {
            ollama_base_url: "http://127.0.0.1:1".into(),
            max_retries: 1,
            retry_backoff_ms: 0,
            ..LlmConfig::default()
        };
        let llm = LlmClient::new(reqwest::Client::new(), config, Arc::new(Metrics::new()));

        assert!(search_restaurants(&llm, "Paris").await.places.is_empty());
        assert!(search_travel_tips(&llm, "Paris").await.summary.is_empty());
    }
}
