//! Conversational travel assistant.
//!
//! Each message is classified by keyword into the kinds of context it needs.
//! Context is gathered from the session's uploaded documents, LLM place
//! lookups for the detected city and, for general questions, the web. The
//! result is folded into one prompt together with the recent conversation.

use std::fmt::Write;

use anyhow::Result;

use crate::llm::embeddings::embed_single;
use crate::llm::places::{self, PlaceSearch, TextSearch};
use crate::llm::GenerateOptions;
use crate::models::{ChatMessage, ChatResponse, SearchResult, Source};
use crate::rag::RetrievedChunk;
use crate::state::AppState;
use crate::web_search;

const HISTORY_IN_PROMPT: usize = 6;
const CHAT_MAX_TOKENS: u32 = 1000;
const CHAT_TEMPERATURE: f32 = 0.7;
const SOURCE_PREVIEW_CHARS: usize = 200;
const CONTEXT_DOC_CHARS: usize = 300;
const PLACES_IN_CONTEXT: usize = 10;

const DOCUMENT_WORDS: &[&str] = &["document", "visa", "requirement", "uploaded", "my file"];
const WEATHER_WORDS: &[&str] = &["weather", "temperature", "climate", "forecast", "rain"];
const HOTEL_WORDS: &[&str] = &["hotel", "stay", "accommodation", "lodging", "where to stay"];
const ATTRACTION_WORDS: &[&str] = &[
    "attraction",
    "visit",
    "see",
    "things to do",
    "sightseeing",
    "places",
];
const RESTAURANT_WORDS: &[&str] = &["restaurant", "food", "eat", "dining", "cuisine"];
const TIPS_WORDS: &[&str] = &["tips", "advice", "etiquette", "customs", "safety"];
const GENERAL_WORDS: &[&str] = &["how to", "what is", "when is", "best time", "cost", "price"];

const KNOWN_CITIES: &[&str] = &[
    "tokyo",
    "paris",
    "london",
    "new york",
    "delhi",
    "mumbai",
    "bangalore",
    "rome",
    "barcelona",
    "amsterdam",
    "dubai",
    "singapore",
    "bangkok",
    "istanbul",
    "sydney",
    "toronto",
    "san francisco",
    "los angeles",
    "chicago",
    "chennai",
    "kolkata",
    "hyderabad",
    "pune",
    "ahmedabad",
    "jaipur",
    "goa",
    "berlin",
    "madrid",
    "vienna",
    "prague",
    "miami",
    "vegas",
    "seattle",
];

const SYSTEM_PROMPT: &str = "You are an expert AI Travel Concierge. Your goal is to help travelers \
plan amazing trips and answer travel-related questions with REAL, SPECIFIC place names.

Your Capabilities:
- Access to information about attractions, restaurants, hotels, and weather
- Provide ACTUAL place names, not generic descriptions
- Give personalized travel recommendations based on user interests
- Answer questions about destinations worldwide with specific details

CRITICAL RULES:
1. ALWAYS use the EXACT place names from the context provided
2. When recommending places, use the real names (e.g., \"Senso-ji Temple\", \"Park Hyatt Tokyo\")
3. Include descriptions and details from the context
4. If prices are available, mention them
5. Format responses clearly with numbered lists for multiple recommendations
6. Be enthusiastic and helpful

Guidelines:
- Use specific information from the provided context
- If you don't have current information, explain that and offer to search for it
- Always prioritize accuracy over generic suggestions";

/// What a message asks for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Intent {
    pub needs_documents: bool,
    pub needs_weather: bool,
    pub needs_hotels: bool,
    pub needs_attractions: bool,
    pub needs_restaurants: bool,
    pub needs_general_search: bool,
    pub needs_tips: bool,
    pub location: Option<String>,
}

/// Classify a message by keyword and look for a destination in it.
pub fn analyze_intent(message: &str) -> Intent {
    let lower = message.to_lowercase();
    let mentions = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    let mut location = KNOWN_CITIES
        .iter()
        .find(|city| lower.contains(*city))
        .map(|city| title_case(city));

    if location.is_none() && (lower.contains("places") || lower.contains("attractions")) {
        let words: Vec<&str> = lower.split_whitespace().collect();
        location = words
            .windows(2)
            .find(|pair| matches!(pair[0], "in" | "at" | "near" | "around"))
            .map(|pair| pair[1].trim_matches(|c| matches!(c, '?' | ',' | '.' | '!')))
            .filter(|word| !word.is_empty())
            .map(title_case);
    }

    Intent {
        needs_documents: mentions(DOCUMENT_WORDS),
        needs_weather: mentions(WEATHER_WORDS),
        needs_hotels: mentions(HOTEL_WORDS),
        needs_attractions: mentions(ATTRACTION_WORDS),
        needs_restaurants: mentions(RESTAURANT_WORDS),
        needs_general_search: mentions(GENERAL_WORDS),
        needs_tips: mentions(TIPS_WORDS),
        location,
    }
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Everything gathered for one prompt.
#[derive(Debug, Default)]
pub struct ChatContext {
    pub documents: Vec<RetrievedChunk>,
    pub weather: Option<TextSearch>,
    pub tips: Option<TextSearch>,
    pub attractions: Option<PlaceSearch>,
    pub restaurants: Option<PlaceSearch>,
    pub hotels: Option<PlaceSearch>,
    pub web: Vec<SearchResult>,
}

impl ChatContext {
    fn has_realtime(&self) -> bool {
        self.weather.is_some()
            || self.tips.is_some()
            || self.attractions.is_some()
            || self.restaurants.is_some()
            || self.hotels.is_some()
            || !self.web.is_empty()
    }

    /// Render as the "Available Information" block of the prompt.
    pub fn render(&self) -> String {
        let mut out = String::new();

        if !self.documents.is_empty() {
            out.push_str("=== FROM YOUR UPLOADED DOCUMENTS ===\n");
            for doc in &self.documents {
                let _ = writeln!(out, "- {}", preview(&doc.content, CONTEXT_DOC_CHARS));
            }
            out.push('\n');
        }

        if self.has_realtime() {
            out.push_str("=== REAL-TIME INFORMATION ===\n");

            if let Some(weather) = &self.weather {
                let _ = writeln!(out, "\nWeather Information:\nSummary: {}", weather.summary);
            }

            if let Some(tips) = &self.tips {
                let _ = writeln!(out, "\nTravel Tips:\n{}", tips.summary);
            }

            if let Some(attractions) = &self.attractions {
                let _ = writeln!(out, "\nTop Attractions ({} found):", attractions.places.len());
                for (i, place) in attractions.places.iter().take(PLACES_IN_CONTEXT).enumerate() {
                    let _ = write!(out, "{}. {}", i + 1, place.name);
                    if !place.description.is_empty() {
                        let _ = write!(out, " - {}", preview(&place.description, 100));
                    }
                    if !place.price.is_empty() {
                        let _ = write!(out, " ({})", place.price);
                    }
                    out.push('\n');
                }
            }

            if let Some(restaurants) = &self.restaurants {
                let _ = writeln!(out, "\nRestaurants ({} found):", restaurants.places.len());
                for (i, place) in restaurants.places.iter().take(PLACES_IN_CONTEXT).enumerate() {
                    let _ = write!(out, "{}. {}", i + 1, place.name);
                    if let Some(cuisine) = place.cuisine.as_deref().filter(|c| !c.is_empty()) {
                        let _ = write!(out, " - {cuisine}");
                    }
                    if !place.description.is_empty() {
                        let _ = write!(out, " - {}", preview(&place.description, 80));
                    }
                    out.push('\n');
                }
            }

            if let Some(hotels) = &self.hotels {
                let _ = writeln!(out, "\nHotels ({} found):", hotels.places.len());
                for (i, place) in hotels.places.iter().take(PLACES_IN_CONTEXT).enumerate() {
                    let _ = write!(out, "{}. {}", i + 1, place.name);
                    if !place.description.is_empty() {
                        let _ = write!(out, " - {}", preview(&place.description, 80));
                    }
                    if !place.price.is_empty() {
                        let _ = write!(out, " - {}", place.price);
                    }
                    out.push('\n');
                }
            }

            if !self.web.is_empty() {
                out.push_str("\nWeb Results:\n");
                for (i, hit) in self.web.iter().enumerate() {
                    let _ = writeln!(out, "{}. {} ({})", i + 1, hit.title, hit.url);
                    if !hit.snippet.is_empty() {
                        let _ = writeln!(out, "   {}", preview(&hit.snippet, 200));
                    }
                }
            }

            out.push('\n');
        }

        out
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Assemble the user prompt from the question, recent turns and context.
pub fn build_prompt(message: &str, history: &[ChatMessage], context: &str) -> String {
    let mut prompt = format!("User Question: {message}\n\n");

    if !history.is_empty() {
        let skip = history.len().saturating_sub(HISTORY_IN_PROMPT);
        prompt.push_str("Previous Conversation:\n");
        for turn in &history[skip..] {
            let _ = writeln!(prompt, "{}: {}", title_case(&turn.role), turn.content);
        }
        prompt.push('\n');
    }

    if context.trim().is_empty() {
        prompt.push_str(
            "No specific data available. Use your general travel knowledge to provide helpful \
             guidance, but mention that you can search for real-time information if needed.\n\n",
        );
    } else {
        let _ = write!(prompt, "Available Information:\n{context}\n");
    }

    prompt.push_str(
        "IMPORTANT: Use the EXACT place names from the information above. Format your response clearly:\n\
         - For attractions/restaurants/hotels: Use numbered lists with names and descriptions\n\
         - Be specific and detailed\n\
         - Include prices when available\n\n\
         Provide a helpful, engaging response:",
    );
    prompt
}

/// Answer one chat message within a session.
pub async fn process_message(
    state: &AppState,
    message: &str,
    session_id: Option<&str>,
) -> Result<ChatResponse> {
    let session_id = state.sessions.get_or_create(session_id);
    let history = state.sessions.history(&session_id);
    let intent = analyze_intent(message);
    tracing::debug!(session = %session_id, ?intent, "Analyzed chat intent");

    let mut context = ChatContext::default();
    let mut sources = Vec::new();
    let mut tool_calls = Vec::new();

    // Uploaded documents are consulted whenever the session has any
    if intent.needs_documents || state.sessions.has_documents(&session_id) {
        let query_embedding =
            match embed_single(&state.http_client, &state.config.embedding, message).await {
                Ok(embedding) => Some(embedding),
                Err(e) => {
                    tracing::warn!("Query embedding failed, using keyword retrieval: {e:#}");
                    None
                }
            };

        let docs = state.sessions.search(
            &session_id,
            message,
            query_embedding.as_deref(),
            state.config.rag.top_k,
        );
        if !docs.is_empty() {
            sources.extend(docs.iter().map(|doc| Source::Document {
                filename: doc.filename.clone(),
                content: format!("{}...", preview(&doc.content, SOURCE_PREVIEW_CHARS)),
                distance: doc.distance,
            }));
            tool_calls.push("rag_search".to_string());
            context.documents = docs;
        }
    }

    if let Some(city) = intent.location.as_deref() {
        let llm = &state.llm;
        let (weather, tips, hotels, attractions, restaurants) = tokio::join!(
            async {
                if intent.needs_weather {
                    Some(places::search_weather(llm, city).await)
                } else {
                    None
                }
            },
            async {
                if intent.needs_tips {
                    Some(places::search_travel_tips(llm, city).await)
                } else {
                    None
                }
            },
            async {
                if intent.needs_hotels {
                    Some(places::search_hotels(llm, city).await)
                } else {
                    None
                }
            },
            async {
                if intent.needs_attractions {
                    Some(places::search_attractions(llm, city).await)
                } else {
                    None
                }
            },
            async {
                if intent.needs_restaurants {
                    Some(places::search_restaurants(llm, city).await)
                } else {
                    None
                }
            },
        );

        if let Some(weather) = weather.filter(|w| !w.summary.is_empty()) {
            sources.push(Source::LlmSearch {
                query: format!("Weather for {city}"),
            });
            tool_calls.push("weather_search".to_string());
            context.weather = Some(weather);
        }
        if let Some(tips) = tips.filter(|t| !t.summary.is_empty()) {
            sources.push(Source::LlmSearch {
                query: format!("Travel tips for {city}"),
            });
            tool_calls.push("tips_search".to_string());
            context.tips = Some(tips);
        }
        if let Some(hotels) = hotels.filter(|h| !h.places.is_empty()) {
            sources.push(Source::LlmSearch {
                query: format!("Hotels in {city}"),
            });
            tool_calls.push("hotel_search".to_string());
            context.hotels = Some(hotels);
        }
        if let Some(attractions) = attractions.filter(|a| !a.places.is_empty()) {
            sources.push(Source::LlmSearch {
                query: format!("Attractions in {city}"),
            });
            tool_calls.push("attractions_search".to_string());
            context.attractions = Some(attractions);
        }
        if let Some(restaurants) = restaurants.filter(|r| !r.places.is_empty()) {
            sources.push(Source::LlmSearch {
                query: format!("Restaurants in {city}"),
            });
            tool_calls.push("restaurants_search".to_string());
            context.restaurants = Some(restaurants);
        }
    }

    if intent.needs_general_search {
        tool_calls.push("llm_knowledge".to_string());

        let hits = web_search::search(&state.http_client, &state.config.web_search, message).await;
        if !hits.is_empty() {
            sources.extend(hits.iter().map(|hit| Source::Web {
                title: hit.title.clone(),
                url: hit.url.clone(),
            }));
            tool_calls.push("web_search".to_string());
            context.web = hits;
        }
    }

    let prompt = build_prompt(message, &history, &context.render());
    let options = GenerateOptions::new(CHAT_MAX_TOKENS, CHAT_TEMPERATURE).with_system(SYSTEM_PROMPT);
    let generation = state.llm.generate(&prompt, &options).await;
    tracing::info!(
        session = %session_id,
        "Generated chat response ({} chars, {} tool calls)",
        generation.text.len(),
        tool_calls.len()
    );

    state
        .sessions
        .append_exchange(&session_id, message, &generation.text);

    Ok(ChatResponse {
        message: generation.text,
        sources: (!sources.is_empty()).then_some(sources),
        tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
        session_id,
    })
}
