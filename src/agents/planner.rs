//! Trip itinerary generation.
//!
//! Attractions are looked up first so the itinerary prompt can name real
//! places. If the model's itinerary does not parse, a deterministic plan is
//! built by rotating through the same attractions.

use std::collections::BTreeMap;
use std::fmt::Write;

use anyhow::Result;
use serde::Deserialize;

use crate::llm::json::parse_json_object;
use crate::llm::places::search_attractions;
use crate::llm::{GenerateOptions, LlmClient};
use crate::models::{DayPlan, Itinerary, Place, TripPlanRequest, TripPlanResponse};

const ITINERARY_MAX_TOKENS: u32 = 3000;
const ITINERARY_TEMPERATURE: f32 = 0.7;
const ATTRACTIONS_IN_PROMPT: usize = 15;
const BUDGET_TYPE: &str = "balanced";
const MAPS_SEARCH_URL: &str = "https://www.google.com/maps/search/";

const SYSTEM_PROMPT: &str = "You are an expert travel planner creating detailed, realistic itineraries.
Use the provided attraction names and recommend actual restaurants and hotels in the destination.
CRITICAL: Use real place names - actual attractions, real restaurant names, real hotel names that exist in the destination.";

#[derive(Deserialize)]
struct ItineraryPayload {
    days: Vec<DayPlan>,
    #[serde(default)]
    accommodation_suggestions: Vec<String>,
    #[serde(default)]
    packing_list: Vec<String>,
    #[serde(default)]
    tips: Vec<String>,
}

/// Build a trip plan with one balanced itinerary option.
pub async fn plan_trip(llm: &LlmClient, request: &TripPlanRequest) -> Result<TripPlanResponse> {
    request.validate().map_err(anyhow::Error::msg)?;

    let found = search_attractions(llm, &request.destination).await;
    let attractions = if found.places.is_empty() {
        tracing::info!("No attractions found for {}, using fallback list", request.destination);
        fallback_attractions(&request.destination)
    } else {
        found.places
    };

    let itinerary = generate_itinerary(llm, request, &attractions).await;

    Ok(TripPlanResponse {
        destination: request.destination.clone(),
        duration: request.duration_days,
        options: vec![itinerary],
        weather_info: None,
        map_link: map_link(&request.destination),
    })
}

pub fn map_link(destination: &str) -> String {
    format!("{MAPS_SEARCH_URL}{}", destination.replace(' ', "+"))
}

async fn generate_itinerary(
    llm: &LlmClient,
    request: &TripPlanRequest,
    attractions: &[Place],
) -> Itinerary {
    let prompt = itinerary_prompt(request, attractions);
    let options = GenerateOptions::new(ITINERARY_MAX_TOKENS, ITINERARY_TEMPERATURE)
        .with_system(SYSTEM_PROMPT);
    let generation = llm.generate(&prompt, &options).await;

    if generation.fell_back {
        return fallback_itinerary(request, attractions);
    }

    match parse_itinerary(&generation.text, request) {
        Ok(itinerary) => {
            tracing::info!(
                "Parsed {}-day itinerary for {} (total {:.2} {})",
                itinerary.days.len(),
                request.destination,
                itinerary.total_cost,
                itinerary.currency
            );
            itinerary
        }
        Err(e) => {
            let preview: String = generation.text.chars().take(300).collect();
            tracing::warn!("Itinerary JSON rejected: {e:#}. Response was: {preview}");
            fallback_itinerary(request, attractions)
        }
    }
}

fn parse_itinerary(text: &str, request: &TripPlanRequest) -> Result<Itinerary> {
    let payload: ItineraryPayload = parse_json_object(text)?;
    if payload.days.is_empty() {
        anyhow::bail!("Itinerary has no days");
    }

    let total_cost = payload.days.iter().map(|d| d.estimated_cost).sum();
    Ok(Itinerary {
        title: format!("Best Trip to {}", request.destination),
        budget_type: BUDGET_TYPE.to_string(),
        total_cost,
        currency: request.currency.clone(),
        days: payload.days,
        accommodation_suggestions: payload.accommodation_suggestions,
        packing_list: payload.packing_list,
        tips: payload.tips,
    })
}

fn join_or(items: &[String], default: &str) -> String {
    if items.is_empty() {
        default.to_string()
    } else {
        items.join(", ")
    }
}

fn itinerary_prompt(request: &TripPlanRequest, attractions: &[Place]) -> String {
    let destination = &request.destination;
    let currency = &request.currency;
    let daily = request.daily_budget();

    let mut attraction_list = String::new();
    for (i, place) in attractions.iter().take(ATTRACTIONS_IN_PROMPT).enumerate() {
        let _ = write!(attraction_list, "  {}. {}", i + 1, place.name);
        if !place.description.is_empty() {
            let desc: String = place.description.chars().take(80).collect();
            let _ = write!(attraction_list, " - {desc}");
        }
        attraction_list.push('\n');
    }
    if attraction_list.is_empty() {
        attraction_list.push_str("  (Will recommend popular attractions)\n");
    }

    let interests = join_or(&request.interests, "general sightseeing, culture, food");
    let dietary = join_or(&request.dietary_preferences, "none");

    format!(
        r#"Create a detailed {days}-day trip itinerary for {destination}.

TRIP PARAMETERS:
- Total Budget: {budget:.2} {currency}
- Daily Budget: ~{daily:.2} {currency}/day
- Traveler Interests: {interests}
- Dietary Preferences: {dietary}

AVAILABLE ATTRACTIONS (USE THESE EXACT NAMES):
{attraction_list}
INSTRUCTIONS:
1. Use the actual attraction names listed above for activities
2. Recommend REAL restaurants in {destination}
3. Recommend REAL hotels in {destination}
4. Create realistic daily schedules with specific timing
5. Include different places each day for variety
6. Match activities to user interests: {interests}
7. Suggest authentic local dishes and must-try foods in {destination}

FOR EACH DAY INCLUDE:
- Morning activity (8 AM - 12 PM) with specific attraction name from list
- Afternoon activity (12 PM - 6 PM) with specific attraction name from list
- Evening activity (6 PM - 10 PM) with dinner location
- Meals with REAL restaurant names and specific local dishes to try
- Total estimated daily cost as a number

RESPOND WITH VALID JSON ONLY (no markdown, no extra text):
{{
    "days": [
        {{
            "day": 1,
            "morning": "9 AM: Visit [Attraction from list] - [Activity]. Entry: [Cost]",
            "afternoon": "2 PM: Explore [Another attraction from list] - [Activity]",
            "evening": "7 PM: Dinner at [Real restaurant]. Try their [local dish].",
            "meals": {{
                "breakfast": "[Restaurant] - [Dish] (Est. cost)",
                "lunch": "[Restaurant] - [Dish] (Est. cost)",
                "dinner": "[Restaurant] - [Dish] (Est. cost)"
            }},
            "estimated_cost": {daily:.2}
        }}
    ],
    "accommodation_suggestions": ["[Real hotel] - [Price range] - [Description]"],
    "packing_list": ["Item 1", "Item 2"],
    "tips": ["Tip 1", "Tip 2"]
}}"#,
        days = request.duration_days,
        budget = request.budget,
    )
}

const BALI_ATTRACTIONS: &[(&str, &str)] = &[
    ("Tanah Lot Temple", "Ancient Hindu shrine on rock formation"),
    ("Ubud Monkey Forest", "Sacred sanctuary with temples and monkeys"),
    ("Tegallalang Rice Terraces", "Iconic terraced rice fields"),
    ("Uluwatu Temple", "Clifftop temple with ocean views"),
    ("Seminyak Beach", "Popular beach with restaurants and clubs"),
    ("Mount Batur", "Active volcano with sunrise treks"),
    ("Tirta Empul Temple", "Holy spring water temple"),
    ("Nusa Penida", "Island with stunning beaches and cliffs"),
];

const PARIS_ATTRACTIONS: &[(&str, &str)] = &[
    ("Eiffel Tower", "Iconic iron landmark"),
    ("Louvre Museum", "World-famous art museum"),
    ("Notre-Dame Cathedral", "Gothic cathedral"),
    ("Arc de Triomphe", "Triumphal arch monument"),
    ("Sacré-Cœur", "Basilica on Montmartre hill"),
    ("Versailles Palace", "Royal palace with gardens"),
];

const TOKYO_ATTRACTIONS: &[(&str, &str)] = &[
    ("Senso-ji Temple", "Ancient Buddhist temple in Asakusa"),
    ("Tokyo Skytree", "Tallest structure in Japan"),
    ("Shibuya Crossing", "Famous pedestrian scramble"),
    ("Meiji Shrine", "Shinto shrine in forest"),
    ("Tsukiji Outer Market", "Fresh seafood and food stalls"),
    ("Tokyo Tower", "Communications and observation tower"),
];

/// Built-in attractions for destinations the lookup could not cover.
pub fn fallback_attractions(destination: &str) -> Vec<Place> {
    let lower = destination.to_lowercase();
    let known = [
        ("bali", BALI_ATTRACTIONS),
        ("paris", PARIS_ATTRACTIONS),
        ("tokyo", TOKYO_ATTRACTIONS),
    ];

    if let Some((_, places)) = known.iter().find(|(key, _)| lower.contains(key)) {
        return places
            .iter()
            .map(|(name, desc)| Place::new(*name, *desc))
            .collect();
    }

    vec![
        Place::new(format!("Historic District of {destination}"), "Cultural heritage area"),
        Place::new(format!("Main Square of {destination}"), "Central gathering place"),
        Place::new(format!("{destination} Museum"), "Local history and culture"),
        Place::new(format!("Popular Market in {destination}"), "Local shopping experience"),
    ]
}

/// Deterministic itinerary used when the model's answer is unusable.
pub fn fallback_itinerary(request: &TripPlanRequest, attractions: &[Place]) -> Itinerary {
    let destination = &request.destination;
    let daily_budget = request.daily_budget();

    let default_attraction = [Place::new(
        format!("Popular attraction in {destination}"),
        "Must-see location",
    )];
    let attractions = if attractions.is_empty() {
        &default_attraction[..]
    } else {
        attractions
    };
    let restaurant = "Local restaurant";

    let describe = |place: &Place, default: &str| {
        if place.description.is_empty() {
            default.to_string()
        } else {
            place.description.clone()
        }
    };

    let days = (1..=request.duration_days)
        .map(|day| {
            let offset = (day as usize - 1) * 2;
            let morning = &attractions[offset % attractions.len()];
            let afternoon = &attractions[(offset + 1) % attractions.len()];

            let meals = BTreeMap::from([
                ("breakfast".to_string(), format!("{restaurant} - Local breakfast")),
                ("lunch".to_string(), format!("{restaurant} - Lunch")),
                ("dinner".to_string(), format!("{restaurant} - Dinner")),
            ]);

            DayPlan {
                day,
                morning: format!(
                    "9 AM: Visit {} - {}",
                    morning.name,
                    describe(morning, "Sightseeing and exploration")
                ),
                afternoon: format!(
                    "2 PM: Explore {} - {}",
                    afternoon.name,
                    describe(afternoon, "Continue exploring")
                ),
                evening: format!("7 PM: Dinner at {restaurant} followed by evening stroll"),
                meals,
                estimated_cost: daily_budget,
            }
        })
        .collect();

    Itinerary {
        title: format!("Balanced Trip to {destination}"),
        budget_type: BUDGET_TYPE.to_string(),
        total_cost: request.budget,
        currency: request.currency.clone(),
        days,
        accommodation_suggestions: vec![format!(
            "Balanced hotel in {destination} - Comfortable accommodation"
        )],
        packing_list: [
            "Comfortable walking shoes",
            "Weather-appropriate clothing",
            "Travel documents and copies",
            "Camera/smartphone with charger",
            "Universal power adapter",
            "Personal toiletries",
            "Daypack for excursions",
            "Reusable water bottle",
            "Sunscreen and sunglasses",
            "Light rain jacket",
        ]
        .into_iter()
        .map(String::from)
        .collect(),
        tips: vec![
            format!("Book {destination} attractions in advance to save time"),
            "Download offline maps before arrival".to_string(),
            "Try authentic local cuisine".to_string(),
            "Use local transportation to save money".to_string(),
            "Respect local customs and dress codes".to_string(),
            "Keep copies of important documents".to_string(),
            format!("Check visa requirements for {destination}"),
        ],
    }
}
