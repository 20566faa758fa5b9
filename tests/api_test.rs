//! End-to-end tests for the HTTP API.
//!
//! The router is driven in-process with `oneshot`; the LLM is a wiremock
//! server speaking the Ollama API, and the embedding service is unreachable
//! so document retrieval runs on keyword overlap.

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use travel_concierge::config::Config;
use travel_concierge::llm::client::FALLBACK_RESPONSE;
use travel_concierge::state::AppState;

const UNREACHABLE: &str = "http://127.0.0.1:1";
const BOUNDARY: &str = "X-TRAVEL-BOUNDARY";

const VISA_TEXT: &str = "Visa rules for Japan: travellers from most countries receive a free \
visa on arrival valid for 90 days. Keep your passport with you at all times.";

fn test_config(llm_url: &str) -> Config {
    let mut config = Config::default();
    config.llm.ollama_base_url = llm_url.to_string();
    config.llm.max_retries = 1;
    config.llm.retry_backoff_ms = 0;
    config.embedding.base_url = UNREACHABLE.to_string();
    config.web_search.enabled = false;
    config
}

fn test_app(config: Config) -> Router {
    travel_concierge::app(AppState::new(config).unwrap())
}

/// Mock an Ollama server whose every generation returns `text`.
async fn ollama_replying(text: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": text,
            "prompt_eval_count": 10,
            "eval_count": 5
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "models": [] })))
        .mount(&server)
        .await;
    server
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn send_json(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, req).await;
    let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, value)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn upload_request(filename: &str, data: &[u8], session_id: Option<&str>) -> Request<Body> {
    let mut body = Vec::new();
    if let Some(id) = session_id {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"session_id\"\r\n\r\n{id}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

// ─── Service endpoints ───────────────────────────────────

#[tokio::test]
async fn test_root_and_health() {
    let server = ollama_replying("hi").await;
    let app = test_app(test_config(&server.uri()));

    let (status, root) = send_json(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(root["status"], "running");
    assert_eq!(root["llm"], "Ollama");
    assert_eq!(root["endpoints"]["chat"], "POST /chat");

    let (status, health) = send_json(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["llm_provider"], "Ollama");
    assert_eq!(health["llm_connected"], true);
}

#[tokio::test]
async fn test_health_reports_unreachable_llm() {
    let app = test_app(test_config(UNREACHABLE));
    let (status, health) = send_json(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["llm_connected"], false);
}

#[tokio::test]
async fn test_metrics_and_traces() {
    let server = ollama_replying("hi").await;
    let app = test_app(test_config(&server.uri()));

    send(&app, get("/")).await;
    send(&app, post_json("/chat", json!({ "message": "" }))).await;

    let (_, summary) = send_json(&app, get("/metrics/summary")).await;
    assert_eq!(summary["total_api_calls"], 2);
    assert_eq!(summary["total_errors"], 1);

    let (_, metrics) = send_json(&app, get("/metrics")).await;
    assert_eq!(metrics["api_calls"]["/"]["success"], 1);
    assert_eq!(metrics["api_calls"]["/chat"]["errors"], 1);
    assert!(metrics["errors"]["/chat_client_error"].is_number());

    // The /traces request itself is in flight while it is answered
    let (_, traces) = send_json(&app, get("/traces")).await;
    assert_eq!(traces["count"], 1);
    assert!(traces["traces"][0].as_str().unwrap().contains("GET /traces"));
}

#[tokio::test]
async fn test_cancelled_requests_leave_no_traces() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "response": "slow" }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;
    let app = test_app(test_config(&server.uri()));

    for _ in 0..3 {
        let req = post_json("/chat", json!({ "message": "Tell me about Lisbon" }));
        let result = tokio::time::timeout(Duration::from_millis(100), app.clone().oneshot(req)).await;
        assert!(result.is_err());
    }

    let (_, traces) = send_json(&app, get("/traces")).await;
    assert_eq!(traces["count"], 1);

    let (_, metrics) = send_json(&app, get("/metrics")).await;
    assert_eq!(metrics["errors"]["/chat_cancelled"], 3);
    assert_eq!(metrics["api_calls"]["/chat"]["errors"], 3);
}

// ─── Chat ────────────────────────────────────────────────

#[tokio::test]
async fn test_chat_validation() {
    let app = test_app(test_config(UNREACHABLE));

    let (status, _) = send(&app, post_json("/chat", json!({ "message": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let long = "a".repeat(2001);
    let (status, body) = send(&app, post_json("/chat", json!({ "message": long }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(String::from_utf8(body).unwrap().contains("2000"));
}

#[tokio::test]
async fn test_chat_keeps_session_history() {
    let server = ollama_replying("Spring is lovely for cherry blossoms.").await;
    let app = test_app(test_config(&server.uri()));

    let (status, first) =
        send_json(&app, post_json("/chat", json!({ "message": "Hello there" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["message"], "Spring is lovely for cherry blossoms.");
    assert!(first["sources"].is_null());
    assert!(first["tool_calls"].is_null());
    let session_id = first["session_id"].as_str().unwrap().to_string();

    let (_, second) = send_json(
        &app,
        post_json(
            "/chat",
            json!({ "message": "Anything else?", "session_id": session_id }),
        ),
    )
    .await;
    assert_eq!(second["session_id"], session_id.as_str());

    let (_, info) = send_json(&app, get(&format!("/session/{session_id}"))).await;
    assert_eq!(info["session_id"], session_id.as_str());
    assert_eq!(info["exists"], true);
    assert_eq!(info["turns"], 4);
    assert_eq!(info["count"], 0);
}

#[tokio::test]
async fn test_chat_falls_back_when_llm_is_down() {
    let app = test_app(test_config(UNREACHABLE));

    let (status, resp) = send_json(&app, post_json("/chat", json!({ "message": "Hi" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["message"], FALLBACK_RESPONSE);
}

#[tokio::test]
async fn test_chat_looks_up_places_for_known_city() {
    let places = r#"{"places": [{"name": "Tsukiji Outer Market", "description": "Seafood stalls", "price": "$$", "cuisine": "Japanese"}]}"#;
    let server = ollama_replying(places).await;
    let app = test_app(test_config(&server.uri()));

    let (status, resp) = send_json(
        &app,
        post_json("/chat", json!({ "message": "Where should I eat in Tokyo?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["tool_calls"], json!(["restaurants_search"]));
    assert_eq!(resp["sources"][0]["type"], "llm_search");
    assert_eq!(resp["sources"][0]["query"], "Restaurants in Tokyo");
}

#[tokio::test]
async fn test_chat_looks_up_travel_tips() {
    let server = ollama_replying("Carry a Suica card and some cash.").await;
    let app = test_app(test_config(&server.uri()));

    let (status, resp) = send_json(
        &app,
        post_json("/chat", json!({ "message": "Any advice for Tokyo?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resp["tool_calls"], json!(["tips_search"]));
    assert_eq!(resp["sources"][0]["query"], "Travel tips for Tokyo");
}

// ─── Documents ───────────────────────────────────────────

#[tokio::test]
async fn test_upload_then_chat_uses_document() {
    let server = ollama_replying("Japan offers visa on arrival.").await;
    let app = test_app(test_config(&server.uri()));

    let (status, upload) = send_json(
        &app,
        upload_request("visa.txt", VISA_TEXT.as_bytes(), Some("trip-1")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(upload["filename"], "visa.txt");
    assert_eq!(upload["status"], "success");
    assert_eq!(upload["session_id"], "trip-1");
    assert_eq!(upload["chunks"], 1);
    assert_eq!(upload["pages"], 0);

    let (_, info) = send_json(&app, get("/session/trip-1")).await;
    assert_eq!(info["count"], 1);
    assert_eq!(info["documents"][0]["filename"], "visa.txt");

    let (status, chat) = send_json(
        &app,
        post_json(
            "/chat",
            json!({ "message": "Which visa do I need?", "session_id": "trip-1" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(chat["message"], "Japan offers visa on arrival.");
    assert_eq!(chat["tool_calls"], json!(["rag_search"]));
    assert_eq!(chat["sources"][0]["type"], "document");
    assert_eq!(chat["sources"][0]["filename"], "visa.txt");
    assert!(chat["sources"][0]["content"]
        .as_str()
        .unwrap()
        .starts_with("Visa rules for Japan"));
}

#[tokio::test]
async fn test_upload_without_session_creates_one() {
    let app = test_app(test_config(UNREACHABLE));
    let (status, upload) =
        send_json(&app, upload_request("notes.txt", VISA_TEXT.as_bytes(), None)).await;
    assert_eq!(status, StatusCode::OK);
    let session_id = upload["session_id"].as_str().unwrap();
    assert!(!session_id.is_empty());
    assert!(upload["message"].as_str().unwrap().contains(session_id));
}

#[tokio::test]
async fn test_upload_rejects_unsupported_type() {
    let app = test_app(test_config(UNREACHABLE));
    let (status, body) = send(&app, upload_request("photo.png", b"\x89PNG", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(String::from_utf8(body)
        .unwrap()
        .contains("Unsupported file type: png"));
}

#[tokio::test]
async fn test_upload_rejects_oversized_file() {
    let mut config = test_config(UNREACHABLE);
    config.max_upload_size_mb = 0;
    let app = test_app(config);

    let (status, body) = send(&app, upload_request("big.txt", VISA_TEXT.as_bytes(), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(String::from_utf8(body).unwrap().contains("File too large"));
}

#[tokio::test]
async fn test_upload_rejects_corrupt_pdf() {
    let app = test_app(test_config(UNREACHABLE));
    let (status, _) = send(&app, upload_request("broken.pdf", b"not a pdf", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_clear_session() {
    let app = test_app(test_config(UNREACHABLE));
    send(&app, upload_request("visa.txt", VISA_TEXT.as_bytes(), Some("gone"))).await;

    let req = Request::builder()
        .method(Method::DELETE)
        .uri("/session/gone")
        .body(Body::empty())
        .unwrap();
    let (status, cleared) = send_json(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared, json!({ "session_id": "gone", "status": "cleared" }));

    let (_, info) = send_json(&app, get("/session/gone")).await;
    assert_eq!(info["exists"], false);
    assert_eq!(info["count"], 0);
}

// ─── Planning ────────────────────────────────────────────

#[tokio::test]
async fn test_plan_validation() {
    let app = test_app(test_config(UNREACHABLE));

    let bad = [
        json!({ "destination": "P", "duration_days": 3, "budget": 500 }),
        json!({ "destination": "Paris", "duration_days": 0, "budget": 500 }),
        json!({ "destination": "Paris", "duration_days": 31, "budget": 500 }),
        json!({ "destination": "Paris", "duration_days": 3, "budget": 0 }),
    ];
    for body in bad {
        let (status, _) = send(&app, post_json("/plan", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_plan_falls_back_when_llm_is_down() {
    let app = test_app(test_config(UNREACHABLE));

    let (status, plan) = send_json(
        &app,
        post_json(
            "/plan",
            json!({ "destination": "Paris", "duration_days": 3, "budget": 900, "currency": "EUR" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(plan["destination"], "Paris");
    assert_eq!(plan["duration"], 3);
    assert_eq!(plan["map_link"], "https://www.google.com/maps/search/Paris");

    let option = &plan["options"][0];
    assert_eq!(plan["options"].as_array().unwrap().len(), 1);
    assert_eq!(option["budget_type"], "balanced");
    assert_eq!(option["currency"], "EUR");
    assert_eq!(option["total_cost"], 900.0);
    assert_eq!(option["days"].as_array().unwrap().len(), 3);
    assert!(option["days"][0]["morning"]
        .as_str()
        .unwrap()
        .contains("Eiffel Tower"));
}

#[tokio::test]
async fn test_plan_uses_model_itinerary() {
    let itinerary = json!({
        "days": [
            {
                "day": 1,
                "morning": "9 AM: Visit Tanah Lot Temple",
                "afternoon": "2 PM: Explore Ubud Monkey Forest",
                "evening": "7 PM: Dinner at Locavore",
                "meals": { "breakfast": "Cafe", "lunch": "Warung", "dinner": "Locavore" },
                "estimated_cost": 180.0
            },
            {
                "day": 2,
                "morning": "Sunrise trek on Mount Batur",
                "afternoon": "Tirta Empul Temple",
                "evening": "Seminyak Beach sunset",
                "meals": {},
                "estimated_cost": 150.0
            }
        ],
        "accommodation_suggestions": ["Alaya Resort Ubud"],
        "packing_list": ["Sunscreen"],
        "tips": ["Carry cash"]
    });
    let server = ollama_replying(&format!("```json\n{itinerary}\n```")).await;
    let app = test_app(test_config(&server.uri()));

    let (status, plan) = send_json(
        &app,
        post_json(
            "/plan",
            json!({ "destination": "North Bali", "duration_days": 2, "budget": 400 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(plan["map_link"], "https://www.google.com/maps/search/North+Bali");

    let option = &plan["options"][0];
    assert_eq!(option["title"], "Best Trip to North Bali");
    assert_eq!(option["currency"], "USD");
    assert_eq!(option["total_cost"], 330.0);
    assert_eq!(option["accommodation_suggestions"], json!(["Alaya Resort Ubud"]));
    assert_eq!(option["days"][1]["evening"], "Seminyak Beach sunset");
}
