//! In-process request metrics and active-request traces.
//!
//! Nothing here is exported to an external system; the numbers are served
//! as JSON from `/metrics`, `/metrics/summary` and `/traces`.

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::state::AppState;

const MAX_RESPONSE_TIMES: usize = 100;
const RECENT_RESPONSE_TIMES: usize = 10;

#[derive(Debug, Clone, Default, Serialize)]
pub struct EndpointStats {
    pub count: u64,
    pub total_duration: f64,
    pub success: u64,
    pub errors: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LlmStats {
    pub count: u64,
    pub total_tokens: u64,
    pub total_duration: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseTime {
    pub endpoint: String,
    pub duration: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_seconds: f64,
    pub api_calls: BTreeMap<String, EndpointStats>,
    pub llm_calls: BTreeMap<String, LlmStats>,
    pub errors: BTreeMap<String, u64>,
    pub average_response_times: BTreeMap<String, f64>,
    pub recent_response_times: Vec<ResponseTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub total_api_calls: u64,
    pub total_errors: u64,
    pub total_llm_calls: u64,
    pub total_tokens_used: u64,
    pub uptime_seconds: f64,
}

#[derive(Default)]
struct MetricsInner {
    api_calls: BTreeMap<String, EndpointStats>,
    llm_calls: BTreeMap<String, LlmStats>,
    errors: BTreeMap<String, u64>,
    response_times: VecDeque<ResponseTime>,
}

pub struct Metrics {
    inner: RwLock<MetricsInner>,
    started_at: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MetricsInner::default()),
            started_at: Instant::now(),
        }
    }

    pub fn record_api_call(&self, endpoint: &str, duration: Duration, success: bool) {
        let mut inner = self.inner.write();
        let stats = inner.api_calls.entry(endpoint.to_string()).or_default();
        stats.count += 1;
        stats.total_duration += duration.as_secs_f64();
        if success {
            stats.success += 1;
        } else {
            stats.errors += 1;
        }

        inner.response_times.push_back(ResponseTime {
            endpoint: endpoint.to_string(),
            duration: duration.as_secs_f64(),
            timestamp: Utc::now(),
        });
        while inner.response_times.len() > MAX_RESPONSE_TIMES {
            inner.response_times.pop_front();
        }
    }

    pub fn record_llm_call(&self, model: &str, tokens: u64, duration: Duration) {
        let mut inner = self.inner.write();
        let stats = inner.llm_calls.entry(model.to_string()).or_default();
        stats.count += 1;
        stats.total_tokens += tokens;
        stats.total_duration += duration.as_secs_f64();
    }

    pub fn record_error(&self, kind: &str, endpoint: &str) {
        let mut inner = self.inner.write();
        *inner.errors.entry(format!("{endpoint}_{kind}")).or_insert(0) += 1;
    }

    fn uptime_seconds(&self) -> f64 {
        round_to(self.started_at.elapsed().as_secs_f64(), 2)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.read();

        let average_response_times = inner
            .api_calls
            .iter()
            .filter(|(_, s)| s.count > 0)
            .map(|(k, s)| (k.clone(), round_to(s.total_duration / s.count as f64, 3)))
            .collect();

        let skip = inner.response_times.len().saturating_sub(RECENT_RESPONSE_TIMES);
        MetricsSnapshot {
            uptime_seconds: self.uptime_seconds(),
            api_calls: inner.api_calls.clone(),
            llm_calls: inner.llm_calls.clone(),
            errors: inner.errors.clone(),
            average_response_times,
            recent_response_times: inner.response_times.iter().skip(skip).cloned().collect(),
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        let inner = self.inner.read();
        MetricsSummary {
            total_api_calls: inner.api_calls.values().map(|s| s.count).sum(),
            total_errors: inner.errors.values().sum(),
            total_llm_calls: inner.llm_calls.values().map(|s| s.count).sum(),
            total_tokens_used: inner.llm_calls.values().map(|s| s.total_tokens).sum(),
            uptime_seconds: self.uptime_seconds(),
        }
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

// ─── Request traces ──────────────────────────────────────

struct ActiveTrace {
    operation: String,
    started_at: Instant,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActiveTraces {
    pub count: usize,
    pub traces: Vec<String>,
}

/// Tracks requests that are currently in flight.
#[derive(Default)]
pub struct Tracer {
    active: RwLock<HashMap<Uuid, ActiveTrace>>,
}

impl Tracer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, operation: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.active.write().insert(
            id,
            ActiveTrace {
                operation: operation.to_string(),
                started_at: Instant::now(),
            },
        );
        id
    }

    /// Finish a trace, returning how long it was active.
    pub fn end(&self, id: Uuid) -> Option<Duration> {
        self.active.write().remove(&id).map(|t| t.started_at.elapsed())
    }

    pub fn active(&self) -> ActiveTraces {
        let active = self.active.read();
        ActiveTraces {
            count: active.len(),
            traces: active
                .iter()
                .map(|(id, t)| format!("{id} {}", t.operation))
                .collect(),
        }
    }
}

/// An in-flight request. Dropping it before [`InFlight::finish`] means the
/// client went away and the handler future was cancelled.
pub struct InFlight {
    tracer: Arc<Tracer>,
    metrics: Arc<Metrics>,
    trace_id: Uuid,
    endpoint: String,
    operation: String,
    start: Instant,
    finished: bool,
}

impl InFlight {
    pub fn start(tracer: Arc<Tracer>, metrics: Arc<Metrics>, endpoint: String, operation: String) -> Self {
        let trace_id = tracer.start(&operation);
        tracing::debug!(%trace_id, "Starting {operation}");
        Self {
            tracer,
            metrics,
            trace_id,
            endpoint,
            operation,
            start: Instant::now(),
            finished: false,
        }
    }

    /// Close the trace and return the request duration.
    pub fn finish(mut self) -> Duration {
        self.finished = true;
        self.tracer.end(self.trace_id);
        self.start.elapsed()
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.tracer.end(self.trace_id);
        let duration = self.start.elapsed();
        self.metrics.record_error("cancelled", &self.endpoint);
        self.metrics.record_api_call(&self.endpoint, duration, false);
        tracing::warn!(
            trace_id = %self.trace_id,
            "Cancelled {} after {:.3}s",
            self.operation,
            duration.as_secs_f64()
        );
    }
}

/// Middleware: trace, time and count every routed request.
pub async fn track_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let operation = format!("{} {}", req.method(), endpoint);

    let in_flight = InFlight::start(
        state.tracer.clone(),
        state.metrics.clone(),
        endpoint.clone(),
        operation.clone(),
    );
    let trace_id = in_flight.trace_id;

    let response = next.run(req).await;
    let duration = in_flight.finish();

    let status = response.status();
    let success = !(status.is_client_error() || status.is_server_error());
    if status.is_server_error() {
        state.metrics.record_error("server_error", &endpoint);
        tracing::error!(%trace_id, "Error in {operation}: {status} after {:.3}s", duration.as_secs_f64());
    } else if status.is_client_error() {
        state.metrics.record_error("client_error", &endpoint);
        tracing::warn!(%trace_id, "Rejected {operation}: {status}");
    } else {
        tracing::debug!(%trace_id, "Completed {operation} in {:.3}s", duration.as_secs_f64());
    }
    state.metrics.record_api_call(&endpoint, duration, success);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_call_accounting() {
        let metrics = Metrics::new();
        metrics.record_api_call("/chat", Duration::from_millis(200), true);
        metrics.record_api_call("/chat", Duration::from_millis(400), false);

        let snap = metrics.snapshot();
        let chat = &snap.api_calls["/chat"];
        assert_eq!(chat.count, 2);
        assert_eq!(chat.success, 1);
        assert_eq!(chat.errors, 1);
        assert!((snap.average_response_times["/chat"] - 0.3).abs() < 1e-9);
        assert_eq!(snap.recent_response_times.len(), 2);
    }

    #[test]
    fn test_response_times_are_bounded() {
        let metrics = Metrics::new();
        for _ in 0..150 {
            metrics.record_api_call("/health", Duration::from_millis(1), true);
        }
        assert_eq!(metrics.inner.read().response_times.len(), MAX_RESPONSE_TIMES);
        assert_eq!(metrics.snapshot().recent_response_times.len(), RECENT_RESPONSE_TIMES);
    }

    #[test]
    fn test_summary_totals() {
        let metrics = Metrics::new();
        metrics.record_api_call("/plan", Duration::from_millis(5), true);
        metrics.record_llm_call("llama3:8b", 120, Duration::from_millis(50));
        metrics.record_llm_call("llama3:8b", 80, Duration::from_millis(50));
        metrics.record_error("server_error", "/plan");

        let summary = metrics.summary();
        assert_eq!(summary.total_api_calls, 1);
        assert_eq!(summary.total_llm_calls, 2);
        assert_eq!(summary.total_tokens_used, 200);
        assert_eq!(summary.total_errors, 1);
        assert!(metrics.snapshot().errors.contains_key("/plan_server_error"));
    }

    #[test]
    fn test_tracer_lifecycle() {
        let tracer = Tracer::new();
        let id = tracer.start("POST /chat");
        let active = tracer.active();
        assert_eq!(active.count, 1);
        assert!(active.traces[0].contains("POST /chat"));

        assert!(tracer.end(id).is_some());
        assert!(tracer.end(id).is_none());
        assert_eq!(tracer.active().count, 0);
    }

    #[test]
    fn test_finished_request_is_not_cancelled() {
        let tracer = Arc::new(Tracer::new());
        let metrics = Arc::new(Metrics::new());
        let in_flight = InFlight::start(tracer.clone(), metrics.clone(), "/plan".into(), "POST /plan".into());
        assert_eq!(tracer.active().count, 1);

        in_flight.finish();
        assert_eq!(tracer.active().count, 0);
        assert!(metrics.snapshot().errors.is_empty());
    }

    #[test]
    fn test_dropped_request_is_counted_as_cancelled() {
        let tracer = Arc::new(Tracer::new());
        let metrics = Arc::new(Metrics::new());
        let in_flight = InFlight::start(tracer.clone(), metrics.clone(), "/chat".into(), "POST /chat".into());
        drop(in_flight);

        assert_eq!(tracer.active().count, 0);
        let snap = metrics.snapshot();
        assert_eq!(snap.errors["/chat_cancelled"], 1);
        assert_eq!(snap.api_calls["/chat"].errors, 1);
    }
}
