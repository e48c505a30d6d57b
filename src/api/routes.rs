use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::health::{HealthSnapshot, HealthState};
use crate::api::latency::{LatencyStats, LatencySummary};
use crate::engine::OpportunityEngine;
use crate::error::{AppError, Result};
use crate::pipeline::SignalSender;
use crate::state::{RecentEvents, SnapshotStore};
use crate::types::{DetectionEvent, Opportunity, RawSignal};
use crate::window::WindowStats;

#[derive(Clone)]
pub struct ApiState {
    pub sender: SignalSender,
    pub store: Arc<SnapshotStore>,
    pub engine: Arc<OpportunityEngine>,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
    pub recent: Arc<RecentEvents>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/signals", post(post_signals))
        .route("/opportunities", get(get_opportunities))
        .route("/windows", get(get_windows))
        .route("/events/recent", get(get_recent_events))
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / query types
// ---------------------------------------------------------------------------

/// `POST /signals` takes one signal or an array of them.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum SignalPayload {
    Batch(Vec<RawSignal>),
    Single(RawSignal),
}

impl SignalPayload {
    /// Decodes a request body; bad JSON surfaces as `AppError::Json` (400).
    pub fn from_slice(body: &[u8]) -> Result<Vec<RawSignal>> {
        Ok(match serde_json::from_slice::<Self>(body)? {
            SignalPayload::Batch(v) => v,
            SignalPayload::Single(s) => vec![s],
        })
    }
}

#[derive(Deserialize)]
pub struct OpportunitiesQuery {
    pub limit: Option<usize>,
    /// Run a correlation pass now instead of returning the last cycle's output.
    pub fresh: Option<bool>,
}

#[derive(Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct SubmitResponse {
    pub accepted: usize,
    pub rejected: usize,
}

#[derive(Serialize)]
pub struct WindowResponse {
    pub id: String,
    pub duration_secs: i64,
    pub taken_at: DateTime<Utc>,
    pub stats: WindowStats,
}

#[derive(Serialize)]
pub struct HealthResponse {
    #[serde(flatten)]
    pub counters: HealthSnapshot,
    pub queue_depth: usize,
    pub queue_capacity: usize,
    pub windows_published: usize,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// 202 when at least one signal was queued; the first rejection stops the batch.
async fn post_signals(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<(StatusCode, Json<SubmitResponse>)> {
    let signals = SignalPayload::from_slice(&body)?;
    let total = signals.len();
    let mut accepted = 0;
    for signal in signals {
        match state.sender.submit(signal).await {
            Ok(()) => accepted += 1,
            Err(e) if accepted == 0 => return Err(e),
            Err(_) => break,
        }
    }
    Ok((StatusCode::ACCEPTED, Json(SubmitResponse { accepted, rejected: total - accepted })))
}

async fn get_opportunities(
    State(state): State<ApiState>,
    Query(params): Query<OpportunitiesQuery>,
) -> Result<Json<Vec<Opportunity>>> {
    let mut opportunities = if params.fresh.unwrap_or(false) {
        let engine = Arc::clone(&state.engine);
        tokio::task::spawn_blocking(move || engine.detect())
            .await
            .map_err(|e| AppError::Io(std::io::Error::other(e)))?
    } else {
        state.engine.latest().await
    };
    if let Some(limit) = params.limit {
        opportunities.truncate(limit);
    }
    Ok(Json(opportunities))
}

async fn get_windows(State(state): State<ApiState>) -> Json<Vec<WindowResponse>> {
    let windows = state
        .store
        .all()
        .iter()
        .map(|s| WindowResponse {
            id: s.id.clone(),
            duration_secs: s.duration.num_seconds(),
            taken_at: s.taken_at,
            stats: s.stats.clone(),
        })
        .collect();
    Json(windows)
}

async fn get_recent_events(
    State(state): State<ApiState>,
    Query(params): Query<LimitQuery>,
) -> Json<Vec<DetectionEvent>> {
    Json(state.recent.latest(params.limit.unwrap_or(50)))
}

async fn get_health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        counters: state.health.snapshot(),
        queue_depth: state.sender.queue_depth(),
        queue_capacity: state.sender.queue_capacity(),
        windows_published: state.store.all().len(),
    })
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencySummary> {
    Json(state.latency.summary())
}
