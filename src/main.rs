use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use trend_radar::api::routes::{router, ApiState};
use trend_radar::config::{Config, RECENT_EVENTS_CAPACITY};
use trend_radar::engine::OpportunityEngine;
use trend_radar::error::Result;
use trend_radar::pipeline::Pipeline;
use trend_radar::state::RecentEvents;
use trend_radar::types::{AnomalyEvent, DetectionEvent, PatternEvent};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let windows: Vec<&str> = cfg.windows.iter().map(|w| w.id.as_str()).collect();
    info!(
        "Starting trend radar: windows [{}] | queue {} | min cluster {} | top {}",
        windows.join(", "),
        cfg.queue_capacity,
        cfg.correlation.min_cluster_size,
        cfg.ranking.top_n,
    );

    // --- Pipeline: queue, consumer, detectors, stats ---
    let mut pipeline = Pipeline::start(&cfg)?;

    // --- Detection event consumer ---
    let recent = Arc::new(RecentEvents::new(RECENT_EVENTS_CAPACITY));
    match pipeline.take_events() {
        Some(rx) => {
            let recent = Arc::clone(&recent);
            tokio::spawn(async move { event_consumer(rx, recent).await });
        }
        None => warn!("Detection events already taken; not logging them"),
    }

    // --- Correlation cycle (background, every CORRELATION_INTERVAL_SECS) ---
    let engine = OpportunityEngine::from_config(&cfg, pipeline.store());
    let cycle = Arc::clone(&engine);
    let cycle_shutdown = pipeline.shutdown_signal();
    let period = cfg.correlation.interval;
    let cycle_task = tokio::spawn(async move { cycle.run(period, cycle_shutdown).await });

    // --- HTTP API server ---
    let api_state = ApiState {
        sender: pipeline.sender(),
        store: pipeline.store(),
        engine,
        health: pipeline.health(),
        latency: pipeline.latency(),
        recent,
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("Shutdown requested, stopping pipeline");
    let discarded = pipeline.shutdown().await;
    if let Err(e) = cycle_task.await {
        warn!("Correlation cycle ended abnormally: {e}");
    }
    info!(discarded, "Stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl-c: {e}");
    }
}

/// Consumes DetectionEvents: logs to console and keeps the recent ring for the API.
async fn event_consumer(mut rx: mpsc::Receiver<DetectionEvent>, recent: Arc<RecentEvents>) {
    while let Some(event) = rx.recv().await {
        match &event {
            DetectionEvent::RapidGrowth(p) => log_rapid_growth(p),
            DetectionEvent::Anomaly(a) => log_anomaly(a),
        }
        recent.push(event);
    }
}

fn log_rapid_growth(p: &PatternEvent) {
    info!(
        event = "RAPID_GROWTH",
        window = %p.window_id,
        max = p.max_engagement,
        mean = p.mean_engagement,
        "RAPID GROWTH | window: {} | max: {:.1} | mean: {:.1} | ratio: {:.2}x",
        p.window_id, p.max_engagement, p.mean_engagement, p.ratio,
    );
}

fn log_anomaly(a: &AnomalyEvent) {
    let z = a
        .z_score
        .map(|z| format!("{z:.1}σ"))
        .unwrap_or_else(|| "flat baseline".to_string());
    info!(
        event = "ANOMALY",
        window = %a.window_id,
        signal_id = a.signal_id,
        engagement = a.engagement,
        "ANOMALY | window: {} | engagement: {:.1} | baseline: {:.1} ± {:.1} | {}",
        a.window_id, a.engagement, a.baseline_mean, a.baseline_std_dev, z,
    );
}
