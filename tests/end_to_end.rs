use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;

use trend_radar::config::{parse_windows, Config};
use trend_radar::enhancer::SignalEnhancer;
use trend_radar::error::AppError;
use trend_radar::state::{KeywordActivity, SnapshotStore};
use trend_radar::types::{DetectionEvent, EnhancedSignal, RawSignal};
use trend_radar::{OpportunityEngine, Pipeline};

const INVENTORY_POSTS: [&str; 5] = [
    "Desperately need inventory-automation for our warehouse, spreadsheets are killing us",
    "Would pay monthly for inventory-automation that syncs Shopify stock levels",
    "Built an open source inventory-automation prototype, feedback welcome",
    "Small retailers struggle without inventory-automation during holiday rush",
    "Looking for inventory-automation recommendations covering multiple suppliers",
];

fn raw(content: &str, source: &str, engagement: f64, seconds_ago: i64) -> RawSignal {
    RawSignal {
        content: content.to_string(),
        source: source.to_string(),
        timestamp: Utc::now() - chrono::Duration::seconds(seconds_ago),
        engagement_score: engagement,
        credibility_weight: 0.8,
    }
}

fn test_config(windows: &str) -> Config {
    let mut cfg = Config::default();
    cfg.windows = parse_windows(windows).unwrap();
    cfg.snapshot_interval = Duration::from_millis(10);
    cfg.pattern.interval = Duration::from_millis(50);
    cfg.anomaly.interval = Duration::from_millis(50);
    cfg
}

fn enhance_all(raws: Vec<RawSignal>) -> Vec<Arc<EnhancedSignal>> {
    let enhancer = SignalEnhancer::new(
        Config::default().enhancer(),
        Arc::new(KeywordActivity::new(chrono::Duration::hours(1))),
    );
    raws.into_iter().map(|r| Arc::new(enhancer.enhance(r))).collect()
}

fn offline_engine() -> Arc<OpportunityEngine> {
    OpportunityEngine::from_config(&Config::default(), SnapshotStore::new(Vec::new()))
}

async fn wait_for<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

async fn collect_events(rx: &mut mpsc::Receiver<DetectionEvent>, settle: Duration) -> Vec<DetectionEvent> {
    let mut events = Vec::new();
    while let Ok(Some(event)) = tokio::time::timeout(settle, rx.recv()).await {
        events.push(event);
    }
    events
}

// ---------------------------------------------------------------------------
// Scenario 1 & 2: correlation across sources
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cross_source_topic_becomes_one_opportunity() {
    let cfg = test_config("1m,5m,30m,1h,6h");
    let pipeline = Pipeline::start(&cfg).unwrap();
    let sender = pipeline.sender();

    let sources = ["reddit", "hackernews", "github", "reddit", "hackernews"];
    let engagements = [80.0, 85.0, 90.0, 95.0, 100.0];
    for (i, content) in INVENTORY_POSTS.iter().enumerate() {
        sender.submit(raw(content, sources[i], engagements[i], 10 - i as i64)).await.unwrap();
    }

    let store = pipeline.store();
    wait_for(|| store.all_signals().len() == 5).await;

    let engine = OpportunityEngine::from_config(&cfg, pipeline.store());
    let opportunities = engine.detect();
    assert_eq!(opportunities.len(), 1, "{opportunities:#?}");
    let top = &opportunities[0];
    assert_eq!(top.keyword, "inventory-automation");
    assert_eq!(top.title, "Inventory Automation");
    assert_eq!(top.signal_count, 5);
    assert_eq!(top.sources.len(), 3);

    let single_source = enhance_all(
        INVENTORY_POSTS
            .iter()
            .zip(engagements)
            .enumerate()
            .map(|(i, (c, e))| raw(c, "reddit", e, 10 - i as i64))
            .collect(),
    );
    let baseline = offline_engine().detect_from(&single_source);
    assert_eq!(baseline.len(), 1);
    assert!(top.confidence_level > baseline[0].confidence_level);

    assert_eq!(pipeline.health().processed(), 5);
    pipeline.shutdown().await;
}

#[test]
fn four_single_source_signals_stay_below_threshold() {
    let signals = enhance_all(
        INVENTORY_POSTS[..4]
            .iter()
            .enumerate()
            .map(|(i, c)| raw(c, "reddit", 90.0, i as i64))
            .collect(),
    );
    assert!(offline_engine().detect_from(&signals).is_empty());
}

#[test]
fn empty_signal_set_gives_empty_list() {
    assert!(offline_engine().detect_from(&[]).is_empty());
    assert!(offline_engine().detect().is_empty());
}

#[test]
fn repeated_runs_are_identical() {
    let sources = ["reddit", "hackernews", "github"];
    let mut raws: Vec<RawSignal> = INVENTORY_POSTS
        .iter()
        .enumerate()
        .map(|(i, c)| raw(c, sources[i % 3], 50.0 + i as f64, i as i64))
        .collect();
    for i in 0..6 {
        raws.push(raw(
            &format!("Recommend an alternative to legacy payroll-software number {i}"),
            sources[i % 3],
            20.0 * i as f64,
            30 + i as i64,
        ));
    }
    let signals = enhance_all(raws);
    let engine = offline_engine();

    let first = engine.detect_from(&signals);
    let second = engine.detect_from(&signals);
    let mut reversed = signals.clone();
    reversed.reverse();
    let third = engine.detect_from(&reversed);

    assert!(!first.is_empty());
    assert_eq!(first, second);
    assert_eq!(first, third);
}

// ---------------------------------------------------------------------------
// Scenario 3 & 4: detectors over a live window
// ---------------------------------------------------------------------------

#[tokio::test]
async fn single_spike_is_flagged_once() {
    let mut pipeline = Pipeline::start(&test_config("5m")).unwrap();
    let mut events = pipeline.take_events().unwrap();
    let sender = pipeline.sender();

    let values = [10.0, 10.0, 11.0, 9.0, 10.0, 10.0, 9.0, 11.0, 10.0, 95.0];
    for (i, v) in values.iter().enumerate() {
        sender.submit(raw(&format!("update number {i}"), "reddit", *v, 20 - i as i64)).await.unwrap();
    }
    let store = pipeline.store();
    wait_for(|| store.get("5m").is_some_and(|s| s.len() == 10)).await;

    let collected = collect_events(&mut events, Duration::from_millis(400)).await;
    let anomalies: Vec<_> = collected
        .iter()
        .filter_map(|e| match e {
            DetectionEvent::Anomaly(a) => Some(a),
            _ => None,
        })
        .collect();
    assert_eq!(anomalies.len(), 1, "{collected:#?}");
    assert_eq!(anomalies[0].engagement, 95.0);
    assert_eq!(anomalies[0].window_id, "5m");

    pipeline.shutdown().await;
}

#[tokio::test]
async fn burst_fires_rapid_growth() {
    let mut pipeline = Pipeline::start(&test_config("5m")).unwrap();
    let mut events = pipeline.take_events().unwrap();
    let sender = pipeline.sender();

    let mut values = vec![10.0; 9];
    values.push(40.0);
    for (i, v) in values.iter().enumerate() {
        sender.submit(raw(&format!("burst number {i}"), "reddit", *v, 20 - i as i64)).await.unwrap();
    }
    let store = pipeline.store();
    wait_for(|| store.get("5m").is_some_and(|s| s.len() == 10)).await;

    let collected = collect_events(&mut events, Duration::from_millis(400)).await;
    let burst = collected
        .iter()
        .find_map(|e| match e {
            DetectionEvent::RapidGrowth(p) => Some(p),
            _ => None,
        })
        .expect("rapid growth event");
    assert_eq!(burst.max_engagement, 40.0);
    assert!((burst.mean_engagement - 13.0).abs() < 1e-9);
    assert_eq!(pipeline.health().patterns(), 1);

    pipeline.shutdown().await;
}

// ---------------------------------------------------------------------------
// Backpressure, error taxonomy, shutdown
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_queue_rejects_instead_of_growing() {
    let mut cfg = test_config("1m");
    cfg.queue_capacity = 1;
    let pipeline = Pipeline::start(&cfg).unwrap();
    let sender = pipeline.sender();

    let total = 200;
    let mut accepted = 0;
    let mut rejected = 0;
    for i in 0..total {
        match sender.try_submit(raw(&format!("flood {i}"), "reddit", 1.0, 0)) {
            Ok(()) => accepted += 1,
            Err(AppError::QueueFull(_)) => rejected += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(accepted + rejected, total);
    assert!(rejected > 0);
    assert!(sender.queue_depth() <= 1);

    let health = pipeline.health();
    assert_eq!(health.dropped(), rejected as u64);
    let discarded = pipeline.shutdown().await;
    assert_eq!(health.processed() + health.skipped() + discarded, accepted as u64);
}

#[tokio::test]
async fn malformed_and_unscorable_signals_are_contained() {
    let pipeline = Pipeline::start(&test_config("5m")).unwrap();
    let sender = pipeline.sender();

    sender.submit(raw("   ", "reddit", 1.0, 0)).await.unwrap();
    sender.submit(raw("?!?! ...", "reddit", 1.0, 0)).await.unwrap();
    sender.submit(raw("looking for a scheduling tool", "reddit", 5.0, 0)).await.unwrap();

    let health = pipeline.health();
    wait_for(|| health.processed() + health.skipped() == 3).await;
    assert_eq!(health.skipped(), 1);
    assert_eq!(health.degraded(), 1);
    assert_eq!(health.processed(), 2);

    pipeline.shutdown().await;
}

#[tokio::test]
async fn stopped_pipeline_rejects_new_signals() {
    let pipeline = Pipeline::start(&test_config("1m")).unwrap();
    let sender = pipeline.sender();
    let store = pipeline.store();
    pipeline.shutdown().await;

    assert!(store.is_sealed());
    assert!(matches!(sender.try_submit(raw("late", "reddit", 1.0, 0)), Err(AppError::PipelineStopped)));
    assert!(matches!(sender.submit(raw("late", "reddit", 1.0, 0)).await, Err(AppError::PipelineStopped)));
}

#[test]
fn invalid_window_config_is_fatal() {
    let mut cfg = Config::default();
    cfg.windows = Vec::new();
    assert!(matches!(cfg.validate(), Err(AppError::Config(_))));
    assert!(parse_windows("0m").is_err());
    assert!(parse_windows("-5m").is_err());
}
