use lazy_static::lazy_static;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Cycle metrics
    pub static ref REFRESH_CYCLES: IntCounter = IntCounter::new(
        "refresh_cycles_total",
        "Total number of completed refresh cycles"
    ).unwrap();

    pub static ref REFRESH_CYCLE_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "refresh_cycle_duration_seconds",
            "Wall time of one refresh cycle"
        ).buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0])
    ).unwrap();

    // Task metrics
    pub static ref REFRESH_TASK_OUTCOMES: IntCounterVec = IntCounterVec::new(
        Opts::new("refresh_task_outcomes_total", "Refresh task results by cache key"),
        &["key", "outcome"]
    ).unwrap();

    pub static ref RECORDS_PUBLISHED: IntCounterVec = IntCounterVec::new(
        Opts::new("records_published_total", "Records written to the cache by key"),
        &["key"]
    ).unwrap();

    // Enrichment metrics
    pub static ref NODES_ENRICHED: IntCounter = IntCounter::new(
        "nodes_enriched_total",
        "Nodes that completed the enrichment pipeline"
    ).unwrap();

    pub static ref NODES_DISCARDED: IntCounterVec = IntCounterVec::new(
        Opts::new("nodes_discarded_total", "Nodes dropped by the enrichment pipeline"),
        &["step"]
    ).unwrap();

    // Auth metrics
    pub static ref TOKEN_ATTEMPTS: IntCounter = IntCounter::new(
        "token_attempts_total",
        "Token issuance attempts including retries"
    ).unwrap();
}

pub fn register_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(REFRESH_CYCLES.clone()),
        Box::new(REFRESH_CYCLE_DURATION.clone()),
        Box::new(REFRESH_TASK_OUTCOMES.clone()),
        Box::new(RECORDS_PUBLISHED.clone()),
        Box::new(NODES_ENRICHED.clone()),
        Box::new(NODES_DISCARDED.clone()),
        Box::new(TOKEN_ATTEMPTS.clone()),
    ];

    for collector in collectors {
        if let Err(e) = REGISTRY.register(collector) {
            tracing::warn!(error = %e, "metric registration skipped");
        }
    }
}
