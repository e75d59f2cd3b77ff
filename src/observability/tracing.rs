use tracing::Span;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;
use crate::config::LogFormat;
use crate::types::cache_key::CacheKey;

/// Installs the global subscriber. `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let result = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    };

    if let Err(e) = result {
        eprintln!("tracing subscriber already installed: {}", e);
    }
}

pub fn trace_refresh_cycle(cycle_id: Uuid) -> Span {
    tracing::info_span!(
        "refresh_cycle",
        cycle_id = %cycle_id,
    )
}

pub fn trace_refresh_task(key: CacheKey) -> Span {
    tracing::info_span!(
        "refresh_task",
        key = %key,
    )
}
