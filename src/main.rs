use std::sync::Arc;
use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::info;
use ultron_attendant::bootstrap::build_orchestrator;
use ultron_attendant::cache::memory::InMemoryCache;
use ultron_attendant::config::loader::AppConfig;
use ultron_attendant::observability::metrics::register_metrics;
use ultron_attendant::observability::tracing::init_tracing;
use ultron_attendant::utils::shutdown::wait_for_signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = std::env::var("APP_ENV").unwrap_or_else(|_| "production".to_string());
    let config = AppConfig::load(&env).context("failed to load configuration")?;

    init_tracing(config.logging.format);
    register_metrics();

    info!(env = %env, interval_secs = config.refresh_interval().as_secs(), "starting ultron attendant");

    let cancel = CancellationToken::new();
    let cache = Arc::new(InMemoryCache::new());
    let mut orchestrator = build_orchestrator(&config, cache, cancel.clone())
        .context("failed to construct refresh orchestrator")?;

    let signals = tokio::spawn(wait_for_signal(cancel.clone()));

    orchestrator.run().await.context("refresh orchestrator failed")?;

    signals.abort();
    info!("ultron attendant stopped");
    Ok(())
}
