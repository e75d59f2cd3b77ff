use std::any::Any;
use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use futures::FutureExt;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};
use uuid::Uuid;
use crate::error::{Error, Result};
use crate::interfaces::cache_store::CacheStore;
use crate::observability::metrics::{
    RECORDS_PUBLISHED, REFRESH_CYCLES, REFRESH_CYCLE_DURATION, REFRESH_TASK_OUTCOMES,
};
use crate::observability::tracing::{trace_refresh_cycle, trace_refresh_task};
use crate::refresh::CACHE_ENTRY_TTL;
use crate::refresh::tasks::RefreshTask;
use crate::types::cache_key::CacheKey;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    Running,
    Sleeping,
    ShuttingDown,
    Stopped,
}

/// What one cycle did. Keys appear in completion order.
#[derive(Debug)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub refreshed: Vec<CacheKey>,
    pub failed: Vec<(CacheKey, Error)>,
    pub duration: Duration,
}

impl CycleReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Periodic fan-out of refresh tasks, one per cache key.
///
/// Every task of a cycle runs to completion before the cycle ends. A failed
/// task leaves its key untouched and never affects the other keys.
pub struct RefreshOrchestrator {
    cache: Arc<dyn CacheStore>,
    tasks: Vec<Arc<dyn RefreshTask>>,
    interval: Duration,
    cancel: CancellationToken,
    state: OrchestratorState,
}

impl RefreshOrchestrator {
    pub fn new(cache: Arc<dyn CacheStore>, interval: Duration, cancel: CancellationToken) -> Self {
        RefreshOrchestrator {
            cache,
            tasks: Vec::new(),
            interval,
            cancel,
            state: OrchestratorState::Idle,
        }
    }

    pub fn register(&mut self, task: Arc<dyn RefreshTask>) -> Result<&mut Self> {
        let key = task.key();
        if self.tasks.iter().any(|t| t.key() == key) {
            return Err(Error::ConfigError(format!("refresh task for {} registered twice", key)));
        }

        self.tasks.push(task);
        Ok(self)
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn keys(&self) -> Vec<CacheKey> {
        self.tasks.iter().map(|t| t.key()).collect()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs cycles until the cancellation token fires. The sleep between
    /// cycles is interrupted by cancellation; an in-flight cycle drains
    /// its tasks, which observe the same token.
    pub async fn run(&mut self) -> Result<()> {
        if self.tasks.is_empty() {
            return Err(Error::ConfigError("no refresh tasks registered".to_string()));
        }

        info!(
            interval_secs = self.interval.as_secs(),
            keys = ?self.keys(),
            "refresh orchestrator started"
        );

        while !self.cancel.is_cancelled() {
            self.run_cycle().await;

            if self.cancel.is_cancelled() {
                break;
            }

            self.state = OrchestratorState::Sleeping;
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        self.state = OrchestratorState::ShuttingDown;
        info!("refresh orchestrator shutting down");
        self.state = OrchestratorState::Stopped;
        Ok(())
    }

    pub async fn run_cycle(&mut self) -> CycleReport {
        self.state = OrchestratorState::Running;

        let cycle_id = Uuid::new_v4();
        let report = self.fan_out(cycle_id).instrument(trace_refresh_cycle(cycle_id)).await;

        REFRESH_CYCLES.inc();
        REFRESH_CYCLE_DURATION.observe(report.duration.as_secs_f64());

        self.state = OrchestratorState::Idle;
        report
    }

    async fn fan_out(&self, cycle_id: Uuid) -> CycleReport {
        let started = Instant::now();
        let mut report = CycleReport {
            cycle_id,
            refreshed: Vec::new(),
            failed: Vec::new(),
            duration: Duration::ZERO,
        };

        let (ready, deferred) = self.split_cold_dependents().await;
        if !deferred.is_empty() {
            let keys: Vec<CacheKey> = deferred.iter().map(|t| t.key()).collect();
            info!(?keys, "dependencies not cached yet, deferring dependent keys");
        }

        for wave in [ready, deferred] {
            if !wave.is_empty() {
                self.run_wave(wave, &mut report).await;
            }
        }

        for (key, e) in &report.failed {
            if e.is_cancelled() {
                REFRESH_TASK_OUTCOMES.with_label_values(&[key.as_str(), "cancelled"]).inc();
                info!(%key, "refresh task cancelled, cache value unchanged");
            } else {
                REFRESH_TASK_OUTCOMES.with_label_values(&[key.as_str(), "failure"]).inc();
                warn!(%key, error = %e, "refresh task failed, cache value unchanged");
            }
        }

        report.duration = started.elapsed();
        info!(
            refreshed = report.refreshed.len(),
            failed = report.failed.len(),
            elapsed_ms = report.duration.as_millis() as u64,
            "refresh cycle complete"
        );

        report
    }

    /// Splits tasks into those that can run now and those reading a
    /// registered key that has no cached value yet.
    async fn split_cold_dependents(&self) -> (Vec<Arc<dyn RefreshTask>>, Vec<Arc<dyn RefreshTask>>) {
        let registered = self.keys();
        let mut ready = Vec::new();
        let mut deferred = Vec::new();

        for task in &self.tasks {
            let mut cold = false;
            for dependency in task.depends_on() {
                if registered.contains(&dependency)
                    && !matches!(self.cache.get_cache_item(dependency).await, Ok(Some(_)))
                {
                    cold = true;
                    break;
                }
            }

            if cold {
                deferred.push(Arc::clone(task));
            } else {
                ready.push(Arc::clone(task));
            }
        }

        (ready, deferred)
    }

    /// Runs tasks concurrently and drains every result into the report.
    async fn run_wave(&self, tasks: Vec<Arc<dyn RefreshTask>>, report: &mut CycleReport) {
        let mut pending: BTreeSet<CacheKey> = BTreeSet::new();
        let mut set = JoinSet::new();

        for task in tasks {
            let key = task.key();
            let cache = Arc::clone(&self.cache);
            let cancel = self.cancel.clone();

            pending.insert(key);
            set.spawn(
                async move {
                    let outcome = AssertUnwindSafe(refresh_key(task.as_ref(), cache.as_ref(), &cancel))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|panic| Err(Error::TaskJoinError(panic_message(panic))));
                    (key, outcome)
                }
                .instrument(trace_refresh_task(key)),
            );
        }

        let mut lost = None;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((key, outcome)) => {
                    pending.remove(&key);
                    match outcome {
                        Ok(records) => {
                            REFRESH_TASK_OUTCOMES.with_label_values(&[key.as_str(), "success"]).inc();
                            RECORDS_PUBLISHED.with_label_values(&[key.as_str()]).inc_by(records as u64);
                            report.refreshed.push(key);
                        }
                        Err(e) => report.failed.push((key, e)),
                    }
                }
                Err(e) => lost = Some(e.to_string()),
            }
        }

        // Tasks that never reported back were aborted by the runtime.
        if let Some(reason) = lost {
            for key in pending {
                report.failed.push((key, Error::TaskJoinError(reason.clone())));
            }
        }
    }
}

/// Fetches a key's full value and replaces the cached one. Nothing is
/// written unless the fetch succeeded.
async fn refresh_key(task: &dyn RefreshTask, cache: &dyn CacheStore, cancel: &CancellationToken) -> Result<usize> {
    let payload = task.fetch(cancel).await?;
    cache.add_cache_item(task.key(), payload.value, CACHE_ENTRY_TTL).await?;
    Ok(payload.records)
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}
