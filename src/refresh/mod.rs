use std::time::Duration;

pub mod orchestrator;
pub mod tasks;

/// Refreshed values never expire; the next successful cycle replaces them.
pub const CACHE_ENTRY_TTL: Duration = Duration::ZERO;
