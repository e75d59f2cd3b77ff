use thiserror::Error;
use crate::types::cache_key::CacheKey;

#[derive(Error, Debug)]
pub enum Error {
    // Provider Errors
    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Upstream returned status {status}: {body}")]
    UpstreamStatusError {
        status: u16,
        body: String,
    },

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Provider not supported: {0}")]
    ProviderNotSupported(&'static str),

    #[error("Filter criteria not accepted by {provider}: {details}")]
    InvalidFilterCriteria {
        provider: &'static str,
        details: String,
    },

    // Authentication Errors
    #[error("Token issuance failed after {attempts} attempts: {source}")]
    AuthError {
        attempts: u32,
        #[source]
        source: Box<Error>,
    },

    // Enrichment Errors
    #[error("Enrichment of node {node} failed at {step}: {reason}")]
    EnrichmentError {
        node: String,
        step: EnrichmentStep,
        reason: String,
    },

    #[error("Inventory error: {0}")]
    InventoryError(String),

    // Cache Errors
    #[error("Cache error for {key}: {reason}")]
    CacheError {
        key: CacheKey,
        reason: String,
    },

    // System Errors
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Refresh task panicked or was aborted: {0}")]
    TaskJoinError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn is_cancelled(&self) -> bool {
        match self {
            Error::Cancelled => true,
            Error::AuthError { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Error::DecodeError(e.to_string())
        } else if let Some(status) = e.status() {
            Error::UpstreamStatusError {
                status: status.as_u16(),
                body: e.to_string(),
            }
        } else {
            Error::TransportError(e.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::DecodeError(e.to_string())
    }
}

/// The step of the enrichment pipeline a node failed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichmentStep {
    Map,
    MatchConfiguration,
    MedianPrice,
    InterruptionRate,
    LatencyRate,
}

impl std::fmt::Display for EnrichmentStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EnrichmentStep::Map => "map",
            EnrichmentStep::MatchConfiguration => "match_configuration",
            EnrichmentStep::MedianPrice => "median_price",
            EnrichmentStep::InterruptionRate => "interruption_rate",
            EnrichmentStep::LatencyRate => "latency_rate",
        };
        write!(f, "{}", name)
    }
}
