use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use crate::config::RetryConfig;
use crate::error::{Error, Result};
use crate::observability::metrics::TOKEN_ATTEMPTS;

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Performs one token exchange against an auth endpoint.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue_token(&self, cancel: &CancellationToken, credentials: &Credentials) -> Result<String>;
}

/// Exponential backoff that gives up after a fixed number of attempts
/// rather than after an elapsed time.
#[derive(Debug)]
pub struct AttemptLimitedBackoff {
    inner: ExponentialBackoff,
    max_attempts: u32,
    retries: u32,
}

impl AttemptLimitedBackoff {
    pub fn new(config: &RetryConfig) -> Self {
        let initial = Duration::from_millis(config.initial_interval_ms);
        AttemptLimitedBackoff {
            inner: ExponentialBackoff {
                initial_interval: initial,
                current_interval: initial,
                max_interval: Duration::from_millis(config.max_interval_ms),
                multiplier: config.multiplier,
                randomization_factor: 0.1,
                max_elapsed_time: None,
                ..Default::default()
            },
            max_attempts: config.max_attempts.max(1),
            retries: 0,
        }
    }
}

impl Backoff for AttemptLimitedBackoff {
    fn next_backoff(&mut self) -> Option<Duration> {
        if self.retries + 1 >= self.max_attempts {
            return None;
        }
        self.retries += 1;
        self.inner.next_backoff()
    }

    fn reset(&mut self) {
        self.retries = 0;
        self.inner.reset();
    }
}

/// Issues a fresh token on every call, retrying failed exchanges with
/// exponential backoff.
pub struct TokenBroker<I> {
    issuer: I,
    retry: RetryConfig,
}

impl<I: TokenIssuer> TokenBroker<I> {
    pub fn new(issuer: I, retry: RetryConfig) -> Self {
        TokenBroker { issuer, retry }
    }

    pub async fn get_token(&self, cancel: &CancellationToken, credentials: &Credentials) -> Result<String> {
        let counter = AtomicU32::new(0);
        let attempts = &counter;
        let issuer = &self.issuer;

        let operation = move || async move {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            TOKEN_ATTEMPTS.inc();

            match issuer.issue_token(cancel, credentials).await {
                Ok(token) => Ok(token),
                Err(e) if e.is_cancelled() => Err(backoff::Error::permanent(e)),
                Err(e) => {
                    debug!(attempt, error = %e, "token issuance attempt failed");
                    Err(backoff::Error::transient(e))
                }
            }
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = retry(AttemptLimitedBackoff::new(&self.retry), operation) => result,
        };

        match result {
            Ok(token) => Ok(token),
            Err(e) if e.is_cancelled() => Err(e),
            Err(e) => {
                let attempts = counter.load(Ordering::SeqCst);
                debug!(attempts, error = %e, "token issuance exhausted retries");
                Err(Error::AuthError {
                    attempts,
                    source: Box::new(e),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct ScriptedIssuer {
        failures_before_success: Option<u32>,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl TokenIssuer for ScriptedIssuer {
        async fn issue_token(&self, _cancel: &CancellationToken, _credentials: &Credentials) -> Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            match self.failures_before_success {
                Some(n) if call > n => Ok("token-abc".to_string()),
                _ => Err(Error::TransportError(format!("attempt {} refused", call))),
            }
        }
    }

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            initial_interval_ms: 1,
            multiplier: 2.0,
            max_interval_ms: 5,
            max_attempts: 3,
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
        }
    }

    #[tokio::test]
    async fn succeeds_on_third_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let broker = TokenBroker::new(
            ScriptedIssuer { failures_before_success: Some(2), calls: calls.clone() },
            fast_retry(),
        );

        let token = broker.get_token(&CancellationToken::new(), &credentials()).await.unwrap();

        assert_eq!(token, "token-abc");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn returns_last_error_after_three_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let broker = TokenBroker::new(
            ScriptedIssuer { failures_before_success: None, calls: calls.clone() },
            fast_retry(),
        );

        let err = broker.get_token(&CancellationToken::new(), &credentials()).await.unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match err {
            Error::AuthError { attempts, source } => {
                assert_eq!(attempts, 3);
                assert_eq!(source.to_string(), "Transport error: attempt 3 refused");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let calls = Arc::new(AtomicU32::new(0));
        let broker = TokenBroker::new(
            ScriptedIssuer { failures_before_success: None, calls },
            fast_retry(),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = broker.get_token(&cancel, &credentials()).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn cancel_interrupts_backoff_sleep() {
        let calls = Arc::new(AtomicU32::new(0));
        let broker = TokenBroker::new(
            ScriptedIssuer { failures_before_success: None, calls: calls.clone() },
            RetryConfig {
                initial_interval_ms: 60_000,
                multiplier: 2.0,
                max_interval_ms: 60_000,
                max_attempts: 3,
            },
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = tokio::time::timeout(Duration::from_secs(5), broker.get_token(&cancel, &credentials()))
            .await
            .expect("backoff sleep was not interrupted")
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_stops_after_max_attempts() {
        let mut backoff = AttemptLimitedBackoff::new(&fast_retry());
        assert!(backoff.next_backoff().is_some());
        assert!(backoff.next_backoff().is_some());
        assert!(backoff.next_backoff().is_none());

        backoff.reset();
        assert!(backoff.next_backoff().is_some());
    }
}
