use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use crate::error::{Error, Result};
use crate::providers::{FilterCriteria, Provider, ProviderAdapter};
use crate::types::compute::PricingRecord;

/// Placeholder for a provider without an adapter yet. Every fetch fails
/// with `ProviderNotSupported`.
pub struct UnsupportedAdapter {
    provider: Provider,
}

impl UnsupportedAdapter {
    pub fn gcp() -> Self {
        UnsupportedAdapter { provider: Provider::Gcp }
    }

    pub fn wisp() -> Self {
        UnsupportedAdapter { provider: Provider::Wisp }
    }
}

#[async_trait]
impl ProviderAdapter for UnsupportedAdapter {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn fetch_costs(
        &self,
        _cancel: &CancellationToken,
        _criteria: &FilterCriteria,
    ) -> Result<Vec<PricingRecord>> {
        Err(Error::ProviderNotSupported(self.provider.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unsupported_providers_fail_explicitly() {
        let criteria = FilterCriteria::Project {
            project_id: "p".to_string(),
            query: "compute".to_string(),
        };

        for adapter in [UnsupportedAdapter::gcp(), UnsupportedAdapter::wisp()] {
            let err = adapter.fetch_costs(&CancellationToken::new(), &criteria).await.unwrap_err();
            assert!(matches!(err, Error::ProviderNotSupported(name) if name == adapter.provider().name()));
        }
    }
}
