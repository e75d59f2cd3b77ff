use std::env;
use std::time::Duration;
use crate::config::cluster::{ComputeRatesConfig, KubernetesConfig};
use crate::config::providers::{AwsConfig, AzureConfig, EmmaConfig};
use crate::config::*;
use crate::error::{Error, Result};
use config::{Config, ConfigBuilder, Environment, File};
use config::builder::DefaultState;
use serde::Deserialize;

pub const ENV_PREFIX: &str = "ULTRON_ATTENDANT";
pub const ENV_EMMA_CLIENT_ID: &str = "EMMA_CLIENT_ID";
pub const ENV_EMMA_CLIENT_SECRET: &str = "EMMA_CLIENT_SECRET";
pub const ENV_KUBERNETES_SERVICE_HOST: &str = "KUBERNETES_SERVICE_HOST";
pub const ENV_KUBERNETES_SERVICE_PORT: &str = "KUBERNETES_SERVICE_PORT";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Minutes between refresh cycles, kept raw so bad values fall back
    /// to the default instead of failing startup.
    pub cache_refresh_interval: Option<String>,
    pub refresh: RefreshConfig,
    pub retry: RetryConfig,
    pub logging: LoggingConfig,
    pub emma: EmmaConfig,
    pub azure: AzureConfig,
    pub aws: AwsConfig,
    pub kubernetes: KubernetesConfig,
    pub compute: ComputeRatesConfig,
}

impl AppConfig {
    pub fn load(env: &str) -> Result<Self> {
        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            );

        Self::from_builder(with_legacy_overrides(builder)?)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self> {
        let config = builder
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        let app: AppConfig = config.try_deserialize()
            .map_err(|e| Error::ConfigError(e.to_string()))?;
        app.retry.validate()?;
        Ok(app)
    }

    pub fn refresh_interval(&self) -> Duration {
        parse_refresh_interval(self.cache_refresh_interval.as_deref())
    }
}

/// Variables from the in-cluster environment that predate the prefixed
/// names. They win over file values but not over prefixed variables set
/// alongside them.
fn with_legacy_overrides(builder: ConfigBuilder<DefaultState>) -> Result<ConfigBuilder<DefaultState>> {
    let api_url = match (
        env::var(ENV_KUBERNETES_SERVICE_HOST).ok().filter(|v| !v.is_empty()),
        env::var(ENV_KUBERNETES_SERVICE_PORT).ok().filter(|v| !v.is_empty()),
    ) {
        (Some(host), Some(port)) => Some(format!("https://{}:{}", host, port)),
        _ => None,
    };

    let prefixed = |key: &str| env::var(format!("{}_{}", ENV_PREFIX, key)).is_ok();

    let mut builder = builder;
    if !prefixed("EMMA__CLIENT_ID") {
        builder = builder
            .set_override_option("emma.client_id", env::var(ENV_EMMA_CLIENT_ID).ok())
            .map_err(|e| Error::ConfigError(e.to_string()))?;
    }
    if !prefixed("EMMA__CLIENT_SECRET") {
        builder = builder
            .set_override_option("emma.client_secret", env::var(ENV_EMMA_CLIENT_SECRET).ok())
            .map_err(|e| Error::ConfigError(e.to_string()))?;
    }
    if !prefixed("KUBERNETES__API_URL") {
        builder = builder
            .set_override_option("kubernetes.api_url", api_url)
            .map_err(|e| Error::ConfigError(e.to_string()))?;
    }

    Ok(builder)
}
