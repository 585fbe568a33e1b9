use aggregator::config::{Config as GatewayConfig, ValidationError};
use serde::Deserialize;
use std::fs::File;
use std::path::Path;
use url::Url;

/// Environment variables that override the upstream base URLs.
pub const RESTAURANTS_URL_ENV: &str = "APP_RESTAURANT_SVC";
pub const IMAGES_URL_ENV: &str = "APP_IMAGES_SVC";
pub const RATINGS_URL_ENV: &str = "APP_RATING_SVC";

#[derive(Debug, Deserialize)]
pub struct MetricsConfig {
    pub statsd_host: String,
    pub statsd_port: u16,
    #[serde(default = "default_metrics_prefix")]
    pub prefix: String,
}

fn default_metrics_prefix() -> String {
    "restaurant_gateway".into()
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    pub sentry_dsn: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommonConfig {
    pub metrics: Option<MetricsConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub common: CommonConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let data = serde_yaml::from_reader(file)?;

        Ok(data)
    }

    /// Reads the file if one is given, applies environment overrides and validates.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        config.gateway.validate()?;

        Ok(config)
    }

    fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let upstreams = &mut self.gateway.upstreams;
        let targets = [
            (RESTAURANTS_URL_ENV, &mut upstreams.restaurants),
            (IMAGES_URL_ENV, &mut upstreams.images),
            (RATINGS_URL_ENV, &mut upstreams.ratings),
        ];

        for (var, target) in targets {
            let Some(value) = lookup(var).filter(|value| !value.trim().is_empty()) else {
                continue;
            };
            *target = Url::parse(value.trim())
                .map_err(|source| ConfigError::InvalidEnvUrl { var, source })?;
        }

        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("could not load config from file: {0}")]
    LoadError(#[from] std::io::Error),
    #[error("could not parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("{var} is not a valid url: {source}")]
    InvalidEnvUrl {
        var: &'static str,
        source: url::ParseError,
    },
    #[error("invalid config: {0}")]
    Invalid(#[from] ValidationError),
}
