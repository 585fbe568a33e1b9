use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Timeout {0} cannot be 0")]
    ZeroTimeout(&'static str),

    #[error("max_concurrent_side_calls cannot be 0")]
    ZeroConcurrencyLimit,
}

/// Gateway configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Main listener for incoming requests
    pub listener: Listener,
    /// Admin listener for health and readiness probes
    pub admin_listener: Listener,
    pub upstreams: Upstreams,
    pub timeouts: Timeouts,
    pub fault_injection: FaultInjection,
    pub fan_out: FanOut,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listener: Listener {
                host: "0.0.0.0".into(),
                port: 8080,
            },
            admin_listener: Listener {
                host: "0.0.0.0".into(),
                port: 8081,
            },
            upstreams: Upstreams::default(),
            timeouts: Timeouts::default(),
            fault_injection: FaultInjection::default(),
            fan_out: FanOut::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;
        self.timeouts.validate()?;

        if self.fan_out.max_concurrent_side_calls == Some(0) {
            return Err(ValidationError::ZeroConcurrencyLimit);
        }

        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// Base URLs of the three upstream services.
///
/// Note: Uses the `url::Url` type so invalid URLs are rejected during config
/// deserialization.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Upstreams {
    pub restaurants: Url,
    pub images: Url,
    pub ratings: Url,
}

impl Default for Upstreams {
    fn default() -> Self {
        Self {
            restaurants: default_url(DEFAULT_RESTAURANTS_URL),
            images: default_url(DEFAULT_IMAGES_URL),
            ratings: default_url(DEFAULT_RATINGS_URL),
        }
    }
}

const DEFAULT_RESTAURANTS_URL: &str = "http://127.0.0.1:9001/";
const DEFAULT_IMAGES_URL: &str = "http://127.0.0.1:9002/";
const DEFAULT_RATINGS_URL: &str = "http://127.0.0.1:9003/";

fn default_url(literal: &'static str) -> Url {
    Url::parse(literal).expect("default upstream url literal is valid")
}

/// Per-operation deadlines, in milliseconds.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Timeouts {
    /// Single restaurant reads
    pub get_one_ms: u64,
    /// Restaurant list reads
    pub collection_ms: u64,
    /// Create, update and delete
    pub write_ms: u64,
    /// Endpoints forwarded to a single upstream
    pub proxy_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            get_one_ms: 3_000,
            collection_ms: 10_000,
            write_ms: 10_000,
            proxy_ms: 10_000,
        }
    }
}

impl Timeouts {
    fn validate(&self) -> Result<(), ValidationError> {
        let timeouts = [
            ("get_one_ms", self.get_one_ms),
            ("collection_ms", self.collection_ms),
            ("write_ms", self.write_ms),
            ("proxy_ms", self.proxy_ms),
        ];
        match timeouts.iter().find(|(_, ms)| *ms == 0) {
            Some((name, _)) => Err(ValidationError::ZeroTimeout(name)),
            None => Ok(()),
        }
    }

    pub fn get_one(&self) -> Duration {
        Duration::from_millis(self.get_one_ms)
    }

    pub fn collection(&self) -> Duration {
        Duration::from_millis(self.collection_ms)
    }

    pub fn write(&self) -> Duration {
        Duration::from_millis(self.write_ms)
    }

    pub fn proxy(&self) -> Duration {
        Duration::from_millis(self.proxy_ms)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct FaultInjection {
    /// Honour the `rs.*` query controls on inbound requests
    pub enabled: bool,
}

impl Default for FaultInjection {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct FanOut {
    /// Upper bound on concurrent side calls of one collection read. Unbounded when unset.
    pub max_concurrent_side_calls: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config() {
        let yaml = r#"
listener:
    host: "127.0.0.1"
    port: 3000
admin_listener:
    host: "127.0.0.1"
    port: 3001
upstreams:
    restaurants: "http://restaurants.internal:8080/"
    images: "http://images.internal:8080/"
    ratings: "http://ratings.internal:8080/"
timeouts:
    get_one_ms: 500
fault_injection:
    enabled: false
fan_out:
    max_concurrent_side_calls: 16
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.listener.port, 3000);
        assert_eq!(config.admin_listener.host, "127.0.0.1");
        assert_eq!(
            config.upstreams.images.as_str(),
            "http://images.internal:8080/"
        );
        assert_eq!(config.timeouts.get_one(), Duration::from_millis(500));
        // Unset timeouts keep their defaults
        assert_eq!(config.timeouts.collection(), Duration::from_secs(10));
        assert!(!config.fault_injection.enabled);
        assert_eq!(config.fan_out.max_concurrent_side_calls, Some(16));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.listener.port, 8080);
        assert_eq!(config.admin_listener.port, 8081);
        assert_eq!(
            config.upstreams.restaurants.as_str(),
            "http://127.0.0.1:9001/"
        );
        assert_eq!(config.timeouts.get_one(), Duration::from_secs(3));
        assert!(config.fault_injection.enabled);
        assert_eq!(config.fan_out.max_concurrent_side_calls, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let yaml = r#"
upstreams:
    restaurants: "not a url"
"#;
        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.listener.port = 0;
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidPort)
        ));

        let mut config = Config::default();
        config.timeouts.write_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ValidationError::ZeroTimeout("write_ms"))
        ));

        let mut config = Config::default();
        config.fan_out.max_concurrent_side_calls = Some(0);
        assert!(matches!(
            config.validate(),
            Err(ValidationError::ZeroConcurrencyLimit)
        ));
    }
}
