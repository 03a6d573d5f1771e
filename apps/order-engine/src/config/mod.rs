//! Configuration module for the order engine.
//!
//! Loads YAML configuration with environment variable interpolation and
//! validates it before anything is started.
//!
//! # Usage
//!
//! ```rust,ignore
//! use order_engine::config::load_config;
//!
//! // Load from default path (config.yaml, or $ORDER_ENGINE_CONFIG)
//! let config = load_config(None)?;
//!
//! println!("HTTP port: {}", config.server.http_port);
//! ```

mod adapters;
mod engine;
mod limits;
mod observability;
mod retry;
mod server;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use adapters::{MarketDataConfig, VenueConfig};
pub use engine::EngineConfig;
pub use limits::LimitSeed;
pub use observability::{LogFormat, LoggingConfig, ObservabilityConfig};
pub use retry::RetryConfig;
pub use server::ServerConfig;

/// Environment variable overriding the config file path.
pub const CONFIG_PATH_ENV: &str = "ORDER_ENGINE_CONFIG";

/// Default config file path.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Worker pool configuration.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Dispatch retry policy.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Execution venue endpoint.
    #[serde(default)]
    pub venue: VenueConfig,
    /// Market data feed endpoint.
    #[serde(default)]
    pub market_data: MarketDataConfig,
    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
    /// Quota buckets seeded at startup.
    #[serde(default)]
    pub limits: Vec<LimitSeed>,
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to
///   `$ORDER_ENGINE_CONFIG`, then "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(
        || std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string()),
        str::to_string,
    );

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<Config, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: Config = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // constant pattern
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures<'_>| {
        let default_value = cap.get(2).map_or("", |m| m.as_str());
        match cap.get(1).map(|m| std::env::var(m.as_str())) {
            Some(Ok(value)) if !value.is_empty() => value,
            _ => default_value.to_string(),
        }
    })
    .into_owned()
}

/// Validate configuration values.
fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.metrics_port == Some(config.server.http_port) {
        return Err(ConfigError::ValidationError(
            "http_port and metrics_port must be different".to_string(),
        ));
    }

    if config.engine.workers == 0 {
        return Err(ConfigError::ValidationError(
            "engine.workers must be at least 1".to_string(),
        ));
    }

    if config.engine.batch_size == 0 {
        return Err(ConfigError::ValidationError(
            "engine.batch_size must be at least 1".to_string(),
        ));
    }

    if config.engine.poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "engine.poll_interval_ms must be positive".to_string(),
        ));
    }

    let retry = &config.retry;
    if retry.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "retry.max_attempts must be at least 1".to_string(),
        ));
    }
    if retry.backoff_multiplier < 1.0 {
        return Err(ConfigError::ValidationError(
            "retry.backoff_multiplier must be >= 1.0".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&retry.jitter_factor) {
        return Err(ConfigError::ValidationError(
            "retry.jitter_factor must be between 0.0 and 1.0".to_string(),
        ));
    }
    if retry.initial_backoff_ms > retry.max_backoff_ms {
        return Err(ConfigError::ValidationError(
            "retry.initial_backoff_ms cannot exceed retry.max_backoff_ms".to_string(),
        ));
    }

    for (url, name) in [
        (&config.venue.base_url, "venue.base_url"),
        (&config.market_data.base_url, "market_data.base_url"),
    ] {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "{name} must be an http(s) URL"
            )));
        }
    }

    for (index, seed) in config.limits.iter().enumerate() {
        if seed.user_id.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "limits[{index}].user_id cannot be empty"
            )));
        }
        if seed.max_amount <= rust_decimal::Decimal::ZERO {
            return Err(ConfigError::ValidationError(format!(
                "limits[{index}].max_amount must be positive"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.http_port, 8080);
        assert_eq!(config.engine.workers, 4);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.observability.logging.format, LogFormat::Json);
        assert!(config.limits.is_empty());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_load_empty_config_uses_defaults() {
        let config = load_config_from_string("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_full_config() {
        let yaml = r"
server:
  http_port: 8081
  metrics_port: 9091
engine:
  workers: 2
  batch_size: 50
  poll_interval_ms: 250
  max_price_age_secs: 10
retry:
  max_attempts: 3
  initial_backoff_ms: 100
venue:
  base_url: https://venue.example
  timeout_ms: 2000
market_data:
  base_url: https://prices.example
observability:
  logging:
    level: debug
    format: pretty
limits:
  - user_id: u-1
    side: buy
    window: daily
    max_amount: 5000
  - user_id: u-1
    space_id: family
    window: monthly
    max_amount: 20000
    enforced: false
";
        let config = load_config_from_string(yaml).unwrap();

        assert_eq!(config.server.metrics_port, Some(9091));
        assert_eq!(config.engine.workers, 2);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.max_backoff_ms, 60_000);
        assert_eq!(config.observability.logging.format, LogFormat::Pretty);
        assert_eq!(config.limits.len(), 2);
        assert_eq!(config.limits[0].max_amount, dec!(5000));
        assert!(config.limits[0].enforced);
        assert!(!config.limits[1].enforced);
    }

    #[test]
    fn test_env_var_with_default_when_missing() {
        let input = "base_url: ${ORDER_ENGINE_TEST_NONEXISTENT_VAR:-http://localhost}";
        let result = interpolate_env_vars(input);
        assert_eq!(result, "base_url: http://localhost");
    }

    #[test]
    #[expect(clippy::literal_string_with_formatting_args)] // ${...} is env var syntax, not format args
    fn test_env_var_with_default_uses_existing() {
        let input = "path: ${PATH:-default}";
        let result = interpolate_env_vars(input);
        assert_ne!(result, "path: default");
        assert!(result.starts_with("path: "));
    }

    #[test]
    fn test_env_var_without_default_becomes_empty() {
        let input = "api_key: ${ORDER_ENGINE_TEST_UNLIKELY_TO_EXIST}";
        let result = interpolate_env_vars(input);
        assert_eq!(result, "api_key: ");
    }

    #[test]
    fn test_validation_same_ports() {
        let yaml = r"
server:
  http_port: 9090
  metrics_port: 9090
";
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for duplicate ports");
        };
        assert!(err.to_string().contains("must be different"));
    }

    #[test]
    fn test_validation_zero_workers() {
        let yaml = r"
engine:
  workers: 0
";
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for zero workers");
        };
        assert!(err.to_string().contains("workers"));
    }

    #[test]
    fn test_validation_jitter_out_of_range() {
        let yaml = r"
retry:
  jitter_factor: 1.5
";
        assert!(load_config_from_string(yaml).is_err());
    }

    #[test]
    fn test_validation_non_positive_limit() {
        let yaml = r"
limits:
  - user_id: u-1
    window: daily
    max_amount: 0
";
        let Err(err) = load_config_from_string(yaml) else {
            panic!("expected error for zero limit");
        };
        assert!(err.to_string().contains("max_amount"));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "server:\n  http_port: 8099\n").unwrap();

        let config = load_config(path.to_str()).unwrap();
        assert_eq!(config.server.http_port, 8099);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config(Some("/nonexistent/order-engine.yaml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn limit_seed_builds_empty_bucket() {
        let seed = LimitSeed {
            user_id: "u-1".to_string(),
            space_id: None,
            side: None,
            window: crate::domain::quota::LimitWindow::Daily,
            max_amount: dec!(100),
            enforced: true,
        };
        let now = crate::domain::shared::Timestamp::parse("2026-01-19T10:00:00Z").unwrap();
        let limit = seed
            .to_settings()
            .open(crate::domain::shared::LimitId::new("seed"), now)
            .unwrap();
        assert_eq!(limit.used_amount, dec!(0));
        assert_eq!(limit.reset_at.to_rfc3339(), "2026-01-20T00:00:00+00:00");
    }
}
