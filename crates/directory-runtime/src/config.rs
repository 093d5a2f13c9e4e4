//! # Runtime Configuration
//!
//! Configuration for the dispatch and retry loops, loaded from the
//! environment with sane defaults.

use thiserror::Error;

/// Environment variable prefix for all runtime settings.
const ENV_PREFIX: &str = "DIRKEY_";

/// Complete runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Event bus channel capacity.
    pub channel_capacity: usize,
    /// Dead-letter channel consumed by the retry loop.
    pub retry_channel: String,
    /// Maximum redelivery attempts per record before a trigger is dropped.
    pub max_retry_attempts: u32,
    /// Delay before a dead-lettered trigger is re-published, in
    /// milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            channel_capacity: shared_bus::DEFAULT_CHANNEL_CAPACITY,
            retry_channel: shared_bus::RETRY_CHANNEL.to_owned(),
            max_retry_attempts: 5,
            retry_delay_ms: 1_000,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment override could not be parsed.
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: String, value: String },

    /// A setting failed validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl RuntimeConfig {
    /// Load configuration from the environment, falling back to defaults.
    ///
    /// Recognized variables: `DIRKEY_CHANNEL_CAPACITY`,
    /// `DIRKEY_RETRY_CHANNEL`, `DIRKEY_MAX_RETRY_ATTEMPTS`,
    /// `DIRKEY_RETRY_DELAY_MS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = env_var("CHANNEL_CAPACITY") {
            config.channel_capacity = parse(&v, "CHANNEL_CAPACITY")?;
        }
        if let Some(v) = env_var("RETRY_CHANNEL") {
            config.retry_channel = v;
        }
        if let Some(v) = env_var("MAX_RETRY_ATTEMPTS") {
            config.max_retry_attempts = parse(&v, "MAX_RETRY_ATTEMPTS")?;
        }
        if let Some(v) = env_var("RETRY_DELAY_MS") {
            config.retry_delay_ms = parse(&v, "RETRY_DELAY_MS")?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "channel capacity must be at least 1".into(),
            ));
        }
        if self.retry_channel.is_empty() {
            return Err(ConfigError::Invalid("retry channel must be named".into()));
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{name}")).ok()
}

fn parse<T: std::str::FromStr>(value: &str, var: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        var: format!("{ENV_PREFIX}{var}"),
        value: value.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::default();
        assert_eq!(config.channel_capacity, shared_bus::DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(config.retry_channel, shared_bus::RETRY_CHANNEL);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let config = RuntimeConfig {
            channel_capacity: 0,
            ..RuntimeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unnamed_retry_channel() {
        let config = RuntimeConfig {
            retry_channel: String::new(),
            ..RuntimeConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
