//! Process-wide service configuration.
//!
//! Built once at startup (from the environment, then CLI overrides) and
//! passed into the service. Nothing here is read from globals afterwards.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::{DEFAULT_PORT, STORE_IO_TIMEOUT_SECS, TOKEN_ALGORITHM, TOKEN_DURATION, USERS_FILE};

/// Configuration problems detected at startup
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("signing secret is not set (KEYGATE_SECRET or --secret)")]
    MissingSecret,

    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// JSON file holding the user collection
    pub users_file: PathBuf,

    /// Shared HMAC signing secret
    pub secret: String,

    /// Token signing algorithm identifier
    pub algorithm: String,

    /// Session token lifetime
    pub token_ttl: chrono::Duration,

    /// HTTP listen port
    pub port: u16,

    /// Upper bound on a single storage operation
    pub io_timeout: Duration,

    /// Optional log file; stderr when unset
    pub log_file: Option<PathBuf>,
}

impl AuthConfig {
    /// Create a configuration with defaults for everything but the secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            users_file: PathBuf::from(USERS_FILE),
            secret: secret.into(),
            algorithm: TOKEN_ALGORITHM.to_string(),
            token_ttl: chrono::Duration::seconds(TOKEN_DURATION),
            port: DEFAULT_PORT,
            io_timeout: Duration::from_secs(STORE_IO_TIMEOUT_SECS),
            log_file: None,
        }
    }

    /// Builder-style override of the users file
    pub fn with_users_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.users_file = path.into();
        self
    }

    /// Load configuration from `KEYGATE_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // An absent secret is reported by `validate`, after CLI overrides apply
        let mut config = Self::new(lookup("KEYGATE_SECRET").unwrap_or_default());

        if let Some(algorithm) = lookup("KEYGATE_ALGORITHM") {
            config.algorithm = algorithm;
        }
        if let Some(path) = lookup("KEYGATE_USERS_FILE") {
            config.users_file = PathBuf::from(path);
        }
        if let Some(port) = lookup("KEYGATE_PORT") {
            config.port = parse_value("KEYGATE_PORT", &port)?;
        }
        if let Some(secs) = lookup("KEYGATE_IO_TIMEOUT_SECS") {
            config.io_timeout = Duration::from_secs(parse_value("KEYGATE_IO_TIMEOUT_SECS", &secs)?);
        }
        if let Some(path) = lookup("KEYGATE_LOG_FILE") {
            config.log_file = Some(PathBuf::from(path));
        }

        Ok(config)
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        if self.algorithm != TOKEN_ALGORITHM {
            return Err(ConfigError::UnsupportedAlgorithm(self.algorithm.clone()));
        }
        if self.token_ttl <= chrono::Duration::zero() {
            return Err(ConfigError::InvalidValue {
                name: "token_ttl",
                value: self.token_ttl.num_seconds().to_string(),
            });
        }
        if self.io_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "io_timeout",
                value: format!("{:?}", self.io_timeout),
            });
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AuthConfig::new("secret");
        assert_eq!(config.users_file, PathBuf::from("users.json"));
        assert_eq!(config.algorithm, "HS256");
        assert_eq!(config.token_ttl, chrono::Duration::hours(1));
        assert_eq!(config.port, 8000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup() {
        let config = AuthConfig::from_lookup(lookup_from(&[
            ("KEYGATE_SECRET", "s3cret"),
            ("KEYGATE_USERS_FILE", "/tmp/users.json"),
            ("KEYGATE_PORT", "9090"),
            ("KEYGATE_TOKEN_TTL_SECS", "120"),
            ("KEYGATE_IO_TIMEOUT_SECS", "2"),
        ]))
        .unwrap();

        assert_eq!(config.secret, "s3cret");
        assert_eq!(config.users_file, PathBuf::from("/tmp/users.json"));
        assert_eq!(config.port, 9090);
        // Session lifetime is fixed, not an environment setting
        assert_eq!(config.token_ttl, chrono::Duration::hours(1));
        assert_eq!(config.io_timeout, Duration::from_secs(2));
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_invalid_port() {
        let result = AuthConfig::from_lookup(lookup_from(&[("KEYGATE_PORT", "eighty")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { name: "KEYGATE_PORT", .. })
        ));
    }

    #[test]
    fn test_validation() {
        let missing = AuthConfig::from_lookup(lookup_from(&[])).unwrap();
        assert!(matches!(missing.validate(), Err(ConfigError::MissingSecret)));

        let mut config = AuthConfig::new("secret");
        config.algorithm = "none".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_zero_io_timeout_rejected() {
        let config = AuthConfig::from_lookup(lookup_from(&[
            ("KEYGATE_SECRET", "s3cret"),
            ("KEYGATE_IO_TIMEOUT_SECS", "0"),
        ]))
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { name: "io_timeout", .. })
        ));

        let mut config = AuthConfig::new("secret");
        config.io_timeout = Duration::from_millis(1);
        assert!(config.validate().is_ok());
    }
}
