//! API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::warn;

const DEV_JWT_SECRET: &str = "bazaar-dev-secret-change-in-production";

/// Upper bound for every token lifetime (one year).
const MAX_LIFETIME_SECS: i64 = 365 * 24 * 60 * 60;

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Interface to bind, as an IP literal (`0.0.0.0`, `127.0.0.1`, `::1`).
    /// Hostnames such as `localhost` are rejected.
    pub http_host: String,

    /// HTTP port
    pub http_port: u16,

    /// SQLite database file (`:memory:` for an ephemeral database)
    pub database_path: String,

    /// Pool size
    pub db_max_connections: u32,

    /// HS256 secret for signing tokens
    pub jwt_secret: String,

    /// Access token lifetime in seconds
    pub jwt_access_lifetime_secs: i64,

    /// Refresh token lifetime in seconds
    pub jwt_refresh_lifetime_secs: i64,

    /// Password reset token lifetime in seconds
    pub password_reset_lifetime_secs: i64,

    /// Base URL used to build links in emails
    pub public_base_url: String,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ => {
                warn!("JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let config = ApiConfig {
            http_host: env::var("HTTP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: parse_var("HTTP_PORT", 8000)?,
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "bazaar.db".to_string()),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 5)?,
            jwt_secret,
            jwt_access_lifetime_secs: parse_var("JWT_ACCESS_LIFETIME_SECS", 1800)?, // 30 min
            jwt_refresh_lifetime_secs: parse_var("JWT_REFRESH_LIFETIME_SECS", 86400)?, // 24 h
            password_reset_lifetime_secs: parse_var("PASSWORD_RESET_LIFETIME_SECS", 1800)?,
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Configuration for tests: in-memory database, fixed secret.
    pub fn for_tests() -> Self {
        ApiConfig {
            http_host: "127.0.0.1".to_string(),
            http_port: 0,
            database_path: ":memory:".to_string(),
            db_max_connections: 1,
            jwt_secret: "test-secret".to_string(),
            jwt_access_lifetime_secs: 1800,
            jwt_refresh_lifetime_secs: 86400,
            password_reset_lifetime_secs: 1800,
            public_base_url: "http://localhost:8000".to_string(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("JWT_ACCESS_LIFETIME_SECS", self.jwt_access_lifetime_secs),
            ("JWT_REFRESH_LIFETIME_SECS", self.jwt_refresh_lifetime_secs),
            ("PASSWORD_RESET_LIFETIME_SECS", self.password_reset_lifetime_secs),
        ] {
            if !(1..=MAX_LIFETIME_SECS).contains(&value) {
                return Err(ConfigError::InvalidValue(name.to_string()));
            }
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }
        self.bind_addr()?;
        Ok(())
    }

    /// Socket address to bind. `HTTP_HOST` is not resolved through DNS.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = IpAddr::from_str(&self.http_host)
            .map_err(|_| ConfigError::InvalidValue("HTTP_HOST".to_string()))?;
        Ok(SocketAddr::new(ip, self.http_port))
    }

    /// Token settings handed to the token service.
    pub fn token_config(&self) -> TokenConfig {
        TokenConfig {
            secret: self.jwt_secret.clone(),
            access_ttl: Duration::seconds(self.jwt_access_lifetime_secs),
            refresh_ttl: Duration::seconds(self.jwt_refresh_lifetime_secs),
        }
    }

    pub fn password_reset_ttl(&self) -> Duration {
        Duration::seconds(self.password_reset_lifetime_secs)
    }
}

/// Settings for [`crate::auth::TokenService`].
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        Err(_) => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ApiConfig::for_tests();
        assert!(config.validate().is_ok());
        assert_eq!(config.token_config().access_ttl, Duration::minutes(30));
        assert_eq!(config.token_config().refresh_ttl, Duration::hours(24));
    }

    #[test]
    fn test_rejects_non_positive_lifetimes() {
        let mut config = ApiConfig::for_tests();
        config.jwt_access_lifetime_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(name)) if name == "JWT_ACCESS_LIFETIME_SECS"));
    }

    #[test]
    fn test_rejects_lifetimes_over_a_year() {
        let mut config = ApiConfig::for_tests();
        config.jwt_refresh_lifetime_secs = MAX_LIFETIME_SECS;
        assert!(config.validate().is_ok());

        for huge in [MAX_LIFETIME_SECS + 1, i64::MAX / 1000, i64::MAX] {
            let mut config = ApiConfig::for_tests();
            config.jwt_refresh_lifetime_secs = huge;
            assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(name)) if name == "JWT_REFRESH_LIFETIME_SECS"));

            let mut config = ApiConfig::for_tests();
            config.password_reset_lifetime_secs = huge;
            assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(name)) if name == "PASSWORD_RESET_LIFETIME_SECS"));
        }
    }

    #[test]
    fn test_host_must_be_an_ip_literal() {
        let mut config = ApiConfig::for_tests();
        config.http_host = "::1".to_string();
        assert_eq!(config.bind_addr().unwrap().to_string(), "[::1]:0");

        config.http_host = "localhost".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(name)) if name == "HTTP_HOST"));
    }

    #[test]
    fn test_bind_addr() {
        let config = ApiConfig::for_tests();
        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:0");

        let mut bad = ApiConfig::for_tests();
        bad.http_host = "not a host".to_string();
        assert!(bad.bind_addr().is_err());
    }
}
