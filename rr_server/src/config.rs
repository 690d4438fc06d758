//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use chrono::Duration;
use reviewroot::{
    auth::{TokenSettings, parse_hmac_algorithm},
    db::DatabaseConfig,
};
use std::net::SocketAddr;

/// Default listen address when neither `--bind` nor `SERVER_BIND` is given.
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

/// Minimum signing secret length (256-bit for HS256).
pub const MIN_SECRET_LEN: usize = 32;

/// Longest accepted access token lifetime.
pub const MAX_ACCESS_TTL_DAYS: i64 = 30;

/// Longest accepted refresh token lifetime.
pub const MAX_REFRESH_TTL_DAYS: i64 = 365;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration; `None` when running on the in-memory store
    pub database: Option<DatabaseConfig>,
    /// Token signing configuration
    pub tokens: TokenSettings,
    /// Prometheus exporter address, if metrics are enabled
    pub metrics_bind: Option<SocketAddr>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `in_memory` - Skip the database entirely
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        in_memory: bool,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(addr) => addr,
            None => parse_addr("SERVER_BIND", std::env::var("SERVER_BIND").ok())?
                .unwrap_or(SocketAddr::from(([127, 0, 0, 1], 8000))),
        };

        let database = if in_memory {
            None
        } else {
            let database_url = database_url_override
                .or_else(|| std::env::var("DATABASE_URL").ok())
                .ok_or_else(|| ConfigError::MissingRequired {
                    var: "DATABASE_URL".to_string(),
                    hint: "Set a PostgreSQL URL or start with --in-memory".to_string(),
                })?;

            Some(DatabaseConfig {
                database_url,
                max_connections: parse_env_or("DB_MAX_CONNECTIONS", 20),
                min_connections: parse_env_or("DB_MIN_CONNECTIONS", 1),
                connection_timeout_secs: parse_env_or("DB_CONNECTION_TIMEOUT_SECS", 5),
                idle_timeout_secs: parse_env_or("DB_IDLE_TIMEOUT_SECS", 300),
                max_lifetime_secs: parse_env_or("DB_MAX_LIFETIME_SECS", 1800),
            })
        };

        // Security configuration (REQUIRED)
        let secret = std::env::var("JWT_SECRET").map_err(|_| ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Generate with: openssl rand -hex 32".to_string(),
        })?;

        let mut tokens = TokenSettings::new(secret);
        if let Ok(name) = std::env::var("JWT_ALGORITHM") {
            tokens.algorithm = parse_hmac_algorithm(&name).ok_or_else(|| ConfigError::Invalid {
                var: "JWT_ALGORITHM".to_string(),
                reason: format!("Unsupported algorithm '{name}', expected HS256, HS384 or HS512"),
            })?;
        }
        tokens.access_ttl = lifetime(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            parse_env_or("ACCESS_TOKEN_EXPIRE_MINUTES", 1440),
            Duration::try_minutes,
        )?;
        tokens.refresh_ttl = lifetime(
            "REFRESH_TOKEN_EXPIRE_DAYS",
            parse_env_or("REFRESH_TOKEN_EXPIRE_DAYS", 7),
            Duration::try_days,
        )?;

        let metrics_bind = parse_addr("METRICS_BIND", std::env::var("METRICS_BIND").ok())?;

        Ok(ServerConfig {
            bind,
            database,
            tokens,
            metrics_bind,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tokens.secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET".to_string(),
                reason: format!("Must be at least {MIN_SECRET_LEN} characters"),
            });
        }

        if self.tokens.access_ttl <= Duration::zero() {
            return Err(ConfigError::Invalid {
                var: "ACCESS_TOKEN_EXPIRE_MINUTES".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.tokens.access_ttl > Duration::days(MAX_ACCESS_TTL_DAYS) {
            return Err(ConfigError::Invalid {
                var: "ACCESS_TOKEN_EXPIRE_MINUTES".to_string(),
                reason: format!("Must be at most {MAX_ACCESS_TTL_DAYS} days"),
            });
        }

        if self.tokens.refresh_ttl > Duration::days(MAX_REFRESH_TTL_DAYS) {
            return Err(ConfigError::Invalid {
                var: "REFRESH_TOKEN_EXPIRE_DAYS".to_string(),
                reason: format!("Must be at most {MAX_REFRESH_TTL_DAYS} days"),
            });
        }

        if self.tokens.refresh_ttl <= self.tokens.access_ttl {
            return Err(ConfigError::Invalid {
                var: "REFRESH_TOKEN_EXPIRE_DAYS".to_string(),
                reason: "Refresh tokens must outlive access tokens".to_string(),
            });
        }

        if let Some(database) = &self.database {
            if database.min_connections > database.max_connections {
                return Err(ConfigError::Invalid {
                    var: "DB_MIN_CONNECTIONS".to_string(),
                    reason: format!(
                        "Cannot exceed DB_MAX_CONNECTIONS ({})",
                        database.max_connections
                    ),
                });
            }
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn parse_addr(var: &str, value: Option<String>) -> Result<Option<SocketAddr>, ConfigError> {
    value
        .map(|v| {
            v.parse().map_err(|_| ConfigError::Invalid {
                var: var.to_string(),
                reason: format!("'{v}' is not a socket address"),
            })
        })
        .transpose()
}

fn lifetime(
    var: &str,
    amount: i64,
    to_duration: fn(i64) -> Option<Duration>,
) -> Result<Duration, ConfigError> {
    to_duration(amount).ok_or_else(|| ConfigError::Invalid {
        var: var.to_string(),
        reason: format!("{amount} is out of range"),
    })
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
