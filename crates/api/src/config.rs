//! Process configuration read from environment variables.
//!
//! `main` loads a `.env` file (if any) before calling [`ApiConfig::from_env`].

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

use yamdb_observability::LogFormat;

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: `{value}` ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind: SocketAddr,
    pub jwt_secret: String,
    /// `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub access_token_ttl: Duration,
    pub confirmation_code_ttl: Duration,
    pub email_from: String,
    pub log_format: LogFormat,
}

impl ApiConfig {
    /// Defaults with the given signing secret.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret: jwt_secret.into(),
            database_url: None,
            database_max_connections: 10,
            access_token_ttl: Duration::minutes(1440),
            confirmation_code_ttl: Duration::hours(72),
            email_from: "noreply@yamdb.local".to_string(),
            log_format: LogFormat::Json,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unset or blank values keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });
        let mut config = Self::new(jwt_secret);

        if let Some(bind) = get("YAMDB_BIND") {
            config.bind = parse_var("YAMDB_BIND", &bind)?;
        }
        config.database_url = get("DATABASE_URL");
        if let Some(max) = get("DATABASE_MAX_CONNECTIONS") {
            config.database_max_connections = parse_var("DATABASE_MAX_CONNECTIONS", &max)?;
        }
        if let Some(minutes) = get("ACCESS_TOKEN_TTL_MINUTES") {
            config.access_token_ttl = Duration::minutes(positive("ACCESS_TOKEN_TTL_MINUTES", &minutes)?);
        }
        if let Some(hours) = get("CONFIRMATION_CODE_TTL_HOURS") {
            config.confirmation_code_ttl = Duration::hours(positive("CONFIRMATION_CODE_TTL_HOURS", &hours)?);
        }
        if let Some(from) = get("EMAIL_FROM") {
            config.email_from = from;
        }
        if let Some(format) = get("LOG_FORMAT") {
            config.log_format = parse_var("LOG_FORMAT", &format)?;
        }

        Ok(config)
    }
}

fn parse_var<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn positive(var: &'static str, value: &str) -> Result<i64, ConfigError> {
    let n: i64 = parse_var(var, value)?;
    if n <= 0 {
        return Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(n)
}
