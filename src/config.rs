use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    /// Dispute SLA window in hours; deadlines are sla_due_at = opened + window.
    pub dispute_sla_hours: i64,
    /// Currency assumed when a snapshot request does not name one.
    pub default_currency: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let dispute_sla_hours = env_map
            .get("DISPUTE_SLA_HOURS")
            .map(|s| s.as_str())
            .unwrap_or("72")
            .parse::<i64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "DISPUTE_SLA_HOURS".to_string(),
                    "must be a valid i64".to_string(),
                )
            })?;
        if dispute_sla_hours <= 0 {
            return Err(ConfigError::InvalidValue(
                "DISPUTE_SLA_HOURS".to_string(),
                "must be positive".to_string(),
            ));
        }

        let default_currency = env_map
            .get("DEFAULT_CURRENCY")
            .cloned()
            .unwrap_or_else(|| "TRY".to_string());
        if default_currency.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "DEFAULT_CURRENCY".to_string(),
                "must not be empty".to_string(),
            ));
        }

        Ok(Config {
            port,
            database_path,
            dispute_sla_hours,
            default_currency,
        })
    }
}
