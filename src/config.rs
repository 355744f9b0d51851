use std::env;
use std::time::Duration;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub log_json: bool,
    pub scheduler_interval_secs: u64,
    pub event_buffer_size: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let config = Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_json: parse_or_default("LOG_JSON", false)?,
            scheduler_interval_secs: parse_or_default("SCHEDULER_INTERVAL_SECS", 300)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
        };

        if config.scheduler_interval_secs == 0 {
            return Err(AppError::Internal(
                "SCHEDULER_INTERVAL_SECS must be > 0".to_string(),
            ));
        }
        if config.event_buffer_size == 0 {
            return Err(AppError::Internal("EVENT_BUFFER_SIZE must be > 0".to_string()));
        }

        Ok(config)
    }

    pub fn scheduler_interval(&self) -> Duration {
        Duration::from_secs(self.scheduler_interval_secs)
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
