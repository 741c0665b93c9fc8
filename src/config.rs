use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub outbox_queue_size: usize,
    pub push_feed_buffer: usize,
    pub notify_retry_delay_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            outbox_queue_size: parse_or_default("OUTBOX_QUEUE_SIZE", 1024)?,
            push_feed_buffer: parse_or_default("PUSH_FEED_BUFFER", 1024)?,
            notify_retry_delay_ms: parse_or_default("NOTIFY_RETRY_DELAY_MS", 1000)?,
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
