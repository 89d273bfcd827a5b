use anyhow::{anyhow, Result};
use std::net::SocketAddr;
use std::str::FromStr;

use crate::infra::weather::DEFAULT_WEATHER_API_URL;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub app_mode: String,
    pub database_url: String,
    pub redis_url: String,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
    pub db_idle_timeout_seconds: u64,
    pub db_max_lifetime_seconds: u64,
    pub admin_token: Option<String>,
    /// Checked when a dispatch run starts, not at startup.
    pub weather_api_key: Option<String>,
    pub weather_api_url: String,
    pub email_api_url: String,
    pub email_api_token: String,
    pub email_from: String,
    pub webhook_timeout_seconds: u64,
    pub notifications_accelerated: bool,
    pub dispatch_interval_seconds: u64,
    pub dispatch_lock_ttl_seconds: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:8080");
        let _parsed_http_addr = SocketAddr::from_str(&http_addr)
            .map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;
        let app_mode = env_or("APP_MODE", "api");

        let notifications_accelerated = env_flag("NOTIFICATIONS_ACCELERATED");
        let default_interval = if notifications_accelerated { "60" } else { "3600" };
        let dispatch_interval_seconds: u64 =
            env_or_parse("DISPATCH_INTERVAL_SECONDS", default_interval)?;
        if dispatch_interval_seconds == 0 {
            return Err(anyhow!("invalid DISPATCH_INTERVAL_SECONDS: must be positive"));
        }

        Ok(Self {
            http_addr,
            app_mode,
            database_url: env_or_err("DATABASE_URL")?,
            redis_url: env_or("REDIS_URL", "redis://127.0.0.1/"),
            db_max_connections: env_or_parse("DB_MAX_CONNECTIONS", "10")?,
            db_connect_timeout_seconds: env_or_parse("DB_CONNECT_TIMEOUT_SECONDS", "5")?,
            db_idle_timeout_seconds: env_or_parse("DB_IDLE_TIMEOUT_SECONDS", "300")?,
            db_max_lifetime_seconds: env_or_parse("DB_MAX_LIFETIME_SECONDS", "1800")?,
            admin_token: std::env::var("ADMIN_TOKEN").ok(),
            weather_api_key: std::env::var("OPENWEATHERMAP_API_KEY").ok(),
            weather_api_url: env_or("WEATHER_API_URL", DEFAULT_WEATHER_API_URL),
            email_api_url: env_or_err("EMAIL_API_URL")?,
            email_api_token: env_or_err("EMAIL_API_TOKEN")?,
            email_from: env_or("EMAIL_FROM", "weather@localhost"),
            webhook_timeout_seconds: env_or_parse("WEBHOOK_TIMEOUT_SECONDS", "10")?,
            notifications_accelerated,
            dispatch_interval_seconds,
            dispatch_lock_ttl_seconds: env_or_parse("DISPATCH_LOCK_TTL_SECONDS", "900")?,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_err(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("missing required env var: {}", key))
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|value| is_truthy(&value))
        .unwrap_or(false)
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
