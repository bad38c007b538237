use std::env;

use chrono::{FixedOffset, Offset, Utc};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_access_token_expiry_secs: i64,
    pub jwt_refresh_token_expiry_secs: i64,
    /// Allowed CORS origins, parsed from a comma-separated `FRONTEND_URL`.
    pub frontend_urls: Vec<String>,
    /// Offset from UTC that defines where a business day starts and ends.
    pub business_utc_offset_minutes: i32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10),
            host: env::var("BACKEND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("BACKEND_PORT", 8080),
            jwt_secret: env::var("JWT_SECRET")?,
            jwt_access_token_expiry_secs: parse_or("JWT_ACCESS_TOKEN_EXPIRY_SECS", 86400),
            jwt_refresh_token_expiry_secs: parse_or("JWT_REFRESH_TOKEN_EXPIRY_SECS", 604800),
            frontend_urls: split_origins(
                &env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string()),
            ),
            business_utc_offset_minutes: parse_or("BUSINESS_UTC_OFFSET_MINUTES", 0),
        })
    }

    /// Timezone used for "today" bucketing. Out-of-range offsets fall back to UTC.
    pub fn business_offset(&self) -> FixedOffset {
        self.business_utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
