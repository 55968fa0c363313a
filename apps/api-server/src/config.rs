//! Application configuration loaded from environment variables.

use std::env;
use std::str::FromStr;

use quill_infra::database::DatabaseConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// `None` runs the server on in-memory repositories.
    pub database: Option<DatabaseConfig>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Token and rate-limit settings are read by their services
    /// (`JwtConfig::from_env`, `RateLimitConfig::from_env`).
    pub fn from_env() -> Self {
        let database = env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .map(|url| {
                let mut config = DatabaseConfig::new(url);
                config.max_connections = parse_var("DB_MAX_CONNECTIONS", config.max_connections);
                config.min_connections = parse_var("DB_MIN_CONNECTIONS", config.min_connections);
                config
            });

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT", 8080),
            database,
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
