use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub cors_origins: Vec<String>,
    pub app_name: String,
    pub app_version: String,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: std::env::var("SECRET_KEY").context("SECRET_KEY is not set")?,
            algorithm: std::env::var("ALGORITHM").unwrap_or_else(|_| "HS256".into()),
            ttl_minutes: parse_var(
                "ACCESS_TOKEN_EXPIRE_MINUTES",
                std::env::var("ACCESS_TOKEN_EXPIRE_MINUTES").ok(),
                60 * 24,
            )?,
        };
        let cors_origins = parse_origins(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        );
        Ok(Self {
            database_url,
            jwt,
            cors_origins,
            app_name: std::env::var("APP_NAME").unwrap_or_else(|_| "Pulse Social Media API".into()),
            app_version: std::env::var("APP_VERSION").unwrap_or_else(|_| "1.0.0".into()),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_var("APP_PORT", std::env::var("APP_PORT").ok(), 8000)?,
        })
    }
}

/// Parses an optional variable, falling back to `default` only when it is unset.
fn parse_var<T>(name: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(v) => v
            .trim()
            .parse()
            .with_context(|| format!("{name} is not a valid value: {v:?}")),
        None => Ok(default),
    }
}

/// Splits a comma-separated origin list, dropping blanks.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}
