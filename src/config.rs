use std::{fmt::Display, str::FromStr};

use anyhow::{anyhow, Context};

pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_address: String,
    pub port: u16,
    pub public_url: String,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub secure_cookies: bool,
    /// `None` when `SMTP_HOST` is unset.
    pub smtp: Option<SmtpConfig>,
}

pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

impl SmtpConfig {
    fn load() -> anyhow::Result<Option<Self>> {
        let Ok(host) = dotenvy::var("SMTP_HOST") else {
            return Ok(None);
        };
        Ok(Some(Self {
            host,
            port: try_load("SMTP_PORT", "587")?,
            username: required("SMTP_USERNAME")?,
            password: required("SMTP_PASSWORD")?,
            from: required("SMTP_FROM")?,
        }))
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let port = try_load("PORT", "1337")?;
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections: try_load("DATABASE_MAX_CONNECTIONS", "5")?,
            bind_address: try_load("BIND_ADDRESS", "0.0.0.0")?,
            port,
            public_url: dotenvy::var("PUBLIC_URL")
                .unwrap_or_else(|_| format!("http://127.0.0.1:{port}")),
            jwt_secret: required("JWT_SECRET")?,
            token_ttl: chrono::Duration::hours(try_load("TOKEN_TTL_HOURS", "24")?),
            secure_cookies: try_load("SECURE_COOKIES", "false")?,
            smtp: SmtpConfig::load()?,
        })
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    dotenvy::var(key).with_context(|| format!("{key} must be set"))
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    parse_or_default(key, dotenvy::var(key).ok(), default)
}

fn parse_or_default<T: FromStr>(key: &str, value: Option<String>, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let value = value.unwrap_or_else(|| {
        log::info!("{key} not set, using default: {default}");
        default.to_string()
    });
    value
        .parse()
        .map_err(|e| anyhow!("invalid {key} value {value:?}: {e}"))
}
