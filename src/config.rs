use std::{fmt::Display, net::SocketAddr, str::FromStr};

use anyhow::{Context, anyhow};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::info;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://convite.db?mode=rwc";
pub const DEFAULT_EVENT_AT: &str = "2026-01-24T16:00:00-03:00";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub bind_addr: SocketAddr,
    pub event_at: OffsetDateTime,
    pub cors_origin: Option<String>,
}

impl Config {
    /// Reads the environment, after loading `.env` if one exists.
    pub fn load() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let event_at = or_default(&lookup, "EVENT_AT", DEFAULT_EVENT_AT);
        let event_at = OffsetDateTime::parse(&event_at, &Rfc3339)
            .with_context(|| format!("EVENT_AT must be an RFC 3339 instant, got {event_at}"))?;

        Ok(Self {
            database_url: or_default(&lookup, "DATABASE_URL", DEFAULT_DATABASE_URL),
            max_connections: parse(&lookup, "DATABASE_MAX_CONNECTIONS", "16")?,
            bind_addr: parse(&lookup, "BIND_ADDR", "0.0.0.0:8080")?,
            event_at,
            cors_origin: lookup("CORS_ORIGIN").filter(|origin| !origin.is_empty()),
        })
    }
}

fn or_default(lookup: impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn parse<T: FromStr>(lookup: impl Fn(&str) -> Option<String>, key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = or_default(lookup, key, default);
    raw.parse()
        .map_err(|e| anyhow!("invalid {key} value {raw:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use time::macros::datetime;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config(&[]).unwrap();

        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.max_connections, 16);
        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.event_at, datetime!(2026-01-24 16:00 -3));
        assert_eq!(config.cors_origin, None);
    }

    #[test]
    fn reads_overrides() {
        let config = config(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("DATABASE_MAX_CONNECTIONS", "1"),
            ("BIND_ADDR", "127.0.0.1:3000"),
            ("EVENT_AT", "2026-02-01T10:30:00Z"),
            ("CORS_ORIGIN", "https://convite.example"),
        ])
        .unwrap();

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.max_connections, 1);
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.event_at, datetime!(2026-02-01 10:30 UTC));
        assert_eq!(config.cors_origin.as_deref(), Some("https://convite.example"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(config(&[("EVENT_AT", "amanhã")]).is_err());
        assert!(config(&[("BIND_ADDR", "localhost")]).is_err());
        assert!(config(&[("DATABASE_MAX_CONNECTIONS", "-1")]).is_err());
    }
}
