use std::{net::SocketAddr, str::FromStr};

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub db_max_connections: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = parse_or("PORT", std::env::var("PORT").ok(), 3000)?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://reelbase.db?mode=rwc".to_string());

        let db_max_connections: u32 =
            parse_or("DB_MAX_CONNECTIONS", std::env::var("DB_MAX_CONNECTIONS").ok(), 5)?;

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            db_max_connections,
        })
    }
}

/// Parses `raw` when set, otherwise falls back to `default`. A value that is
/// set but malformed is an error naming `key`.
fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(raw) => raw.trim().parse().with_context(|| format!("{key}={raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_values_fall_back() {
        assert_eq!(parse_or::<u32>("DB_MAX_CONNECTIONS", None, 5).unwrap(), 5);
        assert_eq!(parse_or::<u16>("PORT", Some("8080".into()), 3000).unwrap(), 8080);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = parse_or::<u32>("DB_MAX_CONNECTIONS", Some("ten".into()), 5).unwrap_err();
        assert!(err.to_string().contains("DB_MAX_CONNECTIONS"));

        assert!(parse_or::<u32>("DB_MAX_CONNECTIONS", Some("-1".into()), 5).is_err());
        assert!(parse_or::<u16>("PORT", Some("70000".into()), 3000).is_err());
    }
}
