//! Runtime settings, read once at startup and handed to the app state.

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

const DEFAULT_DATABASE_URL: &str = "sqlite:./companytrack.sqlite?mode=rwc";

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue { key, value } => {
                write!(f, "Invalid value for {}: {:?}", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Per-IP request budget: `burst_size` requests, one replenished every `period_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub period_secs: u64,
    pub burst_size: u32,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// How many companies `recently_founded` returns on the stats endpoints.
    pub recently_founded_limit: u64,
    /// Look-back window for the per-quarter founding counts.
    pub quarter_wise_years: u32,
    /// `None` turns rate limiting off.
    pub rate_limit: Option<RateLimit>,
}

impl Settings {
    /// Reads the process environment (after loading `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from any key lookup; unset keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let bind_addr = parse_or("BIND_ADDR", &lookup, default_bind_addr())?;
        let recently_founded_limit = parse_or("RECENTLY_FOUNDED_LIMIT", &lookup, 10)?;
        let quarter_wise_years = parse_or("QUARTER_WISE_YEARS", &lookup, 5)?;

        let rate_limit = match lookup("RATE_LIMIT_BURST") {
            Some(raw) => {
                let burst_size: u32 = parse_value("RATE_LIMIT_BURST", &raw)?;
                if burst_size == 0 {
                    return Err(ConfigError::InvalidValue { key: "RATE_LIMIT_BURST", value: raw });
                }
                Some(RateLimit {
                    period_secs: parse_or("RATE_LIMIT_PERIOD_SECS", &lookup, 60)?,
                    burst_size,
                })
            }
            None => None,
        };

        Ok(Settings {
            database_url,
            bind_addr,
            recently_founded_limit,
            quarter_wise_years,
            rate_limit,
        })
    }

    /// Defaults pointed at the given database, rate limiting off.
    pub fn for_database(database_url: impl Into<String>) -> Self {
        Settings {
            database_url: database_url.into(),
            bind_addr: default_bind_addr(),
            recently_founded_limit: 10,
            quarter_wise_years: 5,
            rate_limit: None,
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

fn parse_or<T, F>(key: &'static str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = Settings::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(settings.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(settings.bind_addr.to_string(), "127.0.0.1:3000");
        assert_eq!(settings.recently_founded_limit, 10);
        assert_eq!(settings.quarter_wise_years, 5);
        assert!(settings.rate_limit.is_none());
    }

    #[test]
    fn test_overrides_and_rate_limit() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/companies"),
            ("BIND_ADDR", "0.0.0.0:8080"),
            ("QUARTER_WISE_YEARS", "20"),
            ("RATE_LIMIT_BURST", "10"),
        ]))
        .unwrap();
        assert_eq!(settings.database_url, "postgres://localhost/companies");
        assert_eq!(settings.bind_addr.port(), 8080);
        assert_eq!(settings.quarter_wise_years, 20);
        assert_eq!(settings.rate_limit, Some(RateLimit { period_secs: 60, burst_size: 10 }));
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let err = Settings::from_lookup(lookup_from(&[("RECENTLY_FOUNDED_LIMIT", "ten")])).unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for RECENTLY_FOUNDED_LIMIT: \"ten\"");

        let err = Settings::from_lookup(lookup_from(&[("RATE_LIMIT_BURST", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "RATE_LIMIT_BURST", .. }));
    }
}
