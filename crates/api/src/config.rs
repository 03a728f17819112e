//! Process configuration read from the environment.

use core::str::FromStr;

use thiserror::Error;
use tracing::warn;

use maintops_events::DEFAULT_RECENT_LIMIT;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// `MAINTOPS_BIND`
    pub bind: String,
    /// `DATABASE_URL`; absent means in-memory stores.
    pub database_url: Option<String>,
    /// `MAINTOPS_SESSION_TTL_SECS`; absent means sessions never expire.
    pub session_ttl_secs: Option<u64>,
    /// `MAINTOPS_ADMIN_PASSWORD`, used only when the first admin is seeded.
    pub admin_password: String,
    /// `MAINTOPS_SEED_DEMO`
    pub seed_demo: bool,
    /// `MAINTOPS_EVENTS_LIMIT`, the events feed size when the request gives none.
    pub events_limit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            database_url: None,
            session_ttl_secs: None,
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            seed_demo: false,
            events_limit: DEFAULT_RECENT_LIMIT,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let admin_password = match get("MAINTOPS_ADMIN_PASSWORD") {
            Some(v) => v,
            None => {
                warn!("MAINTOPS_ADMIN_PASSWORD not set; the seeded admin uses an insecure default");
                defaults.admin_password
            }
        };

        Ok(Self {
            bind: get("MAINTOPS_BIND").unwrap_or(defaults.bind),
            database_url: get("DATABASE_URL"),
            session_ttl_secs: get("MAINTOPS_SESSION_TTL_SECS")
                .map(|v| parse("MAINTOPS_SESSION_TTL_SECS", &v))
                .transpose()?,
            admin_password,
            seed_demo: get("MAINTOPS_SEED_DEMO")
                .map(|v| parse_bool("MAINTOPS_SEED_DEMO", &v))
                .transpose()?
                .unwrap_or(defaults.seed_demo),
            events_limit: get("MAINTOPS_EVENTS_LIMIT")
                .map(|v| parse("MAINTOPS_EVENTS_LIMIT", &v))
                .transpose()?
                .unwrap_or(defaults.events_limit),
        })
    }
}

fn parse<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        }),
    }
}
