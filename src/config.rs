//! Service settings, read from the environment (and a `.env` file when present).

use chrono::FixedOffset;
use std::{env, path::PathBuf, str::FromStr};

use crate::logging::{LogConfig, LogLevel, LogLevels};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub dev: bool,
    pub host: String,
    pub port: u16,
    /// Prefix of every route, e.g. `/api/sample`
    pub base_url: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub log: LogConfig,
    /// Offset used to stamp user ids with the local year and month
    pub local_offset: FixedOffset,
}

fn parse<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
        }),
    }
}

impl Settings {
    /// Load `.env`, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from `lookup`, falling back to defaults for unset keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let dev = lookup("APP_DEV")
            .map(|raw| parse_bool("APP_DEV", &raw))
            .transpose()?
            .unwrap_or(false);

        let level = |key: &'static str, default: Option<LogLevel>| -> Result<Option<LogLevel>, ConfigError> {
            match lookup(key) {
                Some(raw) => LogLevel::parse_optional(&raw).map_err(|_| ConfigError::Invalid { key, value: raw }),
                None => Ok(default),
            }
        };
        let levels = LogLevels {
            console: level(
                "LOG_LEVEL",
                Some(if dev { LogLevel::Debug } else { LogLevel::Info }),
            )?,
            project: level("LOG_FILE_LEVEL", Some(LogLevel::Success))?,
            access_console: level("LOG_ACCESS_CONSOLE", Some(LogLevel::Info))?,
            access_file: level("LOG_ACCESS_FILE", Some(LogLevel::Info))?,
        };

        let offset_hours: i32 = lookup("LOCAL_UTC_OFFSET_HOURS")
            .map(|raw| parse("LOCAL_UTC_OFFSET_HOURS", &raw))
            .transpose()?
            .unwrap_or(8);
        let local_offset = offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| ConfigError::Invalid {
                key: "LOCAL_UTC_OFFSET_HOURS",
                value: offset_hours.to_string(),
            })?;

        let base_url = lookup("HTTP_BASE_URL").unwrap_or_else(|| "/api/sample".to_string());
        if !base_url.is_empty() && !base_url.starts_with('/') {
            return Err(ConfigError::Invalid {
                key: "HTTP_BASE_URL",
                value: base_url,
            });
        }

        Ok(Self {
            dev,
            host: lookup("HTTP_API_LISTEN_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: lookup("HTTP_API_LISTEN_PORT")
                .map(|raw| parse("HTTP_API_LISTEN_PORT", &raw))
                .transpose()?
                .unwrap_or(8080),
            base_url: base_url.trim_end_matches('/').to_string(),
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| "sqlite::memory:".to_string()),
            database_max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                .map(|raw| parse("DATABASE_MAX_CONNECTIONS", &raw))
                .transpose()?
                .unwrap_or(10),
            log: LogConfig {
                levels,
                log_dir: Some(PathBuf::from(
                    lookup("LOG_FILE_PATH").unwrap_or_else(|| "logs".to_string()),
                )),
            },
            local_offset,
        })
    }

    /// `host:port` to bind the listener to
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
