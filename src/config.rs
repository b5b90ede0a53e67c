use crate::clock::SystemClock;
use crate::errors::ConfigError;
use crate::stats::WeeklyWindow;
use chrono::FixedOffset;
use std::{env, path::PathBuf, time::Duration};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_PATH: &str = "data/state.json";
const DEFAULT_STORE_TIMEOUT_MS: u64 = 2000;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_path: PathBuf,
    pub store_timeout: Duration,
    /// `None` keeps the server's local date.
    pub utc_offset: Option<FixedOffset>,
    pub weekly_window: WeeklyWindow,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT") {
            Some(value) => value
                .parse::<u16>()
                .map_err(|source| ConfigError::InvalidPort {
                    value: value.clone(),
                    source,
                })?,
            None => DEFAULT_PORT,
        };

        let data_path = lookup("APP_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH));

        let store_timeout = match lookup("STORE_TIMEOUT_MS") {
            Some(value) => value
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .ok_or_else(|| ConfigError::InvalidStoreTimeout(value.clone()))?,
            None => Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
        };

        let utc_offset = match lookup("LEDGER_UTC_OFFSET_MINUTES") {
            Some(value) => Some(parse_offset(&value)?),
            None => None,
        };

        let weekly_window = match lookup("WEEKLY_WINDOW") {
            Some(value) => value.parse().map_err(ConfigError::InvalidWeeklyWindow)?,
            None => WeeklyWindow::default(),
        };

        Ok(Self {
            port,
            data_path,
            store_timeout,
            utc_offset,
            weekly_window,
        })
    }

    pub fn clock(&self) -> SystemClock {
        match self.utc_offset {
            Some(offset) => SystemClock::with_offset(offset),
            None => SystemClock::local(),
        }
    }
}

fn parse_offset(value: &str) -> Result<FixedOffset, ConfigError> {
    value
        .trim()
        .parse::<i32>()
        .ok()
        .and_then(|minutes| minutes.checked_mul(60))
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| ConfigError::InvalidUtcOffset(value.to_string()))
}
