use std::str::FromStr;
use std::time::Duration;

use crate::store::StoreSettings;

pub const DEFAULT_STORAGE_KEY: &str = "visitorData";
pub const DEFAULT_PRIMARY_LOOKUP_URL: &str = "https://ipapi.co/json/";
pub const DEFAULT_FALLBACK_LOOKUP_URL: &str = "https://api.ipify.org?format=json";
pub const DEFAULT_DISPLAY_LIMIT: usize = 100;

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: String,
    pub preset: Preset,
    pub store: StoreSettings,
    pub refresh_interval_secs: u64,
    /// Rows handed to the presenter. Independent of the retention cap.
    pub display_limit: usize,
    pub primary_lookup_url: String,
    pub fallback_lookup_url: String,
    /// Overrides the user agent synthesized from the host OS.
    pub user_agent: Option<String>,
}

/// Retention/refresh/dedup defaults of the two dashboard variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// 1000 retained visits, 30 s refresh, one-hour per-IP dedup.
    Standard,
    /// 100 retained visits, 5 s refresh, no dedup.
    Lite,
}

impl Preset {
    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim() {
            "" | "standard" => Ok(Self::Standard),
            "lite" => Ok(Self::Lite),
            other => Err(format!("preset must be one of: standard, lite (got {other:?})")),
        }
    }

    pub fn max_retained(self) -> usize {
        match self {
            Self::Standard => 1000,
            Self::Lite => 100,
        }
    }

    pub fn dedup_window_secs(self) -> Option<u64> {
        match self {
            Self::Standard => Some(3600),
            Self::Lite => None,
        }
    }

    pub fn refresh_interval_secs(self) -> u64 {
        match self {
            Self::Standard => 30,
            Self::Lite => 5,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source. `from_env` passes the
    /// process environment; tests pass a fixed map.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let preset = Preset::parse(&var("VISITLOG_PRESET").unwrap_or_default())?;

        let dedup_window_secs = match var("VISITLOG_DEDUP_WINDOW_SECS") {
            Some(raw) => match parse_value::<u64>("VISITLOG_DEDUP_WINDOW_SECS", &raw)? {
                0 => None,
                secs => Some(secs),
            },
            None => preset.dedup_window_secs(),
        };

        let max_retained = parse_or(
            &var,
            "VISITLOG_MAX_RETAINED",
            preset.max_retained(),
        )?;
        if max_retained == 0 {
            return Err("VISITLOG_MAX_RETAINED must be at least 1".to_string());
        }

        let refresh_interval_secs = parse_or(
            &var,
            "VISITLOG_REFRESH_INTERVAL_SECS",
            preset.refresh_interval_secs(),
        )?;
        if refresh_interval_secs == 0 {
            return Err("VISITLOG_REFRESH_INTERVAL_SECS must be at least 1".to_string());
        }

        Ok(Self {
            data_dir: var("VISITLOG_DATA_DIR").unwrap_or_else(|| "./data".to_string()),
            preset,
            store: StoreSettings {
                storage_key: var("VISITLOG_STORAGE_KEY")
                    .unwrap_or_else(|| DEFAULT_STORAGE_KEY.to_string()),
                max_retained,
                dedup_window_secs,
            },
            refresh_interval_secs,
            display_limit: parse_or(&var, "VISITLOG_DISPLAY_LIMIT", DEFAULT_DISPLAY_LIMIT)?,
            primary_lookup_url: var("VISITLOG_PRIMARY_LOOKUP_URL")
                .unwrap_or_else(|| DEFAULT_PRIMARY_LOOKUP_URL.to_string()),
            fallback_lookup_url: var("VISITLOG_FALLBACK_LOOKUP_URL")
                .unwrap_or_else(|| DEFAULT_FALLBACK_LOOKUP_URL.to_string()),
            user_agent: var("VISITLOG_USER_AGENT").filter(|ua| !ua.trim().is_empty()),
        })
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| format!("invalid {name}: {e}"))
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) => parse_value(name, &raw),
        None => Ok(default),
    }
}
