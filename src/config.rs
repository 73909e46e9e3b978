use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Longest accepted lookback, about a century of dailies.
pub const MAX_LOOKBACK_DAYS: u32 = 36_500;
/// Longest accepted base pacing delay.
pub const MAX_PACING_MS: u64 = 60_000;

/// Runtime settings, read from the environment (after `.env` is loaded).
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub fred_api_key: Option<String>,
    pub data_dir: PathBuf,
    pub lookback_days: u32,
    pub http_timeout: Duration,
    pub pacing: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fred_api_key: None,
            data_dir: PathBuf::from("data"),
            lookback_days: 1825, // ~5 years of dailies
            http_timeout: Duration::from_secs(30),
            pacing: Duration::from_millis(250),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from any key lookup. Unset or blank values take the default;
    /// values that are present but do not parse are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let parse_u64 = |key: &str| -> Result<Option<u64>> {
            get(key)
                .map(|raw| raw.parse::<u64>().with_context(|| format!("{key} must be a non-negative integer, got '{raw}'")))
                .transpose()
        };

        let lookback_days = match get("MACRO_PULSE_LOOKBACK_DAYS") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|days| (1..=MAX_LOOKBACK_DAYS).contains(days))
                .with_context(|| {
                    format!("MACRO_PULSE_LOOKBACK_DAYS must be an integer in 1..={MAX_LOOKBACK_DAYS}, got '{raw}'")
                })?,
            None => defaults.lookback_days,
        };

        let http_timeout = match parse_u64("MACRO_PULSE_HTTP_TIMEOUT_SECS")? {
            Some(0) => anyhow::bail!("MACRO_PULSE_HTTP_TIMEOUT_SECS must be greater than zero"),
            Some(secs) => Duration::from_secs(secs),
            None => defaults.http_timeout,
        };

        let pacing = match parse_u64("MACRO_PULSE_PACING_MS")? {
            Some(ms) if ms > MAX_PACING_MS => {
                anyhow::bail!("MACRO_PULSE_PACING_MS must be at most {MAX_PACING_MS}, got {ms}")
            }
            Some(ms) => Duration::from_millis(ms),
            None => defaults.pacing,
        };

        Ok(Self {
            fred_api_key: get("FRED_API_KEY"),
            data_dir: get("MACRO_PULSE_DATA_DIR").map(PathBuf::from).unwrap_or(defaults.data_dir),
            lookback_days,
            http_timeout,
            pacing,
        })
    }

    /// Applies the `--out-dir` flag, which takes precedence over `MACRO_PULSE_DATA_DIR`.
    pub fn with_out_dir(mut self, out_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = out_dir {
            self.data_dir = dir;
        }
        self
    }
}
