use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use std::fmt;
use std::time::Duration;

use crate::models::RawObservation;

pub mod cboe;
pub mod fred;
pub mod stooq;

/// Inclusive observation window requested from every provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Window ending at `end` and reaching back `days` calendar days,
    /// clamped to the earliest representable date.
    pub fn lookback(end: NaiveDate, days: u32) -> Self {
        Self {
            start: end.checked_sub_days(Days::new(u64::from(days))).unwrap_or(NaiveDate::MIN),
            end,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Upstream providers the registry can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    Fred,
    Stooq,
    Cboe,
}

impl ProviderId {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fred => "fred",
            Self::Stooq => "stooq",
            Self::Cboe => "cboe",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fetch capability for one upstream provider.
///
/// Any transport error, non-success status, or empty/malformed body must come
/// back as `Err`; the fallback chain decides what happens next.
#[async_trait]
pub trait DataSource: Send + Sync {
    fn id(&self) -> ProviderId;
    async fn fetch_data(&self, series_id: &str, range: &DateRange) -> Result<Vec<RawObservation>>;
}

/// Shared HTTP client: fixed user agent and a hard request timeout.
pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static("MacroPulse/1.0"));

    Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .context("failed to build HTTP client")
}

/// CSV endpoints sometimes answer with an HTML error page and a 200 status.
pub(crate) fn looks_like_html(body: &str) -> bool {
    body.trim_start().starts_with('<')
}
