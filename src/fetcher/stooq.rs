use async_trait::async_trait;
use crate::models::{RawObservation, RawValue};
use super::{build_client, looks_like_html, DataSource, DateRange, ProviderId};
use anyhow::{Result, anyhow};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

const BASE_URL: &str = "https://stooq.com/q/d/l/";

/// Stooq daily history download. Fast community mirror, no key required.
pub struct StooqFetcher {
    client: Client,
}

impl StooqFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
        })
    }
}

#[async_trait]
impl DataSource for StooqFetcher {
    fn id(&self) -> ProviderId {
        ProviderId::Stooq
    }

    async fn fetch_data(&self, symbol: &str, _range: &DateRange) -> Result<Vec<RawObservation>> {
        debug!(symbol, "Stooq fetching");

        // Stooq ignores date parameters on this endpoint; the chain clips to the window.
        let resp = self
            .client
            .get(BASE_URL)
            .query(&[("s", symbol), ("i", "d")])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(anyhow!("Stooq error for {}: {}", symbol, resp.status()));
        }

        let body = resp.text().await?;
        Self::parse_csv(&body)
    }
}

impl StooqFetcher {
    /// Accepts both the headered export (`Date,Open,High,Low,Close[,Volume]`)
    /// and the occasional headerless variant with the same column order.
    fn parse_csv(body: &str) -> Result<Vec<RawObservation>> {
        let text = body.trim();
        if text.is_empty() || looks_like_html(text) {
            return Err(anyhow!("Stooq returned an empty or HTML body"));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let mut records = reader.records();
        let first = records
            .next()
            .ok_or_else(|| anyhow!("Stooq CSV has no rows"))??;

        let header = first.iter().map(|h| h.to_ascii_lowercase()).collect::<Vec<_>>();
        let (date_idx, close_idx, first_data) = match (
            header.iter().position(|h| h == "date"),
            header.iter().position(|h| h == "close"),
        ) {
            (Some(d), Some(c)) => (d, c, None),
            // Headerless: Date, Open, High, Low, Close, Volume
            _ => (0, 4, Some(first)),
        };

        let mut rows = Vec::new();
        for record in first_data.into_iter().map(Ok).chain(records) {
            let record = record?;
            let Some(date) = record.get(date_idx) else {
                continue;
            };
            let value = match record.get(close_idx) {
                Some(close) if !close.is_empty() => RawValue::Text(close.to_string()),
                _ => RawValue::Missing,
            };
            rows.push(RawObservation::new(date, value));
        }

        if rows.is_empty() {
            return Err(anyhow!("Stooq CSV had a header but no data rows"));
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_headered_csv() {
        let body = "Date,Open,High,Low,Close,Volume\n\
                    2024-01-02,13.2,14.1,13.0,13.2,0\n\
                    2024-01-03,13.5,14.6,13.4,14.04,0\n";

        let rows = StooqFetcher::parse_csv(body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], RawObservation::text("2024-01-03", "14.04"));
    }

    #[test]
    fn test_parse_headerless_csv() {
        let body = "2024-01-02,13.2,14.1,13.0,13.2,0\n2024-01-03,13.5,14.6,13.4,14.04,0";

        let rows = StooqFetcher::parse_csv(body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], RawObservation::text("2024-01-02", "13.2"));
    }

    #[test]
    fn test_parse_short_row_keeps_missing_value() {
        let body = "Date,Open,High,Low,Close\n2024-01-02,13.2\n";
        let rows = StooqFetcher::parse_csv(body).unwrap();
        assert_eq!(rows[0].value, RawValue::Missing);
    }

    #[test]
    fn test_rejects_html_and_empty_bodies() {
        assert!(StooqFetcher::parse_csv("<html><body>Exceeded the daily hits limit</body></html>").is_err());
        assert!(StooqFetcher::parse_csv("   ").is_err());
        assert!(StooqFetcher::parse_csv("Date,Open,High,Low,Close\n").is_err());
    }
}
