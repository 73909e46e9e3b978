use async_trait::async_trait;
use crate::models::{RawObservation, RawValue};
use super::{build_client, looks_like_html, DataSource, DateRange, ProviderId};
use anyhow::{Result, anyhow};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

const BASE_URL: &str = "https://cdn.cboe.com/api/global/us_indices/daily_prices";

/// Official CBOE index history CSV. Authoritative but slow and large.
pub struct CboeFetcher {
    client: Client,
}

impl CboeFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
        })
    }
}

#[async_trait]
impl DataSource for CboeFetcher {
    fn id(&self) -> ProviderId {
        ProviderId::Cboe
    }

    async fn fetch_data(&self, index: &str, _range: &DateRange) -> Result<Vec<RawObservation>> {
        let url = format!("{}/{}_History.csv", BASE_URL, index.to_uppercase());
        debug!(%url, "CBOE fetching");

        let resp = self.client.get(&url).send().await?;

        if !resp.status().is_success() {
            return Err(anyhow!("CBOE error for {}: {}", index, resp.status()));
        }

        let body = resp.text().await?;
        Self::parse_csv(&body)
    }
}

impl CboeFetcher {
    /// Header names vary in case and padding (`DATE`, ` Close`), dates are `MM/DD/YYYY`.
    fn parse_csv(body: &str) -> Result<Vec<RawObservation>> {
        let text = body.trim();
        if text.is_empty() || looks_like_html(text) {
            return Err(anyhow!("CBOE returned an empty or HTML body"));
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
        let (Some(date_idx), Some(close_idx)) = (find("date"), find("close")) else {
            return Err(anyhow!("CBOE CSV is missing DATE/CLOSE columns: {:?}", headers));
        };

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let Some(date) = record.get(date_idx) else {
                continue;
            };
            let value = record
                .get(close_idx)
                .filter(|close| !close.is_empty())
                .map(|close| RawValue::Text(close.to_string()))
                .unwrap_or(RawValue::Missing);
            rows.push(RawObservation::new(date, value));
        }

        if rows.is_empty() {
            return Err(anyhow!("CBOE CSV contained no data rows"));
        }

        Ok(rows)
    }
}
