use async_trait::async_trait;
use crate::models::{RawObservation, RawValue};
use super::{build_client, DataSource, DateRange, ProviderId};
use anyhow::{Result, anyhow};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const BASE_URL: &str = "https://api.stlouisfed.org/fred/series/observations";

pub struct FredFetcher {
    api_key: String,
    client: Client,
}

impl FredFetcher {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            api_key,
            client: build_client(timeout)?,
        })
    }
}

#[async_trait]
impl DataSource for FredFetcher {
    fn id(&self) -> ProviderId {
        ProviderId::Fred
    }

    async fn fetch_data(&self, series_id: &str, range: &DateRange) -> Result<Vec<RawObservation>> {
        // FRED keys are 32 lowercase alphanumerics; stray whitespace is common in .env files.
        let sanitized_key = self.api_key.trim().to_lowercase();

        debug!(series_id, key_len = sanitized_key.len(), "FRED fetching");

        if sanitized_key.is_empty() {
            return Err(anyhow!("FRED API key is empty or missing"));
        }

        if sanitized_key.len() != 32 {
            warn!(key_len = sanitized_key.len(), "FRED API key length is not 32, request will likely fail");
        }

        let start = range.start.format("%Y-%m-%d").to_string();
        let end = range.end.format("%Y-%m-%d").to_string();

        let resp = self
            .client
            .get(BASE_URL)
            .query(&[
                ("series_id", series_id),
                ("api_key", sanitized_key.as_str()),
                ("file_type", "json"),
                ("observation_start", start.as_str()),
                ("observation_end", end.as_str()),
            ])
            .send()
            .await
            // The request URL carries the key.
            .map_err(reqwest::Error::without_url)?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("FRED API error for {}: {} - Body: {}", series_id, status, error_text));
        }

        let json: Value = resp.json().await.map_err(reqwest::Error::without_url)?;
        Self::parse_observations(&json)
    }
}

impl FredFetcher {
    fn parse_observations(json: &Value) -> Result<Vec<RawObservation>> {
        let observations = json["observations"]
            .as_array()
            .ok_or_else(|| anyhow!("No observations found in FRED response"))?;

        // "date": "2023-01-01", "value": "123.45" (or "." for a missing print).
        // Value coercion is left to the normalizer.
        let rows = observations
            .iter()
            .filter_map(|obs| {
                let date = obs["date"].as_str()?;
                let value = match &obs["value"] {
                    Value::String(text) => RawValue::Text(text.clone()),
                    Value::Number(num) => num.as_f64().map(RawValue::Number).unwrap_or(RawValue::Missing),
                    _ => RawValue::Missing,
                };
                Some(RawObservation::new(date, value))
            })
            .collect::<Vec<_>>();

        if rows.is_empty() {
            return Err(anyhow!("FRED response contained zero observations"));
        }

        Ok(rows)
    }
}
