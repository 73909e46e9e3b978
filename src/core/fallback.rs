use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::core::normalizer::normalize_within;
use crate::core::rate_limiter::RateLimiter;
use crate::error::PipelineError;
use crate::fetcher::{DataSource, DateRange, ProviderId};
use crate::models::CanonicalSeries;

/// One entry in a chain: a provider plus the id that provider uses for the series.
#[derive(Clone)]
pub struct SourceLink {
    pub source: Arc<dyn DataSource>,
    pub series_id: String,
}

impl SourceLink {
    pub fn new(source: Arc<dyn DataSource>, series_id: impl Into<String>) -> Self {
        Self {
            source,
            series_id: series_id.into(),
        }
    }
}

/// Successful resolution with the provider that served it and what failed before it.
#[derive(Debug)]
pub struct Resolved {
    pub series: CanonicalSeries,
    pub provider: ProviderId,
    pub failures: Vec<PipelineError>,
}

/// Ordered list of alternative sources for one logical series.
///
/// Links are tried strictly in order, once each; the first one whose output
/// normalizes to a non-empty series wins and later links are never called.
pub struct FallbackChain {
    series: String,
    links: Vec<SourceLink>,
    timeout: Duration,
    limiter: RateLimiter,
}

impl FallbackChain {
    pub fn new(series: impl Into<String>, links: Vec<SourceLink>, timeout: Duration, limiter: RateLimiter) -> Self {
        Self {
            series: series.into(),
            links,
            timeout,
            limiter,
        }
    }

    pub fn series(&self) -> &str {
        &self.series
    }

    pub async fn resolve(&self, range: &DateRange) -> Result<Resolved, PipelineError> {
        let mut failures = Vec::new();

        for link in &self.links {
            let provider = link.source.id();
            self.limiter.wait(provider).await;

            match self.attempt(link, range).await {
                Ok(series) => {
                    if failures.is_empty() {
                        info!(series = %self.series, %provider, points = series.len(), "resolved");
                    } else {
                        info!(
                            series = %self.series,
                            %provider,
                            points = series.len(),
                            failed_attempts = failures.len(),
                            "resolved after fallback"
                        );
                    }
                    return Ok(Resolved { series, provider, failures });
                }
                Err(error) if error.is_recoverable() => {
                    warn!(series = %self.series, %provider, kind = error.kind(), %error, "source failed, trying next");
                    failures.push(error);
                }
                Err(error) => return Err(error),
            }
        }

        Err(PipelineError::NoDataAvailable {
            series: self.series.clone(),
            indicators: Vec::new(),
        })
    }

    async fn attempt(&self, link: &SourceLink, range: &DateRange) -> Result<CanonicalSeries, PipelineError> {
        let provider = link.source.id();
        let source_failure = |reason: String| PipelineError::SourceFailure {
            provider: provider.to_string(),
            series: link.series_id.clone(),
            reason,
        };

        let raw = match timeout(self.timeout, link.source.fetch_data(&link.series_id, range)).await {
            Ok(Ok(rows)) => rows,
            Ok(Err(e)) => return Err(source_failure(format!("{e:#}"))),
            Err(_) => return Err(source_failure(format!("timed out after {:?}", self.timeout))),
        };

        // Normalization failures are reported against the logical series, not the provider id.
        normalize_within(&self.series, &raw, range)
    }
}
