use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::Settings;
use crate::core::fallback::{FallbackChain, SourceLink};
use crate::core::rate_limiter::RateLimiter;
use crate::core::snapshot::{assemble, ReadingDocument, Snapshot};
use crate::core::timeseries::align_outer;
use crate::error::PipelineError;
use crate::fetcher::cboe::CboeFetcher;
use crate::fetcher::fred::FredFetcher;
use crate::fetcher::stooq::StooqFetcher;
use crate::fetcher::{DataSource, DateRange, ProviderId};
use crate::indicators::registry::{Registry, Role, SeriesMetadata};
use crate::models::{CanonicalSeries, DerivedSeries, IndicatorReading};
use crate::sink::ArtifactSink;

pub const YIELD_CURVE: &str = "yield_curve";
pub const VIX_SNAPSHOT: &str = "vix_snapshot";

/// The providers available to a run, one per [`ProviderId`].
#[derive(Default, Clone)]
pub struct SourceSet {
    sources: HashMap<ProviderId, Arc<dyn DataSource>>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `source` under its own id, replacing any previous one.
    pub fn with(mut self, source: Arc<dyn DataSource>) -> Self {
        self.sources.insert(source.id(), source);
        self
    }

    /// Real HTTP providers. Without a FRED key the FRED links fail on every
    /// attempt, which leaves Stooq and CBOE able to serve VIX.
    pub fn live(settings: &Settings) -> anyhow::Result<Self> {
        let fred_key = settings.fred_api_key.clone().unwrap_or_default();
        Ok(Self::new()
            .with(Arc::new(FredFetcher::new(fred_key, settings.http_timeout)?))
            .with(Arc::new(StooqFetcher::new(settings.http_timeout)?))
            .with(Arc::new(CboeFetcher::new(settings.http_timeout)?)))
    }

    pub fn get(&self, provider: ProviderId) -> Option<Arc<dyn DataSource>> {
        self.sources.get(&provider).cloned()
    }

    fn chain_for(&self, series: &SeriesMetadata, timeout: Duration, limiter: RateLimiter) -> FallbackChain {
        let links = series
            .sources
            .iter()
            .filter_map(|s| match self.get(s.provider) {
                Some(source) => Some(SourceLink::new(source, s.symbol.clone())),
                None => {
                    debug!(series = %series.key, provider = %s.provider, "provider not configured, skipping link");
                    None
                }
            })
            .collect();

        FallbackChain::new(series.key.clone(), links, timeout, limiter)
    }
}

/// Outcome of a successful run.
#[derive(Debug)]
pub struct RunReport {
    pub snapshot: Snapshot,
    /// Which provider served each input series.
    pub providers: BTreeMap<String, ProviderId>,
    /// Source attempts that failed before a later link succeeded.
    pub failed_attempts: usize,
}

pub struct Pipeline {
    sources: SourceSet,
    range: DateRange,
    as_of: NaiveDate,
    timeout: Duration,
    limiter: RateLimiter,
}

impl Pipeline {
    pub fn new(sources: SourceSet, settings: &Settings, as_of: NaiveDate) -> Self {
        Self {
            sources,
            range: DateRange::lookback(as_of, settings.lookback_days),
            as_of,
            timeout: settings.http_timeout,
            limiter: RateLimiter::new(settings.pacing),
        }
    }

    /// Fetch every series, derive, classify, and write all artifacts.
    ///
    /// Series artifacts are written as each series resolves. `summary.json`
    /// and the documents that depend on it are written only once every
    /// indicator has a reading; any failure before that leaves the previous
    /// summary in place.
    pub async fn run(&self, sink: &dyn ArtifactSink) -> Result<RunReport, PipelineError> {
        Registry::validate()?;

        info!(as_of = %self.as_of, start = %self.range.start, end = %self.range.end, "pipeline run starting");

        // 1. Resolve every input series through its fallback chain
        let mut resolved: BTreeMap<String, CanonicalSeries> = BTreeMap::new();
        let mut providers = BTreeMap::new();
        let mut failed_attempts = 0;

        for series in Registry::all_series() {
            debug!(series = %series.key, name = %series.name, links = series.sources.len(), "resolving");

            let chain = self.sources.chain_for(series, self.timeout, self.limiter);
            let outcome = chain.resolve(&self.range).await.map_err(|e| match e {
                PipelineError::NoDataAvailable { series, .. } => PipelineError::NoDataAvailable {
                    indicators: Registry::dependents(&series).into_iter().map(String::from).collect(),
                    series,
                },
                other => other,
            })?;

            sink.write_series(&series.key, outcome.series.points())?;

            failed_attempts += outcome.failures.len();
            providers.insert(series.key.clone(), outcome.provider);
            resolved.insert(series.key.clone(), outcome.series);
        }

        // 2. Derive and classify
        let mut readings = Vec::new();
        let mut derived_series = Vec::new();

        for ind in Registry::all_indicators() {
            let (date, value) = match &ind.role {
                Role::Raw { series } => {
                    let latest = resolved
                        .get(series)
                        .ok_or_else(|| PipelineError::UnknownSeries { series: series.clone() })?
                        .latest();
                    (latest.date, latest.value)
                }
                Role::Derived => {
                    let derived = self.derive(&ind.key, &resolved)?;
                    let latest = *derived.latest()?;
                    sink.write_series(derived.id(), derived.points())?;
                    derived_series.push(derived);
                    (latest.date, latest.value)
                }
            };

            let light = ind.rule.classify(value);
            info!(indicator = %ind.key, name = %ind.name, %date, value, %light, "classified");

            readings.push(IndicatorReading {
                indicator: ind.key.clone(),
                date,
                value,
                light,
            });
        }

        // 3. Assemble, then publish
        let snapshot = assemble(self.as_of, &Registry::indicator_keys(), readings)?;
        sink.write_summary(&snapshot.to_document())?;

        sink.write_document(YIELD_CURVE, &yield_curve_document(&derived_series))?;
        if let Some(vix) = snapshot.get("VIX") {
            sink.write_document(VIX_SNAPSHOT, &serde_json::to_value(ReadingDocument::from(vix))?)?;
        }

        info!(
            indicators = snapshot.len(),
            failed_attempts,
            "pipeline run complete"
        );

        Ok(RunReport {
            snapshot,
            providers,
            failed_attempts,
        })
    }

    fn derive(&self, key: &str, resolved: &BTreeMap<String, CanonicalSeries>) -> Result<DerivedSeries, PipelineError> {
        let calculator = Registry::get_calculator(key).ok_or_else(|| PipelineError::UnknownIndicator {
            indicator: key.to_string(),
        })?;

        let inputs = calculator
            .required_inputs()
            .into_iter()
            .map(|input| {
                resolved.get(input).ok_or_else(|| PipelineError::UnknownSeries {
                    series: input.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        calculator.calculate(&inputs)
    }
}

/// One row per date in the union of the spreads, with a field only for the spreads that have that date.
fn yield_curve_document(spreads: &[DerivedSeries]) -> Value {
    let refs: Vec<&DerivedSeries> = spreads.iter().collect();

    let rows = align_outer(&refs)
        .into_iter()
        .map(|(date, values)| {
            let mut row = Map::new();
            row.insert("date".to_string(), Value::String(date.to_string()));
            for (series, value) in refs.iter().zip(values) {
                if let Some(v) = value {
                    row.insert(series.id().to_string(), Value::from(v));
                }
            }
            Value::Object(row)
        })
        .collect();

    Value::Array(rows)
}
