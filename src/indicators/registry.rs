use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::analysis::classifier::{Breakpoint, ThresholdRule};
use crate::error::PipelineError;
use crate::fetcher::ProviderId;
use crate::indicators::yield_curve::{YieldCurve10Y2Y, YieldCurve10Y3M};
use crate::indicators::CalculatedIndicator;

// ============================================================================
// METADATA STRUCTS
// ============================================================================

/// A provider plus the symbol that provider uses for the series.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRef {
    pub provider: ProviderId,
    pub symbol: String,
}

/// A logical input series and its fallback chain, in the order sources are tried.
#[derive(Debug, Clone)]
pub struct SeriesMetadata {
    pub key: String,
    pub name: String,
    pub sources: Vec<SourceRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Role {
    /// Latest value of a canonical series, as fetched.
    Raw { series: String },
    /// Computed by the calculator registered under the indicator key.
    Derived,
}

#[derive(Debug, Clone)]
pub struct IndicatorMetadata {
    pub key: String,
    pub name: String,
    pub role: Role,
    pub rule: ThresholdRule,
}

macro_rules! series {
    ($key:expr, $name:expr, [$(($provider:expr, $symbol:expr)),+ $(,)?]) => {
        SeriesMetadata {
            key: $key.to_string(),
            name: $name.to_string(),
            sources: vec![$(SourceRef { provider: $provider, symbol: $symbol.to_string() }),+],
        }
    };
    // Single FRED source
    ($key:expr, $name:expr, $fred:expr) => {
        series!($key, $name, [(ProviderId::Fred, $fred)])
    };
}

macro_rules! ind {
    ($key:expr, $name:expr, derived, $rule:expr) => {
        IndicatorMetadata {
            key: $key.to_string(),
            name: $name.to_string(),
            role: Role::Derived,
            rule: $rule,
        }
    };
    ($key:expr, $name:expr, raw($series:expr), $rule:expr) => {
        IndicatorMetadata {
            key: $key.to_string(),
            name: $name.to_string(),
            role: Role::Raw { series: $series.to_string() },
            rule: $rule,
        }
    };
}

const fn better(green: Breakpoint, red: Breakpoint) -> ThresholdRule {
    ThresholdRule::higher_is_better(green, red)
}

const fn worse(green: Breakpoint, red: Breakpoint) -> ThresholdRule {
    ThresholdRule::higher_is_worse(green, red)
}

// ============================================================================
// STATIC REGISTRY
// ============================================================================

static SERIES: Lazy<Vec<SeriesMetadata>> = Lazy::new(|| {
    vec![
        // Treasury yields
        series!("UST_10Y", "10-Year Treasury Yield", "DGS10"),
        series!("UST_2Y", "2-Year Treasury Yield", "DGS2"),
        series!("UST_3M", "3-Month Treasury Yield", "DGS3MO"),
        series!("UST_10Y_TIPS", "10-Year TIPS Real Yield", "DFII10"),

        // ICE BofA option-adjusted spreads
        series!("HY_OAS", "US High Yield OAS", "BAMLH0A0HYM2"),
        series!("IG_OAS", "US Corporate (IG) OAS", "BAMLC0A0CM"),
        series!("BBB_OAS", "US BBB Corporate OAS", "BAMLC0A4CBBB"),

        // Stooq first (no key needed), CBOE history file, FRED last
        series!("VIX", "CBOE Volatility Index", [
            (ProviderId::Stooq, "^vix"),
            (ProviderId::Cboe, "VIX"),
            (ProviderId::Fred, "VIXCLS"),
        ]),
    ]
});

static INDICATORS: Lazy<Vec<IndicatorMetadata>> = Lazy::new(|| {
    vec![
        ind!("10s2s", "10Y-2Y Treasury Spread",
             derived, better(Breakpoint::strict(0.25), Breakpoint::strict(0.0))),
        ind!("10s3m", "10Y-3M Treasury Spread",
             derived, better(Breakpoint::strict(0.50), Breakpoint::strict(0.0))),
        ind!("HY_OAS", "High Yield Spread",
             raw("HY_OAS"), worse(Breakpoint::strict(4.0), Breakpoint::strict(6.0))),
        ind!("IG_OAS", "Investment Grade Spread",
             raw("IG_OAS"), worse(Breakpoint::strict(1.25), Breakpoint::strict(2.0))),
        ind!("BBB_OAS", "BBB Spread",
             raw("BBB_OAS"), worse(Breakpoint::strict(1.5), Breakpoint::strict(2.5))),
        ind!("TIPS10Y", "10Y Real Yield",
             raw("UST_10Y_TIPS"), ThresholdRule::band(0.0, 1.5, 0.0, 2.0)),
        ind!("VIX", "VIX",
             raw("VIX"), worse(Breakpoint::strict(20.0), Breakpoint::inclusive(30.0))),
    ]
});

/// HashMap for O(1) key -> index lookup
static SERIES_MAP: Lazy<HashMap<&'static str, usize>> = Lazy::new(|| {
    SERIES
        .iter()
        .enumerate()
        .map(|(idx, s)| (s.key.as_str(), idx))
        .collect()
});

static INDICATOR_MAP: Lazy<HashMap<&'static str, usize>> = Lazy::new(|| {
    INDICATORS
        .iter()
        .enumerate()
        .map(|(idx, ind)| (ind.key.as_str(), idx))
        .collect()
});

// ============================================================================
// REGISTRY STRUCT & IMPL
// ============================================================================

pub struct Registry;

impl Registry {
    /// All input series in fetch order
    pub fn all_series() -> &'static [SeriesMetadata] {
        &SERIES
    }

    /// All indicators in snapshot order
    pub fn all_indicators() -> &'static [IndicatorMetadata] {
        &INDICATORS
    }

    pub fn indicator_keys() -> Vec<&'static str> {
        INDICATORS.iter().map(|i| i.key.as_str()).collect()
    }

    pub fn get_series(key: &str) -> Option<&'static SeriesMetadata> {
        SERIES_MAP.get(key).and_then(|&idx| SERIES.get(idx))
    }

    pub fn get_indicator(key: &str) -> Option<&'static IndicatorMetadata> {
        INDICATOR_MAP.get(key).and_then(|&idx| INDICATORS.get(idx))
    }

    /// Indicators that read `series`, directly or as a derivation input, in snapshot order.
    pub fn dependents(series: &str) -> Vec<&'static str> {
        INDICATORS
            .iter()
            .filter(|ind| match &ind.role {
                Role::Raw { series: input } => input == series,
                Role::Derived => Self::get_calculator(&ind.key)
                    .is_some_and(|calc| calc.required_inputs().iter().any(|input| *input == series)),
            })
            .map(|ind| ind.key.as_str())
            .collect()
    }

    /// Get calculator for derived indicators
    pub fn get_calculator(key: &str) -> Option<Box<dyn CalculatedIndicator>> {
        match key {
            "10s2s" => Some(Box::new(YieldCurve10Y2Y)),
            "10s3m" => Some(Box::new(YieldCurve10Y3M)),
            _ => None,
        }
    }

    /// Checks that every rule is well formed and every reference resolves.
    pub fn validate() -> Result<(), PipelineError> {
        for series in SERIES.iter() {
            if series.sources.is_empty() {
                return Err(PipelineError::UnknownSeries {
                    series: series.key.clone(),
                });
            }
        }

        for ind in INDICATORS.iter() {
            ind.rule.validate(&ind.key)?;

            match &ind.role {
                Role::Raw { series } => {
                    if Self::get_series(series).is_none() {
                        return Err(PipelineError::UnknownSeries {
                            series: series.clone(),
                        });
                    }
                }
                Role::Derived => {
                    let calculator = Self::get_calculator(&ind.key).ok_or_else(|| {
                        PipelineError::UnknownIndicator {
                            indicator: ind.key.clone(),
                        }
                    })?;
                    check_calculator(&ind.key, calculator.as_ref())?;
                }
            }
        }

        Ok(())
    }
}

/// A derived indicator's calculator must answer to the same key and read only registered series.
fn check_calculator(key: &str, calculator: &dyn CalculatedIndicator) -> Result<(), PipelineError> {
    if calculator.slug() != key {
        return Err(PipelineError::InvalidDerivation {
            indicator: key.to_string(),
            reason: format!("calculator is registered as '{}'", calculator.slug()),
        });
    }
    if let Some(missing) = calculator
        .required_inputs()
        .into_iter()
        .find(|input| Registry::get_series(input).is_none())
    {
        return Err(PipelineError::UnknownSeries {
            series: missing.to_string(),
        });
    }
    Ok(())
}
