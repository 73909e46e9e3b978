use super::CalculatedIndicator;
use crate::core::timeseries::derive;
use crate::error::PipelineError;
use crate::models::{CanonicalSeries, DerivedSeries};

pub struct YieldCurve10Y2Y;
pub struct YieldCurve10Y3M;

impl CalculatedIndicator for YieldCurve10Y2Y {
    fn slug(&self) -> &str {
        "10s2s"
    }
    fn series_key(&self) -> &str {
        "YC_10s2s"
    }
    fn required_inputs(&self) -> Vec<&str> {
        vec!["UST_10Y", "UST_2Y"]
    }
    fn calculate(&self, inputs: &[&CanonicalSeries]) -> Result<DerivedSeries, PipelineError> {
        calculate_spread(self.series_key(), inputs)
    }
}

impl CalculatedIndicator for YieldCurve10Y3M {
    fn slug(&self) -> &str {
        "10s3m"
    }
    fn series_key(&self) -> &str {
        "YC_10s3m"
    }
    fn required_inputs(&self) -> Vec<&str> {
        vec!["UST_10Y", "UST_3M"]
    }
    fn calculate(&self, inputs: &[&CanonicalSeries]) -> Result<DerivedSeries, PipelineError> {
        calculate_spread(self.series_key(), inputs)
    }
}

/// Spread between two series (A - B) on the dates both report.
fn calculate_spread(id: &str, inputs: &[&CanonicalSeries]) -> Result<DerivedSeries, PipelineError> {
    let [long, short] = inputs else {
        return Err(PipelineError::InvalidDerivation {
            indicator: id.to_string(),
            reason: format!("spread expects exactly 2 inputs, got {}", inputs.len()),
        });
    };

    Ok(derive(id, &[*long, *short], |v| v[0] - v[1]))
}
