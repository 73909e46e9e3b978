use crate::error::PipelineError;
use crate::models::{CanonicalSeries, DerivedSeries};

pub mod registry;
pub mod yield_curve;

pub trait CalculatedIndicator: Send + Sync {
    /// Indicator key used in the snapshot (e.g., "10s2s")
    fn slug(&self) -> &str;

    /// Artifact name of the derived series (e.g., "YC_10s2s")
    fn series_key(&self) -> &str;

    /// Series keys required for calculation, in operand order
    fn required_inputs(&self) -> Vec<&str>;

    /// Calculate the derived series from inputs given in `required_inputs` order.
    fn calculate(&self, inputs: &[&CanonicalSeries]) -> Result<DerivedSeries, PipelineError>;
}
