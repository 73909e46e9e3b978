pub mod fallback;
pub mod normalizer;
pub mod orchestrator;
pub mod rate_limiter;
pub mod snapshot;
pub mod timeseries;
