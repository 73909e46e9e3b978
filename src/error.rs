use thiserror::Error;

/// Failure kinds raised by the indicator pipeline.
///
/// `SourceFailure` and `EmptyAfterNormalization` are recovered inside a
/// fallback chain; everything else aborts the run before the summary is written.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source '{provider}' failed for series '{series}': {reason}")]
    SourceFailure {
        provider: String,
        series: String,
        reason: String,
    },

    #[error("series '{series}' has no usable observations after normalization")]
    EmptyAfterNormalization { series: String },

    /// `indicators` lists the indicators left without input, once known.
    #[error("no data available for '{series}': every source in the chain failed{}", needed_by(indicators))]
    NoDataAvailable { series: String, indicators: Vec<String> },

    #[error("derived series '{series}' has no overlapping dates across its inputs")]
    NoOverlappingDates { series: String },

    #[error("snapshot is incomplete, missing readings for: {}", missing.join(", "))]
    IncompleteSnapshot { missing: Vec<String> },

    #[error("indicator '{indicator}' has more than one reading")]
    DuplicateReading { indicator: String },

    #[error("indicator '{indicator}' is not registered")]
    UnknownIndicator { indicator: String },

    #[error("series '{series}' is not registered")]
    UnknownSeries { series: String },

    #[error("cannot derive '{indicator}': {reason}")]
    InvalidDerivation { indicator: String, reason: String },

    #[error("invalid threshold rule for '{indicator}': {reason}")]
    InvalidRule { indicator: String, reason: String },

    #[error("artifact i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    /// Short machine-readable kind, used in logs and the process exit message.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SourceFailure { .. } => "SourceFailure",
            Self::EmptyAfterNormalization { .. } => "EmptyAfterNormalization",
            Self::NoDataAvailable { .. } => "NoDataAvailable",
            Self::NoOverlappingDates { .. } => "NoOverlappingDates",
            Self::IncompleteSnapshot { .. } => "IncompleteSnapshot",
            Self::DuplicateReading { .. } => "DuplicateReading",
            Self::UnknownIndicator { .. } => "UnknownIndicator",
            Self::UnknownSeries { .. } => "UnknownSeries",
            Self::InvalidDerivation { .. } => "InvalidDerivation",
            Self::InvalidRule { .. } => "InvalidRule",
            Self::Io(_) => "Io",
            Self::Serialization(_) => "Serialization",
        }
    }

    /// Whether a fallback chain may move on to its next source.
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SourceFailure { .. } | Self::EmptyAfterNormalization { .. }
        )
    }
}

fn needed_by(indicators: &[String]) -> String {
    if indicators.is_empty() {
        String::new()
    } else {
        format!(" (needed by {})", indicators.join(", "))
    }
}
