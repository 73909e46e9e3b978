//! Traffic-light classification.
//!
//! Every indicator carries its own rule. Boundary handling is explicit per
//! breakpoint: a `Breakpoint::strict(x)` is cleared only by values strictly
//! beyond `x`, a `Breakpoint::inclusive(x)` also by `x` itself. A value that
//! clears neither the green nor the red breakpoint is yellow.

use crate::error::PipelineError;
use crate::models::Light;

/// A threshold plus which side of it the boundary value falls on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Breakpoint {
    pub at: f64,
    pub inclusive: bool,
}

impl Breakpoint {
    /// Strict comparison: the boundary value itself does not clear the breakpoint.
    pub const fn strict(at: f64) -> Self {
        Self { at, inclusive: false }
    }

    /// Inclusive comparison: the boundary value clears the breakpoint.
    pub const fn inclusive(at: f64) -> Self {
        Self { at, inclusive: true }
    }

    fn exceeded_by(self, value: f64) -> bool {
        if self.inclusive {
            value >= self.at
        } else {
            value > self.at
        }
    }

    fn undercut_by(self, value: f64) -> bool {
        if self.inclusive {
            value <= self.at
        } else {
            value < self.at
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThresholdRule {
    /// Green when the value exceeds `green`, red when it undercuts `red`.
    HigherIsBetter { green: Breakpoint, red: Breakpoint },
    /// Green when the value undercuts `green`, red when it exceeds `red`.
    HigherIsWorse { green: Breakpoint, red: Breakpoint },
    /// Green inside `[green_low, green_high]`, red outside `[red_low, red_high]`.
    Band {
        green_low: f64,
        green_high: f64,
        red_low: f64,
        red_high: f64,
    },
}

impl ThresholdRule {
    pub const fn higher_is_better(green: Breakpoint, red: Breakpoint) -> Self {
        Self::HigherIsBetter { green, red }
    }

    pub const fn higher_is_worse(green: Breakpoint, red: Breakpoint) -> Self {
        Self::HigherIsWorse { green, red }
    }

    pub const fn band(green_low: f64, green_high: f64, red_low: f64, red_high: f64) -> Self {
        Self::Band {
            green_low,
            green_high,
            red_low,
            red_high,
        }
    }

    /// Pure and deterministic. Non-finite input classifies as red.
    pub fn classify(&self, value: f64) -> Light {
        if !value.is_finite() {
            return Light::Red;
        }

        match *self {
            Self::HigherIsBetter { green, red } => {
                if red.undercut_by(value) {
                    Light::Red
                } else if green.exceeded_by(value) {
                    Light::Green
                } else {
                    Light::Yellow
                }
            }
            Self::HigherIsWorse { green, red } => {
                if red.exceeded_by(value) {
                    Light::Red
                } else if green.undercut_by(value) {
                    Light::Green
                } else {
                    Light::Yellow
                }
            }
            Self::Band {
                green_low,
                green_high,
                red_low,
                red_high,
            } => {
                if value < red_low || value > red_high {
                    Light::Red
                } else if value >= green_low && value <= green_high {
                    Light::Green
                } else {
                    Light::Yellow
                }
            }
        }
    }

    /// Rejects rules whose breakpoints are non-finite, inverted, or not nested.
    pub fn validate(&self, indicator: &str) -> Result<(), PipelineError> {
        let invalid = |reason: &str| PipelineError::InvalidRule {
            indicator: indicator.to_string(),
            reason: reason.to_string(),
        };

        let all_finite = match *self {
            Self::HigherIsBetter { green, red } | Self::HigherIsWorse { green, red } => {
                green.at.is_finite() && red.at.is_finite()
            }
            Self::Band {
                green_low,
                green_high,
                red_low,
                red_high,
            } => [green_low, green_high, red_low, red_high].iter().all(|v| v.is_finite()),
        };
        if !all_finite {
            return Err(invalid("breakpoints must be finite"));
        }

        match *self {
            Self::HigherIsBetter { green, red } if green.at < red.at => {
                Err(invalid("green breakpoint must not be below red breakpoint"))
            }
            Self::HigherIsWorse { green, red } if green.at > red.at => {
                Err(invalid("green breakpoint must not be above red breakpoint"))
            }
            Self::Band {
                green_low,
                green_high,
                red_low,
                red_high,
            } if !(red_low <= green_low && green_low <= green_high && green_high <= red_high) => {
                Err(invalid("band must satisfy red_low <= green_low <= green_high <= red_high"))
            }
            _ => Ok(()),
        }
    }
}
