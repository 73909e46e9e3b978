use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PipelineError;

/// A single provider row before any cleaning.
#[derive(Debug, Clone, PartialEq)]
pub struct RawObservation {
    pub date: String,
    pub value: RawValue,
}

impl RawObservation {
    pub fn new(date: impl Into<String>, value: RawValue) -> Self {
        Self {
            date: date.into(),
            value,
        }
    }

    pub fn text(date: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(date, RawValue::Text(value.into()))
    }

    pub fn number(date: impl Into<String>, value: f64) -> Self {
        Self::new(date, RawValue::Number(value))
    }
}

/// Provider value cell. Any variant may turn out to be unusable.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Missing,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct DataPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl DataPoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Cleaned provider series: strictly ascending dates, finite values, never empty.
///
/// Only the normalizer builds these, so every instance upholds the invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalSeries {
    id: String,
    points: Vec<DataPoint>,
}

impl CanonicalSeries {
    pub(crate) fn from_sorted(id: impl Into<String>, points: Vec<DataPoint>) -> Self {
        debug_assert!(!points.is_empty());
        debug_assert!(points.windows(2).all(|w| w[0].date < w[1].date));
        Self {
            id: id.into(),
            points,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Last chronological point. Never fails: a canonical series is non-empty.
    pub fn latest(&self) -> &DataPoint {
        &self.points[self.points.len() - 1]
    }
}

/// Output of the derived metric engine. Unlike a canonical series it may be empty.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedSeries {
    id: String,
    points: Vec<DataPoint>,
}

impl DerivedSeries {
    pub(crate) fn new(id: impl Into<String>, points: Vec<DataPoint>) -> Self {
        Self {
            id: id.into(),
            points,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn latest(&self) -> Result<&DataPoint, PipelineError> {
        self.points
            .last()
            .ok_or_else(|| PipelineError::NoOverlappingDates {
                series: self.id.clone(),
            })
    }
}

/// Traffic-light state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Light {
    Green,
    Yellow,
    Red,
}

impl Light {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
        }
    }
}

impl fmt::Display for Light {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorReading {
    pub indicator: String,
    pub date: NaiveDate,
    pub value: f64,
    pub light: Light,
}
