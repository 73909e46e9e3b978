use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::PipelineError;
use crate::models::{IndicatorReading, Light};

/// Complete set of classified readings for one run.
///
/// Only [`assemble`] builds one, so a `Snapshot` always holds exactly one
/// reading per expected indicator.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    as_of: NaiveDate,
    readings: BTreeMap<String, IndicatorReading>,
}

impl Snapshot {
    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    pub fn get(&self, indicator: &str) -> Option<&IndicatorReading> {
        self.readings.get(indicator)
    }

    pub fn readings(&self) -> impl Iterator<Item = &IndicatorReading> {
        self.readings.values()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn to_document(&self) -> SummaryDocument {
        SummaryDocument {
            as_of: self.as_of,
            snapshot: self
                .readings
                .iter()
                .map(|(key, reading)| (key.clone(), ReadingDocument::from(reading)))
                .collect(),
        }
    }

    /// Rebuilds a snapshot from a summary document. The document carries no
    /// per-reading dates, so every reading is stamped with `asOf`.
    pub fn from_document(doc: SummaryDocument) -> Self {
        let readings = doc
            .snapshot
            .into_iter()
            .map(|(key, r)| {
                let reading = IndicatorReading {
                    indicator: key.clone(),
                    date: doc.as_of,
                    value: r.value,
                    light: r.light,
                };
                (key, reading)
            })
            .collect();

        Self {
            as_of: doc.as_of,
            readings,
        }
    }
}

/// Shape of `summary.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryDocument {
    #[serde(rename = "asOf", alias = "as_of")]
    pub as_of: NaiveDate,
    pub snapshot: BTreeMap<String, ReadingDocument>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadingDocument {
    pub value: f64,
    pub light: Light,
}

impl From<&IndicatorReading> for ReadingDocument {
    fn from(reading: &IndicatorReading) -> Self {
        Self {
            value: round2(reading.value),
            light: reading.light,
        }
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Combines per-indicator readings into a snapshot.
///
/// Fails on a reading for an indicator not in `expected`, on a second reading
/// for the same indicator, and when any expected indicator has no reading.
pub fn assemble(
    as_of: NaiveDate,
    expected: &[&str],
    readings: Vec<IndicatorReading>,
) -> Result<Snapshot, PipelineError> {
    let mut by_key = BTreeMap::new();

    for reading in readings {
        if !expected.contains(&reading.indicator.as_str()) {
            return Err(PipelineError::UnknownIndicator {
                indicator: reading.indicator,
            });
        }
        if by_key.contains_key(&reading.indicator) {
            return Err(PipelineError::DuplicateReading {
                indicator: reading.indicator,
            });
        }
        by_key.insert(reading.indicator.clone(), reading);
    }

    let missing: Vec<String> = expected
        .iter()
        .filter(|key| !by_key.contains_key(**key))
        .map(|key| key.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::IncompleteSnapshot { missing });
    }

    Ok(Snapshot {
        as_of,
        readings: by_key,
    })
}
