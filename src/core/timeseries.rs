use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::models::{CanonicalSeries, DataPoint, DerivedSeries};

/// One row of an inner-joined set of series.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRow {
    pub date: NaiveDate,
    pub values: Vec<f64>,
}

/// Inner-joins series on date.
///
/// A date is emitted only when every input has an observation on it. No
/// forward fill or interpolation across gaps.
pub fn align_inner(series_list: &[&CanonicalSeries]) -> Vec<AlignedRow> {
    let Some((first, rest)) = series_list.split_first() else {
        return Vec::new();
    };

    let lookups: Vec<BTreeMap<NaiveDate, f64>> = rest
        .iter()
        .map(|series| series.points().iter().map(|dp| (dp.date, dp.value)).collect())
        .collect();

    first
        .points()
        .iter()
        .filter_map(|dp| {
            let mut values = Vec::with_capacity(series_list.len());
            values.push(dp.value);
            for lookup in &lookups {
                values.push(*lookup.get(&dp.date)?);
            }
            Some(AlignedRow { date: dp.date, values })
        })
        .collect()
}

/// Applies an n-ary operator across the inner join of `inputs`.
///
/// Dates where the operator yields a non-finite number are dropped.
pub fn derive<F>(id: &str, inputs: &[&CanonicalSeries], op: F) -> DerivedSeries
where
    F: Fn(&[f64]) -> f64,
{
    let points = align_inner(inputs)
        .into_iter()
        .filter_map(|row| {
            let value = op(&row.values);
            value.is_finite().then(|| DataPoint::new(row.date, value))
        })
        .collect();

    DerivedSeries::new(id, points)
}

/// Union of dates across derived series, each row holding the values present on that date.
///
/// Used for the combined chart table where one curve may have a gap the other does not.
pub fn align_outer(series_list: &[&DerivedSeries]) -> Vec<(NaiveDate, Vec<Option<f64>>)> {
    let mut table: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();

    for (idx, series) in series_list.iter().enumerate() {
        for dp in series.points() {
            table.entry(dp.date).or_insert_with(|| vec![None; series_list.len()])[idx] = Some(dp.value);
        }
    }

    table.into_iter().collect()
}
