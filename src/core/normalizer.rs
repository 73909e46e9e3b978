use chrono::{DateTime, NaiveDate};
use std::collections::BTreeMap;

use crate::error::PipelineError;
use crate::fetcher::DateRange;
use crate::models::{CanonicalSeries, DataPoint, RawObservation, RawValue};

/// Date layouts seen across providers, tried in order.
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// Coerce raw provider rows into a canonical series.
///
/// Rows with an unparseable date or a non-finite value are dropped. When a
/// date repeats, the later row wins (providers append restatements).
pub fn normalize(series_id: &str, raw: &[RawObservation]) -> Result<CanonicalSeries, PipelineError> {
    normalize_filtered(series_id, raw, |_| true)
}

/// Same as [`normalize`], restricted to the lookback window.
pub fn normalize_within(
    series_id: &str,
    raw: &[RawObservation],
    range: &DateRange,
) -> Result<CanonicalSeries, PipelineError> {
    normalize_filtered(series_id, raw, |date| range.contains(date))
}

fn normalize_filtered<F>(series_id: &str, raw: &[RawObservation], keep: F) -> Result<CanonicalSeries, PipelineError>
where
    F: Fn(NaiveDate) -> bool,
{
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();

    for obs in raw {
        let (Some(date), Some(value)) = (parse_date(&obs.date), parse_value(&obs.value)) else {
            continue;
        };
        if keep(date) {
            // insert overwrites: last occurrence in input order wins
            by_date.insert(date, value);
        }
    }

    if by_date.is_empty() {
        return Err(PipelineError::EmptyAfterNormalization {
            series: series_id.to_string(),
        });
    }

    let points = by_date
        .into_iter()
        .map(|(date, value)| DataPoint::new(date, value))
        .collect();

    Ok(CanonicalSeries::from_sorted(series_id, points))
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }

    // Compact YYYYMMDD; chrono's %Y would swallow all eight digits.
    if text.len() == 8 && text.bytes().all(|b| b.is_ascii_digit()) {
        let year = text[..4].parse().ok()?;
        let month = text[4..6].parse().ok()?;
        let day = text[6..].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    // Full timestamps such as "2023-01-03T00:00:00+00:00" or "2023-01-03 00:00:00".
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.date_naive());
    }
    text.get(..10)
        .filter(|_| text.len() > 10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

pub fn parse_value(raw: &RawValue) -> Option<f64> {
    let value = match raw {
        RawValue::Number(v) => *v,
        RawValue::Text(text) => text.trim().parse::<f64>().ok()?,
        RawValue::Missing => return None,
    };
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_sorts_and_drops_bad_rows() {
        let raw = vec![
            RawObservation::text("2024-01-03", "4.10"),
            RawObservation::text("2024-01-01", "4.00"),
            RawObservation::text("not-a-date", "4.20"),
            RawObservation::text("2024-01-02", "."),
            RawObservation::text("2024-01-04", ""),
            RawObservation::text("2024-01-05", "NaN"),
            RawObservation::new("2024-01-06", RawValue::Missing),
            RawObservation::number("2024-01-07", f64::INFINITY),
            RawObservation::number("2024-01-08", 4.3),
        ];

        let series = normalize("UST_10Y", &raw).unwrap();
        let dates: Vec<_> = series.points().iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![d(2024, 1, 1), d(2024, 1, 3), d(2024, 1, 8)]);
        assert_eq!(series.latest().value, 4.3);
    }

    #[test]
    fn test_last_duplicate_wins() {
        let raw = vec![
            RawObservation::text("2024-01-01", "1.0"),
            RawObservation::text("2024-01-02", "2.0"),
            RawObservation::text("2024-01-01", "1.5"),
        ];

        let series = normalize("HY_OAS", &raw).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.points()[0], DataPoint::new(d(2024, 1, 1), 1.5));
    }

    #[test]
    fn test_unparseable_duplicate_does_not_erase_earlier_value() {
        let raw = vec![
            RawObservation::text("2024-01-01", "1.0"),
            RawObservation::text("2024-01-01", "."),
        ];

        let series = normalize("HY_OAS", &raw).unwrap();
        assert_eq!(series.points()[0].value, 1.0);
    }

    #[test]
    fn test_empty_after_filtering_is_failure() {
        let raw = vec![RawObservation::text("2024-01-01", ".")];
        match normalize("VIX", &raw) {
            Err(PipelineError::EmptyAfterNormalization { series }) => assert_eq!(series, "VIX"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(normalize("VIX", &[]).is_err());
    }

    #[test]
    fn test_provider_date_formats() {
        assert_eq!(parse_date("2024-01-02"), Some(d(2024, 1, 2)));
        assert_eq!(parse_date("01/02/2024"), Some(d(2024, 1, 2)));
        assert_eq!(parse_date("20240102"), Some(d(2024, 1, 2)));
        assert_eq!(parse_date("2024-01-02T00:00:00+00:00"), Some(d(2024, 1, 2)));
        assert_eq!(parse_date("2024-01-02 00:00:00"), Some(d(2024, 1, 2)));
        assert_eq!(parse_date("2024-13-02"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_value_coercion() {
        assert_eq!(parse_value(&RawValue::Text(" 4.25 ".into())), Some(4.25));
        assert_eq!(parse_value(&RawValue::Text("-0.3".into())), Some(-0.3));
        assert_eq!(parse_value(&RawValue::Text("inf".into())), None);
        assert_eq!(parse_value(&RawValue::Number(f64::NAN)), None);
        assert_eq!(parse_value(&RawValue::Missing), None);
    }

    #[test]
    fn test_within_clips_to_window() {
        let raw = vec![
            RawObservation::text("2023-12-30", "1.0"),
            RawObservation::text("2024-01-02", "2.0"),
        ];
        let range = DateRange::new(d(2024, 1, 1), d(2024, 1, 31));

        let series = normalize_within("VIX", &raw, &range).unwrap();
        assert_eq!(series.points(), &[DataPoint::new(d(2024, 1, 2), 2.0)]);

        let stale = DateRange::new(d(2025, 1, 1), d(2025, 1, 31));
        assert!(normalize_within("VIX", &raw, &stale).is_err());
    }
}
