use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use tempfile::TempDir;

use macro_pulse_lib::config::Settings;
use macro_pulse_lib::core::orchestrator::{Pipeline, SourceSet};
use macro_pulse_lib::fetcher::{DataSource, DateRange, ProviderId};
use macro_pulse_lib::models::{Light, RawObservation};
use macro_pulse_lib::sink::JsonFileSink;
use macro_pulse_lib::PipelineError;

/// Canned provider: serves fixed rows per symbol, fails or stalls on request.
struct MockSource {
    id: ProviderId,
    rows: HashMap<String, Vec<RawObservation>>,
    stalled: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl MockSource {
    fn new(id: ProviderId) -> Self {
        Self {
            id,
            rows: HashMap::new(),
            stalled: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn serve(mut self, symbol: &str, rows: &[(&str, &str)]) -> Self {
        let rows = rows.iter().map(|(d, v)| RawObservation::text(*d, *v)).collect();
        self.rows.insert(symbol.to_string(), rows);
        self
    }

    fn stall(mut self, symbol: &str) -> Self {
        self.stalled.insert(symbol.to_string());
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DataSource for MockSource {
    fn id(&self) -> ProviderId {
        self.id
    }

    async fn fetch_data(&self, symbol: &str, _range: &DateRange) -> anyhow::Result<Vec<RawObservation>> {
        self.calls.lock().unwrap().push(symbol.to_string());
        if self.stalled.contains(symbol) {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        self.rows
            .get(symbol)
            .cloned()
            .ok_or_else(|| anyhow!("{:?} has no data for {}", self.id, symbol))
    }
}

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
}

fn settings(dir: &Path) -> Settings {
    Settings {
        fred_api_key: None,
        data_dir: dir.to_path_buf(),
        lookback_days: 365,
        http_timeout: Duration::from_millis(100),
        pacing: Duration::ZERO,
    }
}

/// FRED with every treasury and credit series populated.
fn fred() -> MockSource {
    MockSource::new(ProviderId::Fred)
        .serve("DGS10", &[("2024-05-30", "4.55"), ("2024-05-31", "4.51"), ("2024-06-03", ".")])
        .serve("DGS2", &[("2024-05-30", "4.93"), ("2024-05-31", "4.89")])
        .serve("DGS3MO", &[("2024-05-30", "5.46"), ("2024-05-31", "5.46")])
        .serve("DFII10", &[("2024-05-30", "2.17"), ("2024-05-31", "2.15")])
        .serve("BAMLH0A0HYM2", &[("2024-05-31", "3.456")])
        .serve("BAMLC0A0CM", &[("2024-05-31", "0.95")])
        .serve("BAMLC0A4CBBB", &[("2024-05-31", "1.20")])
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_full_run_writes_summary_and_artifacts() {
    let tmp = TempDir::new().unwrap();
    let stooq = Arc::new(MockSource::new(ProviderId::Stooq).serve("^vix", &[("2024-05-31", "12.92")]));
    let cboe = Arc::new(MockSource::new(ProviderId::Cboe));

    let sources = SourceSet::new()
        .with(Arc::new(fred()))
        .with(stooq.clone())
        .with(cboe.clone());
    let sink = JsonFileSink::new(tmp.path());
    let report = Pipeline::new(sources, &settings(tmp.path()), as_of()).run(&sink).await.unwrap();

    assert_eq!(report.providers["VIX"], ProviderId::Stooq);
    assert_eq!(report.providers["UST_10Y"], ProviderId::Fred);
    assert_eq!(report.failed_attempts, 0);
    assert!(cboe.calls().is_empty());

    let summary = read_json(&tmp.path().join("summary.json"));
    assert_eq!(summary["asOf"], "2024-06-03");

    let snapshot = summary["snapshot"].as_object().unwrap();
    let keys: Vec<&str> = snapshot.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["10s2s", "10s3m", "BBB_OAS", "HY_OAS", "IG_OAS", "TIPS10Y", "VIX"]);

    let light = |key: &str| snapshot[key]["light"].as_str().unwrap().to_string();
    let value = |key: &str| snapshot[key]["value"].as_f64().unwrap();

    assert!((value("10s2s") - (-0.38)).abs() < 1e-9);
    assert_eq!(light("10s2s"), "red");
    assert!((value("10s3m") - (-0.95)).abs() < 1e-9);
    assert_eq!(value("HY_OAS"), 3.46);
    assert_eq!(light("HY_OAS"), "green");
    assert_eq!(light("IG_OAS"), "green");
    assert_eq!(light("BBB_OAS"), "green");
    assert_eq!(light("TIPS10Y"), "red");
    assert_eq!(value("VIX"), 12.92);
    assert_eq!(light("VIX"), "green");

    // Per-series artifacts, derived spreads and supplemental documents
    let ten = read_json(&tmp.path().join("UST_10Y.json"));
    assert_eq!(ten.as_array().unwrap().len(), 2);
    assert_eq!(ten[1], serde_json::json!({ "date": "2024-05-31", "value": 4.51 }));

    let spread = read_json(&tmp.path().join("YC_10s2s.json"));
    assert_eq!(spread.as_array().unwrap().len(), 2);

    let curve = read_json(&tmp.path().join("yield_curve.json"));
    assert_eq!(curve.as_array().unwrap().len(), 2);
    assert!(curve[0].get("YC_10s2s").is_some());
    assert!(curve[0].get("YC_10s3m").is_some());

    let vix = read_json(&tmp.path().join("vix_snapshot.json"));
    assert_eq!(vix, serde_json::json!({ "value": 12.92, "light": "green" }));

    let snap = &report.snapshot;
    assert_eq!(snap.get("VIX").unwrap().light, Light::Green);
    assert_eq!(snap.get("10s2s").unwrap().date, NaiveDate::from_ymd_opt(2024, 5, 31).unwrap());
}

#[tokio::test]
async fn test_vix_falls_back_to_fred() {
    let tmp = TempDir::new().unwrap();
    let stooq = Arc::new(MockSource::new(ProviderId::Stooq));
    let cboe = Arc::new(MockSource::new(ProviderId::Cboe).serve("VIX", &[("05/31/2024", "n/a")]));
    let fred = Arc::new(fred().serve("VIXCLS", &[("2024-05-31", "31.5")]));

    let sources = SourceSet::new().with(fred.clone()).with(stooq.clone()).with(cboe.clone());
    let report = Pipeline::new(sources, &settings(tmp.path()), as_of())
        .run(&JsonFileSink::new(tmp.path()))
        .await
        .unwrap();

    assert_eq!(report.providers["VIX"], ProviderId::Fred);
    assert_eq!(report.failed_attempts, 2);
    assert_eq!(stooq.calls(), vec!["^vix"]);
    assert_eq!(cboe.calls(), vec!["VIX"]);
    assert_eq!(fred.calls().last().map(String::as_str), Some("VIXCLS"));

    assert_eq!(report.snapshot.get("VIX").unwrap().light, Light::Red);
    let vix = read_json(&tmp.path().join("vix_snapshot.json"));
    assert_eq!(vix["light"], "red");
}

#[tokio::test]
async fn test_vix_timeouts_abort_and_keep_previous_summary() {
    let tmp = TempDir::new().unwrap();
    let previous = r#"{"asOf":"2024-05-31","snapshot":{"VIX":{"value":13.1,"light":"green"}}}"#;
    fs::write(tmp.path().join("summary.json"), previous).unwrap();

    let sources = SourceSet::new()
        .with(Arc::new(fred().stall("VIXCLS")))
        .with(Arc::new(MockSource::new(ProviderId::Stooq).stall("^vix")))
        .with(Arc::new(MockSource::new(ProviderId::Cboe).stall("VIX")));

    let err = Pipeline::new(sources, &settings(tmp.path()), as_of())
        .run(&JsonFileSink::new(tmp.path()))
        .await
        .unwrap_err();

    match &err {
        PipelineError::NoDataAvailable { series, indicators } => {
            assert_eq!(series, "VIX");
            assert_eq!(indicators, &["VIX"]);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.kind(), "NoDataAvailable");

    assert_eq!(fs::read_to_string(tmp.path().join("summary.json")).unwrap(), previous);
    assert!(!tmp.path().join("vix_snapshot.json").exists());
    assert!(!tmp.path().join("yield_curve.json").exists());
    // Series that resolved before the failure were still written
    assert!(tmp.path().join("UST_10Y.json").exists());
}

#[tokio::test]
async fn test_disjoint_inputs_fail_with_no_overlap() {
    let tmp = TempDir::new().unwrap();
    let fred = fred()
        .serve("DGS2", &[("2024-05-01", "4.90")])
        .serve("VIXCLS", &[("2024-05-31", "13.0")]);

    let err = Pipeline::new(SourceSet::new().with(Arc::new(fred)), &settings(tmp.path()), as_of())
        .run(&JsonFileSink::new(tmp.path()))
        .await
        .unwrap_err();

    match err {
        PipelineError::NoOverlappingDates { series } => assert_eq!(series, "YC_10s2s"),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!tmp.path().join("summary.json").exists());
}

#[tokio::test]
async fn test_missing_fred_fails_on_first_series() {
    let tmp = TempDir::new().unwrap();
    let stooq = MockSource::new(ProviderId::Stooq).serve("^vix", &[("2024-05-31", "12.92")]);

    let err = Pipeline::new(SourceSet::new().with(Arc::new(stooq)), &settings(tmp.path()), as_of())
        .run(&JsonFileSink::new(tmp.path()))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::NoDataAvailable { ref series, .. } if series == "UST_10Y"));
}

#[tokio::test]
async fn test_failed_shared_input_names_dependent_indicators() {
    let tmp = TempDir::new().unwrap();
    let mut fred = fred().serve("VIXCLS", &[("2024-05-31", "13.0")]);
    fred.rows.remove("DGS10");

    let err = Pipeline::new(SourceSet::new().with(Arc::new(fred)), &settings(tmp.path()), as_of())
        .run(&JsonFileSink::new(tmp.path()))
        .await
        .unwrap_err();

    match &err {
        PipelineError::NoDataAvailable { series, indicators } => {
            assert_eq!(series, "UST_10Y");
            assert_eq!(indicators, &["10s2s", "10s3m"]);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.to_string().ends_with("(needed by 10s2s, 10s3m)"));
    assert!(!tmp.path().join("summary.json").exists());
}
