use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Utc;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use macro_pulse_lib::config::Settings;
use macro_pulse_lib::core::orchestrator::{Pipeline, RunReport, SourceSet};
use macro_pulse_lib::sink::JsonFileSink;
use macro_pulse_lib::PipelineError;

/// Fetch macro series, classify risk indicators, and write dashboard JSON.
#[derive(Debug, Parser)]
#[command(name = "macro-pulse", version)]
struct Args {
    /// Output directory for artifacts (overrides MACRO_PULSE_DATA_DIR)
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

/// 0 once the summary is written, 1 for any failure.
fn exit_status(outcome: &Result<RunReport, PipelineError>) -> u8 {
    match outcome {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

/// Single stderr line for a failed run: kind, then the full message.
fn failure_line(e: &PipelineError) -> String {
    format!("macro-pulse: {}: {e}", e.kind())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let settings = match Settings::from_env() {
        Ok(settings) => settings.with_out_dir(args.out_dir),
        Err(e) => {
            error!("configuration error: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    if settings.fred_api_key.is_none() {
        warn!("FRED_API_KEY is not set; every FRED-only series will fail");
    }

    let sources = match SourceSet::live(&settings) {
        Ok(sources) => sources,
        Err(e) => {
            error!("http client setup failed: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let as_of = Utc::now().date_naive();
    let sink = JsonFileSink::new(&settings.data_dir);
    let outcome = Pipeline::new(sources, &settings, as_of).run(&sink).await;

    match &outcome {
        Ok(report) => {
            for (series, provider) in &report.providers {
                info!(%series, %provider, "served by");
            }
            info!(dir = %sink.dir().display(), %as_of, "summary written");
        }
        Err(e) => {
            error!(kind = e.kind(), "run failed: {e}");
            eprintln!("{}", failure_line(e));
        }
    }

    ExitCode::from(exit_status(&outcome))
}
