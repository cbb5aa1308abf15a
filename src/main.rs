//! Hybrid dispatch entry point: CLI wiring and report printing.

use anyhow::{Context, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hybrid_dispatch::cli::Args;
use hybrid_dispatch::io::export_csv;
use hybrid_dispatch::market::{FallbackSource, ScenarioSource};
use hybrid_dispatch::report::DashboardReport;
use hybrid_dispatch::session::Session;

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let scenario = args.load_scenario()?;

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        bail!("scenario has {} invalid field(s)", errors.len());
    }

    let session = Session::authenticate(&scenario.access, args.password.as_deref());
    let snapshot = FallbackSource::new(ScenarioSource::from_config(&scenario)).snapshot();
    let report = DashboardReport::evaluate(&session, &scenario, &snapshot)?;
    println!("{report}");

    if let Some(path) = &args.telemetry_out {
        export_csv(&report.backtest.steps, path)
            .with_context(|| format!("failed to write telemetry to {}", path.display()))?;
    }

    #[cfg(feature = "api")]
    if args.serve {
        use std::net::SocketAddr;
        use std::sync::Arc;

        use hybrid_dispatch::api::{AppState, serve};
        use hybrid_dispatch::market::CachedSource;

        let source = CachedSource::new(FallbackSource::new(ScenarioSource::from_config(&scenario)));
        let state = Arc::new(AppState::new(scenario, source));
        let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
        let rt = tokio::runtime::Runtime::new().context("failed to create tokio runtime")?;
        rt.block_on(serve(state, addr)).context("API server failed")?;
    }

    Ok(())
}
