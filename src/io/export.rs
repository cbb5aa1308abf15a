//! CSV export for backtest steps.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use tracing::info;

use crate::sim::BacktestStep;

/// Column header for CSV telemetry export.
const HEADER: &str = "timestamp,price_usd_per_mwh,state,mining_load_mw,\
                      grid_export_mw,battery_mw,battery_soc,mining_alpha_usd_per_hr,\
                      battery_alpha_usd_per_hr,grid_baseline_usd_per_hr";

/// Exports backtest steps to a CSV file at the given path.
///
/// Writes a header row followed by one data row per step. Produces
/// deterministic output for identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(steps: &[BacktestStep], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(steps, buf)?;
    info!(path = %path.display(), rows = steps.len(), "telemetry exported");
    Ok(())
}

/// Writes backtest steps as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(steps: &[BacktestStep], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for s in steps {
        let r = &s.result;
        wtr.write_record(&[
            s.timestamp.to_rfc3339(),
            format!("{:.2}", s.price_usd_per_mwh),
            r.state.to_string(),
            format!("{:.4}", r.mining_load_mw),
            format!("{:.4}", r.grid_export_mw),
            format!("{:.4}", r.battery_mw),
            format!("{:.4}", s.battery_soc),
            format!("{:.2}", r.mining_alpha_usd_per_hr),
            format!("{:.2}", r.battery_alpha_usd_per_hr),
            format!("{:.2}", r.grid_baseline_usd_per_hr),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
