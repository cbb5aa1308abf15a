//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::process::{Command, Output};

use hybrid_dispatch::market::load_price_history;
use hybrid_dispatch::sim::PriceSeries;

/// Two days of hourly hub prices checked into `scenarios/`.
pub const SAMPLE_HISTORY: &str = "scenarios/ercot_west_sample.csv";

/// Loads [`SAMPLE_HISTORY`].
pub fn sample_history() -> PriceSeries {
    load_price_history(Path::new(SAMPLE_HISTORY)).expect("sample history should load")
}

/// Runs the built binary with `args` and no password in the environment.
pub fn run_binary(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hybrid-dispatch"))
        .args(args)
        .env_remove("HYBRID_DISPATCH_PASSWORD")
        .env("RUST_LOG", "warn")
        .output()
        .expect("hybrid-dispatch process should run")
}

/// Runs the binary and returns stdout, failing the test on a non-zero exit.
pub fn run_report(args: &[&str]) -> String {
    let output = run_binary(args);
    assert!(
        output.status.success(),
        "hybrid-dispatch {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("report should be UTF-8")
}

/// Value after the label on the first report line starting with `label`.
pub fn report_value<'a>(report: &'a str, label: &str) -> &'a str {
    report
        .lines()
        .find_map(|line| line.strip_prefix(label))
        .unwrap_or_else(|| panic!("report has no \"{label}\" line:\n{report}"))
        .trim()
}

/// Leading integer of a KPI count line such as `NEGATIVE points:  11 (22.9%)`.
pub fn report_count(report: &str, label: &str) -> usize {
    let value = report_value(report, label);
    value
        .split_whitespace()
        .next()
        .and_then(|n| n.parse().ok())
        .unwrap_or_else(|| panic!("\"{label}\" is not a count: {value}"))
}
