/// CSV telemetry export.
pub mod export;

pub use export::{export_csv, write_csv};
