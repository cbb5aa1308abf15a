use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::info;

use crate::sim::types::{PricePoint, PriceSeries};

use super::SourceError;

/// Reads a `timestamp,price_usd_per_mwh` CSV with RFC 3339 timestamps.
///
/// # Errors
///
/// Returns `SourceError::Csv` for malformed rows and `SourceError::Invalid`
/// when timestamps go backwards or a price is not finite.
pub fn read_price_history<R: Read>(reader: R) -> Result<PriceSeries, SourceError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let points = rdr
        .deserialize::<PricePoint>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PriceSeries::new(points)?)
}

/// Loads a price history CSV from disk.
///
/// # Errors
///
/// Returns `SourceError::Io` when the file cannot be opened, otherwise see
/// [`read_price_history`].
pub fn load_price_history(path: &Path) -> Result<PriceSeries, SourceError> {
    let file = File::open(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let series = read_price_history(file)?;
    info!(path = %path.display(), points = series.len(), "loaded price history");
    Ok(series)
}
