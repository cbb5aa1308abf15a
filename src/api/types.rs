//! API response and query types.

use serde::{Deserialize, Serialize};

use crate::devices::BreakevenPrice;
use crate::sim::DispatchResult;

/// Query for `GET /dispatch`. Parsed by hand so bad input gets a JSON 400.
#[derive(Debug, Deserialize)]
pub struct DispatchQuery {
    /// What-if grid price ($/MWh).
    pub price: Option<String>,
}

/// Query for `GET /backtest`.
#[derive(Debug, Deserialize)]
pub struct BacktestQuery {
    /// Look-back window label, e.g. `24h`, `7d`, `30d`. Full history when absent.
    pub window: Option<String>,
}

/// Live dispatch at a requested price.
#[derive(Debug, Serialize)]
pub struct DispatchResponse {
    pub price_usd_per_mwh: f64,
    pub breakeven: BreakevenPrice,
    pub generation_mw: f64,
    pub result: DispatchResult,
    pub total_usd_per_hr: f64,
}

/// Error response body for 4xx errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}
