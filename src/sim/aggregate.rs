//! Folds the dispatch policy over a price history.

use std::fmt;
use std::ops::Add;

use serde::Serialize;
use tracing::debug;

use crate::devices::{BreakevenPrice, PlantConfig};
use crate::error::{Result, ensure_finite};

use super::policy::{DispatchPolicy, ensure_generation};
use super::types::{DispatchResult, PricePoint};

/// Revenue accumulated over a look-back window.
///
/// Totals are plain sums of the per-point `$/hr` figures. For hourly
/// history that is dollars; for other cadences it is a relative figure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PeriodRevenue {
    /// Sum of mining alpha.
    pub mining_total: f64,
    /// Sum of battery alpha and grid baseline.
    pub battery_grid_total: f64,
    /// `mining_total + battery_grid_total`.
    pub grand_total: f64,
}

impl PeriodRevenue {
    pub fn new(mining_total: f64, battery_grid_total: f64) -> Self {
        Self {
            mining_total,
            battery_grid_total,
            grand_total: mining_total + battery_grid_total,
        }
    }

    /// Sums already-computed dispatch results.
    pub fn from_results<'a, I>(results: I) -> Self
    where
        I: IntoIterator<Item = &'a DispatchResult>,
    {
        results.into_iter().fold(Self::default(), |acc, r| {
            acc + Self::new(
                r.mining_alpha_usd_per_hr,
                r.battery_alpha_usd_per_hr + r.grid_baseline_usd_per_hr,
            )
        })
    }
}

impl Add for PeriodRevenue {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(
            self.mining_total + rhs.mining_total,
            self.battery_grid_total + rhs.battery_grid_total,
        )
    }
}

impl fmt::Display for PeriodRevenue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mining ${:.2} | battery+grid ${:.2} | total ${:.2}",
            self.mining_total, self.battery_grid_total, self.grand_total
        )
    }
}

/// Runs the memoryless policy on every point with the same generation and
/// sums the revenue terms.
///
/// An empty slice is not an error and yields zero totals.
///
/// # Errors
///
/// Returns `InvalidConfiguration` for an invalid plant and
/// `InvalidObservation` for invalid generation or a non-finite price.
pub fn aggregate(
    points: &[PricePoint],
    plant: &PlantConfig,
    generation_mw: f64,
    breakeven: BreakevenPrice,
) -> Result<PeriodRevenue> {
    ensure_generation(generation_mw)?;
    let policy = DispatchPolicy::new(plant, breakeven)?;

    let results = points
        .iter()
        .map(|point| {
            ensure_finite("price_usd_per_mwh", point.price_usd_per_mwh)?;
            Ok(policy.decide(point.price_usd_per_mwh, generation_mw))
        })
        .collect::<Result<Vec<_>>>()?;
    let total = PeriodRevenue::from_results(&results);
    debug!(points = points.len(), generation_mw, %total, "aggregated period revenue");
    Ok(total)
}
