//! Scaled historical projection and the fixed-share sizing heuristic.
//!
//! Baseline tables hold revenue observed for a 100 MW reference unit over a
//! fixed window. Projections scale them linearly by the plant's nameplates.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::devices::PlantConfig;
use crate::error::{DispatchError, Result, ensure_capacity};

/// Nameplate of the reference unit the grid baselines were measured on.
const REFERENCE_UNIT_MW: f64 = 100.0;

/// Baseline revenue for one historical window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BaseRevenueTable {
    /// Window label, e.g. `"1y"`.
    pub label: String,
    /// Grid revenue of 100 MW of solar ($).
    pub grid_solar_per_100mw: f64,
    /// Grid revenue of 100 MW of wind ($).
    pub grid_wind_per_100mw: f64,
    /// Value added per MW of miners ($/MW).
    pub mining_per_mw: f64,
    /// Value added per MW of battery ($/MW).
    pub battery_per_mw: f64,
}

impl BaseRevenueTable {
    /// One-year West Texas baseline.
    pub fn one_year() -> Self {
        Self {
            label: "1y".to_string(),
            grid_solar_per_100mw: 8_250_000.0,
            grid_wind_per_100mw: 12_400_000.0,
            mining_per_mw: 222_857.0,
            battery_per_mw: 45_000.0,
        }
    }

    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for negative or non-finite constants.
    pub fn validate(&self) -> Result<()> {
        ensure_capacity("projection.grid_solar_per_100mw", self.grid_solar_per_100mw)?;
        ensure_capacity("projection.grid_wind_per_100mw", self.grid_wind_per_100mw)?;
        ensure_capacity("projection.mining_per_mw", self.mining_per_mw)?;
        ensure_capacity("projection.battery_per_mw", self.battery_per_mw)?;
        if self.label.trim().is_empty() {
            return Err(DispatchError::config("projection.label", "must not be empty"));
        }
        Ok(())
    }

    /// Mining plus battery revenue for the given sizing ($).
    pub fn storage_and_mining_revenue(&self, miner_mw: f64, battery_mw: f64) -> f64 {
        self.mining_per_mw * miner_mw + self.battery_per_mw * battery_mw
    }
}

impl Default for BaseRevenueTable {
    fn default() -> Self {
        Self::one_year()
    }
}

/// Projected revenue for one window, split by source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaledRevenue {
    pub label: String,
    pub grid: f64,
    pub mining: f64,
    pub battery: f64,
}

impl ScaledRevenue {
    pub fn total(&self) -> f64 {
        self.grid + self.mining + self.battery
    }
}

impl fmt::Display for ScaledRevenue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: total ${:.0} (grid ${:.0}, mining ${:.0}, battery ${:.0})",
            self.label,
            self.total(),
            self.grid,
            self.mining,
            self.battery
        )
    }
}

/// Scales a baseline table to the plant's capacities.
///
/// # Errors
///
/// Returns `InvalidConfiguration` for an invalid plant or table.
///
/// # Examples
///
/// ```
/// use hybrid_dispatch::devices::PlantConfig;
/// use hybrid_dispatch::projection::{BaseRevenueTable, project};
///
/// let scaled = project(&BaseRevenueTable::one_year(), &PlantConfig::default()).unwrap();
/// assert_eq!(scaled.grid, 8_250_000.0 + 12_400_000.0);
/// ```
pub fn project(table: &BaseRevenueTable, plant: &PlantConfig) -> Result<ScaledRevenue> {
    plant.validate()?;
    table.validate()?;
    let solar_scale = plant.solar_capacity_mw / REFERENCE_UNIT_MW;
    let wind_scale = plant.wind_capacity_mw / REFERENCE_UNIT_MW;
    Ok(ScaledRevenue {
        label: table.label.clone(),
        grid: table.grid_solar_per_100mw * solar_scale + table.grid_wind_per_100mw * wind_scale,
        mining: table.mining_per_mw * plant.miner_capacity_mw,
        battery: table.battery_per_mw * plant.battery_capacity_mw,
    })
}

/// Relative change from `baseline` to `candidate` in percent.
///
/// Returns `None` when the baseline is zero or either value is not finite.
pub fn percent_delta(baseline: f64, candidate: f64) -> Option<f64> {
    if baseline == 0.0 || !baseline.is_finite() || !candidate.is_finite() {
        return None;
    }
    Some((candidate - baseline) / baseline * 100.0)
}

/// Miner and battery sizing as fixed shares of renewable nameplate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SizingHeuristic {
    /// Miner share of solar + wind nameplate.
    pub miner_share: f64,
    /// Battery share of solar + wind nameplate.
    pub battery_share: f64,
}

impl Default for SizingHeuristic {
    fn default() -> Self {
        Self {
            miner_share: 0.20,
            battery_share: 0.30,
        }
    }
}

/// Recommended sizing in whole megawatts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SizingRecommendation {
    pub miner_mw: f64,
    pub battery_mw: f64,
}

impl SizingHeuristic {
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for negative or non-finite shares.
    pub fn validate(&self) -> Result<()> {
        ensure_capacity("sizing.miner_share", self.miner_share)?;
        ensure_capacity("sizing.battery_share", self.battery_share)
    }

    /// Sizes miners for base generation and the battery for peaks, rounded
    /// down to whole MW.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for an invalid plant or heuristic.
    pub fn recommend(&self, plant: &PlantConfig) -> Result<SizingRecommendation> {
        plant.validate()?;
        self.validate()?;
        let renewable_mw = plant.renewable_capacity_mw();
        Ok(SizingRecommendation {
            miner_mw: (renewable_mw * self.miner_share).floor(),
            battery_mw: (renewable_mw * self.battery_share).floor(),
        })
    }
}

/// Annual mining + battery revenue of the current sizing against the
/// recommended one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SizingDelta {
    pub current_revenue: f64,
    pub ideal_revenue: f64,
    /// `ideal_revenue - current_revenue`.
    pub delta: f64,
    /// `None` when the current sizing earns nothing.
    pub delta_pct: Option<f64>,
}

impl SizingDelta {
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for an invalid plant or table.
    pub fn compare(
        table: &BaseRevenueTable,
        plant: &PlantConfig,
        recommendation: &SizingRecommendation,
    ) -> Result<Self> {
        plant.validate()?;
        table.validate()?;
        let current_revenue =
            table.storage_and_mining_revenue(plant.miner_capacity_mw, plant.battery_capacity_mw);
        let ideal_revenue =
            table.storage_and_mining_revenue(recommendation.miner_mw, recommendation.battery_mw);
        Ok(Self {
            current_revenue,
            ideal_revenue,
            delta: ideal_revenue - current_revenue,
            delta_pct: percent_delta(current_revenue, ideal_revenue),
        })
    }
}

impl fmt::Display for SizingDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.0}", self.delta)?;
        match self.delta_pct {
            Some(pct) => write!(f, " ({pct:+.1}%)"),
            None => write!(f, " (n/a)"),
        }
    }
}
