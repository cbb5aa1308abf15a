//! State-of-charge backtest that threads a [`Battery`] through the policy.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::devices::{Battery, BreakevenPrice, PlantConfig};
use crate::error::{DispatchError, Result, ensure_finite};

use super::aggregate::PeriodRevenue;
use super::policy::{BatteryLimits, DispatchPolicy, ensure_generation};
use super::types::{DispatchResult, DispatchState, PricePoint};

/// One backtest decision together with the battery state after it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BacktestStep {
    pub timestamp: DateTime<Utc>,
    pub price_usd_per_mwh: f64,
    pub result: DispatchResult,
    /// State of charge after applying `result.battery_mw` (0.0–1.0).
    pub battery_soc: f64,
}

/// Replays a price history with a stateful battery.
///
/// NEGATIVE charging is limited by the headroom above the current state of
/// charge, HIGH discharging by the energy above `min_soc`, and the battery
/// idles in LOW. Generation is held constant across the whole replay.
#[derive(Debug, Clone)]
pub struct Backtest {
    policy: DispatchPolicy,
    battery: Battery,
    generation_mw: f64,
    interval_hours: f64,
}

impl Backtest {
    /// Creates a backtest.
    ///
    /// # Arguments
    ///
    /// * `plant` - Miner and battery nameplates
    /// * `breakeven` - Mining breakeven price
    /// * `battery` - Battery with its starting state of charge
    /// * `generation_mw` - Generation held for every point
    /// * `interval_hours` - Duration each price point is held (> 0)
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for an invalid plant or interval and
    /// `InvalidObservation` for invalid generation.
    pub fn new(
        plant: &PlantConfig,
        breakeven: BreakevenPrice,
        battery: Battery,
        generation_mw: f64,
        interval_hours: f64,
    ) -> Result<Self> {
        ensure_generation(generation_mw)?;
        if !(interval_hours.is_finite() && interval_hours > 0.0) {
            return Err(DispatchError::config(
                "market.interval_minutes",
                format!("interval must be > 0, got {interval_hours} h"),
            ));
        }
        Ok(Self {
            policy: DispatchPolicy::new(plant, breakeven)?,
            battery,
            generation_mw,
            interval_hours,
        })
    }

    /// Decides one point and applies the battery setpoint.
    ///
    /// # Errors
    ///
    /// Returns `InvalidObservation` for a non-finite price.
    pub fn step(&mut self, point: &PricePoint) -> Result<BacktestStep> {
        let price = point.price_usd_per_mwh;
        ensure_finite("price_usd_per_mwh", price)?;
        let dt = self.interval_hours;

        let limits = match self.policy.state_for(price) {
            DispatchState::Negative => BatteryLimits {
                charge_mw: self.battery.charge_limit_mw(dt),
                discharge_mw: 0.0,
            },
            DispatchState::Low => BatteryLimits {
                charge_mw: 0.0,
                discharge_mw: 0.0,
            },
            DispatchState::High => BatteryLimits {
                charge_mw: 0.0,
                discharge_mw: self.battery.discharge_limit_mw(dt),
            },
        };
        let result = self.policy.decide_with_limits(price, self.generation_mw, limits);
        self.battery.apply_mw(result.battery_mw, dt);

        Ok(BacktestStep {
            timestamp: point.timestamp,
            price_usd_per_mwh: price,
            result,
            battery_soc: self.battery.soc,
        })
    }

    /// Steps through every point in order.
    ///
    /// # Errors
    ///
    /// Stops at the first non-finite price.
    pub fn run(&mut self, points: &[PricePoint]) -> Result<Vec<BacktestStep>> {
        let steps = points
            .iter()
            .map(|point| self.step(point))
            .collect::<Result<Vec<_>>>()?;
        debug!(
            points = steps.len(),
            final_soc = self.battery.soc,
            "backtest finished"
        );
        Ok(steps)
    }

    pub fn battery(&self) -> &Battery {
        &self.battery
    }

    pub fn interval_hours(&self) -> f64 {
        self.interval_hours
    }
}

/// Sums backtest revenue the same way the memoryless aggregator does.
pub fn backtest_revenue(steps: &[BacktestStep]) -> PeriodRevenue {
    PeriodRevenue::from_results(steps.iter().map(|s| &s.result))
}
