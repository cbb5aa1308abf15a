//! Breakeven-relative three-state dispatch policy.

use tracing::trace;

use crate::devices::{BreakevenPrice, PlantConfig};
use crate::error::{DispatchError, Result, ensure_finite};

use super::types::{DispatchResult, DispatchState};

/// Battery power available for a single decision (MW, positive magnitudes).
///
/// The memoryless policy offers the full nameplate in both directions; the
/// state-of-charge backtest narrows these to what the pack can actually
/// absorb or deliver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryLimits {
    pub charge_mw: f64,
    pub discharge_mw: f64,
}

impl BatteryLimits {
    pub fn nameplate(battery_capacity_mw: f64) -> Self {
        Self {
            charge_mw: battery_capacity_mw,
            discharge_mw: battery_capacity_mw,
        }
    }
}

/// Dispatch policy for one plant and one breakeven price.
///
/// Transitions are a pure function of the current price: no hysteresis and
/// no minimum dwell time.
#[derive(Debug, Clone, Copy)]
pub struct DispatchPolicy {
    breakeven: BreakevenPrice,
    miner_capacity_mw: f64,
    battery_capacity_mw: f64,
}

impl DispatchPolicy {
    /// Creates a policy after validating the plant capacities.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for negative capacities.
    pub fn new(plant: &PlantConfig, breakeven: BreakevenPrice) -> Result<Self> {
        plant.validate()?;
        Ok(Self {
            breakeven,
            miner_capacity_mw: plant.miner_capacity_mw,
            battery_capacity_mw: plant.battery_capacity_mw,
        })
    }

    /// Selects the operating state. The LOW/HIGH boundary is exclusive, so
    /// a price exactly at breakeven is HIGH.
    pub fn state_for(&self, price_usd_per_mwh: f64) -> DispatchState {
        if price_usd_per_mwh < 0.0 {
            DispatchState::Negative
        } else if price_usd_per_mwh < self.breakeven.usd_per_mwh() {
            DispatchState::Low
        } else {
            DispatchState::High
        }
    }

    /// Decides with the battery's full nameplate available.
    pub fn decide(&self, price_usd_per_mwh: f64, generation_mw: f64) -> DispatchResult {
        self.decide_with_limits(
            price_usd_per_mwh,
            generation_mw,
            BatteryLimits::nameplate(self.battery_capacity_mw),
        )
    }

    /// Decides with explicit battery limits.
    ///
    /// Revenue attribution:
    /// - NEGATIVE: charging is avoided cost (`charge * |price|`, battery
    ///   bucket); miners take the remainder and earn the breakeven (mining
    ///   bucket); nothing is sold.
    /// - LOW: miners earn the spread `breakeven - price` on what they burn;
    ///   the surplus is sold at `price`.
    /// - HIGH: all generation is sold and the battery discharges into the
    ///   same price.
    pub fn decide_with_limits(
        &self,
        price_usd_per_mwh: f64,
        generation_mw: f64,
        limits: BatteryLimits,
    ) -> DispatchResult {
        let price = price_usd_per_mwh;
        let breakeven = self.breakeven.usd_per_mwh();
        let state = self.state_for(price);

        let result = match state {
            DispatchState::Negative => {
                let charge_mw = limits.charge_mw.min(generation_mw);
                let mining_mw = self
                    .miner_capacity_mw
                    .min((generation_mw - charge_mw).max(0.0));
                DispatchResult {
                    state,
                    generation_mw,
                    mining_load_mw: mining_mw,
                    grid_export_mw: 0.0,
                    battery_mw: charge_mw,
                    mining_alpha_usd_per_hr: mining_mw * breakeven,
                    battery_alpha_usd_per_hr: charge_mw * price.abs(),
                    grid_baseline_usd_per_hr: 0.0,
                }
            }
            DispatchState::Low => {
                let mining_mw = self.miner_capacity_mw.min(generation_mw);
                let export_mw = (generation_mw - mining_mw).max(0.0);
                DispatchResult {
                    state,
                    generation_mw,
                    mining_load_mw: mining_mw,
                    grid_export_mw: export_mw,
                    battery_mw: 0.0,
                    mining_alpha_usd_per_hr: mining_mw * (breakeven - price),
                    battery_alpha_usd_per_hr: 0.0,
                    grid_baseline_usd_per_hr: export_mw * price,
                }
            }
            DispatchState::High => {
                let discharge_mw = limits.discharge_mw;
                DispatchResult {
                    state,
                    generation_mw,
                    mining_load_mw: 0.0,
                    grid_export_mw: generation_mw + discharge_mw,
                    battery_mw: -discharge_mw,
                    mining_alpha_usd_per_hr: 0.0,
                    battery_alpha_usd_per_hr: discharge_mw * price,
                    grid_baseline_usd_per_hr: generation_mw * price,
                }
            }
        };
        trace!(
            %state,
            price,
            generation_mw,
            total = result.total_usd_per_hr(),
            "dispatch decision"
        );
        result
    }
}

/// Rejects generation that is negative or not a number.
pub(crate) fn ensure_generation(generation_mw: f64) -> Result<()> {
    if generation_mw.is_finite() && generation_mw >= 0.0 {
        Ok(())
    } else {
        Err(DispatchError::observation(
            "generation_mw",
            format!("must be finite and >= 0, got {generation_mw}"),
        ))
    }
}

/// Classifies the operating state and splits instantaneous revenue for one
/// price.
///
/// # Arguments
///
/// * `price_usd_per_mwh` - Current grid price (may be negative)
/// * `breakeven` - Mining breakeven price
/// * `generation_mw` - Current renewable output
/// * `plant` - Miner and battery nameplates
///
/// # Errors
///
/// Returns `InvalidConfiguration` for invalid capacities and
/// `InvalidObservation` for non-finite price or invalid generation.
pub fn dispatch(
    price_usd_per_mwh: f64,
    breakeven: BreakevenPrice,
    generation_mw: f64,
    plant: &PlantConfig,
) -> Result<DispatchResult> {
    ensure_finite("price_usd_per_mwh", price_usd_per_mwh)?;
    ensure_generation(generation_mw)?;
    let policy = DispatchPolicy::new(plant, breakeven)?;
    Ok(policy.decide(price_usd_per_mwh, generation_mw))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::devices::breakeven;

    fn plant() -> PlantConfig {
        PlantConfig {
            solar_capacity_mw: 100.0,
            wind_capacity_mw: 100.0,
            miner_capacity_mw: 35.0,
            battery_capacity_mw: 60.0,
        }
    }

    fn floor() -> BreakevenPrice {
        breakeven(4.0, 19.0).unwrap()
    }

    #[test]
    fn negative_price_charges_battery_first() {
        let r = dispatch(-10.0, floor(), 50.0, &plant()).unwrap();
        assert_eq!(r.state, DispatchState::Negative);
        assert_eq!(r.battery_mw, 50.0);
        assert_eq!(r.mining_load_mw, 0.0);
        assert_eq!(r.battery_alpha_usd_per_hr, 500.0);
        assert_eq!(r.mining_alpha_usd_per_hr, 0.0);
        assert_eq!(r.grid_baseline_usd_per_hr, 0.0);
    }

    #[test]
    fn negative_price_mines_the_remainder() {
        let r = dispatch(-20.0, floor(), 120.0, &plant()).unwrap();
        assert_eq!(r.battery_mw, 60.0);
        assert_eq!(r.mining_load_mw, 35.0);
        assert_abs_diff_eq!(
            r.mining_alpha_usd_per_hr,
            35.0 * floor().usd_per_mwh(),
            epsilon = 1e-9
        );
        assert_eq!(r.battery_alpha_usd_per_hr, 1200.0);
        assert_eq!(r.curtailed_mw(), 25.0);
    }

    #[test]
    fn low_price_mines_and_exports_surplus() {
        let be = floor();
        let r = dispatch(30.0, be, 100.0, &plant()).unwrap();
        assert_eq!(r.state, DispatchState::Low);
        assert_eq!(r.mining_load_mw, 35.0);
        assert_eq!(r.grid_export_mw, 65.0);
        assert_abs_diff_eq!(
            r.mining_alpha_usd_per_hr,
            35.0 * (be.usd_per_mwh() - 30.0),
            epsilon = 1e-9
        );
        assert_eq!(r.grid_baseline_usd_per_hr, 65.0 * 30.0);
        assert_eq!(r.battery_alpha_usd_per_hr, 0.0);
    }

    #[test]
    fn low_price_mining_is_capped_by_generation() {
        let r = dispatch(10.0, floor(), 20.0, &plant()).unwrap();
        assert_eq!(r.mining_load_mw, 20.0);
        assert_eq!(r.grid_export_mw, 0.0);
        assert_eq!(r.grid_baseline_usd_per_hr, 0.0);
    }

    #[test]
    fn zero_price_is_low() {
        let r = dispatch(0.0, floor(), 40.0, &plant()).unwrap();
        assert_eq!(r.state, DispatchState::Low);
    }

    #[test]
    fn just_below_breakeven_is_low() {
        let be = floor();
        let r = dispatch(be.usd_per_mwh() - 0.01, be, 80.0, &plant()).unwrap();
        assert_eq!(r.state, DispatchState::Low);
    }

    #[test]
    fn exactly_breakeven_is_high() {
        let be = floor();
        let r = dispatch(be.usd_per_mwh(), be, 80.0, &plant()).unwrap();
        assert_eq!(r.state, DispatchState::High);
    }

    #[test]
    fn high_price_sells_everything_and_discharges() {
        let r = dispatch(150.0, floor(), 80.0, &plant()).unwrap();
        assert_eq!(r.state, DispatchState::High);
        assert_eq!(r.mining_load_mw, 0.0);
        assert_eq!(r.mining_alpha_usd_per_hr, 0.0);
        assert_eq!(r.battery_alpha_usd_per_hr, 60.0 * 150.0);
        assert_eq!(r.grid_baseline_usd_per_hr, 80.0 * 150.0);
        assert_eq!(r.grid_export_mw, 140.0);
        assert_eq!(r.battery_mw, -60.0);
        assert_eq!(r.total_usd_per_hr(), 140.0 * 150.0);
    }

    #[test]
    fn no_generation_at_high_price_still_discharges() {
        let r = dispatch(200.0, floor(), 0.0, &plant()).unwrap();
        assert_eq!(r.grid_baseline_usd_per_hr, 0.0);
        assert_eq!(r.battery_alpha_usd_per_hr, 12_000.0);
    }

    #[test]
    fn limits_narrow_battery_terms() {
        let policy = DispatchPolicy::new(&plant(), floor()).unwrap();
        let limits = BatteryLimits {
            charge_mw: 10.0,
            discharge_mw: 5.0,
        };
        let neg = policy.decide_with_limits(-5.0, 50.0, limits);
        assert_eq!(neg.battery_mw, 10.0);
        assert_eq!(neg.mining_load_mw, 35.0);
        let high = policy.decide_with_limits(100.0, 50.0, limits);
        assert_eq!(high.battery_mw, -5.0);
        assert_eq!(high.battery_alpha_usd_per_hr, 500.0);
    }

    #[test]
    fn invalid_inputs_fail_fast() {
        let bad_plant = PlantConfig {
            miner_capacity_mw: -1.0,
            ..plant()
        };
        assert!(dispatch(10.0, floor(), 10.0, &bad_plant).is_err());
        assert!(dispatch(f64::NAN, floor(), 10.0, &plant()).is_err());
        assert!(dispatch(10.0, floor(), -1.0, &plant()).is_err());
    }

    #[test]
    fn total_is_sum_of_terms() {
        for price in [-40.0, 0.0, 25.0, 87.0, 88.0, 400.0] {
            let r = dispatch(price, floor(), 70.0, &plant()).unwrap();
            assert_abs_diff_eq!(
                r.total_usd_per_hr(),
                r.mining_alpha_usd_per_hr + r.battery_alpha_usd_per_hr + r.grid_baseline_usd_per_hr,
                epsilon = 1e-9
            );
        }
    }
}
