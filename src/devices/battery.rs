use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, Result, ensure_capacity};

/// Battery parameters that the memoryless policy does not need but the
/// state-of-charge backtest does.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    /// Hours of storage at rated power (energy = power * duration).
    pub duration_hours: f64,
    /// Initial state of charge (0.0–1.0).
    pub initial_soc: f64,
    /// Reserve the battery never discharges below (0.0–1.0).
    pub min_soc: f64,
    /// Charge efficiency (0.0–1.0].
    pub eta_charge: f64,
    /// Discharge efficiency (0.0–1.0].
    pub eta_discharge: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            duration_hours: 2.0,
            initial_soc: 0.5,
            min_soc: 0.1,
            eta_charge: 0.95,
            eta_discharge: 0.95,
        }
    }
}

/// A grid-scale battery that tracks its state of charge.
///
/// `Battery` enforces power limits, the energy headroom above the current
/// SOC, and a discharge reserve at `min_soc`.
///
/// # Power Flow Convention
/// - Positive power: Charging (absorbing generation)
/// - Negative power: Discharging (exporting to the grid)
#[derive(Debug, Clone)]
pub struct Battery {
    /// Energy capacity in MWh.
    pub capacity_mwh: f64,

    /// State of charge as a fraction (0.0 to 1.0).
    pub soc: f64,

    /// Discharge reserve as a fraction (0.0 to 1.0).
    pub min_soc: f64,

    /// Maximum charge power in MW (positive value).
    pub max_charge_mw: f64,

    /// Maximum discharge power in MW (positive value).
    pub max_discharge_mw: f64,

    /// Charging efficiency (0..1.0).
    pub eta_c: f64,

    /// Discharging efficiency (0..1.0).
    pub eta_d: f64,
}

impl Battery {
    /// Creates a new battery with the specified parameters.
    ///
    /// # Arguments
    ///
    /// * `capacity_mwh` - Energy capacity in MWh (must be >= 0)
    /// * `soc` - Initial state of charge as a fraction (0.0 to 1.0)
    /// * `min_soc` - Discharge reserve (0.0 to 1.0)
    /// * `max_charge_mw` - Maximum charging power in MW
    /// * `max_discharge_mw` - Maximum discharging power in MW
    /// * `eta_c` - Charging efficiency (0..1.0]
    /// * `eta_d` - Discharging efficiency (0..1.0]
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for negative capacity or power,
    /// out-of-range SOC, or efficiencies outside `(0, 1]`.
    pub fn new(
        capacity_mwh: f64,
        soc: f64,
        min_soc: f64,
        max_charge_mw: f64,
        max_discharge_mw: f64,
        eta_c: f64,
        eta_d: f64,
    ) -> Result<Self> {
        ensure_capacity("battery.capacity_mwh", capacity_mwh)?;
        ensure_capacity("battery.max_charge_mw", max_charge_mw)?;
        ensure_capacity("battery.max_discharge_mw", max_discharge_mw)?;
        if !(0.0..=1.0).contains(&soc) {
            return Err(DispatchError::config("battery.initial_soc", "must be in [0.0, 1.0]"));
        }
        if !(0.0..=1.0).contains(&min_soc) {
            return Err(DispatchError::config("battery.min_soc", "must be in [0.0, 1.0]"));
        }
        if !(eta_c > 0.0 && eta_c <= 1.0) {
            return Err(DispatchError::config("battery.eta_charge", "must be in (0.0, 1.0]"));
        }
        if !(eta_d > 0.0 && eta_d <= 1.0) {
            return Err(DispatchError::config("battery.eta_discharge", "must be in (0.0, 1.0]"));
        }

        Ok(Self {
            capacity_mwh,
            soc,
            min_soc,
            max_charge_mw,
            max_discharge_mw,
            eta_c,
            eta_d,
        })
    }

    /// Builds a battery from a power rating and the configured duration.
    ///
    /// # Errors
    ///
    /// See [`Battery::new`].
    pub fn from_config(power_mw: f64, config: &BatteryConfig) -> Result<Self> {
        ensure_capacity("battery.duration_hours", config.duration_hours)?;
        Self::new(
            power_mw * config.duration_hours,
            config.initial_soc,
            config.min_soc,
            power_mw,
            power_mw,
            config.eta_charge,
            config.eta_discharge,
        )
    }

    /// Largest charge power the battery can absorb over `dt_hours`.
    pub fn charge_limit_mw(&self, dt_hours: f64) -> f64 {
        if self.capacity_mwh <= 0.0 || dt_hours <= 0.0 {
            return 0.0;
        }
        let headroom_mwh = (1.0 - self.soc) * self.capacity_mwh / self.eta_c;
        self.max_charge_mw.min((headroom_mwh / dt_hours).max(0.0))
    }

    /// Largest discharge power the battery can deliver over `dt_hours`
    /// without dropping below `min_soc`.
    pub fn discharge_limit_mw(&self, dt_hours: f64) -> f64 {
        if self.capacity_mwh <= 0.0 || dt_hours <= 0.0 {
            return 0.0;
        }
        let available_mwh = (self.soc - self.min_soc).max(0.0) * self.capacity_mwh * self.eta_d;
        self.max_discharge_mw.min(available_mwh / dt_hours)
    }

    /// Applies a power setpoint for one interval and returns the power
    /// actually delivered (same sign convention as the setpoint).
    pub fn apply_mw(&mut self, setpoint_mw: f64, dt_hours: f64) -> f64 {
        if setpoint_mw > 0.0 {
            let actual_mw = setpoint_mw.min(self.charge_limit_mw(dt_hours));
            if actual_mw > 0.0 {
                self.soc += (actual_mw * dt_hours * self.eta_c) / self.capacity_mwh;
                self.soc = self.soc.clamp(0.0, 1.0);
            }
            actual_mw
        } else if setpoint_mw < 0.0 {
            let actual_abs_mw = (-setpoint_mw).min(self.discharge_limit_mw(dt_hours));
            if actual_abs_mw > 0.0 {
                self.soc -= (actual_abs_mw * dt_hours) / (self.capacity_mwh * self.eta_d);
                self.soc = self.soc.clamp(0.0, 1.0);
            }
            -actual_abs_mw
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn lossless(capacity_mwh: f64, soc: f64) -> Battery {
        Battery::new(capacity_mwh, soc, 0.0, 50.0, 50.0, 1.0, 1.0).unwrap()
    }

    #[test]
    fn test_from_config_uses_duration() {
        let battery = Battery::from_config(60.0, &BatteryConfig::default()).unwrap();
        assert_eq!(battery.capacity_mwh, 120.0);
        assert_eq!(battery.max_charge_mw, 60.0);
        assert_eq!(battery.max_discharge_mw, 60.0);
        assert_eq!(battery.soc, 0.5);
    }

    #[test]
    fn test_invalid_soc_rejected() {
        assert!(Battery::new(10.0, 1.1, 0.0, 5.0, 5.0, 0.95, 0.95).is_err());
        assert!(Battery::new(10.0, -0.1, 0.0, 5.0, 5.0, 0.95, 0.95).is_err());
    }

    #[test]
    fn test_invalid_efficiency_rejected() {
        assert!(Battery::new(10.0, 0.5, 0.0, 5.0, 5.0, 0.0, 0.95).is_err());
        assert!(Battery::new(10.0, 0.5, 0.0, 5.0, 5.0, 0.95, 1.2).is_err());
    }

    #[test]
    fn test_charge_power_limit() {
        let mut battery = lossless(1000.0, 0.5);
        assert_eq!(battery.apply_mw(80.0, 1.0), 50.0);
    }

    #[test]
    fn test_discharge_power_limit() {
        let mut battery = lossless(1000.0, 0.5);
        assert_eq!(battery.apply_mw(-80.0, 1.0), -50.0);
    }

    #[test]
    fn test_charge_soc_limit() {
        // 100 MWh at 90% leaves 10 MWh of headroom in a one-hour interval.
        let mut battery = lossless(100.0, 0.9);
        let actual = battery.apply_mw(50.0, 1.0);
        assert_abs_diff_eq!(actual, 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(battery.soc, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_discharge_respects_reserve() {
        // 100 MWh at 30% with a 20% reserve leaves 10 MWh to deliver.
        let mut battery = Battery::new(100.0, 0.3, 0.2, 50.0, 50.0, 1.0, 1.0).unwrap();
        let actual = battery.apply_mw(-50.0, 1.0);
        assert_abs_diff_eq!(actual, -10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(battery.soc, 0.2, epsilon = 1e-9);
        assert_abs_diff_eq!(battery.apply_mw(-50.0, 1.0), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_efficiency_charge() {
        // 10 MW for 2 h at 90% stores 18 MWh of a 100 MWh pack.
        let mut battery = Battery::new(100.0, 0.0, 0.0, 10.0, 10.0, 0.9, 0.9).unwrap();
        battery.apply_mw(10.0, 2.0);
        assert_abs_diff_eq!(battery.soc, 0.18, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_capacity_never_moves() {
        let mut battery = Battery::new(0.0, 0.5, 0.0, 10.0, 10.0, 0.9, 0.9).unwrap();
        assert_eq!(battery.charge_limit_mw(1.0), 0.0);
        assert_eq!(battery.discharge_limit_mw(1.0), 0.0);
        assert_eq!(battery.apply_mw(5.0, 1.0), 0.0);
        assert_eq!(battery.soc, 0.5);
    }

    #[test]
    fn test_complete_charge_discharge_cycle() {
        let mut battery = Battery::new(100.0, 0.0, 0.0, 20.0, 20.0, 0.9, 0.9).unwrap();

        while battery.soc < 0.999 {
            battery.apply_mw(20.0, 1.0);
        }

        let mut delivered_mwh = 0.0;
        while battery.soc > 0.001 {
            delivered_mwh += -battery.apply_mw(-20.0, 1.0);
        }

        // 100 MWh stored, 90% round-trip on the way out.
        assert!((delivered_mwh - 90.0).abs() < 0.5);
    }
}
