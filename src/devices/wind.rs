use crate::devices::types::{Generator, WeatherObservation};
use crate::error::{DispatchError, Result, ensure_capacity};

/// Wind speed below which the turbines do not turn (m/s).
pub const CUT_IN_MS: f64 = 3.0;
/// Wind speed at which the turbines reach nameplate (m/s).
pub const RATED_MS: f64 = 12.0;
/// Wind speed above which the turbines feather and stop (m/s).
pub const CUT_OUT_MS: f64 = 25.0;

const KMH_PER_MS: f64 = 3.6;

/// Wind farm output for a given wind speed and nameplate capacity.
///
/// Piecewise power curve on the speed in m/s:
/// - below cut-in or above cut-out: 0
/// - at or above rated: nameplate
/// - otherwise: `capacity * ((v - 3) / 9)^3`
///
/// The cubic ramp evaluates to exactly 1.0 at the rated speed, so the curve
/// is continuous there.
///
/// # Arguments
///
/// * `wind_speed_kmh` - Wind speed (km/h, must be >= 0)
/// * `capacity_mw` - Farm nameplate (MW, must be >= 0)
///
/// # Errors
///
/// Returns `InvalidConfiguration` for a negative capacity and
/// `InvalidObservation` for a negative or non-finite wind speed.
pub fn wind_output(wind_speed_kmh: f64, capacity_mw: f64) -> Result<f64> {
    ensure_capacity("plant.wind_capacity_mw", capacity_mw)?;
    if !wind_speed_kmh.is_finite() || wind_speed_kmh < 0.0 {
        return Err(DispatchError::observation(
            "weather.wind_speed_kmh",
            format!("must be finite and >= 0, got {wind_speed_kmh}"),
        ));
    }

    let speed_ms = wind_speed_kmh / KMH_PER_MS;
    if !(CUT_IN_MS..=CUT_OUT_MS).contains(&speed_ms) {
        return Ok(0.0);
    }
    if speed_ms >= RATED_MS {
        return Ok(capacity_mw);
    }
    let frac = (speed_ms - CUT_IN_MS) / (RATED_MS - CUT_IN_MS);
    Ok(capacity_mw * frac.powi(3))
}

/// A wind farm described only by its nameplate.
#[derive(Debug, Clone, Copy)]
pub struct WindFarm {
    /// Nameplate capacity in MW.
    pub capacity_mw: f64,
}

impl WindFarm {
    pub fn new(capacity_mw: f64) -> Self {
        Self { capacity_mw }
    }
}

impl Generator for WindFarm {
    fn output_mw(&self, weather: &WeatherObservation) -> Result<f64> {
        wind_output(weather.wind_speed_kmh, self.capacity_mw)
    }

    fn device_type(&self) -> &'static str {
        "Wind"
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn below_cut_in_is_zero() {
        assert_eq!(wind_output(0.0, 100.0).unwrap(), 0.0);
        assert_eq!(wind_output(10.7, 100.0).unwrap(), 0.0);
    }

    #[test]
    fn above_cut_out_is_zero() {
        assert_eq!(wind_output(90.1, 100.0).unwrap(), 0.0);
        assert_eq!(wind_output(150.0, 100.0).unwrap(), 0.0);
    }

    #[test]
    fn rated_band_returns_capacity() {
        assert_abs_diff_eq!(wind_output(43.2, 100.0).unwrap(), 100.0, epsilon = 1e-9);
        assert_eq!(wind_output(60.0, 100.0).unwrap(), 100.0);
        assert_abs_diff_eq!(wind_output(90.0, 100.0).unwrap(), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn cubic_ramp_at_six_metres_per_second() {
        // ((6 - 3) / 9)^3 * 100 = 3.7037
        assert_abs_diff_eq!(wind_output(21.6, 100.0).unwrap(), 3.7037, epsilon = 0.01);
    }

    #[test]
    fn ramp_meets_rated_output_without_a_step() {
        let just_below = wind_output((RATED_MS - 1e-9) * 3.6, 100.0).unwrap();
        let at_rated = wind_output(RATED_MS * 3.6, 100.0).unwrap();
        assert_abs_diff_eq!(just_below, at_rated, epsilon = 1e-6);
        assert_eq!(((RATED_MS - CUT_IN_MS) / 9.0).powi(3), 1.0);
    }

    #[test]
    fn ramp_is_monotonic() {
        let mut prev = 0.0;
        for tenth_kmh in 108..432 {
            let mw = wind_output(f64::from(tenth_kmh) / 10.0, 50.0).unwrap();
            assert!(mw >= prev);
            prev = mw;
        }
    }

    #[test]
    fn negative_speed_is_rejected() {
        assert!(wind_output(-1.0, 100.0).is_err());
    }

    #[test]
    fn negative_capacity_is_rejected() {
        assert!(wind_output(30.0, -10.0).is_err());
    }
}
