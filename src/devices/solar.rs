use crate::devices::types::{Generator, WeatherObservation};
use crate::error::{Result, ensure_capacity, ensure_finite};

/// Irradiance at which the array reaches its rated output (W/m²).
pub const RATED_IRRADIANCE_W_M2: f64 = 1000.0;

/// Fraction of the ideal output delivered after inverter, soiling and
/// temperature losses.
pub const PERFORMANCE_RATIO: f64 = 0.85;

/// Solar output for a given irradiance and nameplate capacity.
///
/// Output is linear in irradiance, scaled by [`PERFORMANCE_RATIO`], and
/// clipped at the nameplate. Irradiance at or below zero is night and yields
/// zero.
///
/// # Arguments
///
/// * `irradiance_w_m2` - Global horizontal irradiance (W/m²)
/// * `capacity_mw` - Array nameplate (MW, must be >= 0)
///
/// # Errors
///
/// Returns `InvalidConfiguration` for a negative capacity and
/// `InvalidObservation` for a non-finite irradiance.
///
/// # Examples
///
/// ```
/// use hybrid_dispatch::devices::solar::solar_output;
///
/// assert_eq!(solar_output(0.0, 100.0).unwrap(), 0.0);
/// assert_eq!(solar_output(1500.0, 100.0).unwrap(), 100.0);
/// ```
pub fn solar_output(irradiance_w_m2: f64, capacity_mw: f64) -> Result<f64> {
    ensure_capacity("plant.solar_capacity_mw", capacity_mw)?;
    ensure_finite("weather.irradiance_w_m2", irradiance_w_m2)?;
    if irradiance_w_m2 <= 0.0 {
        return Ok(0.0);
    }
    let mw = capacity_mw * (irradiance_w_m2 / RATED_IRRADIANCE_W_M2) * PERFORMANCE_RATIO;
    Ok(mw.min(capacity_mw))
}

/// A solar PV array described only by its nameplate.
#[derive(Debug, Clone, Copy)]
pub struct SolarArray {
    /// Nameplate capacity in MW.
    pub capacity_mw: f64,
}

impl SolarArray {
    pub fn new(capacity_mw: f64) -> Self {
        Self { capacity_mw }
    }
}

impl Generator for SolarArray {
    fn output_mw(&self, weather: &WeatherObservation) -> Result<f64> {
        solar_output(weather.irradiance_w_m2, self.capacity_mw)
    }

    fn device_type(&self) -> &'static str {
        "SolarPV"
    }
}
