//! Common types and traits for plant assets.

use rand::{Rng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ensure_capacity, ensure_finite};

use super::solar::SolarArray;
use super::wind::WindFarm;

/// A single weather reading from the external weather collaborator.
///
/// # Fields
/// * `irradiance_w_m2` - Global horizontal irradiance (W/m²)
/// * `wind_speed_kmh` - Wind speed at hub reference height (km/h)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeatherObservation {
    pub irradiance_w_m2: f64,
    pub wind_speed_kmh: f64,
}

impl WeatherObservation {
    pub fn new(irradiance_w_m2: f64, wind_speed_kmh: f64) -> Self {
        Self {
            irradiance_w_m2,
            wind_speed_kmh,
        }
    }
}

/// Nameplate capacities of the hybrid plant, all in MW.
///
/// Fields are public so that configuration surfaces can fill them in;
/// every core operation calls [`PlantConfig::validate`] before using them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlantConfig {
    /// Solar nameplate (MW).
    pub solar_capacity_mw: f64,
    /// Wind nameplate (MW).
    pub wind_capacity_mw: f64,
    /// Mining load nameplate (MW).
    pub miner_capacity_mw: f64,
    /// Battery power rating (MW).
    pub battery_capacity_mw: f64,
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            solar_capacity_mw: 100.0,
            wind_capacity_mw: 100.0,
            miner_capacity_mw: 35.0,
            battery_capacity_mw: 60.0,
        }
    }
}

impl PlantConfig {
    /// Checks that every capacity is finite and non-negative.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        ensure_capacity("plant.solar_capacity_mw", self.solar_capacity_mw)?;
        ensure_capacity("plant.wind_capacity_mw", self.wind_capacity_mw)?;
        ensure_capacity("plant.miner_capacity_mw", self.miner_capacity_mw)?;
        ensure_capacity("plant.battery_capacity_mw", self.battery_capacity_mw)
    }

    /// Combined renewable nameplate (solar + wind).
    pub fn renewable_capacity_mw(&self) -> f64 {
        self.solar_capacity_mw + self.wind_capacity_mw
    }
}

/// Trait for a weather-driven generator.
///
/// Implementors map a single observation to an instantaneous output in MW,
/// clamped to `[0, nameplate]`.
pub trait Generator {
    /// Returns the power output for the given weather.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid capacity or unusable observations.
    fn output_mw(&self, weather: &WeatherObservation) -> Result<f64>;

    /// Returns a human-readable type name for the generator.
    fn device_type(&self) -> &'static str;
}

/// Instantaneous generation split by source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GenerationEstimate {
    pub solar_mw: f64,
    pub wind_mw: f64,
}

impl GenerationEstimate {
    /// Estimates solar and wind output for one weather observation.
    ///
    /// # Errors
    ///
    /// Propagates validation errors from the plant capacities and the
    /// observation.
    pub fn estimate(weather: &WeatherObservation, plant: &PlantConfig) -> Result<Self> {
        plant.validate()?;
        ensure_finite("weather.irradiance_w_m2", weather.irradiance_w_m2)?;
        let solar = SolarArray::new(plant.solar_capacity_mw);
        let wind = WindFarm::new(plant.wind_capacity_mw);
        Ok(Self {
            solar_mw: solar.output_mw(weather)?,
            wind_mw: wind.output_mw(weather)?,
        })
    }

    /// Total renewable output (MW).
    pub fn total_mw(&self) -> f64 {
        self.solar_mw + self.wind_mw
    }
}

/// Utility function to generate Gaussian noise using Box-Muller transform.
///
/// # Arguments
///
/// * `rng` - Random number generator
/// * `std_dev` - Standard deviation of the noise
///
/// # Returns
///
/// Random value from a Gaussian distribution with mean 0 and specified standard deviation
pub fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }

    let u1: f64 = rng.random::<f64>().clamp(1e-12, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn default_plant_is_valid() {
        assert!(PlantConfig::default().validate().is_ok());
    }

    #[test]
    fn negative_battery_capacity_fails_fast() {
        let plant = PlantConfig {
            battery_capacity_mw: -5.0,
            ..PlantConfig::default()
        };
        assert!(plant.validate().is_err());
    }

    #[test]
    fn estimate_combines_solar_and_wind() {
        let plant = PlantConfig::default();
        let weather = WeatherObservation::new(500.0, 21.6);
        let estimate = GenerationEstimate::estimate(&weather, &plant).expect("valid inputs");
        assert_abs_diff_eq!(estimate.solar_mw, 42.5, epsilon = 1e-9);
        assert_abs_diff_eq!(estimate.wind_mw, 100.0 / 27.0, epsilon = 1e-9);
        assert_abs_diff_eq!(estimate.total_mw(), 42.5 + 100.0 / 27.0, epsilon = 1e-9);
    }

    #[test]
    fn estimate_rejects_nan_irradiance() {
        let weather = WeatherObservation::new(f64::NAN, 10.0);
        assert!(GenerationEstimate::estimate(&weather, &PlantConfig::default()).is_err());
    }

    #[test]
    fn gaussian_noise_zero_std_is_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(gaussian_noise(&mut rng, 0.0), 0.0);
    }

    #[test]
    fn gaussian_noise_is_deterministic_for_seed() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        for _ in 0..10 {
            assert_eq!(gaussian_noise(&mut a, 2.0), gaussian_noise(&mut b, 2.0));
        }
    }
}
