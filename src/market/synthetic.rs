use std::f64::consts::PI;

use chrono::{DateTime, TimeDelta, Utc};
use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::devices::types::gaussian_noise;
use crate::error::{DispatchError, Result};
use crate::sim::types::{PricePoint, PriceSeries};

/// Days from the Unix epoch to 2024-01-01, where synthetic histories start.
const SYNTHETIC_START_DAYS: i64 = 19_723;

/// Hour of the evening price peak.
const PEAK_HOUR: f64 = 18.0;

/// Parameters of the seeded synthetic price curve.
///
/// The price at hour-of-day `h` is
/// `mean + amplitude * cos(2π (h - 18) / 24) - dip(h) + noise`, where the
/// solar dip is a half-sine between 06:00 and 18:00 peaking at noon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyntheticConfig {
    /// RNG seed.
    pub seed: u64,
    /// Days of history to generate.
    pub days: u32,
    /// Daily mean price ($/MWh).
    pub mean_usd_per_mwh: f64,
    /// Half peak-to-trough swing of the daily curve ($/MWh).
    pub amplitude_usd_per_mwh: f64,
    /// Standard deviation of Gaussian noise ($/MWh).
    pub noise_std_usd_per_mwh: f64,
    /// Depth of the midday solar dip ($/MWh).
    pub solar_dip_usd_per_mwh: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            days: 30,
            mean_usd_per_mwh: 45.0,
            amplitude_usd_per_mwh: 45.0,
            noise_std_usd_per_mwh: 12.0,
            solar_dip_usd_per_mwh: 30.0,
        }
    }
}

fn diurnal_price(config: &SyntheticConfig, hour_of_day: f64) -> f64 {
    let daily = config.amplitude_usd_per_mwh * (2.0 * PI * (hour_of_day - PEAK_HOUR) / 24.0).cos();
    let dip = if (6.0..18.0).contains(&hour_of_day) {
        config.solar_dip_usd_per_mwh * (PI * (hour_of_day - 6.0) / 12.0).sin()
    } else {
        0.0
    };
    config.mean_usd_per_mwh + daily - dip
}

impl SyntheticConfig {
    /// Longest history that can be generated: ten years.
    pub const MAX_DAYS: u32 = 3660;

    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for more than [`Self::MAX_DAYS`] days
    /// or non-finite curve parameters.
    pub fn validate(&self) -> Result<()> {
        if self.days > Self::MAX_DAYS {
            return Err(DispatchError::config(
                "market.synthetic.days",
                format!("must be <= {}, got {}", Self::MAX_DAYS, self.days),
            ));
        }
        for (field, value) in [
            ("market.synthetic.mean_usd_per_mwh", self.mean_usd_per_mwh),
            ("market.synthetic.amplitude_usd_per_mwh", self.amplitude_usd_per_mwh),
            ("market.synthetic.noise_std_usd_per_mwh", self.noise_std_usd_per_mwh),
            ("market.synthetic.solar_dip_usd_per_mwh", self.solar_dip_usd_per_mwh),
        ] {
            if !value.is_finite() {
                return Err(DispatchError::config(field, "must be finite"));
            }
        }
        Ok(())
    }
}

/// Generates `days` of prices at `interval_minutes` spacing.
///
/// The same seed always yields the same series.
///
/// # Errors
///
/// Returns `InvalidConfiguration` for a zero interval or a config that
/// fails [`SyntheticConfig::validate`].
pub fn synthetic_history(config: &SyntheticConfig, interval_minutes: u32) -> Result<PriceSeries> {
    if interval_minutes == 0 {
        return Err(DispatchError::config("market.interval_minutes", "must be > 0"));
    }
    config.validate()?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let start = DateTime::<Utc>::UNIX_EPOCH + TimeDelta::days(SYNTHETIC_START_DAYS);
    let total = u64::from(config.days) * 24 * 60 / u64::from(interval_minutes);

    let points = (0..total)
        .map(|i| {
            let minutes = i * u64::from(interval_minutes);
            let hour_of_day = (minutes % (24 * 60)) as f64 / 60.0;
            let price = diurnal_price(config, hour_of_day)
                + gaussian_noise(&mut rng, config.noise_std_usd_per_mwh);
            PricePoint::new(start + TimeDelta::minutes(minutes as i64), price)
        })
        .collect();
    PriceSeries::new(points)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn quiet() -> SyntheticConfig {
        SyntheticConfig {
            noise_std_usd_per_mwh: 0.0,
            days: 1,
            ..SyntheticConfig::default()
        }
    }

    #[test]
    fn hourly_month_has_720_points() {
        let series = synthetic_history(&SyntheticConfig::default(), 60).unwrap();
        assert_eq!(series.len(), 720);
    }

    #[test]
    fn fifteen_minute_day_has_96_points() {
        let series = synthetic_history(&quiet(), 15).unwrap();
        assert_eq!(series.len(), 96);
    }

    #[test]
    fn same_seed_same_series() {
        let a = synthetic_history(&SyntheticConfig::default(), 60).unwrap();
        let b = synthetic_history(&SyntheticConfig::default(), 60).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_seed_different_series() {
        let other = SyntheticConfig {
            seed: 7,
            ..SyntheticConfig::default()
        };
        let a = synthetic_history(&SyntheticConfig::default(), 60).unwrap();
        let b = synthetic_history(&other, 60).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn noiseless_curve_peaks_in_the_evening() {
        let series = synthetic_history(&quiet(), 60).unwrap();
        let prices: Vec<f64> = series.points().iter().map(|p| p.price_usd_per_mwh).collect();
        assert_abs_diff_eq!(prices[18], 90.0, epsilon = 1e-9);
        // 45 + 45*cos(-π/2) - 30
        assert_abs_diff_eq!(prices[12], 15.0, epsilon = 1e-9);
    }

    #[test]
    fn deep_solar_dip_goes_negative() {
        let config = SyntheticConfig {
            solar_dip_usd_per_mwh: 80.0,
            ..quiet()
        };
        let series = synthetic_history(&config, 60).unwrap();
        assert!(series.points()[12].price_usd_per_mwh < 0.0);
    }

    #[test]
    fn zero_interval_is_rejected() {
        assert!(synthetic_history(&quiet(), 0).is_err());
    }

    #[test]
    fn days_beyond_ten_years_are_rejected() {
        let config = SyntheticConfig {
            days: 4_000_000_000,
            ..quiet()
        };
        let err = synthetic_history(&config, 60).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::InvalidConfiguration {
                field: "market.synthetic.days",
                ..
            }
        ));
        let longest = SyntheticConfig {
            days: SyntheticConfig::MAX_DAYS,
            ..quiet()
        };
        assert!(longest.validate().is_ok());
    }

    #[test]
    fn non_finite_mean_is_rejected() {
        let config = SyntheticConfig {
            mean_usd_per_mwh: f64::INFINITY,
            ..quiet()
        };
        assert!(synthetic_history(&config, 60).is_err());
    }

    #[test]
    fn zero_days_is_empty() {
        let config = SyntheticConfig { days: 0, ..quiet() };
        assert!(synthetic_history(&config, 60).unwrap().is_empty());
    }
}
