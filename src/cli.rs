//! Command-line arguments.

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::config::{ConfigError, ScenarioConfig};

/// Hybrid renewable / mining / battery dispatch revenue model.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Load the scenario from a TOML file.
    #[clap(long, conflicts_with = "preset")]
    pub scenario: Option<PathBuf>,

    /// Use a built-in preset (west_texas, high_wind, negative_prices).
    #[clap(long)]
    pub preset: Option<String>,

    /// Override the synthetic price history seed.
    #[clap(long)]
    pub seed: Option<u64>,

    /// Override the current grid price ($/MWh).
    #[clap(long, allow_negative_numbers = true)]
    pub price: Option<f64>,

    /// Override the current irradiance (W/m²).
    #[clap(long)]
    pub irradiance: Option<f64>,

    /// Override the current wind speed (km/h).
    #[clap(long = "wind-speed")]
    pub wind_speed: Option<f64>,

    /// Export backtest steps to CSV.
    #[clap(long = "telemetry-out")]
    pub telemetry_out: Option<PathBuf>,

    /// Dashboard password.
    #[clap(long, env = "HYBRID_DISPATCH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Start the REST API after printing the report.
    #[cfg(feature = "api")]
    #[clap(long)]
    pub serve: bool,

    /// API server port.
    #[cfg(feature = "api")]
    #[clap(long, default_value = "3000")]
    pub port: u16,
}

impl Args {
    /// Resolves the scenario: `--scenario` first, then `--preset`, then
    /// the West Texas default, with command-line overrides applied.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` for unreadable files or unknown presets.
    pub fn load_scenario(&self) -> Result<ScenarioConfig, ConfigError> {
        let mut config = match (&self.scenario, &self.preset) {
            (Some(path), _) => ScenarioConfig::from_toml_file(Path::new(path))?,
            (None, Some(name)) => ScenarioConfig::from_preset(name)?,
            (None, None) => ScenarioConfig::west_texas(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut ScenarioConfig) {
        if let Some(seed) = self.seed {
            config.market.synthetic.seed = seed;
        }
        if let Some(price) = self.price {
            config.market.price_usd_per_mwh = Some(price);
        }
        if let Some(irradiance) = self.irradiance {
            config.weather.irradiance_w_m2 = irradiance;
        }
        if let Some(wind_speed) = self.wind_speed {
            config.weather.wind_speed_kmh = wind_speed;
        }
    }
}
