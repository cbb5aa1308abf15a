//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::devices::{Battery, BatteryConfig, MiningEconomics, PlantConfig, WeatherObservation};
use crate::error::{DispatchError, ensure_capacity};
use crate::market::SyntheticConfig;
use crate::projection::{BaseRevenueTable, SizingHeuristic};

/// Top-level scenario configuration parsed from TOML.
///
/// Missing sections fall back to the West Texas plant with a dark, calm
/// weather observation. Load from TOML with
/// [`ScenarioConfig::from_toml_file`] or use [`ScenarioConfig::west_texas`]
/// for the built-in default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Nameplate capacities.
    #[serde(default)]
    pub plant: PlantConfig,
    /// Hashprice and fleet efficiency.
    #[serde(default)]
    pub economics: MiningEconomics,
    /// Battery energy and efficiency parameters for the backtest.
    #[serde(default)]
    pub battery: BatteryConfig,
    /// Current weather observation.
    #[serde(default)]
    pub weather: WeatherObservation,
    /// Price source parameters.
    #[serde(default)]
    pub market: MarketConfig,
    /// Baseline revenue tables.
    #[serde(default)]
    pub projection: ProjectionConfig,
    /// Sizing shares.
    #[serde(default)]
    pub sizing: SizingHeuristic,
    /// Dashboard access.
    #[serde(default)]
    pub access: AccessConfig,
}

/// Where prices come from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarketConfig {
    /// Current price ($/MWh). Defaults to the newest historical price.
    pub price_usd_per_mwh: Option<f64>,
    /// CSV with `timestamp,price_usd_per_mwh`. Synthetic history when unset.
    pub history_csv: Option<PathBuf>,
    /// Spacing of history points (minutes).
    pub interval_minutes: u32,
    /// Synthetic history parameters.
    pub synthetic: SyntheticConfig,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            price_usd_per_mwh: None,
            history_csv: None,
            interval_minutes: 60,
            synthetic: SyntheticConfig::default(),
        }
    }
}

impl MarketConfig {
    pub fn interval_hours(&self) -> f64 {
        f64::from(self.interval_minutes) / 60.0
    }
}

/// Baseline revenue tables, one per historical window.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectionConfig {
    pub tables: Vec<BaseRevenueTable>,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            tables: vec![BaseRevenueTable::one_year()],
        }
    }
}

impl ProjectionConfig {
    /// Table used for the sizing delta: the `"1y"` table if present,
    /// otherwise the first one.
    pub fn annual(&self) -> Option<&BaseRevenueTable> {
        self.tables
            .iter()
            .find(|t| t.label == "1y")
            .or_else(|| self.tables.first())
    }
}

/// Dashboard access settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccessConfig {
    /// Password required to evaluate the report. Open access when unset.
    pub password: Option<String>,
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"plant.solar_capacity_mw"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<DispatchError> for ConfigError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::InvalidConfiguration { field, message }
            | DispatchError::InvalidObservation { field, message } => Self::new(field, message),
            other => Self::new("scenario", other.to_string()),
        }
    }
}

impl ScenarioConfig {
    /// The West Texas site: 100 MW solar, 100 MW wind, 35 MW miners, 60 MW
    /// battery, 4.0 ¢/TH at 19 J/TH, observed at 500 W/m² and 21.6 km/h.
    pub fn west_texas() -> Self {
        Self {
            weather: WeatherObservation::new(500.0, 21.6),
            ..Self::default()
        }
    }

    /// Wind-heavy site with a breezy current observation and cheaper nights.
    pub fn high_wind() -> Self {
        Self {
            plant: PlantConfig {
                solar_capacity_mw: 50.0,
                wind_capacity_mw: 300.0,
                miner_capacity_mw: 60.0,
                battery_capacity_mw: 80.0,
            },
            weather: WeatherObservation::new(150.0, 50.0),
            market: MarketConfig {
                synthetic: SyntheticConfig {
                    mean_usd_per_mwh: 35.0,
                    solar_dip_usd_per_mwh: 10.0,
                    ..SyntheticConfig::default()
                },
                ..MarketConfig::default()
            },
            ..Self::default()
        }
    }

    /// Solar-saturated market where midday prices routinely go negative.
    pub fn negative_prices() -> Self {
        Self {
            plant: PlantConfig {
                solar_capacity_mw: 250.0,
                wind_capacity_mw: 100.0,
                miner_capacity_mw: 70.0,
                battery_capacity_mw: 100.0,
            },
            battery: BatteryConfig {
                duration_hours: 4.0,
                initial_soc: 0.2,
                ..BatteryConfig::default()
            },
            weather: WeatherObservation::new(850.0, 20.0),
            market: MarketConfig {
                synthetic: SyntheticConfig {
                    mean_usd_per_mwh: 30.0,
                    solar_dip_usd_per_mwh: 70.0,
                    ..SyntheticConfig::default()
                },
                ..MarketConfig::default()
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["west_texas", "high_wind", "negative_prices"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "west_texas" => Ok(Self::west_texas()),
            "high_wind" => Ok(Self::high_wind()),
            "negative_prices" => Ok(Self::negative_prices()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// A relative `market.history_csv` is resolved against the scenario
    /// file's directory.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        let mut config = Self::from_toml_str(&content)?;
        if let (Some(csv), Some(dir)) = (&config.market.history_csv, path.parent()) {
            if csv.is_relative() {
                config.market.history_csv = Some(dir.join(csv));
            }
        }
        info!(path = %path.display(), "loaded scenario");
        Ok(config)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut check = |result: crate::error::Result<()>| {
            if let Err(e) = result {
                errors.push(ConfigError::from(e));
            }
        };

        let p = &self.plant;
        check(ensure_capacity("plant.solar_capacity_mw", p.solar_capacity_mw));
        check(ensure_capacity("plant.wind_capacity_mw", p.wind_capacity_mw));
        check(ensure_capacity("plant.miner_capacity_mw", p.miner_capacity_mw));
        check(ensure_capacity("plant.battery_capacity_mw", p.battery_capacity_mw));

        check(self.economics.validate());
        check(Battery::from_config(p.battery_capacity_mw.max(0.0), &self.battery).map(|_| ()));
        check(self.sizing.validate());
        for table in &self.projection.tables {
            check(table.validate());
        }

        let w = &self.weather;
        if !w.irradiance_w_m2.is_finite() {
            errors.push(ConfigError::new("weather.irradiance_w_m2", "must be finite"));
        }
        if !(w.wind_speed_kmh.is_finite() && w.wind_speed_kmh >= 0.0) {
            errors.push(ConfigError::new("weather.wind_speed_kmh", "must be finite and >= 0"));
        }

        let m = &self.market;
        if m.interval_minutes == 0 {
            errors.push(ConfigError::new("market.interval_minutes", "must be > 0"));
        }
        if let Err(e) = m.synthetic.validate() {
            errors.push(ConfigError::from(e));
        }
        if let Some(price) = m.price_usd_per_mwh {
            if !price.is_finite() {
                errors.push(ConfigError::new("market.price_usd_per_mwh", "must be finite"));
            }
        }

        if self.projection.tables.is_empty() {
            errors.push(ConfigError::new("projection.tables", "must contain at least one table"));
        }

        if let Some(password) = &self.access.password {
            if password.is_empty() {
                errors.push(ConfigError::new("access.password", "must not be empty when set"));
            }
        }

        errors
    }
}
