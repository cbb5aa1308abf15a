//! Plant assets: weather-driven generators, the mining fleet, and storage.

/// Grid-scale battery with state of charge.
pub mod battery;
/// Mining economics and breakeven price.
pub mod miner;
/// Solar photovoltaic generation model.
pub mod solar;
pub mod types;
/// Wind farm power curve.
pub mod wind;

// Re-export the main types for convenience
pub use battery::{Battery, BatteryConfig};
pub use miner::{BreakevenPrice, MiningEconomics, breakeven};
pub use solar::{SolarArray, solar_output};
pub use types::{GenerationEstimate, Generator, PlantConfig, WeatherObservation};
pub use wind::{WindFarm, wind_output};
