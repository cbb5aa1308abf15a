//! Market snapshot collaborators: where the current price, weather, and
//! price history come from.
//!
//! The core never distinguishes live data from the fallback snapshot;
//! [`FallbackSource`] swallows failures and logs them instead.

/// CSV price history.
pub mod history;
/// Seeded synthetic price history.
pub mod synthetic;

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{MarketConfig, ScenarioConfig};
use crate::devices::WeatherObservation;
use crate::error::DispatchError;
use crate::sim::types::PriceSeries;

pub use history::{load_price_history, read_price_history};
pub use synthetic::{SyntheticConfig, synthetic_history};

/// Default time-to-live of [`CachedSource`].
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Failure to produce a market snapshot.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot read price history {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed price history: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Invalid(#[from] DispatchError),
    #[error("market data unavailable: {0}")]
    Unavailable(String),
}

/// Current price, weather, and price history at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarketSnapshot {
    pub price_usd_per_mwh: f64,
    pub weather: WeatherObservation,
    pub history: PriceSeries,
}

impl MarketSnapshot {
    /// Price 0, no sun, no wind, no history.
    pub fn fallback() -> Self {
        Self::default()
    }
}

/// Anything that can produce a market snapshot.
pub trait SnapshotSource: Send + Sync {
    /// # Errors
    ///
    /// Returns a `SourceError` when the data cannot be produced.
    fn fetch(&self) -> Result<MarketSnapshot, SourceError>;
}

/// Always returns the same snapshot.
#[derive(Debug, Clone)]
pub struct StaticSource(pub MarketSnapshot);

impl SnapshotSource for StaticSource {
    fn fetch(&self) -> Result<MarketSnapshot, SourceError> {
        Ok(self.0.clone())
    }
}

/// Snapshot assembled from a scenario: configured weather, a CSV or
/// synthetic history, and either the price override or the newest
/// historical price.
#[derive(Debug, Clone)]
pub struct ScenarioSource {
    market: MarketConfig,
    weather: WeatherObservation,
}

impl ScenarioSource {
    pub fn new(market: MarketConfig, weather: WeatherObservation) -> Self {
        Self { market, weather }
    }

    pub fn from_config(config: &ScenarioConfig) -> Self {
        Self::new(config.market.clone(), config.weather)
    }
}

impl SnapshotSource for ScenarioSource {
    fn fetch(&self) -> Result<MarketSnapshot, SourceError> {
        let history = match &self.market.history_csv {
            Some(path) => load_price_history(path)?,
            None => synthetic_history(&self.market.synthetic, self.market.interval_minutes)?,
        };
        let price_usd_per_mwh = match (self.market.price_usd_per_mwh, history.last()) {
            (Some(price), _) => price,
            (None, Some(last)) => last.price_usd_per_mwh,
            (None, None) => {
                return Err(SourceError::Unavailable(
                    "price history is empty and no price override is set".to_string(),
                ));
            }
        };
        debug!(points = history.len(), price_usd_per_mwh, "scenario snapshot assembled");
        Ok(MarketSnapshot {
            price_usd_per_mwh,
            weather: self.weather,
            history,
        })
    }
}

/// Degrades every failure of the inner source to [`MarketSnapshot::fallback`].
#[derive(Debug, Clone)]
pub struct FallbackSource<S> {
    inner: S,
}

impl<S: SnapshotSource> FallbackSource<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Infallible variant of [`SnapshotSource::fetch`].
    pub fn snapshot(&self) -> MarketSnapshot {
        match self.inner.fetch() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(error = %err, "market data unavailable, using fallback snapshot");
                MarketSnapshot::fallback()
            }
        }
    }
}

impl<S: SnapshotSource> SnapshotSource for FallbackSource<S> {
    fn fetch(&self) -> Result<MarketSnapshot, SourceError> {
        Ok(self.snapshot())
    }
}

/// Reuses the last successful snapshot for a time-to-live.
///
/// Failures are not cached.
#[derive(Debug)]
pub struct CachedSource<S> {
    inner: S,
    ttl: Duration,
    cached: Mutex<Option<(Instant, MarketSnapshot)>>,
}

impl<S: SnapshotSource> CachedSource<S> {
    pub fn new(inner: S) -> Self {
        Self::with_ttl(inner, DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cached: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Drops the cached snapshot so the next fetch goes to the inner source.
    pub fn invalidate(&self) {
        *self.cached.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl<S: SnapshotSource> SnapshotSource for CachedSource<S> {
    fn fetch(&self) -> Result<MarketSnapshot, SourceError> {
        let mut slot = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((fetched_at, snapshot)) = slot.as_ref() {
            if fetched_at.elapsed() < self.ttl {
                return Ok(snapshot.clone());
            }
        }
        let snapshot = self.inner.fetch()?;
        *slot = Some((Instant::now(), snapshot.clone()));
        Ok(snapshot)
    }
}
