use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, Result};

const JOULES_PER_MEGAJOULE: f64 = 1_000_000.0;
const CENTS_PER_DOLLAR: f64 = 100.0;
const HOURS_PER_DAY: f64 = 24.0;

/// Bitcoin mining economics as entered on the configuration surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MiningEconomics {
    /// Daily revenue per TH/s of hashrate (US cents).
    pub hashprice_cents_per_th: f64,
    /// Fleet efficiency (J/TH).
    pub efficiency_joules_per_th: f64,
}

impl Default for MiningEconomics {
    fn default() -> Self {
        Self {
            hashprice_cents_per_th: 4.0,
            efficiency_joules_per_th: 19.0,
        }
    }
}

impl MiningEconomics {
    /// Checks that hashprice and efficiency are finite and strictly positive.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for the first offending field.
    pub fn validate(&self) -> Result<()> {
        if !(self.hashprice_cents_per_th.is_finite() && self.hashprice_cents_per_th > 0.0) {
            return Err(DispatchError::config(
                "economics.hashprice_cents_per_th",
                format!("must be > 0, got {}", self.hashprice_cents_per_th),
            ));
        }
        if !(self.efficiency_joules_per_th.is_finite() && self.efficiency_joules_per_th > 0.0) {
            return Err(DispatchError::config(
                "economics.efficiency_joules_per_th",
                format!("must be > 0, got {}", self.efficiency_joules_per_th),
            ));
        }
        Ok(())
    }

    /// Breakeven grid price for these economics.
    ///
    /// # Errors
    ///
    /// See [`MiningEconomics::validate`].
    pub fn breakeven(&self) -> Result<BreakevenPrice> {
        breakeven(self.hashprice_cents_per_th, self.efficiency_joules_per_th)
    }
}

/// Grid price ($/MWh) at which mining a MWh earns as much as selling it.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct BreakevenPrice(f64);

impl BreakevenPrice {
    /// Wraps an already-known breakeven, e.g. one quoted by a pool.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` unless the value is finite and > 0.
    pub fn new(usd_per_mwh: f64) -> Result<Self> {
        if usd_per_mwh.is_finite() && usd_per_mwh > 0.0 {
            Ok(Self(usd_per_mwh))
        } else {
            Err(DispatchError::config(
                "breakeven_usd_per_mwh",
                format!("must be > 0, got {usd_per_mwh}"),
            ))
        }
    }

    pub fn usd_per_mwh(self) -> f64 {
        self.0
    }
}

impl fmt::Display for BreakevenPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}/MWh", self.0)
    }
}

/// Converts hashprice and miner efficiency into a $/MWh breakeven.
///
/// One MW of miners sustains `1e6 / efficiency` TH/s. Multiplying by the
/// daily hashprice in dollars gives daily revenue per MW, and dividing by 24
/// gives revenue per MWh consumed.
///
/// # Arguments
///
/// * `hashprice_cents_per_th` - Daily revenue per TH/s (US cents, > 0)
/// * `efficiency_joules_per_th` - Fleet efficiency (J/TH, > 0)
///
/// # Errors
///
/// Returns `InvalidConfiguration` if either input is not strictly positive.
///
/// # Examples
///
/// ```
/// use hybrid_dispatch::devices::miner::breakeven;
///
/// let price = breakeven(4.0, 19.0).unwrap();
/// assert!((price.usd_per_mwh() - 87.72).abs() < 0.01);
/// ```
pub fn breakeven(
    hashprice_cents_per_th: f64,
    efficiency_joules_per_th: f64,
) -> Result<BreakevenPrice> {
    let economics = MiningEconomics {
        hashprice_cents_per_th,
        efficiency_joules_per_th,
    };
    economics.validate()?;
    let th_per_mw = JOULES_PER_MEGAJOULE / efficiency_joules_per_th;
    let usd_per_mw_day = th_per_mw * (hashprice_cents_per_th / CENTS_PER_DOLLAR);
    Ok(BreakevenPrice(usd_per_mw_day / HOURS_PER_DAY))
}
