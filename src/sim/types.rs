//! Core dispatch types: operating states, per-point results, and price history.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{DispatchError, Result, ensure_finite};

/// Operating state selected by comparing the grid price to zero and to the
/// mining breakeven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchState {
    /// `price < 0`: absorb generation into the battery, mine the rest.
    Negative,
    /// `0 <= price < breakeven`: mine at capacity, export the surplus.
    Low,
    /// `price >= breakeven`: miners off, battery discharges to the grid.
    High,
}

impl DispatchState {
    pub const ALL: [Self; 3] = [Self::Negative, Self::Low, Self::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Negative => "NEGATIVE",
            Self::Low => "LOW",
            Self::High => "HIGH",
        }
    }
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the dispatch policy for a single price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DispatchResult {
    /// Selected operating state.
    pub state: DispatchState,
    /// Renewable generation the decision was made with (MW).
    pub generation_mw: f64,
    /// Power drawn by the miners (MW).
    pub mining_load_mw: f64,
    /// Power sold to the grid, generation plus any battery discharge (MW).
    pub grid_export_mw: f64,
    /// Battery power (MW; positive=charge, negative=discharge).
    pub battery_mw: f64,
    /// Value added by mining instead of selling ($/hr).
    pub mining_alpha_usd_per_hr: f64,
    /// Value added by battery charge (avoided cost) or discharge ($/hr).
    pub battery_alpha_usd_per_hr: f64,
    /// Plain grid sale revenue ($/hr).
    pub grid_baseline_usd_per_hr: f64,
}

impl DispatchResult {
    /// Total instantaneous revenue ($/hr).
    pub fn total_usd_per_hr(&self) -> f64 {
        self.mining_alpha_usd_per_hr + self.battery_alpha_usd_per_hr + self.grid_baseline_usd_per_hr
    }

    /// Generation that was neither mined, stored, nor exported (MW).
    pub fn curtailed_mw(&self) -> f64 {
        // Discharge shows up in both `grid_export_mw` and (negatively) in
        // `battery_mw`, so the signed sum is what generation supplied.
        let used = self.mining_load_mw + self.battery_mw + self.grid_export_mw;
        (self.generation_mw - used).max(0.0)
    }
}

impl fmt::Display for DispatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<8} | gen={:>7.2} MW  mine={:>6.2} MW  export={:>7.2} MW  bat={:>7.2} MW | \
             mining=${:.2}/hr  battery=${:.2}/hr  grid=${:.2}/hr",
            self.state,
            self.generation_mw,
            self.mining_load_mw,
            self.grid_export_mw,
            self.battery_mw,
            self.mining_alpha_usd_per_hr,
            self.battery_alpha_usd_per_hr,
            self.grid_baseline_usd_per_hr,
        )
    }
}

/// One settlement price at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price_usd_per_mwh: f64,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, price_usd_per_mwh: f64) -> Self {
        Self {
            timestamp,
            price_usd_per_mwh,
        }
    }
}

/// Chronologically ordered price history. Prices may be negative.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Builds a series, checking that timestamps never go backwards and that
    /// every price is finite.
    ///
    /// # Errors
    ///
    /// Returns `UnorderedSeries` or `InvalidObservation`.
    pub fn new(points: Vec<PricePoint>) -> Result<Self> {
        for (index, pair) in points.windows(2).enumerate() {
            if pair[1].timestamp < pair[0].timestamp {
                return Err(DispatchError::UnorderedSeries { index: index + 1 });
            }
        }
        for point in &points {
            ensure_finite("price_usd_per_mwh", point.price_usd_per_mwh)?;
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    /// Points strictly newer than `last_timestamp - window`.
    ///
    /// The window is anchored on the newest point rather than the wall
    /// clock, so stale histories still produce full windows.
    pub fn trailing(&self, window: LookbackWindow) -> &[PricePoint] {
        let Some(last) = self.points.last() else {
            return &[];
        };
        let Some(cutoff) = last.timestamp.checked_sub_signed(window.duration()) else {
            return &self.points;
        };
        let start = self.points.partition_point(|p| p.timestamp <= cutoff);
        &self.points[start..]
    }
}

/// Look-back window for period revenue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookbackWindow {
    /// Last 24 hours.
    Day,
    /// Last 7 days.
    Week,
    /// Last 30 days.
    Month,
    /// Arbitrary number of hours.
    Hours(u32),
}

impl LookbackWindow {
    /// Longest window accepted when parsing: 100 years.
    pub const MAX_HOURS: u32 = 24 * 36_525;

    /// Windows shown on the dashboard.
    pub const STANDARD: [Self; 3] = [Self::Day, Self::Week, Self::Month];

    pub fn hours(self) -> u32 {
        match self {
            Self::Day => 24,
            Self::Week => 24 * 7,
            Self::Month => 24 * 30,
            Self::Hours(h) => h,
        }
    }

    pub fn duration(self) -> TimeDelta {
        TimeDelta::hours(i64::from(self.hours()))
    }

    fn from_hours(hours: u32) -> Self {
        match hours {
            24 => Self::Day,
            168 => Self::Week,
            720 => Self::Month,
            h => Self::Hours(h),
        }
    }
}

impl fmt::Display for LookbackWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.hours();
        if hours == 24 {
            write!(f, "24h")
        } else if hours % 24 == 0 {
            write!(f, "{}d", hours / 24)
        } else {
            write!(f, "{hours}h")
        }
    }
}

impl FromStr for LookbackWindow {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let (digits, per_unit) = if let Some(d) = s.strip_suffix('h') {
            (d, 1)
        } else if let Some(d) = s.strip_suffix('d') {
            (d, 24)
        } else {
            return Err(format!("window \"{s}\" must end in `h` or `d`"));
        };
        let n: u32 = digits
            .parse()
            .map_err(|_| format!("window \"{s}\" must start with a whole number"))?;
        let hours = n
            .checked_mul(per_unit)
            .filter(|h| (1..=Self::MAX_HOURS).contains(h))
            .ok_or_else(|| {
                format!("window \"{s}\" must be between 1h and {}h", Self::MAX_HOURS)
            })?;
        Ok(Self::from_hours(hours))
    }
}

impl Serialize for LookbackWindow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LookbackWindow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
