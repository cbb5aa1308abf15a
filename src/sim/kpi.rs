//! Post-hoc KPI computation from backtest steps.

use std::fmt;

use serde::Serialize;

use super::engine::BacktestStep;
use super::types::DispatchState;

/// Aggregate indicators derived from a complete backtest.
///
/// Computed post-hoc from the step vector so reported metrics always agree
/// with the exported step data.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KpiReport {
    /// Number of points evaluated.
    pub points: usize,
    /// Points spent in NEGATIVE.
    pub negative_points: usize,
    /// Points spent in LOW.
    pub low_points: usize,
    /// Points spent in HIGH.
    pub high_points: usize,
    /// Energy mined (MWh).
    pub mined_mwh: f64,
    /// Energy sold to the grid, including discharge (MWh).
    pub exported_mwh: f64,
    /// Total battery energy throughput (MWh, sum of |power| * dt).
    pub battery_throughput_mwh: f64,
    /// Battery equivalent full cycles (throughput / 2*capacity).
    pub battery_equivalent_full_cycles: f64,
    /// Generation neither mined, stored, nor exported (MWh).
    pub curtailed_mwh: f64,
    /// Mean total revenue per point ($/hr).
    pub mean_revenue_usd_per_hr: f64,
}

impl KpiReport {
    /// Computes all KPIs from the complete step vector.
    ///
    /// # Arguments
    ///
    /// * `steps` - Backtest steps in order
    /// * `dt_hours` - Interval each step is held for
    /// * `battery_capacity_mwh` - Battery energy capacity for cycle counting
    pub fn from_steps(steps: &[BacktestStep], dt_hours: f64, battery_capacity_mwh: f64) -> Self {
        if steps.is_empty() {
            return Self::default();
        }

        let mut report = Self {
            points: steps.len(),
            ..Self::default()
        };
        let mut revenue_sum = 0.0;

        for step in steps {
            let r = &step.result;
            match r.state {
                DispatchState::Negative => report.negative_points += 1,
                DispatchState::Low => report.low_points += 1,
                DispatchState::High => report.high_points += 1,
            }
            report.mined_mwh += r.mining_load_mw * dt_hours;
            report.exported_mwh += r.grid_export_mw * dt_hours;
            report.battery_throughput_mwh += r.battery_mw.abs() * dt_hours;
            report.curtailed_mwh += r.curtailed_mw() * dt_hours;
            revenue_sum += r.total_usd_per_hr();
        }

        report.battery_equivalent_full_cycles = if battery_capacity_mwh > 0.0 {
            report.battery_throughput_mwh / (2.0 * battery_capacity_mwh)
        } else {
            0.0
        };
        report.mean_revenue_usd_per_hr = revenue_sum / steps.len() as f64;
        report
    }

    /// Number of points spent in `state`.
    pub fn count(&self, state: DispatchState) -> usize {
        match state {
            DispatchState::Negative => self.negative_points,
            DispatchState::Low => self.low_points,
            DispatchState::High => self.high_points,
        }
    }

    /// Share of points spent in `state` (0–100). Zero for an empty run.
    pub fn pct(&self, state: DispatchState) -> f64 {
        if self.points == 0 {
            0.0
        } else {
            100.0 * self.count(state) as f64 / self.points as f64
        }
    }
}

impl fmt::Display for KpiReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- KPI Report ---")?;
        writeln!(f, "Points evaluated:      {}", self.points)?;
        for state in DispatchState::ALL {
            writeln!(
                f,
                "{:<22} {} ({:.1}%)",
                format!("{state} points:"),
                self.count(state),
                self.pct(state)
            )?;
        }
        writeln!(f, "Energy mined:          {:.2} MWh", self.mined_mwh)?;
        writeln!(f, "Energy exported:       {:.2} MWh", self.exported_mwh)?;
        writeln!(
            f,
            "Battery throughput:    {:.2} MWh ({:.2} equiv. cycles)",
            self.battery_throughput_mwh, self.battery_equivalent_full_cycles
        )?;
        writeln!(f, "Curtailed:             {:.2} MWh", self.curtailed_mwh)?;
        write!(f, "Mean revenue:          ${:.2}/hr", self.mean_revenue_usd_per_hr)
    }
}
