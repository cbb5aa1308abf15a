//! One evaluation pass over a scenario and a market snapshot.

use std::fmt;

use serde::Serialize;
use tracing::info;

use crate::config::ScenarioConfig;
use crate::devices::{Battery, BreakevenPrice, GenerationEstimate, WeatherObservation};
use crate::error::Result;
use crate::market::MarketSnapshot;
use crate::projection::{ScaledRevenue, SizingDelta, SizingRecommendation, project};
use crate::session::Session;
use crate::sim::{
    Backtest, BacktestStep, DispatchResult, KpiReport, LookbackWindow, PeriodRevenue, PricePoint,
    aggregate, backtest_revenue, dispatch,
};

/// Memoryless revenue for one look-back window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowRevenue {
    pub window: LookbackWindow,
    pub points: usize,
    pub revenue: PeriodRevenue,
}

/// Result of the state-of-charge backtest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestSummary {
    /// Window replayed, `None` for the full history.
    pub window: Option<LookbackWindow>,
    pub revenue: PeriodRevenue,
    pub final_soc: f64,
    pub kpi: KpiReport,
    #[serde(skip)]
    pub steps: Vec<BacktestStep>,
}

impl BacktestSummary {
    /// Replays `points` with a fresh battery built from the scenario.
    ///
    /// # Errors
    ///
    /// Propagates configuration and observation errors.
    pub fn run(
        config: &ScenarioConfig,
        breakeven: BreakevenPrice,
        generation_mw: f64,
        points: &[PricePoint],
        window: Option<LookbackWindow>,
    ) -> Result<Self> {
        let battery = Battery::from_config(config.plant.battery_capacity_mw, &config.battery)?;
        let capacity_mwh = battery.capacity_mwh;
        let dt_hours = config.market.interval_hours();
        let mut backtest =
            Backtest::new(&config.plant, breakeven, battery, generation_mw, dt_hours)?;
        let steps = backtest.run(points)?;
        Ok(Self {
            window,
            revenue: backtest_revenue(&steps),
            final_soc: backtest.battery().soc,
            kpi: KpiReport::from_steps(&steps, backtest.interval_hours(), capacity_mwh),
            steps,
        })
    }
}

/// Everything the dashboard shows, as plain values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub breakeven: BreakevenPrice,
    pub price_usd_per_mwh: f64,
    pub weather: WeatherObservation,
    pub generation: GenerationEstimate,
    pub live: DispatchResult,
    pub periods: Vec<WindowRevenue>,
    pub backtest: BacktestSummary,
    pub projections: Vec<ScaledRevenue>,
    pub sizing: SizingRecommendation,
    /// `None` when no projection table is configured.
    pub sizing_delta: Option<SizingDelta>,
}

impl DashboardReport {
    /// Evaluates the whole dashboard for one snapshot.
    ///
    /// Current weather is held constant over every historical window.
    ///
    /// # Errors
    ///
    /// Returns `AccessDenied` for an unauthenticated session, otherwise
    /// propagates configuration and observation errors.
    pub fn evaluate(
        session: &Session,
        config: &ScenarioConfig,
        snapshot: &MarketSnapshot,
    ) -> Result<Self> {
        session.require()?;

        let plant = &config.plant;
        let breakeven = config.economics.breakeven()?;
        let generation = GenerationEstimate::estimate(&snapshot.weather, plant)?;
        let generation_mw = generation.total_mw();
        let live = dispatch(snapshot.price_usd_per_mwh, breakeven, generation_mw, plant)?;

        let periods = LookbackWindow::STANDARD
            .iter()
            .map(|&window| {
                let points = snapshot.history.trailing(window);
                Ok(WindowRevenue {
                    window,
                    points: points.len(),
                    revenue: aggregate(points, plant, generation_mw, breakeven)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let history = snapshot.history.points();
        let backtest = BacktestSummary::run(config, breakeven, generation_mw, history, None)?;

        let projections = config
            .projection
            .tables
            .iter()
            .map(|table| project(table, plant))
            .collect::<Result<Vec<_>>>()?;

        let sizing = config.sizing.recommend(plant)?;
        let sizing_delta = config
            .projection
            .annual()
            .map(|table| SizingDelta::compare(table, plant, &sizing))
            .transpose()?;

        info!(
            state = %live.state,
            %breakeven,
            generation_mw,
            history_points = snapshot.history.len(),
            "dashboard evaluated"
        );

        Ok(Self {
            breakeven,
            price_usd_per_mwh: snapshot.price_usd_per_mwh,
            weather: snapshot.weather,
            generation,
            live,
            periods,
            backtest,
            projections,
            sizing,
            sizing_delta,
        })
    }
}

impl fmt::Display for DashboardReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Live ---")?;
        writeln!(f, "Breakeven floor:       {}", self.breakeven)?;
        writeln!(f, "Current price:         ${:.2}/MWh", self.price_usd_per_mwh)?;
        writeln!(
            f,
            "Weather:               {:.0} W/m2, {:.1} km/h",
            self.weather.irradiance_w_m2, self.weather.wind_speed_kmh
        )?;
        writeln!(f, "Solar output:          {:.1} MW", self.generation.solar_mw)?;
        writeln!(f, "Wind output:           {:.1} MW", self.generation.wind_mw)?;
        writeln!(f, "Dispatch state:        {}", self.live.state)?;
        writeln!(f, "Mining alpha:          ${:.2}/hr", self.live.mining_alpha_usd_per_hr)?;
        writeln!(f, "Battery alpha:         ${:.2}/hr", self.live.battery_alpha_usd_per_hr)?;
        writeln!(f, "Grid baseline:         ${:.2}/hr", self.live.grid_baseline_usd_per_hr)?;
        writeln!(f, "Total hybrid revenue:  ${:.2}/hr", self.live.total_usd_per_hr())?;

        writeln!(f, "\n--- Period Revenue ---")?;
        for period in &self.periods {
            writeln!(
                f,
                "{:<22} {} ({} points)",
                format!("Last {}:", period.window),
                period.revenue,
                period.points
            )?;
        }
        writeln!(
            f,
            "SoC backtest:          {} (final SoC {:.1}%)",
            self.backtest.revenue,
            self.backtest.final_soc * 100.0
        )?;

        writeln!(f, "\n{}", self.backtest.kpi)?;

        writeln!(f, "\n--- Projection ---")?;
        for projection in &self.projections {
            writeln!(f, "{projection}")?;
        }

        writeln!(f, "\n--- Sizing ---")?;
        writeln!(f, "Recommended miners:    {:.0} MW", self.sizing.miner_mw)?;
        write!(f, "Recommended battery:   {:.0} MW", self.sizing.battery_mw)?;
        if let Some(delta) = &self.sizing_delta {
            write!(f, "\nOptimization delta:    {delta}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::{TimeDelta, TimeZone, Utc};

    use super::*;
    use crate::error::DispatchError;
    use crate::sim::{DispatchState, PriceSeries};

    fn snapshot(price: f64, prices: &[f64]) -> MarketSnapshot {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let points = prices
            .iter()
            .enumerate()
            .map(|(i, &p)| PricePoint::new(start + TimeDelta::hours(i as i64), p))
            .collect();
        MarketSnapshot {
            price_usd_per_mwh: price,
            weather: WeatherObservation::new(500.0, 21.6),
            history: PriceSeries::new(points).unwrap(),
        }
    }

    #[test]
    fn unauthenticated_session_is_denied() {
        let config = ScenarioConfig::west_texas();
        let err = DashboardReport::evaluate(&Session::denied(), &config, &snapshot(10.0, &[]))
            .unwrap_err();
        assert_eq!(err, DispatchError::AccessDenied);
    }

    #[test]
    fn evaluates_live_dispatch() {
        let config = ScenarioConfig::west_texas();
        let report =
            DashboardReport::evaluate(&Session::open(), &config, &snapshot(30.0, &[30.0])).unwrap();
        assert_abs_diff_eq!(report.breakeven.usd_per_mwh(), 87.72, epsilon = 0.01);
        assert_abs_diff_eq!(report.generation.solar_mw, 42.5, epsilon = 1e-9);
        assert_eq!(report.live.state, DispatchState::Low);
        assert_eq!(report.periods.len(), 3);
        assert_eq!(report.projections.len(), 1);
        assert_eq!(report.sizing.miner_mw, 40.0);
        assert!(report.sizing_delta.is_some());
    }

    #[test]
    fn fallback_snapshot_evaluates_to_zero_windows() {
        let report = DashboardReport::evaluate(
            &Session::open(),
            &ScenarioConfig::west_texas(),
            &MarketSnapshot::fallback(),
        )
        .unwrap();
        assert_eq!(report.generation.total_mw(), 0.0);
        assert_eq!(report.live.state, DispatchState::Low);
        assert!(report.periods.iter().all(|p| p.revenue == PeriodRevenue::default()));
        assert_eq!(report.backtest.kpi.points, 0);
    }

    #[test]
    fn windows_grow_with_history() {
        let report = DashboardReport::evaluate(
            &Session::open(),
            &ScenarioConfig::west_texas(),
            &snapshot(50.0, &[50.0; 200]),
        )
        .unwrap();
        let points: Vec<usize> = report.periods.iter().map(|p| p.points).collect();
        assert_eq!(points, vec![24, 168, 200]);
        assert_eq!(report.backtest.steps.len(), 200);
    }

    #[test]
    fn display_has_labelled_lines() {
        let config = ScenarioConfig::west_texas();
        let market = snapshot(-5.0, &[-5.0, 120.0]);
        let report = DashboardReport::evaluate(&Session::open(), &config, &market).unwrap();
        let text = report.to_string();
        assert!(text.contains("Breakeven floor:       $87.72/MWh"));
        assert!(text.contains("Dispatch state:        NEGATIVE"));
        assert!(text.contains("Last 24h:"));
        assert!(text.contains("Last 30d:"));
        assert!(text.contains("Optimization delta:"));
    }
}
