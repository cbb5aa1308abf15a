/// Period revenue over a price history.
pub mod aggregate;
/// State-of-charge backtest.
pub mod engine;
pub mod kpi;
/// Three-state dispatch policy.
pub mod policy;
pub mod types;

pub use aggregate::{PeriodRevenue, aggregate};
pub use engine::{Backtest, BacktestStep, backtest_revenue};
pub use kpi::KpiReport;
pub use policy::{BatteryLimits, DispatchPolicy, dispatch};
pub use types::{DispatchResult, DispatchState, LookbackWindow, PricePoint, PriceSeries};
