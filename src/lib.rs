//! Hybrid renewable / bitcoin-mining / battery dispatch revenue model.

#[cfg(feature = "api")]
pub mod api;
pub mod cli;
pub mod config;
pub mod devices;
pub mod error;
pub mod io;
pub mod market;
pub mod projection;
pub mod report;
pub mod session;
/// Dispatch policy, aggregation, and the state-of-charge backtest.
pub mod sim;

pub use error::{DispatchError, Result};
