//! Tapelab Core — event-driven trading simulation engine.
//!
//! The crate turns a calendar of trading dates into a stream of events and
//! folds them through a portfolio ledger:
//!
//! - Domain types: the Market/Signal/Order/Fill event union, bars, ledger rows
//! - Clock generators (backtest calendar replay, online polling) behind a
//!   pause/resume/stop gate
//! - The global FIFO event queue and the simulation loop
//! - The portfolio ledger with equity-curve statistics and JSON snapshot
//!   persistence
//! - The execution simulator with pluggable commission policies
//! - The strategy seam plus a moving-average crossover demo

pub mod clock;
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod portfolio;
pub mod strategy;
