//! Pig iron balance simulator and HMR optimizer for a steel plant transfer
//! station.
//!
//! Blast furnace output accrues continuously, converter charges draw
//! `hmr × k` tonnes and spill events discharge a torpedo car whenever the
//! ceiling would be breached. The optimizer raises converter hot metal ratios
//! to absorb the pig iron that would otherwise be spilled.

pub mod cli;
pub mod config;
pub mod error;
pub mod io;
pub mod logging;
pub mod runner;
pub mod scenario;
/// Simulation engine, plateau analysis and optimizer.
pub mod sim;

pub use config::{ConfigError, ScenarioConfig};
pub use error::BalanceError;
pub use sim::balance::{BalanceInputs, PigIronBalance};
pub use sim::engine::Simulation;
pub use sim::optimizer::{HmrOptimizer, OptimizationReport, OptimizerConfig};
