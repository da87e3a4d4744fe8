//! End-to-end scenario execution: build, simulate, optionally optimize, report.

use tracing::{info, warn};

use crate::config::ScenarioConfig;
use crate::error::BalanceError;
use crate::sim::balance::PigIronBalance;
use crate::sim::engine::Simulation;
use crate::sim::kpi::BalanceReport;
use crate::sim::optimizer::{HmrOptimizer, OptimizationReport};

/// A converter scheduled inside a maintenance window of its own line.
#[derive(Debug, Clone, PartialEq)]
pub struct MaintenanceConflict {
    pub converter: usize,
    pub line_id: String,
}

/// Everything produced by one scenario run.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Balance in its final state (optimized HMRs, latest pass).
    pub balance: PigIronBalance,
    /// Indicators of the first pass, before any HMR change.
    pub baseline: BalanceReport,
    /// Indicators of the final pass.
    pub report: BalanceReport,
    /// Present when the scenario asked for HMR optimization.
    pub optimization: Option<OptimizationReport>,
    pub maintenance_conflicts: Vec<MaintenanceConflict>,
}

impl RunResult {
    /// Final simulation pass.
    ///
    /// # Errors
    ///
    /// Returns [`BalanceError::NotSimulated`] if the balance was never run,
    /// which `run_scenario` rules out.
    pub fn simulation(&self) -> Result<&Simulation, BalanceError> {
        self.balance.simulation().ok_or(BalanceError::NotSimulated)
    }
}

/// Runs `config` end to end.
///
/// # Errors
///
/// Returns configuration, construction, simulation or optimizer failures.
pub fn run_scenario(config: &ScenarioConfig) -> Result<RunResult, BalanceError> {
    let mut balance = config.build_balance()?;
    info!(
        start = %balance.start_time(),
        converters = balance.converters().len(),
        scheduled_spills = balance.scheduled_spills().len(),
        rate = balance.production_rate(),
        ceiling = balance.ceiling(),
        "scenario loaded"
    );

    let maintenance_conflicts: Vec<MaintenanceConflict> = balance
        .maintenance_conflicts()
        .into_iter()
        .map(|(converter, window)| {
            warn!(
                converter,
                line = %window.line_id,
                window_start = %window.time,
                "converter charge overlaps a maintenance window"
            );
            MaintenanceConflict {
                converter,
                line_id: window.line_id.clone(),
            }
        })
        .collect();

    let baseline = {
        let simulation = balance.simulate()?.clone();
        BalanceReport::from_simulation(&balance, &simulation)
    };

    let optimization = if config.optimize_hmr {
        Some(HmrOptimizer::new(config.optimizer_config()).optimize(&mut balance)?)
    } else {
        None
    };

    let simulation = balance.simulation().ok_or(BalanceError::NotSimulated)?;
    let report = BalanceReport::from_simulation(&balance, simulation);

    Ok(RunResult {
        balance,
        baseline,
        report,
        optimization,
        maintenance_conflicts,
    })
}
