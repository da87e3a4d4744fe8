//! Greedy HMR optimizer.
//!
//! Repeatedly takes the earliest plateau that can absorb more load, pushes
//! its HMR target onto the plateau's converters latest-first, and
//! re-simulates until no plateau can absorb anything.

use tracing::{debug, info};

use crate::error::BalanceError;

use super::balance::PigIronBalance;
use super::kpi::marginal_cost;

/// Optimizer tuning.
#[derive(Debug, Clone, Copy)]
pub struct OptimizerConfig {
    /// Price per tonne of convertible inventory gained.
    pub unit_steel_price: f64,
    /// Iteration cap; `None` derives it from the baseline pass.
    pub max_iterations: Option<usize>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            unit_steel_price: 1.0,
            max_iterations: None,
        }
    }
}

/// One HMR increase applied to a converter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HmrAdjustment {
    pub iteration: usize,
    pub index: usize,
    pub from: f64,
    pub to: f64,
}

/// Outcome of an optimizer run.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationReport {
    /// End-of-horizon value before any adjustment.
    pub baseline_value: f64,
    /// End-of-horizon value after the last pass.
    pub final_value: f64,
    /// Number of plateau passes applied.
    pub iterations: usize,
    /// Marginal cost after the baseline pass and after every iteration.
    ///
    /// Not monotone: the cost rises when a pass retires a spill, since the
    /// torpedo volume stays in the inventory, and falls as later passes
    /// consume more pig iron.
    pub cost_history: Vec<f64>,
    /// Remaining HMR headroom summed over converters, per pass. Strictly
    /// decreasing across iterations.
    pub headroom_history: Vec<f64>,
    /// Spill count per pass; never increases.
    pub spill_history: Vec<usize>,
    pub total_cost: f64,
    pub adjustments: Vec<HmrAdjustment>,
    pub baseline_spills: usize,
    pub final_spills: usize,
}

/// Greedy fixpoint controller over a [`PigIronBalance`].
#[derive(Debug, Default, Clone, Copy)]
pub struct HmrOptimizer {
    config: OptimizerConfig,
}

impl HmrOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Optimizes converter HMRs in place.
    ///
    /// On success the balance holds the final simulation pass and total cost.
    ///
    /// # Errors
    ///
    /// Propagates simulation and HMR-bound failures, and returns
    /// [`BalanceError::IterationCapExceeded`] if no fixpoint is reached within
    /// the cap. The default cap is `(converters + 1) × (baseline spills + 1)`:
    /// every pass either saturates a converter or pushes the earliest spill
    /// past the converter bounding its plateau.
    pub fn optimize(&self, balance: &mut PigIronBalance) -> Result<OptimizationReport, BalanceError> {
        let price = self.config.unit_steel_price;

        let (baseline_value, baseline_spills) = {
            let baseline = balance.simulate()?;
            (baseline.final_value(), baseline.spills().len())
        };
        let cap = self
            .config
            .max_iterations
            .unwrap_or((balance.converters().len() + 1) * (baseline_spills + 1));

        let mut cost = marginal_cost(baseline_value, baseline_value, price);
        let mut cost_history = vec![cost];
        let mut headroom_history = vec![balance.remaining_hmr_headroom()];
        let mut spill_history = vec![baseline_spills];
        let mut adjustments = Vec::new();
        let mut iterations = 0;

        loop {
            let mut plateaus = balance.virtual_plateaus()?;
            plateaus.retain(|p| p.can_be_optimized());
            plateaus.sort_by_key(|p| p.time);
            let Some(plateau) = plateaus.into_iter().next() else {
                break;
            };

            if iterations == cap {
                return Err(BalanceError::IterationCapExceeded { cap });
            }
            iterations += 1;

            debug!(
                iteration = iterations,
                anchor = %plateau.time,
                target = plateau.hmr_target,
                available = plateau.available_hmr(),
                converters = plateau.converters.len(),
                "absorbing plateau"
            );

            let mut remaining = plateau.hmr_target;
            for converter in plateau.converters.iter().rev() {
                let delta = converter.available_hmr_delta();
                let saturates = delta < remaining;
                let step = if saturates { delta } else { remaining };

                let to = balance.raise_hmr(converter.index, step)?;
                debug!(index = converter.index, from = converter.hmr, to, "raised hmr");
                adjustments.push(HmrAdjustment {
                    iteration: iterations,
                    index: converter.index,
                    from: converter.hmr,
                    to,
                });

                if !saturates {
                    break;
                }
                remaining -= delta;
            }

            let (final_value, spills) = {
                let simulation = balance.simulate()?;
                (simulation.final_value(), simulation.spills().len())
            };
            cost = marginal_cost(final_value, baseline_value, price);
            cost_history.push(cost);
            headroom_history.push(balance.remaining_hmr_headroom());
            spill_history.push(spills);
        }

        let simulation = balance.simulation().ok_or(BalanceError::NotSimulated)?;
        let report = OptimizationReport {
            baseline_value,
            final_value: simulation.final_value(),
            iterations,
            cost_history,
            headroom_history,
            spill_history,
            total_cost: cost,
            adjustments,
            baseline_spills,
            final_spills: simulation.spills().len(),
        };
        balance.set_total_cost(cost);

        info!(
            iterations = report.iterations,
            baseline_spills = report.baseline_spills,
            final_spills = report.final_spills,
            total_cost = report.total_cost,
            "hmr optimization complete"
        );
        Ok(report)
    }
}
