//! Cost function and post-hoc balance indicators.

use std::fmt;

use super::balance::PigIronBalance;
use super::engine::Simulation;
use super::event::SpillOrigin;

/// Marginal gain in convertible inventory, priced per tonne.
///
/// `max(0, final - baseline) × unit_steel_price`
pub fn marginal_cost(final_value: f64, baseline_value: f64, unit_steel_price: f64) -> f64 {
    (final_value - baseline_value).max(0.0) * unit_steel_price
}

/// Aggregate indicators of one simulation pass.
///
/// Computed from the [`Simulation`] and the converter arena so the report can
/// never drift from the trajectory it summarises.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceReport {
    pub initial_value: f64,
    pub final_value: f64,
    pub peak_value: f64,
    pub min_value: f64,
    /// Spills generated by the simulator.
    pub auto_spills: usize,
    /// Spills supplied with the scenario.
    pub scheduled_spills: usize,
    /// Pig iron discharged by all spills (t).
    pub spilled_volume: f64,
    /// Pig iron charged into converters (t).
    pub converter_consumption: f64,
    pub converter_count: usize,
    pub mean_hmr: f64,
    pub total_cost: f64,
}

impl BalanceReport {
    pub fn from_simulation(balance: &PigIronBalance, simulation: &Simulation) -> Self {
        let constants = balance.constants();
        let converters = balance.converters();

        let auto_spills = simulation
            .spills()
            .iter()
            .filter(|s| s.origin == SpillOrigin::Auto)
            .count();
        let scheduled_spills = simulation.spills().len() - auto_spills;

        let converter_consumption = converters.iter().map(|c| c.consumption(constants)).sum();
        let mean_hmr = if converters.is_empty() {
            0.0
        } else {
            converters.iter().map(|c| c.hmr).sum::<f64>() / converters.len() as f64
        };

        Self {
            initial_value: balance.initial().value,
            final_value: simulation.final_value(),
            peak_value: simulation.peak_value(),
            min_value: simulation.min_value(),
            auto_spills,
            scheduled_spills,
            spilled_volume: simulation.spills().len() as f64 * constants.torpedo_car_volume,
            converter_consumption,
            converter_count: converters.len(),
            mean_hmr,
            total_cost: balance.total_cost(),
        }
    }

    pub fn spill_count(&self) -> usize {
        self.auto_spills + self.scheduled_spills
    }
}

impl fmt::Display for BalanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Pig Iron Balance Report ---")?;
        writeln!(f, "Initial inventory:     {:.2} t", self.initial_value)?;
        writeln!(f, "Final inventory:       {:.2} t", self.final_value)?;
        writeln!(
            f,
            "Inventory range:       {:.2} .. {:.2} t",
            self.min_value, self.peak_value
        )?;
        writeln!(
            f,
            "Spills:                {} ({} auto, {} scheduled, {:.0} t)",
            self.spill_count(),
            self.auto_spills,
            self.scheduled_spills,
            self.spilled_volume
        )?;
        writeln!(
            f,
            "Converter charges:     {} (mean HMR {:.3}, {:.2} t pig iron)",
            self.converter_count, self.mean_hmr, self.converter_consumption
        )?;
        write!(f, "Total cost:            {:.2}", self.total_cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::balance::BalanceInputs;
    use crate::sim::event::{ConverterEvent, SpillEvent};
    use crate::sim::types::BalanceState;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn at(minutes: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 6, 2)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|t| t + Duration::minutes(minutes))
            .unwrap_or_default()
    }

    #[test]
    fn marginal_cost_is_clamped_at_zero() {
        assert_eq!(marginal_cost(1800.0, 1900.0, 10.0), 0.0);
        assert_eq!(marginal_cost(1950.0, 1900.0, 10.0), 500.0);
    }

    #[test]
    fn report_counts_spills_by_origin() {
        let mut inputs = BalanceInputs::new(
            BalanceState::initial(at(0), 1900.0),
            600.0,
            2000.0,
            vec![ConverterEvent::new(at(120), 0.9, "cv_1")],
        );
        inputs.scheduled_spills = vec![SpillEvent::scheduled(at(5))];
        let Ok(mut balance) = PigIronBalance::new(inputs) else {
            panic!("valid inputs");
        };
        let simulation = balance.simulate().ok().cloned();
        let Some(simulation) = simulation else {
            panic!("simulation should succeed");
        };
        let report = BalanceReport::from_simulation(&balance, &simulation);
        assert_eq!(report.scheduled_spills, 1);
        assert!(report.auto_spills >= 1);
        assert_eq!(
            report.spilled_volume,
            report.spill_count() as f64 * 260.0
        );
        assert_eq!(report.converter_count, 1);
        assert!((report.mean_hmr - 0.9).abs() < 1e-12);
        assert!(report.peak_value <= 2000.0 + 1e-6);
    }

    #[test]
    fn report_display_does_not_panic() {
        let inputs = BalanceInputs::new(BalanceState::initial(at(0), 1000.0), 300.0, 2000.0, vec![]);
        let Ok(mut balance) = PigIronBalance::new(inputs) else {
            panic!("valid inputs");
        };
        let simulation = balance.simulate().ok().cloned();
        let report = simulation.map(|s| BalanceReport::from_simulation(&balance, &s));
        let text = report.map(|r| r.to_string()).unwrap_or_default();
        assert!(text.contains("Pig Iron Balance Report"));
    }
}
