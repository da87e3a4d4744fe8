//! Validated converter arena and its latest simulation pass.

use chrono::NaiveDateTime;
use tracing::warn;

use crate::error::BalanceError;

use super::engine::{Simulation, Simulator};
use super::event::{ConverterEvent, MaintenanceWindow, SpillEvent};
use super::plateau::{self, VirtualPlateau};
use super::types::{BalanceState, HmrLimits, PlantConstants};

/// Slack allowed when checking an HMR against its upper bound after float
/// accumulation.
const HMR_BOUND_SLACK: f64 = 1e-9;

/// Everything needed to build a [`PigIronBalance`].
#[derive(Debug, Clone)]
pub struct BalanceInputs {
    pub initial: BalanceState,
    pub production_rate: f64,
    pub ceiling: f64,
    pub inventory_floor: f64,
    pub auto_spill: bool,
    pub converters: Vec<ConverterEvent>,
    pub scheduled_spills: Vec<SpillEvent>,
    pub maintenance_windows: Vec<MaintenanceWindow>,
    pub constants: PlantConstants,
    pub hmr_limits: HmrLimits,
}

impl BalanceInputs {
    /// Inputs with default constants, limits and floor and no extra events.
    pub fn new(
        initial: BalanceState,
        production_rate: f64,
        ceiling: f64,
        converters: Vec<ConverterEvent>,
    ) -> Self {
        Self {
            initial,
            production_rate,
            ceiling,
            inventory_floor: 100.0,
            auto_spill: true,
            converters,
            scheduled_spills: Vec::new(),
            maintenance_windows: Vec::new(),
            constants: PlantConstants::default(),
            hmr_limits: HmrLimits::default(),
        }
    }
}

/// Pig iron balance of one transfer station.
///
/// Converters are sorted by time once at construction and addressed by their
/// stable `index` from then on. Every [`PigIronBalance::simulate`] call rebuilds
/// the trajectory and the spill list from the current converter HMRs.
#[derive(Debug, Clone)]
pub struct PigIronBalance {
    initial: BalanceState,
    simulator: Simulator,
    inventory_floor: f64,
    hmr_limits: HmrLimits,
    converters: Vec<ConverterEvent>,
    scheduled_spills: Vec<SpillEvent>,
    maintenance_windows: Vec<MaintenanceWindow>,
    simulation: Option<Simulation>,
    total_cost: f64,
}

impl PigIronBalance {
    /// Validates `inputs` and builds the converter arena.
    ///
    /// # Errors
    ///
    /// Returns [`BalanceError::InvalidInput`] for a non-positive production
    /// rate, a ceiling below the initial value, inconsistent floor or HMR
    /// limits, invalid constants, or a converter HMR outside `[0, hmr.max]`.
    pub fn new(inputs: BalanceInputs) -> Result<Self, BalanceError> {
        validate(&inputs)?;

        let BalanceInputs {
            initial,
            production_rate,
            ceiling,
            inventory_floor,
            auto_spill,
            mut converters,
            mut scheduled_spills,
            maintenance_windows,
            constants,
            hmr_limits,
        } = inputs;

        converters.sort_by_key(|c| c.time);
        for (index, converter) in converters.iter_mut().enumerate() {
            converter.index = index;
            if !hmr_limits.contains(converter.hmr) {
                warn!(
                    index,
                    hmr = converter.hmr,
                    min = hmr_limits.min,
                    "converter starts below hmr.min"
                );
            }
        }
        scheduled_spills.sort_by_key(|s| s.time);

        Ok(Self {
            initial,
            simulator: Simulator::new(production_rate, ceiling, auto_spill, constants),
            inventory_floor,
            hmr_limits,
            converters,
            scheduled_spills,
            maintenance_windows,
            simulation: None,
            total_cost: 0.0,
        })
    }

    /// Runs a full simulation pass from the current converter state.
    ///
    /// # Errors
    ///
    /// Returns [`BalanceError::CeilingBreached`] when auto-spill is enabled and
    /// the trajectory still exceeds the ceiling.
    pub fn simulate(&mut self) -> Result<&Simulation, BalanceError> {
        let simulation = self
            .simulator
            .run(self.initial, &self.converters, &self.scheduled_spills);

        if self.simulator.auto_spill() {
            let ceiling = self.simulator.ceiling();
            if let Some(breach) = simulation
                .ceiling_breaches(ceiling, self.simulator.constants())
                .first()
            {
                return Err(BalanceError::CeilingBreached {
                    time: breach.time,
                    value: breach.value,
                    ceiling,
                });
            }
        }

        Ok(&*self.simulation.insert(simulation))
    }

    /// Latest simulation pass, if any.
    pub fn simulation(&self) -> Option<&Simulation> {
        self.simulation.as_ref()
    }

    /// Virtual plateaus derived from the latest simulation pass.
    ///
    /// # Errors
    ///
    /// Returns [`BalanceError::NotSimulated`] before the first pass.
    pub fn virtual_plateaus(&self) -> Result<Vec<VirtualPlateau>, BalanceError> {
        let simulation = self.simulation.as_ref().ok_or(BalanceError::NotSimulated)?;
        Ok(plateau::analyze(self, simulation))
    }

    /// Adds `delta` to the HMR of converter `index`.
    ///
    /// # Errors
    ///
    /// Returns [`BalanceError::UnknownConverter`] for a bad handle and
    /// [`BalanceError::HmrOutOfRange`] if the result would exceed `hmr.max`
    /// or drop below zero.
    pub fn raise_hmr(&mut self, index: usize, delta: f64) -> Result<f64, BalanceError> {
        let limits = self.hmr_limits;
        let converter = self
            .converters
            .get_mut(index)
            .ok_or(BalanceError::UnknownConverter(index))?;

        let hmr = converter.hmr + delta;
        if hmr > limits.max + HMR_BOUND_SLACK || hmr < 0.0 {
            return Err(BalanceError::HmrOutOfRange {
                index,
                hmr,
                min: limits.min,
                max: limits.max,
            });
        }
        converter.hmr = hmr.min(limits.max);
        Ok(converter.hmr)
    }

    /// Converters that start or run inside a maintenance window of their line.
    pub fn maintenance_conflicts(&self) -> Vec<(usize, &MaintenanceWindow)> {
        let constants = self.simulator.constants();
        self.converters
            .iter()
            .flat_map(|c| {
                self.maintenance_windows
                    .iter()
                    .filter(move |w| w.line_id == c.line_id && w.overlaps(c.time, c.end(constants)))
                    .map(move |w| (c.index, w))
            })
            .collect()
    }

    pub fn converters(&self) -> &[ConverterEvent] {
        &self.converters
    }

    pub fn converter(&self, index: usize) -> Option<&ConverterEvent> {
        self.converters.get(index)
    }

    /// Sum of `hmr.max - hmr` over all converters.
    pub fn remaining_hmr_headroom(&self) -> f64 {
        let max = self.hmr_limits.max;
        self.converters.iter().map(|c| (max - c.hmr).max(0.0)).sum()
    }

    /// Current HMR of every converter, in index order.
    pub fn hmrs(&self) -> Vec<f64> {
        self.converters.iter().map(|c| c.hmr).collect()
    }

    pub fn initial(&self) -> BalanceState {
        self.initial
    }

    pub fn start_time(&self) -> NaiveDateTime {
        self.initial.time
    }

    pub fn production_rate(&self) -> f64 {
        self.simulator.production_rate()
    }

    pub fn ceiling(&self) -> f64 {
        self.simulator.ceiling()
    }

    pub fn inventory_floor(&self) -> f64 {
        self.inventory_floor
    }

    pub fn hmr_limits(&self) -> HmrLimits {
        self.hmr_limits
    }

    pub fn constants(&self) -> &PlantConstants {
        self.simulator.constants()
    }

    pub fn scheduled_spills(&self) -> &[SpillEvent] {
        &self.scheduled_spills
    }

    pub fn maintenance_windows(&self) -> &[MaintenanceWindow] {
        &self.maintenance_windows
    }

    /// Cost recorded by the last optimizer run (0 before any run).
    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    pub(crate) fn set_total_cost(&mut self, cost: f64) {
        self.total_cost = cost;
    }
}

fn validate(inputs: &BalanceInputs) -> Result<(), BalanceError> {
    let c = &inputs.constants;
    let limits = &inputs.hmr_limits;

    if !(inputs.production_rate.is_finite() && inputs.production_rate > 0.0) {
        return Err(BalanceError::invalid("production_rate", "must be > 0"));
    }
    if !inputs.initial.value.is_finite() {
        return Err(BalanceError::invalid("initial.value", "must be finite"));
    }
    if !(inputs.ceiling.is_finite() && inputs.ceiling >= inputs.initial.value) {
        return Err(BalanceError::invalid(
            "ceiling",
            format!("must be >= initial value {}", inputs.initial.value),
        ));
    }
    if !(inputs.inventory_floor >= 0.0 && inputs.inventory_floor < inputs.ceiling) {
        return Err(BalanceError::invalid(
            "inventory_floor",
            "must be >= 0 and < ceiling",
        ));
    }
    if !(0.0 <= limits.min && limits.min <= limits.max && limits.max <= 1.0) {
        return Err(BalanceError::invalid(
            "hmr_limits",
            "must satisfy 0 <= min <= max <= 1",
        ));
    }
    if c.torpedo_car_volume <= 0.0 {
        return Err(BalanceError::invalid("constants.torpedo_car_volume", "must be > 0"));
    }
    if c.steel_per_run <= 0.0 {
        return Err(BalanceError::invalid("constants.steel_per_run", "must be > 0"));
    }
    if !(c.converter_efficiency > 0.0 && c.converter_efficiency <= 1.0) {
        return Err(BalanceError::invalid(
            "constants.converter_efficiency",
            "must be in (0, 1]",
        ));
    }
    if c.converter_duration_minutes <= 0 || c.horizon_tail_minutes <= 0 {
        return Err(BalanceError::invalid(
            "constants",
            "converter duration and horizon tail must be > 0 minutes",
        ));
    }
    if !(0..=9).contains(&c.spill_tolerance_decimals) {
        return Err(BalanceError::invalid(
            "constants.spill_tolerance_decimals",
            "must be in [0, 9]",
        ));
    }
    for (i, converter) in inputs.converters.iter().enumerate() {
        if !(0.0..=limits.max).contains(&converter.hmr) {
            return Err(BalanceError::invalid(
                format!("converters[{i}].hmr"),
                format!("{} outside [0, {}]", converter.hmr, limits.max),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn at(minutes: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 6, 2)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|t| t + Duration::minutes(minutes))
            .unwrap_or_default()
    }

    fn inputs() -> BalanceInputs {
        BalanceInputs::new(
            BalanceState::initial(at(0), 1000.0),
            300.0,
            2000.0,
            vec![
                ConverterEvent::new(at(90), 0.9, "cv_2"),
                ConverterEvent::new(at(30), 0.9, "cv_1"),
            ],
        )
    }

    #[test]
    fn indices_follow_time_order() {
        let balance = PigIronBalance::new(inputs()).ok();
        let times: Vec<_> = balance
            .as_ref()
            .map(|b| b.converters().iter().map(|c| (c.index, c.time)).collect())
            .unwrap_or_default();
        assert_eq!(times, vec![(0, at(30)), (1, at(90))]);
    }

    #[test]
    fn rejects_non_positive_rate() {
        let mut bad = inputs();
        bad.production_rate = 0.0;
        let err = PigIronBalance::new(bad).err();
        assert!(matches!(err, Some(BalanceError::InvalidInput { ref field, .. }) if field == "production_rate"));
    }

    #[test]
    fn rejects_ceiling_below_initial() {
        let mut bad = inputs();
        bad.ceiling = 900.0;
        assert!(PigIronBalance::new(bad).is_err());
    }

    #[test]
    fn rejects_hmr_above_max() {
        let mut bad = inputs();
        bad.converters[0].hmr = 1.2;
        let err = PigIronBalance::new(bad).err().map(|e| e.to_string());
        assert!(err.unwrap_or_default().contains("converters[0].hmr"));
    }

    #[test]
    fn plateaus_require_a_simulation() {
        let balance = PigIronBalance::new(inputs()).ok();
        let result = balance.as_ref().map(PigIronBalance::virtual_plateaus);
        assert!(matches!(result, Some(Err(BalanceError::NotSimulated))));
    }

    #[test]
    fn raise_hmr_is_bounded() {
        let Ok(mut balance) = PigIronBalance::new(inputs()) else {
            panic!("valid inputs");
        };
        assert!(balance.raise_hmr(0, 0.1).is_ok());
        assert!(matches!(
            balance.raise_hmr(0, 0.1),
            Err(BalanceError::HmrOutOfRange { index: 0, .. })
        ));
        assert!(matches!(
            balance.raise_hmr(7, 0.01),
            Err(BalanceError::UnknownConverter(7))
        ));
    }

    #[test]
    fn repeated_simulation_is_idempotent() {
        let Ok(mut balance) = PigIronBalance::new(inputs()) else {
            panic!("valid inputs");
        };
        let first = balance.simulate().ok().cloned();
        let second = balance.simulate().ok().cloned();
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn maintenance_conflicts_match_line_and_time() {
        let mut with_windows = inputs();
        with_windows.maintenance_windows = vec![
            MaintenanceWindow::new("cv_1", at(60), Duration::minutes(30)),
            MaintenanceWindow::new("cv_2", at(0), Duration::minutes(30)),
        ];
        let Ok(balance) = PigIronBalance::new(with_windows) else {
            panic!("valid inputs");
        };
        let conflicts: Vec<_> = balance
            .maintenance_conflicts()
            .into_iter()
            .map(|(i, w)| (i, w.line_id.clone()))
            .collect();
        assert_eq!(conflicts, vec![(0, "cv_1".to_string())]);
    }
}
