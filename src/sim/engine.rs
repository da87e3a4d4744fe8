//! Event-driven balance simulator with automatic spill repair.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDateTime};
use tracing::{debug, info};

use super::event::{BalanceEvent, ConverterEvent, SpillEvent, merge_events};
use super::types::{BalanceState, PlantConstants, SampleKind};

/// Walks the merged event list and derives the inventory trajectory.
///
/// The simulator is stateless between runs: every call to [`Simulator::run`]
/// rebuilds the trajectory and the spill list from scratch.
#[derive(Debug, Clone)]
pub struct Simulator {
    production_rate: f64,
    ceiling: f64,
    auto_spill: bool,
    constants: PlantConstants,
}

impl Simulator {
    /// Creates a simulator.
    ///
    /// # Arguments
    ///
    /// * `production_rate` - Hourly pig iron inflow (t/h)
    /// * `ceiling` - Inventory ceiling (t)
    /// * `auto_spill` - Whether ceiling breaches are repaired with spill events
    /// * `constants` - Plant constants (torpedo volume, `k`, offsets)
    pub fn new(
        production_rate: f64,
        ceiling: f64,
        auto_spill: bool,
        constants: PlantConstants,
    ) -> Self {
        Self {
            production_rate,
            ceiling,
            auto_spill,
            constants,
        }
    }

    pub fn production_rate(&self) -> f64 {
        self.production_rate
    }

    pub fn ceiling(&self) -> f64 {
        self.ceiling
    }

    pub fn auto_spill(&self) -> bool {
        self.auto_spill
    }

    pub fn constants(&self) -> &PlantConstants {
        &self.constants
    }

    /// Runs one full simulation pass.
    ///
    /// # Arguments
    ///
    /// * `initial` - Seed sample
    /// * `converters` - Converter charges; `index` keys the post-event lookup
    /// * `scheduled_spills` - Spills supplied with the scenario
    ///
    /// # Returns
    ///
    /// The complete [`Simulation`]: trajectory, spills (scheduled and
    /// auto-generated, time-ordered) and point lookups.
    pub fn run(
        &self,
        initial: BalanceState,
        converters: &[ConverterEvent],
        scheduled_spills: &[SpillEvent],
    ) -> Simulation {
        let events = merge_events(converters, scheduled_spills);
        let mut pass = Pass::new(initial, events.len());

        for (i, event) in events.iter().enumerate() {
            let time = event.time();
            let at_event = self.advance_to(&mut pass, time);
            pass.push(BalanceState::new(time, at_event, SampleKind::AtEvent));

            // Consumption lands at the event instant. The post sample follows
            // one second later, or at the next event if that is sooner.
            let post_time = events
                .get(i + 1)
                .map_or(time + post_offset(), |next| next.time())
                .min(time + post_offset());
            pass.rebase(BalanceState::new(
                time,
                at_event - event.consumption(&self.constants),
                SampleKind::PostEvent,
            ));
            let post_event = self.advance_to(&mut pass, post_time);
            pass.push(BalanceState::new(post_time, post_event, SampleKind::PostEvent));

            match event {
                BalanceEvent::Converter(c) => {
                    pass.post_event_values.insert(c.index, post_event);
                }
                BalanceEvent::Spill(s) => pass.spills.push(**s),
            }
        }

        let last_event_time = events.last().map_or(initial.time, |e| e.time());
        let horizon_end = last_event_time + self.constants.horizon_tail();
        let final_value = self.advance_to(&mut pass, horizon_end);
        pass.push(BalanceState::new(horizon_end, final_value, SampleKind::Horizon));

        let simulation = pass.finish(horizon_end);
        info!(
            samples = simulation.trajectory.len(),
            spills = simulation.spills.len(),
            final_value = simulation.final_value(),
            "simulation pass complete"
        );
        simulation
    }

    /// Accrues production from `previous` up to `time`, inserting spills while
    /// the projected value breaches the ceiling.
    fn advance_to(&self, pass: &mut Pass, time: NaiveDateTime) -> f64 {
        let mut next = self.accrue(&pass.last, time);
        if !self.auto_spill {
            return next;
        }

        while self.breaches(next) {
            let Some(violation) = self.violation_time(&pass.last) else {
                break;
            };
            let violation = violation.min(time);
            debug!(%violation, projected = next, "ceiling breach, inserting spill");

            pass.push(BalanceState::new(violation, self.ceiling, SampleKind::Spill));
            pass.spills.push(SpillEvent::auto(violation));

            let post_time = (violation + post_offset()).min(time);
            let post_spill = self.ceiling - self.constants.torpedo_car_volume
                + self.production_rate * elapsed_hours(violation, post_time);
            pass.push(BalanceState::new(post_time, post_spill, SampleKind::PostSpill));
            next = self.accrue(&pass.last, time);
        }
        next
    }

    fn accrue(&self, previous: &BalanceState, time: NaiveDateTime) -> f64 {
        previous.value + self.production_rate * elapsed_hours(previous.time, time)
    }

    fn breaches(&self, value: f64) -> bool {
        self.constants.round_to_tolerance(value) > self.ceiling
    }

    /// Instant at which linear accrual from `previous` reaches the ceiling.
    ///
    /// `None` when production is not positive: the level never rises.
    fn violation_time(&self, previous: &BalanceState) -> Option<NaiveDateTime> {
        if self.production_rate <= 0.0 {
            return None;
        }
        let distance = (self.ceiling - previous.value).max(0.0);
        Some(previous.time + duration_from_hours(distance / self.production_rate))
    }
}

/// Elapsed time between two instants in fractional hours.
pub fn elapsed_hours(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    (to - from).num_microseconds().map_or_else(
        || (to - from).num_seconds() as f64 / 3600.0,
        |us| us as f64 / 3_600_000_000.0,
    )
}

/// Gap between an event and its post sample when nothing intervenes.
fn post_offset() -> Duration {
    Duration::seconds(1)
}

fn duration_from_hours(hours: f64) -> Duration {
    Duration::microseconds((hours * 3_600_000_000.0).round() as i64)
}

/// Mutable accumulator for one pass.
struct Pass {
    trajectory: Vec<BalanceState>,
    spills: Vec<SpillEvent>,
    post_event_values: BTreeMap<usize, f64>,
    last: BalanceState,
}

impl Pass {
    fn new(initial: BalanceState, event_count: usize) -> Self {
        let mut trajectory = Vec::with_capacity(2 * event_count + 2);
        trajectory.push(initial);
        Self {
            trajectory,
            spills: Vec::new(),
            post_event_values: BTreeMap::new(),
            last: initial,
        }
    }

    fn push(&mut self, state: BalanceState) {
        self.trajectory.push(state);
        self.last = state;
    }

    /// Moves the accrual origin without recording a sample.
    fn rebase(&mut self, state: BalanceState) {
        self.last = state;
    }

    fn finish(mut self, horizon_end: NaiveDateTime) -> Simulation {
        self.spills.sort_by_key(|s| s.time);
        let lookup = self.trajectory.iter().map(|s| (s.time, s.value)).collect();
        Simulation {
            trajectory: self.trajectory,
            spills: self.spills,
            lookup,
            post_event_values: self.post_event_values,
            horizon_end,
            final_state: self.last,
        }
    }
}

/// Result of one simulation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    trajectory: Vec<BalanceState>,
    spills: Vec<SpillEvent>,
    lookup: BTreeMap<NaiveDateTime, f64>,
    post_event_values: BTreeMap<usize, f64>,
    horizon_end: NaiveDateTime,
    final_state: BalanceState,
}

impl Simulation {
    /// Ordered trajectory samples, initial state first, horizon sample last.
    pub fn trajectory(&self) -> &[BalanceState] {
        &self.trajectory
    }

    /// Scheduled and auto-generated spills in time order.
    pub fn spills(&self) -> &[SpillEvent] {
        &self.spills
    }

    pub fn spill_times(&self) -> Vec<NaiveDateTime> {
        self.spills.iter().map(|s| s.time).collect()
    }

    /// Value of the sample recorded at exactly `time`.
    ///
    /// With coincident samples the later one in the trajectory wins.
    pub fn value_at(&self, time: NaiveDateTime) -> Option<f64> {
        self.lookup.get(&time).copied()
    }

    /// Post-consumption value of the converter with arena index `index`.
    pub fn post_event_value(&self, index: usize) -> Option<f64> {
        self.post_event_values.get(&index).copied()
    }

    pub fn horizon_end(&self) -> NaiveDateTime {
        self.horizon_end
    }

    /// Value of the end-of-horizon sample.
    pub fn final_value(&self) -> f64 {
        self.final_state.value
    }

    pub fn peak_value(&self) -> f64 {
        self.trajectory
            .iter()
            .map(|s| s.value)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn min_value(&self) -> f64 {
        self.trajectory
            .iter()
            .map(|s| s.value)
            .fold(f64::INFINITY, f64::min)
    }

    /// Samples that, rounded to the spill tolerance, exceed `ceiling`.
    pub fn ceiling_breaches(&self, ceiling: f64, constants: &PlantConstants) -> Vec<BalanceState> {
        self.trajectory
            .iter()
            .filter(|s| constants.round_to_tolerance(s.value) > ceiling)
            .copied()
            .collect()
    }
}
