//! Discrete events that move the pig iron balance.

use chrono::{Duration, NaiveDateTime};

use super::types::PlantConstants;

/// A converter charge drawing `hmr × k` tonnes of pig iron.
#[derive(Debug, Clone, PartialEq)]
pub struct ConverterEvent {
    /// Stable arena handle, assigned once after sorting by time.
    pub index: usize,
    /// Charge start.
    pub time: NaiveDateTime,
    /// Hot metal ratio of the charge.
    pub hmr: f64,
    /// Converter line identifier (e.g. `cv_1`).
    pub line_id: String,
}

impl ConverterEvent {
    /// Creates an unindexed converter event; the balance assigns the index.
    pub fn new(time: NaiveDateTime, hmr: f64, line_id: impl Into<String>) -> Self {
        Self {
            index: 0,
            time,
            hmr,
            line_id: line_id.into(),
        }
    }

    /// End of the charge given the nominal converter duration.
    pub fn end(&self, constants: &PlantConstants) -> NaiveDateTime {
        self.time + constants.converter_duration()
    }

    /// Pig iron drawn by this charge.
    pub fn consumption(&self, constants: &PlantConstants) -> f64 {
        self.hmr * constants.pig_iron_per_run()
    }
}

/// Who put a spill on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpillOrigin {
    /// Supplied with the scenario.
    Scheduled,
    /// Synthesized by the simulator to repair a ceiling breach.
    Auto,
}

/// Discharge of one torpedo car of pig iron.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpillEvent {
    pub time: NaiveDateTime,
    pub origin: SpillOrigin,
}

impl SpillEvent {
    pub fn scheduled(time: NaiveDateTime) -> Self {
        Self {
            time,
            origin: SpillOrigin::Scheduled,
        }
    }

    pub(crate) fn auto(time: NaiveDateTime) -> Self {
        Self {
            time,
            origin: SpillOrigin::Auto,
        }
    }
}

/// Planned downtime of a converter line.
///
/// Carried with the scenario and reported on, but not enforced as a
/// scheduling constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct MaintenanceWindow {
    pub line_id: String,
    pub time: NaiveDateTime,
    pub duration: Duration,
}

impl MaintenanceWindow {
    pub fn new(line_id: impl Into<String>, time: NaiveDateTime, duration: Duration) -> Self {
        Self {
            line_id: line_id.into(),
            time,
            duration,
        }
    }

    pub fn end(&self) -> NaiveDateTime {
        self.time + self.duration
    }

    /// Returns `true` when `[start, end)` intersects the window.
    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        start < self.end() && self.time < end
    }
}

/// Borrowed view over the merged event list walked by the simulator.
#[derive(Debug, Clone, Copy)]
pub enum BalanceEvent<'a> {
    Converter(&'a ConverterEvent),
    Spill(&'a SpillEvent),
}

impl BalanceEvent<'_> {
    pub fn time(&self) -> NaiveDateTime {
        match self {
            Self::Converter(c) => c.time,
            Self::Spill(s) => s.time,
        }
    }

    /// Pig iron removed from the balance by this event.
    pub fn consumption(&self, constants: &PlantConstants) -> f64 {
        match self {
            Self::Converter(c) => c.consumption(constants),
            Self::Spill(_) => constants.torpedo_car_volume,
        }
    }
}

/// Merges converters and spills into one time-ordered list.
///
/// The sort is stable: on equal timestamps converters precede spills and each
/// group keeps its input order.
pub fn merge_events<'a>(
    converters: &'a [ConverterEvent],
    spills: &'a [SpillEvent],
) -> Vec<BalanceEvent<'a>> {
    let mut events: Vec<BalanceEvent<'a>> = converters
        .iter()
        .map(BalanceEvent::Converter)
        .chain(spills.iter().map(BalanceEvent::Spill))
        .collect();
    events.sort_by_key(|event| event.time());
    events
}
