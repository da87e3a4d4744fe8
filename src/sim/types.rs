//! Core balance types: trajectory samples, plant constants and HMR limits.

use std::fmt;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Timestamp layout used when printing and exporting samples.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Role a trajectory sample plays in the event walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleKind {
    /// Seed sample taken from the initial conditions.
    Initial,
    /// Post-production, pre-consumption value at an event.
    AtEvent,
    /// One second after an event, consumption applied.
    PostEvent,
    /// Auto-generated spill instant, value pinned to the ceiling.
    Spill,
    /// One second after an auto-generated spill.
    PostSpill,
    /// Synthetic end-of-horizon sample.
    Horizon,
}

impl SampleKind {
    /// Short label for exports and printing.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::AtEvent => "at_event",
            Self::PostEvent => "post_event",
            Self::Spill => "spill",
            Self::PostSpill => "post_spill",
            Self::Horizon => "horizon",
        }
    }
}

/// Immutable inventory sample of the pig iron balance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceState {
    /// Sample instant.
    pub time: NaiveDateTime,
    /// Inventory in tonnes.
    pub value: f64,
    /// What produced the sample.
    pub kind: SampleKind,
}

impl BalanceState {
    /// Creates the seed sample of a simulation.
    pub fn initial(time: NaiveDateTime, value: f64) -> Self {
        Self {
            time,
            value,
            kind: SampleKind::Initial,
        }
    }

    pub(crate) fn new(time: NaiveDateTime, value: f64, kind: SampleKind) -> Self {
        Self { time, value, kind }
    }
}

impl fmt::Display for BalanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {:>10.3} t | {}",
            self.time.format(TIME_FORMAT),
            self.value,
            self.kind.as_str()
        )
    }
}

/// Physical constants of the transfer station.
///
/// # Examples
///
/// ```
/// use pig_iron_balance::sim::types::PlantConstants;
///
/// let constants = PlantConstants::default();
/// assert_eq!(constants.torpedo_car_volume, 260.0);
/// assert!((constants.pig_iron_per_run() - 252.12).abs() < 0.01);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlantConstants {
    /// Volume discharged by one spill event (t).
    pub torpedo_car_volume: f64,
    /// Liquid steel tapped per converter run (t).
    pub steel_per_run: f64,
    /// Metallic yield of a converter run (0.0-1.0].
    pub converter_efficiency: f64,
    /// Nominal duration of a converter charge.
    pub converter_duration_minutes: i64,
    /// Offset of the synthetic end-of-horizon sample after the last event.
    pub horizon_tail_minutes: i64,
    /// Decimal places used when comparing projected values against the ceiling.
    pub spill_tolerance_decimals: i32,
}

impl Default for PlantConstants {
    fn default() -> Self {
        Self {
            torpedo_car_volume: 260.0,
            steel_per_run: 224.0,
            converter_efficiency: 0.985 * 0.902,
            converter_duration_minutes: 60,
            horizon_tail_minutes: 60,
            spill_tolerance_decimals: 6,
        }
    }
}

impl PlantConstants {
    /// Pig iron drawn by one run at full HMR (`k`).
    pub fn pig_iron_per_run(&self) -> f64 {
        self.steel_per_run / self.converter_efficiency
    }

    /// HMR fraction bought by one tonne of pig iron (`1 / k`).
    pub fn hmr_per_tonne(&self) -> f64 {
        self.converter_efficiency / self.steel_per_run
    }

    pub fn converter_duration(&self) -> Duration {
        Duration::minutes(self.converter_duration_minutes)
    }

    pub fn horizon_tail(&self) -> Duration {
        Duration::minutes(self.horizon_tail_minutes)
    }

    /// Rounds `value` to the spill-detection tolerance.
    pub fn round_to_tolerance(&self, value: f64) -> f64 {
        let scale = 10_f64.powi(self.spill_tolerance_decimals);
        (value * scale).round() / scale
    }
}

/// Allowed HMR range of every converter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HmrLimits {
    pub min: f64,
    pub max: f64,
}

impl Default for HmrLimits {
    fn default() -> Self {
        Self {
            min: 0.85,
            max: 1.0,
        }
    }
}

impl HmrLimits {
    pub fn contains(&self, hmr: f64) -> bool {
        (self.min..=self.max).contains(&hmr)
    }
}
