//! Virtual plateau analysis over a completed simulation pass.
//!
//! A plateau is the slack window between a spill and the next converter
//! charge. The pig iron that accrues over that window is headroom that could
//! have been charged into earlier converters instead of being spilled.

use chrono::NaiveDateTime;

use super::balance::PigIronBalance;
use super::engine::{Simulation, elapsed_hours};

/// Smallest HMR headroom treated as absorbable.
pub const HMR_EPSILON: f64 = 1e-9;

/// A converter seen through the lens of one plateau.
#[derive(Debug, Clone, PartialEq)]
pub struct ConverterInPlateau {
    /// Arena handle of the underlying converter.
    pub index: usize,
    pub time: NaiveDateTime,
    pub hmr: f64,
    pub hmr_min: f64,
    pub hmr_max: f64,
    /// Balance one second after the charge.
    pub post_event_value: f64,
    pub inventory_floor: f64,
    /// HMR fraction per tonne of pig iron (`1 / k`).
    pub capacity_constant: f64,
}

impl ConverterInPlateau {
    /// Extra HMR this converter could take, bounded by the inventory floor and
    /// by `hmr_max`.
    pub fn available_hmr_delta(&self) -> f64 {
        ((self.post_event_value - self.inventory_floor) * self.capacity_constant).min(self.hmr_max)
            - self.hmr
    }

    pub fn can_absorb(&self) -> bool {
        self.available_hmr_delta() > HMR_EPSILON
    }
}

/// Spare headroom anchored at a spill, with the converters able to absorb it.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualPlateau {
    /// Spill instant anchoring the plateau.
    pub time: NaiveDateTime,
    /// Next converter after the spill, or the end of the horizon.
    pub boundary: NaiveDateTime,
    /// Eligible converters in time order.
    pub converters: Vec<ConverterInPlateau>,
    /// Pig iron accrued between the spill and the boundary (t).
    pub plateau_value: f64,
    /// `plateau_value` expressed in HMR units.
    pub hmr_target: f64,
}

impl VirtualPlateau {
    pub fn can_be_optimized(&self) -> bool {
        self.converters.iter().any(ConverterInPlateau::can_absorb)
    }

    /// Sum of the converters' available deltas.
    pub fn available_hmr(&self) -> f64 {
        self.converters
            .iter()
            .map(|c| c.available_hmr_delta().max(0.0))
            .sum()
    }
}

/// Builds the plateaus of `simulation`, one per spill at most, in time order.
///
/// Plateaus without eligible converters or with a non-positive value are
/// dropped. The result is derived fresh from the pass; nothing is cached.
pub fn analyze(balance: &PigIronBalance, simulation: &Simulation) -> Vec<VirtualPlateau> {
    let converters = balance.converters();
    let limits = balance.hmr_limits();
    let capacity_constant = balance.constants().hmr_per_tonne();

    let mut plateaus = Vec::new();
    for spill in simulation.spills() {
        let boundary = converters
            .iter()
            .find(|c| c.time > spill.time)
            .map_or(simulation.horizon_end(), |c| c.time);

        let plateau_value = balance.production_rate() * elapsed_hours(spill.time, boundary);
        if plateau_value <= 0.0 {
            continue;
        }

        let eligible: Vec<ConverterInPlateau> = converters
            .iter()
            .take_while(|c| c.time < boundary)
            .filter_map(|c| {
                let post_event_value = simulation.post_event_value(c.index)?;
                Some(ConverterInPlateau {
                    index: c.index,
                    time: c.time,
                    hmr: c.hmr,
                    hmr_min: limits.min,
                    hmr_max: limits.max,
                    post_event_value,
                    inventory_floor: balance.inventory_floor(),
                    capacity_constant,
                })
            })
            .filter(ConverterInPlateau::can_absorb)
            .collect();

        if eligible.is_empty() {
            continue;
        }

        plateaus.push(VirtualPlateau {
            time: spill.time,
            boundary,
            converters: eligible,
            plateau_value,
            hmr_target: plateau_value * capacity_constant,
        });
    }
    plateaus
}
