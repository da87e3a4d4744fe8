//! Seeded random scenario generator.
//!
//! Produces two converter lines with uniformly drawn gaps between charges,
//! the shape of a typical two-day melt shop schedule.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::config::{ConverterConfig, InitialConditions, ScenarioConfig};
use crate::sim::types::{HmrLimits, PlantConstants};

/// Parameters of the generated schedule.
#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub start: NaiveDateTime,
    /// No charge starts at or after `start + horizon`.
    pub horizon: Duration,
    /// Line identifier and offset of its first charge.
    pub lines: Vec<(String, Duration)>,
    pub min_gap: Duration,
    pub max_gap: Duration,
    pub hmr: f64,
    pub initial_value: f64,
    pub production_rate: f64,
    pub ceiling: f64,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        let start = NaiveDate::from_ymd_opt(2023, 6, 2)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or_default();
        Self {
            start,
            horizon: Duration::days(2) + Duration::hours(5),
            lines: vec![
                ("cv_1".to_string(), Duration::minutes(15)),
                ("cv_2".to_string(), Duration::minutes(36)),
            ],
            min_gap: Duration::minutes(60),
            max_gap: Duration::minutes(560),
            hmr: 0.8,
            initial_value: 1000.0,
            production_rate: 300.0,
            ceiling: 2000.0,
        }
    }
}

/// Generates the default two-line scenario for `seed`.
pub fn generate(seed: u64) -> ScenarioConfig {
    generate_with(&GeneratorSettings::default(), seed)
}

/// Generates a scenario from `settings`; identical seeds give identical
/// scenarios.
///
/// Converters are listed line by line, not in time order. Gaps are drawn in
/// whole seconds from `[min_gap, max_gap]`.
pub fn generate_with(settings: &GeneratorSettings, seed: u64) -> ScenarioConfig {
    let mut rng = StdRng::seed_from_u64(seed);
    let end = settings.start + settings.horizon;
    let min_gap = settings.min_gap.num_seconds().max(1);
    let max_gap = settings.max_gap.num_seconds().max(min_gap);

    let mut converter_events = Vec::new();
    for (line_id, offset) in &settings.lines {
        let mut time = settings.start + *offset;
        while time < end {
            converter_events.push(ConverterConfig {
                time,
                hmr: settings.hmr,
                line_id: line_id.clone(),
            });
            time += Duration::seconds(rng.random_range(min_gap..=max_gap));
        }
    }

    ScenarioConfig {
        pig_iron_hourly_production: settings.production_rate,
        max_restrictive: settings.ceiling,
        min_restrictive: 100.0,
        allow_auto_spill_events: true,
        optimize_hmr: false,
        unit_steel_price: 1.0,
        max_optimizer_iterations: None,
        initial_conditions: InitialConditions {
            time: settings.start,
            value: settings.initial_value,
        },
        converter_events,
        spill_events: Vec::new(),
        maintenance_windows: Vec::new(),
        hmr: HmrLimits {
            min: settings.hmr.min(HmrLimits::default().min),
            max: 1.0,
        },
        constants: PlantConstants::default(),
    }
}
