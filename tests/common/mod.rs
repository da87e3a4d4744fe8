//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use pig_iron_balance::sim::balance::{BalanceInputs, PigIronBalance};
use pig_iron_balance::sim::event::ConverterEvent;
use pig_iron_balance::sim::types::{BalanceState, HmrLimits, PlantConstants};

/// Start of every fixture horizon (2023-06-02 00:00:00).
pub fn t0() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 6, 2)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

pub fn at(minutes: i64) -> NaiveDateTime {
    t0() + Duration::minutes(minutes)
}

/// Constants with `k = 250` so consumptions are round numbers.
pub fn k250() -> PlantConstants {
    PlantConstants {
        steel_per_run: 250.0,
        converter_efficiency: 1.0,
        ..PlantConstants::default()
    }
}

/// Inputs with `k = 250`, HMR limits `[0.8, 1.0]` and a 2000 t ceiling.
pub fn inputs(initial: f64, rate: f64, converters: Vec<ConverterEvent>) -> BalanceInputs {
    let mut inputs = BalanceInputs::new(BalanceState::initial(t0(), initial), rate, 2000.0, converters);
    inputs.constants = k250();
    inputs.hmr_limits = HmrLimits { min: 0.8, max: 1.0 };
    inputs
}

pub fn build(inputs: BalanceInputs) -> PigIronBalance {
    let Ok(balance) = PigIronBalance::new(inputs) else {
        panic!("fixture inputs should be valid");
    };
    balance
}

/// Two 0.8 charges at 30/60 min and a saturated 1.0 charge at 150 min,
/// 600 t/h from 1000 t. Baseline spills at 140 and 191 min.
pub fn two_spill_balance() -> PigIronBalance {
    build(inputs(
        1000.0,
        600.0,
        vec![
            ConverterEvent::new(at(30), 0.8, "cv_1"),
            ConverterEvent::new(at(60), 0.8, "cv_2"),
            ConverterEvent::new(at(150), 1.0, "cv_1"),
        ],
    ))
}

/// TOML rendition of a small station scenario.
pub const STATION_TOML: &str = r#"
pig_iron_hourly_production = 600.0
max_restrictive = 2000.0
min_restrictive = 100.0
optimize_hmr = true
unit_steel_price = 2.5

[initial_conditions]
time = "2023-06-02 00:00:00"
value = 1000.0

[[converter_events]]
time = "2023-06-02 00:30:00"
hmr = 0.8
line_id = "cv_1"

[[converter_events]]
time = "2023-06-02T01:00:00"
hmr = 0.8
line_id = "cv_2"

[[converter_events]]
time = "2023-06-02 02:30:00"
hmr = 1.0
line_id = "cv_1"

[[maintenance_windows]]
line_id = "cv_1"
time = "2023-06-02 03:00:00"
duration_minutes = 120

[hmr]
min = 0.8
max = 1.0

[constants]
steel_per_run = 250.0
converter_efficiency = 1.0
"#;

pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected} ± {tolerance}, got {actual}"
    );
}
