//! TOML/JSON scenario configuration for one transfer station.

use std::fs;
use std::path::Path;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::BalanceError;
use crate::sim::balance::{BalanceInputs, PigIronBalance};
use crate::sim::event::{ConverterEvent, MaintenanceWindow, SpillEvent};
use crate::sim::optimizer::OptimizerConfig;
use crate::sim::types::{BalanceState, HmrLimits, PlantConstants};

/// Top-level scenario configuration.
///
/// Only the initial conditions, the production rate and the ceiling are
/// required; every other field falls back to the plant defaults. Load with
/// [`ScenarioConfig::from_file`] or build one with [`crate::scenario::generate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Hourly pig iron inflow from the blast furnace (t/h, must be > 0).
    pub pig_iron_hourly_production: f64,
    /// Inventory ceiling (t).
    pub max_restrictive: f64,
    /// Inventory floor a converter charge may not draw below (t).
    #[serde(default = "default_min_restrictive")]
    pub min_restrictive: f64,
    /// Repair ceiling breaches with automatic spill events.
    #[serde(default = "default_true")]
    pub allow_auto_spill_events: bool,
    /// Run the HMR optimizer after the baseline simulation.
    #[serde(default)]
    pub optimize_hmr: bool,
    /// Price per tonne of convertible inventory gained.
    #[serde(default = "default_unit_steel_price")]
    pub unit_steel_price: f64,
    /// Optimizer iteration cap; unset derives it from the baseline pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_optimizer_iterations: Option<usize>,
    pub initial_conditions: InitialConditions,
    #[serde(default)]
    pub converter_events: Vec<ConverterConfig>,
    #[serde(default)]
    pub spill_events: Vec<SpillConfig>,
    #[serde(default)]
    pub maintenance_windows: Vec<MaintenanceConfig>,
    #[serde(default)]
    pub hmr: HmrLimits,
    #[serde(default)]
    pub constants: PlantConstants,
}

fn default_min_restrictive() -> f64 {
    100.0
}

fn default_true() -> bool {
    true
}

fn default_unit_steel_price() -> f64 {
    1.0
}

/// Inventory at the start of the horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InitialConditions {
    #[serde(with = "timestamp")]
    pub time: NaiveDateTime,
    pub value: f64,
}

/// One planned converter charge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConverterConfig {
    #[serde(with = "timestamp")]
    pub time: NaiveDateTime,
    pub hmr: f64,
    pub line_id: String,
}

/// One manually scheduled spill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpillConfig {
    #[serde(with = "timestamp")]
    pub time: NaiveDateTime,
}

/// Planned downtime of a converter line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MaintenanceConfig {
    pub line_id: String,
    #[serde(with = "timestamp")]
    pub time: NaiveDateTime,
    pub duration_minutes: i64,
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"converter_events[2].hmr"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl ScenarioConfig {
    /// Parses a scenario from a file, picking the format by extension
    /// (`.json` is JSON, anything else TOML).
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or does not parse.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_file(path)
        } else {
            Self::from_toml_file(path)
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml_str(&read(path)?)
    }

    /// Parses a scenario from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the JSON is invalid.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_json_str(&read(path)?)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Parses a scenario from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the JSON is invalid or contains unknown fields.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(|e| ConfigError::new("json", e.to_string()))
    }

    /// Serializes the scenario as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a value cannot be represented (e.g. NaN).
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::new("json", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid. Converters below
    /// `hmr.min` are accepted; the balance logs a warning for them.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let rate = self.pig_iron_hourly_production;
        if !(rate.is_finite() && rate > 0.0) {
            errors.push(ConfigError::new("pig_iron_hourly_production", "must be > 0"));
        }
        if !self.initial_conditions.value.is_finite() {
            errors.push(ConfigError::new("initial_conditions.value", "must be finite"));
        }
        if !(self.max_restrictive.is_finite()
            && self.max_restrictive >= self.initial_conditions.value)
        {
            errors.push(ConfigError::new(
                "max_restrictive",
                "must be >= initial_conditions.value",
            ));
        }
        if !(self.min_restrictive >= 0.0 && self.min_restrictive < self.max_restrictive) {
            errors.push(ConfigError::new(
                "min_restrictive",
                "must be >= 0 and < max_restrictive",
            ));
        }
        if !(self.unit_steel_price.is_finite() && self.unit_steel_price >= 0.0) {
            errors.push(ConfigError::new("unit_steel_price", "must be >= 0"));
        }

        let hmr = &self.hmr;
        if !(0.0 <= hmr.min && hmr.min <= hmr.max && hmr.max <= 1.0) {
            errors.push(ConfigError::new(
                "hmr.min",
                "must satisfy 0 <= hmr.min <= hmr.max <= 1",
            ));
        }

        let c = &self.constants;
        if c.torpedo_car_volume <= 0.0 {
            errors.push(ConfigError::new("constants.torpedo_car_volume", "must be > 0"));
        }
        if c.steel_per_run <= 0.0 {
            errors.push(ConfigError::new("constants.steel_per_run", "must be > 0"));
        }
        if !(c.converter_efficiency > 0.0 && c.converter_efficiency <= 1.0) {
            errors.push(ConfigError::new(
                "constants.converter_efficiency",
                "must be in (0.0, 1.0]",
            ));
        }
        if c.converter_duration_minutes <= 0 {
            errors.push(ConfigError::new(
                "constants.converter_duration_minutes",
                "must be > 0",
            ));
        }
        if c.horizon_tail_minutes <= 0 {
            errors.push(ConfigError::new("constants.horizon_tail_minutes", "must be > 0"));
        }
        if !(0..=9).contains(&c.spill_tolerance_decimals) {
            errors.push(ConfigError::new(
                "constants.spill_tolerance_decimals",
                "must be in [0, 9]",
            ));
        }

        for (i, cv) in self.converter_events.iter().enumerate() {
            if !(0.0..=hmr.max).contains(&cv.hmr) {
                errors.push(ConfigError::new(
                    format!("converter_events[{i}].hmr"),
                    format!("{} outside [0, hmr.max = {}]", cv.hmr, hmr.max),
                ));
            }
            if cv.line_id.is_empty() {
                errors.push(ConfigError::new(
                    format!("converter_events[{i}].line_id"),
                    "must not be empty",
                ));
            }
        }
        for (i, w) in self.maintenance_windows.iter().enumerate() {
            if w.duration_minutes <= 0 {
                errors.push(ConfigError::new(
                    format!("maintenance_windows[{i}].duration_minutes"),
                    "must be > 0",
                ));
            }
        }

        errors
    }

    /// Converts the scenario into balance construction inputs.
    pub fn to_balance_inputs(&self) -> BalanceInputs {
        let converters = self
            .converter_events
            .iter()
            .map(|c| ConverterEvent::new(c.time, c.hmr, c.line_id.clone()))
            .collect();

        let mut inputs = BalanceInputs::new(
            BalanceState::initial(self.initial_conditions.time, self.initial_conditions.value),
            self.pig_iron_hourly_production,
            self.max_restrictive,
            converters,
        );
        inputs.inventory_floor = self.min_restrictive;
        inputs.auto_spill = self.allow_auto_spill_events;
        inputs.scheduled_spills = self
            .spill_events
            .iter()
            .map(|s| SpillEvent::scheduled(s.time))
            .collect();
        inputs.maintenance_windows = self
            .maintenance_windows
            .iter()
            .map(|w| {
                MaintenanceWindow::new(
                    w.line_id.clone(),
                    w.time,
                    Duration::minutes(w.duration_minutes),
                )
            })
            .collect();
        inputs.constants = self.constants;
        inputs.hmr_limits = self.hmr;
        inputs
    }

    /// Validates the scenario and builds the balance it describes.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure as [`BalanceError::Config`], or
    /// any construction error from [`PigIronBalance::new`].
    pub fn build_balance(&self) -> Result<PigIronBalance, BalanceError> {
        if let Some(error) = self.validate().into_iter().next() {
            return Err(error.into());
        }
        PigIronBalance::new(self.to_balance_inputs())
    }

    pub fn optimizer_config(&self) -> OptimizerConfig {
        OptimizerConfig {
            unit_steel_price: self.unit_steel_price,
            max_iterations: self.max_optimizer_iterations,
        }
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|e| {
        ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
    })
}

/// Serde adapter for timestamps in either `YYYY-MM-DD HH:MM:SS` or ISO-8601
/// `YYYY-MM-DDTHH:MM:SS` form. Always writes the space-separated form.
mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    use crate::sim::types::TIME_FORMAT;

    const ACCEPTED: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        ACCEPTED
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw.trim(), fmt).ok())
    }

    pub fn serialize<S: Serializer>(time: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(TIME_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| {
            de::Error::custom(format!(
                "invalid timestamp \"{raw}\", expected YYYY-MM-DD HH:MM:SS"
            ))
        })
    }
}
