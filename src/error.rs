//! Error types for the balance core.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::config::ConfigError;

/// Failures surfaced by construction, simulation and optimization.
#[derive(Debug, Error)]
pub enum BalanceError {
    /// A construction input violates its documented bounds.
    #[error("invalid {field}: {message}")]
    InvalidInput { field: String, message: String },

    /// Plateau analysis or optimization was requested before any simulation pass.
    #[error("balance has not been simulated yet")]
    NotSimulated,

    /// A converter handle does not address the arena.
    #[error("unknown converter index {0}")]
    UnknownConverter(usize),

    /// An HMR adjustment would leave the converter's allowed range.
    #[error("converter {index}: hmr {hmr:.6} outside [{min}, {max}]")]
    HmrOutOfRange {
        index: usize,
        hmr: f64,
        min: f64,
        max: f64,
    },

    /// The simulator emitted a sample above the ceiling with auto-spill enabled.
    #[error("ceiling breached at {time}: {value:.6} > {ceiling}")]
    CeilingBreached {
        time: NaiveDateTime,
        value: f64,
        ceiling: f64,
    },

    /// The optimizer loop did not reach a fixpoint within its iteration cap.
    #[error("optimizer exceeded {cap} iterations without reaching a fixpoint")]
    IterationCapExceeded { cap: usize },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl BalanceError {
    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }
}
