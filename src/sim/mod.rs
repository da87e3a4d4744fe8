/// Validated converter arena and simulation driver.
pub mod balance;
pub mod engine;
/// Converter, spill and maintenance events.
pub mod event;
pub mod kpi;
pub mod optimizer;
/// Virtual plateau analysis.
pub mod plateau;
pub mod types;
