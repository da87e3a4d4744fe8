/// CSV export of simulation passes.
pub mod export;
