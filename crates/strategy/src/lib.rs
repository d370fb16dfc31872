pub mod config;
pub mod indicators;
pub mod signal;

pub use config::StrategyFileConfig;
pub use signal::{IndicatorRow, RsiCombine, RsiRule, SignalEngine, SignalParams, SignalRow};
