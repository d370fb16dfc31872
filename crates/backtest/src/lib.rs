pub mod period;
pub mod report;
pub mod simulator;

pub use period::{run_by_period, split_by_period, Period, PeriodResult};
pub use report::{write_equity_curve, BacktestReport};
pub use simulator::{simulate, EquityPoint, Position, Simulation, SimulatorConfig, Summary};
