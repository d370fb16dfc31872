//! Text and JSON reporting for simulation results.
//!
//! Nothing here touches the simulation state; it only formats what
//! `simulate` and `run_by_period` return.

use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;

use common::Result;

use crate::period::{Period, PeriodResult};
use crate::simulator::{EquityPoint, Simulation, Summary};

/// Full-run summary plus per-period final balances, serializable to JSON.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    pub initial_cash: f64,
    pub fee_rate: f64,
    pub summary: Summary,
    pub periods: Vec<PeriodLine>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PeriodLine {
    pub period: Period,
    pub label: String,
    pub summary: Summary,
}

impl BacktestReport {
    pub fn new(simulation: &Simulation, fee_rate: f64) -> Self {
        Self {
            initial_cash: simulation.initial_cash,
            fee_rate,
            summary: simulation.summary(),
            periods: Vec::new(),
        }
    }

    pub fn with_periods(mut self, period: Period, results: &[PeriodResult]) -> Self {
        self.periods.extend(results.iter().map(|r| PeriodLine {
            period,
            label: r.label.clone(),
            summary: r.simulation.summary(),
        }));
        self
    }

    /// Human-readable report: trade count, final P/L, final balance, then
    /// final balance per month and per year.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Trades:        {}", self.summary.round_trips);
        let _ = writeln!(out, "Final P/L:     {:.2}", self.summary.final_pl);
        let _ = writeln!(out, "Final balance: {:.2}", self.summary.final_balance);

        for period in [Period::Month, Period::Year] {
            let lines: Vec<&PeriodLine> =
                self.periods.iter().filter(|l| l.period == period).collect();
            if lines.is_empty() {
                continue;
            }
            let _ = writeln!(out);
            let _ = writeln!(out, "Final balance by {period}:");
            for line in lines {
                let _ = writeln!(
                    out,
                    "  {}: {:.2} ({} trades, P/L {:.2})",
                    line.label, line.summary.final_balance, line.summary.round_trips, line.summary.final_pl
                );
            }
        }
        out
    }
}

/// Writes the equity curve as a JSON array of `{timestamp, cash}` for charting.
pub fn write_equity_curve(path: impl AsRef<Path>, equity: &[EquityPoint]) -> Result<()> {
    let json = serde_json::to_string_pretty(equity)?;
    std::fs::write(path, json)?;
    Ok(())
}
