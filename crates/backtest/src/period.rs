use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::Serialize;

use common::{Error, Result};
use strategy::SignalRow;

use crate::simulator::{simulate, Simulation, SimulatorConfig};

/// UTC calendar bucket used to split a backtest into independent runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Month,
    Year,
}

impl Period {
    /// `"2024-05"` for months, `"2024"` for years.
    pub fn label(&self, start_at: i64) -> Result<String> {
        let dt: DateTime<Utc> = Utc.timestamp_opt(start_at, 0).single().ok_or_else(|| {
            Error::InvalidParameter(format!("timestamp {start_at} is out of range"))
        })?;
        Ok(match self {
            Period::Month => format!("{:04}-{:02}", dt.year(), dt.month()),
            Period::Year => format!("{:04}", dt.year()),
        })
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Period::Month => write!(f, "month"),
            Period::Year => write!(f, "year"),
        }
    }
}

/// Fresh simulation over one calendar bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodResult {
    pub label: String,
    pub simulation: Simulation,
}

/// Splits chronologically ordered rows into contiguous calendar buckets.
pub fn split_by_period(rows: &[SignalRow], period: Period) -> Result<Vec<(String, &[SignalRow])>> {
    let mut groups: Vec<(String, &[SignalRow])> = Vec::new();
    let mut start = 0;
    let mut current: Option<String> = None;

    for (i, row) in rows.iter().enumerate() {
        let label = period.label(row.candle.start_at)?;
        if current.as_deref() == Some(label.as_str()) {
            continue;
        }
        if let Some(open) = current.take() {
            groups.push((open, &rows[start..i]));
            start = i;
        }
        current = Some(label);
    }
    if let Some(open) = current {
        groups.push((open, &rows[start..]));
    }
    Ok(groups)
}

/// Runs an independent simulation per bucket, each starting from
/// `config.initial_cash()` with no open position.
pub fn run_by_period(
    rows: &[SignalRow],
    period: Period,
    config: &SimulatorConfig,
) -> Result<Vec<PeriodResult>> {
    split_by_period(rows, period)?
        .into_iter()
        .map(|(label, group)| {
            Ok(PeriodResult {
                label,
                simulation: simulate(group, config)?,
            })
        })
        .collect()
}
