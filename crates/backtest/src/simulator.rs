use serde::Serialize;
use tracing::debug;

use common::{check_strictly_increasing, Error, OrderSide, Result, Signal, TradeRecord};
use strategy::SignalRow;

/// Starting cash and fee schedule for one simulation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatorConfig {
    initial_cash: f64,
    fee_rate: f64,
}

impl SimulatorConfig {
    /// `fee_rate` is the fraction of notional charged on entry and on exit.
    pub fn new(initial_cash: f64, fee_rate: f64) -> Result<Self> {
        if !initial_cash.is_finite() || initial_cash <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "initial_cash must be positive, got {initial_cash}"
            )));
        }
        if !fee_rate.is_finite() || !(0.0..1.0).contains(&fee_rate) {
            return Err(Error::InvalidParameter(format!(
                "fee_rate must be within [0, 1), got {fee_rate}"
            )));
        }
        Ok(Self {
            initial_cash,
            fee_rate,
        })
    }

    pub fn initial_cash(&self) -> f64 {
        self.initial_cash
    }

    pub fn fee_rate(&self) -> f64 {
        self.fee_rate
    }
}

/// Open exposure of a run. At most one long at a time.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum Position {
    #[default]
    Flat,
    Long {
        entry_price: f64,
        lot_size: f64,
        /// Fee paid on entry; charged again against the exit's realized P/L.
        entry_fee: f64,
    },
}

/// Cash balance after processing one candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EquityPoint {
    pub timestamp: i64,
    pub cash: f64,
}

/// Headline numbers of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    /// Number of entries.
    pub round_trips: usize,
    pub final_pl: f64,
    pub final_balance: f64,
}

/// Output of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Simulation {
    pub initial_cash: f64,
    pub final_cash: f64,
    /// One point per input candle.
    pub equity: Vec<EquityPoint>,
    pub trades: Vec<TradeRecord>,
    /// Position left open at the end of the range, if any.
    pub position: Position,
}

impl Simulation {
    pub fn summary(&self) -> Summary {
        Summary {
            round_trips: self
                .trades
                .iter()
                .filter(|t| t.side == OrderSide::Buy)
                .count(),
            final_pl: self.final_cash - self.initial_cash,
            final_balance: self.final_cash,
        }
    }
}

/// Replays a flat/long strategy over signal-annotated candles.
///
/// Buy while flat goes long with all cash (`lot = cash / close`) and debits
/// only the entry fee. Sell while long settles `(close - entry) * lot` minus
/// the exit fee into cash. Every other combination leaves state untouched.
/// Each call starts from a fresh ledger.
pub fn simulate(rows: &[SignalRow], config: &SimulatorConfig) -> Result<Simulation> {
    check_strictly_increasing(rows.iter().map(|r| r.candle.start_at))?;

    let mut ledger = Ledger::new(config);
    for row in rows {
        ledger.step(row)?;
    }

    debug!(
        candles = rows.len(),
        trades = ledger.trades.len(),
        final_cash = ledger.cash,
        "Simulation finished"
    );

    Ok(Simulation {
        initial_cash: config.initial_cash,
        final_cash: ledger.cash,
        equity: ledger.equity,
        trades: ledger.trades,
        position: ledger.position,
    })
}

struct Ledger {
    fee_rate: f64,
    cash: f64,
    position: Position,
    equity: Vec<EquityPoint>,
    trades: Vec<TradeRecord>,
}

impl Ledger {
    fn new(config: &SimulatorConfig) -> Self {
        Self {
            fee_rate: config.fee_rate,
            cash: config.initial_cash,
            position: Position::Flat,
            equity: Vec::new(),
            trades: Vec::new(),
        }
    }

    fn step(&mut self, row: &SignalRow) -> Result<()> {
        let close = row.candle.close;
        let timestamp = row.candle.start_at;

        match (self.position, row.signal) {
            (Position::Flat, Signal::Buy) => {
                ensure_tradable(timestamp, close)?;
                let lot_size = self.cash / close;
                let entry_fee = close * lot_size * self.fee_rate;
                self.cash -= entry_fee;
                self.position = Position::Long {
                    entry_price: close,
                    lot_size,
                    entry_fee,
                };
                debug!(timestamp, price = close, lot = lot_size, fee = entry_fee, "Entry");
                self.trades.push(TradeRecord {
                    side: OrderSide::Buy,
                    timestamp,
                    price: close,
                    fee: entry_fee,
                    realized_pl: None,
                });
            }
            (
                Position::Long {
                    entry_price,
                    lot_size,
                    entry_fee,
                },
                Signal::Sell,
            ) => {
                ensure_tradable(timestamp, close)?;
                let exit_fee = close * lot_size * self.fee_rate;
                let gross = (close - entry_price) * lot_size;
                let realized_pl = gross - (entry_fee + exit_fee);
                self.cash += gross - exit_fee;
                self.position = Position::Flat;
                debug!(timestamp, price = close, fee = exit_fee, pl = realized_pl, "Exit");
                self.trades.push(TradeRecord {
                    side: OrderSide::Sell,
                    timestamp,
                    price: close,
                    fee: exit_fee,
                    realized_pl: Some(realized_pl),
                });
            }
            _ => {}
        }

        self.equity.push(EquityPoint {
            timestamp,
            cash: self.cash,
        });
        Ok(())
    }
}

fn ensure_tradable(timestamp: i64, price: f64) -> Result<()> {
    if price.is_finite() && price > 0.0 {
        Ok(())
    } else {
        Err(Error::NonPositivePrice { timestamp, price })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Candle;

    fn row(close: f64, signal: Signal, start_at: i64) -> SignalRow {
        SignalRow::new(
            Candle {
                open: close,
                high: close,
                low: close,
                close,
                volume: 1.0,
                start_at,
            },
            signal,
        )
    }

    fn rows(steps: &[(f64, Signal)]) -> Vec<SignalRow> {
        steps.iter()
            .enumerate()
            .map(|(i, &(close, signal))| row(close, signal, 1_700_000_000 + i as i64 * 1800))
            .collect()
    }

    fn config() -> SimulatorConfig {
        SimulatorConfig::new(1_000_000.0, 0.0012).unwrap()
    }

    #[test]
    fn reference_round_trip_scenario() {
        let input = rows(&[
            (100.0, Signal::Hold),
            (90.0, Signal::Buy),
            (95.0, Signal::Hold),
            (110.0, Signal::Sell),
        ]);
        let sim = simulate(&input, &config()).unwrap();

        assert_eq!(sim.trades.len(), 2);
        let buy = &sim.trades[0];
        assert_eq!(buy.side, OrderSide::Buy);
        assert!((buy.fee - 1200.0).abs() < 1e-6, "entry fee {}", buy.fee);
        assert!(buy.realized_pl.is_none());

        let sell = &sim.trades[1];
        assert_eq!(sell.side, OrderSide::Sell);
        assert!((sell.fee - 1466.666_666_7).abs() < 1e-3, "exit fee {}", sell.fee);
        let pl = sell.realized_pl.unwrap();
        assert!((pl - 219_555.555_6).abs() < 1e-2, "realized {pl}");

        let cash: Vec<f64> = sim.equity.iter().map(|p| p.cash).collect();
        assert_eq!(cash.len(), 4);
        assert_eq!(cash[0], 1_000_000.0);
        assert!((cash[1] - 998_800.0).abs() < 1e-6);
        assert!((cash[2] - 998_800.0).abs() < 1e-6);
        assert!((cash[3] - 1_219_555.555_6).abs() < 1e-2, "final {}", cash[3]);

        assert_eq!(sim.position, Position::Flat);
        let summary = sim.summary();
        assert_eq!(summary.round_trips, 1);
        assert!((summary.final_pl - 219_555.555_6).abs() < 1e-2);
        assert_eq!(summary.final_balance, sim.final_cash);
    }

    #[test]
    fn closed_form_matches_single_round_trip() {
        let cfg = SimulatorConfig::new(50_000.0, 0.001).unwrap();
        let input = rows(&[(200.0, Signal::Buy), (180.0, Signal::Sell)]);
        let sim = simulate(&input, &cfg).unwrap();

        let lot = 50_000.0 / 200.0;
        let entry_fee = 200.0 * lot * 0.001;
        let exit_fee = 180.0 * lot * 0.001;
        let expected = 50_000.0 - entry_fee + (180.0 - 200.0) * lot - exit_fee;
        assert!((sim.final_cash - expected).abs() < 1e-9);
        // Realized P/L counts both fees; the cash delta matches it.
        assert!((sim.trades[1].realized_pl.unwrap() - (sim.final_cash - 50_000.0)).abs() < 1e-9);
    }

    #[test]
    fn no_buy_means_no_trades() {
        let input = rows(&[
            (100.0, Signal::Hold),
            (101.0, Signal::Sell),
            (99.0, Signal::Hold),
        ]);
        let sim = simulate(&input, &config()).unwrap();
        assert!(sim.trades.is_empty());
        assert_eq!(sim.final_cash, 1_000_000.0);
        assert_eq!(sim.equity.len(), 3);
        assert_eq!(sim.summary().round_trips, 0);
    }

    #[test]
    fn repeated_buy_while_long_is_ignored() {
        let input = rows(&[
            (100.0, Signal::Buy),
            (80.0, Signal::Buy),
            (120.0, Signal::Sell),
            (130.0, Signal::Sell),
        ]);
        let sim = simulate(&input, &config()).unwrap();
        assert_eq!(sim.trades.len(), 2);
        assert_eq!(sim.trades[0].price, 100.0);
        assert_eq!(sim.trades[1].price, 120.0);
    }

    #[test]
    fn open_position_at_end_is_reported() {
        let input = rows(&[(100.0, Signal::Buy), (150.0, Signal::Hold)]);
        let sim = simulate(&input, &config()).unwrap();
        assert!(matches!(sim.position, Position::Long { entry_price, .. } if entry_price == 100.0));
        // Unrealized gains do not touch cash.
        assert!((sim.final_cash - (1_000_000.0 - 1200.0)).abs() < 1e-6);
    }

    #[test]
    fn zero_close_on_entry_aborts() {
        let input = rows(&[(100.0, Signal::Hold), (0.0, Signal::Buy)]);
        let err = simulate(&input, &config()).unwrap_err();
        assert!(matches!(err, Error::NonPositivePrice { price, .. } if price == 0.0));
    }

    #[test]
    fn negative_close_on_exit_aborts() {
        let input = rows(&[(100.0, Signal::Buy), (-5.0, Signal::Sell)]);
        assert!(matches!(
            simulate(&input, &config()),
            Err(Error::NonPositivePrice { .. })
        ));
    }

    #[test]
    fn zero_close_without_trade_is_recorded() {
        let input = rows(&[(0.0, Signal::Hold), (0.0, Signal::Sell)]);
        let sim = simulate(&input, &config()).unwrap();
        assert_eq!(sim.equity.len(), 2);
    }

    #[test]
    fn unordered_rows_are_rejected() {
        let input = vec![row(100.0, Signal::Hold, 10), row(100.0, Signal::Hold, 10)];
        assert!(matches!(
            simulate(&input, &config()),
            Err(Error::UnorderedSeries { index: 1, .. })
        ));
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(SimulatorConfig::new(0.0, 0.001).is_err());
        assert!(SimulatorConfig::new(-10.0, 0.001).is_err());
        assert!(SimulatorConfig::new(1000.0, -0.001).is_err());
        assert!(SimulatorConfig::new(1000.0, 1.0).is_err());
        assert!(SimulatorConfig::new(f64::NAN, 0.001).is_err());
        assert!(SimulatorConfig::new(1000.0, 0.0).is_ok());
    }

    #[test]
    fn runs_are_independent() {
        let input = rows(&[(100.0, Signal::Buy), (110.0, Signal::Sell), (90.0, Signal::Buy)]);
        let first = simulate(&input, &config()).unwrap();
        let second = simulate(&input, &config()).unwrap();
        assert_eq!(first, second);
    }
}
