use backtest::{run_by_period, simulate, Period, SimulatorConfig};
use common::{Candle, OrderSide, Signal};
use proptest::prelude::*;
use strategy::SignalRow;

fn signal_strategy() -> impl Strategy<Value = Signal> {
    prop_oneof![Just(Signal::Buy), Just(Signal::Sell), Just(Signal::Hold)]
}

fn rows_from(steps: &[(f64, Signal, i64)]) -> Vec<SignalRow> {
    let mut start_at = 1_700_000_000;
    steps
        .iter()
        .map(|&(close, signal, gap)| {
            start_at += gap;
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
        })
        .collect()
}

proptest! {
    /// Identical inputs give identical logs and balances.
    #[test]
    fn simulation_is_idempotent(
        steps in prop::collection::vec((1.0f64..1_000_000.0, signal_strategy(), 1i64..200_000), 0..200),
        fee_rate in 0.0f64..0.01,
    ) {
        let rows = rows_from(&steps);
        let config = SimulatorConfig::new(1_000_000.0, fee_rate).unwrap();
        let first = simulate(&rows, &config).unwrap();
        let second = simulate(&rows, &config).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Without a Buy nothing ever trades.
    #[test]
    fn no_buy_keeps_initial_cash(
        steps in prop::collection::vec(
            (1.0f64..1_000_000.0, prop_oneof![Just(Signal::Sell), Just(Signal::Hold)], 1i64..200_000),
            0..200,
        ),
    ) {
        let rows = rows_from(&steps);
        let config = SimulatorConfig::new(1_000_000.0, 0.0012).unwrap();
        let sim = simulate(&rows, &config).unwrap();
        prop_assert!(sim.trades.is_empty());
        prop_assert_eq!(sim.final_cash, 1_000_000.0);
        prop_assert_eq!(sim.equity.len(), rows.len());
    }

    /// Trades alternate Buy, Sell, Buy, ... and the equity curve has one
    /// point per candle.
    #[test]
    fn trades_alternate_sides(
        steps in prop::collection::vec((1.0f64..1_000_000.0, signal_strategy(), 1i64..200_000), 0..200),
    ) {
        let rows = rows_from(&steps);
        let config = SimulatorConfig::new(1_000_000.0, 0.0012).unwrap();
        let sim = simulate(&rows, &config).unwrap();
        prop_assert_eq!(sim.equity.len(), rows.len());
        for (i, trade) in sim.trades.iter().enumerate() {
            let expected = if i % 2 == 0 { OrderSide::Buy } else { OrderSide::Sell };
            prop_assert_eq!(trade.side, expected);
            prop_assert_eq!(trade.realized_pl.is_some(), trade.side == OrderSide::Sell);
        }
    }

    /// Monthly runs cover every candle once and each starts from initial cash.
    #[test]
    fn monthly_runs_start_fresh(
        steps in prop::collection::vec((1.0f64..1_000_000.0, signal_strategy(), 1i64..2_000_000), 1..200),
    ) {
        let rows = rows_from(&steps);
        let config = SimulatorConfig::new(1_000_000.0, 0.0012).unwrap();
        let results = run_by_period(&rows, Period::Month, &config).unwrap();

        let covered: usize = results.iter().map(|r| r.simulation.equity.len()).sum();
        prop_assert_eq!(covered, rows.len());
        for result in &results {
            prop_assert_eq!(result.simulation.initial_cash, 1_000_000.0);
            if let Some(first) = result.simulation.trades.first() {
                prop_assert_eq!(first.side, OrderSide::Buy);
            }
        }
    }
}
