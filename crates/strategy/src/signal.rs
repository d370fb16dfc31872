use serde::{Deserialize, Serialize};
use tracing::debug;

use common::{Candle, CandleSeries, Error, Result, Signal};

use crate::indicators::{AdxIndicator, BandPoint, BollingerBands, RsiIndicator};

/// How the RSI leg combines with the band breakout + ranging-ADX leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RsiCombine {
    /// `(breakout && ranging) || rsi_extreme`: the RSI leg alone can fire,
    /// even in a trending market. Reproduces the backtest rule as written.
    #[default]
    Override,
    /// `breakout && ranging && rsi_extreme`.
    Confirm,
}

/// Optional RSI leg of the signal rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsiRule {
    #[serde(default = "default_rsi_window")]
    pub window: usize,
    /// Buy when RSI is at or below this value.
    #[serde(default = "default_rsi_buy")]
    pub buy_threshold: f64,
    /// Sell when RSI is at or above this value.
    #[serde(default = "default_rsi_sell")]
    pub sell_threshold: f64,
    #[serde(default)]
    pub combine: RsiCombine,
}

impl Default for RsiRule {
    fn default() -> Self {
        Self {
            window: default_rsi_window(),
            buy_threshold: default_rsi_buy(),
            sell_threshold: default_rsi_sell(),
            combine: RsiCombine::default(),
        }
    }
}

fn default_rsi_window() -> usize {
    14
}

fn default_rsi_buy() -> f64 {
    18.0
}

fn default_rsi_sell() -> f64 {
    70.0
}

/// Indicator windows and thresholds for the signal rule.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalParams {
    pub bb_window: usize,
    pub bb_k: f64,
    pub adx_window: usize,
    /// ADX strictly below this marks a ranging market.
    pub adx_threshold: f64,
    pub rsi: Option<RsiRule>,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            bb_window: 20,
            bb_k: 2.0,
            adx_window: 14,
            adx_threshold: 25.0,
            rsi: None,
        }
    }
}

impl SignalParams {
    pub fn validate(&self) -> Result<()> {
        if self.bb_window < 2 {
            return Err(invalid(format!("bb_window must be >= 2, got {}", self.bb_window)));
        }
        if !self.bb_k.is_finite() || self.bb_k < 0.0 {
            return Err(invalid(format!("bb_k must be finite and >= 0, got {}", self.bb_k)));
        }
        if self.adx_window == 0 {
            return Err(invalid("adx_window must be positive".into()));
        }
        if !self.adx_threshold.is_finite() {
            return Err(invalid(format!("adx_threshold must be finite, got {}", self.adx_threshold)));
        }
        if let Some(rule) = &self.rsi {
            if rule.window < 2 {
                return Err(invalid(format!("rsi window must be >= 2, got {}", rule.window)));
            }
            for (name, value) in [("buy_threshold", rule.buy_threshold), ("sell_threshold", rule.sell_threshold)] {
                if !(0.0..=100.0).contains(&value) {
                    return Err(invalid(format!("rsi {name} must be within 0..=100, got {value}")));
                }
            }
        }
        Ok(())
    }
}

fn invalid(msg: String) -> Error {
    Error::InvalidParameter(msg)
}

/// Indicator values for one candle. `None` marks warm-up.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IndicatorRow {
    pub bands: Option<BandPoint>,
    pub adx: Option<f64>,
    pub rsi: Option<f64>,
}

/// A candle with its indicators and derived signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalRow {
    pub candle: Candle,
    pub indicators: IndicatorRow,
    pub signal: Signal,
}

impl SignalRow {
    /// A row carrying an externally decided signal and no indicator values.
    pub fn new(candle: Candle, signal: Signal) -> Self {
        Self {
            candle,
            indicators: IndicatorRow::default(),
            signal,
        }
    }
}

/// Turns a candle series into one signal per candle.
#[derive(Debug, Clone)]
pub struct SignalEngine {
    params: SignalParams,
    bands: BollingerBands,
    adx: AdxIndicator,
    rsi: Option<RsiIndicator>,
}

impl SignalEngine {
    pub fn new(params: SignalParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            bands: BollingerBands::new(params.bb_window, params.bb_k),
            adx: AdxIndicator::new(params.adx_window),
            rsi: params.rsi.as_ref().map(|r| RsiIndicator::new(r.window)),
            params,
        })
    }

    /// Number of leading candles that are always `Hold`.
    pub fn warmup(&self) -> usize {
        let bands = self.params.bb_window - 1;
        let rsi = self.params.rsi.as_ref().map_or(0, |r| r.window);
        bands.max(self.adx.warmup()).max(rsi)
    }

    pub fn indicators(&self, series: &CandleSeries) -> Vec<IndicatorRow> {
        let candles = series.as_slice();
        let closes = series.closes();

        let bands = self.bands.compute(&closes);
        let adx = self.adx.compute(candles);
        let rsi = match &self.rsi {
            Some(rsi) => rsi.compute(&closes),
            None => vec![None; candles.len()],
        };

        bands
            .into_iter()
            .zip(adx)
            .zip(rsi)
            .map(|((bands, adx), rsi)| IndicatorRow { bands, adx, rsi })
            .collect()
    }

    /// Indicators and signal for every candle, index-aligned with `series`.
    pub fn annotate(&self, series: &CandleSeries) -> Vec<SignalRow> {
        let rows: Vec<SignalRow> = series
            .as_slice()
            .iter()
            .zip(self.indicators(series))
            .map(|(candle, indicators)| SignalRow {
                candle: *candle,
                indicators,
                signal: self.classify(candle.close, &indicators),
            })
            .collect();

        if rows.len() <= self.warmup() {
            debug!(candles = rows.len(), warmup = self.warmup(), "Series within warm-up, all signals hold");
        }
        rows
    }

    pub fn signals(&self, series: &CandleSeries) -> Vec<Signal> {
        self.annotate(series).into_iter().map(|r| r.signal).collect()
    }

    /// Signal of the most recent candle; `Hold` for an empty series.
    pub fn latest_signal(&self, series: &CandleSeries) -> Signal {
        self.annotate(series).last().map_or(Signal::Hold, |r| r.signal)
    }

    /// Applies the threshold rule to one candle. Buy is evaluated before
    /// Sell, so a candle meeting both conditions ends up `Sell`.
    pub fn classify(&self, close: f64, row: &IndicatorRow) -> Signal {
        let (Some(bands), Some(adx)) = (row.bands, row.adx) else {
            return Signal::Hold;
        };

        let ranging = adx < self.params.adx_threshold;
        let band_buy = close < bands.band_low && ranging;
        let band_sell = close > bands.band_high && ranging;

        let (buy, sell) = match &self.params.rsi {
            None => (band_buy, band_sell),
            Some(rule) => {
                let Some(rsi) = row.rsi else {
                    return Signal::Hold;
                };
                let rsi_buy = rsi <= rule.buy_threshold;
                let rsi_sell = rsi >= rule.sell_threshold;
                match rule.combine {
                    RsiCombine::Override => (band_buy || rsi_buy, band_sell || rsi_sell),
                    RsiCombine::Confirm => (band_buy && rsi_buy, band_sell && rsi_sell),
                }
            }
        };

        let mut signal = Signal::Hold;
        if buy {
            signal = Signal::Buy;
        }
        if sell {
            signal = Signal::Sell;
        }
        signal
    }
}
