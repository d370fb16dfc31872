use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One fixed-interval OHLCV sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Candle open time, Unix seconds.
    pub start_at: i64,
}

/// Chronologically ordered candles with strictly increasing `start_at`.
///
/// Sorting and deduplicating raw exchange data is the fetch layer's job;
/// this type only checks the result and refuses anything out of order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(candles: Vec<Candle>) -> Result<Self> {
        check_strictly_increasing(candles.iter().map(|c| c.start_at))?;
        Ok(Self { candles })
    }

    pub fn as_slice(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

}

impl<'de> Deserialize<'de> for CandleSeries {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let candles = Vec::<Candle>::deserialize(deserializer)?;
        CandleSeries::new(candles).map_err(serde::de::Error::custom)
    }
}

/// Fails with `UnorderedSeries` at the first timestamp that does not
/// strictly exceed its predecessor.
pub fn check_strictly_increasing(timestamps: impl IntoIterator<Item = i64>) -> Result<()> {
    let mut prev: Option<i64> = None;
    for (index, start_at) in timestamps.into_iter().enumerate() {
        if let Some(p) = prev {
            if start_at <= p {
                return Err(Error::UnorderedSeries { index, start_at });
            }
        }
        prev = Some(start_at);
    }
    Ok(())
}

/// Per-candle trading decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Buy,
    Sell,
    #[default]
    Hold,
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Buy => write!(f, "buy"),
            Signal::Sell => write!(f, "sell"),
            Signal::Hold => write!(f, "hold"),
        }
    }
}

/// Side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Lowercase form used on the bitbank wire.
    pub fn as_api_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// A market order for the configured pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub pair: String,
    pub side: OrderSide,
    /// Amount in base asset units (e.g. BTC).
    pub amount: f64,
}

impl Order {
    pub fn market(pair: impl Into<String>, side: OrderSide, amount: f64) -> Self {
        Self {
            pair: pair.into(),
            side,
            amount,
        }
    }
}

/// Confirmation of a submitted order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: String,
    pub pair: String,
    pub side: OrderSide,
    /// Average execution price when the exchange reports one.
    pub price: Option<f64>,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

/// Immutable log entry for one executed entry or exit in a simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub side: OrderSide,
    /// Unix seconds of the candle the trade executed on.
    pub timestamp: i64,
    pub price: f64,
    pub fee: f64,
    /// Present on exits only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realized_pl: Option<f64>,
}

/// Whether orders go to the real exchange or to the in-process simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    Live,
    Paper,
}

impl std::fmt::Display for TradingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradingMode::Live => write!(f, "live"),
            TradingMode::Paper => write!(f, "paper"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(start_at: i64) -> Candle {
        Candle {
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 0.0,
            start_at,
        }
    }

    #[test]
    fn series_accepts_increasing_timestamps() {
        let series = CandleSeries::new(vec![candle(1), candle(2), candle(10)]).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.last().unwrap().start_at, 10);
    }

    #[test]
    fn series_rejects_duplicate_timestamp() {
        let err = CandleSeries::new(vec![candle(1), candle(2), candle(2)]).unwrap_err();
        assert!(matches!(err, Error::UnorderedSeries { index: 2, start_at: 2 }));
    }

    #[test]
    fn series_rejects_descending_timestamp() {
        let err = CandleSeries::new(vec![candle(5), candle(3)]).unwrap_err();
        assert!(matches!(err, Error::UnorderedSeries { index: 1, .. }));
    }

    #[test]
    fn empty_series_is_valid() {
        assert!(CandleSeries::new(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn deserializing_unordered_series_fails() {
        let json = r#"[
            {"open":1,"high":1,"low":1,"close":1,"volume":0,"start_at":20},
            {"open":1,"high":1,"low":1,"close":1,"volume":0,"start_at":10}
        ]"#;
        assert!(serde_json::from_str::<CandleSeries>(json).is_err());
    }

    #[test]
    fn series_serializes_as_plain_array() {
        let series = CandleSeries::new(vec![candle(1), candle(2)]).unwrap();
        let json = serde_json::to_string(&series).unwrap();
        assert!(json.starts_with('['), "{json}");

        let back: CandleSeries = serde_json::from_str(&json).unwrap();
        assert_eq!(back, series);
    }

    #[test]
    fn signal_displays_lowercase() {
        assert_eq!(Signal::Buy.to_string(), "buy");
        assert_eq!(Signal::default(), Signal::Hold);
    }
}
