use chrono::{Duration, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use common::{Candle, CandleSeries, Error, Result};

use super::unwrap_envelope;

pub const PUBLIC_BASE_URL: &str = "https://public.bitbank.cc";

/// Unauthenticated market-data client: daily candlestick pages and ticker.
#[derive(Clone)]
pub struct PublicClient {
    base_url: String,
    http: Client,
}

impl PublicClient {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .use_rustls_tls()
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self::with_client(PUBLIC_BASE_URL, http))
    }

    pub fn with_client(base_url: impl Into<String>, http: Client) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    /// Candles of one UTC day. `Ok(None)` when bitbank reports no data
    /// for that day (`success != 1`).
    pub async fn candles_for_day(
        &self,
        pair: &str,
        candle_type: &str,
        day: NaiveDate,
    ) -> Result<Option<Vec<Candle>>> {
        let url = format!(
            "{}/{pair}/candlestick/{candle_type}/{}",
            self.base_url,
            day.format("%Y%m%d")
        );
        let body = self.get(&url).await?;
        match unwrap_envelope::<CandlestickData>(&body) {
            Ok(data) => Ok(Some(data.into_candles()?)),
            Err(Error::Exchange(reason)) => {
                warn!(%pair, day = %day, %reason, "Failed to fetch candles for day");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Candles for the last `days` UTC days (today included), sorted
    /// ascending with duplicate timestamps removed.
    pub async fn recent_candles(&self, pair: &str, candle_type: &str, days: u32) -> Result<CandleSeries> {
        let today = Utc::now().date_naive();
        let mut candles = Vec::new();
        for offset in 0..days {
            let day = today - Duration::days(i64::from(offset));
            if let Some(batch) = self.candles_for_day(pair, candle_type, day).await? {
                debug!(%pair, day = %day, count = batch.len(), "Fetched candles");
                candles.extend(batch);
            }
        }
        let series = normalize(candles)?;
        info!(%pair, %candle_type, days, candles = series.len(), "Candle history ready");
        Ok(series)
    }

    /// Last traded price.
    pub async fn ticker(&self, pair: &str) -> Result<f64> {
        let url = format!("{}/{pair}/ticker", self.base_url);
        let body = self.get(&url).await?;
        let ticker: TickerData = unwrap_envelope(&body)?;
        parse_decimal("last", &ticker.last)
    }

    async fn get(&self, url: &str) -> Result<String> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;
        let status = resp.status();
        let body = resp.text().await.map_err(|e| Error::Http(e.to_string()))?;
        if !status.is_success() && !body.contains("\"success\"") {
            return Err(Error::Http(format!("HTTP {status}: {body}")));
        }
        Ok(body)
    }
}

/// Sorts by `start_at` and drops duplicate timestamps, keeping the first.
pub fn normalize(mut candles: Vec<Candle>) -> Result<CandleSeries> {
    candles.sort_by_key(|c| c.start_at);
    candles.dedup_by_key(|c| c.start_at);
    CandleSeries::new(candles)
}

pub(crate) fn parse_decimal(field: &str, raw: &str) -> Result<f64> {
    raw.parse::<f64>()
        .map_err(|e| Error::Exchange(format!("invalid {field} '{raw}': {e}")))
}

// ─── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CandlestickData {
    candlestick: Vec<CandlestickBlock>,
}

#[derive(Deserialize)]
struct CandlestickBlock {
    /// `[open, high, low, close, volume, unix_ms]`
    ohlcv: Vec<(String, String, String, String, String, i64)>,
}

impl CandlestickData {
    fn into_candles(self) -> Result<Vec<Candle>> {
        let Some(block) = self.candlestick.into_iter().next() else {
            return Ok(Vec::new());
        };
        block
            .ohlcv
            .into_iter()
            .map(|(o, h, l, c, v, ts)| {
                Ok(Candle {
                    open: parse_decimal("open", &o)?,
                    high: parse_decimal("high", &h)?,
                    low: parse_decimal("low", &l)?,
                    close: parse_decimal("close", &c)?,
                    volume: parse_decimal("volume", &v)?,
                    start_at: ts / 1000,
                })
            })
            .collect()
    }
}

#[derive(Deserialize)]
struct TickerData {
    last: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(start_at: i64, close: f64) -> Candle {
        Candle {
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
            start_at,
        }
    }

    #[test]
    fn parses_candlestick_page() {
        let body = r#"{
            "success": 1,
            "data": {
                "candlestick": [{
                    "type": "30min",
                    "ohlcv": [
                        ["15000000", "15100000", "14900000", "15050000", "12.3456", 1706745600000],
                        ["15050000", "15200000", "15000000", "15150000", "7.5", 1706747400000]
                    ]
                }],
                "timestamp": 1706749000000
            }
        }"#;
        let candles = unwrap_envelope::<CandlestickData>(body)
            .unwrap()
            .into_candles()
            .unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].start_at, 1_706_745_600);
        assert_eq!(candles[0].close, 15_050_000.0);
        assert_eq!(candles[1].volume, 7.5);
    }

    #[test]
    fn malformed_price_is_rejected() {
        let body = r#"{"success":1,"data":{"candlestick":[{"type":"30min","ohlcv":[["x","1","1","1","1",0]]}]}}"#;
        let data = unwrap_envelope::<CandlestickData>(body).unwrap();
        assert!(data.into_candles().is_err());
    }

    #[test]
    fn normalize_sorts_and_dedupes() {
        let series = normalize(vec![
            candle(3600, 3.0),
            candle(0, 1.0),
            candle(1800, 2.0),
            candle(1800, 9.0),
        ])
        .unwrap();
        let stamps: Vec<i64> = series.as_slice().iter().map(|c| c.start_at).collect();
        assert_eq!(stamps, vec![0, 1800, 3600]);
    }
}
