use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use common::{Fill, Result, Signal};
use strategy::SignalEngine;

use crate::bitbank::PublicClient;
use crate::trader::Trader;

/// What one polling cycle saw and did.
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub candles: usize,
    pub signal: Signal,
    pub price: f64,
    pub fill: Option<Fill>,
}

/// Market-data source of the polling loop.
pub struct MarketFeed {
    pub client: PublicClient,
    pub pair: String,
    pub candle_type: String,
    pub fetch_days: u32,
}

/// Polls candles on a fixed interval, classifies the latest one and
/// hands the signal to the [`Trader`].
pub struct Bot {
    feed: MarketFeed,
    signals: SignalEngine,
    trader: Trader,
    poll_interval: Duration,
}

impl Bot {
    pub fn new(feed: MarketFeed, signals: SignalEngine, trader: Trader, poll_interval: Duration) -> Self {
        Self {
            feed,
            signals,
            trader,
            poll_interval,
        }
    }

    /// One polling cycle: fetch history, classify the newest candle,
    /// read the ticker and act on the signal.
    pub async fn tick(&self) -> Result<TickOutcome> {
        let feed = &self.feed;
        let series = feed
            .client
            .recent_candles(&feed.pair, &feed.candle_type, feed.fetch_days)
            .await?;
        let signal = self.signals.latest_signal(&series);

        let price = feed.client.ticker(&feed.pair).await?;
        self.trader.client().observe_price(&feed.pair, price).await;
        info!(pair = %feed.pair, candles = series.len(), %signal, price, "Signal evaluated");

        let fill = self.trader.act(signal, price).await?;
        Ok(TickOutcome {
            candles: series.len(),
            signal,
            price,
            fill,
        })
    }

    /// Ticks immediately, then every `poll_interval` until `shutdown`
    /// flips to `true`. Failed cycles are logged and the loop carries on.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            pair = %self.feed.pair,
            interval_secs = self.poll_interval.as_secs(),
            "Polling loop started"
        );
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        error!(error = %e, "Polling cycle failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Shutdown requested, polling loop exiting");
                        break;
                    }
                }
            }
        }
    }
}
