use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use common::{Error, ExchangeClient, Fill, Order, OrderSide, Result};

/// Simulated exchange client for paper trading.
///
/// Fills at the latest known price with configurable slippage, charges
/// `fee_rate` on notional and keeps per-asset balances in memory.
/// No real orders are ever sent to the exchange.
pub struct PaperClient {
    /// Free balance per asset, e.g. `"jpy"` and `"btc"`.
    balances: Arc<RwLock<HashMap<String, f64>>>,
    /// Latest known price per pair, updated via `update_price`.
    prices: Arc<RwLock<HashMap<String, f64>>>,
    fee_rate: f64,
    /// Slippage in basis points applied to all fills.
    slippage_bps: f64,
}

impl PaperClient {
    pub fn new(quote_asset: &str, initial_balance: f64, fee_rate: f64, slippage_bps: f64) -> Self {
        info!(
            asset = quote_asset,
            balance = initial_balance,
            fee_rate = fee_rate,
            slippage_bps = slippage_bps,
            "PaperClient initialized"
        );
        let balances = HashMap::from([(quote_asset.to_string(), initial_balance)]);
        Self {
            balances: Arc::new(RwLock::new(balances)),
            prices: Arc::new(RwLock::new(HashMap::new())),
            fee_rate,
            slippage_bps,
        }
    }

    /// Update the latest price for a pair (called by the polling loop).
    pub async fn update_price(&self, pair: &str, price: f64) {
        self.prices.write().await.insert(pair.to_string(), price);
    }

    /// Snapshot of all simulated balances.
    pub async fn balances(&self) -> HashMap<String, f64> {
        self.balances.read().await.clone()
    }
}

fn split_pair(pair: &str) -> Result<(&str, &str)> {
    pair.split_once('_')
        .ok_or_else(|| Error::Exchange(format!("PaperClient cannot split pair '{pair}'")))
}

#[async_trait]
impl ExchangeClient for PaperClient {
    async fn submit_order(&self, order: &Order) -> Result<Fill> {
        let mid_price = self.current_price(&order.pair).await?;
        let (base, quote) = split_pair(&order.pair)?;

        // Apply slippage: buys pay more, sells receive less
        let fill_price = match order.side {
            OrderSide::Buy => mid_price * (1.0 + self.slippage_bps / 10_000.0),
            OrderSide::Sell => mid_price * (1.0 - self.slippage_bps / 10_000.0),
        };
        let notional = fill_price * order.amount;
        let fee = notional * self.fee_rate;

        let mut balances = self.balances.write().await;
        match order.side {
            OrderSide::Buy => {
                let cash = balances.get(quote).copied().unwrap_or(0.0);
                if notional + fee > cash {
                    return Err(Error::Exchange(format!(
                        "insufficient {quote} balance: need {:.2}, have {cash:.2}",
                        notional + fee
                    )));
                }
                *balances.entry(quote.to_string()).or_default() -= notional + fee;
                *balances.entry(base.to_string()).or_default() += order.amount;
            }
            OrderSide::Sell => {
                let held = balances.get(base).copied().unwrap_or(0.0);
                if order.amount > held {
                    return Err(Error::Exchange(format!(
                        "insufficient {base} balance: need {}, have {held}",
                        order.amount
                    )));
                }
                *balances.entry(base.to_string()).or_default() -= order.amount;
                *balances.entry(quote.to_string()).or_default() += notional - fee;
            }
        }

        debug!(
            pair = %order.pair,
            side = %order.side,
            mid = mid_price,
            fill = fill_price,
            amount = order.amount,
            fee = fee,
            "Paper fill simulated"
        );

        Ok(Fill {
            order_id: uuid::Uuid::new_v4().to_string(),
            pair: order.pair.clone(),
            side: order.side,
            price: Some(fill_price),
            amount: order.amount,
            timestamp: Utc::now(),
        })
    }

    async fn free_balance(&self, asset: &str) -> Result<f64> {
        Ok(self.balances.read().await.get(asset).copied().unwrap_or(0.0))
    }

    async fn current_price(&self, pair: &str) -> Result<f64> {
        self.prices.read().await.get(pair).copied().ok_or_else(|| {
            Error::Exchange(format!(
                "PaperClient has no price for pair '{pair}'. Ensure the polling loop updates it."
            ))
        })
    }

    async fn observe_price(&self, pair: &str, price: f64) {
        self.update_price(pair, price).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn paper_buy_fill_applies_positive_slippage() {
        let client = PaperClient::new("jpy", 100_000.0, 0.0, 10.0); // 10 bps
        client.update_price("btc_jpy", 1000.0).await;

        let order = Order::market("btc_jpy", OrderSide::Buy, 0.01);
        let fill = client.submit_order(&order).await.unwrap();

        let expected = 1000.0 * (1.0 + 10.0 / 10_000.0);
        let price = fill.price.unwrap();
        assert!((price - expected).abs() < 1e-6, "Buy fill price {price}, expected {expected}");
    }

    #[tokio::test]
    async fn paper_sell_fill_applies_negative_slippage() {
        let client = PaperClient::new("jpy", 100_000.0, 0.0, 10.0);
        client.update_price("btc_jpy", 1000.0).await;

        // First buy, then sell
        let buy = Order::market("btc_jpy", OrderSide::Buy, 0.01);
        client.submit_order(&buy).await.unwrap();

        let sell = Order::market("btc_jpy", OrderSide::Sell, 0.01);
        let fill = client.submit_order(&sell).await.unwrap();

        let expected = 1000.0 * (1.0 - 10.0 / 10_000.0);
        let price = fill.price.unwrap();
        assert!((price - expected).abs() < 1e-6, "Sell fill price {price}, expected {expected}");
    }

    #[tokio::test]
    async fn paper_balances_move_with_fills_and_fees() {
        let client = PaperClient::new("jpy", 10_000.0, 0.001, 0.0);
        client.update_price("btc_jpy", 5_000.0).await;

        let buy = Order::market("btc_jpy", OrderSide::Buy, 1.0);
        client.submit_order(&buy).await.unwrap();

        assert_eq!(client.free_balance("btc").await.unwrap(), 1.0);
        let jpy = client.free_balance("jpy").await.unwrap();
        assert!((jpy - (10_000.0 - 5_000.0 - 5.0)).abs() < 1e-9, "jpy {jpy}");

        client.update_price("btc_jpy", 6_000.0).await;
        let sell = Order::market("btc_jpy", OrderSide::Sell, 1.0);
        client.submit_order(&sell).await.unwrap();

        assert_eq!(client.free_balance("btc").await.unwrap(), 0.0);
        let jpy = client.free_balance("jpy").await.unwrap();
        assert!((jpy - (4_995.0 + 6_000.0 - 6.0)).abs() < 1e-9, "jpy {jpy}");
    }

    #[tokio::test]
    async fn paper_rejects_overspend_and_oversell() {
        let client = PaperClient::new("jpy", 1_000.0, 0.0, 0.0);
        client.update_price("btc_jpy", 5_000.0).await;

        let buy = Order::market("btc_jpy", OrderSide::Buy, 1.0);
        assert!(matches!(client.submit_order(&buy).await, Err(Error::Exchange(_))));

        let sell = Order::market("btc_jpy", OrderSide::Sell, 0.1);
        assert!(matches!(client.submit_order(&sell).await, Err(Error::Exchange(_))));
        assert_eq!(client.balances().await.get("jpy").copied(), Some(1_000.0));
    }

    #[tokio::test]
    async fn observed_price_is_used_for_fills() {
        let client = PaperClient::new("jpy", 100_000.0, 0.0, 0.0);
        let exchange: &dyn ExchangeClient = &client;
        exchange.observe_price("btc_jpy", 4_000.0).await;
        assert_eq!(exchange.current_price("btc_jpy").await.unwrap(), 4_000.0);
    }

    #[tokio::test]
    async fn paper_without_price_errors() {
        let client = PaperClient::new("jpy", 1_000.0, 0.0, 0.0);
        assert!(client.current_price("btc_jpy").await.is_err());
        let order = Order::market("btc_jpy", OrderSide::Buy, 0.001);
        assert!(client.submit_order(&order).await.is_err());
    }
}
