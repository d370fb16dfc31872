use std::sync::Arc;

use tracing::{error, info};

use common::{ExchangeClient, Fill, Order, OrderSide, Result, Signal};

const AMOUNT_SCALE: f64 = 1e8;

/// Rounds a base-asset amount to 8 decimals.
pub fn round_amount(amount: f64) -> f64 {
    (amount * AMOUNT_SCALE).round() / AMOUNT_SCALE
}

/// Truncates to 8 decimals so a sell never exceeds the held balance.
pub fn floor_amount(amount: f64) -> f64 {
    (amount * AMOUNT_SCALE).floor() / AMOUNT_SCALE
}

/// Maps a signal and the current holdings to at most one market order.
///
/// Buys spend `fiat_per_entry` only while the base balance is below
/// `dust`; sells liquidate the whole balance once it exceeds `dust`.
pub fn decide(
    pair: &str,
    signal: Signal,
    base_balance: f64,
    price: f64,
    fiat_per_entry: f64,
    dust: f64,
) -> Option<Order> {
    match signal {
        Signal::Buy if base_balance < dust && price > 0.0 => {
            let amount = round_amount(fiat_per_entry / price);
            (amount > 0.0).then(|| Order::market(pair, OrderSide::Buy, amount))
        }
        Signal::Sell if base_balance > dust => {
            let amount = floor_amount(base_balance);
            (amount > 0.0).then(|| Order::market(pair, OrderSide::Sell, amount))
        }
        _ => None,
    }
}

/// Turns signals into orders against an [`ExchangeClient`].
pub struct Trader {
    client: Arc<dyn ExchangeClient>,
    pair: String,
    base_asset: String,
    fiat_per_entry: f64,
    dust_threshold: f64,
}

impl Trader {
    pub fn new(
        client: Arc<dyn ExchangeClient>,
        pair: impl Into<String>,
        base_asset: impl Into<String>,
        fiat_per_entry: f64,
        dust_threshold: f64,
    ) -> Self {
        Self {
            client,
            pair: pair.into(),
            base_asset: base_asset.into(),
            fiat_per_entry,
            dust_threshold,
        }
    }

    pub fn client(&self) -> &Arc<dyn ExchangeClient> {
        &self.client
    }

    /// Reads the free base balance and submits the order `decide` asks
    /// for, if any. Returns the fill of the submitted order.
    pub async fn act(&self, signal: Signal, price: f64) -> Result<Option<Fill>> {
        if signal == Signal::Hold {
            return Ok(None);
        }
        let balance = self.client.free_balance(&self.base_asset).await?;
        let Some(order) = decide(
            &self.pair,
            signal,
            balance,
            price,
            self.fiat_per_entry,
            self.dust_threshold,
        ) else {
            info!(%signal, balance, asset = %self.base_asset, "Signal ignored for current holdings");
            return Ok(None);
        };

        info!(pair = %order.pair, side = %order.side, amount = order.amount, price, "Placing market order");
        match self.client.submit_order(&order).await {
            Ok(fill) => {
                info!(order_id = %fill.order_id, price = ?fill.price, amount = fill.amount, "Order filled");
                Ok(Some(fill))
            }
            Err(e) => {
                error!(pair = %order.pair, side = %order.side, error = %e, "Order submission failed");
                Err(e)
            }
        }
    }
}
