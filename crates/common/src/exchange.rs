use async_trait::async_trait;

use crate::{Fill, Order, Result};

/// Abstraction over the exchange's trading surface.
///
/// `BitbankClient` implements this for live trading.
/// `PaperClient` implements this for dry runs.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Submit a market order and return the exchange's confirmation.
    async fn submit_order(&self, order: &Order) -> Result<Fill>;

    /// Free (unlocked) balance of an asset, e.g. `"btc"` or `"jpy"`.
    async fn free_balance(&self, asset: &str) -> Result<f64>;

    /// Latest traded price for a pair.
    async fn current_price(&self, pair: &str) -> Result<f64>;

    /// Called by the polling loop with every freshly fetched ticker price.
    /// Clients that price fills locally override this.
    async fn observe_price(&self, _pair: &str, _price: f64) {}
}
