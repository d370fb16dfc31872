pub mod bitbank;
pub mod cache;
pub mod lifecycle;
pub mod trader;

pub use bitbank::{BitbankClient, PublicClient};
pub use lifecycle::{Bot, MarketFeed, TickOutcome};
pub use trader::{decide, Trader};
