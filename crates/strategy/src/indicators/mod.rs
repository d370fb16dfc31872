pub mod adx;
pub mod bollinger;
pub mod rsi;

pub use adx::AdxIndicator;
pub use bollinger::{BandPoint, BollingerBands};
pub use rsi::RsiIndicator;
