use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A candle series whose timestamps are not strictly increasing.
    /// `index` is the first offending position.
    #[error("Candle series is not strictly increasing at index {index} (start_at={start_at})")]
    UnorderedSeries { index: usize, start_at: i64 },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A trade step hit a close price that cannot size or settle a position.
    #[error("Non-positive close price {price} at {timestamp}; simulation aborted")]
    NonPositivePrice { timestamp: i64, price: f64 },

    #[error("Exchange API error: {0}")]
    Exchange(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
