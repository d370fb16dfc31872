use std::time::Duration;

use crate::TradingMode;

/// API credentials for the private REST endpoints.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// All configuration loaded from environment variables at startup.
/// Missing required variables cause an immediate panic with a clear message.
#[derive(Debug, Clone)]
pub struct Config {
    pub trading_mode: TradingMode,

    /// Present whenever both keys are set; required in live mode.
    pub credentials: Option<Credentials>,

    // Market
    pub pair: String,
    pub candle_type: String,
    pub fetch_days: u32,

    // Trading
    /// Fiat spent per entry (JPY for `btc_jpy`).
    pub fiat_per_entry: f64,
    /// Base-asset balance below which the bot considers itself flat.
    pub dust_threshold: f64,
    pub poll_interval: Duration,

    // Paper trading
    pub paper_initial_fiat: f64,
    pub paper_fee_rate: f64,
    pub paper_slippage_bps: f64,

    /// Strategy parameter file (TOML).
    pub strategy_config_path: String,
}

impl Config {
    /// Load all configuration from environment variables.
    ///
    /// Loads `.env` if present, then the key=value file named by
    /// `BOT_SETTINGS_PATH` if set. Panics on any missing required variable.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // ignore error if .env not present
        if let Some(path) = optional_env("BOT_SETTINGS_PATH") {
            dotenvy::from_path(&path).unwrap_or_else(|e| {
                panic!("Failed to read settings file at '{path}': {e}")
            });
        }

        let trading_mode = match optional_env("TRADING_MODE")
            .unwrap_or_else(|| "paper".to_string())
            .to_lowercase()
            .as_str()
        {
            "paper" => TradingMode::Paper,
            "live" => TradingMode::Live,
            other => panic!("ERROR: TRADING_MODE must be 'paper' or 'live', got: '{other}'"),
        };

        let credentials = match trading_mode {
            TradingMode::Live => Some(Credentials {
                api_key: required_env("BITBANK_API_KEY"),
                api_secret: required_env("BITBANK_API_SECRET"),
            }),
            TradingMode::Paper => optional_env("BITBANK_API_KEY")
                .zip(optional_env("BITBANK_API_SECRET"))
                .map(|(api_key, api_secret)| Credentials { api_key, api_secret }),
        };

        Config {
            trading_mode,
            credentials,
            pair: optional_env("PAIR").unwrap_or_else(|| "btc_jpy".to_string()),
            candle_type: optional_env("CANDLE_TYPE").unwrap_or_else(|| "30min".to_string()),
            fetch_days: parsed_env("FETCH_DAYS", 31),
            fiat_per_entry: parsed_env("BTC_BUY_JPY", 2000.0),
            dust_threshold: parsed_env("DUST_THRESHOLD", 0.0001),
            poll_interval: Duration::from_secs(parsed_env("POLL_INTERVAL_SECS", 30 * 60)),
            paper_initial_fiat: parsed_env("PAPER_INITIAL_FIAT", 100_000.0),
            paper_fee_rate: parsed_env("PAPER_FEE_RATE", 0.0012),
            paper_slippage_bps: parsed_env("PAPER_SLIPPAGE_BPS", 10.0),
            strategy_config_path: optional_env("STRATEGY_CONFIG_PATH")
                .unwrap_or_else(|| "config/strategy.toml".to_string()),
        }
    }

    /// Base asset of the pair, e.g. `"btc"` for `"btc_jpy"`.
    pub fn base_asset(&self) -> &str {
        self.pair.split('_').next().unwrap_or(&self.pair)
    }

    /// Quote (fiat) asset of the pair, e.g. `"jpy"` for `"btc_jpy"`.
    pub fn quote_asset(&self) -> &str {
        self.pair.split('_').nth(1).unwrap_or("jpy")
    }
}

fn required_env(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        panic!("Required environment variable '{key}' is not set. Check your .env file.")
    })
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parses an optional variable, panicking on a present but malformed value.
fn parsed_env<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match optional_env(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            panic!("Environment variable '{key}' has invalid value '{raw}': {e}")
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_pair(pair: &str) -> Config {
        Config {
            trading_mode: TradingMode::Paper,
            credentials: None,
            pair: pair.to_string(),
            candle_type: "30min".into(),
            fetch_days: 31,
            fiat_per_entry: 2000.0,
            dust_threshold: 0.0001,
            poll_interval: Duration::from_secs(1800),
            paper_initial_fiat: 100_000.0,
            paper_fee_rate: 0.0012,
            paper_slippage_bps: 10.0,
            strategy_config_path: "config/strategy.toml".into(),
        }
    }

    #[test]
    fn assets_split_from_pair() {
        let cfg = config_with_pair("btc_jpy");
        assert_eq!(cfg.base_asset(), "btc");
        assert_eq!(cfg.quote_asset(), "jpy");
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let creds = Credentials {
            api_key: "key-123".into(),
            api_secret: "secret-456".into(),
        };
        let shown = format!("{creds:?}");
        assert!(!shown.contains("key-123"));
        assert!(!shown.contains("secret-456"));
    }
}
