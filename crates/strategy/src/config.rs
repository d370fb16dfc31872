use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use common::Result;

use crate::signal::{RsiRule, SignalParams};

/// Strategy parameter file (TOML).
///
/// Example `config/strategy.toml`:
/// ```toml
/// [bollinger]
/// window = 20
/// k = 2.0
///
/// [adx]
/// window = 14
/// threshold = 25.0
///
/// # optional
/// [rsi]
/// window = 14
/// buy_threshold = 18.0
/// sell_threshold = 70.0
/// combine = "override"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct StrategyFileConfig {
    #[serde(default)]
    pub bollinger: BollingerConfig,
    #[serde(default)]
    pub adx: AdxConfig,
    #[serde(default)]
    pub rsi: Option<RsiRule>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BollingerConfig {
    pub window: usize,
    /// Band width in standard deviations.
    pub k: f64,
}

impl Default for BollingerConfig {
    fn default() -> Self {
        Self { window: 20, k: 2.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AdxConfig {
    pub window: usize,
    pub threshold: f64,
}

impl Default for AdxConfig {
    fn default() -> Self {
        Self {
            window: 14,
            threshold: 25.0,
        }
    }
}

impl StrategyFileConfig {
    /// Load from a TOML file, falling back to defaults when the file is absent.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "No strategy config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(content)?;
        cfg.to_params().validate()?;
        Ok(cfg)
    }

    pub fn to_params(&self) -> SignalParams {
        SignalParams {
            bb_window: self.bollinger.window,
            bb_k: self.bollinger.k,
            adx_window: self.adx.window,
            adx_threshold: self.adx.threshold,
            rsi: self.rsi.clone(),
        }
    }
}
