use std::path::Path;

use tracing::info;

use common::{CandleSeries, Result};

use crate::bitbank::PublicClient;

/// Reads a candle series saved by [`save`]. Ordering is re-validated on load.
pub fn load(path: &Path) -> Result<CandleSeries> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

pub fn save(path: &Path, series: &CandleSeries) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string(series)?)?;
    Ok(())
}

/// Uses the cached series when the file exists; otherwise fetches `days`
/// of history and writes it to `path` for the next run.
pub async fn load_or_fetch(
    path: &Path,
    client: &PublicClient,
    pair: &str,
    candle_type: &str,
    days: u32,
) -> Result<CandleSeries> {
    if path.exists() {
        let series = load(path)?;
        info!(path = %path.display(), candles = series.len(), "Loaded cached candles");
        return Ok(series);
    }
    let series = client.recent_candles(pair, candle_type, days).await?;
    save(path, &series)?;
    info!(path = %path.display(), candles = series.len(), "Saved candle cache");
    Ok(series)
}
