/// Bollinger Bands over a trailing window of closes.
///
/// Middle = SMA(window), width = `k` × sample standard deviation (n − 1
/// denominator), the same estimator a pandas rolling `std()` uses.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    pub window: usize,
    pub k: f64,
}

/// Band values for one candle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandPoint {
    pub moving_average: f64,
    pub std_dev: f64,
    pub band_high: f64,
    pub band_low: f64,
}

impl BollingerBands {
    pub fn new(window: usize, k: f64) -> Self {
        assert!(window >= 2, "Bollinger window must be >= 2");
        Self { window, k }
    }

    /// Band values aligned index-for-index with `closes` (oldest first).
    /// The first `window - 1` entries are `None`.
    pub fn compute(&self, closes: &[f64]) -> Vec<Option<BandPoint>> {
        let mut out = vec![None; closes.len()];
        if closes.len() < self.window {
            return out;
        }

        for (i, window) in closes.windows(self.window).enumerate() {
            out[i + self.window - 1] = Some(self.point(window));
        }
        out
    }

    fn point(&self, window: &[f64]) -> BandPoint {
        let n = window.len() as f64;
        let mean = window.iter().sum::<f64>() / n;
        let variance = window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
        let std_dev = variance.sqrt();

        BandPoint {
            moving_average: mean,
            std_dev,
            band_high: mean + self.k * std_dev,
            band_low: mean - self.k * std_dev,
        }
    }
}
