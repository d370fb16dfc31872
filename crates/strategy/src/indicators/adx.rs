use common::Candle;

/// ADX (Average Directional Index) with Wilder smoothing.
///
/// 1. +DM, −DM and true range from each pair of consecutive bars
/// 2. First smoothed +DM/−DM/TR are plain sums over `window` bars, then
///    `S = S − S/n + x`
/// 3. +DI = 100 · S(+DM) / S(TR), −DI likewise
/// 4. DX = 100 · |+DI − −DI| / (+DI + −DI)
/// 5. First ADX = mean of the first `window` DX values, then
///    `ADX = (ADX_prev · (n − 1) + DX) / n`
///
/// The first value lands at index `2 · window − 1`.
#[derive(Debug, Clone)]
pub struct AdxIndicator {
    pub window: usize,
}

impl AdxIndicator {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "ADX window must be >= 1");
        Self { window }
    }

    /// Number of leading candles without an ADX value.
    pub fn warmup(&self) -> usize {
        2 * self.window - 1
    }

    /// ADX aligned index-for-index with `candles` (oldest first).
    pub fn compute(&self, candles: &[Candle]) -> Vec<Option<f64>> {
        let n = candles.len();
        let mut out = vec![None; n];
        if n <= self.warmup() {
            return out;
        }

        let w = self.window as f64;
        let moves: Vec<DirectionalMove> = candles
            .windows(2)
            .map(|pair| DirectionalMove::between(&pair[0], &pair[1]))
            .collect();

        // moves[i - 1] belongs to candle i
        let mut plus_dm: f64 = moves[..self.window].iter().map(|m| m.plus_dm).sum();
        let mut minus_dm: f64 = moves[..self.window].iter().map(|m| m.minus_dm).sum();
        let mut tr: f64 = moves[..self.window].iter().map(|m| m.true_range).sum();

        let mut dx_sum = 0.0;
        let mut adx = 0.0;

        for i in self.window..n {
            if i > self.window {
                let m = &moves[i - 1];
                plus_dm = plus_dm - plus_dm / w + m.plus_dm;
                minus_dm = minus_dm - minus_dm / w + m.minus_dm;
                tr = tr - tr / w + m.true_range;
            }
            let dx = dx(plus_dm, minus_dm, tr);

            match i.cmp(&self.warmup()) {
                std::cmp::Ordering::Less => {
                    dx_sum += dx;
                    continue;
                }
                std::cmp::Ordering::Equal => adx = (dx_sum + dx) / w,
                std::cmp::Ordering::Greater => adx = (adx * (w - 1.0) + dx) / w,
            }
            out[i] = Some(adx);
        }
        out
    }
}

struct DirectionalMove {
    plus_dm: f64,
    minus_dm: f64,
    true_range: f64,
}

impl DirectionalMove {
    fn between(prev: &Candle, curr: &Candle) -> Self {
        let up_move = curr.high - prev.high;
        let down_move = prev.low - curr.low;

        let plus_dm = if up_move > down_move && up_move > 0.0 {
            up_move
        } else {
            0.0
        };
        let minus_dm = if down_move > up_move && down_move > 0.0 {
            down_move
        } else {
            0.0
        };

        let true_range = (curr.high - curr.low)
            .max((curr.high - prev.close).abs())
            .max((curr.low - prev.close).abs());

        Self {
            plus_dm,
            minus_dm,
            true_range,
        }
    }
}

fn dx(plus_dm: f64, minus_dm: f64, tr: f64) -> f64 {
    if tr <= 0.0 {
        return 0.0;
    }
    let di_pos = plus_dm / tr * 100.0;
    let di_neg = minus_dm / tr * 100.0;
    let di_sum = di_pos + di_neg;
    if di_sum > 0.0 {
        (di_pos - di_neg).abs() / di_sum * 100.0
    } else {
        0.0
    }
}
