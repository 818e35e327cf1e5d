//! # indicators — Technical Indicator Pipeline
//!
//! Pure functions over close/high/low slices. Every function returns only the
//! *defined* values, tail-aligned with the input: a series shorter than the
//! indicator's minimum lookback yields an **empty Vec** — no value, not an
//! error, and never a silent zero blended into scoring. Callers take
//! `.last()` and handle `None`.
//!
//! RSI, ATR and ADX use Wilder smoothing; EMA seeds with the SMA of the first
//! period; Bollinger uses the population standard deviation.

// ─── Moving Averages ──────────────────────────────────────────────────────────

/// Simple moving average. Output length = `len − period + 1`.
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    values
        .windows(period)
        .map(|w| w.iter().sum::<f64>() / period as f64)
        .collect()
}

/// Exponential moving average, seeded with the SMA of the first `period`
/// values. Output length = `len − period + 1`.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    let k = 2.0 / (period as f64 + 1.0);
    let mut current = values[..period].iter().sum::<f64>() / period as f64;
    let mut out = Vec::with_capacity(values.len() - period + 1);
    out.push(current);
    for &v in &values[period..] {
        current = (v - current) * k + current;
        out.push(current);
    }
    out
}

// ─── RSI ──────────────────────────────────────────────────────────────────────

/// Relative Strength Index (Wilder). Needs `period + 1` closes for the first
/// value; output length = `len − period`.
pub fn rsi(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() <= period {
        return Vec::new();
    }

    let mut gains = 0.0;
    let mut losses = 0.0;
    for i in 1..=period {
        let change = values[i] - values[i - 1];
        if change > 0.0 {
            gains += change;
        } else {
            losses -= change;
        }
    }
    let mut avg_gain = gains / period as f64;
    let mut avg_loss = losses / period as f64;

    let mut out = Vec::with_capacity(values.len() - period);
    out.push(rsi_point(avg_gain, avg_loss));

    for i in (period + 1)..values.len() {
        let change = values[i] - values[i - 1];
        let (gain, loss) = if change > 0.0 {
            (change, 0.0)
        } else {
            (0.0, -change)
        };
        avg_gain = (avg_gain * (period - 1) as f64 + gain) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss) / period as f64;
        out.push(rsi_point(avg_gain, avg_loss));
    }
    out
}

fn rsi_point(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

// ─── MACD ─────────────────────────────────────────────────────────────────────

/// One MACD reading: main line, signal line and their difference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdPoint {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// MACD (EMA `fast` − EMA `slow`, signalled by an EMA of `signal` periods over
/// the line). Output only where all three components are defined:
/// needs `slow + signal − 1` closes.
pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> Vec<MacdPoint> {
    if fast == 0 || signal == 0 || slow <= fast || values.len() < slow + signal - 1 {
        return Vec::new();
    }

    let ema_fast = ema(values, fast);
    let ema_slow = ema(values, slow);
    // ema_fast is longer; align both tails on the slow EMA.
    let offset = ema_fast.len() - ema_slow.len();
    let line: Vec<f64> = ema_fast[offset..]
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();

    let signal_line = ema(&line, signal);
    let offset = line.len() - signal_line.len();
    line[offset..]
        .iter()
        .zip(&signal_line)
        .map(|(&m, &s)| MacdPoint {
            macd: m,
            signal: s,
            histogram: m - s,
        })
        .collect()
}

// ─── True Range / ATR ─────────────────────────────────────────────────────────

/// Wilder smoothing: seed with the SMA of the first `period` samples, then
/// `(prev · (n−1) + x) / n`. Output length = `len − period + 1`.
fn wilder(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    let mut current = values[..period].iter().sum::<f64>() / period as f64;
    let mut out = Vec::with_capacity(values.len() - period + 1);
    out.push(current);
    for &v in &values[period..] {
        current = (current * (period - 1) as f64 + v) / period as f64;
        out.push(current);
    }
    out
}

fn true_ranges(highs: &[f64], lows: &[f64], closes: &[f64]) -> Vec<f64> {
    let n = highs.len().min(lows.len()).min(closes.len());
    (1..n)
        .map(|i| {
            let hl = highs[i] - lows[i];
            let hc = (highs[i] - closes[i - 1]).abs();
            let lc = (lows[i] - closes[i - 1]).abs();
            hl.max(hc).max(lc)
        })
        .collect()
}

/// Average True Range (Wilder). Needs `period + 1` candles; output length =
/// `len − period`.
pub fn atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Vec<f64> {
    let tr = true_ranges(highs, lows, closes);
    wilder(&tr, period)
}

// ─── ADX ──────────────────────────────────────────────────────────────────────

/// One ADX reading with its directional components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdxPoint {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
}

/// Average Directional Index (Wilder). The double smoothing (DM/TR, then DX)
/// means the first reading needs `2 · period` candles; output length =
/// `len − 2·period + 1`.
pub fn adx(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Vec<AdxPoint> {
    let n = highs.len().min(lows.len()).min(closes.len());
    if period == 0 || n < 2 * period {
        return Vec::new();
    }

    let mut plus_dm = Vec::with_capacity(n - 1);
    let mut minus_dm = Vec::with_capacity(n - 1);
    for i in 1..n {
        let up = highs[i] - highs[i - 1];
        let down = lows[i - 1] - lows[i];
        plus_dm.push(if up > down && up > 0.0 { up } else { 0.0 });
        minus_dm.push(if down > up && down > 0.0 { down } else { 0.0 });
    }
    let tr = true_ranges(highs, lows, closes);

    let smooth_tr = wilder(&tr, period);
    let smooth_plus = wilder(&plus_dm, period);
    let smooth_minus = wilder(&minus_dm, period);

    let di = |dm: f64, tr: f64| if tr > 0.0 { 100.0 * dm / tr } else { 0.0 };
    let plus_di: Vec<f64> = smooth_plus
        .iter()
        .zip(&smooth_tr)
        .map(|(&dm, &tr)| di(dm, tr))
        .collect();
    let minus_di: Vec<f64> = smooth_minus
        .iter()
        .zip(&smooth_tr)
        .map(|(&dm, &tr)| di(dm, tr))
        .collect();

    let dx: Vec<f64> = plus_di
        .iter()
        .zip(&minus_di)
        .map(|(&p, &m)| {
            let sum = p + m;
            if sum > 0.0 {
                100.0 * (p - m).abs() / sum
            } else {
                0.0
            }
        })
        .collect();

    let adx_line = wilder(&dx, period);
    let offset = plus_di.len() - adx_line.len();
    adx_line
        .iter()
        .enumerate()
        .map(|(i, &a)| AdxPoint {
            adx: a,
            plus_di: plus_di[offset + i],
            minus_di: minus_di[offset + i],
        })
        .collect()
}

// ─── Bollinger Bands ──────────────────────────────────────────────────────────

/// One Bollinger reading: SMA middle band ± `mult` standard deviations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBand {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Bollinger Bands over `period` closes. Output length = `len − period + 1`.
pub fn bollinger(values: &[f64], period: usize, mult: f64) -> Vec<BollingerBand> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    values
        .windows(period)
        .map(|w| {
            let mean = w.iter().sum::<f64>() / period as f64;
            let variance = w.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / period as f64;
            let sd = variance.sqrt();
            BollingerBand {
                upper: mean + mult * sd,
                middle: mean,
                lower: mean - mult * sd,
            }
        })
        .collect()
}

// ─── Sustained Condition ──────────────────────────────────────────────────────

/// True iff the predicate holds for *all* of the last `n` values. Filters
/// single-candle noise ("RSI below 30 for 3 consecutive candles"). With fewer
/// than `n` samples the condition is unconfirmed, i.e. false.
pub fn sustained<T>(values: &[T], n: usize, predicate: impl Fn(&T) -> bool) -> bool {
    if values.len() < n {
        return false;
    }
    values[values.len() - n..].iter().all(predicate)
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<f64> {
        (1..=n).map(|i| i as f64).collect()
    }

    #[test]
    fn test_sma_basic() {
        let out = sma(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(out, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_short_series_yields_empty() {
        // Every indicator must return "no value" below its lookback,
        // never a default silently blended into scoring.
        assert!(sma(&ramp(4), 5).is_empty());
        assert!(ema(&ramp(4), 5).is_empty());
        assert!(rsi(&ramp(14), 14).is_empty()); // needs period + 1
        assert!(macd(&ramp(33), 12, 26, 9).is_empty()); // needs 34
        assert!(bollinger(&ramp(19), 20, 2.0).is_empty());
        let v = ramp(14);
        assert!(atr(&v, &v, &v, 14).is_empty()); // needs 15
        let v = ramp(27);
        assert!(adx(&v, &v, &v, 14).is_empty()); // needs 28
    }

    #[test]
    fn test_ema_seed_is_sma() {
        let out = ema(&[2.0, 4.0, 6.0, 8.0], 3);
        assert_eq!(out.len(), 2);
        assert!((out[0] - 4.0).abs() < 1e-12);
        // k = 0.5 → 4 + (8 - 4) * 0.5 = 6
        assert!((out[1] - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_rsi_all_gains_is_100() {
        let out = rsi(&ramp(20), 14);
        assert_eq!(out.len(), 6);
        assert!(out.iter().all(|&v| v == 100.0));
    }

    #[test]
    fn test_rsi_all_losses_is_0() {
        let values: Vec<f64> = (1..=20).map(|i| 100.0 - i as f64).collect();
        let out = rsi(&values, 14);
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_rsi_known_dataset_range() {
        // StockCharts reference dataset; Wilder smoothing puts the first
        // reading around 70.
        let closes = [
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89, 46.03,
            45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
        ];
        let out = rsi(&closes, 14);
        assert_eq!(out.len(), 6);
        assert!(out[0] > 60.0 && out[0] < 80.0, "rsi[0] = {}", out[0]);
        assert!(out.iter().all(|&v| (0.0..=100.0).contains(&v)));
    }

    #[test]
    fn test_macd_flat_series_is_zero() {
        let flat = vec![50.0; 60];
        let out = macd(&flat, 12, 26, 9);
        assert!(!out.is_empty());
        let last = out.last().unwrap();
        assert!(last.macd.abs() < 1e-9);
        assert!(last.signal.abs() < 1e-9);
        assert!(last.histogram.abs() < 1e-9);
    }

    #[test]
    fn test_macd_uptrend_positive() {
        let out = macd(&ramp(80), 12, 26, 9);
        let last = out.last().unwrap();
        assert!(last.macd > 0.0);
        assert!((last.macd - last.signal - last.histogram).abs() < 1e-12);
    }

    #[test]
    fn test_atr_constant_range() {
        // Highs always 2 above lows, closes centred: TR is 2 everywhere,
        // so the Wilder average is exactly 2.
        let n = 30;
        let highs: Vec<f64> = (0..n).map(|_| 102.0).collect();
        let lows: Vec<f64> = (0..n).map(|_| 100.0).collect();
        let closes: Vec<f64> = (0..n).map(|_| 101.0).collect();
        let out = atr(&highs, &lows, &closes, 14);
        assert_eq!(out.len(), n - 14);
        assert!(out.iter().all(|&v| (v - 2.0).abs() < 1e-9));
    }

    #[test]
    fn test_adx_strong_uptrend() {
        // Monotonic rise: +DM dominates, ADX saturates high.
        let highs: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let lows: Vec<f64> = (0..40).map(|i| 99.0 + i as f64).collect();
        let closes: Vec<f64> = (0..40).map(|i| 99.5 + i as f64).collect();
        let out = adx(&highs, &lows, &closes, 14);
        assert!(!out.is_empty());
        let last = out.last().unwrap();
        assert!(last.plus_di > last.minus_di);
        assert!(last.adx > 25.0, "adx = {}", last.adx);
    }

    #[test]
    fn test_bollinger_flat_series_collapses() {
        let flat = vec![10.0; 25];
        let out = bollinger(&flat, 20, 2.0);
        let last = out.last().unwrap();
        assert_eq!(last.upper, 10.0);
        assert_eq!(last.middle, 10.0);
        assert_eq!(last.lower, 10.0);
    }

    #[test]
    fn test_bollinger_bands_straddle_mean() {
        let values: Vec<f64> = (0..25).map(|i| if i % 2 == 0 { 9.0 } else { 11.0 }).collect();
        let out = bollinger(&values, 20, 2.0);
        let last = out.last().unwrap();
        assert!(last.lower < last.middle && last.middle < last.upper);
        assert!((last.middle - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_sustained_condition() {
        let values = [35.0, 29.0, 28.0, 27.5];
        assert!(sustained(&values, 3, |&v| v < 30.0));
        assert!(!sustained(&values, 4, |&v| v < 30.0));
        // Fewer samples than required → unconfirmed.
        assert!(!sustained(&values[..2], 3, |&v| v < 30.0));
    }
}
