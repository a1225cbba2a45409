//! Relative Strength Index (RSI).
//!
//! Wilder smoothing of average gains and average losses over daily closes.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss), rounded to the nearest integer.
//! Edge case: smoothed avg_loss == 0 → RSI = 100.

use common::Error;

pub const DEFAULT_RSI_PERIOD: usize = 14;

/// Substituted by callers when the history is too short to compute RSI.
pub const NEUTRAL_RSI: f64 = 50.0;

/// Overbought threshold used by the take-profit override.
pub const RSI_OVERBOUGHT: f64 = 70.0;

/// Compute RSI over `prices` (oldest first). Needs at least `period + 1` closes.
pub fn compute_rsi(prices: &[f64], period: usize) -> Result<f64, Error> {
    if period == 0 {
        return Err(Error::Other("RSI period must be >= 1".into()));
    }
    if prices.len() < period + 1 {
        return Err(Error::InsufficientData {
            needed: period + 1,
            got: prices.len(),
        });
    }

    let deltas: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    let gain = |d: f64| if d > 0.0 { d } else { 0.0 };
    let loss = |d: f64| if d < 0.0 { -d } else { 0.0 };

    // Seed: simple mean over the first `period` changes.
    let n = period as f64;
    let mut avg_gain = deltas[..period].iter().copied().map(gain).sum::<f64>() / n;
    let mut avg_loss = deltas[..period].iter().copied().map(loss).sum::<f64>() / n;

    for &d in &deltas[period..] {
        avg_gain = (avg_gain * (n - 1.0) + gain(d)) / n;
        avg_loss = (avg_loss * (n - 1.0) + loss(d)) / n;
    }

    if avg_loss == 0.0 {
        return Ok(100.0);
    }

    let rs = avg_gain / avg_loss;
    Ok((100.0 - 100.0 / (1.0 + rs)).round())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Wilder's worked example closes.
    const WILDER: [f64; 20] = [
        44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89, 46.03,
        45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
    ];

    #[test]
    fn rsi_monotonic_increase_is_100() {
        let prices: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        assert_eq!(compute_rsi(&prices, 14).unwrap(), 100.0);
    }

    #[test]
    fn rsi_monotonic_decrease_is_0() {
        let prices: Vec<f64> = (0..20).map(|i| 200.0 - 2.0 * i as f64).collect();
        assert_eq!(compute_rsi(&prices, 14).unwrap(), 0.0);
    }

    #[test]
    fn rsi_flat_series_is_100() {
        // No losses at all → avg_loss == 0 → maximal RSI, never NaN.
        let prices = [120.0; 16];
        assert_eq!(compute_rsi(&prices, 14).unwrap(), 100.0);
    }

    #[test]
    fn rsi_seed_only_matches_worked_example() {
        // 15 closes → only the seed average; 70.46 rounds to 70.
        assert_eq!(compute_rsi(&WILDER[..15], 14).unwrap(), 70.0);
    }

    #[test]
    fn rsi_applies_wilder_smoothing() {
        // Five further closes smoothed in: 57.92 rounds to 58.
        assert_eq!(compute_rsi(&WILDER, 14).unwrap(), 58.0);
    }

    #[test]
    fn rsi_insufficient_data() {
        let err = compute_rsi(&WILDER[..14], 14).unwrap_err();
        match err {
            Error::InsufficientData { needed, got } => {
                assert_eq!(needed, 15);
                assert_eq!(got, 14);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rsi_bounds() {
        let prices = [
            100.0, 105.0, 98.0, 110.0, 95.0, 115.0, 90.0, 120.0, 88.0, 121.0, 87.0, 125.0, 80.0,
            130.0, 79.0, 131.0, 60.0,
        ];
        for end in 15..=prices.len() {
            let v = compute_rsi(&prices[..end], 14).unwrap();
            assert!((0.0..=100.0).contains(&v), "RSI out of bounds at {end}: {v}");
            assert_eq!(v, v.round());
        }
    }

    #[test]
    fn rsi_zero_period_rejected() {
        assert!(compute_rsi(&WILDER, 0).is_err());
    }
}
