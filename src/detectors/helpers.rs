//! Shared numeric helpers for pattern and structure detection
//!
//! Division is epsilon-guarded everywhere: a degenerate denominator (zero
//! range, zero price) yields a neutral 0.0 instead of NaN/inf, so detector
//! output stays finite for any well-formed input.

/// Guard for near-zero denominators
pub const EPS: f64 = 1e-10;

/// Division that returns 0.0 when the denominator is effectively zero.
#[inline]
pub fn safe_div(num: f64, den: f64) -> f64 {
    if den.abs() < EPS {
        0.0
    } else {
        num / den
    }
}

/// Relative change from `prev` to `now`; 0.0 when `prev` is degenerate.
#[inline]
pub fn pct_change(now: f64, prev: f64) -> f64 {
    safe_div(now - prev, prev)
}

/// Clamp a confidence value into [0, 1]; NaN collapses to 0.
#[inline]
pub fn clamp01(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Arithmetic mean; 0.0 for an empty slice.
#[inline]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Maximum of a slice (fold over `f64::max`); -inf for an empty slice.
#[inline]
pub fn max_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Minimum of a slice; +inf for an empty slice.
#[inline]
pub fn min_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

/// Ordinary-least-squares slope of `ys` against x = 0, 1, ..., n-1.
///
/// Returns 0.0 for fewer than two points or a degenerate x-variance.
pub fn ols_slope(ys: &[f64]) -> f64 {
    let n = ys.len();
    if n < 2 {
        return 0.0;
    }

    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(ys);

    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in ys.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }

    safe_div(num, den)
}
