//! Regression-channel matchers: Wedge and Triangle
//!
//! Both fit ordinary-least-squares lines through the highs and lows of a
//! trailing window ending just before the current bar, then classify the
//! shape from the two normalized slopes. Slopes are divided by the window's
//! mean close so thresholds are price-scale independent.

use std::collections::HashMap;

use super::helpers::{clamp01, mean, ols_slope, safe_div};
use crate::{
    params::{get_period, ParamMeta, ParameterizedDetector},
    swing::SwingSeries,
    PatternDetection, PatternDetector, PatternError, PatternKind, Period, Result, OHLCV,
};

impl_with_defaults!(WedgeDetector, TriangleDetector);

/// Extra bars required beyond the regression window before emitting.
const WARMUP_MARGIN: usize = 10;

/// Triangle confidence scale: a normalized slope of 0.001/bar maps to full
/// confidence.
const SLOPE_SCALE: f64 = 1000.0;

/// Normalized high/low slopes of one trailing window.
struct ChannelSlopes {
    high: f64,
    low: f64,
}

/// Fit both boundary lines over `[i - lookback, i)`, normalized by mean close.
fn channel_slopes(highs: &[f64], lows: &[f64], closes: &[f64], i: usize, lookback: usize) -> ChannelSlopes {
    let window = (i - lookback)..i;
    let avg_close = mean(&closes[window.clone()]);
    ChannelSlopes {
        high: safe_div(ols_slope(&highs[window.clone()]), avg_close),
        low: safe_div(ols_slope(&lows[window]), avg_close),
    }
}

fn collect_series<T: OHLCV>(bars: &[T]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let highs = bars.iter().map(OHLCV::high).collect();
    let lows = bars.iter().map(OHLCV::low).collect();
    let closes = bars.iter().map(OHLCV::close).collect();
    (highs, lows, closes)
}

// ============================================================
// WEDGE
// ============================================================

/// Rising and Falling Wedge.
///
/// A rising wedge has both boundary lines sloping up with the lower line
/// steeper (channel narrowing into the rise); bearish. The falling wedge is
/// the bullish mirror. Confidence is the relative convergence of the two
/// slopes.
#[derive(Debug, Clone)]
pub struct WedgeDetector {
    /// Regression window length
    pub lookback: Period,
}

impl Default for WedgeDetector {
    fn default() -> Self {
        Self {
            lookback: Period::new_const(50),
        }
    }
}

impl PatternDetector for WedgeDetector {
    fn name(&self) -> &'static str {
        "wedge"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::RisingWedge, PatternKind::FallingWedge]
    }

    fn min_bars(&self) -> usize {
        self.lookback.get() + WARMUP_MARGIN
    }

    fn detect<T: OHLCV>(&self, bars: &[T], _swings: &SwingSeries) -> Vec<PatternDetection> {
        if bars.len() < self.min_bars() {
            return Vec::new();
        }

        let (highs, lows, closes) = collect_series(bars);
        let lookback = self.lookback.get();
        let mut detections = Vec::new();

        for i in lookback..bars.len() {
            let s = channel_slopes(&highs, &lows, &closes, i, lookback);

            if s.high > 0.0 && s.low > 0.0 && s.low > s.high {
                // Support rising faster than resistance: converging upward
                let convergence = safe_div(s.low - s.high, s.high);
                let confidence = clamp01(convergence.abs());
                if confidence > 0.0 {
                    detections.push(PatternDetection {
                        index: i,
                        pattern: PatternKind::RisingWedge,
                        direction: PatternKind::RisingWedge.direction(),
                        confidence,
                        neckline: None,
                    });
                }
            } else if s.high < 0.0 && s.low < 0.0 && s.high < s.low {
                // Resistance falling faster than support: converging downward
                let convergence = safe_div(s.low - s.high, s.low);
                let confidence = clamp01(convergence.abs());
                if confidence > 0.0 {
                    detections.push(PatternDetection {
                        index: i,
                        pattern: PatternKind::FallingWedge,
                        direction: PatternKind::FallingWedge.direction(),
                        confidence,
                        neckline: None,
                    });
                }
            }
        }

        detections
    }
}

// ============================================================
// TRIANGLE
// ============================================================

/// Ascending, Descending and Symmetrical Triangle.
///
/// Ascending: flat resistance, rising support (bullish). Descending: falling
/// resistance, flat support (bearish). Symmetrical: slopes of opposite sign
/// and comparable magnitude (neutral). "Flat" and "sloping" are separated by
/// `flat_threshold` and `slope_threshold` on the normalized per-bar slope.
#[derive(Debug, Clone)]
pub struct TriangleDetector {
    /// Regression window length
    pub lookback: Period,
    /// Normalized slope magnitude below which a line counts as flat
    pub flat_threshold: f64,
    /// Normalized slope magnitude above which a line counts as trending
    pub slope_threshold: f64,
}

impl Default for TriangleDetector {
    fn default() -> Self {
        Self {
            lookback: Period::new_const(50),
            flat_threshold: 1e-4,
            slope_threshold: 5e-4,
        }
    }
}

impl PatternDetector for TriangleDetector {
    fn name(&self) -> &'static str {
        "triangle"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[
            PatternKind::AscendingTriangle,
            PatternKind::DescendingTriangle,
            PatternKind::SymmetricalTriangle,
        ]
    }

    fn min_bars(&self) -> usize {
        self.lookback.get() + WARMUP_MARGIN
    }

    fn detect<T: OHLCV>(&self, bars: &[T], _swings: &SwingSeries) -> Vec<PatternDetection> {
        if bars.len() < self.min_bars() {
            return Vec::new();
        }

        let (highs, lows, closes) = collect_series(bars);
        let lookback = self.lookback.get();
        let mut detections = Vec::new();

        for i in lookback..bars.len() {
            let s = channel_slopes(&highs, &lows, &closes, i, lookback);

            let detection = if s.high.abs() < self.flat_threshold && s.low > self.slope_threshold {
                Some((PatternKind::AscendingTriangle, clamp01(s.low * SLOPE_SCALE)))
            } else if s.high < -self.slope_threshold && s.low.abs() < self.flat_threshold {
                Some((
                    PatternKind::DescendingTriangle,
                    clamp01(s.high.abs() * SLOPE_SCALE),
                ))
            } else if s.high < 0.0 && s.low > 0.0 {
                // Both lines converging toward the middle; require comparable
                // steepness before calling it symmetrical
                let ratio = safe_div(
                    s.high.abs().min(s.low.abs()),
                    s.high.abs().max(s.low.abs()),
                );
                (ratio > 0.5).then_some((PatternKind::SymmetricalTriangle, clamp01(ratio)))
            } else {
                None
            };

            if let Some((pattern, confidence)) = detection {
                if confidence > 0.0 {
                    detections.push(PatternDetection {
                        index: i,
                        pattern,
                        direction: pattern.direction(),
                        confidence,
                        neckline: None,
                    });
                }
            }
        }

        detections
    }

    fn validate_config(&self) -> Result<()> {
        if !self.flat_threshold.is_finite() || self.flat_threshold <= 0.0 {
            return Err(PatternError::InvalidConfig(
                "flat_threshold must be finite and positive".into(),
            ));
        }
        if !self.slope_threshold.is_finite() || self.slope_threshold <= 0.0 {
            return Err(PatternError::InvalidConfig(
                "slope_threshold must be finite and positive".into(),
            ));
        }
        if self.flat_threshold >= self.slope_threshold {
            return Err(PatternError::InvalidConfig(
                "flat_threshold must be below slope_threshold".into(),
            ));
        }
        Ok(())
    }
}

// ============================================================
// PARAMETER METADATA
// ============================================================

impl ParameterizedDetector for WedgeDetector {
    fn param_meta() -> &'static [ParamMeta] {
        const META: &[ParamMeta] = &[ParamMeta::period(
            "lookback",
            50.0,
            (30.0, 100.0, 10.0),
            "Regression window length",
        )];
        META
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            lookback: get_period(params, "lookback", 50)?,
        })
    }

    fn detector_name() -> &'static str {
        "wedge"
    }
}

impl ParameterizedDetector for TriangleDetector {
    fn param_meta() -> &'static [ParamMeta] {
        const META: &[ParamMeta] = &[ParamMeta::period(
            "lookback",
            50.0,
            (30.0, 100.0, 10.0),
            "Regression window length",
        )];
        META
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        let detector = Self {
            lookback: get_period(params, "lookback", 50)?,
            ..Self::default()
        };
        detector.validate_config()?;
        Ok(detector)
    }

    fn detector_name() -> &'static str {
        "triangle"
    }
}
