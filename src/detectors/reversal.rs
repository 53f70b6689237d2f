//! Swing-based reversal matchers: Double Top, Double Bottom, Head & Shoulders
//!
//! These operate on the confirmed swing sequence. A detection is written at
//! the confirmation bar of the pattern's last swing, so the emitting bar never
//! precedes any data the match used.

use std::collections::HashMap;

use super::helpers::{clamp01, safe_div};
use crate::{
    params::{get_period, get_ratio, ParamMeta, ParameterizedDetector},
    swing::{SwingPoint, SwingSeries},
    PatternDetection, PatternDetector, PatternKind, Period, Ratio, Result, OHLCV,
};

impl_with_defaults!(DoubleTopDetector, DoubleBottomDetector, HeadShouldersDetector);

/// Confidence scale: a peak-to-neckline depth of 10% maps to full confidence.
const DEPTH_SCALE: f64 = 10.0;

// ============================================================
// DOUBLE TOP
// ============================================================

/// Double Top - two near-equal swing highs around an intervening trough.
///
/// Bearish reversal. The neckline is the lowest swing low strictly between
/// the two peaks; confidence scales with the peak-to-neckline depth.
#[derive(Debug, Clone)]
pub struct DoubleTopDetector {
    /// Maximum relative difference between the two peaks (boundary inclusive)
    pub tolerance: Ratio,
    /// Maximum bar distance between the two peaks
    pub pair_lookback: Period,
}

impl Default for DoubleTopDetector {
    fn default() -> Self {
        Self {
            tolerance: Ratio::new_const(0.02),
            pair_lookback: Period::new_const(50),
        }
    }
}

impl PatternDetector for DoubleTopDetector {
    fn name(&self) -> &'static str {
        "double_top"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::DoubleTop]
    }

    fn min_bars(&self) -> usize {
        50
    }

    fn detect<T: OHLCV>(&self, bars: &[T], swings: &SwingSeries) -> Vec<PatternDetection> {
        if bars.len() < self.min_bars() {
            return Vec::new();
        }

        let mut detections = Vec::new();

        for pair in swings.highs.windows(2) {
            let (peak1, peak2) = (&pair[0], &pair[1]);

            if peak2.index - peak1.index > self.pair_lookback.get() {
                continue;
            }

            let price_diff = safe_div((peak1.price - peak2.price).abs(), peak1.price);
            if price_diff > self.tolerance.get() {
                continue;
            }

            // Neckline: lowest swing low strictly between the two peaks
            let neckline = swings
                .lows
                .iter()
                .filter(|l| peak1.index < l.index && l.index < peak2.index)
                .min_by(|a, b| a.price.total_cmp(&b.price));
            let Some(neckline) = neckline else { continue };

            let depth = safe_div(peak1.price - neckline.price, peak1.price);
            let confidence = clamp01(depth * DEPTH_SCALE);
            if confidence <= 0.0 {
                continue;
            }

            detections.push(PatternDetection {
                index: peak2.confirmed_at,
                pattern: PatternKind::DoubleTop,
                direction: PatternKind::DoubleTop.direction(),
                confidence,
                neckline: Some(neckline.price),
            });
        }

        detections
    }
}

// ============================================================
// DOUBLE BOTTOM
// ============================================================

/// Double Bottom - two near-equal swing lows around an intervening peak.
///
/// Bullish mirror of [`DoubleTopDetector`]; the neckline is the highest swing
/// high strictly between the two bottoms.
#[derive(Debug, Clone)]
pub struct DoubleBottomDetector {
    pub tolerance: Ratio,
    pub pair_lookback: Period,
}

impl Default for DoubleBottomDetector {
    fn default() -> Self {
        Self {
            tolerance: Ratio::new_const(0.02),
            pair_lookback: Period::new_const(50),
        }
    }
}

impl PatternDetector for DoubleBottomDetector {
    fn name(&self) -> &'static str {
        "double_bottom"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::DoubleBottom]
    }

    fn min_bars(&self) -> usize {
        50
    }

    fn detect<T: OHLCV>(&self, bars: &[T], swings: &SwingSeries) -> Vec<PatternDetection> {
        if bars.len() < self.min_bars() {
            return Vec::new();
        }

        let mut detections = Vec::new();

        for pair in swings.lows.windows(2) {
            let (bottom1, bottom2) = (&pair[0], &pair[1]);

            if bottom2.index - bottom1.index > self.pair_lookback.get() {
                continue;
            }

            let price_diff = safe_div((bottom1.price - bottom2.price).abs(), bottom1.price);
            if price_diff > self.tolerance.get() {
                continue;
            }

            let neckline = swings
                .highs
                .iter()
                .filter(|h| bottom1.index < h.index && h.index < bottom2.index)
                .max_by(|a, b| a.price.total_cmp(&b.price));
            let Some(neckline) = neckline else { continue };

            let depth = safe_div(neckline.price - bottom1.price, bottom1.price);
            let confidence = clamp01(depth * DEPTH_SCALE);
            if confidence <= 0.0 {
                continue;
            }

            detections.push(PatternDetection {
                index: bottom2.confirmed_at,
                pattern: PatternKind::DoubleBottom,
                direction: PatternKind::DoubleBottom.direction(),
                confidence,
                neckline: Some(neckline.price),
            });
        }

        detections
    }
}

// ============================================================
// HEAD AND SHOULDERS
// ============================================================

/// Head & Shoulders (bearish) and its inverse (bullish).
///
/// Scans consecutive same-kind swing triples: the head must be strictly more
/// extreme than both shoulders, the shoulders must match within tolerance,
/// and the neckline is the average of the two most extreme opposite-kind
/// swings flanking the head.
#[derive(Debug, Clone)]
pub struct HeadShouldersDetector {
    /// Maximum relative difference between the two shoulders
    pub tolerance: Ratio,
}

impl Default for HeadShouldersDetector {
    fn default() -> Self {
        Self {
            tolerance: Ratio::new_const(0.02),
        }
    }
}

impl HeadShouldersDetector {
    /// Most extreme opposite swing strictly between two swing indices.
    fn extreme_between<'a>(
        swings: &'a [SwingPoint],
        from: usize,
        to: usize,
        pick_min: bool,
    ) -> Option<&'a SwingPoint> {
        let between = swings.iter().filter(|s| from < s.index && s.index < to);
        if pick_min {
            between.min_by(|a, b| a.price.total_cmp(&b.price))
        } else {
            between.max_by(|a, b| a.price.total_cmp(&b.price))
        }
    }
}

impl PatternDetector for HeadShouldersDetector {
    fn name(&self) -> &'static str {
        "head_shoulders"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::HeadShoulders, PatternKind::HeadShouldersInv]
    }

    fn min_bars(&self) -> usize {
        100
    }

    fn detect<T: OHLCV>(&self, bars: &[T], swings: &SwingSeries) -> Vec<PatternDetection> {
        if bars.len() < self.min_bars() {
            return Vec::new();
        }

        let mut detections = Vec::new();

        // Bearish: three swing highs, head above both shoulders
        for triple in swings.highs.windows(3) {
            let (ls, head, rs) = (&triple[0], &triple[1], &triple[2]);

            if !(head.price > ls.price && head.price > rs.price) {
                continue;
            }
            let shoulder_diff = safe_div((ls.price - rs.price).abs(), ls.price);
            if shoulder_diff > self.tolerance.get() {
                continue;
            }

            let left = Self::extreme_between(&swings.lows, ls.index, head.index, true);
            let right = Self::extreme_between(&swings.lows, head.index, rs.index, true);
            let (Some(left), Some(right)) = (left, right) else {
                continue;
            };

            let neckline = (left.price + right.price) / 2.0;
            let quality = safe_div(head.price - neckline, head.price);
            let confidence = clamp01(quality * DEPTH_SCALE);
            if confidence <= 0.0 {
                continue;
            }

            detections.push(PatternDetection {
                index: rs.confirmed_at,
                pattern: PatternKind::HeadShoulders,
                direction: PatternKind::HeadShoulders.direction(),
                confidence,
                neckline: Some(neckline),
            });
        }

        // Bullish inverse: three swing lows, head below both shoulders
        for triple in swings.lows.windows(3) {
            let (ls, head, rs) = (&triple[0], &triple[1], &triple[2]);

            if !(head.price < ls.price && head.price < rs.price) {
                continue;
            }
            let shoulder_diff = safe_div((ls.price - rs.price).abs(), ls.price);
            if shoulder_diff > self.tolerance.get() {
                continue;
            }

            let left = Self::extreme_between(&swings.highs, ls.index, head.index, false);
            let right = Self::extreme_between(&swings.highs, head.index, rs.index, false);
            let (Some(left), Some(right)) = (left, right) else {
                continue;
            };

            let neckline = (left.price + right.price) / 2.0;
            let quality = safe_div(neckline - head.price, neckline);
            let confidence = clamp01(quality * DEPTH_SCALE);
            if confidence <= 0.0 {
                continue;
            }

            detections.push(PatternDetection {
                index: rs.confirmed_at,
                pattern: PatternKind::HeadShouldersInv,
                direction: PatternKind::HeadShouldersInv.direction(),
                confidence,
                neckline: Some(neckline),
            });
        }

        detections.sort_by_key(|d| (d.index, d.pattern));
        detections
    }
}

// ============================================================
// PARAMETER METADATA
// ============================================================

impl ParameterizedDetector for DoubleTopDetector {
    fn param_meta() -> &'static [ParamMeta] {
        const META: &[ParamMeta] = &[
            ParamMeta::ratio(
                "tolerance",
                0.02,
                (0.005, 0.05, 0.005),
                "Maximum relative difference between the two peaks",
            ),
            ParamMeta::period(
                "pair_lookback",
                50.0,
                (30.0, 100.0, 10.0),
                "Maximum bar distance between the two peaks",
            ),
        ];
        META
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            tolerance: get_ratio(params, "tolerance", 0.02)?,
            pair_lookback: get_period(params, "pair_lookback", 50)?,
        })
    }

    fn detector_name() -> &'static str {
        "double_top"
    }
}

impl ParameterizedDetector for DoubleBottomDetector {
    fn param_meta() -> &'static [ParamMeta] {
        const META: &[ParamMeta] = &[
            ParamMeta::ratio(
                "tolerance",
                0.02,
                (0.005, 0.05, 0.005),
                "Maximum relative difference between the two bottoms",
            ),
            ParamMeta::period(
                "pair_lookback",
                50.0,
                (30.0, 100.0, 10.0),
                "Maximum bar distance between the two bottoms",
            ),
        ];
        META
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            tolerance: get_ratio(params, "tolerance", 0.02)?,
            pair_lookback: get_period(params, "pair_lookback", 50)?,
        })
    }

    fn detector_name() -> &'static str {
        "double_bottom"
    }
}

impl ParameterizedDetector for HeadShouldersDetector {
    fn param_meta() -> &'static [ParamMeta] {
        const META: &[ParamMeta] = &[ParamMeta::ratio(
            "tolerance",
            0.02,
            (0.005, 0.05, 0.005),
            "Maximum relative difference between the two shoulders",
        )];
        META
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            tolerance: get_ratio(params, "tolerance", 0.02)?,
        })
    }

    fn detector_name() -> &'static str {
        "head_shoulders"
    }
}
