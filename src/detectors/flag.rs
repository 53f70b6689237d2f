//! Continuation matcher: Flag / Pennant
//!
//! Splits a trailing window into a pole segment and a flag segment. A bull
//! flag needs a sharp pole advance followed by a shallow, tight pullback;
//! the bear flag is the mirror. Confidence scales with the pole's strength.

use std::collections::HashMap;

use super::helpers::{clamp01, max_of, mean, min_of, pct_change, safe_div};
use crate::{
    params::{get_period, get_ratio, ParamMeta, ParameterizedDetector},
    swing::SwingSeries,
    PatternDetection, PatternDetector, PatternKind, Period, Ratio, Result, OHLCV,
};

impl_with_defaults!(FlagDetector);

/// Extra bars required beyond pole + flag before emitting.
const WARMUP_MARGIN: usize = 10;

/// Pole-move scale: a 10% pole maps to full confidence.
const POLE_SCALE: f64 = 10.0;

/// Bull and Bear Flag.
#[derive(Debug, Clone)]
pub struct FlagDetector {
    /// Length of the pole segment
    pub pole_lookback: Period,
    /// Length of the consolidation segment
    pub flag_lookback: Period,
    /// Minimum relative close-to-close move over the pole
    pub min_pole_move: Ratio,
    /// Maximum counter-move during the flag, as a fraction of the pole move
    pub max_retrace_ratio: f64,
    /// Maximum high-low range during the flag, as a fraction of the pole move
    pub max_range_ratio: f64,
}

impl Default for FlagDetector {
    fn default() -> Self {
        Self {
            pole_lookback: Period::new_const(20),
            flag_lookback: Period::new_const(15),
            min_pole_move: Ratio::new_const(0.03),
            max_retrace_ratio: 0.5,
            max_range_ratio: 0.3,
        }
    }
}

impl PatternDetector for FlagDetector {
    fn name(&self) -> &'static str {
        "flag"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::BullFlag, PatternKind::BearFlag]
    }

    fn min_bars(&self) -> usize {
        self.pole_lookback.get() + self.flag_lookback.get() + WARMUP_MARGIN
    }

    fn detect<T: OHLCV>(&self, bars: &[T], _swings: &SwingSeries) -> Vec<PatternDetection> {
        if bars.len() < self.min_bars() {
            return Vec::new();
        }

        let closes: Vec<f64> = bars.iter().map(OHLCV::close).collect();
        let highs: Vec<f64> = bars.iter().map(OHLCV::high).collect();
        let lows: Vec<f64> = bars.iter().map(OHLCV::low).collect();

        let pole = self.pole_lookback.get();
        let flag = self.flag_lookback.get();
        let total = pole + flag;
        let mut detections = Vec::new();

        for i in total..bars.len() {
            // Pole runs [i - total, i - flag); flag runs [i - flag, i)
            let pole_move = pct_change(closes[i - flag - 1], closes[i - total]);
            let flag_move = pct_change(closes[i - 1], closes[i - flag]);

            let flag_window = (i - flag)..i;
            let flag_range = safe_div(
                max_of(&highs[flag_window.clone()]) - min_of(&lows[flag_window.clone()]),
                mean(&closes[flag_window]),
            );

            let bull = pole_move > self.min_pole_move.get()
                && flag_move < 0.0
                && flag_move.abs() < pole_move * self.max_retrace_ratio
                && flag_range < pole_move * self.max_range_ratio;

            let bear = pole_move < -self.min_pole_move.get()
                && flag_move > 0.0
                && flag_move.abs() < pole_move.abs() * self.max_retrace_ratio
                && flag_range < pole_move.abs() * self.max_range_ratio;

            let pattern = if bull {
                PatternKind::BullFlag
            } else if bear {
                PatternKind::BearFlag
            } else {
                continue;
            };

            let confidence = clamp01(pole_move.abs() * POLE_SCALE);
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

        detections
    }
}

// ============================================================
// PARAMETER METADATA
// ============================================================

impl ParameterizedDetector for FlagDetector {
    fn param_meta() -> &'static [ParamMeta] {
        const META: &[ParamMeta] = &[
            ParamMeta::period(
                "pole_lookback",
                20.0,
                (10.0, 40.0, 5.0),
                "Length of the pole segment",
            ),
            ParamMeta::period(
                "flag_lookback",
                15.0,
                (5.0, 30.0, 5.0),
                "Length of the consolidation segment",
            ),
            ParamMeta::ratio(
                "min_pole_move",
                0.03,
                (0.01, 0.10, 0.01),
                "Minimum relative move over the pole",
            ),
        ];
        META
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            pole_lookback: get_period(params, "pole_lookback", 20)?,
            flag_lookback: get_period(params, "flag_lookback", 15)?,
            min_pole_move: get_ratio(params, "min_pole_move", 0.03)?,
            ..Self::default()
        })
    }

    fn detector_name() -> &'static str {
        "flag"
    }
}
