//! Composite pattern scoring
//!
//! Folds the per-pattern confidence columns into four weighted scores plus a
//! boolean flag. Weights are fixed: stronger reversal signals (head and
//! shoulders) count more than continuation signals (flags). Both sides
//! normalize by the same weight sum, so bull and bear scores are directly
//! comparable and each stays in [0, 1].

use crate::detectors::helpers::clamp01;
use crate::features::{FeatureColumn, FeatureTable};
use crate::PatternKind;

/// Per-pattern weights on the bullish side.
pub const BULL_WEIGHTS: [(PatternKind, f64); 5] = [
    (PatternKind::DoubleBottom, 1.0),
    (PatternKind::HeadShouldersInv, 1.5),
    (PatternKind::FallingWedge, 0.8),
    (PatternKind::AscendingTriangle, 0.7),
    (PatternKind::BullFlag, 0.6),
];

/// Per-pattern weights on the bearish side. Mirrors [`BULL_WEIGHTS`] so the
/// two sides share one normalization constant.
pub const BEAR_WEIGHTS: [(PatternKind, f64); 5] = [
    (PatternKind::DoubleTop, 1.0),
    (PatternKind::HeadShoulders, 1.5),
    (PatternKind::RisingWedge, 0.8),
    (PatternKind::DescendingTriangle, 0.7),
    (PatternKind::BearFlag, 0.6),
];

/// Net strength below which a bar does not count as "patterned".
pub const HAS_PATTERN_THRESHOLD: f64 = 0.1;

/// Composite pattern scores of one bar.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompositeScore {
    /// Weighted bullish confidence in [0, 1]
    pub bull_score: f64,
    /// Weighted bearish confidence in [0, 1]
    pub bear_score: f64,
    /// `bull_score - bear_score`, in [-1, 1]
    pub net_score: f64,
    /// `max(bull_score, bear_score)`
    pub strength: f64,
    /// Whether `strength` clears [`HAS_PATTERN_THRESHOLD`]
    pub has_pattern: bool,
}

fn weight_sum(weights: &[(PatternKind, f64)]) -> f64 {
    weights.iter().map(|(_, w)| w).sum()
}

fn weighted_side(table: &FeatureTable, row: usize, weights: &[(PatternKind, f64)]) -> f64 {
    let total: f64 = weights
        .iter()
        .map(|&(kind, w)| clamp01(table.get(kind.into(), row)) * w)
        .sum();
    total / weight_sum(weights)
}

/// Compute the five composite columns from the pattern columns already in
/// `table`. Idempotent: re-running overwrites with the same values.
pub fn apply(table: &mut FeatureTable) {
    for row in 0..table.len() {
        let bull = weighted_side(table, row, &BULL_WEIGHTS);
        let bear = weighted_side(table, row, &BEAR_WEIGHTS);
        let strength = bull.max(bear);

        table.set(FeatureColumn::PatternBullScore, row, bull);
        table.set(FeatureColumn::PatternBearScore, row, bear);
        table.set(FeatureColumn::PatternNetScore, row, bull - bear);
        table.set(FeatureColumn::PatternStrength, row, strength);
        table.set(
            FeatureColumn::HasPattern,
            row,
            if strength > HAS_PATTERN_THRESHOLD { 1.0 } else { 0.0 },
        );
    }
}
