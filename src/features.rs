//! Column-oriented per-bar feature table
//!
//! Every detector and structure output lands in one [`FeatureTable`]: a dense
//! `f64` column per [`FeatureColumn`], one row per input bar. Boolean events
//! are encoded 1.0/0.0, confidences live in [0, 1], warmup rows are 0.0, and
//! every cell is finite for well-formed input.

use crate::aggregate::CompositeScore;
use crate::detectors::helpers::safe_div;
use crate::{PatternDetection, PatternKind};

// ============================================================
// COLUMN ENUM
// ============================================================

/// Every column the engine can emit, in table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureColumn {
    // Chart patterns (confidence in [0, 1])
    DoubleTop,
    DoubleTopNeckline,
    DoubleBottom,
    DoubleBottomNeckline,
    HeadShoulders,
    HeadShouldersInv,
    RisingWedge,
    FallingWedge,
    AscendingTriangle,
    DescendingTriangle,
    SymmetricalTriangle,
    BullFlag,
    BearFlag,
    // Composite pattern scores
    PatternBullScore,
    PatternBearScore,
    PatternNetScore,
    PatternStrength,
    HasPattern,
    // Order blocks
    OrderBlockBull,
    OrderBlockBear,
    TestingBullOb,
    TestingBearOb,
    // Wyckoff events and trading range position
    WyckoffSpring,
    WyckoffSpringConfirmed,
    WyckoffUpthrust,
    WyckoffUpthrustConfirmed,
    WyckoffRangePosition,
    IsDiscountZone,
    IsPremiumZone,
    IsEquilibrium,
    // Structure shifts
    ChochBull,
    ChochBear,
    TrendState,
    BosBull,
    BosBear,
    StructureDirection,
    // Liquidity pools
    LiquidityAboveCount,
    LiquidityBelowCount,
    DistToLiquidityAbove,
    DistToLiquidityBelow,
    LiquiditySweptAbove,
    LiquiditySweptBelow,
    // Fair value gaps
    FvgBull,
    FvgBear,
    FvgSize,
    FvgBullCount,
    FvgBearCount,
    FvgNetCount,
}

impl FeatureColumn {
    pub const COUNT: usize = 48;

    /// All columns, in table order.
    pub const ALL: [FeatureColumn; Self::COUNT] = [
        Self::DoubleTop,
        Self::DoubleTopNeckline,
        Self::DoubleBottom,
        Self::DoubleBottomNeckline,
        Self::HeadShoulders,
        Self::HeadShouldersInv,
        Self::RisingWedge,
        Self::FallingWedge,
        Self::AscendingTriangle,
        Self::DescendingTriangle,
        Self::SymmetricalTriangle,
        Self::BullFlag,
        Self::BearFlag,
        Self::PatternBullScore,
        Self::PatternBearScore,
        Self::PatternNetScore,
        Self::PatternStrength,
        Self::HasPattern,
        Self::OrderBlockBull,
        Self::OrderBlockBear,
        Self::TestingBullOb,
        Self::TestingBearOb,
        Self::WyckoffSpring,
        Self::WyckoffSpringConfirmed,
        Self::WyckoffUpthrust,
        Self::WyckoffUpthrustConfirmed,
        Self::WyckoffRangePosition,
        Self::IsDiscountZone,
        Self::IsPremiumZone,
        Self::IsEquilibrium,
        Self::ChochBull,
        Self::ChochBear,
        Self::TrendState,
        Self::BosBull,
        Self::BosBear,
        Self::StructureDirection,
        Self::LiquidityAboveCount,
        Self::LiquidityBelowCount,
        Self::DistToLiquidityAbove,
        Self::DistToLiquidityBelow,
        Self::LiquiditySweptAbove,
        Self::LiquiditySweptBelow,
        Self::FvgBull,
        Self::FvgBear,
        Self::FvgSize,
        Self::FvgBullCount,
        Self::FvgBearCount,
        Self::FvgNetCount,
    ];

    /// Stable snake_case column name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DoubleTop => "double_top",
            Self::DoubleTopNeckline => "double_top_neckline",
            Self::DoubleBottom => "double_bottom",
            Self::DoubleBottomNeckline => "double_bottom_neckline",
            Self::HeadShoulders => "head_shoulders",
            Self::HeadShouldersInv => "head_shoulders_inv",
            Self::RisingWedge => "rising_wedge",
            Self::FallingWedge => "falling_wedge",
            Self::AscendingTriangle => "ascending_triangle",
            Self::DescendingTriangle => "descending_triangle",
            Self::SymmetricalTriangle => "symmetrical_triangle",
            Self::BullFlag => "bull_flag",
            Self::BearFlag => "bear_flag",
            Self::PatternBullScore => "pattern_bull_score",
            Self::PatternBearScore => "pattern_bear_score",
            Self::PatternNetScore => "pattern_net_score",
            Self::PatternStrength => "pattern_strength",
            Self::HasPattern => "has_pattern",
            Self::OrderBlockBull => "order_block_bull",
            Self::OrderBlockBear => "order_block_bear",
            Self::TestingBullOb => "testing_bull_ob",
            Self::TestingBearOb => "testing_bear_ob",
            Self::WyckoffSpring => "wyckoff_spring",
            Self::WyckoffSpringConfirmed => "wyckoff_spring_confirmed",
            Self::WyckoffUpthrust => "wyckoff_upthrust",
            Self::WyckoffUpthrustConfirmed => "wyckoff_upthrust_confirmed",
            Self::WyckoffRangePosition => "wyckoff_range_position",
            Self::IsDiscountZone => "is_discount_zone",
            Self::IsPremiumZone => "is_premium_zone",
            Self::IsEquilibrium => "is_equilibrium",
            Self::ChochBull => "choch_bull",
            Self::ChochBear => "choch_bear",
            Self::TrendState => "trend_state",
            Self::BosBull => "bos_bull",
            Self::BosBear => "bos_bear",
            Self::StructureDirection => "structure_direction",
            Self::LiquidityAboveCount => "liquidity_above_count",
            Self::LiquidityBelowCount => "liquidity_below_count",
            Self::DistToLiquidityAbove => "dist_to_liquidity_above",
            Self::DistToLiquidityBelow => "dist_to_liquidity_below",
            Self::LiquiditySweptAbove => "liquidity_swept_above",
            Self::LiquiditySweptBelow => "liquidity_swept_below",
            Self::FvgBull => "fvg_bull",
            Self::FvgBear => "fvg_bear",
            Self::FvgSize => "fvg_size",
            Self::FvgBullCount => "fvg_bull_count",
            Self::FvgBearCount => "fvg_bear_count",
            Self::FvgNetCount => "fvg_net_count",
        }
    }

    #[inline]
    fn idx(self) -> usize {
        self as usize
    }
}

impl From<PatternKind> for FeatureColumn {
    fn from(kind: PatternKind) -> Self {
        match kind {
            PatternKind::DoubleTop => Self::DoubleTop,
            PatternKind::DoubleBottom => Self::DoubleBottom,
            PatternKind::HeadShoulders => Self::HeadShoulders,
            PatternKind::HeadShouldersInv => Self::HeadShouldersInv,
            PatternKind::RisingWedge => Self::RisingWedge,
            PatternKind::FallingWedge => Self::FallingWedge,
            PatternKind::AscendingTriangle => Self::AscendingTriangle,
            PatternKind::DescendingTriangle => Self::DescendingTriangle,
            PatternKind::SymmetricalTriangle => Self::SymmetricalTriangle,
            PatternKind::BullFlag => Self::BullFlag,
            PatternKind::BearFlag => Self::BearFlag,
        }
    }
}

// ============================================================
// FEATURE TABLE
// ============================================================

/// Dense column store, one `f64` column per [`FeatureColumn`].
#[derive(Debug, Clone)]
pub struct FeatureTable {
    len: usize,
    data: Vec<Vec<f64>>,
}

impl FeatureTable {
    /// All-zero table for `len` bars.
    pub fn zeros(len: usize) -> Self {
        Self {
            len,
            data: vec![vec![0.0; len]; FeatureColumn::COUNT],
        }
    }

    /// Number of rows (bars).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read-only view of one column.
    pub fn column(&self, col: FeatureColumn) -> &[f64] {
        &self.data[col.idx()]
    }

    /// Mutable view of one column.
    pub fn column_mut(&mut self, col: FeatureColumn) -> &mut [f64] {
        &mut self.data[col.idx()]
    }

    #[inline]
    pub fn get(&self, col: FeatureColumn, row: usize) -> f64 {
        self.data[col.idx()][row]
    }

    #[inline]
    pub fn set(&mut self, col: FeatureColumn, row: usize, value: f64) {
        self.data[col.idx()][row] = value;
    }

    /// Write `value` only if it exceeds the current cell. Overlapping
    /// detections of the same kind on one bar keep the strongest, and the
    /// result is independent of write order.
    #[inline]
    pub fn set_max(&mut self, col: FeatureColumn, row: usize, value: f64) {
        let cell = &mut self.data[col.idx()][row];
        if value > *cell {
            *cell = value;
        }
    }

    /// Iterate `(column, values)` pairs in table order.
    pub fn iter_columns(&self) -> impl Iterator<Item = (FeatureColumn, &[f64])> {
        FeatureColumn::ALL
            .iter()
            .map(move |&col| (col, self.column(col)))
    }

    /// Composite pattern scores at one row.
    pub fn composite(&self, row: usize) -> CompositeScore {
        CompositeScore {
            bull_score: self.get(FeatureColumn::PatternBullScore, row),
            bear_score: self.get(FeatureColumn::PatternBearScore, row),
            net_score: self.get(FeatureColumn::PatternNetScore, row),
            strength: self.get(FeatureColumn::PatternStrength, row),
            has_pattern: self.get(FeatureColumn::HasPattern, row) != 0.0,
        }
    }

    /// Write pattern detections into their columns.
    ///
    /// Confidence goes to the pattern's own column via [`set_max`]; double
    /// top/bottom necklines additionally land in the paired neckline column,
    /// normalized by the emitting bar's close.
    ///
    /// [`set_max`]: FeatureTable::set_max
    pub fn apply_detections(&mut self, detections: &[PatternDetection], closes: &[f64]) {
        for det in detections {
            if det.index >= self.len {
                continue;
            }
            self.set_max(det.pattern.into(), det.index, det.confidence);

            let neckline_col = match det.pattern {
                PatternKind::DoubleTop => Some(FeatureColumn::DoubleTopNeckline),
                PatternKind::DoubleBottom => Some(FeatureColumn::DoubleBottomNeckline),
                _ => None,
            };
            if let (Some(col), Some(neckline)) = (neckline_col, det.neckline) {
                let relative = safe_div(neckline, closes[det.index]);
                self.set_max(col, det.index, relative);
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Direction;

    #[test]
    fn test_all_covers_every_discriminant_once() {
        let mut seen = std::collections::HashSet::new();
        for col in FeatureColumn::ALL {
            assert!(seen.insert(col), "duplicate column {:?}", col);
        }
        assert_eq!(seen.len(), FeatureColumn::COUNT);
        // Discriminants match positions, so `idx` is a valid index
        for (i, col) in FeatureColumn::ALL.iter().enumerate() {
            assert_eq!(col.idx(), i);
        }
    }

    #[test]
    fn test_names_are_unique_snake_case() {
        let mut seen = std::collections::HashSet::new();
        for col in FeatureColumn::ALL {
            let name = col.name();
            assert!(seen.insert(name), "duplicate name {name}");
            assert!(name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
        }
    }

    #[test]
    fn test_serde_name_matches_column_name() {
        for col in FeatureColumn::ALL {
            let json = serde_json::to_string(&col).unwrap();
            assert_eq!(json, format!("\"{}\"", col.name()));
        }
    }

    #[test]
    fn test_zeros_and_set_max() {
        let mut table = FeatureTable::zeros(10);
        assert_eq!(table.len(), 10);
        assert!(table.iter_columns().all(|(_, c)| c.iter().all(|&v| v == 0.0)));

        table.set_max(FeatureColumn::DoubleTop, 4, 0.6);
        table.set_max(FeatureColumn::DoubleTop, 4, 0.3);
        assert_eq!(table.get(FeatureColumn::DoubleTop, 4), 0.6);
        table.set_max(FeatureColumn::DoubleTop, 4, 0.9);
        assert_eq!(table.get(FeatureColumn::DoubleTop, 4), 0.9);
    }

    #[test]
    fn test_apply_detections_writes_neckline() {
        let mut table = FeatureTable::zeros(6);
        let closes = [100.0; 6];
        let detections = [PatternDetection {
            index: 5,
            pattern: PatternKind::DoubleTop,
            direction: Direction::Bearish,
            confidence: 0.8,
            neckline: Some(95.0),
        }];
        table.apply_detections(&detections, &closes);
        assert_eq!(table.get(FeatureColumn::DoubleTop, 5), 0.8);
        assert!((table.get(FeatureColumn::DoubleTopNeckline, 5) - 0.95).abs() < 1e-12);
    }

    #[test]
    fn test_apply_detections_ignores_out_of_range() {
        let mut table = FeatureTable::zeros(3);
        let closes = [100.0; 3];
        let detections = [PatternDetection {
            index: 7,
            pattern: PatternKind::BullFlag,
            direction: Direction::Bullish,
            confidence: 0.5,
            neckline: None,
        }];
        table.apply_detections(&detections, &closes);
        assert!(table.column(FeatureColumn::BullFlag).iter().all(|&v| v == 0.0));
    }
}
