//! # chartscan - Chart Pattern & Market Structure Detection
//!
//! Geometric chart-pattern recognition (double top/bottom, head-and-shoulders,
//! wedges, triangles, flags) and Smart-Money-Concepts structure detection
//! (order blocks, Wyckoff spring/upthrust, change-of-character, liquidity
//! pools) over OHLCV series, producing a strongly-typed per-bar feature table
//! for downstream ML / rule-engine consumers.
//!
//! All detectors are pure functions of an immutable bar sequence and respect a
//! strict no-lookahead contract: a value reported at bar `i` never changes once
//! the detector's confirmation horizon past `i` has closed.
//!
//! ## Quick Start
//!
//! ```rust
//! use chartscan::prelude::*;
//!
//! struct Bar { o: f64, h: f64, l: f64, c: f64, v: f64 }
//!
//! impl OHLCV for Bar {
//!     fn open(&self) -> f64 { self.o }
//!     fn high(&self) -> f64 { self.h }
//!     fn low(&self) -> f64 { self.l }
//!     fn close(&self) -> f64 { self.c }
//!     fn volume(&self) -> f64 { self.v }
//! }
//!
//! let engine = EngineBuilder::new()
//!     .with_all_defaults()
//!     .build()
//!     .unwrap();
//!
//! let bars: Vec<Bar> = vec![];
//! let features = engine.scan(&bars).unwrap();
//! assert!(features.is_empty());
//! ```

pub mod aggregate;
pub mod cache;
pub mod detectors;
pub mod features;
pub mod params;
pub mod structure;
pub mod swing;

pub mod prelude {
    pub use crate::{
        // Aggregator
        aggregate::CompositeScore,
        // Cache
        cache::{Clock, SystemClock, TtlCache},
        // Detectors
        detectors::*,
        // Feature table
        features::{FeatureColumn, FeatureTable},
        // Parameters
        params::{get_period, get_ratio, ParamMeta, ParamType, ParameterizedDetector},
        // Structure detector
        structure::StructureConfig,
        // Swings
        swing::{extract_swings, SwingKind, SwingPoint, SwingSeries},
        // Parallel
        scan_parallel,
        // Engine
        BuiltinDetector,
        Direction,
        EngineBuilder,
        FeatureEngine,
        OHLCVExt,
        PatternDetection,
        PatternDetector,
        // Errors
        PatternError,
        PatternKind,
        Period,
        Ratio,
        Result,
        ScanError,
        ScanResult,
        OHLCV,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, PatternError>;

/// Errors that can occur during feature computation.
///
/// The detection core is total over well-formed input: short history and
/// degenerate (zero-range) windows produce neutral feature values, never
/// errors. Only misuse - malformed bars, unordered timestamps, invalid
/// configuration - is rejected, and rejected immediately.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PatternError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: &'static str },

    #[error("Bars not sorted by time: timestamp at index {index} does not increase")]
    UnorderedBars { index: usize },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0 (tolerances, thresholds)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(PatternError::InvalidValue(
                "Ratio cannot be NaN or infinite",
            ));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(PatternError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    /// Create a Ratio from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Window length in bars (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(PatternError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;

    fn timestamp(&self) -> Option<i64> {
        None
    }
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Validate OHLCV data consistency
    fn validate(&self) -> Result<()> {
        if self.high() < self.low() {
            return Err(PatternError::InvalidBar {
                index: 0,
                reason: "high < low",
            });
        }
        let values = [
            self.open(),
            self.high(),
            self.low(),
            self.close(),
            self.volume(),
        ];
        if values.iter().any(|v| v.is_nan()) {
            return Err(PatternError::InvalidBar {
                index: 0,
                reason: "NaN in OHLCV",
            });
        }
        if values.iter().any(|v| v.is_infinite()) {
            return Err(PatternError::InvalidBar {
                index: 0,
                reason: "Infinite value in OHLCV",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

// ============================================================
// PATTERN TYPES
// ============================================================

/// Directional bias of a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Bullish,
    Neutral,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }
}

/// Every chart pattern the builtin matchers can emit.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    DoubleTop,
    DoubleBottom,
    HeadShoulders,
    HeadShouldersInv,
    RisingWedge,
    FallingWedge,
    AscendingTriangle,
    DescendingTriangle,
    SymmetricalTriangle,
    BullFlag,
    BearFlag,
}

impl PatternKind {
    pub const ALL: [PatternKind; 11] = [
        PatternKind::DoubleTop,
        PatternKind::DoubleBottom,
        PatternKind::HeadShoulders,
        PatternKind::HeadShouldersInv,
        PatternKind::RisingWedge,
        PatternKind::FallingWedge,
        PatternKind::AscendingTriangle,
        PatternKind::DescendingTriangle,
        PatternKind::SymmetricalTriangle,
        PatternKind::BullFlag,
        PatternKind::BearFlag,
    ];

    /// Stable snake_case name, matching the feature column it feeds.
    pub fn name(self) -> &'static str {
        match self {
            PatternKind::DoubleTop => "double_top",
            PatternKind::DoubleBottom => "double_bottom",
            PatternKind::HeadShoulders => "head_shoulders",
            PatternKind::HeadShouldersInv => "head_shoulders_inv",
            PatternKind::RisingWedge => "rising_wedge",
            PatternKind::FallingWedge => "falling_wedge",
            PatternKind::AscendingTriangle => "ascending_triangle",
            PatternKind::DescendingTriangle => "descending_triangle",
            PatternKind::SymmetricalTriangle => "symmetrical_triangle",
            PatternKind::BullFlag => "bull_flag",
            PatternKind::BearFlag => "bear_flag",
        }
    }

    /// Typical direction the pattern resolves toward.
    pub fn direction(self) -> Direction {
        match self {
            PatternKind::DoubleBottom
            | PatternKind::HeadShouldersInv
            | PatternKind::FallingWedge
            | PatternKind::AscendingTriangle
            | PatternKind::BullFlag => Direction::Bullish,
            PatternKind::DoubleTop
            | PatternKind::HeadShoulders
            | PatternKind::RisingWedge
            | PatternKind::DescendingTriangle
            | PatternKind::BearFlag => Direction::Bearish,
            PatternKind::SymmetricalTriangle => Direction::Neutral,
        }
    }
}

/// A single pattern occurrence, written at its confirmation bar.
///
/// `index` is the first bar at which the pattern is fully confirmable: the
/// last swing's confirmation bar for swing-based matchers, the current bar for
/// rolling-window matchers. It is never earlier than any data the detection
/// used.
#[derive(Debug, Clone, Copy)]
pub struct PatternDetection {
    pub index: usize,
    pub pattern: PatternKind,
    pub direction: Direction,
    /// Confidence score 0.0..=1.0
    pub confidence: f64,
    /// Neckline price for double top/bottom and head-and-shoulders patterns
    pub neckline: Option<f64>,
}

// ============================================================
// PATTERN DETECTOR TRAIT
// ============================================================

/// A whole-series chart-pattern matcher.
///
/// Detectors are pure: the same `(bars, swings)` input always yields the same
/// detections, and no detector reads another detector's output. This is what
/// lets the engine run them in parallel without coordination.
pub trait PatternDetector: Send + Sync {
    /// Short identifier for diagnostics and parameter metadata.
    fn name(&self) -> &'static str;

    /// The pattern kinds this matcher can emit.
    fn kinds(&self) -> &'static [PatternKind];

    /// Minimum history length; shorter input yields no detections (not an error).
    fn min_bars(&self) -> usize;

    fn detect<T: OHLCV>(&self, bars: &[T], swings: &swing::SwingSeries)
        -> Vec<PatternDetection>;

    fn validate_config(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================
// BUILTIN DETECTORS - generated via macro
// ============================================================

use detectors::*;

/// Macro to generate BuiltinDetector enum without boilerplate
macro_rules! define_builtin_detectors {
    (
        $(
            $variant:ident($detector:ty)
        ),* $(,)?
    ) => {
        /// All builtin matchers - fast path via enum dispatch
        #[derive(Debug, Clone)]
        pub enum BuiltinDetector {
            $($variant($detector)),*
        }

        impl BuiltinDetector {
            #[inline]
            pub fn detect<T: OHLCV>(
                &self,
                bars: &[T],
                swings: &swing::SwingSeries,
            ) -> Vec<PatternDetection> {
                match self {
                    $(Self::$variant(d) => PatternDetector::detect(d, bars, swings)),*
                }
            }

            #[inline]
            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant(d) => PatternDetector::name(d)),*
                }
            }

            #[inline]
            pub fn kinds(&self) -> &'static [PatternKind] {
                match self {
                    $(Self::$variant(d) => PatternDetector::kinds(d)),*
                }
            }

            #[inline]
            pub fn min_bars(&self) -> usize {
                match self {
                    $(Self::$variant(d) => PatternDetector::min_bars(d)),*
                }
            }

            pub fn validate_config(&self) -> Result<()> {
                match self {
                    $(Self::$variant(d) => PatternDetector::validate_config(d)),*
                }
            }
        }
    };
}

define_builtin_detectors! {
    DoubleTop(DoubleTopDetector),
    DoubleBottom(DoubleBottomDetector),
    HeadShoulders(HeadShouldersDetector),
    Wedge(WedgeDetector),
    Triangle(TriangleDetector),
    Flag(FlagDetector),
}

// ============================================================
// FEATURE ENGINE
// ============================================================

/// Main detection engine: swing extraction + chart-pattern matchers +
/// structure detector + aggregation, merged into one [`features::FeatureTable`].
pub struct FeatureEngine {
    swing_order: Period,
    detectors: Vec<BuiltinDetector>,
    structure: Option<structure::StructureConfig>,
}

impl FeatureEngine {
    /// Half-window radius used for swing confirmation.
    #[inline]
    pub fn swing_order(&self) -> usize {
        self.swing_order.get()
    }

    /// Scan a bar series into a complete feature table.
    ///
    /// Bars are always validated: NaN/infinite values, `high < low`, and
    /// non-increasing timestamps are rejected up front rather than silently
    /// producing wrong detections.
    pub fn scan<T: OHLCV + Sync>(&self, bars: &[T]) -> Result<features::FeatureTable> {
        self.validate_bars(bars)?;

        let swings = swing::extract_swings(bars, self.swing_order.get());

        let (detections, structure_part) = rayon::join(
            || self.run_detectors(bars, &swings),
            || {
                self.structure
                    .as_ref()
                    .map(|cfg| structure::compute(bars, cfg))
            },
        );

        let mut table = match structure_part {
            Some(part) => part,
            None => features::FeatureTable::zeros(bars.len()),
        };

        let closes: Vec<f64> = bars.iter().map(|b| b.close()).collect();
        table.apply_detections(&detections, &closes);
        aggregate::apply(&mut table);

        Ok(table)
    }

    /// Scan and return the raw pattern detections, sorted by bar index.
    ///
    /// Structure features are not computed; use [`FeatureEngine::scan`] for
    /// the full table.
    pub fn scan_detections<T: OHLCV + Sync>(&self, bars: &[T]) -> Result<Vec<PatternDetection>> {
        self.validate_bars(bars)?;
        let swings = swing::extract_swings(bars, self.swing_order.get());
        Ok(self.run_detectors(bars, &swings))
    }

    fn run_detectors<T: OHLCV + Sync>(
        &self,
        bars: &[T],
        swings: &swing::SwingSeries,
    ) -> Vec<PatternDetection> {
        let mut detections: Vec<PatternDetection> = self
            .detectors
            .par_iter()
            .flat_map_iter(|d| d.detect(bars, swings))
            .collect();
        // Deterministic output regardless of scheduling
        detections.sort_by_key(|d| (d.index, d.pattern));
        detections
    }

    fn validate_bars<T: OHLCV>(&self, bars: &[T]) -> Result<()> {
        let mut prev_ts: Option<i64> = None;
        for (i, bar) in bars.iter().enumerate() {
            bar.validate().map_err(|e| match e {
                PatternError::InvalidBar { reason, .. } => {
                    PatternError::InvalidBar { index: i, reason }
                }
                other => other,
            })?;
            if let Some(ts) = bar.timestamp() {
                if let Some(prev) = prev_ts {
                    if ts <= prev {
                        return Err(PatternError::UnorderedBars { index: i });
                    }
                }
                prev_ts = Some(ts);
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for d in &self.detectors {
            d.validate_config()?;
        }
        if let Some(cfg) = &self.structure {
            cfg.validate()?;
        }
        Ok(())
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for [`FeatureEngine`] instances.
///
/// The enabled detector set is resolved here, once, and validated at
/// [`EngineBuilder::build`]; configuration conflicts fail fast instead of
/// surfacing mid-scan.
pub struct EngineBuilder {
    swing_order: Period,
    detectors: Vec<BuiltinDetector>,
    structure: Option<structure::StructureConfig>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate an array of `BuiltinDetector` variants using `Default::default()`.
macro_rules! builtin_defaults {
  ($($variant:ident),* $(,)?) => {
    [$(BuiltinDetector::$variant(Default::default())),*]
  };
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            swing_order: Period::new_const(5),
            detectors: Vec::new(),
            structure: None,
        }
    }

    /// Enable every builtin chart-pattern matcher and the structure detector
    /// with default parameters.
    pub fn with_all_defaults(self) -> Self {
        self.with_chart_defaults().with_structure_defaults()
    }

    /// Enable the six builtin chart-pattern matchers with defaults.
    pub fn with_chart_defaults(mut self) -> Self {
        self.detectors.extend(builtin_defaults![
            DoubleTop,
            DoubleBottom,
            HeadShoulders,
            Wedge,
            Triangle,
            Flag,
        ]);
        self
    }

    /// Enable the structure/SMC detector with defaults.
    pub fn with_structure_defaults(mut self) -> Self {
        self.structure = Some(structure::StructureConfig::default());
        self
    }

    /// Set the swing half-window radius (default 5).
    pub fn swing_order(mut self, order: Period) -> Self {
        self.swing_order = order;
        self
    }

    /// Add a chart-pattern matcher.
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, detector: BuiltinDetector) -> Self {
        self.detectors.push(detector);
        self
    }

    /// Enable the structure detector with explicit configuration.
    pub fn structure(mut self, config: structure::StructureConfig) -> Self {
        self.structure = Some(config);
        self
    }

    /// Build the engine, validating the full configuration.
    pub fn build(self) -> Result<FeatureEngine> {
        let engine = FeatureEngine {
            swing_order: self.swing_order,
            detectors: self.detectors,
            structure: self.structure,
        };
        engine.validate()?;
        Ok(engine)
    }
}

// ============================================================
// PARALLEL SCANNING
// ============================================================

use rayon::prelude::*;

/// Result of scanning a single instrument
#[derive(Debug)]
pub struct ScanResult {
    pub symbol: String,
    pub features: features::FeatureTable,
}

/// Error from scanning a single instrument
#[derive(Debug)]
pub struct ScanError {
    pub symbol: String,
    pub error: PatternError,
}

/// Parallel scanning of multiple instruments
pub fn scan_parallel<'a, T, I>(
    engine: &FeatureEngine,
    instruments: I,
) -> (Vec<ScanResult>, Vec<ScanError>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            engine
                .scan(bars)
                .map(|features| ScanResult {
                    symbol: symbol.to_string(),
                    features,
                })
                .map_err(|error| ScanError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureColumn;

    /// Test OHLCV bar
    #[derive(Debug, Clone)]
    struct Bar {
        o: f64,
        h: f64,
        l: f64,
        c: f64,
        v: f64,
        t: Option<i64>,
    }

    impl Bar {
        fn new(o: f64, h: f64, l: f64, c: f64) -> Self {
            Self {
                o,
                h,
                l,
                c,
                v: 1000.0,
                t: None,
            }
        }

        fn at(mut self, ts: i64) -> Self {
            self.t = Some(ts);
            self
        }
    }

    impl OHLCV for Bar {
        fn open(&self) -> f64 {
            self.o
        }

        fn high(&self) -> f64 {
            self.h
        }

        fn low(&self) -> f64 {
            self.l
        }

        fn close(&self) -> f64 {
            self.c
        }

        fn volume(&self) -> f64 {
            self.v
        }

        fn timestamp(&self) -> Option<i64> {
            self.t
        }
    }

    fn make_flat(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|_| Bar::new(100.0, 100.0, 100.0, 100.0))
            .collect()
    }

    #[test]
    fn test_ratio_validation() {
        assert!(Ratio::new(0.0).is_ok());
        assert!(Ratio::new(1.0).is_ok());
        assert!(Ratio::new(0.02).is_ok());
        assert!(Ratio::new(-0.1).is_err());
        assert!(Ratio::new(1.1).is_err());
        assert!(Ratio::new(f64::NAN).is_err());
        assert!(Ratio::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_period_validation() {
        assert!(Period::new(1).is_ok());
        assert!(Period::new(50).is_ok());
        assert!(Period::new(0).is_err());
    }

    #[test]
    fn test_ohlcv_ext() {
        let bar = Bar::new(100.0, 110.0, 90.0, 105.0);
        assert_eq!(bar.body(), 5.0);
        assert_eq!(bar.range(), 20.0);
        assert!(bar.is_bullish());
        assert!(!bar.is_bearish());
    }

    #[test]
    fn test_engine_builder() {
        let engine = EngineBuilder::new().with_all_defaults().build();
        assert!(engine.is_ok());
    }

    #[test]
    fn test_empty_scan() {
        let engine = EngineBuilder::new().with_all_defaults().build().unwrap();
        let bars: Vec<Bar> = vec![];
        let table = engine.scan(&bars).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_short_history_is_not_an_error() {
        let engine = EngineBuilder::new().with_all_defaults().build().unwrap();
        let bars = make_flat(10);
        let table = engine.scan(&bars).unwrap();
        assert_eq!(table.len(), 10);
        for kind in PatternKind::ALL {
            let col = table.column(FeatureColumn::from(kind));
            assert!(col.iter().all(|&v| v == 0.0), "{}", kind.name());
        }
    }

    #[test]
    fn test_nan_bar_rejected() {
        let engine = EngineBuilder::new().with_all_defaults().build().unwrap();
        let mut bars = make_flat(5);
        bars[3].c = f64::NAN;
        let err = engine.scan(&bars).unwrap_err();
        assert!(matches!(err, PatternError::InvalidBar { index: 3, .. }));
    }

    #[test]
    fn test_unordered_bars_rejected() {
        let engine = EngineBuilder::new().with_all_defaults().build().unwrap();
        let bars = vec![
            Bar::new(100.0, 101.0, 99.0, 100.0).at(100),
            Bar::new(100.0, 101.0, 99.0, 100.0).at(200),
            Bar::new(100.0, 101.0, 99.0, 100.0).at(150),
        ];
        let err = engine.scan(&bars).unwrap_err();
        assert!(matches!(err, PatternError::UnorderedBars { index: 2 }));
    }

    #[test]
    fn test_pattern_kind_names_match_columns() {
        for kind in PatternKind::ALL {
            assert_eq!(kind.name(), FeatureColumn::from(kind).name());
        }
    }

    #[test]
    fn test_scan_detections_sorted() {
        let engine = EngineBuilder::new().with_chart_defaults().build().unwrap();
        // Deterministic wavy series long enough for the regression matchers
        let bars: Vec<Bar> = (0..200)
            .map(|i| {
                let base = 100.0 + (i as f64 * 0.35).sin() * 5.0 + i as f64 * 0.05;
                Bar::new(base, base + 0.8, base - 0.8, base + 0.2)
            })
            .collect();
        let detections = engine.scan_detections(&bars).unwrap();
        assert!(detections.windows(2).all(|w| w[0].index <= w[1].index));
        assert!(detections
            .iter()
            .all(|d| (0.0..=1.0).contains(&d.confidence)));
    }

    #[test]
    fn test_parallel_scan() {
        let engine = EngineBuilder::new().with_all_defaults().build().unwrap();

        let bars1 = make_flat(60);
        let bars2 = make_flat(80);
        let instruments: Vec<(&str, &[Bar])> = vec![("BTC/USDT", &bars1), ("ETH/USDT", &bars2)];

        let (results, errors) = scan_parallel(&engine, instruments);
        assert_eq!(results.len(), 2);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_scan_is_deterministic() {
        let engine = EngineBuilder::new().with_all_defaults().build().unwrap();
        let bars: Vec<Bar> = (0..300)
            .map(|i| {
                let base = 100.0 + (i as f64 * 0.21).sin() * 4.0;
                Bar::new(base, base + 1.0, base - 1.0, base + 0.3)
            })
            .collect();

        let a = engine.scan(&bars).unwrap();
        let b = engine.scan(&bars).unwrap();
        for (col, values) in a.iter_columns() {
            assert_eq!(values, b.column(col), "{}", col.name());
        }
    }
}
