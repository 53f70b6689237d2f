//! Market-structure detector
//!
//! Price-and-volume structure signals computed bar by bar: order blocks,
//! Wyckoff spring/upthrust inside a trading range, change-of-character and
//! break-of-structure shifts, liquidity pools, and fair value gaps. All
//! outputs land in the shared [`FeatureTable`]; warmup bars stay 0.0.
//!
//! Every signal at bar `i` reads only bars `<= i`, with one deliberate
//! exception: a confirmed order block writes its marker back onto the
//! marking candle, three bars before the confirming displacement.

use crate::detectors::helpers::{clamp01, max_of, mean, min_of, pct_change, safe_div, EPS};
use crate::features::{FeatureColumn, FeatureTable};
use crate::{OHLCVExt, PatternError, Period, Ratio, Result, OHLCV};

/// Bars between an order block's marking candle and its confirming close.
const DISPLACEMENT_SPAN: usize = 3;

/// Trailing window for fair-value-gap counts.
const FVG_COUNT_WINDOW: usize = 20;

// ============================================================
// CONFIGURATION
// ============================================================

/// Order block parameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OrderBlockParams {
    /// Minimum relative displacement over [`DISPLACEMENT_SPAN`] bars
    pub displacement: Ratio,
}

impl Default for OrderBlockParams {
    fn default() -> Self {
        Self {
            displacement: Ratio::new_const(0.02),
        }
    }
}

/// Volume classification thresholds, as multiples of average volume.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct VolumeThresholds {
    pub low: f64,
    pub elevated: f64,
    pub high: f64,
    pub climactic: f64,
}

impl Default for VolumeThresholds {
    fn default() -> Self {
        Self {
            low: 0.7,
            elevated: 1.5,
            high: 2.0,
            climactic: 2.5,
        }
    }
}

impl VolumeThresholds {
    fn validate(&self) -> Result<()> {
        let ordered = [self.low, self.elevated, self.high, self.climactic];
        if ordered.iter().any(|t| !t.is_finite() || *t <= 0.0) {
            return Err(PatternError::InvalidConfig(
                "volume thresholds must be finite and positive".into(),
            ));
        }
        if !(self.low < self.elevated && self.elevated < self.high && self.high < self.climactic) {
            return Err(PatternError::InvalidConfig(
                "volume thresholds must be strictly increasing".into(),
            ));
        }
        Ok(())
    }
}

/// Wyckoff spring/upthrust parameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WyckoffParams {
    /// Trading-range window (prior bars, excluding the current one)
    pub range_lookback: Period,
    /// Average-volume window
    pub volume_period: Period,
    /// Thresholds for the volume confirmation
    pub thresholds: VolumeThresholds,
}

impl Default for WyckoffParams {
    fn default() -> Self {
        Self {
            range_lookback: Period::new_const(50),
            volume_period: Period::new_const(20),
            thresholds: VolumeThresholds::default(),
        }
    }
}

/// Change-of-character parameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChochParams {
    /// Rolling swing window; the comparison shift is half this
    pub length: Period,
}

impl Default for ChochParams {
    fn default() -> Self {
        Self {
            length: Period::new_const(20),
        }
    }
}

/// Liquidity pool parameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct LiquidityParams {
    /// Trailing window the pools are measured over
    pub lookback: Period,
    /// Relative tolerance for "equal" highs/lows
    pub tolerance: Ratio,
}

impl Default for LiquidityParams {
    fn default() -> Self {
        Self {
            lookback: Period::new_const(50),
            tolerance: Ratio::new_const(0.002),
        }
    }
}

/// Break-of-structure parameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BosParams {
    /// Rolling extremum window
    pub length: Period,
}

impl Default for BosParams {
    fn default() -> Self {
        Self {
            length: Period::new_const(50),
        }
    }
}

/// Full structure-detector configuration.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    pub order_blocks: OrderBlockParams,
    pub wyckoff: WyckoffParams,
    pub choch: ChochParams,
    pub liquidity: LiquidityParams,
    pub bos: BosParams,
}

impl StructureConfig {
    /// Validate cross-field constraints. The newtype fields are already
    /// range-checked on construction.
    pub fn validate(&self) -> Result<()> {
        self.wyckoff.thresholds.validate()?;
        if self.wyckoff.volume_period.get() > self.wyckoff.range_lookback.get() {
            return Err(PatternError::InvalidConfig(
                "volume_period must not exceed range_lookback".into(),
            ));
        }
        Ok(())
    }
}

// ============================================================
// SERIES SCRATCH
// ============================================================

/// Pre-extracted price/volume series shared by all passes.
struct Series {
    highs: Vec<f64>,
    lows: Vec<f64>,
    closes: Vec<f64>,
    volumes: Vec<f64>,
    bullish: Vec<bool>,
    bearish: Vec<bool>,
}

impl Series {
    fn from_bars<T: OHLCV>(bars: &[T]) -> Self {
        Self {
            highs: bars.iter().map(OHLCV::high).collect(),
            lows: bars.iter().map(OHLCV::low).collect(),
            closes: bars.iter().map(OHLCV::close).collect(),
            volumes: bars.iter().map(OHLCV::volume).collect(),
            bullish: bars.iter().map(OHLCVExt::is_bullish).collect(),
            bearish: bars.iter().map(OHLCVExt::is_bearish).collect(),
        }
    }

    fn len(&self) -> usize {
        self.closes.len()
    }
}

/// Rolling max over the trailing `window` bars ending at each index
/// (inclusive). Warmup indices hold NaN, which keeps every comparison
/// against them false.
fn rolling_max(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    for i in (window - 1)..values.len() {
        out[i] = max_of(&values[i + 1 - window..=i]);
    }
    out
}

fn rolling_min(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    for i in (window - 1)..values.len() {
        out[i] = min_of(&values[i + 1 - window..=i]);
    }
    out
}

// ============================================================
// COMPUTE
// ============================================================

/// Run the full structure detector over a bar series.
pub fn compute<T: OHLCV>(bars: &[T], cfg: &StructureConfig) -> FeatureTable {
    let series = Series::from_bars(bars);
    let mut table = FeatureTable::zeros(series.len());

    order_blocks(&series, &cfg.order_blocks, &mut table);
    wyckoff(&series, &cfg.wyckoff, &mut table);
    choch(&series, &cfg.choch, &mut table);
    liquidity(&series, &cfg.liquidity, &mut table);
    bos_structure(&series, &cfg.bos, &mut table);
    fair_value_gaps(&series, &mut table);

    table
}

// ============================================================
// ORDER BLOCKS
// ============================================================

/// Last candle against a displacement move.
///
/// A bullish order block is a bearish candle followed within
/// [`DISPLACEMENT_SPAN`] bars by a close at least `displacement` above its
/// close. The marker is written on the candle itself once the displacement
/// bar confirms it; the candle's high/low become the active zone, and later
/// bars that trade back into the zone set the testing flag.
fn order_blocks(series: &Series, params: &OrderBlockParams, table: &mut FeatureTable) {
    let n = series.len();
    let displacement = params.displacement.get();

    // (zone_high, zone_low) of the most recent confirmed block per side
    let mut bull_zone: Option<(f64, f64)> = None;
    let mut bear_zone: Option<(f64, f64)> = None;

    for i in DISPLACEMENT_SPAN..n {
        // Test against zones confirmed strictly before this bar
        if let Some((zone_high, zone_low)) = bull_zone {
            if series.lows[i] <= zone_high && series.closes[i] >= zone_low {
                table.set(FeatureColumn::TestingBullOb, i, 1.0);
            }
        }
        if let Some((zone_high, zone_low)) = bear_zone {
            if series.highs[i] >= zone_low && series.closes[i] <= zone_high {
                table.set(FeatureColumn::TestingBearOb, i, 1.0);
            }
        }

        let mark = i - DISPLACEMENT_SPAN;
        let change = pct_change(series.closes[i], series.closes[mark]);

        if change >= displacement && series.bearish[mark] {
            table.set(FeatureColumn::OrderBlockBull, mark, 1.0);
            bull_zone = Some((series.highs[mark], series.lows[mark]));
        } else if change <= -displacement && series.bullish[mark] {
            table.set(FeatureColumn::OrderBlockBear, mark, 1.0);
            bear_zone = Some((series.highs[mark], series.lows[mark]));
        }
    }
}

// ============================================================
// WYCKOFF SPRING / UPTHRUST
// ============================================================

/// Spring: a poke below the trading-range low that closes back inside.
/// Upthrust: the mirror above the range high. The trading range is the
/// prior `range_lookback` bars, excluding the current one. An event is
/// confirmed when volume is anomalous: either drying up (below `low` times
/// average) or climactic (above `climactic` times average).
fn wyckoff(series: &Series, params: &WyckoffParams, table: &mut FeatureTable) {
    let n = series.len();
    let lookback = params.range_lookback.get();
    let vol_period = params.volume_period.get();

    for i in lookback.max(vol_period - 1)..n {
        let range_high = max_of(&series.highs[i - lookback..i]);
        let range_low = min_of(&series.lows[i - lookback..i]);
        let close = series.closes[i];

        let avg_volume = mean(&series.volumes[i + 1 - vol_period..=i]);
        let volume = series.volumes[i];
        let volume_anomalous = volume < params.thresholds.low * avg_volume
            || volume > params.thresholds.climactic * avg_volume;

        let spring = series.lows[i] < range_low && close > range_low;
        let upthrust = series.highs[i] > range_high && close < range_high;

        if spring {
            table.set(FeatureColumn::WyckoffSpring, i, 1.0);
            if volume_anomalous {
                table.set(FeatureColumn::WyckoffSpringConfirmed, i, 1.0);
            }
        }
        if upthrust {
            table.set(FeatureColumn::WyckoffUpthrust, i, 1.0);
            if volume_anomalous {
                table.set(FeatureColumn::WyckoffUpthrustConfirmed, i, 1.0);
            }
        }

        // Position of the close within the range; a degenerate (flat) range
        // reads as mid-range rather than poisoning the zone flags
        let width = range_high - range_low;
        let position = if width.abs() < EPS {
            0.5
        } else {
            clamp01(safe_div(close - range_low, width))
        };
        table.set(FeatureColumn::WyckoffRangePosition, i, position);
        if position < 0.3 {
            table.set(FeatureColumn::IsDiscountZone, i, 1.0);
        } else if position > 0.7 {
            table.set(FeatureColumn::IsPremiumZone, i, 1.0);
        }
        if (0.45..=0.55).contains(&position) {
            table.set(FeatureColumn::IsEquilibrium, i, 1.0);
        }
    }
}

// ============================================================
// CHANGE OF CHARACTER
// ============================================================

/// A CHoCH fires when the close crosses the swing extreme it was trending
/// away from: a bullish CHoCH needs a downtrend on the previous bar and a
/// close above the half-window-old rolling swing high. Trend itself is
/// higher-highs-and-higher-lows (up) or lower-lows-and-lower-highs (down)
/// over the half-window shift.
fn choch(series: &Series, params: &ChochParams, table: &mut FeatureTable) {
    let n = series.len();
    let length = params.length.get();
    let half = length / 2;
    if half == 0 || n < length + half {
        return;
    }

    let swing_high = rolling_max(&series.highs, length);
    let swing_low = rolling_min(&series.lows, length);

    // NaN warmup propagates: comparisons against NaN are false
    let mut uptrend = vec![false; n];
    let mut downtrend = vec![false; n];
    for i in half..n {
        let hh = swing_high[i] > swing_high[i - half];
        let hl = swing_low[i] > swing_low[i - half];
        let ll = swing_low[i] < swing_low[i - half];
        let lh = swing_high[i] < swing_high[i - half];
        uptrend[i] = hh && hl;
        downtrend[i] = ll && lh;
        table.set(
            FeatureColumn::TrendState,
            i,
            if uptrend[i] {
                1.0
            } else if downtrend[i] {
                -1.0
            } else {
                0.0
            },
        );
    }

    for i in (half + 1)..n {
        let prev_swing_high = swing_high[i - half];
        let prev_swing_low = swing_low[i - half];

        if downtrend[i - 1] && series.closes[i] > prev_swing_high {
            table.set(FeatureColumn::ChochBull, i, 1.0);
        }
        if uptrend[i - 1] && series.closes[i] < prev_swing_low {
            table.set(FeatureColumn::ChochBear, i, 1.0);
        }
    }
}

// ============================================================
// LIQUIDITY POOLS
// ============================================================

/// Resting liquidity above/below price: bars in the trailing window whose
/// extremes cluster within `tolerance` of the window extreme. A sweep is a
/// wick through the pool that closes back on the near side.
fn liquidity(series: &Series, params: &LiquidityParams, table: &mut FeatureTable) {
    let n = series.len();
    let lookback = params.lookback.get();
    let tolerance = params.tolerance.get();

    for i in lookback..n {
        let window = (i - lookback)..i;
        let pool_high = max_of(&series.highs[window.clone()]);
        let pool_low = min_of(&series.lows[window.clone()]);
        let close = series.closes[i];

        let above_count = series.highs[window.clone()]
            .iter()
            .filter(|&&h| safe_div((h - pool_high).abs(), pool_high) < tolerance)
            .count();
        let below_count = series.lows[window]
            .iter()
            .filter(|&&l| safe_div((l - pool_low).abs(), pool_low) < tolerance)
            .count();

        table.set(FeatureColumn::LiquidityAboveCount, i, above_count as f64);
        table.set(FeatureColumn::LiquidityBelowCount, i, below_count as f64);
        table.set(
            FeatureColumn::DistToLiquidityAbove,
            i,
            safe_div(pool_high - close, close),
        );
        table.set(
            FeatureColumn::DistToLiquidityBelow,
            i,
            safe_div(close - pool_low, close),
        );

        if series.highs[i] > pool_high && close < pool_high {
            table.set(FeatureColumn::LiquiditySweptAbove, i, 1.0);
        }
        if series.lows[i] < pool_low && close > pool_low {
            table.set(FeatureColumn::LiquiditySweptBelow, i, 1.0);
        }
    }
}

// ============================================================
// BREAK OF STRUCTURE
// ============================================================

/// A BOS is the close crossing the prior rolling extreme for the first
/// time (the previous close was still inside). Structure direction grades
/// the same rolling extremes into [-1, 1]: +1 when both are rising over the
/// half-window shift, -1 when both are falling.
fn bos_structure(series: &Series, params: &BosParams, table: &mut FeatureTable) {
    let n = series.len();
    let length = params.length.get();
    let half = length / 2;
    if half == 0 || n < length + 1 {
        return;
    }

    let roll_high = rolling_max(&series.highs, length);
    let roll_low = rolling_min(&series.lows, length);

    for i in length..n {
        let prior_high = roll_high[i - 1];
        let prior_low = roll_low[i - 1];

        if series.closes[i] > prior_high && series.closes[i - 1] <= prior_high {
            table.set(FeatureColumn::BosBull, i, 1.0);
        }
        if series.closes[i] < prior_low && series.closes[i - 1] >= prior_low {
            table.set(FeatureColumn::BosBear, i, 1.0);
        }

        if i >= length + half {
            let hh = (roll_high[i] > roll_high[i - half]) as i32;
            let hl = (roll_low[i] > roll_low[i - half]) as i32;
            let ll = (roll_low[i] < roll_low[i - half]) as i32;
            let lh = (roll_high[i] < roll_high[i - half]) as i32;
            let score = ((hh + hl) - (ll + lh)).clamp(-2, 2);
            table.set(FeatureColumn::StructureDirection, i, score as f64 / 2.0);
        }
    }
}

// ============================================================
// FAIR VALUE GAPS
// ============================================================

/// Three-candle imbalance: a bull FVG leaves a gap between this bar's low
/// and the high two bars back. Size is the gap relative to the current
/// close, signed by direction; counts are raw sums over the trailing
/// [`FVG_COUNT_WINDOW`] bars.
fn fair_value_gaps(series: &Series, table: &mut FeatureTable) {
    let n = series.len();
    if n < 3 {
        return;
    }

    for i in 2..n {
        if series.lows[i] > series.highs[i - 2] {
            table.set(FeatureColumn::FvgBull, i, 1.0);
            table.set(
                FeatureColumn::FvgSize,
                i,
                safe_div(series.lows[i] - series.highs[i - 2], series.closes[i]),
            );
        } else if series.highs[i] < series.lows[i - 2] {
            table.set(FeatureColumn::FvgBear, i, 1.0);
            table.set(
                FeatureColumn::FvgSize,
                i,
                -safe_div(series.lows[i - 2] - series.highs[i], series.closes[i]),
            );
        }
    }

    for i in 0..n {
        let from = i.saturating_sub(FVG_COUNT_WINDOW - 1);
        let bulls: f64 = table.column(FeatureColumn::FvgBull)[from..=i].iter().sum();
        let bears: f64 = table.column(FeatureColumn::FvgBear)[from..=i].iter().sum();
        table.set(FeatureColumn::FvgBullCount, i, bulls);
        table.set(FeatureColumn::FvgBearCount, i, bears);
        table.set(FeatureColumn::FvgNetCount, i, bulls - bears);
    }
}
