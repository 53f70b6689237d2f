//! Swing-point extraction
//!
//! A swing high is a bar whose high is >= the highs of the `order` bars on
//! each side (mirror for lows, plateaus count). A swing at bar `i` only exists
//! once bar `i + order` has closed, so consumers comparing against the
//! confirmation bar can never act on unconfirmed extrema.

use crate::OHLCV;

/// Kind of swing extremum
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SwingKind {
    High,
    Low,
}

/// A confirmed local extremum.
///
/// `index` is the bar where the extremum actually occurred; `confirmed_at`
/// (`index + order`) is the first bar at which it may be acted on. Pattern
/// geometry (ordering, betweenness) uses `index`; detection output positions
/// use `confirmed_at`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwingPoint {
    pub index: usize,
    pub confirmed_at: usize,
    pub price: f64,
    pub kind: SwingKind,
}

/// All confirmed swings of a bar series, highs and lows separately, each
/// sorted by `index` ascending.
#[derive(Debug, Clone, Default)]
pub struct SwingSeries {
    pub highs: Vec<SwingPoint>,
    pub lows: Vec<SwingPoint>,
    /// Half-window radius the swings were extracted with
    pub order: usize,
    /// Length of the source bar series
    pub len: usize,
}

/// Extract all confirmed swing points from a bar series.
///
/// Pure function: series shorter than `2 * order + 1` yield an empty swing
/// set, never an error. Ties are kept (a flat plateau marks every bar of the
/// plateau), matching `>=` / `<=` extremum semantics.
pub fn extract_swings<T: OHLCV>(bars: &[T], order: usize) -> SwingSeries {
    let len = bars.len();
    let mut swings = SwingSeries {
        highs: Vec::new(),
        lows: Vec::new(),
        order,
        len,
    };

    if order == 0 || len < 2 * order + 1 {
        return swings;
    }

    for i in order..len - order {
        let window = &bars[i - order..=i + order];

        let high = bars[i].high();
        if window.iter().all(|b| high >= b.high()) {
            swings.highs.push(SwingPoint {
                index: i,
                confirmed_at: i + order,
                price: high,
                kind: SwingKind::High,
            });
        }

        let low = bars[i].low();
        if window.iter().all(|b| low <= b.low()) {
            swings.lows.push(SwingPoint {
                index: i,
                confirmed_at: i + order,
                price: low,
                kind: SwingKind::Low,
            });
        }
    }

    swings
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bar {
        h: f64,
        l: f64,
    }

    impl OHLCV for Bar {
        fn open(&self) -> f64 {
            (self.h + self.l) / 2.0
        }

        fn high(&self) -> f64 {
            self.h
        }

        fn low(&self) -> f64 {
            self.l
        }

        fn close(&self) -> f64 {
            (self.h + self.l) / 2.0
        }

        fn volume(&self) -> f64 {
            1.0
        }
    }

    fn bars_from_highs(highs: &[f64]) -> Vec<Bar> {
        highs
            .iter()
            .map(|&h| Bar { h, l: h - 10.0 })
            .collect()
    }

    #[test]
    fn test_short_series_yields_no_swings() {
        let bars = bars_from_highs(&[1.0, 2.0, 3.0]);
        let swings = extract_swings(&bars, 2);
        assert!(swings.highs.is_empty());
        assert!(swings.lows.is_empty());
    }

    #[test]
    fn test_single_peak() {
        // Peak at index 3
        let bars = bars_from_highs(&[1.0, 2.0, 3.0, 5.0, 3.0, 2.0, 1.0]);
        let swings = extract_swings(&bars, 2);
        assert_eq!(swings.highs.len(), 1);
        let peak = &swings.highs[0];
        assert_eq!(peak.index, 3);
        assert_eq!(peak.confirmed_at, 5);
        assert_eq!(peak.price, 5.0);
        assert_eq!(peak.kind, SwingKind::High);
    }

    #[test]
    fn test_trough_detected_on_lows() {
        let bars = bars_from_highs(&[5.0, 4.0, 3.0, 1.0, 3.0, 4.0, 5.0]);
        let swings = extract_swings(&bars, 2);
        assert_eq!(swings.lows.len(), 1);
        assert_eq!(swings.lows[0].index, 3);
        assert_eq!(swings.lows[0].price, 1.0 - 10.0);
    }

    #[test]
    fn test_plateau_marks_every_tied_bar() {
        let bars = bars_from_highs(&[1.0, 2.0, 5.0, 5.0, 5.0, 2.0, 1.0]);
        let swings = extract_swings(&bars, 2);
        let indices: Vec<usize> = swings.highs.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![2, 3, 4]);
    }

    #[test]
    fn test_peak_near_end_is_unconfirmed() {
        // Peak at index 5 would need bars through index 7; series ends at 6
        let bars = bars_from_highs(&[1.0, 2.0, 3.0, 4.0, 4.5, 5.0, 4.0]);
        let swings = extract_swings(&bars, 2);
        assert!(swings.highs.iter().all(|s| s.index != 5));
    }

    #[test]
    fn test_swings_sorted_by_index() {
        let highs: Vec<f64> = (0..60)
            .map(|i| 100.0 + (i as f64 * 0.7).sin() * 10.0)
            .collect();
        let bars = bars_from_highs(&highs);
        let swings = extract_swings(&bars, 3);
        assert!(!swings.highs.is_empty());
        assert!(swings.highs.windows(2).all(|w| w[0].index < w[1].index));
        assert!(swings.lows.windows(2).all(|w| w[0].index < w[1].index));
        for s in swings.highs.iter().chain(&swings.lows) {
            assert_eq!(s.confirmed_at, s.index + 3);
            assert!(s.confirmed_at < bars.len());
        }
    }
}
