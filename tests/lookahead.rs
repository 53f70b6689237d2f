//! No-lookahead and determinism guarantees.
//!
//! Truncating the input must not change any value already emitted, except
//! within the order-block confirmation horizon at the cut (a block is
//! marked up to three bars in arrears). Scanning the same input twice must
//! produce identical tables.

use chartscan::prelude::*;
use proptest::prelude::*;

/// Bars the confirmation horizon can still rewrite at the cut.
const RETRO_HORIZON: usize = 3;

#[derive(Debug, Clone, Copy)]
struct TestBar {
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    v: f64,
}

impl OHLCV for TestBar {
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
}

/// Deterministic pseudo-random walk with occasional jumps and volume
/// bursts, so every detector family has something to chew on.
fn generate_bars(n: usize) -> Vec<TestBar> {
    let mut bars = Vec::with_capacity(n);
    let mut price: f64 = 100.0;

    for i in 0..n {
        let change = ((i * 7 + 13) % 100) as f64 / 50.0 - 1.0;
        let volatility = 2.0 + ((i * 3) % 10) as f64 / 5.0;
        let jump = if i % 37 == 0 { 3.0 } else { 0.0 };

        let o = price;
        let c = (price + change + jump).max(1.0);
        let h = o.max(c) + volatility * 0.5;
        let l = (o.min(c) - volatility * 0.5).max(0.5);
        let v = 1000.0 + ((i * 11) % 500) as f64 * if i % 29 == 0 { 6.0 } else { 1.0 };

        bars.push(TestBar { o, h, l, c, v });
        price = c;
    }

    bars
}

fn full_engine() -> FeatureEngine {
    EngineBuilder::new().with_all_defaults().build().unwrap()
}

// ============================================================
// TRUNCATION INVARIANCE
// ============================================================

#[test]
fn test_truncation_does_not_rewrite_history() {
    let bars = generate_bars(300);
    let engine = full_engine();

    let full = engine.scan(&bars).unwrap();

    for cut in [120, 200, 250] {
        let truncated = engine.scan(&bars[..cut]).unwrap();
        let stable = cut - RETRO_HORIZON;

        for (col, full_values) in full.iter_columns() {
            let truncated_values = truncated.column(col);
            for i in 0..stable {
                assert_eq!(
                    full_values[i], truncated_values[i],
                    "{:?} at bar {} changed when the series was cut at {}",
                    col, i, cut
                );
            }
        }
    }
}

#[test]
fn test_appending_bars_only_extends() {
    let bars = generate_bars(260);
    let engine = full_engine();

    let short = engine.scan(&bars[..200]).unwrap();
    let long = engine.scan(&bars).unwrap();

    for (col, short_values) in short.iter_columns() {
        let long_values = long.column(col);
        for i in 0..(200 - RETRO_HORIZON) {
            assert_eq!(short_values[i], long_values[i]);
        }
    }
}

// ============================================================
// DETERMINISM
// ============================================================

#[test]
fn test_scan_is_deterministic() {
    let bars = generate_bars(500);
    let engine = full_engine();

    let first = engine.scan(&bars).unwrap();
    let second = engine.scan(&bars).unwrap();

    for (col, first_values) in first.iter_columns() {
        assert_eq!(first_values, second.column(col), "{:?} differs", col);
    }
}

#[test]
fn test_parallel_scan_matches_serial() {
    let bars = generate_bars(300);
    let engine = full_engine();

    let serial = engine.scan(&bars).unwrap();
    let (results, errors) = scan_parallel(&engine, vec![("SYM", &bars[..])]);
    assert!(errors.is_empty());
    assert_eq!(results.len(), 1);

    for (col, values) in serial.iter_columns() {
        assert_eq!(values, results[0].features.column(col));
    }
}

// ============================================================
// PROPERTY TESTS
// ============================================================

/// Arbitrary well-formed bar: high covers the body, low underpins it.
fn arb_bar() -> impl Strategy<Value = TestBar> {
    (
        50.0..150.0f64,
        -2.0..2.0f64,
        0.0..3.0f64,
        0.0..3.0f64,
        1.0..10_000.0f64,
    )
        .prop_map(|(o, body, wick_up, wick_down, v)| {
            let c = o + body;
            TestBar {
                o,
                h: o.max(c) + wick_up,
                l: o.min(c) - wick_down,
                c,
                v,
            }
        })
}

fn arb_series() -> impl Strategy<Value = Vec<TestBar>> {
    prop::collection::vec(arb_bar(), 0..220)
}

proptest! {
    #[test]
    fn prop_scan_output_is_finite_and_bounded(bars in arb_series()) {
        let engine = full_engine();
        let features = engine.scan(&bars).unwrap();
        prop_assert_eq!(features.len(), bars.len());

        for (col, values) in features.iter_columns() {
            for &v in values {
                prop_assert!(v.is_finite(), "{:?} produced a non-finite value", col);
            }
        }

        for kind in PatternKind::ALL {
            for &v in features.column(FeatureColumn::from(kind)) {
                prop_assert!((0.0..=1.0).contains(&v));
            }
        }
    }

    #[test]
    fn prop_composite_identities_hold(bars in arb_series()) {
        let engine = full_engine();
        let features = engine.scan(&bars).unwrap();

        for i in 0..features.len() {
            let score = features.composite(i);
            prop_assert!((0.0..=1.0).contains(&score.bull_score));
            prop_assert!((0.0..=1.0).contains(&score.bear_score));
            prop_assert_eq!(score.net_score, score.bull_score - score.bear_score);
            prop_assert_eq!(score.strength, score.bull_score.max(score.bear_score));
            prop_assert_eq!(score.has_pattern, score.strength > 0.1);
        }
    }

    #[test]
    fn prop_detections_sorted_and_in_range(bars in arb_series()) {
        let engine = full_engine();
        let detections = engine.scan_detections(&bars).unwrap();

        for pair in detections.windows(2) {
            prop_assert!((pair[0].index, pair[0].pattern) <= (pair[1].index, pair[1].pattern));
        }
        for det in &detections {
            prop_assert!(det.index < bars.len());
            prop_assert!(det.confidence > 0.0 && det.confidence <= 1.0);
        }
    }
}
