//! Chart-pattern matchers
//!
//! Each matcher is a pure whole-series function over `(bars, swings)` that
//! emits [`crate::PatternDetection`]s at confirmation bars.
//!
//! # Matcher families
//!
//! - **Reversal (swing-based)**: Double Top, Double Bottom, Head & Shoulders
//!   (+ inverse) - geometry over the confirmed swing sequence.
//! - **Channel (regression-based)**: Wedge (rising/falling), Triangle
//!   (ascending/descending/symmetrical) - per-bar OLS fits over a trailing
//!   window of highs and lows.
//! - **Continuation**: Flag/Pennant (bull/bear) - pole + consolidation split
//!   of a trailing window.

pub mod helpers;

/// Generate `with_defaults()` -> `Self::default()` for multiple detector types.
macro_rules! impl_with_defaults {
  ($($detector:ty),* $(,)?) => {
    $(impl $detector {
      pub fn with_defaults() -> Self { Self::default() }
    })*
  };
}

pub mod channel;
pub mod flag;
pub mod reversal;

// Re-export all matchers for convenience
pub use channel::*;
pub use flag::*;
pub use helpers::*;
pub use reversal::*;
