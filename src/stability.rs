//! Decision hysteresis, robustness classification and stability index.
//!
//! Thresholds are handled in percent (0-100) while probabilities and CI
//! bounds stay fractions (0-1), matching the snapshot fields.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::constants::{HYSTERESIS_MARGIN_PCT, MAX_STABILITY_INDEX, STABILITY_EPSILON};
use crate::doctrine::Decision;
use crate::pipeline::EvaluationSnapshot;
use crate::statistics::ConfidenceInterval;

/// How the confidence interval sits relative to the decision threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Robustness {
    /// No confidence interval available
    Unknown,
    /// Lower bound strictly above threshold
    Robust,
    /// Threshold falls inside the interval
    Fragile,
    /// Upper bound strictly below threshold
    Unsafe,
    /// Interval collapsed to (near) zero width
    NumericalLimit,
}

impl fmt::Display for Robustness {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Robustness::Unknown => "UNKNOWN",
            Robustness::Robust => "ROBUST",
            Robustness::Fragile => "FRAGILE",
            Robustness::Unsafe => "UNSAFE",
            Robustness::NumericalLimit => "NUMERICAL_LIMIT",
        };
        write!(f, "{name}")
    }
}

/// Apply a ±[`HYSTERESIS_MARGIN_PCT`] dead band around the threshold.
///
/// # Arguments
/// * `raw` - Doctrine decision for the current cycle
/// * `p_hit` - Hit probability (0-1)
/// * `threshold_pct` - Decision threshold (0-100)
/// * `previous` - Final decision of the previous cycle, if any
///
/// # Returns
/// * The previous decision while `p_hit` stays inside the band on its side,
///   otherwise `raw`
pub fn apply_hysteresis(raw: Decision, p_hit: f64, threshold_pct: f64, previous: Option<Decision>) -> Decision {
    let threshold = threshold_pct / 100.0;
    let band = HYSTERESIS_MARGIN_PCT / 100.0;

    match previous {
        Some(Decision::Drop) if p_hit >= threshold - band => Decision::Drop,
        Some(Decision::NoDrop) if p_hit <= threshold + band => Decision::NoDrop,
        _ => raw,
    }
}

fn interval_width(ci: &ConfidenceInterval) -> f64 {
    if ci.high > ci.low {
        ci.high - ci.low
    } else {
        0.0
    }
}

pub fn robustness_status(ci: Option<&ConfidenceInterval>, threshold_pct: f64) -> Robustness {
    let Some(ci) = ci else {
        return Robustness::Unknown;
    };
    if interval_width(ci) < STABILITY_EPSILON {
        return Robustness::NumericalLimit;
    }

    let threshold = threshold_pct / 100.0;
    if ci.low > threshold {
        Robustness::Robust
    } else if ci.high < threshold {
        Robustness::Unsafe
    } else {
        Robustness::Fragile
    }
}

/// Distance from threshold in units of CI width, clamped to [`MAX_STABILITY_INDEX`].
/// Higher is more stable.
pub fn stability_index(p_hit: f64, threshold_pct: f64, ci: Option<&ConfidenceInterval>) -> f64 {
    let distance = (p_hit - threshold_pct / 100.0).abs();
    let width = ci.map_or(0.0, interval_width);
    (distance / width.max(STABILITY_EPSILON)).min(MAX_STABILITY_INDEX)
}

/// Stability pass over a freshly produced snapshot.
///
/// Sets the hysteresis-adjusted final decision, robustness and stability
/// index. A decision forced by the sample-size guard is never overridden.
pub fn enrich_snapshot(snapshot: &mut EvaluationSnapshot, previous: Option<Decision>) {
    debug!(previous = ?previous, raw = %snapshot.raw_decision, "applying decision hysteresis");

    snapshot.decision = if snapshot.sample_guard {
        snapshot.raw_decision
    } else {
        apply_hysteresis(snapshot.raw_decision, snapshot.p_hit, snapshot.threshold_pct, previous)
    };
    snapshot.hysteresis_applied = snapshot.decision != snapshot.raw_decision;
    snapshot.robustness = robustness_status(snapshot.confidence.as_ref(), snapshot.threshold_pct);
    snapshot.stability_index = stability_index(snapshot.p_hit, snapshot.threshold_pct, snapshot.confidence.as_ref());
}
