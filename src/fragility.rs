use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{EDGE_ZONE_MARGIN_PCT, STABLE_ZONE_MARGIN_PCT, WIND_PERTURBATION_MPS};
use crate::error::Result;
use crate::mission::EvaluationConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
pub enum FragilityZone {
    EdgeZone,
    TransitionZone,
    StableZone,
}

impl FragilityZone {
    /// Zone from the signed margin to threshold, in percentage points.
    /// Any estimate below threshold counts as the edge.
    pub fn from_margin(margin_pct: f64) -> Self {
        if margin_pct < EDGE_ZONE_MARGIN_PCT {
            FragilityZone::EdgeZone
        } else if margin_pct >= STABLE_ZONE_MARGIN_PCT {
            FragilityZone::StableZone
        } else {
            FragilityZone::TransitionZone
        }
    }
}

impl fmt::Display for FragilityZone {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            FragilityZone::EdgeZone => "EDGE-ZONE",
            FragilityZone::TransitionZone => "TRANSITION-ZONE",
            FragilityZone::StableZone => "STABLE-ZONE",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FragilityState {
    /// (P − threshold) in percentage points
    pub margin_pct: f64,
    /// d(margin)/d(wind) as a fraction per m/s
    pub slope_margin: f64,
    pub zone: FragilityZone,
}

/// Fragility from a known wind gradient, or from one wind probe when none is
/// available.
///
/// `threshold_pct` is 0-100; `p_base` and the probe result are fractions.
pub fn assess_fragility<F>(
    p_base: f64,
    threshold_pct: f64,
    wind_gradient: Option<f64>,
    config: &EvaluationConfig,
    mut probe: F,
) -> Result<FragilityState>
where
    F: FnMut(&EvaluationConfig) -> Result<f64>,
{
    let threshold = threshold_pct / 100.0;
    let margin = p_base - threshold;

    // Threshold is fixed, so the margin slope equals the hit-probability slope
    let slope_margin = match wind_gradient {
        Some(gradient) => gradient,
        None => {
            let p_wind = probe(&config.with_wind_x_offset(WIND_PERTURBATION_MPS))?;
            ((p_wind - threshold) - margin) / WIND_PERTURBATION_MPS
        }
    };

    let margin_pct = margin * 100.0;
    Ok(FragilityState {
        margin_pct,
        slope_margin,
        zone: FragilityZone::from_margin(margin_pct),
    })
}
