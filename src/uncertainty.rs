use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{MIN_GRADIENT_TOTAL, MIXED_DOMINANCE_GAP};
use crate::sensitivity::{RiskFactor, SensitivityMatrix};

/// Input dominating the decision risk, or `Mixed` when no single one does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DominantFactor {
    #[serde(rename = "wind")]
    Wind,
    #[serde(rename = "altitude")]
    Altitude,
    #[serde(rename = "velocity")]
    Velocity,
    Mixed,
}

impl From<RiskFactor> for DominantFactor {
    fn from(factor: RiskFactor) -> Self {
        match factor {
            RiskFactor::Wind => DominantFactor::Wind,
            RiskFactor::Altitude => DominantFactor::Altitude,
            RiskFactor::Velocity => DominantFactor::Velocity,
        }
    }
}

impl fmt::Display for DominantFactor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DominantFactor::Wind => write!(f, "wind"),
            DominantFactor::Altitude => write!(f, "altitude"),
            DominantFactor::Velocity => write!(f, "velocity"),
            DominantFactor::Mixed => write!(f, "Mixed"),
        }
    }
}

/// Relative contribution weights, summing to 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyContribution {
    pub wind: f64,
    pub altitude: f64,
    pub velocity: f64,
    pub dominant: DominantFactor,
}

impl UncertaintyContribution {
    pub fn weight(&self, factor: RiskFactor) -> f64 {
        match factor {
            RiskFactor::Wind => self.wind,
            RiskFactor::Altitude => self.altitude,
            RiskFactor::Velocity => self.velocity,
        }
    }
}

/// Normalize absolute gradients into contribution weights.
///
/// Near-zero gradients fall back to equal thirds. The dominant factor is
/// `Mixed` whenever the top two weights are within [`MIXED_DOMINANCE_GAP`].
pub fn decompose_uncertainty(matrix: &SensitivityMatrix) -> UncertaintyContribution {
    let wind = matrix.wind.abs();
    let altitude = matrix.altitude.abs();
    let velocity = matrix.velocity.abs();
    let total = wind + altitude + velocity;

    if total < MIN_GRADIENT_TOTAL {
        let third = 1.0 / 3.0;
        return UncertaintyContribution {
            wind: third,
            altitude: third,
            velocity: third,
            dominant: DominantFactor::Mixed,
        };
    }

    let mut contribution = UncertaintyContribution {
        wind: wind / total,
        altitude: altitude / total,
        velocity: velocity / total,
        dominant: DominantFactor::Mixed,
    };

    let ranked = matrix.ranked();
    let top = contribution.weight(ranked[0]);
    let runner_up = contribution.weight(ranked[1]);
    if top >= runner_up + MIXED_DOMINANCE_GAP {
        contribution.dominant = ranked[0].into();
    }
    contribution
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_one() {
        let matrix = SensitivityMatrix { wind: -0.06, altitude: 0.003, velocity: 0.01 };
        let c = decompose_uncertainty(&matrix);
        assert!((c.wind + c.altitude + c.velocity - 1.0).abs() < 1e-12);
        assert!((c.wind - 0.06 / 0.073).abs() < 1e-12);
        assert_eq!(c.dominant, DominantFactor::Wind);
    }

    #[test]
    fn test_zero_gradients_fall_back_to_thirds() {
        let matrix = SensitivityMatrix { wind: 0.0, altitude: 1e-8, velocity: 0.0 };
        let c = decompose_uncertainty(&matrix);
        assert!((c.wind - 1.0 / 3.0).abs() < 1e-12);
        assert!((c.velocity - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(c.dominant, DominantFactor::Mixed);
    }

    #[test]
    fn test_close_contributors_are_mixed() {
        // Weights 0.48 / 0.44 / 0.08
        let matrix = SensitivityMatrix { wind: 0.048, altitude: 0.044, velocity: 0.008 };
        assert_eq!(decompose_uncertainty(&matrix).dominant, DominantFactor::Mixed);

        // Weights 0.5 / 0.4 / 0.1
        let matrix = SensitivityMatrix { wind: 0.04, altitude: -0.05, velocity: 0.01 };
        assert_eq!(decompose_uncertainty(&matrix).dominant, DominantFactor::Altitude);
    }

    #[test]
    fn test_dominant_display() {
        assert_eq!(DominantFactor::Mixed.to_string(), "Mixed");
        assert_eq!(serde_json::to_string(&DominantFactor::Velocity).unwrap(), "\"velocity\"");
    }
}
