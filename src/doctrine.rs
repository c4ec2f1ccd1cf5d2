//! Doctrine-based drop decision.
//!
//! A doctrine picks which statistic gates the drop: the lower Wilson bound
//! (STRICT), the point estimate (BALANCED) or the upper bound (AGGRESSIVE).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::MIN_VALID_SAMPLES;
use crate::error::{AirdropError, Result};
use crate::statistics::ConfidenceInterval;

pub const INSUFFICIENT_SAMPLES_REASON: &str = "Insufficient statistical sample size.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Doctrine {
    Strict,
    Balanced,
    Aggressive,
}

impl Doctrine {
    pub fn description(&self) -> &'static str {
        match self {
            Doctrine::Strict => "Drop only if lower confidence bound exceeds threshold.",
            Doctrine::Balanced => "Drop based on estimated hit probability.",
            Doctrine::Aggressive => "Drop if upper confidence bound exceeds threshold.",
        }
    }

    /// The statistic this doctrine compares against the threshold
    fn gating_value(&self, p_hat: f64, ci: &ConfidenceInterval) -> f64 {
        match self {
            Doctrine::Strict => ci.low,
            Doctrine::Balanced => p_hat,
            Doctrine::Aggressive => ci.high,
        }
    }

    fn reason(&self, drop: bool) -> &'static str {
        match (self, drop) {
            (Doctrine::Strict, true) => "Lower CI bound exceeds threshold.",
            (Doctrine::Strict, false) => "Lower CI bound below threshold.",
            (Doctrine::Balanced, true) => "Estimated hit probability exceeds threshold.",
            (Doctrine::Balanced, false) => "Estimated hit probability below threshold.",
            (Doctrine::Aggressive, true) => "Upper CI bound exceeds threshold.",
            (Doctrine::Aggressive, false) => "Upper CI bound below threshold.",
        }
    }
}

impl FromStr for Doctrine {
    type Err = AirdropError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "STRICT" => Ok(Doctrine::Strict),
            "BALANCED" => Ok(Doctrine::Balanced),
            "AGGRESSIVE" => Ok(Doctrine::Aggressive),
            _ => Err(AirdropError::UnknownDoctrine(s.to_string())),
        }
    }
}

impl TryFrom<String> for Doctrine {
    type Error = AirdropError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Doctrine> for String {
    fn from(doctrine: Doctrine) -> Self {
        doctrine.to_string()
    }
}

impl fmt::Display for Doctrine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Doctrine::Strict => "STRICT",
            Doctrine::Balanced => "BALANCED",
            Doctrine::Aggressive => "AGGRESSIVE",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Decision {
    Drop,
    NoDrop,
}

impl Decision {
    pub fn is_drop(&self) -> bool {
        matches!(self, Decision::Drop)
    }
}

impl FromStr for Decision {
    type Err = AirdropError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_uppercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "DROP" => Ok(Decision::Drop),
            "NO DROP" | "NODROP" => Ok(Decision::NoDrop),
            _ => Err(AirdropError::invalid("decision", format!("unrecognized value '{s}'"))),
        }
    }
}

impl TryFrom<String> for Decision {
    type Error = AirdropError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Decision> for String {
    fn from(decision: Decision) -> Self {
        decision.to_string()
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Decision::Drop => write!(f, "DROP"),
            Decision::NoDrop => write!(f, "NO DROP"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoctrineOutcome {
    pub decision: Decision,
    pub reason: String,
    pub description: String,
    /// True when the decision was forced by the minimum sample guard
    pub sample_guard: bool,
}

/// Convert the hit-probability estimate into a drop decision.
///
/// `threshold` is a fraction in [0, 1]. Fewer than [`MIN_VALID_SAMPLES`]
/// samples always yields NO DROP regardless of doctrine.
pub fn evaluate_doctrine(
    p_hat: f64,
    ci: &ConfidenceInterval,
    threshold: f64,
    doctrine: Doctrine,
    n_samples: usize,
) -> Result<DoctrineOutcome> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(AirdropError::invalid(
            "threshold",
            format!("must be in [0, 1], got {threshold}"),
        ));
    }
    if !(0.0..=1.0).contains(&p_hat) {
        return Err(AirdropError::invalid(
            "hit probability",
            format!("must be in [0, 1], got {p_hat}"),
        ));
    }

    if n_samples < MIN_VALID_SAMPLES {
        return Ok(DoctrineOutcome {
            decision: Decision::NoDrop,
            reason: INSUFFICIENT_SAMPLES_REASON.to_string(),
            description: doctrine.description().to_string(),
            sample_guard: true,
        });
    }

    let drop = doctrine.gating_value(p_hat, ci) >= threshold;
    Ok(DoctrineOutcome {
        decision: if drop { Decision::Drop } else { Decision::NoDrop },
        reason: doctrine.reason(drop).to_string(),
        description: doctrine.description().to_string(),
        sample_guard: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CI: ConfidenceInterval = ConfidenceInterval { low: 0.7, high: 0.9 };

    #[test]
    fn test_doctrine_example() {
        let strict = evaluate_doctrine(0.8, &CI, 0.8, Doctrine::Strict, 300).unwrap();
        let balanced = evaluate_doctrine(0.8, &CI, 0.8, Doctrine::Balanced, 300).unwrap();
        let aggressive = evaluate_doctrine(0.8, &CI, 0.8, Doctrine::Aggressive, 300).unwrap();
        assert_eq!(strict.decision, Decision::NoDrop);
        assert_eq!(strict.reason, "Lower CI bound below threshold.");
        assert_eq!(balanced.decision, Decision::Drop);
        assert_eq!(aggressive.decision, Decision::Drop);
        assert_eq!(aggressive.reason, "Upper CI bound exceeds threshold.");
    }

    #[test]
    fn test_insufficient_samples_forces_no_drop() {
        let certain = ConfidenceInterval { low: 0.99, high: 1.0 };
        for doctrine in [Doctrine::Strict, Doctrine::Balanced, Doctrine::Aggressive] {
            let out = evaluate_doctrine(1.0, &certain, 0.1, doctrine, 10).unwrap();
            assert_eq!(out.decision, Decision::NoDrop);
            assert_eq!(out.reason, INSUFFICIENT_SAMPLES_REASON);
            assert!(out.sample_guard);
        }
        // Exactly at the guard is allowed
        let out = evaluate_doctrine(1.0, &certain, 0.1, Doctrine::Balanced, 30).unwrap();
        assert_eq!(out.decision, Decision::Drop);
    }

    #[test]
    fn test_unknown_doctrine_is_hard_error() {
        assert_eq!("strict".parse::<Doctrine>().unwrap(), Doctrine::Strict);
        assert_eq!(" Aggressive ".parse::<Doctrine>().unwrap(), Doctrine::Aggressive);
        assert!(matches!(
            "RECKLESS".parse::<Doctrine>(),
            Err(AirdropError::UnknownDoctrine(_))
        ));
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        assert!(evaluate_doctrine(0.5, &CI, 1.5, Doctrine::Balanced, 300).is_err());
        assert!(evaluate_doctrine(-0.1, &CI, 0.5, Doctrine::Balanced, 300).is_err());
    }

    #[test]
    fn test_decision_parsing() {
        assert_eq!("drop".parse::<Decision>().unwrap(), Decision::Drop);
        assert_eq!("no-drop".parse::<Decision>().unwrap(), Decision::NoDrop);
        assert_eq!("NO DROP".parse::<Decision>().unwrap(), Decision::NoDrop);
        assert!("maybe".parse::<Decision>().is_err());
        assert_eq!(Decision::NoDrop.to_string(), "NO DROP");
    }
}
