//! Numerical self-checks. Advisory only; results never feed the decision.

use serde::Serialize;
use std::fmt;
use tracing::warn;

use crate::constants::DT_CONVERGENCE_TOLERANCE;
use crate::error::{AirdropError, Result};
use crate::metrics::cep50;
use crate::mission::EvaluationConfig;
use crate::monte_carlo::{run_monte_carlo, MonteCarloParams};

pub const INTEGRATION_METHOD: &str = "Explicit Euler";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Pass,
    Caution,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CheckStatus::Pass => write!(f, "PASS"),
            CheckStatus::Caution => write!(f, "CAUTION"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StabilityCheck {
    pub integration_method: &'static str,
    pub dt: f64,
    pub samples: usize,
    pub cep50_dt: f64,
    pub cep50_half_dt: f64,
    pub relative_error: f64,
    pub status: CheckStatus,
}

fn cep_at(config: &EvaluationConfig) -> Result<f64> {
    let results = run_monte_carlo(&MonteCarloParams::from_config(config)?)?;
    cep50(&results.impact_points, &config.target.position)
}

/// Compare CEP50 at the configured dt and at dt/2 over `samples` trials with
/// the same seed. PASS when the relative difference is under 2 %.
pub fn quick_stability_check(config: &EvaluationConfig, samples: usize) -> Result<StabilityCheck> {
    if samples == 0 {
        return Err(AirdropError::invalid("samples", "must be greater than 0"));
    }
    let base = config.with_sample_count(samples);
    base.validate()?;
    let dt = base.simulation.dt;

    let cep_dt = cep_at(&base)?;
    let cep_half = cep_at(&base.with_dt(dt / 2.0))?;
    let relative_error = (cep_dt - cep_half).abs() / cep_half.abs().max(1e-9);

    let status = if relative_error < DT_CONVERGENCE_TOLERANCE {
        CheckStatus::Pass
    } else {
        warn!(dt, relative_error, "CEP50 not converged in dt");
        CheckStatus::Caution
    };

    Ok(StabilityCheck {
        integration_method: INTEGRATION_METHOD,
        dt,
        samples,
        cep50_dt: cep_dt,
        cep50_half_dt: cep_half,
        relative_error,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stability_check_reports() {
        let check = quick_stability_check(&EvaluationConfig::default(), 5).unwrap();
        assert_eq!(check.integration_method, "Explicit Euler");
        assert_eq!(check.samples, 5);
        assert_eq!(check.dt, 0.01);
        assert!(check.relative_error.is_finite());
        let expected = if check.relative_error < 0.02 { CheckStatus::Pass } else { CheckStatus::Caution };
        assert_eq!(check.status, expected);
    }

    #[test]
    fn test_calm_offset_target_passes() {
        // No wind noise and a distant target: CEP50 is dominated by the range
        // to the target, so halving dt barely moves it
        let mut config = EvaluationConfig::default().with_wind(nalgebra::Vector3::zeros(), 0.0);
        config.target.position = nalgebra::Vector2::new(500.0, 0.0);
        let check = quick_stability_check(&config, 5).unwrap();
        assert_eq!(check.status, CheckStatus::Pass);
    }

    #[test]
    fn test_zero_samples_rejected() {
        assert!(quick_stability_check(&EvaluationConfig::default(), 0).is_err());
    }
}
