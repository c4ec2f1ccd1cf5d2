//! One evaluation cycle: Monte Carlo → metrics → Wilson CI → doctrine → stability.
//!
//! Every function here is a pure function of its [`EvaluationConfig`]; what-if
//! analyses evaluate perturbed copies rather than mutating shared state.

use nalgebra::{Vector2, Vector3};
use serde::Serialize;
use tracing::info;

use crate::analysis::RiskAnalyses;
use crate::constants::WILSON_Z_95;
use crate::doctrine::{evaluate_doctrine, Decision, Doctrine};
use crate::error::Result;
use crate::metrics::{cep50, confidence_index, count_hits, impact_velocity_stats, ImpactVelocityStats};
use crate::mission::{EvaluationConfig, Target};
use crate::monte_carlo::{run_monte_carlo, MonteCarloParams};
use crate::stability::{enrich_snapshot, Robustness};
use crate::statistics::{wilson_interval, ConfidenceInterval};

/// Authoritative record of one evaluation cycle
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationSnapshot {
    pub impact_points: Vec<Vector2<f64>>,
    pub impact_speeds: Vec<f64>,
    pub fallback_count: usize,
    pub hits: usize,
    pub n_samples: usize,
    pub random_seed: u64,
    pub p_hit: f64,
    pub cep50: f64, // meters
    pub impact_velocity: ImpactVelocityStats,
    pub confidence: Option<ConfidenceInterval>,
    pub confidence_index: f64,
    pub threshold_pct: f64,
    pub doctrine: Doctrine,
    pub doctrine_description: String,
    /// Doctrine decision before hysteresis
    pub raw_decision: Decision,
    /// Final decision after the stability pass
    pub decision: Decision,
    pub decision_reason: String,
    pub sample_guard: bool,
    pub hysteresis_applied: bool,
    pub robustness: Robustness,
    pub stability_index: f64,
    pub target: Target,
    pub wind_mean: Vector3<f64>,
    pub analyses: RiskAnalyses,
}

impl EvaluationSnapshot {
    /// Attach risk analyses, consuming the snapshot
    pub fn with_analyses(mut self, analyses: RiskAnalyses) -> Self {
        self.analyses = analyses;
        self
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn ci_low(&self) -> Option<f64> {
        self.confidence.map(|ci| ci.low)
    }

    pub fn ci_high(&self) -> Option<f64> {
        self.confidence.map(|ci| ci.high)
    }
}

/// Run the sampler and decision layers without the stability pass.
///
/// The returned snapshot carries the raw doctrine decision as its final
/// decision, `UNKNOWN` robustness and a zero stability index until
/// [`enrich_snapshot`] is applied.
pub fn evaluate_raw(config: &EvaluationConfig, telemetry_age_s: Option<f64>) -> Result<EvaluationSnapshot> {
    config.validate()?;
    let threshold = config.threshold()?;

    let params = MonteCarloParams::from_config(config)?;
    let results = run_monte_carlo(&params)?;

    let target = config.target;
    let hits = count_hits(&results.impact_points, &target.position, target.radius)?;
    let n_samples = results.len();
    let p_hit = hits as f64 / n_samples as f64;
    let cep = cep50(&results.impact_points, &target.position)?;
    let ci = wilson_interval(hits, n_samples, WILSON_Z_95)?;

    let doctrine = config.decision.doctrine;
    let outcome = evaluate_doctrine(p_hit, &ci, threshold, doctrine, n_samples)?;

    let confidence_index = confidence_index(
        config.environment.wind_std,
        Some(config.payload.ballistic_coefficient()),
        config.uav.position.z,
        telemetry_age_s,
    );

    Ok(EvaluationSnapshot {
        impact_velocity: impact_velocity_stats(&results.impact_speeds),
        impact_points: results.impact_points,
        impact_speeds: results.impact_speeds,
        fallback_count: results.fallback_count,
        hits,
        n_samples,
        random_seed: config.simulation.random_seed,
        p_hit,
        cep50: cep,
        confidence: Some(ci),
        confidence_index,
        threshold_pct: threshold * 100.0,
        doctrine,
        doctrine_description: outcome.description,
        raw_decision: outcome.decision,
        decision: outcome.decision,
        decision_reason: outcome.reason,
        sample_guard: outcome.sample_guard,
        hysteresis_applied: false,
        robustness: Robustness::Unknown,
        stability_index: 0.0,
        target,
        wind_mean: config.environment.wind_mean,
        analyses: RiskAnalyses::default(),
    })
}

/// Full evaluation: raw pipeline followed by the stability pass
pub fn evaluate(config: &EvaluationConfig, previous: Option<Decision>) -> Result<EvaluationSnapshot> {
    let mut snapshot = evaluate_raw(config, None)?;
    enrich_snapshot(&mut snapshot, previous);
    info!(
        p_hit = snapshot.p_hit,
        cep50 = snapshot.cep50,
        decision = %snapshot.decision,
        robustness = %snapshot.robustness,
        "evaluation complete"
    );
    Ok(snapshot)
}

/// Hit probability only, for what-if re-runs with a perturbed config
pub fn hit_probability_probe(config: &EvaluationConfig) -> Result<f64> {
    config.validate()?;
    let params = MonteCarloParams::from_config(config)?;
    let results = run_monte_carlo(&params)?;
    let hits = count_hits(&results.impact_points, &config.target.position, config.target.radius)?;
    Ok(hits as f64 / results.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doctrine::INSUFFICIENT_SAMPLES_REASON;

    #[test]
    fn test_evaluate_default_mission() {
        let snapshot = evaluate(&EvaluationConfig::default(), None).unwrap();
        assert_eq!(snapshot.n_samples, 300);
        assert_eq!(snapshot.impact_points.len(), 300);
        assert!((0.0..=1.0).contains(&snapshot.p_hit));
        assert!(snapshot.cep50 >= 0.0);
        let ci = snapshot.confidence.unwrap();
        assert!(ci.low <= ci.high);
        assert_eq!(snapshot.threshold_pct, 75.0);
        assert_ne!(snapshot.robustness, Robustness::Unknown);
        assert!(snapshot.stability_index <= 100.0);
        assert!(!snapshot.hysteresis_applied);
    }

    #[test]
    fn test_evaluate_is_deterministic() {
        let config = EvaluationConfig::default().with_sample_count(120);
        let a = evaluate(&config, None).unwrap();
        let b = evaluate(&config, None).unwrap();
        assert_eq!(a.impact_points, b.impact_points);
        assert_eq!(a.p_hit, b.p_hit);
        assert_eq!(a.cep50, b.cep50);
    }

    #[test]
    fn test_probe_matches_snapshot() {
        let config = EvaluationConfig::default().with_sample_count(100);
        let snapshot = evaluate(&config, None).unwrap();
        assert_eq!(hit_probability_probe(&config).unwrap(), snapshot.p_hit);
    }

    #[test]
    fn test_small_sample_is_guarded() {
        let config = EvaluationConfig::default().with_sample_count(10);
        let snapshot = evaluate(&config, Some(Decision::Drop)).unwrap();
        assert!(snapshot.sample_guard);
        assert_eq!(snapshot.decision, Decision::NoDrop);
        assert_eq!(snapshot.decision_reason, INSUFFICIENT_SAMPLES_REASON);
    }

    #[test]
    fn test_invalid_config_is_error() {
        let mut config = EvaluationConfig::default();
        config.payload.mass = 0.0;
        assert!(evaluate(&config, None).is_err());
        assert!(hit_probability_probe(&config).is_err());
    }

    #[test]
    fn test_snapshot_serializes() {
        let snapshot = evaluate(&EvaluationConfig::default().with_sample_count(40), None).unwrap();
        let json = snapshot.to_json_pretty().unwrap();
        assert!(json.contains("\"decision\""));
        assert!(json.contains("\"robustness\""));
    }
}
