//! Risk-characterization analyses run after a base evaluation.
//!
//! Each analysis re-runs the Monte Carlo pipeline with perturbed copies of
//! the config through a hit-probability probe. Fast mode trades accuracy for
//! responsiveness with a reduced sample budget and a smoothed live gradient;
//! thorough mode uses the full budget and the complete perturbation grid.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use crate::constants::{FAST_SAMPLE_FRACTION, MIN_VALID_SAMPLES};
use crate::error::{AirdropError, Result};
use crate::fragility::{assess_fragility, FragilityState};
use crate::mission::EvaluationConfig;
use crate::pipeline::{hit_probability_probe, EvaluationSnapshot};
use crate::release_corridor::{live_release_corridor, sweep_release_corridor, CorridorSweep, LiveCorridor};
use crate::sensitivity::{live_wind_sensitivity, sensitivity_matrix, LiveSensitivity, SensitivityMatrix};
use crate::topology::{live_topology, topology_matrix, LiveTopology, TopologyMatrix};
use crate::uncertainty::{decompose_uncertainty, DominantFactor, UncertaintyContribution};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    Fast,
    Thorough,
}

impl FromStr for AnalysisMode {
    type Err = AirdropError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "fast" | "standard" | "live" => Ok(AnalysisMode::Fast),
            "thorough" | "advanced" | "analytical" => Ok(AnalysisMode::Thorough),
            _ => Err(AirdropError::UnknownAnalysisMode(s.to_string())),
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AnalysisMode::Fast => write!(f, "fast"),
            AnalysisMode::Thorough => write!(f, "thorough"),
        }
    }
}

/// Optional analysis results attached to a snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RiskAnalyses {
    pub mode: Option<AnalysisMode>,
    pub sensitivity_live: Option<LiveSensitivity>,
    pub sensitivity_matrix: Option<SensitivityMatrix>,
    pub dominant_risk_factor: Option<DominantFactor>,
    pub topology_live: Option<LiveTopology>,
    pub topology_matrix: Option<TopologyMatrix>,
    pub corridor_live: Option<LiveCorridor>,
    pub corridor_sweep: Option<CorridorSweep>,
    pub fragility: Option<FragilityState>,
    pub uncertainty: Option<UncertaintyContribution>,
    /// Monte Carlo re-runs spent on the analyses
    pub probe_runs: usize,
}

impl RiskAnalyses {
    pub fn is_empty(&self) -> bool {
        self.mode.is_none()
    }
}

/// Analyses plus the smoothed wind gradient to carry into the next cycle
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub analyses: RiskAnalyses,
    pub updated_gradient: Option<f64>,
}

/// Sample budget for fast-mode probes
pub fn reduced_sample_count(n_samples: usize) -> usize {
    ((n_samples as f64 * FAST_SAMPLE_FRACTION) as usize).max(MIN_VALID_SAMPLES)
}

/// Run every analysis for `mode` against `snapshot` using `probe` for re-runs.
///
/// Order: sensitivity, topology, release corridor, fragility, and (thorough
/// only) uncertainty decomposition. Fragility reuses the sensitivity gradient.
pub fn run_risk_analyses_with<F>(
    snapshot: &EvaluationSnapshot,
    config: &EvaluationConfig,
    mode: AnalysisMode,
    previous_gradient: Option<f64>,
    mut probe: F,
) -> Result<AnalysisOutcome>
where
    F: FnMut(&EvaluationConfig) -> Result<f64>,
{
    let p_base = snapshot.p_hit;
    let threshold_pct = snapshot.threshold_pct;
    let target = snapshot.target.position;
    let mut runs = 0usize;
    let mut counted = |c: &EvaluationConfig| {
        runs += 1;
        probe(c)
    };

    let mut analyses = RiskAnalyses {
        mode: Some(mode),
        ..RiskAnalyses::default()
    };
    let mut updated_gradient = None;

    match mode {
        AnalysisMode::Fast => {
            let reduced = config.with_sample_count(reduced_sample_count(config.simulation.n_samples));

            let live = live_wind_sensitivity(p_base, &reduced, previous_gradient, &mut counted)?;
            updated_gradient = Some(live.wind_gradient_smoothed);
            analyses.sensitivity_live = Some(live);

            analyses.topology_live = live_topology(&snapshot.impact_points, &target);
            analyses.corridor_live = Some(live_release_corridor(p_base, threshold_pct, &reduced, &mut counted)?);
            analyses.fragility = Some(assess_fragility(
                p_base,
                threshold_pct,
                updated_gradient,
                &reduced,
                &mut counted,
            )?);
        }
        AnalysisMode::Thorough => {
            let matrix = sensitivity_matrix(p_base, config, &mut counted)?;
            analyses.sensitivity_matrix = Some(matrix);
            analyses.dominant_risk_factor = Some(matrix.dominant_factor().into());

            analyses.topology_matrix = topology_matrix(&snapshot.impact_points, &target);
            analyses.corridor_sweep = Some(sweep_release_corridor(threshold_pct, config, &mut counted)?);
            analyses.fragility = Some(assess_fragility(
                p_base,
                threshold_pct,
                Some(matrix.wind),
                config,
                &mut counted,
            )?);

            let contribution = decompose_uncertainty(&matrix);
            if contribution.dominant == DominantFactor::Mixed {
                analyses.dominant_risk_factor = Some(DominantFactor::Mixed);
            }
            analyses.uncertainty = Some(contribution);
        }
    }

    analyses.probe_runs = runs;
    debug!(mode = %mode, probe_runs = runs, "risk analyses complete");
    Ok(AnalysisOutcome {
        analyses,
        updated_gradient,
    })
}

/// Run the analyses with the Monte Carlo pipeline as the probe and attach
/// them to the snapshot.
///
/// Returns the enriched snapshot and the smoothed wind gradient (fast mode).
pub fn run_risk_analyses(
    snapshot: EvaluationSnapshot,
    config: &EvaluationConfig,
    mode: AnalysisMode,
    previous_gradient: Option<f64>,
) -> Result<(EvaluationSnapshot, Option<f64>)> {
    let outcome = run_risk_analyses_with(&snapshot, config, mode, previous_gradient, hit_probability_probe)?;
    info!(
        mode = %mode,
        total_calls = outcome.analyses.probe_runs + 1,
        "[MC SUMMARY] analyses attached"
    );
    Ok((snapshot.with_analyses(outcome.analyses), outcome.updated_gradient))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragility::FragilityZone;
    use crate::pipeline::evaluate;
    use crate::release_corridor::CorridorWidth;

    fn base_snapshot(n: usize) -> (EvaluationConfig, EvaluationSnapshot) {
        let config = EvaluationConfig::default().with_sample_count(n);
        let snapshot = evaluate(&config, None).unwrap();
        (config, snapshot)
    }

    #[test]
    fn test_reduced_sample_count() {
        assert_eq!(reduced_sample_count(300), 90);
        assert_eq!(reduced_sample_count(1000), 300);
        assert_eq!(reduced_sample_count(50), 30);
        assert_eq!(reduced_sample_count(0), 30);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("standard".parse::<AnalysisMode>().unwrap(), AnalysisMode::Fast);
        assert_eq!("ADVANCED".parse::<AnalysisMode>().unwrap(), AnalysisMode::Thorough);
        assert!(matches!(
            "exhaustive".parse::<AnalysisMode>(),
            Err(AirdropError::UnknownAnalysisMode(_))
        ));
    }

    #[test]
    fn test_fast_mode_with_fake_probe() {
        let (config, snapshot) = base_snapshot(60);
        let mut sample_counts = Vec::new();
        let outcome = run_risk_analyses_with(&snapshot, &config, AnalysisMode::Fast, None, |c| {
            sample_counts.push(c.simulation.n_samples);
            Ok(snapshot.p_hit)
        })
        .unwrap();

        let analyses = outcome.analyses;
        // Sensitivity (1) + corridor (2); fragility reuses the gradient
        assert_eq!(analyses.probe_runs, 3);
        assert!(sample_counts.iter().all(|n| *n == 30));
        assert_eq!(outcome.updated_gradient, Some(0.0));
        assert!(analyses.sensitivity_live.is_some());
        assert!(analyses.topology_live.is_some());
        assert!(analyses.corridor_live.is_some());
        assert!(analyses.fragility.is_some());
        assert!(analyses.sensitivity_matrix.is_none());
        assert!(analyses.uncertainty.is_none());
    }

    #[test]
    fn test_thorough_mode_with_fake_probe() {
        let (config, snapshot) = base_snapshot(60);
        let outcome = run_risk_analyses_with(&snapshot, &config, AnalysisMode::Thorough, None, |c| {
            assert_eq!(c.simulation.n_samples, 60);
            Ok(0.9)
        })
        .unwrap();

        let analyses = outcome.analyses;
        // Matrix (3) + sweep (11)
        assert_eq!(analyses.probe_runs, 14);
        assert!(outcome.updated_gradient.is_none());
        assert!(analyses.topology_matrix.is_some());
        let sweep = analyses.corridor_sweep.unwrap();
        assert_eq!(sweep.corridor_width, CorridorWidth::Meters(10.0));
        assert!(analyses.uncertainty.is_some());
        assert!(analyses.fragility.is_some());
    }

    #[test]
    fn test_fragility_uses_sensitivity_gradient() {
        let (config, mut snapshot) = base_snapshot(60);
        snapshot.p_hit = 0.5;
        snapshot.threshold_pct = 75.0;
        let outcome = run_risk_analyses_with(&snapshot, &config, AnalysisMode::Fast, Some(0.1), |_| Ok(0.5)).unwrap();
        let fragility = outcome.analyses.fragility.unwrap();
        // Smoothed: 0.3 * 0 + 0.7 * 0.1
        assert!((fragility.slope_margin - 0.07).abs() < 1e-12);
        assert_eq!(fragility.zone, FragilityZone::EdgeZone);
    }

    #[test]
    fn test_real_pipeline_analyses_attach() {
        let (config, snapshot) = base_snapshot(60);
        let (enriched, gradient) = run_risk_analyses(snapshot.clone(), &config, AnalysisMode::Fast, None).unwrap();
        assert!(gradient.is_some());
        assert_eq!(enriched.p_hit, snapshot.p_hit);
        assert_eq!(enriched.decision, snapshot.decision);
        assert_eq!(enriched.analyses.mode, Some(AnalysisMode::Fast));
    }
}
