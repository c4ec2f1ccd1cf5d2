//! # Airdrop Engine
//!
//! Monte Carlo payload drop simulation with a drop / no-drop decision layer.
//!
//! A single evaluation propagates `N` point-mass payload trajectories under
//! sampled wind, scores the impact cloud against a circular target, applies a
//! doctrine to the Wilson interval of the hit probability and then stabilises
//! the decision with hysteresis. Optional risk analyses re-run the sampler
//! with perturbed inputs to characterise how close the decision is to flipping.

// Re-export the main types and functions
pub use analysis::{run_risk_analyses, run_risk_analyses_with, AnalysisMode, AnalysisOutcome, RiskAnalyses};
pub use diagnostics::{quick_stability_check, CheckStatus, StabilityCheck};
pub use doctrine::{evaluate_doctrine, Decision, Doctrine, DoctrineOutcome};
pub use error::{AirdropError, Result};
pub use live::{CycleOutcome, EvaluationState, LiveEvaluator, LiveLoop, TelemetryFrame};
pub use metrics::{cep50, confidence_index, hit_probability, impact_velocity_stats, ImpactVelocityStats};
pub use mission::{
    DecisionSettings, Environment, EvaluationConfig, PolicyMode, SimulationSettings, Target, ThresholdPolicy, UavState,
};
pub use monte_carlo::{
    run_monte_carlo, run_monte_carlo_sequential, run_monte_carlo_with_threads, with_thread_pool, MonteCarloParams,
    MonteCarloResults,
};
pub use payload::{Payload, PayloadShape, PayloadSpec, ShapeKind, ShapeSpec};
pub use pipeline::{evaluate, evaluate_raw, hit_probability_probe, EvaluationSnapshot};
pub use stability::{apply_hysteresis, enrich_snapshot, robustness_status, stability_index, Robustness};
pub use statistics::{wilson_interval, ConfidenceInterval};
pub use trajectory_solver::{propagate_payload, propagate_to_impact, PropagationParams, Trajectory, TrajectoryPoint};
pub use wind::WindModel;

// Module declarations
pub mod analysis;
pub mod constants;
pub mod diagnostics;
pub mod doctrine;
mod error;
pub mod fragility;
pub mod live;
pub mod metrics;
pub mod mission;
pub mod monte_carlo;
pub mod payload;
pub mod pipeline;
pub mod release_corridor;
pub mod sensitivity;
pub mod stability;
pub mod statistics;
pub mod topology;
pub mod trajectory_solver;
pub mod uncertainty;
pub mod wind;
