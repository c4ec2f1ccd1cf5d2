/// Physical, statistical and analysis constants used by the drop engine

/// Gravitational acceleration in m/s²
pub const GRAVITY_MPS2: f64 = 9.81;

/// Standard air density at sea level (kg/m³)
pub const STANDARD_AIR_DENSITY: f64 = 1.225;

/// Default Euler integration step (s)
pub const DEFAULT_TIME_STEP_S: f64 = 0.01;

/// Maximum simulated flight time before a trajectory is declared non-terminating.
///
/// A payload released at a few hundred metres reaches the ground in well under a
/// minute; 600 s only trips for pathological inputs such as an updraft stronger
/// than the payload's terminal velocity.
pub const MAX_FLIGHT_TIME_S: f64 = 600.0;

/// Hard cap on integration steps regardless of dt
pub const MAX_INTEGRATION_STEPS: usize = 10_000_000;

// Statistical constants

/// Z-score for a ~95% two-sided confidence level
pub const WILSON_Z_95: f64 = 1.96;

/// Minimum Monte Carlo sample count for a drop decision to be considered valid
pub const MIN_VALID_SAMPLES: usize = 30;

/// Hysteresis dead band around the decision threshold (percentage points)
pub const HYSTERESIS_MARGIN_PCT: f64 = 1.0;

/// Minimum CI width used by the stability index and robustness classification
pub const STABILITY_EPSILON: f64 = 1e-6;

/// Upper clamp for the stability index
pub const MAX_STABILITY_INDEX: f64 = 100.0;

// Risk analysis tuning

/// Wind perturbation used for finite-difference sensitivity (m/s)
pub const WIND_PERTURBATION_MPS: f64 = 0.5;

/// Altitude perturbation used for finite-difference sensitivity (m)
pub const ALTITUDE_PERTURBATION_M: f64 = 5.0;

/// Forward velocity perturbation used for finite-difference sensitivity (m/s)
pub const VELOCITY_PERTURBATION_MPS: f64 = 2.0;

/// Exponential smoothing factor for the live wind gradient
pub const GRADIENT_SMOOTHING_ALPHA: f64 = 0.3;

/// Fraction of the configured sample count used by fast analyses
pub const FAST_SAMPLE_FRACTION: f64 = 0.3;

/// Fragility margin below which the decision sits at the edge (percentage points)
pub const EDGE_ZONE_MARGIN_PCT: f64 = 1.5;

/// Fragility margin at or above which the decision is stable (percentage points)
pub const STABLE_ZONE_MARGIN_PCT: f64 = 5.0;

/// Release corridor tolerance below threshold (percentage points)
pub const CORRIDOR_EPSILON_PCT: f64 = 0.5;

/// Release corridor sweep resolution (m)
pub const CORRIDOR_STEP_M: f64 = 1.0;

/// Half-width of the thorough release corridor sweep (m)
pub const CORRIDOR_SWEEP_HALF_WIDTH_M: i32 = 5;

/// Contribution weight gap under which the dominant factor is reported as mixed
pub const MIXED_DOMINANCE_GAP: f64 = 0.05;

/// Gradient sum below which contributions fall back to uniform weights
pub const MIN_GRADIENT_TOTAL: f64 = 1e-6;

/// Floor applied to covariance eigenvalues before forming the eccentricity ratio
pub const MIN_EIGENVALUE: f64 = 1e-12;

// Confidence index parameters

/// Wind uncertainty decay rate
pub const CONFIDENCE_WIND_DECAY: f64 = 0.35;

/// Reference ballistic coefficient (kg/m²) for a fully confident payload
pub const CONFIDENCE_BC_REFERENCE: f64 = 120.0;

/// Release altitude at which the altitude factor reaches zero (m)
pub const CONFIDENCE_ALTITUDE_LIMIT_M: f64 = 3000.0;

/// Telemetry older than this is considered stale (s)
pub const TELEMETRY_FRESHNESS_LIMIT_S: f64 = 5.0;

/// Relative CEP50 difference under which the dt-halving check passes
pub const DT_CONVERGENCE_TOLERANCE: f64 = 0.02;
