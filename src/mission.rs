//! Mission inputs and the immutable evaluation configuration.
//!
//! Every pipeline call takes an [`EvaluationConfig`] by reference. What-if
//! analyses build perturbed copies with the `with_*` constructors instead of
//! mutating shared state.

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::constants::{DEFAULT_TIME_STEP_S, STANDARD_AIR_DENSITY};
use crate::doctrine::Doctrine;
use crate::error::{require_non_negative, require_positive, AirdropError, Result};
use crate::payload::{Payload, PayloadSpec};

/// Circular drop zone on the ground plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Target {
    pub position: Vector2<f64>, // meters
    pub radius: f64,            // meters
}

impl Default for Target {
    fn default() -> Self {
        Self {
            position: Vector2::new(72.0, 0.0),
            radius: 5.0,
        }
    }
}

/// Gaussian wind model: mean vector plus isotropic per-axis standard deviation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Environment {
    pub wind_mean: Vector3<f64>, // m/s
    pub wind_std: f64,           // m/s
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            wind_mean: Vector3::new(2.0, 0.0, 0.0),
            wind_std: 0.8,
        }
    }
}

/// Carrier state at the moment of release. X forward, Y lateral, Z up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UavState {
    pub position: Vector3<f64>, // meters
    pub velocity: Vector3<f64>, // m/s
}

impl Default for UavState {
    fn default() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 100.0),
            velocity: Vector3::new(20.0, 0.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationSettings {
    pub n_samples: usize,
    pub random_seed: u64,
    pub dt: f64,          // seconds
    pub air_density: f64, // kg/m³
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            n_samples: 300,
            random_seed: 42,
            dt: DEFAULT_TIME_STEP_S,
            air_density: STANDARD_AIR_DENSITY,
        }
    }
}

/// Named decision policies with fixed hit-probability thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PolicyMode {
    Conservative,
    Balanced,
    Aggressive,
}

impl PolicyMode {
    pub fn threshold(&self) -> f64 {
        match self {
            PolicyMode::Conservative => 0.90,
            PolicyMode::Balanced => 0.75,
            PolicyMode::Aggressive => 0.60,
        }
    }
}

impl FromStr for PolicyMode {
    type Err = AirdropError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "conservative" => Ok(PolicyMode::Conservative),
            "balanced" => Ok(PolicyMode::Balanced),
            "aggressive" => Ok(PolicyMode::Aggressive),
            _ => Err(AirdropError::UnknownPolicyMode(s.to_string())),
        }
    }
}

impl TryFrom<String> for PolicyMode {
    type Error = AirdropError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<PolicyMode> for String {
    fn from(mode: PolicyMode) -> Self {
        mode.to_string()
    }
}

impl fmt::Display for PolicyMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            PolicyMode::Conservative => "Conservative",
            PolicyMode::Balanced => "Balanced",
            PolicyMode::Aggressive => "Aggressive",
        };
        write!(f, "{name}")
    }
}

/// Decision threshold: an explicit fraction or a named policy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThresholdPolicy {
    Fraction(f64),
    Named(PolicyMode),
}

impl ThresholdPolicy {
    /// Threshold as a fraction in [0, 1]
    pub fn resolve(&self) -> Result<f64> {
        match *self {
            ThresholdPolicy::Fraction(t) => {
                if !(0.0..=1.0).contains(&t) {
                    return Err(AirdropError::invalid(
                        "threshold",
                        format!("must be in [0, 1], got {t}"),
                    ));
                }
                Ok(t)
            }
            ThresholdPolicy::Named(mode) => Ok(mode.threshold()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecisionSettings {
    pub policy: ThresholdPolicy,
    pub doctrine: Doctrine,
}

impl Default for DecisionSettings {
    fn default() -> Self {
        Self {
            policy: ThresholdPolicy::Fraction(0.75),
            doctrine: Doctrine::Balanced,
        }
    }
}

/// Complete, self-contained input for one evaluation cycle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct EvaluationConfig {
    pub payload: Payload,
    pub target: Target,
    pub environment: Environment,
    pub uav: UavState,
    pub simulation: SimulationSettings,
    pub decision: DecisionSettings,
}

// JSON form of `EvaluationConfig`; the payload may be given by shape
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigDocument {
    payload: PayloadSpec,
    target: Target,
    environment: Environment,
    uav: UavState,
    simulation: SimulationSettings,
    decision: DecisionSettings,
}

impl ConfigDocument {
    fn resolve(self) -> Result<EvaluationConfig> {
        Ok(EvaluationConfig {
            payload: self.payload.resolve()?,
            target: self.target,
            environment: self.environment,
            uav: self.uav,
            simulation: self.simulation,
            decision: self.decision,
        })
    }
}

impl EvaluationConfig {
    /// Parse and validate a config. Unknown or misspelled keys are rejected.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let document: ConfigDocument = serde_json::from_str(json)?;
        let config = document.resolve()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject physically meaningless inputs before any numerical work is done
    pub fn validate(&self) -> Result<()> {
        self.payload.validate()?;
        require_positive("target radius", self.target.radius)?;
        if !self.target.position.iter().all(|v| v.is_finite()) {
            return Err(AirdropError::invalid("target position", "must be finite"));
        }
        if !self.environment.wind_mean.iter().all(|v| v.is_finite()) {
            return Err(AirdropError::invalid("wind mean", "must be finite"));
        }
        require_non_negative("wind std", self.environment.wind_std)?;
        if !self.uav.position.iter().chain(self.uav.velocity.iter()).all(|v| v.is_finite()) {
            return Err(AirdropError::invalid("uav state", "must be finite"));
        }
        if self.simulation.n_samples == 0 {
            return Err(AirdropError::invalid("n_samples", "must be greater than 0"));
        }
        require_positive("dt", self.simulation.dt)?;
        require_positive("air density", self.simulation.air_density)?;
        self.decision.policy.resolve()?;
        Ok(())
    }

    /// Decision threshold as a fraction in [0, 1]
    pub fn threshold(&self) -> Result<f64> {
        self.decision.policy.resolve()
    }

    // Perturbed copies for what-if evaluation

    pub fn with_wind_x_offset(mut self, delta_mps: f64) -> Self {
        self.environment.wind_mean.x += delta_mps;
        self
    }

    pub fn with_altitude_offset(mut self, delta_m: f64) -> Self {
        self.uav.position.z += delta_m;
        self
    }

    pub fn with_velocity_x_offset(mut self, delta_mps: f64) -> Self {
        self.uav.velocity.x += delta_mps;
        self
    }

    pub fn with_release_x_offset(mut self, delta_m: f64) -> Self {
        self.uav.position.x += delta_m;
        self
    }

    pub fn with_sample_count(mut self, n_samples: usize) -> Self {
        self.simulation.n_samples = n_samples;
        self
    }

    pub fn with_dt(mut self, dt: f64) -> Self {
        self.simulation.dt = dt;
        self
    }

    pub fn with_uav_state(mut self, position: Vector3<f64>, velocity: Vector3<f64>) -> Self {
        self.uav = UavState { position, velocity };
        self
    }

    pub fn with_wind(mut self, wind_mean: Vector3<f64>, wind_std: f64) -> Self {
        self.environment = Environment { wind_mean, wind_std };
        self
    }
}
