//! Error taxonomy for the simulation and decision engine.

use thiserror::Error;

/// Errors raised by the propagator, sampler, metrics and decision layers.
///
/// Statistical guard conditions (too few samples) are *not* errors; they force
/// a NO DROP decision instead.
#[derive(Debug, Error)]
pub enum AirdropError {
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },

    #[error("impact point set must not be empty")]
    EmptyImpactSet,

    #[error("unknown doctrine: {0}")]
    UnknownDoctrine(String),

    #[error("unknown decision policy mode: {0}")]
    UnknownPolicyMode(String),

    #[error("unknown payload shape: {0}")]
    UnknownPayloadShape(String),

    #[error("unknown analysis mode: {0}")]
    UnknownAnalysisMode(String),

    #[error("trajectory did not reach the ground after {steps} steps ({flight_time_s:.1} s of flight)")]
    NonTerminatingTrajectory { steps: usize, flight_time_s: f64 },

    #[error("invalid sampling distribution: {0}")]
    InvalidDistribution(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AirdropError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        AirdropError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AirdropError>;

/// Fail with `InvalidInput` unless `value` is finite and strictly positive.
pub(crate) fn require_positive(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AirdropError::invalid(field, format!("must be positive, got {value}")));
    }
    Ok(())
}

/// Fail with `InvalidInput` unless `value` is finite and not negative.
pub(crate) fn require_non_negative(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(AirdropError::invalid(field, format!("must be non-negative, got {value}")));
    }
    Ok(())
}
