//! Finite-difference sensitivity of hit probability to mission inputs.
//!
//! Functions take a `probe` that evaluates hit probability for a perturbed
//! config. Smoothing state for the live gradient belongs to the caller.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{
    ALTITUDE_PERTURBATION_M, GRADIENT_SMOOTHING_ALPHA, VELOCITY_PERTURBATION_MPS, WIND_PERTURBATION_MPS,
};
use crate::error::Result;
use crate::mission::EvaluationConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensitivityLevel {
    High,
    Moderate,
    Low,
}

impl SensitivityLevel {
    pub fn from_gradient(gradient: f64) -> Self {
        let g = gradient.abs();
        if g >= 0.05 {
            SensitivityLevel::High
        } else if g >= 0.02 {
            SensitivityLevel::Moderate
        } else {
            SensitivityLevel::Low
        }
    }
}

impl fmt::Display for SensitivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            SensitivityLevel::High => "High",
            SensitivityLevel::Moderate => "Moderate",
            SensitivityLevel::Low => "Low",
        };
        write!(f, "{name}")
    }
}

/// Perturbed mission input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskFactor {
    Wind,
    Altitude,
    Velocity,
}

impl fmt::Display for RiskFactor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            RiskFactor::Wind => "wind",
            RiskFactor::Altitude => "altitude",
            RiskFactor::Velocity => "velocity",
        };
        write!(f, "{name}")
    }
}

/// Single-axis wind gradient for live display
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiveSensitivity {
    pub wind_gradient_raw: f64,      // ΔP per m/s
    pub wind_gradient_smoothed: f64, // ΔP per m/s
    pub level: SensitivityLevel,
}

/// Gradients of hit probability per unit of each input
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensitivityMatrix {
    pub wind: f64,     // per m/s
    pub altitude: f64, // per m
    pub velocity: f64, // per m/s
}

impl SensitivityMatrix {
    pub fn gradient(&self, factor: RiskFactor) -> f64 {
        match factor {
            RiskFactor::Wind => self.wind,
            RiskFactor::Altitude => self.altitude,
            RiskFactor::Velocity => self.velocity,
        }
    }

    /// Factors ordered by descending absolute gradient; ties keep
    /// wind, altitude, velocity order
    pub fn ranked(&self) -> [RiskFactor; 3] {
        let mut factors = [RiskFactor::Wind, RiskFactor::Altitude, RiskFactor::Velocity];
        factors.sort_by(|a, b| {
            self.gradient(*b)
                .abs()
                .partial_cmp(&self.gradient(*a).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        factors
    }

    pub fn dominant_factor(&self) -> RiskFactor {
        self.ranked()[0]
    }
}

/// Exponentially smoothed gradient; the raw value when there is no history
pub fn smooth_gradient(raw: f64, previous: Option<f64>) -> f64 {
    match previous {
        Some(prev) => GRADIENT_SMOOTHING_ALPHA * raw + (1.0 - GRADIENT_SMOOTHING_ALPHA) * prev,
        None => raw,
    }
}

/// Fast wind sensitivity: one probe at `wind_x + 0.5 m/s`.
///
/// `config` should already carry the sample count the probe is to use.
pub fn live_wind_sensitivity<F>(
    p_base: f64,
    config: &EvaluationConfig,
    previous_gradient: Option<f64>,
    mut probe: F,
) -> Result<LiveSensitivity>
where
    F: FnMut(&EvaluationConfig) -> Result<f64>,
{
    let p_wind = probe(&config.with_wind_x_offset(WIND_PERTURBATION_MPS))?;
    let raw = (p_wind - p_base) / WIND_PERTURBATION_MPS;
    let smoothed = smooth_gradient(raw, previous_gradient);

    Ok(LiveSensitivity {
        wind_gradient_raw: raw,
        wind_gradient_smoothed: smoothed,
        level: SensitivityLevel::from_gradient(smoothed),
    })
}

/// Thorough sensitivity: wind, altitude and forward velocity probed in turn
pub fn sensitivity_matrix<F>(p_base: f64, config: &EvaluationConfig, mut probe: F) -> Result<SensitivityMatrix>
where
    F: FnMut(&EvaluationConfig) -> Result<f64>,
{
    let p_wind = probe(&config.with_wind_x_offset(WIND_PERTURBATION_MPS))?;
    let p_altitude = probe(&config.with_altitude_offset(ALTITUDE_PERTURBATION_M))?;
    let p_velocity = probe(&config.with_velocity_x_offset(VELOCITY_PERTURBATION_MPS))?;

    Ok(SensitivityMatrix {
        wind: (p_wind - p_base) / WIND_PERTURBATION_MPS,
        altitude: (p_altitude - p_base) / ALTITUDE_PERTURBATION_M,
        velocity: (p_velocity - p_base) / VELOCITY_PERTURBATION_MPS,
    })
}
