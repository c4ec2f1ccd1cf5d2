//! Miss topology of the impact cloud: where it drifts and how it is shaped.
//!
//! Offsets are measured from the target centre, so a cloud centred on the
//! target reports a zero mean offset.

use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::MIN_EIGENVALUE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriftAxis {
    Longitudinal,
    Lateral,
    Centered,
}

impl DriftAxis {
    pub fn from_offset(offset: &Vector2<f64>) -> Self {
        let (ax, ay) = (offset.x.abs(), offset.y.abs());
        if ax > ay {
            DriftAxis::Longitudinal
        } else if ay > ax {
            DriftAxis::Lateral
        } else {
            DriftAxis::Centered
        }
    }
}

impl fmt::Display for DriftAxis {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            DriftAxis::Longitudinal => "longitudinal",
            DriftAxis::Lateral => "lateral",
            DriftAxis::Centered => "centered",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispersionShape {
    Circular,
    #[serde(rename = "Moderate elongation")]
    ModerateElongation,
    #[serde(rename = "Strong elongation")]
    StrongElongation,
}

impl DispersionShape {
    pub fn from_eccentricity(ratio: f64) -> Self {
        if ratio < 1.2 {
            DispersionShape::Circular
        } else if ratio < 2.0 {
            DispersionShape::ModerateElongation
        } else {
            DispersionShape::StrongElongation
        }
    }
}

impl fmt::Display for DispersionShape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            DispersionShape::Circular => "Circular",
            DispersionShape::ModerateElongation => "Moderate elongation",
            DispersionShape::StrongElongation => "Strong elongation",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiveTopology {
    pub mean_offset: Vector2<f64>, // meters from target centre
    pub variance: Vector2<f64>,    // m², population variance per axis
    pub drift_axis: DriftAxis,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TopologyMatrix {
    pub mean_offset: Vector2<f64>,
    pub covariance: Matrix2<f64>,
    /// Descending
    pub eigenvalues: Vector2<f64>,
    /// Columns match `eigenvalues`
    pub eigenvectors: Matrix2<f64>,
    pub principal_axis_angle_deg: f64,
    pub eccentricity_ratio: f64,
    pub shape: DispersionShape,
}

fn mean_offset(points: &[Vector2<f64>], target: &Vector2<f64>) -> Vector2<f64> {
    let sum = points.iter().fold(Vector2::<f64>::zeros(), |acc, p| acc + p);
    sum / points.len() as f64 - target
}

/// Drift summary; `None` for fewer than two impacts
pub fn live_topology(points: &[Vector2<f64>], target: &Vector2<f64>) -> Option<LiveTopology> {
    if points.len() < 2 {
        return None;
    }
    let offset = mean_offset(points, target);
    let center = offset + target;
    let n = points.len() as f64;
    let variance = points
        .iter()
        .fold(Vector2::zeros(), |acc: Vector2<f64>, p| acc + (p - center).component_mul(&(p - center)))
        / n;

    Some(LiveTopology {
        mean_offset: offset,
        variance,
        drift_axis: DriftAxis::from_offset(&offset),
    })
}

/// Covariance eigen-decomposition of the impact cloud; `None` for fewer than
/// two impacts
pub fn topology_matrix(points: &[Vector2<f64>], target: &Vector2<f64>) -> Option<TopologyMatrix> {
    if points.len() < 2 {
        return None;
    }
    let offset = mean_offset(points, target);
    let center = offset + target;

    // Sample covariance (N − 1)
    let scatter = points.iter().fold(Matrix2::zeros(), |acc: Matrix2<f64>, p| {
        let d = p - center;
        acc + d * d.transpose()
    });
    let covariance = scatter / (points.len() - 1) as f64;

    let eigen = covariance.symmetric_eigen();
    let (first, second) = if eigen.eigenvalues[0] >= eigen.eigenvalues[1] { (0, 1) } else { (1, 0) };
    let eigenvalues = Vector2::new(eigen.eigenvalues[first], eigen.eigenvalues[second]);
    let eigenvectors = Matrix2::from_columns(&[
        eigen.eigenvectors.column(first).into_owned(),
        eigen.eigenvectors.column(second).into_owned(),
    ]);

    let lambda_max = eigenvalues[0].max(MIN_EIGENVALUE);
    let lambda_min = eigenvalues[1].max(MIN_EIGENVALUE);
    let eccentricity_ratio = (lambda_max / lambda_min).sqrt();
    let principal = eigenvectors.column(0);
    let principal_axis_angle_deg = principal[1].atan2(principal[0]).to_degrees();

    Some(TopologyMatrix {
        mean_offset: offset,
        covariance,
        eigenvalues,
        eigenvectors,
        principal_axis_angle_deg,
        eccentricity_ratio,
        shape: DispersionShape::from_eccentricity(eccentricity_ratio),
    })
}
