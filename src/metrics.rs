use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::constants::{
    CONFIDENCE_ALTITUDE_LIMIT_M, CONFIDENCE_BC_REFERENCE, CONFIDENCE_WIND_DECAY,
    TELEMETRY_FRESHNESS_LIMIT_S,
};
use crate::error::{require_positive, AirdropError, Result};

/// Summary of impact speed magnitudes (m/s)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpactVelocityStats {
    pub mean: f64,
    pub std: f64,
    pub p95: f64,
}

fn radial_distances(points: &[Vector2<f64>], center: &Vector2<f64>) -> Result<Vec<f64>> {
    if points.is_empty() {
        return Err(AirdropError::EmptyImpactSet);
    }
    Ok(points.iter().map(|p| (p - center).norm()).collect())
}

/// Number of impacts within `radius` of `center` (boundary counts as a hit)
pub fn count_hits(points: &[Vector2<f64>], center: &Vector2<f64>, radius: f64) -> Result<usize> {
    require_positive("target radius", radius)?;
    let distances = radial_distances(points, center)?;
    Ok(distances.iter().filter(|d| **d <= radius).count())
}

/// Fraction of impacts within the circular target
pub fn hit_probability(points: &[Vector2<f64>], center: &Vector2<f64>, radius: f64) -> Result<f64> {
    let hits = count_hits(points, center, radius)?;
    Ok(hits as f64 / points.len() as f64)
}

/// Circular error probable: median radial miss distance from `center`
pub fn cep50(points: &[Vector2<f64>], center: &Vector2<f64>) -> Result<f64> {
    let mut distances = radial_distances(points, center)?;
    sort_values(&mut distances);
    Ok(percentile(&distances, 0.50))
}

/// Mean, population standard deviation and 95th percentile of impact speeds.
/// An empty slice yields all zeros.
pub fn impact_velocity_stats(speeds: &[f64]) -> ImpactVelocityStats {
    if speeds.is_empty() {
        return ImpactVelocityStats::default();
    }
    let n = speeds.len() as f64;
    let mean = speeds.iter().sum::<f64>() / n;
    let variance = speeds.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;

    let mut sorted = speeds.to_vec();
    sort_values(&mut sorted);

    ImpactVelocityStats {
        mean,
        std: variance.sqrt(),
        p95: percentile(&sorted, 0.95),
    }
}

/// Decision-transparency score in [0, 1].
///
/// Equal-weight mean of a wind factor, a ballistic-coefficient factor
/// (0.5 when unknown), an altitude factor and a telemetry freshness factor
/// (stale or missing telemetry scores 0.5).
pub fn confidence_index(
    wind_std: f64,
    ballistic_coefficient: Option<f64>,
    altitude: f64,
    telemetry_age_s: Option<f64>,
) -> f64 {
    let wind_factor = (-CONFIDENCE_WIND_DECAY * wind_std).exp();
    let bc_factor = ballistic_coefficient.map_or(0.5, |bc| (bc / CONFIDENCE_BC_REFERENCE).clamp(0.0, 1.0));
    let altitude_factor = (1.0 - altitude / CONFIDENCE_ALTITUDE_LIMIT_M).clamp(0.0, 1.0);
    let telemetry_factor = match telemetry_age_s {
        Some(age) if age <= TELEMETRY_FRESHNESS_LIMIT_S => 1.0,
        _ => 0.5,
    };

    ((wind_factor + bc_factor + altitude_factor + telemetry_factor) / 4.0).clamp(0.0, 1.0)
}

pub(crate) fn sort_values(values: &mut [f64]) {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
}

/// Calculate percentile using linear interpolation
pub fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }

    let n = sorted_values.len();
    if n == 1 {
        return sorted_values[0];
    }

    let index = p.clamp(0.0, 1.0) * (n - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if lower == upper {
        sorted_values[lower]
    } else {
        let weight = index - lower as f64;
        sorted_values[lower] * (1.0 - weight) + sorted_values[upper] * weight
    }
}
