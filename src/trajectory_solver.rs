//! Point-mass payload propagation under gravity and quadratic drag.
//!
//! Frame: X forward, Y lateral, Z up. Drag acts against the velocity relative
//! to the air mass. Integration is explicit Euler (velocity first, then
//! position) and stops at the first step whose altitude is at or below zero.

use nalgebra::{Vector2, Vector3};

use crate::constants::{GRAVITY_MPS2, MAX_FLIGHT_TIME_S, MAX_INTEGRATION_STEPS};
use crate::error::{require_positive, AirdropError, Result};
use crate::mission::UavState;
use crate::payload::Payload;

/// Integration parameters shared by every trial of a run
#[derive(Debug, Clone, Copy)]
pub struct PropagationParams {
    pub payload: Payload,
    pub air_density: f64, // kg/m³
    pub dt: f64,          // seconds
}

impl PropagationParams {
    pub fn validate(&self) -> Result<()> {
        self.payload.validate()?;
        require_positive("air density", self.air_density)?;
        require_positive("dt", self.dt)?;
        Ok(())
    }

    /// Steps allowed before the trajectory is declared non-terminating
    fn max_steps(&self) -> usize {
        let by_time = (MAX_FLIGHT_TIME_S / self.dt).ceil();
        if by_time >= MAX_INTEGRATION_STEPS as f64 {
            MAX_INTEGRATION_STEPS
        } else {
            by_time as usize
        }
    }
}

// Trajectory point data
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryPoint {
    pub time: f64,
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
}

/// States after each integration step, ending at ground impact.
///
/// Empty when the release altitude is already at or below ground level.
#[derive(Debug, Clone, Default)]
pub struct Trajectory {
    pub points: Vec<TrajectoryPoint>,
}

impl Trajectory {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn impact(&self) -> Option<&TrajectoryPoint> {
        self.points.last()
    }

    /// Horizontal impact coordinates
    pub fn impact_xy(&self) -> Option<Vector2<f64>> {
        self.impact().map(|p| p.position.xy())
    }

    pub fn impact_speed(&self) -> Option<f64> {
        self.impact().map(|p| p.velocity.norm())
    }

    pub fn time_of_flight(&self) -> f64 {
        self.impact().map_or(0.0, |p| p.time)
    }

    pub fn max_height(&self) -> f64 {
        self.points
            .iter()
            .map(|p| p.position.z)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Aerodynamic drag force (N) for a given air-relative velocity.
///
/// F = -½·ρ·Cd·A·|v_rel|·v_rel, which is zero when the payload moves with the air.
pub fn drag_force(velocity_rel: &Vector3<f64>, air_density: f64, payload: &Payload) -> Vector3<f64> {
    let speed_rel = velocity_rel.norm();
    if speed_rel > 0.0 {
        *velocity_rel * (-0.5 * air_density * payload.drag_coefficient * payload.reference_area * speed_rel)
    } else {
        Vector3::zeros()
    }
}

/// Propagate one payload until ground impact, keeping every state
pub fn propagate_payload(
    release: &UavState,
    wind: &Vector3<f64>,
    params: &PropagationParams,
) -> Result<Trajectory> {
    let mut points = Vec::new();
    integrate(release, wind, params, |point| points.push(*point))?;
    Ok(Trajectory { points })
}

/// Propagate one payload and return only the impact state.
///
/// Follows exactly the same arithmetic as [`propagate_payload`] without
/// allocating the trajectory. `None` when the release is at or below ground.
pub fn propagate_to_impact(
    release: &UavState,
    wind: &Vector3<f64>,
    params: &PropagationParams,
) -> Result<Option<TrajectoryPoint>> {
    integrate(release, wind, params, |_| {})
}

fn integrate<F>(
    release: &UavState,
    wind: &Vector3<f64>,
    params: &PropagationParams,
    mut visit: F,
) -> Result<Option<TrajectoryPoint>>
where
    F: FnMut(&TrajectoryPoint),
{
    params.validate()?;

    let gravity = Vector3::new(0.0, 0.0, -GRAVITY_MPS2);
    let dt = params.dt;
    let max_steps = params.max_steps();

    let mut position = release.position;
    let mut velocity = release.velocity;
    let mut last = None;
    let mut step = 0usize;

    while position.z > 0.0 {
        if step >= max_steps {
            return Err(AirdropError::NonTerminatingTrajectory {
                steps: step,
                flight_time_s: step as f64 * dt,
            });
        }

        let velocity_rel = velocity - wind;
        let acceleration = gravity + drag_force(&velocity_rel, params.air_density, &params.payload) / params.payload.mass;

        // Update state
        velocity += acceleration * dt;
        position += velocity * dt;
        step += 1;

        let point = TrajectoryPoint {
            time: step as f64 * dt,
            position,
            velocity,
        };
        visit(&point);
        last = Some(point);
    }

    Ok(last)
}
