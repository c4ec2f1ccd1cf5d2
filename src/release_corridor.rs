//! Release corridor: the span of along-track release offsets over which hit
//! probability stays within tolerance of the decision threshold.

use serde::{Serialize, Serializer};
use std::fmt;

use crate::constants::{CORRIDOR_EPSILON_PCT, CORRIDOR_STEP_M, CORRIDOR_SWEEP_HALF_WIDTH_M};
use crate::error::Result;
use crate::mission::EvaluationConfig;

/// Corridor width; narrower than the sweep resolution is reported as `"<1.0"`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CorridorWidth {
    Meters(f64),
    SubResolution,
}

impl Serialize for CorridorWidth {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            CorridorWidth::Meters(m) => serializer.serialize_f64(*m),
            CorridorWidth::SubResolution => serializer.serialize_str("<1.0"),
        }
    }
}

impl fmt::Display for CorridorWidth {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CorridorWidth::Meters(m) => write!(f, "{m:.1} m"),
            CorridorWidth::SubResolution => write!(f, "<1.0 m"),
        }
    }
}

/// Fast corridor estimate from probes one step either side of the release point
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LiveCorridor {
    pub corridor_width_m: f64,
    pub margin_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CorridorSample {
    pub offset_m: f64,
    pub p_hit: f64,
    pub passes: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorridorSweep {
    pub min_offset_m: f64,
    pub max_offset_m: f64,
    pub corridor_width: CorridorWidth,
    pub samples: Vec<CorridorSample>,
}

/// Threshold fraction less the corridor tolerance
fn effective_threshold(threshold_pct: f64) -> f64 {
    (threshold_pct - CORRIDOR_EPSILON_PCT) / 100.0
}

/// Probe at ±1 step. Width is two steps when both sides pass, one when
/// either does, else zero.
///
/// `config` should already carry the reduced sample count.
pub fn live_release_corridor<F>(
    p_base: f64,
    threshold_pct: f64,
    config: &EvaluationConfig,
    mut probe: F,
) -> Result<LiveCorridor>
where
    F: FnMut(&EvaluationConfig) -> Result<f64>,
{
    let threshold_eff = effective_threshold(threshold_pct);
    let behind = probe(&config.with_release_x_offset(-CORRIDOR_STEP_M))? >= threshold_eff;
    let ahead = probe(&config.with_release_x_offset(CORRIDOR_STEP_M))? >= threshold_eff;

    let corridor_width_m = match (behind, ahead) {
        (true, true) => 2.0 * CORRIDOR_STEP_M,
        (true, false) | (false, true) => CORRIDOR_STEP_M,
        (false, false) => 0.0,
    };

    Ok(LiveCorridor {
        corridor_width_m,
        margin_pct: (p_base - threshold_pct / 100.0) * 100.0,
    })
}

/// Longest run of consecutive passing samples as (start, end) indices.
/// Ties go to the run closest to zero offset.
fn longest_passing_run(samples: &[CorridorSample]) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize)> = None;
    let mut start = None;

    let distance_to_zero = |(s, e): (usize, usize)| {
        let (lo, hi) = (samples[s].offset_m, samples[e].offset_m);
        if lo <= 0.0 && hi >= 0.0 {
            0.0
        } else {
            lo.abs().min(hi.abs())
        }
    };

    for (i, sample) in samples.iter().enumerate() {
        match (sample.passes, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                best = pick_run(best, (s, i - 1), &distance_to_zero);
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        best = pick_run(best, (s, samples.len() - 1), &distance_to_zero);
    }
    best
}

fn pick_run<D>(best: Option<(usize, usize)>, candidate: (usize, usize), distance: &D) -> Option<(usize, usize)>
where
    D: Fn((usize, usize)) -> f64,
{
    let Some(current) = best else {
        return Some(candidate);
    };
    let len = |(s, e): (usize, usize)| e - s;
    if len(candidate) > len(current)
        || (len(candidate) == len(current) && distance(candidate) < distance(current))
    {
        Some(candidate)
    } else {
        Some(current)
    }
}

/// Sweep integer offsets in ±5 m at the config's full sample count
pub fn sweep_release_corridor<F>(threshold_pct: f64, config: &EvaluationConfig, mut probe: F) -> Result<CorridorSweep>
where
    F: FnMut(&EvaluationConfig) -> Result<f64>,
{
    let threshold_eff = effective_threshold(threshold_pct);

    let mut samples = Vec::new();
    for step in -CORRIDOR_SWEEP_HALF_WIDTH_M..=CORRIDOR_SWEEP_HALF_WIDTH_M {
        let offset_m = f64::from(step) * CORRIDOR_STEP_M;
        let p_hit = probe(&config.with_release_x_offset(offset_m))?;
        samples.push(CorridorSample {
            offset_m,
            p_hit,
            passes: p_hit >= threshold_eff,
        });
    }

    let (min_offset_m, max_offset_m, corridor_width) = match longest_passing_run(&samples) {
        None => (0.0, 0.0, CorridorWidth::Meters(0.0)),
        Some((s, e)) => {
            let (lo, hi) = (samples[s].offset_m, samples[e].offset_m);
            let width = hi - lo;
            let width = if width < CORRIDOR_STEP_M {
                CorridorWidth::SubResolution
            } else {
                CorridorWidth::Meters(width)
            };
            (lo, hi, width)
        }
    };

    Ok(CorridorSweep {
        min_offset_m,
        max_offset_m,
        corridor_width,
        samples,
    })
}
