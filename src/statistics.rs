use serde::{Deserialize, Serialize};

use crate::error::{require_positive, AirdropError, Result};

/// Two-sided binomial confidence interval, both bounds in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub low: f64,
    pub high: f64,
}

impl ConfidenceInterval {
    pub fn width(&self) -> f64 {
        (self.high - self.low).max(0.0)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }
}

/// Wilson score interval for `hits` successes out of `trials`.
///
/// `trials == 0` returns the maximally uncertain interval (0, 1).
pub fn wilson_interval(hits: usize, trials: usize, z: f64) -> Result<ConfidenceInterval> {
    require_positive("z-score", z)?;
    if hits > trials {
        return Err(AirdropError::invalid(
            "hit count",
            format!("{hits} hits exceed {trials} trials"),
        ));
    }
    if trials == 0 {
        return Ok(ConfidenceInterval { low: 0.0, high: 1.0 });
    }

    let k = hits as f64;
    let n = trials as f64;
    let z2 = z * z;
    let denom = n + z2;
    let center = (k + 0.5 * z2) / denom;
    let radicand = (k * (n - k) / n + z2 / 4.0).max(0.0);
    let margin = (z / denom) * radicand.sqrt();

    Ok(ConfidenceInterval {
        low: (center - margin).clamp(0.0, 1.0),
        high: (center + margin).clamp(0.0, 1.0),
    })
}
