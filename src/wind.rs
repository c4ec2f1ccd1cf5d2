use nalgebra::Vector3;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::{require_non_negative, AirdropError, Result};
use crate::mission::Environment;

/// Gaussian wind model: `mean + N(0, std)` drawn independently per axis
#[derive(Debug, Clone, Copy)]
pub struct WindModel {
    mean: Vector3<f64>,
    noise: Normal<f64>,
}

impl WindModel {
    pub fn new(mean: Vector3<f64>, std_dev: f64) -> Result<Self> {
        require_non_negative("wind std", std_dev)?;
        let noise = Normal::new(0.0, std_dev)
            .map_err(|e| AirdropError::InvalidDistribution(format!("wind noise: {e}")))?;
        Ok(Self { mean, noise })
    }

    pub fn from_environment(environment: &Environment) -> Result<Self> {
        Self::new(environment.wind_mean, environment.wind_std)
    }

    pub fn mean(&self) -> Vector3<f64> {
        self.mean
    }

    /// Draw one wind vector (m/s). Axes are drawn in x, y, z order.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vector3<f64> {
        let x = self.noise.sample(rng);
        let y = self.noise.sample(rng);
        let z = self.noise.sample(rng);
        self.mean + Vector3::new(x, y, z)
    }

    /// Draw `n` wind vectors sequentially from one stream.
    ///
    /// The draw order is fixed, so the same generator state always yields the
    /// same batch no matter how the batch is consumed afterwards.
    pub fn sample_batch<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Vec<Vector3<f64>> {
        (0..n).map(|_| self.sample(rng)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_zero_std_returns_mean() {
        let model = WindModel::new(Vector3::new(2.0, -1.0, 0.0), 0.0).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for w in model.sample_batch(&mut rng, 10) {
            assert_eq!(w, Vector3::new(2.0, -1.0, 0.0));
        }
    }

    #[test]
    fn test_negative_std_rejected() {
        assert!(WindModel::new(Vector3::zeros(), -0.5).is_err());
        assert!(WindModel::new(Vector3::zeros(), f64::NAN).is_err());
    }

    #[test]
    fn test_same_seed_same_batch() {
        let model = WindModel::new(Vector3::new(2.0, 0.0, 0.0), 0.8).unwrap();
        let a = model.sample_batch(&mut ChaCha8Rng::seed_from_u64(42), 50);
        let b = model.sample_batch(&mut ChaCha8Rng::seed_from_u64(42), 50);
        assert_eq!(a, b);
        let c = model.sample_batch(&mut ChaCha8Rng::seed_from_u64(43), 50);
        assert_ne!(a, c);
    }

    #[test]
    fn test_batch_statistics() {
        let model = WindModel::new(Vector3::new(3.0, 0.0, 0.0), 1.0).unwrap();
        let batch = model.sample_batch(&mut ChaCha8Rng::seed_from_u64(7), 20_000);
        let n = batch.len() as f64;
        let mean_x = batch.iter().map(|w| w.x).sum::<f64>() / n;
        let var_y = batch.iter().map(|w| w.y * w.y).sum::<f64>() / n;
        assert!((mean_x - 3.0).abs() < 0.05);
        assert!((var_y - 1.0).abs() < 0.05);
    }
}
