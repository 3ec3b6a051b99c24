//! Gaussian noise generator.

use rand::Rng;

/// A zero-mean Gaussian noise source.
///
/// Samples are drawn with the Box-Muller transform from a uniform RNG. The
/// RNG is a type parameter so tests and the resynthesizer can use a seeded
/// generator while the rough-voice effect defaults to the thread RNG.
pub struct GaussianNoise<R: Rng = rand::rngs::ThreadRng> {
    /// Standard deviation of the generated samples
    sigma: f64,
    /// Random number generator
    rng: R,
    /// Second Box-Muller output, held for the next call
    spare: Option<f64>,
}

impl GaussianNoise<rand::rngs::ThreadRng> {
    /// Creates a noise generator with the default ThreadRng.
    ///
    /// # Arguments
    ///
    /// * `sigma` - Standard deviation of the samples
    ///
    /// # Examples
    ///
    /// ```
    /// use voxshift::dsp::GaussianNoise;
    ///
    /// let mut noise = GaussianNoise::new(0.05);
    /// let sample = noise.next_sample();
    /// assert!(sample.is_finite());
    /// ```
    pub fn new(sigma: f64) -> Self {
        Self::with_rng(sigma, rand::thread_rng())
    }
}

impl<R: Rng> GaussianNoise<R> {
    /// Creates a noise generator with a custom RNG.
    ///
    /// # Examples
    ///
    /// ```
    /// use voxshift::dsp::GaussianNoise;
    /// use rand::SeedableRng;
    ///
    /// let rng = rand::rngs::StdRng::seed_from_u64(42);
    /// let mut noise = GaussianNoise::with_rng(1.0, rng);
    /// let sample = noise.next_sample();
    /// ```
    pub fn with_rng(sigma: f64, rng: R) -> Self {
        Self {
            sigma,
            rng,
            spare: None,
        }
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Draws one sample.
    pub fn next_sample(&mut self) -> f64 {
        if let Some(spare) = self.spare.take() {
            return spare * self.sigma;
        }
        // u1 excludes zero so the logarithm stays finite
        let u1: f64 = self.rng.gen_range(f64::MIN_POSITIVE..1.0);
        let u2: f64 = self.rng.gen_range(0.0..1.0);
        let radius = (-2.0 * u1.ln()).sqrt();
        let angle = std::f64::consts::TAU * u2;
        self.spare = Some(radius * angle.sin());
        radius * angle.cos() * self.sigma
    }

    /// Adds noise to every sample in the buffer.
    pub fn add_to(&mut self, buffer: &mut [f64]) {
        for sample in buffer.iter_mut() {
            *sample += self.next_sample();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_statistics() {
        let mut noise = GaussianNoise::with_rng(0.5, StdRng::seed_from_u64(7));
        let samples: Vec<f64> = (0..20_000).map(|_| noise.next_sample()).collect();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let variance =
            samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / samples.len() as f64;
        assert!(mean.abs() < 0.02, "mean {}", mean);
        assert!((variance.sqrt() - 0.5).abs() < 0.02, "std {}", variance.sqrt());
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let mut a = GaussianNoise::with_rng(1.0, StdRng::seed_from_u64(3));
        let mut b = GaussianNoise::with_rng(1.0, StdRng::seed_from_u64(3));
        for _ in 0..100 {
            assert_eq!(a.next_sample(), b.next_sample());
        }
    }

    #[test]
    fn test_add_to_changes_buffer() {
        let mut noise = GaussianNoise::new(0.05);
        let mut buffer = vec![0.0; 128];
        noise.add_to(&mut buffer);
        assert!(buffer.iter().all(|s| s.is_finite()));
        assert!(buffer.iter().any(|&s| s != 0.0));
    }
}
