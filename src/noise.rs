//! Gaussian noise sources
//!
//! Box-Muller transform over ChaCha8. Each generator derives its own seed
//! from the master RNG so adding or removing one impairment never reshuffles
//! the noise another impairment sees.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f64::consts::PI;

/// Seeded white Gaussian noise with configurable power
pub struct GaussianNoise {
    /// Standard deviation (sqrt of configured power)
    std_dev: f64,
    rng: ChaCha8Rng,
    /// Cached second sample from Box-Muller
    cached: Option<f64>,
}

impl GaussianNoise {
    pub fn new(power: f64, seed_rng: &mut ChaCha8Rng) -> Self {
        let seed: u64 = seed_rng.gen();
        Self {
            std_dev: power.max(0.0).sqrt(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            cached: None,
        }
    }

    /// Next Gaussian sample, N(0, power)
    pub fn next_sample(&mut self) -> f64 {
        if let Some(cached) = self.cached.take() {
            return cached * self.std_dev;
        }

        let u1: f64 = self.rng.gen();
        let u2: f64 = self.rng.gen();

        // Avoid log(0)
        let u1 = u1.max(1e-12);

        let r = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * PI * u2;

        self.cached = Some(r * theta.sin());
        r * theta.cos() * self.std_dev
    }

    /// Fill a block of `n` samples
    pub fn fill(&mut self, n: usize) -> Vec<f64> {
        (0..n).map(|_| self.next_sample()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measured_power_tracks_config() {
        // The channel treats `power` as a variance, so a long block must
        // measure back within a few percent
        for &power in &[0.25, 2.0, 5.0] {
            let mut rng = ChaCha8Rng::seed_from_u64(9);
            let mut noise = GaussianNoise::new(power, &mut rng);
            let samples = noise.fill(40_000);

            let n = samples.len() as f64;
            let mean: f64 = samples.iter().sum::<f64>() / n;
            let variance: f64 = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

            // Mean of N draws has std sigma/sqrt(N); allow four of those
            assert!(
                mean.abs() < 4.0 * (power / n).sqrt(),
                "power {}: mean {}",
                power,
                mean
            );
            assert!(
                (variance / power - 1.0).abs() < 0.08,
                "power {}: variance {}",
                power,
                variance
            );
        }
    }

    #[test]
    fn test_deterministic_same_seed() {
        let mut rng1 = ChaCha8Rng::seed_from_u64(42);
        let mut rng2 = ChaCha8Rng::seed_from_u64(42);
        let mut n1 = GaussianNoise::new(0.5, &mut rng1);
        let mut n2 = GaussianNoise::new(0.5, &mut rng2);

        for _ in 0..200 {
            assert_eq!(n1.next_sample(), n2.next_sample());
        }
    }

    #[test]
    fn test_different_seeds_differ() {
        let mut rng1 = ChaCha8Rng::seed_from_u64(42);
        let mut rng2 = ChaCha8Rng::seed_from_u64(43);
        let mut n1 = GaussianNoise::new(1.0, &mut rng1);
        let mut n2 = GaussianNoise::new(1.0, &mut rng2);

        let a = n1.fill(100);
        let b = n2.fill(100);
        let diff = a
            .iter()
            .zip(b.iter())
            .filter(|(x, y)| (*x - *y).abs() > 1e-6)
            .count();
        assert!(diff > 90, "only {} samples differ", diff);
    }

    #[test]
    fn test_tail_mass_is_gaussian_and_symmetric() {
        let mut rng = ChaCha8Rng::seed_from_u64(314);
        let mut noise = GaussianNoise::new(1.0, &mut rng);
        let samples = noise.fill(80_000);
        let n = samples.len() as f64;

        // Two-sided tail fractions for a unit normal
        let beyond = |k: f64| samples.iter().filter(|&&x| x.abs() > k).count() as f64 / n;
        assert!((beyond(1.0) - 0.3173).abs() < 0.015, "1-sigma tail {}", beyond(1.0));
        assert!((beyond(2.0) - 0.0455).abs() < 0.006, "2-sigma tail {}", beyond(2.0));
        assert!(beyond(3.0) < 0.006, "3-sigma tail {}", beyond(3.0));

        let positive = samples.iter().filter(|&&x| x > 0.0).count() as f64 / n;
        assert!((positive - 0.5).abs() < 0.01, "sign balance {}", positive);
    }

    #[test]
    fn test_zero_power_is_silent() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut noise = GaussianNoise::new(0.0, &mut rng);
        for _ in 0..100 {
            assert_eq!(noise.next_sample(), 0.0);
        }
    }

    #[test]
    fn test_long_stream_stays_finite_and_bounded() {
        // The log argument is clamped, so the largest possible draw is
        // sqrt(-2 ln 1e-12), about 7.4 sigma
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut noise = GaussianNoise::new(1.0, &mut rng);
        let mut extreme = 0.0_f64;
        for _ in 0..200_000 {
            let x = noise.next_sample();
            assert!(x.is_finite());
            extreme = extreme.max(x.abs());
        }
        assert!(extreme < 7.5, "largest draw {}", extreme);
        assert!(extreme > 3.0, "stream never left the core: {}", extreme);
    }
}
