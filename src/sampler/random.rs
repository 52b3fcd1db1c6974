//! Random sampler implementation.

use parking_lot::Mutex;

use crate::distribution::Distribution;
use crate::param::ParamValue;
use crate::rng_util;
use crate::sampler::{FrozenTrial, Sampler};

/// A simple random sampler that samples uniformly from distributions.
///
/// This sampler ignores the trial history and samples uniformly at random,
/// respecting log scale and step size constraints. It is the default for
/// every study.
///
/// # Examples
///
/// ```
/// use docktuna::sampler::RandomSampler;
///
/// // Create with default RNG
/// let sampler = RandomSampler::new();
///
/// // Create with a fixed seed for reproducibility
/// let sampler = RandomSampler::with_seed(42);
/// ```
pub struct RandomSampler {
    rng: Mutex<fastrand::Rng>,
}

impl RandomSampler {
    /// Creates a new random sampler with a default random seed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::new()),
        }
    }

    /// Creates a new random sampler with a fixed seed for reproducibility.
    ///
    /// Using the same seed will produce the same sequence of sampled values.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        }
    }
}

impl Default for RandomSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for RandomSampler {
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn sample(
        &self,
        distribution: &Distribution,
        _trial_number: u64,
        _history: &[FrozenTrial],
    ) -> ParamValue {
        let mut rng = self.rng.lock();

        match distribution {
            Distribution::Float(d) => {
                let value = if d.log_scale {
                    let log_value = rng_util::f64_range(&mut rng, d.low.ln(), d.high.ln());
                    log_value.exp().clamp(d.low, d.high)
                } else if let Some(step) = d.step {
                    let n_steps = ((d.high - d.low) / step).floor() as i64;
                    let k = rng.i64(0..=n_steps);
                    d.low + (k as f64) * step
                } else {
                    rng_util::f64_range(&mut rng, d.low, d.high)
                };
                ParamValue::Float(value)
            }
            Distribution::Int(d) => {
                let value = if d.log_scale {
                    let log_low = (d.low as f64).ln();
                    let log_high = (d.high as f64).ln();
                    let log_value = rng_util::f64_range(&mut rng, log_low, log_high);
                    // Rounding can step outside the bounds.
                    (log_value.exp().round() as i64).clamp(d.low, d.high)
                } else if let Some(step) = d.step {
                    let n_steps = (d.high - d.low) / step;
                    let k = rng.i64(0..=n_steps);
                    d.low + k * step
                } else {
                    rng.i64(d.low..=d.high)
                };
                ParamValue::Int(value)
            }
            Distribution::Categorical(d) => {
                let index = rng.usize(0..d.choices.len());
                ParamValue::Str(d.choices[index].clone())
            }
            Distribution::Bool => ParamValue::Bool(rng.bool()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
mod tests {
    use super::*;
    use crate::distribution::{CategoricalDistribution, FloatDistribution, IntDistribution};

    #[test]
    fn test_random_sampler_float_log() {
        let sampler = RandomSampler::with_seed(42);
        let dist = Distribution::Float(FloatDistribution {
            low: 1e-5,
            high: 1e-1,
            log_scale: true,
            step: None,
        });

        for _ in 0..100 {
            let ParamValue::Float(v) = sampler.sample(&dist, 0, &[]) else {
                panic!("Expected Float value");
            };
            assert!((1e-5..=1e-1).contains(&v));
        }
    }

    #[test]
    fn test_random_sampler_float_step() {
        let sampler = RandomSampler::with_seed(42);
        let dist = Distribution::Float(FloatDistribution {
            low: 0.0,
            high: 1.0,
            log_scale: false,
            step: Some(0.25),
        });

        for _ in 0..100 {
            let ParamValue::Float(v) = sampler.sample(&dist, 0, &[]) else {
                panic!("Expected Float value");
            };
            assert!((0.0..=1.0).contains(&v));
            let k = (v / 0.25).round();
            assert!((v - k * 0.25).abs() < 1e-10);
        }
    }

    #[test]
    fn test_random_sampler_int_step() {
        let sampler = RandomSampler::with_seed(42);
        let dist = Distribution::Int(IntDistribution {
            low: 0,
            high: 10,
            log_scale: false,
            step: Some(2),
        });

        for _ in 0..100 {
            let ParamValue::Int(v) = sampler.sample(&dist, 0, &[]) else {
                panic!("Expected Int value");
            };
            assert!((0..=10).contains(&v));
            assert_eq!(v % 2, 0);
        }
    }

    #[test]
    fn test_random_sampler_categorical_returns_label() {
        let sampler = RandomSampler::with_seed(7);
        let dist = Distribution::Categorical(CategoricalDistribution {
            choices: vec!["Adam".to_string(), "SGD".to_string()],
        });

        for _ in 0..50 {
            match sampler.sample(&dist, 0, &[]) {
                ParamValue::Str(label) => assert!(label == "Adam" || label == "SGD"),
                other => panic!("Expected Str value, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_random_sampler_reproducibility() {
        let sampler1 = RandomSampler::with_seed(42);
        let sampler2 = RandomSampler::with_seed(42);
        let dist = Distribution::Int(IntDistribution {
            low: 8,
            high: 128,
            log_scale: false,
            step: None,
        });

        for _ in 0..10 {
            assert_eq!(sampler1.sample(&dist, 0, &[]), sampler2.sample(&dist, 0, &[]));
        }
    }
}
