//! Nonparametric bootstrap of path-model estimates
//!
//! Every replicate resamples rows with replacement from a generator seeded
//! by `counter_rng_seed(seed, i)`, so replicate `i` is the same whether the
//! replicates run sequentially or on the rayon pool.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::base::{ModelError, Result};
use crate::inference::{normal_cdf, normal_quantile};
use crate::sem::estimate::{ObservedData, PointEstimates};
use crate::sem::{BootstrapCi, BootstrapConfig};
use po_core::data::quantile_sorted;
use po_core::syntax::ModelSpec;

/// Seed of replicate `counter` derived from a base seed (SplitMix64 finalizer)
pub fn counter_rng_seed(seed: u64, counter: u64) -> u64 {
    let mut z = seed ^ counter.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Successful replicates, one parameter vector each
#[derive(Debug, Clone)]
pub struct BootstrapDraws {
    /// `draws[r][j]` is parameter `j` in replicate `r`
    pub draws: Vec<Vec<f64>>,
    pub attempted: usize,
    pub failed: usize,
}

impl BootstrapDraws {
    /// All draws of parameter `j`
    pub fn column(&self, j: usize) -> Vec<f64> {
        self.draws.iter().map(|d| d[j]).collect()
    }

    pub fn successful(&self) -> usize {
        self.draws.len()
    }
}

/// Refit the model on `config.replicates` resamples
pub fn resample(
    spec: &ModelSpec,
    data: &ObservedData,
    config: &BootstrapConfig,
) -> Result<BootstrapDraws> {
    let n = data.n_obs();
    let seed = config.seed;

    let replicate = |i: usize| -> Option<Vec<f64>> {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(counter_rng_seed(seed, i as u64));
        let rows: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
        PointEstimates::compute(spec, &data.resample(&rows))
            .ok()
            .map(|e| e.parameter_vector())
    };

    #[cfg(feature = "parallel")]
    let outcomes: Vec<Option<Vec<f64>>> =
        (0..config.replicates).into_par_iter().map(replicate).collect();

    #[cfg(not(feature = "parallel"))]
    let outcomes: Vec<Option<Vec<f64>>> = (0..config.replicates).map(replicate).collect();

    let draws: Vec<Vec<f64>> = outcomes.into_iter().flatten().collect();
    let failed = config.replicates - draws.len();

    if draws.is_empty() {
        return Err(ModelError::BootstrapFailed {
            attempted: config.replicates,
        });
    }
    if failed > 0 {
        tracing::warn!(
            failed,
            attempted = config.replicates,
            "dropped bootstrap replicates that could not be refitted"
        );
    }
    tracing::debug!(replicates = draws.len(), seed, "bootstrap finished");

    Ok(BootstrapDraws {
        draws,
        attempted: config.replicates,
        failed,
    })
}

/// Sample standard deviation of the draws
pub fn standard_error(draws: &[f64]) -> f64 {
    let b = draws.len() as f64;
    if b < 2.0 {
        return f64::NAN;
    }
    let mean = draws.iter().sum::<f64>() / b;
    (draws.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / (b - 1.0)).sqrt()
}

/// Bootstrap confidence interval around `estimate`
pub fn confidence_interval(
    draws: &[f64],
    estimate: f64,
    level: f64,
    method: BootstrapCi,
) -> (f64, f64) {
    let mut sorted = draws.to_vec();
    sorted.sort_by(f64::total_cmp);
    let alpha = 1.0 - level;

    let (lower, upper) = match method {
        BootstrapCi::Percentile => (alpha / 2.0, 1.0 - alpha / 2.0),
        BootstrapCi::BiasCorrected => {
            let b = sorted.len() as f64;
            let below = sorted.iter().filter(|&&d| d < estimate).count() as f64;
            let floor = 1.0 / (2.0 * b);
            let z0 = normal_quantile((below / b).clamp(floor, 1.0 - floor));
            (
                normal_cdf(2.0 * z0 + normal_quantile(alpha / 2.0)),
                normal_cdf(2.0 * z0 + normal_quantile(1.0 - alpha / 2.0)),
            )
        }
    };

    (quantile_sorted(&sorted, lower), quantile_sorted(&sorted, upper))
}
