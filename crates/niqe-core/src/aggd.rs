//! Asymmetric generalized Gaussian (AGGD) parameter estimation
//!
//! Fits the shape `alpha` and the left/right scales of an AGGD to a sample by
//! moment matching. The shape is not solved for directly: the empirical
//! generalized Gaussian ratio is matched against a table of
//! `Γ(2/α)² / (Γ(1/α)·Γ(3/α))` precomputed once for every candidate `α` in
//! `[0.2, 10.0]` at a step of `0.001`.
//!
//! Degenerate samples (empty, all zero, or all of one sign) are not errors.
//! They yield NaN scales, and `alpha` then falls on the first grid value.

use ndarray::{ArrayBase, Data, Dimension};
use once_cell::sync::Lazy;
use statrs::function::gamma::gamma;
use tracing::debug;

/// Smallest candidate shape parameter
pub const ALPHA_MIN: f64 = 0.2;
/// Largest candidate shape parameter
pub const ALPHA_MAX: f64 = 10.0;
/// Spacing of the candidate grid
pub const ALPHA_STEP: f64 = 0.001;
/// Number of candidates in `[ALPHA_MIN, ALPHA_MAX]`
pub const ALPHA_CANDIDATES: usize = 9801;

/// Candidate shapes and their generalized Gaussian ratios, ascending in alpha
struct AlphaTable {
    alphas: Vec<f64>,
    r_gam: Vec<f64>,
}

impl AlphaTable {
    fn build() -> Self {
        let alphas: Vec<f64> = (0..ALPHA_CANDIDATES)
            .map(|i| ALPHA_MIN + i as f64 * ALPHA_STEP)
            .collect();
        let r_gam = alphas
            .iter()
            .map(|&alpha| {
                let recip = 1.0 / alpha;
                gamma(2.0 * recip).powi(2) / (gamma(recip) * gamma(3.0 * recip))
            })
            .collect();

        debug!("Built AGGD lookup table with {} candidates", ALPHA_CANDIDATES);
        Self { alphas, r_gam }
    }

    /// Candidate minimizing `(r_gam - target)²`, first occurrence on ties
    ///
    /// A NaN target makes every error NaN, which selects index 0.
    fn nearest(&self, target: f64) -> f64 {
        if target.is_nan() {
            return self.alphas[0];
        }

        let mut best = 0;
        let mut best_err = f64::INFINITY;
        for (i, &r) in self.r_gam.iter().enumerate() {
            let err = (r - target).powi(2);
            if err < best_err {
                best = i;
                best_err = err;
            }
        }
        self.alphas[best]
    }
}

static ALPHA_TABLE: Lazy<AlphaTable> = Lazy::new(AlphaTable::build);

/// Fitted AGGD parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggdParams {
    /// Shape, always a grid value in `[ALPHA_MIN, ALPHA_MAX]`
    pub alpha: f64,
    /// Left (negative side) scale, NaN when the sample has no negative values
    pub beta_left: f64,
    /// Right (positive side) scale, NaN when the sample has no positive values
    pub beta_right: f64,
}

impl AggdParams {
    /// Average of the two scales
    #[must_use]
    pub fn mean_beta(&self) -> f64 {
        (self.beta_left + self.beta_right) / 2.0
    }

    /// Mean of the fitted distribution: `(β_r − β_l) · Γ(2/α) / Γ(1/α)`
    #[must_use]
    pub fn distribution_mean(&self) -> f64 {
        (self.beta_right - self.beta_left) * (gamma(2.0 / self.alpha) / gamma(1.0 / self.alpha))
    }
}

/// Estimate AGGD parameters of a sample of any shape
///
/// The sample is treated as a flat sequence. NaN elements poison the moment
/// estimates and therefore the scales.
pub fn estimate_aggd_param<S, D>(block: &ArrayBase<S, D>) -> AggdParams
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let mut neg_sq_sum = 0.0;
    let mut neg_count = 0usize;
    let mut pos_sq_sum = 0.0;
    let mut pos_count = 0usize;
    let mut abs_sum = 0.0;
    let mut sq_sum = 0.0;

    for &x in block.iter() {
        let sq = x * x;
        if x < 0.0 {
            neg_sq_sum += sq;
            neg_count += 1;
        } else if x > 0.0 {
            pos_sq_sum += sq;
            pos_count += 1;
        }
        abs_sum += x.abs();
        sq_sum += sq;
    }

    // Means over empty sets are 0/0 = NaN
    let n = block.len() as f64;
    let left_std = (neg_sq_sum / neg_count as f64).sqrt();
    let right_std = (pos_sq_sum / pos_count as f64).sqrt();
    let gamma_hat = left_std / right_std;
    let r_hat = (abs_sum / n).powi(2) / (sq_sum / n);
    let r_hat_norm = r_hat * (gamma_hat.powi(3) + 1.0) * (gamma_hat + 1.0)
        / (gamma_hat.powi(2) + 1.0).powi(2);

    let alpha = ALPHA_TABLE.nearest(r_hat_norm);
    let scale = (gamma(1.0 / alpha) / gamma(3.0 / alpha)).sqrt();

    AggdParams {
        alpha,
        beta_left: left_std * scale,
        beta_right: right_std * scale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1, Array2};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn in_grid(alpha: f64) -> bool {
        let idx = ((alpha - ALPHA_MIN) / ALPHA_STEP).round();
        (0.0..ALPHA_CANDIDATES as f64).contains(&idx)
            && (ALPHA_MIN + idx * ALPHA_STEP - alpha).abs() < 1e-12
    }

    #[test]
    fn test_table_bounds() {
        let table = &*ALPHA_TABLE;
        assert_eq!(table.alphas.len(), ALPHA_CANDIDATES);
        assert!((table.alphas[0] - ALPHA_MIN).abs() < 1e-12);
        assert!((table.alphas[ALPHA_CANDIDATES - 1] - ALPHA_MAX).abs() < 1e-9);
        assert!(table.r_gam.iter().all(|r| r.is_finite() && *r > 0.0));
    }

    #[test]
    fn test_gaussian_ratio_at_two() {
        // alpha = 2 is the Gaussian: Γ(1)² / (Γ(1/2)·Γ(3/2)) = 2/π
        let idx = ((2.0 - ALPHA_MIN) / ALPHA_STEP).round() as usize;
        let r = ALPHA_TABLE.r_gam[idx];
        assert!((r - 2.0 / std::f64::consts::PI).abs() < 1e-9);
    }

    #[test]
    fn test_laplacian_ratio_at_one() {
        // alpha = 1: Γ(2)² / (Γ(1)·Γ(3)) = 1/2
        assert!((ALPHA_TABLE.nearest(0.5) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_gaussian_sample_fits_alpha_near_two() {
        let mut rng = StdRng::seed_from_u64(7);
        // Box-Muller standard normal sample
        let sample: Array1<f64> = (0..20_000)
            .map(|_| {
                let u1: f64 = rng.random_range(f64::EPSILON..1.0);
                let u2: f64 = rng.random();
                (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
            })
            .collect();

        let params = estimate_aggd_param(&sample);
        assert!((params.alpha - 2.0).abs() < 0.2, "alpha = {}", params.alpha);
        // For a Gaussian, beta = sigma * sqrt(Γ(1/2)/Γ(3/2)) = sigma * sqrt(2)
        assert!((params.beta_left - 2f64.sqrt()).abs() < 0.1);
        assert!((params.beta_right - 2f64.sqrt()).abs() < 0.1);
        assert!(params.distribution_mean().abs() < 0.1);
    }

    #[test]
    fn test_symmetric_block() {
        let block = array![[1.0, -1.0], [2.0, -2.0]];
        let params = estimate_aggd_param(&block);
        assert!(in_grid(params.alpha));
        assert!((params.beta_left - params.beta_right).abs() < 1e-12);
        assert!(params.distribution_mean().abs() < 1e-12);
    }

    #[test]
    fn test_all_zero_block_is_nan() {
        let block = Array2::<f64>::zeros((8, 8));
        let params = estimate_aggd_param(&block);
        assert!((params.alpha - ALPHA_MIN).abs() < 1e-12);
        assert!(params.beta_left.is_nan());
        assert!(params.beta_right.is_nan());
    }

    #[test]
    fn test_one_sided_blocks() {
        let positive = Array2::from_shape_fn((6, 6), |(i, j)| 1.0 + (i * 6 + j) as f64);
        let params = estimate_aggd_param(&positive);
        assert!(in_grid(params.alpha));
        assert!(params.beta_left.is_nan());
        assert!(params.beta_right >= 0.0);

        let negative = positive.mapv(|x| -x);
        let params = estimate_aggd_param(&negative);
        assert!(in_grid(params.alpha));
        assert!(params.beta_left >= 0.0);
        assert!(params.beta_right.is_nan());
    }

    #[test]
    fn test_empty_sample() {
        let empty = Array1::<f64>::zeros(0);
        let params = estimate_aggd_param(&empty);
        assert!(in_grid(params.alpha));
        assert!(params.beta_left.is_nan() && params.beta_right.is_nan());
    }

    #[test]
    fn test_random_blocks_stay_in_grid() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let block = Array2::from_shape_fn((16, 16), |_| rng.random_range(-3.0..3.0));
            let params = estimate_aggd_param(&block);
            assert!(in_grid(params.alpha));
            assert!(params.beta_left >= 0.0);
            assert!(params.beta_right >= 0.0);
        }
    }
}
