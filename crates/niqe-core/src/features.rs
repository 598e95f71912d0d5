//! Per-block NIQE feature vectors
//!
//! Each block contributes 18 values: the AGGD fit of the block itself
//! (shape, mean scale) followed by four fits of the block multiplied by a
//! circularly shifted copy of itself. Distortions disturb the regular
//! structure of products of neighbouring coefficients, which these pairwise
//! fits capture along horizontal, vertical and both diagonal orientations.

use crate::aggd::estimate_aggd_param;
use ndarray::{Array2, ArrayView2};

/// Number of features extracted from one block at one scale
pub const FEATURES_PER_SCALE: usize = 18;

/// Pairwise orientations as (row shift, column shift)
///
/// The order fixes the column layout expected by the pristine model.
pub const SHIFTS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// Toroidal shift of a 2D array along both axes
///
/// `out[i, j] = block[(i - dr) mod h, (j - dc) mod w]`
#[must_use]
pub fn circular_shift(block: &ArrayView2<f64>, shift: (isize, isize)) -> Array2<f64> {
    let (h, w) = block.dim();
    if h == 0 || w == 0 {
        return block.to_owned();
    }
    let (dr, dc) = shift;
    let (h_i, w_i) = (h as isize, w as isize);

    Array2::from_shape_fn((h, w), |(i, j)| {
        let src_i = (i as isize - dr).rem_euclid(h_i) as usize;
        let src_j = (j as isize - dc).rem_euclid(w_i) as usize;
        block[[src_i, src_j]]
    })
}

/// Compute the 18 features of one block
///
/// Layout: `[alpha, mean_beta]` then, for each entry of [`SHIFTS`],
/// `[alpha, mean, beta_left, beta_right]` of the pairwise product.
#[must_use]
pub fn compute_feature(block: &ArrayView2<f64>) -> Vec<f64> {
    let mut feat = Vec::with_capacity(FEATURES_PER_SCALE);

    let own = estimate_aggd_param(block);
    feat.extend([own.alpha, own.mean_beta()]);

    for shift in SHIFTS {
        let shifted = circular_shift(block, shift);
        let product = block * &shifted;
        let params = estimate_aggd_param(&product);
        feat.extend([
            params.alpha,
            params.distribution_mean(),
            params.beta_left,
            params.beta_right,
        ]);
    }

    feat
}
