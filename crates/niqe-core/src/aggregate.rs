//! Multivariate Gaussian fit and NIQE distance
//!
//! The distortion matrix is summarized by a mean and a covariance, then
//! compared with the pristine model:
//!
//! `sqrt((mu_p - mu_d) · pinv((cov_p + cov_d) / 2) · (mu_p - mu_d)ᵗ)`
//!
//! NaN handling is asymmetric. The mean ignores NaN entries column by
//! column, while the covariance drops every row that contains a NaN
//! anywhere.

use crate::error::{NiqeError, Result};
use crate::model::PristineModel;
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use tracing::{debug, warn};

/// Relative cut-off below which singular values are discarded
const PINV_RCOND: f64 = 1e-15;

/// Column means ignoring NaN entries; all-NaN columns give NaN
#[must_use]
pub fn nan_mean(distparam: &ArrayView2<f64>) -> Array1<f64> {
    distparam.map_axis(Axis(0), |column| {
        let (sum, count) = column
            .iter()
            .filter(|v| !v.is_nan())
            .fold((0.0, 0usize), |(s, n), &v| (s + v, n + 1));
        sum / count as f64
    })
}

/// Rows without any NaN entry, in their original order
#[must_use]
pub fn complete_rows(distparam: &ArrayView2<f64>) -> Array2<f64> {
    let keep: Vec<usize> = distparam
        .outer_iter()
        .enumerate()
        .filter(|(_, row)| row.iter().all(|v| !v.is_nan()))
        .map(|(i, _)| i)
        .collect();
    distparam.select(Axis(0), &keep)
}

/// Unbiased sample covariance with columns as variables
///
/// With fewer than two rows the `n - 1` normalization is undefined and every
/// entry is NaN.
#[must_use]
pub fn sample_covariance(rows: &ArrayView2<f64>) -> Array2<f64> {
    let (n, cols) = rows.dim();
    if n < 2 {
        return Array2::from_elem((cols, cols), f64::NAN);
    }
    let mean = rows.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(cols));
    let centered = rows - &mean.insert_axis(Axis(0));
    let mut cov = centered.t().dot(&centered);
    cov.mapv_inplace(|v| v / (n as f64 - 1.0));
    cov
}

/// Moore–Penrose pseudo-inverse via SVD
///
/// Singular values at or below `1e-15 · σ_max` are treated as zero, so
/// singular inputs do not fail.
///
/// # Errors
/// Returns `InvalidModel` if the matrix is not square
pub fn pseudo_inverse(matrix: &ArrayView2<f64>) -> Result<Array2<f64>> {
    let (rows, cols) = matrix.dim();
    if rows != cols {
        return Err(NiqeError::InvalidModel(format!(
            "pooled covariance must be square, got {rows}x{cols}"
        )));
    }

    let m = DMatrix::from_fn(rows, cols, |i, j| matrix[[i, j]]);
    let svd = m.svd(true, true);
    let cutoff = PINV_RCOND * svd.singular_values.max();
    let pinv = svd
        .pseudo_inverse(cutoff)
        .map_err(|e| NiqeError::InvalidModel(format!("pseudo-inverse failed: {e}")))?;

    Ok(Array2::from_shape_fn((rows, cols), |(i, j)| pinv[(i, j)]))
}

/// Multivariate Gaussian fitted to the block features of one image
#[derive(Debug, Clone)]
pub struct MultivariateGaussian {
    /// NaN-ignoring column means
    pub mean: Array1<f64>,
    /// Covariance over NaN-free rows
    pub cov: Array2<f64>,
    /// Blocks in the distortion matrix
    pub total_rows: usize,
    /// Blocks used for the covariance
    pub valid_rows: usize,
}

impl MultivariateGaussian {
    /// Fit mean and covariance to a distortion matrix
    ///
    /// # Errors
    /// Returns `EmptySampleCovariance` when fewer than two rows are NaN-free
    pub fn fit(distparam: &ArrayView2<f64>) -> Result<Self> {
        let total_rows = distparam.nrows();
        let mean = nan_mean(distparam);
        let complete = complete_rows(distparam);
        let valid_rows = complete.nrows();

        if valid_rows < total_rows {
            warn!(
                "Dropping {} of {} blocks with degenerate features from covariance",
                total_rows - valid_rows,
                total_rows
            );
        }
        if valid_rows < 2 {
            return Err(NiqeError::EmptySampleCovariance {
                total_rows,
                valid_rows,
            });
        }

        let cov = sample_covariance(&complete.view());
        debug!(
            "Fitted MVG: {} features over {} valid blocks",
            mean.len(),
            valid_rows
        );

        Ok(Self {
            mean,
            cov,
            total_rows,
            valid_rows,
        })
    }

    /// NIQE distance between this fit and the pristine model
    ///
    /// Negative quadratic forms from rounding are clamped to zero.
    ///
    /// # Errors
    /// Returns `InvalidModel` if the model does not have one entry per feature
    pub fn distance_to(&self, model: &PristineModel) -> Result<f64> {
        let n = self.mean.len();
        if model.mu_pris_param.len() != n || model.cov_pris_param.dim() != (n, n) {
            return Err(NiqeError::InvalidModel(format!(
                "model has {} means and {:?} covariance, features have {} columns",
                model.mu_pris_param.len(),
                model.cov_pris_param.dim(),
                n
            )));
        }

        let pooled = (&model.cov_pris_param + &self.cov) / 2.0;
        let inv = pseudo_inverse(&pooled.view())?;
        let diff = &model.mu_pris_param - &self.mean;
        let quality = quadratic_form(&diff.view(), &inv.view());

        Ok(if quality < 0.0 { 0.0 } else { quality.sqrt() })
    }
}

/// `v · m · vᵗ`
fn quadratic_form(v: &ArrayView1<f64>, m: &ArrayView2<f64>) -> f64 {
    let n = v.len();
    let vec = DVector::from_iterator(n, v.iter().copied());
    let mat = DMatrix::from_fn(n, n, |i, j| m[[i, j]]);
    vec.dot(&(mat * &vec))
}

/// NIQE score of a distortion matrix against the pristine model
///
/// # Errors
/// Returns `EmptySampleCovariance` or `InvalidModel`, see
/// [`MultivariateGaussian::fit`] and [`MultivariateGaussian::distance_to`]
pub fn niqe_quality(distparam: &ArrayView2<f64>, model: &PristineModel) -> Result<f64> {
    MultivariateGaussian::fit(distparam)?.distance_to(model)
}
