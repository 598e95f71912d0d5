//! Pristine multivariate Gaussian model
//!
//! The model is fitted offline on undistorted natural images and consumed
//! read-only here. It is stored as a JSON object holding the same three
//! named arrays as the published `.npz` parameter file: `mu_pris_param` (36 means,
//! either flat or as a single nested row), `cov_pris_param` (36x36) and
//! `gaussian_window` (7x7).

use crate::error::{NiqeError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Reference statistics of pristine natural images
#[derive(Debug, Clone)]
pub struct PristineModel {
    /// Feature means
    pub mu_pris_param: Array1<f64>,
    /// Feature covariance
    pub cov_pris_param: Array2<f64>,
    /// Smoothing window for local normalization
    pub gaussian_window: Array2<f64>,
}

/// Vector stored either flat or as a one-row matrix
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum RawVector {
    Flat(Vec<f64>),
    Nested(Vec<Vec<f64>>),
}

/// On-disk layout of [`PristineModel`]
#[derive(Debug, Serialize, Deserialize)]
struct RawModel {
    mu_pris_param: RawVector,
    cov_pris_param: Vec<Vec<f64>>,
    gaussian_window: Vec<Vec<f64>>,
}

fn nested_to_array2(name: &str, rows: Vec<Vec<f64>>) -> Result<Array2<f64>> {
    let nrows = rows.len();
    let ncols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != ncols) {
        return Err(NiqeError::InvalidModel(format!(
            "{name} rows have differing lengths"
        )));
    }
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((nrows, ncols), flat)
        .map_err(|e| NiqeError::InvalidModel(format!("{name}: {e}")))
}

impl PristineModel {
    /// Build a model, checking that the arrays fit together
    ///
    /// # Errors
    /// Returns `InvalidModel` if the covariance is not `n x n` for `n` means,
    /// the window is empty or has an even extent, or any value is not finite
    pub fn new(
        mu_pris_param: Array1<f64>,
        cov_pris_param: Array2<f64>,
        gaussian_window: Array2<f64>,
    ) -> Result<Self> {
        let n = mu_pris_param.len();
        if n == 0 {
            return Err(NiqeError::InvalidModel("mean vector is empty".to_string()));
        }
        if cov_pris_param.dim() != (n, n) {
            return Err(NiqeError::InvalidModel(format!(
                "covariance is {:?}, expected ({n}, {n})",
                cov_pris_param.dim()
            )));
        }

        let (wh, ww) = gaussian_window.dim();
        if wh == 0 || ww == 0 || wh % 2 == 0 || ww % 2 == 0 {
            return Err(NiqeError::InvalidModel(format!(
                "gaussian window must have odd, non-zero extents, got {wh}x{ww}"
            )));
        }

        let all_finite = mu_pris_param
            .iter()
            .chain(cov_pris_param.iter())
            .chain(gaussian_window.iter())
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(NiqeError::InvalidModel(
                "model contains non-finite values".to_string(),
            ));
        }

        Ok(Self {
            mu_pris_param,
            cov_pris_param,
            gaussian_window,
        })
    }

    /// Parse a model from its JSON representation
    ///
    /// # Errors
    /// Returns error on malformed JSON or inconsistent dimensions
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawModel = serde_json::from_str(json)?;

        let mean = match raw.mu_pris_param {
            RawVector::Flat(v) => v,
            RawVector::Nested(rows) if rows.len() == 1 => rows.into_iter().flatten().collect(),
            RawVector::Nested(rows) => {
                return Err(NiqeError::InvalidModel(format!(
                    "mu_pris_param must be a vector or a single row, got {} rows",
                    rows.len()
                )))
            }
        };

        Self::new(
            Array1::from(mean),
            nested_to_array2("cov_pris_param", raw.cov_pris_param)?,
            nested_to_array2("gaussian_window", raw.gaussian_window)?,
        )
    }

    /// Load a model from a JSON file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn from_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let model = Self::from_json_str(&contents)?;
        info!(
            "Loaded pristine model from {} ({} features, {:?} window)",
            path.display(),
            model.dimension(),
            model.gaussian_window.dim()
        );
        Ok(model)
    }

    /// Serialize to the JSON layout read by [`PristineModel::from_json_str`]
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json_string(&self) -> Result<String> {
        let raw = RawModel {
            mu_pris_param: RawVector::Flat(self.mu_pris_param.to_vec()),
            cov_pris_param: self
                .cov_pris_param
                .outer_iter()
                .map(|r| r.to_vec())
                .collect(),
            gaussian_window: self
                .gaussian_window
                .outer_iter()
                .map(|r| r.to_vec())
                .collect(),
        };
        Ok(serde_json::to_string(&raw)?)
    }

    /// Number of features the model describes
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.mu_pris_param.len()
    }
}
