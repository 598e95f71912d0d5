//! No-reference image quality assessment with NIQE
//!
//! NIQE (Natural Image Quality Evaluator, "Making a Completely Blind Image
//! Quality Analyzer") scores an image by how far the statistics of its local
//! patches drift from a multivariate Gaussian model of pristine natural
//! images. Lower scores mean better perceptual quality.
//!
//! # Pipeline
//! - [`multiscale`]: crop to whole blocks, normalize by the local mean and
//!   deviation, extract 18 features per block at full and half resolution
//! - [`features`]: AGGD fits of each block and of its pairwise products
//! - [`aggd`]: moment-matching AGGD estimator backed by a shared lookup table
//! - [`aggregate`]: NaN-aware Gaussian fit and the distance to the model
//!
//! No ML runtime is involved, the computation is deterministic and
//! single-threaded; score independent images in parallel if needed.
//!
//! # Example
//! ```no_run
//! use niqe_core::{NiqeAssessor, NiqeConfig, PristineModel};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let model = PristineModel::from_json("models/niqe_pris_params.json")?;
//! let assessor = NiqeAssessor::new(model, NiqeConfig::default())?;
//!
//! let assessment = assessor.assess_path("image.png")?;
//! println!("NIQE: {:.4} ({} blocks)", assessment.score, assessment.num_blocks);
//! # Ok(())
//! # }
//! ```

pub mod aggd;
pub mod aggregate;
pub mod config;
pub mod error;
pub mod features;
pub mod filter;
pub mod luma;
pub mod model;
pub mod multiscale;
pub mod resize;

pub use aggd::{estimate_aggd_param, AggdParams};
pub use aggregate::{niqe_quality, MultivariateGaussian};
pub use config::{LumaMode, NiqeConfig, DEFAULT_BLOCK_SIZE_H, DEFAULT_BLOCK_SIZE_W};
pub use error::{NiqeError, Result};
pub use features::{compute_feature, FEATURES_PER_SCALE};
pub use model::PristineModel;
pub use multiscale::{distortion_params, DISTORTION_FEATURES};

use image::DynamicImage;
use ndarray::{ArrayView2, ArrayViewD, Ix2};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Compute the NIQE score of a single-channel image
///
/// `image` holds grey or luma values in [0, 255]. Colour conversion, border
/// cropping and rounding are the caller's job (see [`luma::prepare`]).
///
/// # Errors
/// - `InvalidShape` if the image is smaller than one block
/// - `EmptySampleCovariance` if too few blocks have finite features
/// - `InvalidModel` if the model does not describe 36 features
pub fn niqe(
    image: &ArrayView2<f64>,
    model: &PristineModel,
    block_size_h: usize,
    block_size_w: usize,
) -> Result<f64> {
    let distparam = distortion_params(
        image,
        &model.gaussian_window.view(),
        block_size_h,
        block_size_w,
    )?;
    niqe_quality(&distparam.view(), model)
}

/// [`niqe`] for arrays whose rank is only known at runtime
///
/// # Errors
/// Returns `InvalidShape` unless `image` is exactly 2-dimensional, then as
/// [`niqe`]
pub fn niqe_dyn(
    image: &ArrayViewD<f64>,
    model: &PristineModel,
    block_size_h: usize,
    block_size_w: usize,
) -> Result<f64> {
    let image = image
        .view()
        .into_dimensionality::<Ix2>()
        .map_err(|_| NiqeError::InvalidShape {
            shape: image.shape().to_vec(),
            block_size_h,
            block_size_w,
            reason: "expected a grey or luma image with shape (h, w)".to_string(),
        })?;
    niqe(&image, model, block_size_h, block_size_w)
}

/// Result of a NIQE assessment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NiqeAssessment {
    /// NIQE score (lower is better)
    pub score: f64,
    /// Blocks in the distortion matrix
    pub num_blocks: usize,
    /// Blocks with finite features used for the covariance
    pub valid_blocks: usize,
    /// Block height used
    pub block_size_h: usize,
    /// Block width used
    pub block_size_w: usize,
}

/// NIQE scorer bound to a pristine model and configuration
#[derive(Debug, Clone)]
pub struct NiqeAssessor {
    model: PristineModel,
    config: NiqeConfig,
}

impl NiqeAssessor {
    /// Create a new assessor
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the configuration is invalid, or
    /// `InvalidModel` if the model does not describe 36 features
    pub fn new(model: PristineModel, config: NiqeConfig) -> Result<Self> {
        config.validate()?;
        if model.dimension() != DISTORTION_FEATURES {
            return Err(NiqeError::InvalidModel(format!(
                "expected {} features, model has {}",
                DISTORTION_FEATURES,
                model.dimension()
            )));
        }
        debug!(
            "NIQE assessor ready ({}x{} blocks)",
            config.block_size_h, config.block_size_w
        );
        Ok(Self { model, config })
    }

    /// Create an assessor from a JSON model file and an optional YAML config
    ///
    /// # Errors
    /// Returns error if either file cannot be loaded
    pub fn from_files(
        model_path: impl AsRef<Path>,
        config_path: Option<&Path>,
    ) -> Result<Self> {
        let model = PristineModel::from_json(model_path)?;
        let config = match config_path {
            Some(path) => NiqeConfig::from_yaml(path)?,
            None => NiqeConfig::default(),
        };
        Self::new(model, config)
    }

    /// Configuration in use
    #[must_use]
    pub fn config(&self) -> &NiqeConfig {
        &self.config
    }

    /// Pristine model in use
    #[must_use]
    pub fn model(&self) -> &PristineModel {
        &self.model
    }

    /// Assess an already prepared single-channel image
    ///
    /// # Errors
    /// See [`niqe`]
    pub fn assess_array(&self, image: &ArrayView2<f64>) -> Result<NiqeAssessment> {
        let distparam = distortion_params(
            image,
            &self.model.gaussian_window.view(),
            self.config.block_size_h,
            self.config.block_size_w,
        )?;
        let mvg = MultivariateGaussian::fit(&distparam.view())?;
        let score = mvg.distance_to(&self.model)?;

        info!(
            "NIQE score {:.4} over {} blocks ({} valid)",
            score, mvg.total_rows, mvg.valid_rows
        );

        Ok(NiqeAssessment {
            score,
            num_blocks: mvg.total_rows,
            valid_blocks: mvg.valid_rows,
            block_size_h: self.config.block_size_h,
            block_size_w: self.config.block_size_w,
        })
    }

    /// Assess a decoded image, converting it to luma first
    ///
    /// # Errors
    /// See [`luma::prepare`] and [`niqe`]
    pub fn assess(&self, image: &DynamicImage) -> Result<NiqeAssessment> {
        let prepared = luma::prepare(image, &self.config)?;
        self.assess_array(&prepared.view())
    }

    /// Decode an image file and assess it
    ///
    /// # Errors
    /// Returns error if decoding fails, then as [`NiqeAssessor::assess`]
    pub fn assess_path(&self, path: impl AsRef<Path>) -> Result<NiqeAssessment> {
        let path = path.as_ref();
        debug!("Loading image {}", path.display());
        let image = image::open(path)?;
        self.assess(&image)
    }
}
