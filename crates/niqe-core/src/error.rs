//! Error types for NIQE scoring

use thiserror::Error;

/// Errors that can occur while computing a NIQE score
///
/// Degenerate blocks and singular pooled covariances are not errors: the
/// former propagate as NaN features, the latter are handled by the
/// pseudo-inverse.
#[derive(Error, Debug)]
pub enum NiqeError {
    #[error("Invalid image shape {shape:?} for {block_size_h}x{block_size_w} blocks: {reason}")]
    InvalidShape {
        shape: Vec<usize>,
        block_size_h: usize,
        block_size_w: usize,
        reason: String,
    },

    #[error(
        "Cannot estimate feature covariance: {valid_rows} of {total_rows} blocks are free of NaN (need at least 2)"
    )]
    EmptySampleCovariance { total_rows: usize, valid_rows: usize },

    #[error("Invalid pristine model: {0}")]
    InvalidModel(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Image processing error: {0}")]
    Image(String),
}

impl From<image::ImageError> for NiqeError {
    fn from(err: image::ImageError) -> Self {
        NiqeError::Image(err.to_string())
    }
}

/// Result type for NIQE operations
pub type Result<T> = std::result::Result<T, NiqeError>;
