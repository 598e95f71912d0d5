//! Subcommand implementations

pub mod features;
pub mod score;

use anyhow::{Context as _, Result};
use clap::{Args, ValueEnum};
use niqe_core::{LumaMode, NiqeAssessor, NiqeConfig};
use std::path::PathBuf;

/// Channel reduction choices exposed on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConvertTo {
    /// BT.601 luma (MATLAB range)
    Y,
    /// Weighted grey
    Gray,
}

impl From<ConvertTo> for LumaMode {
    fn from(value: ConvertTo) -> Self {
        match value {
            ConvertTo::Y => LumaMode::Y,
            ConvertTo::Gray => LumaMode::Gray,
        }
    }
}

/// Model and configuration options shared by all commands
#[derive(Args)]
pub struct ModelArgs {
    /// Pristine model JSON (mu_pris_param, cov_pris_param, gaussian_window)
    #[arg(short, long)]
    model: PathBuf,

    /// YAML configuration file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Square block size (overrides both block dimensions)
    #[arg(long)]
    block_size: Option<usize>,

    /// Pixels to crop from each image edge
    #[arg(long)]
    crop_border: Option<usize>,

    /// Channel reduction for colour images
    #[arg(long, value_enum)]
    convert_to: Option<ConvertTo>,

    /// Keep fractional pixel values instead of rounding
    #[arg(long)]
    no_round: bool,
}

impl ModelArgs {
    /// Merge the config file and flag overrides
    pub fn config(&self) -> Result<NiqeConfig> {
        let mut config = match &self.config {
            Some(path) => NiqeConfig::from_yaml(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => NiqeConfig::default(),
        };

        if let Some(size) = self.block_size {
            config.block_size_h = size;
            config.block_size_w = size;
        }
        if let Some(border) = self.crop_border {
            config.crop_border = border;
        }
        if let Some(convert_to) = self.convert_to {
            config.convert_to = convert_to.into();
        }
        if self.no_round {
            config.round_pixels = false;
        }

        Ok(config)
    }

    /// Build an assessor from the model file and merged configuration
    pub fn assessor(&self) -> Result<NiqeAssessor> {
        let model = niqe_core::PristineModel::from_json(&self.model)
            .with_context(|| format!("Failed to load model {}", self.model.display()))?;
        NiqeAssessor::new(model, self.config()?).context("Invalid model or configuration")
    }
}
