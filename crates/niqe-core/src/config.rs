//! Scoring configuration

use crate::error::{NiqeError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Default block height
pub const DEFAULT_BLOCK_SIZE_H: usize = 96;
/// Default block width
pub const DEFAULT_BLOCK_SIZE_W: usize = 96;

/// How a colour image is reduced to a single channel before scoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LumaMode {
    /// BT.601 luma with MATLAB's studio range [16, 235]
    #[default]
    Y,
    /// Plain weighted grey (0.299 R + 0.587 G + 0.114 B)
    Gray,
}

/// Configuration for NIQE scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NiqeConfig {
    /// Block height at full resolution
    pub block_size_h: usize,
    /// Block width at full resolution
    pub block_size_w: usize,
    /// Pixels removed from each image edge before scoring
    pub crop_border: usize,
    /// Channel reduction for colour inputs
    pub convert_to: LumaMode,
    /// Round pixel values to integers before scoring (matches MATLAB results)
    pub round_pixels: bool,
}

impl Default for NiqeConfig {
    fn default() -> Self {
        Self {
            block_size_h: DEFAULT_BLOCK_SIZE_H,
            block_size_w: DEFAULT_BLOCK_SIZE_W,
            crop_border: 0,
            convert_to: LumaMode::Y,
            round_pixels: true,
        }
    }
}

impl NiqeConfig {
    /// Load configuration from a YAML file
    ///
    /// Missing keys fall back to their defaults.
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed, or fails validation
    pub fn from_yaml(yaml_path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(yaml_path.as_ref())?;
        let config: NiqeConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        debug!("Loaded NIQE config from {}", yaml_path.as_ref().display());
        Ok(config)
    }

    /// Check option ranges
    ///
    /// # Errors
    /// Returns `InvalidConfig` for zero block sizes
    pub fn validate(&self) -> Result<()> {
        if self.block_size_h == 0 || self.block_size_w == 0 {
            return Err(NiqeError::InvalidConfig(format!(
                "block size must be non-zero, got {}x{}",
                self.block_size_h, self.block_size_w
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = NiqeConfig::default();
        assert_eq!(config.block_size_h, 96);
        assert_eq!(config.block_size_w, 96);
        assert_eq!(config.crop_border, 0);
        assert_eq!(config.convert_to, LumaMode::Y);
        assert!(config.round_pixels);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_block_size_rejected() {
        let config = NiqeConfig {
            block_size_w: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(NiqeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_from_yaml_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "block_size_h: 64\nconvert_to: gray").unwrap();

        let config = NiqeConfig::from_yaml(file.path()).unwrap();
        assert_eq!(config.block_size_h, 64);
        assert_eq!(config.block_size_w, 96);
        assert_eq!(config.convert_to, LumaMode::Gray);
    }

    #[test]
    fn test_from_yaml_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "block_size_h: 0").unwrap();
        assert!(NiqeConfig::from_yaml(file.path()).is_err());
    }
}
