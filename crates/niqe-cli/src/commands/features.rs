//! Features command - dump the distortion matrix and its Gaussian fit

use super::ModelArgs;
use anyhow::{Context as _, Result};
use clap::Args;
use niqe_core::{distortion_params, luma, MultivariateGaussian};
use std::path::PathBuf;
use tracing::info;

#[derive(Args)]
pub struct FeaturesCommand {
    /// Image file to inspect
    #[arg(value_name = "FILE")]
    input: PathBuf,

    #[command(flatten)]
    model: ModelArgs,
}

/// JSON has no NaN; degenerate entries become null
fn finite_or_null(v: f64) -> serde_json::Value {
    if v.is_finite() {
        serde_json::json!(v)
    } else {
        serde_json::Value::Null
    }
}

impl FeaturesCommand {
    pub fn execute(self) -> Result<()> {
        let assessor = self.model.assessor()?;
        let config = assessor.config();

        let image = image::open(&self.input)
            .with_context(|| format!("Failed to open {}", self.input.display()))?;
        let prepared = luma::prepare(&image, config)?;

        let distparam = distortion_params(
            &prepared.view(),
            &assessor.model().gaussian_window.view(),
            config.block_size_h,
            config.block_size_w,
        )?;
        info!("Distortion matrix: {:?}", distparam.dim());

        let rows: Vec<Vec<serde_json::Value>> = distparam
            .outer_iter()
            .map(|row| row.iter().copied().map(finite_or_null).collect())
            .collect();

        // The fit fails when too few blocks are finite; report the matrix anyway
        let fit = match MultivariateGaussian::fit(&distparam.view()) {
            Ok(mvg) => {
                let mean: Vec<serde_json::Value> =
                    mvg.mean.iter().copied().map(finite_or_null).collect();
                let score = mvg.distance_to(assessor.model())?;
                serde_json::json!({
                    "mean": mean,
                    "valid_blocks": mvg.valid_rows,
                    "niqe": score,
                })
            }
            Err(e) => serde_json::json!({ "error": e.to_string() }),
        };

        let output = serde_json::json!({
            "file": self.input.display().to_string(),
            "image_shape": [prepared.nrows(), prepared.ncols()],
            "block_size": [config.block_size_h, config.block_size_w],
            "distortion_matrix": rows,
            "fit": fit,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);

        Ok(())
    }
}
