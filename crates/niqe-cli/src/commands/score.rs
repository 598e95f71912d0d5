//! Score command - NIQE score per image, images processed in parallel

use super::ModelArgs;
use anyhow::Result;
use clap::{Args, ValueEnum};
use niqe_core::{NiqeAssessment, NiqeError};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Output layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `<score>\t<file>` per line
    Text,
    /// One JSON object per line
    Jsonl,
}

#[derive(Args)]
pub struct ScoreCommand {
    /// Image files to score
    #[arg(value_name = "FILES", required = true)]
    inputs: Vec<PathBuf>,

    #[command(flatten)]
    model: ModelArgs,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

/// Short machine-readable name of a failure, so callers can skip by kind
fn error_kind(error: &NiqeError) -> &'static str {
    match error {
        NiqeError::InvalidShape { .. } => "invalid_shape",
        NiqeError::EmptySampleCovariance { .. } => "empty_sample_covariance",
        NiqeError::InvalidModel(_) => "invalid_model",
        NiqeError::InvalidConfig(_) => "invalid_config",
        NiqeError::Io(_) => "io",
        NiqeError::Json(_) | NiqeError::Yaml(_) => "parse",
        NiqeError::Image(_) => "image",
    }
}

/// Text-mode failure line, tagged with the error kind
fn failure_line(path: &Path, error: &NiqeError) -> String {
    format!(
        "✗ {} - FAILED [{}]: {}",
        path.display(),
        error_kind(error),
        error
    )
}

impl ScoreCommand {
    pub fn execute(self) -> Result<()> {
        let assessor = self.model.assessor()?;
        info!(
            "Scoring {} file(s) with {}x{} blocks",
            self.inputs.len(),
            assessor.config().block_size_h,
            assessor.config().block_size_w
        );

        let start_time = Instant::now();
        let results: Vec<(PathBuf, Result<NiqeAssessment, NiqeError>)> = self
            .inputs
            .par_iter()
            .map(|path| (path.clone(), assessor.assess_path(path)))
            .collect();

        let mut failed = 0usize;
        for (path, result) in &results {
            match result {
                Ok(assessment) => match self.format {
                    OutputFormat::Jsonl => println!(
                        "{}",
                        serde_json::json!({
                            "type": "success",
                            "file": path.display().to_string(),
                            "niqe": assessment.score,
                            "num_blocks": assessment.num_blocks,
                            "valid_blocks": assessment.valid_blocks,
                        })
                    ),
                    OutputFormat::Text => println!("{:.4}\t{}", assessment.score, path.display()),
                },
                Err(error) => {
                    failed += 1;
                    match self.format {
                        OutputFormat::Jsonl => println!(
                            "{}",
                            serde_json::json!({
                                "type": "error",
                                "file": path.display().to_string(),
                                "kind": error_kind(error),
                                "error": error.to_string(),
                            })
                        ),
                        OutputFormat::Text => {
                            warn!("{}", failure_line(path, error));
                        }
                    }
                }
            }
        }

        info!(
            "Scored {} of {} file(s) in {:.2}s",
            results.len() - failed,
            results.len(),
            start_time.elapsed().as_secs_f64()
        );

        if failed > 0 {
            anyhow::bail!("{failed} of {} file(s) failed", results.len());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_distinct() {
        let shape = NiqeError::InvalidShape {
            shape: vec![10, 10],
            block_size_h: 96,
            block_size_w: 96,
            reason: String::new(),
        };
        let cov = NiqeError::EmptySampleCovariance {
            total_rows: 4,
            valid_rows: 0,
        };
        assert_eq!(error_kind(&shape), "invalid_shape");
        assert_eq!(error_kind(&cov), "empty_sample_covariance");
    }

    #[test]
    fn test_failure_line_names_kind() {
        let path = Path::new("frames/0001.png");
        let shape = NiqeError::InvalidShape {
            shape: vec![50, 50],
            block_size_h: 96,
            block_size_w: 96,
            reason: "image is smaller than one block".to_string(),
        };
        let cov = NiqeError::EmptySampleCovariance {
            total_rows: 4,
            valid_rows: 1,
        };

        let shape_line = failure_line(path, &shape);
        let cov_line = failure_line(path, &cov);
        assert!(shape_line.contains("frames/0001.png"));
        assert!(shape_line.contains("[invalid_shape]"));
        assert!(cov_line.contains("[empty_sample_covariance]"));
        assert!(cov_line.contains("1 of 4"));
    }
}
