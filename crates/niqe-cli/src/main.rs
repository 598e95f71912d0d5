//! NIQE CLI - No-reference image quality scoring
//!
//! Command-line interface for the NIQE pipeline in `niqe-core`.

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use rayon::ThreadPoolBuilder;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod commands;

use commands::features::FeaturesCommand;
use commands::score::ScoreCommand;

#[derive(Parser)]
#[command(
    name = "niqe",
    version,
    about = "No-reference perceptual image quality (NIQE)",
    long_about = "Score images with the Natural Image Quality Evaluator.\n\
                  Lower scores mean the image statistics are closer to pristine natural images.\n\n\
                  Two commands:\n  \
                  - score: NIQE score of one or more images (scored independently, in parallel)\n  \
                  - features: dump the per-block distortion matrix of one image as JSON",
    after_help = "EXAMPLES:\n  \
                  # Score a single image with the default 96x96 blocks\n  \
                  niqe score --model niqe_pris_params.json photo.png\n\n  \
                  # Score many images, JSON lines output\n  \
                  niqe score --model niqe_pris_params.json --format jsonl *.png\n\n  \
                  # Grey conversion and a 4 pixel border crop\n  \
                  niqe score --model niqe_pris_params.json --convert-to gray --crop-border 4 photo.png\n\n  \
                  # Inspect block features\n  \
                  niqe features --model niqe_pris_params.json photo.png"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Score images
    Score(ScoreCommand),

    /// Dump the distortion matrix of an image
    Features(FeaturesCommand),
}

/// Log filter from `RUST_LOG` directives, else INFO (DEBUG with `--verbose`)
fn log_filter(verbose: bool, directives: Option<&str>) -> EnvFilter {
    let default_level = if verbose { "debug" } else { "info" };
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(default_level))
}

fn main() -> Result<()> {
    // Limit parallelism across files when requested
    if let Ok(threads_str) = std::env::var("NIQE_THREADS") {
        if let Ok(num_threads) = threads_str.parse::<usize>() {
            ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build_global()
                .ok(); // Ignore error if already initialized
        }
    }

    let cli = Cli::parse();

    let filter = log_filter(cli.verbose, std::env::var("RUST_LOG").ok().as_deref());

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    match cli.command {
        Commands::Score(cmd) => cmd.execute(),
        Commands::Features(cmd) => cmd.execute(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_defaults_to_verbosity() {
        assert_eq!(log_filter(false, None).to_string().to_lowercase(), "info");
        assert_eq!(log_filter(true, None).to_string().to_lowercase(), "debug");
        assert_eq!(log_filter(true, Some("  ")).to_string().to_lowercase(), "debug");
    }

    #[test]
    fn test_log_filter_uses_rust_log_directives() {
        let filter = log_filter(false, Some("niqe_core=trace"));
        assert_eq!(filter.to_string().to_lowercase(), "niqe_core=trace");
    }
}
