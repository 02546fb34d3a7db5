mod cli;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use framecheck_core::{
    extract_frames, find_all_matches, find_match, list_frames, CollectConfig, MatchConfig,
    PixelDiffEngine,
};

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = cli::Cli::parse();

    match cli.command {
        cli::Command::Extract {
            input,
            out_dir,
            prefix,
        } => {
            let frames =
                extract_frames(&input, &out_dir, &prefix).context("frame extraction failed")?;
            println!("extracted {} frames into {}", frames.len(), out_dir.display());
            Ok(ExitCode::SUCCESS)
        }

        cli::Command::FindMatch {
            frames_dir,
            expected,
            start,
            end,
            tolerance,
            no_capture,
            diff_dir,
            crop,
        } => {
            let frames = list_frames(&frames_dir)
                .with_context(|| format!("failed to list {}", frames_dir.display()))?;
            let config = MatchConfig {
                start,
                end,
                tolerance,
                capture_baseline: !no_capture,
                emit_diff_artifacts: diff_dir.is_some(),
                diff_dir,
                crop,
            };

            let engine = PixelDiffEngine::default();
            let matched =
                find_match(&engine, &frames, &expected, &config).context("match scan failed")?;

            if matched {
                println!("match");
                Ok(ExitCode::SUCCESS)
            } else {
                println!("no match");
                Ok(ExitCode::FAILURE)
            }
        }

        cli::Command::FindAll {
            frames_dir,
            expected,
            start,
            end,
            max_diff_pixels,
            crop,
        } => {
            let frames = list_frames(&frames_dir)
                .with_context(|| format!("failed to list {}", frames_dir.display()))?;
            let config = CollectConfig {
                start,
                end,
                max_diff_pixels,
                crop,
            };

            let engine = PixelDiffEngine::default();
            let matches = find_all_matches(&engine, &frames, &expected, &config)
                .context("equal-frame scan failed")?;

            info!(matched = matches.len(), "equal-frame scan complete");
            for (number, path) in &matches {
                println!("{number}\t{}", path.display());
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
