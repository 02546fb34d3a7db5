use std::path::PathBuf;

use clap::{Parser, Subcommand};

use framecheck_core::CropRect;

#[derive(Parser)]
#[command(name = "framecheck", about = "Visual regression checks over decoded video frames")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Extract every frame of a video into numbered image files.
    Extract {
        /// Path to the input video file (MP4, etc.).
        #[arg(short, long)]
        input: PathBuf,

        /// Directory to write the frame images into (wiped first).
        #[arg(short, long)]
        out_dir: PathBuf,

        /// File-name prefix for the numbered frames.
        #[arg(short, long, default_value = "frame")]
        prefix: String,
    },

    /// Scan a frame range for the first frame matching the expected image.
    FindMatch {
        /// Directory holding extracted frame images.
        #[arg(short, long)]
        frames_dir: PathBuf,

        /// The expected (baseline) image.
        #[arg(short, long)]
        expected: PathBuf,

        /// First frame number of the inclusive range.
        #[arg(long)]
        start: u32,

        /// Last frame number of the inclusive range.
        #[arg(long)]
        end: u32,

        /// Fraction of differing pixels a frame may have and still match.
        #[arg(short, long, default_value_t = 0.2)]
        tolerance: f64,

        /// Fail instead of capturing a missing baseline from the frame named
        /// by the expected file.
        #[arg(long)]
        no_capture: bool,

        /// Directory to write per-frame diff images into.
        #[arg(long)]
        diff_dir: Option<PathBuf>,

        /// Compare only this region, as "x,y,w,h".
        #[arg(long, value_parser = parse_crop)]
        crop: Option<CropRect>,
    },

    /// Collect every frame in a range that equals the expected image.
    FindAll {
        /// Directory holding extracted frame images.
        #[arg(short, long)]
        frames_dir: PathBuf,

        /// The expected (baseline) image.
        #[arg(short, long)]
        expected: PathBuf,

        /// First frame number of the inclusive range.
        #[arg(long)]
        start: u32,

        /// Last frame number of the inclusive range.
        #[arg(long)]
        end: u32,

        /// Differing-pixel ceiling for a frame to count as equal.
        #[arg(long, default_value_t = 0)]
        max_diff_pixels: u64,

        /// Compare only this region, as "x,y,w,h".
        #[arg(long, value_parser = parse_crop)]
        crop: Option<CropRect>,
    },
}

/// Parse "x,y,w,h" into a crop rect.
fn parse_crop(s: &str) -> Result<CropRect, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(format!("expected x,y,w,h, got {s:?}"));
    }
    let mut nums = [0u32; 4];
    for (slot, part) in nums.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|_| format!("invalid number {part:?}"))?;
    }
    Ok(CropRect {
        x: nums[0],
        y: nums[1],
        w: nums[2],
        h: nums[3],
    })
}
