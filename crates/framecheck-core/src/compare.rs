use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::baseline;
use crate::diff::{DiffEngine, DiffRequest, Tolerance};
use crate::error::{Error, Result};
use crate::rect::CropRect;
use crate::video::frame::{filter_by_range, sort_ascending};

/// Parameters for the single-match scan.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// First frame number of the inclusive range.
    pub start: u32,
    /// Last frame number of the inclusive range, clamped to the highest
    /// frame present.
    pub end: u32,
    /// Fraction of differing pixels a frame may have and still match.
    pub tolerance: f64,
    /// Capture a missing baseline from the frame whose number matches the
    /// expected file name.
    pub capture_baseline: bool,
    /// Render a diff image for every compared frame.
    pub emit_diff_artifacts: bool,
    /// Directory for diff images; next to the candidate when None.
    pub diff_dir: Option<PathBuf>,
    /// Region compared in both images; None compares full frames.
    pub crop: Option<CropRect>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            start: 0,
            end: u32::MAX,
            tolerance: 0.2,
            capture_baseline: true,
            emit_diff_artifacts: false,
            diff_dir: None,
            crop: None,
        }
    }
}

/// Parameters for the equal-set scan.
#[derive(Debug, Clone)]
pub struct CollectConfig {
    /// First frame number of the inclusive range.
    pub start: u32,
    /// Last frame number of the inclusive range, clamped to the highest
    /// frame present.
    pub end: u32,
    /// Absolute ceiling on differing pixels for a frame to count as equal.
    pub max_diff_pixels: u64,
    /// Region compared in both images; None compares full frames.
    pub crop: Option<CropRect>,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            start: 0,
            end: u32::MAX,
            max_diff_pixels: 0,
            crop: None,
        }
    }
}

/// Scan `frames` in input order and report whether any frame in range matches
/// the expected image under the percent tolerance. Stops at the first match;
/// frames after it are never examined. When the baseline is missing and
/// capture is enabled, frames ahead of the one named by the expected file are
/// skipped until the baseline is captured from it.
pub fn find_match(
    engine: &dyn DiffEngine,
    frames: &[PathBuf],
    expected: &Path,
    config: &MatchConfig,
) -> Result<bool> {
    if !expected.exists() && !config.capture_baseline {
        return Err(Error::BaselineUnavailable(expected.to_path_buf()));
    }

    let filtered = filter_by_range(frames, config.start, config.end)?;
    info!(
        candidates = filtered.len(),
        start = config.start,
        end = config.end,
        expected = ?expected,
        "scanning for a matching frame"
    );

    for frame in &filtered {
        if !baseline::resolve(frame, expected, config.capture_baseline)? {
            continue;
        }

        info!(frame = frame.number, path = ?frame.path, "comparing frame");
        let outcome = engine.diff(&DiffRequest {
            candidate: frame.path.clone(),
            baseline: expected.to_path_buf(),
            artifact: config
                .emit_diff_artifacts
                .then(|| artifact_path(&frame.path, config.diff_dir.as_deref())),
            tolerance: Tolerance::Percent(config.tolerance),
            crop: config.crop,
        })?;
        debug!(
            frame = frame.number,
            differing = outcome.differing_pixels,
            passed = outcome.passed,
            "comparison outcome"
        );

        if outcome.passed {
            info!(frame = frame.number, "matching frame found");
            return Ok(true);
        }
    }

    info!("no frame in range matched");
    Ok(false)
}

/// Evaluate every frame in range, ascending by frame number, and return the
/// frames whose outcome passed under the absolute differing-pixel ceiling,
/// keyed by frame number. Unlike [`find_match`] this never stops early, and
/// the baseline must already exist. An engine failure aborts the scan with no
/// partial map.
pub fn find_all_matches(
    engine: &dyn DiffEngine,
    frames: &[PathBuf],
    expected: &Path,
    config: &CollectConfig,
) -> Result<BTreeMap<u32, PathBuf>> {
    if !expected.exists() {
        return Err(Error::BaselineUnavailable(expected.to_path_buf()));
    }

    let mut filtered = filter_by_range(frames, config.start, config.end)?;
    sort_ascending(&mut filtered);
    info!(
        candidates = filtered.len(),
        start = config.start,
        end = config.end,
        expected = ?expected,
        "collecting equal frames"
    );

    let mut matches = BTreeMap::new();
    for frame in &filtered {
        let outcome = engine.diff(&DiffRequest {
            candidate: frame.path.clone(),
            baseline: expected.to_path_buf(),
            artifact: None,
            tolerance: Tolerance::PixelCount(config.max_diff_pixels),
            crop: config.crop,
        })?;
        debug!(
            frame = frame.number,
            differing = outcome.differing_pixels,
            passed = outcome.passed,
            "comparison outcome"
        );

        if outcome.passed {
            matches.insert(frame.number, frame.path.clone());
        }
    }

    info!(matched = matches.len(), "equal-frame collection complete");
    Ok(matches)
}

/// Diff artifact path for a candidate: its extension replaced with
/// `_diff<ext>`, placed in `dir` when given, next to the candidate otherwise.
fn artifact_path(candidate: &Path, dir: Option<&Path>) -> PathBuf {
    let stem = candidate
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("frame");
    let ext = candidate
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("png");
    let name = format!("{stem}_diff.{ext}");
    match dir {
        Some(dir) => dir.join(name),
        None => candidate.with_file_name(name),
    }
}
