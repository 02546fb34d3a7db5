use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// A frame image on disk together with the number parsed from its file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameFile {
    pub path: PathBuf,
    /// Number taken from the digit run before the extension.
    pub number: u32,
}

/// Parse a frame number from a path: the digit run immediately preceding the
/// extension. `frame12.png` is 12, `shot_007.png` is 7. Anything before the
/// digit run is ignored, so `a10.png` and `b10.png` are the same frame
/// number.
pub fn frame_number(path: &Path) -> Result<u32> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::FrameNumber(path.to_path_buf()))?;

    let bytes = stem.as_bytes();
    let mut start = bytes.len();
    while start > 0 && bytes[start - 1].is_ascii_digit() {
        start -= 1;
    }
    if start == bytes.len() {
        return Err(Error::FrameNumber(path.to_path_buf()));
    }

    stem[start..]
        .parse()
        .map_err(|_| Error::FrameNumber(path.to_path_buf()))
}

/// Index `paths` and keep the frames whose numbers lie in `[start, end]`,
/// preserving input order. Every input path is parsed, so a file without a
/// frame number is fatal even when it would fall outside the range. `end` is
/// clamped to the highest frame number present; `start` is taken as given,
/// so an empty result is legal.
pub fn filter_by_range(paths: &[PathBuf], start: u32, end: u32) -> Result<Vec<FrameFile>> {
    let mut frames = Vec::with_capacity(paths.len());
    for path in paths {
        let number = frame_number(path)?;
        frames.push(FrameFile {
            path: path.clone(),
            number,
        });
    }

    let last = frames.iter().map(|f| f.number).max().unwrap_or(0);
    let end = end.min(last);
    debug!(start, end, last, total = frames.len(), "filtering frames to range");

    frames.retain(|f| f.number >= start && f.number <= end);
    Ok(frames)
}

/// Order frames by ascending frame number.
pub fn sort_ascending(frames: &mut [FrameFile]) {
    frames.sort_by_key(|f| f.number);
}
