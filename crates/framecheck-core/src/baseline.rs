use std::path::Path;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::video::frame::{frame_number, FrameFile};

/// Decide whether the baseline at `expected` is usable for `candidate`.
///
/// An existing file is immediately usable. A missing file is captured from
/// the candidate's bytes when `capture` is set and the frame number embedded
/// in the expected file name equals the candidate's; any other candidate is
/// skipped (`Ok(false)`), so no comparison happens for it on this pass.
/// Existence is re-read from disk on every call, which makes the capture
/// happen at most once per expected path: later candidates observe the file
/// the first capture wrote.
pub fn resolve(candidate: &FrameFile, expected: &Path, capture: bool) -> Result<bool> {
    if expected.exists() {
        return Ok(true);
    }
    if !capture {
        // Scans reject this case up front; reaching it means the baseline
        // vanished mid-scan.
        return Err(Error::BaselineUnavailable(expected.to_path_buf()));
    }

    let wanted = frame_number(expected)?;
    if wanted != candidate.number {
        debug!(
            candidate = candidate.number,
            wanted, "baseline capture deferred"
        );
        return Ok(false);
    }

    std::fs::copy(&candidate.path, expected)?;
    info!(
        frame = candidate.number,
        baseline = ?expected,
        "baseline captured from candidate frame"
    );
    Ok(true)
}
