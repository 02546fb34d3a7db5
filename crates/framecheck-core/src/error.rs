use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the comparison core. Nothing here is retried: a scan
/// either completes and returns its result, or aborts with one of these and
/// no partial result.
#[derive(Debug, Error)]
pub enum Error {
    /// The expected image is missing and auto-capture may not materialize it.
    #[error("baseline image not available: {}", .0.display())]
    BaselineUnavailable(PathBuf),

    /// The file name has no digit run immediately before its extension.
    #[error("no frame number before the extension: {}", .0.display())]
    FrameNumber(PathBuf),

    /// The similarity engine failed mid-comparison.
    #[error("similarity engine: {0}")]
    Engine(String),

    /// ffprobe or ffmpeg failed while extracting frames.
    #[error("video decode: {0}")]
    Decode(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
