//! Visual regression testing for rendered video output.
//!
//! Extract numbered frame images from a video with ffmpeg, then either scan a
//! frame range for the first frame matching a reference image
//! ([`find_match`]) or collect every frame in a range that matches it
//! ([`find_all_matches`]). A missing reference can be captured from the frame
//! whose number matches the reference file name.

pub mod baseline;
pub mod compare;
pub mod diff;
pub mod error;
pub mod rect;
pub mod video;

pub use compare::{find_all_matches, find_match, CollectConfig, MatchConfig};
pub use diff::pixel::PixelDiffEngine;
pub use diff::{DiffEngine, DiffOutcome, DiffRequest, Tolerance};
pub use error::{Error, Result};
pub use rect::CropRect;
pub use video::extractor::{clean_dir, extract_frames, list_frames};
pub use video::frame::{filter_by_range, frame_number, sort_ascending, FrameFile};
