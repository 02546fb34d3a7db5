use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{error, info, warn};

use crate::error::{Error, Result};

/// Video metadata obtained by probing with ffprobe.
struct ProbeResult {
    width: u32,
    height: u32,
    fps: f64,
}

fn probe(path: &Path) -> Result<ProbeResult> {
    info!(?path, "probing video metadata with ffprobe");

    let output = Command::new("ffprobe")
        .args([
            "-v", "error",
            "-select_streams", "v:0",
            "-show_entries", "stream=width,height,r_frame_rate",
            "-of", "csv=p=0",
        ])
        .arg(path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| Error::Decode(format!("failed to run ffprobe ({e}) — is ffmpeg installed?")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!(%stderr, ?path, "ffprobe failed");
        return Err(Error::Decode(format!("ffprobe failed: {stderr}")));
    }

    // Output format: "width,height,num/den"
    let stdout = String::from_utf8_lossy(&output.stdout);
    let parts: Vec<&str> = stdout.trim().split(',').collect();
    if parts.len() < 3 {
        error!(%stdout, "unexpected ffprobe output format, expected width,height,fps");
        return Err(Error::Decode(format!("unexpected ffprobe output: {stdout}")));
    }

    let width: u32 = parts[0]
        .parse()
        .map_err(|_| Error::Decode(format!("failed to parse width from {stdout}")))?;
    let height: u32 = parts[1]
        .parse()
        .map_err(|_| Error::Decode(format!("failed to parse height from {stdout}")))?;

    let fps = if let Some((num, den)) = parts[2].split_once('/') {
        let num: f64 = num
            .parse()
            .map_err(|_| Error::Decode(format!("failed to parse fps from {stdout}")))?;
        let den: f64 = den
            .parse()
            .map_err(|_| Error::Decode(format!("failed to parse fps from {stdout}")))?;
        if den > 0.0 {
            num / den
        } else {
            0.0
        }
    } else {
        parts[2]
            .parse()
            .map_err(|_| Error::Decode(format!("failed to parse fps from {stdout}")))?
    };

    info!(width, height, fps, "probe completed");
    Ok(ProbeResult { width, height, fps })
}

/// Recursively delete `path` if it exists.
pub fn clean_dir(path: &Path) -> Result<()> {
    if path.exists() {
        info!(?path, "wiping directory");
        std::fs::remove_dir_all(path)?;
    }
    Ok(())
}

/// List the files of `dir`, sorted by file name. This is the order the match
/// scanner preserves, so `frame10.png` sorts before `frame2.png`.
pub fn list_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut frames = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() {
            frames.push(path);
        }
    }
    frames.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));
    Ok(frames)
}

/// Extract every frame of `video` into `out_dir` as `<prefix><N>.png`, where
/// N counts from 1 (ffmpeg's `%d` pattern). The output directory is wiped and
/// recreated first. Returns the written frame paths in file-name order.
/// A decode failure is fatal; nothing is retried.
pub fn extract_frames(video: &Path, out_dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
    if !video.exists() {
        return Err(Error::Decode(format!(
            "input video does not exist: {}",
            video.display()
        )));
    }

    clean_dir(out_dir)?;
    std::fs::create_dir_all(out_dir)?;

    let meta = probe(video)?;
    info!(
        ?video,
        width = meta.width,
        height = meta.height,
        fps = meta.fps,
        ?out_dir,
        "extracting frames"
    );

    let pattern = out_dir.join(format!("{prefix}%d.png"));
    let output = Command::new("ffmpeg")
        .args(["-i"])
        .arg(video)
        .args(["-v", "error"])
        .arg(&pattern)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| Error::Decode(format!("failed to run ffmpeg ({e}) — is ffmpeg installed?")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!(%stderr, ?video, "ffmpeg failed");
        return Err(Error::Decode(format!("ffmpeg failed: {stderr}")));
    }

    let frames = list_frames(out_dir)?;
    if frames.is_empty() {
        warn!(?out_dir, "ffmpeg wrote no frames");
    }
    info!(frame_count = frames.len(), ?out_dir, "extraction complete");
    Ok(frames)
}
