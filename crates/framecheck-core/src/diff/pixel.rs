use std::path::Path;

use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use tracing::debug;

use crate::diff::{DiffEngine, DiffOutcome, DiffRequest, Tolerance};
use crate::error::{Error, Result};
use crate::rect::CropRect;

/// Summed RGB channel delta a pixel pair may reach and still count as equal.
const DEFAULT_PIXEL_DELTA: u32 = 20;

const DIFF_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Pixel-level similarity engine.
///
/// Loads both images, applies the crop to each, and classifies a pixel as
/// differing when the sum of its absolute RGB channel differences exceeds
/// `pixel_delta`. The requested tolerance then decides pass/fail over the
/// differing-pixel count. Byte-identical images have zero differing pixels
/// and pass under either tolerance mode.
#[derive(Debug, Clone)]
pub struct PixelDiffEngine {
    /// Per-pixel channel-sum delta treated as noise.
    pub pixel_delta: u32,
}

impl Default for PixelDiffEngine {
    fn default() -> Self {
        Self {
            pixel_delta: DEFAULT_PIXEL_DELTA,
        }
    }
}

impl DiffEngine for PixelDiffEngine {
    fn diff(&self, request: &DiffRequest) -> Result<DiffOutcome> {
        let candidate = load(&request.candidate)?;
        let baseline = load(&request.baseline)?;

        let candidate_view = crop_view(&candidate, request.crop, &request.candidate)?;
        let baseline_view = crop_view(&baseline, request.crop, &request.baseline)?;

        if candidate_view.dimensions() != baseline_view.dimensions() {
            return Err(Error::Engine(format!(
                "dimension mismatch: {} is {}x{}, {} is {}x{}",
                request.candidate.display(),
                candidate_view.width(),
                candidate_view.height(),
                request.baseline.display(),
                baseline_view.width(),
                baseline_view.height(),
            )));
        }

        let (w, h) = candidate_view.dimensions();
        let total = u64::from(w) * u64::from(h);
        let mut differing: Vec<(u32, u32)> = Vec::new();
        for y in 0..h {
            for x in 0..w {
                let a = candidate_view.get_pixel(x, y);
                let b = baseline_view.get_pixel(x, y);
                if channel_delta(*a, *b) > self.pixel_delta {
                    differing.push((x, y));
                }
            }
        }

        let differing_pixels = differing.len() as u64;
        let passed = match request.tolerance {
            Tolerance::Percent(limit) => {
                let fraction = if total > 0 {
                    differing_pixels as f64 / total as f64
                } else {
                    0.0
                };
                fraction <= limit
            }
            Tolerance::PixelCount(limit) => differing_pixels <= limit,
        };

        if let Some(artifact) = &request.artifact {
            render_artifact(&candidate, &differing, request.crop, artifact)?;
        }

        debug!(
            candidate = ?request.candidate,
            differing_pixels,
            total,
            passed,
            "pixel comparison done"
        );

        Ok(DiffOutcome {
            differing_pixels,
            passed,
        })
    }
}

fn load(path: &Path) -> Result<RgbaImage> {
    let img = image::open(path)
        .map_err(|e| Error::Engine(format!("failed to open {}: {e}", path.display())))?;
    Ok(img.to_rgba8())
}

fn crop_view(img: &RgbaImage, crop: Option<CropRect>, path: &Path) -> Result<RgbaImage> {
    let Some(rect) = crop else {
        return Ok(img.clone());
    };
    if !rect.fits_within(img.width(), img.height()) {
        return Err(Error::Engine(format!(
            "crop {}x{}+{}+{} does not fit within {} ({}x{})",
            rect.w,
            rect.h,
            rect.x,
            rect.y,
            path.display(),
            img.width(),
            img.height(),
        )));
    }
    Ok(image::imageops::crop_imm(img, rect.x, rect.y, rect.w, rect.h).to_image())
}

/// Sum of absolute RGB channel differences; alpha is ignored.
fn channel_delta(a: Rgba<u8>, b: Rgba<u8>) -> u32 {
    let Rgba([r1, g1, b1, _]) = a;
    let Rgba([r2, g2, b2, _]) = b;
    u32::from(r1.abs_diff(r2)) + u32::from(g1.abs_diff(g2)) + u32::from(b1.abs_diff(b2))
}

/// Render the diff image: the full candidate dimmed, differing pixels in
/// solid red, and the crop boundary outlined when a crop was compared.
fn render_artifact(
    candidate: &RgbaImage,
    differing: &[(u32, u32)],
    crop: Option<CropRect>,
    path: &Path,
) -> Result<()> {
    let mut out = candidate.clone();
    for pixel in out.pixels_mut() {
        let Rgba([r, g, b, _]) = *pixel;
        *pixel = Rgba([r / 2, g / 2, b / 2, 255]);
    }

    let (dx, dy) = crop.map_or((0, 0), |c| (c.x, c.y));
    for &(x, y) in differing {
        out.put_pixel(dx + x, dy + y, DIFF_COLOR);
    }

    if let Some(c) = crop {
        let rect = Rect::at(c.x as i32, c.y as i32).of_size(c.w, c.h);
        draw_hollow_rect_mut(&mut out, rect, DIFF_COLOR);
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Engine(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
    }
    out.save(path)
        .map_err(|e| Error::Engine(format!("failed to save diff image {}: {e}", path.display())))?;

    debug!(?path, "diff artifact written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("framecheck_pixel_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_png(path: &Path, w: u32, h: u32, color: [u8; 3]) {
        let img = RgbaImage::from_pixel(w, h, Rgba([color[0], color[1], color[2], 255]));
        img.save(path).unwrap();
    }

    fn request(candidate: &Path, baseline: &Path, tolerance: Tolerance) -> DiffRequest {
        DiffRequest {
            candidate: candidate.to_path_buf(),
            baseline: baseline.to_path_buf(),
            artifact: None,
            tolerance,
            crop: None,
        }
    }

    #[test]
    fn identical_images_pass_under_either_mode() {
        let dir = temp_dir("identical");
        let a = dir.join("frame1.png");
        let b = dir.join("expect1.png");
        write_png(&a, 4, 4, [120, 90, 30]);
        std::fs::copy(&a, &b).unwrap();

        let engine = PixelDiffEngine::default();
        for tolerance in [Tolerance::Percent(0.0), Tolerance::PixelCount(0)] {
            let outcome = engine.diff(&request(&a, &b, tolerance)).unwrap();
            assert_eq!(outcome.differing_pixels, 0);
            assert!(outcome.passed);
        }

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn channel_noise_below_delta_is_equal() {
        let dir = temp_dir("noise");
        let a = dir.join("frame1.png");
        let b = dir.join("expect1.png");
        write_png(&a, 4, 4, [100, 100, 100]);
        // Summed channel delta 15, under the default of 20.
        write_png(&b, 4, 4, [105, 105, 105]);

        let engine = PixelDiffEngine::default();
        let outcome = engine
            .diff(&request(&a, &b, Tolerance::Percent(0.0)))
            .unwrap();
        assert_eq!(outcome.differing_pixels, 0);
        assert!(outcome.passed);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn pixel_delta_is_configurable() {
        let dir = temp_dir("delta");
        let a = dir.join("frame1.png");
        let b = dir.join("expect1.png");
        write_png(&a, 4, 4, [100, 100, 100]);
        // Summed channel delta 30.
        write_png(&b, 4, 4, [110, 110, 110]);

        let strict = PixelDiffEngine::default();
        let outcome = strict
            .diff(&request(&a, &b, Tolerance::Percent(0.0)))
            .unwrap();
        assert_eq!(outcome.differing_pixels, 16);
        assert!(!outcome.passed);

        let loose = PixelDiffEngine { pixel_delta: 40 };
        let outcome = loose
            .diff(&request(&a, &b, Tolerance::Percent(0.0)))
            .unwrap();
        assert!(outcome.passed);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn pixel_count_mode_is_an_absolute_ceiling() {
        let dir = temp_dir("count");
        let a = dir.join("frame1.png");
        let b = dir.join("expect1.png");
        write_png(&a, 2, 2, [255, 0, 0]);
        write_png(&b, 2, 2, [0, 255, 0]);

        let engine = PixelDiffEngine::default();
        let outcome = engine
            .diff(&request(&a, &b, Tolerance::PixelCount(4)))
            .unwrap();
        assert_eq!(outcome.differing_pixels, 4);
        assert!(outcome.passed);

        let outcome = engine
            .diff(&request(&a, &b, Tolerance::PixelCount(3)))
            .unwrap();
        assert!(!outcome.passed);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn percent_mode_judges_the_differing_fraction() {
        let dir = temp_dir("percent");
        let a = dir.join("frame1.png");
        let b = dir.join("expect1.png");
        // One of sixteen pixels differs: 6.25%.
        write_png(&a, 4, 4, [0, 0, 0]);
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        img.put_pixel(3, 3, Rgba([255, 255, 255, 255]));
        img.save(&b).unwrap();

        let engine = PixelDiffEngine::default();
        let outcome = engine
            .diff(&request(&a, &b, Tolerance::Percent(0.10)))
            .unwrap();
        assert_eq!(outcome.differing_pixels, 1);
        assert!(outcome.passed);

        let outcome = engine
            .diff(&request(&a, &b, Tolerance::Percent(0.05)))
            .unwrap();
        assert!(!outcome.passed);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn crop_limits_the_compared_region() {
        let dir = temp_dir("crop");
        let a = dir.join("frame1.png");
        let b = dir.join("expect1.png");
        write_png(&a, 8, 8, [10, 10, 10]);
        let mut img = RgbaImage::from_pixel(8, 8, Rgba([10, 10, 10, 255]));
        // Differs only outside the crop.
        img.put_pixel(7, 7, Rgba([250, 250, 250, 255]));
        img.save(&b).unwrap();

        let engine = PixelDiffEngine::default();
        let mut req = request(&a, &b, Tolerance::Percent(0.0));
        req.crop = Some(CropRect { x: 0, y: 0, w: 4, h: 4 });
        assert!(engine.diff(&req).unwrap().passed);

        req.crop = None;
        assert!(!engine.diff(&req).unwrap().passed);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn out_of_bounds_crop_is_an_engine_error() {
        let dir = temp_dir("badcrop");
        let a = dir.join("frame1.png");
        let b = dir.join("expect1.png");
        write_png(&a, 8, 8, [10, 10, 10]);
        write_png(&b, 8, 8, [10, 10, 10]);

        let engine = PixelDiffEngine::default();
        let mut req = request(&a, &b, Tolerance::Percent(0.0));
        req.crop = Some(CropRect { x: 6, y: 6, w: 4, h: 4 });
        let err = engine.diff(&req).unwrap_err();
        assert!(matches!(err, Error::Engine(_)));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn dimension_mismatch_is_an_engine_error() {
        let dir = temp_dir("dims");
        let a = dir.join("frame1.png");
        let b = dir.join("expect1.png");
        write_png(&a, 4, 4, [10, 10, 10]);
        write_png(&b, 8, 8, [10, 10, 10]);

        let engine = PixelDiffEngine::default();
        let err = engine
            .diff(&request(&a, &b, Tolerance::Percent(0.0)))
            .unwrap_err();
        assert!(matches!(err, Error::Engine(_)));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unreadable_image_is_an_engine_error() {
        let dir = temp_dir("unreadable");
        let a = dir.join("frame1.png");
        write_png(&a, 4, 4, [10, 10, 10]);

        let engine = PixelDiffEngine::default();
        let err = engine
            .diff(&request(&a, &dir.join("missing1.png"), Tolerance::Percent(0.0)))
            .unwrap_err();
        assert!(matches!(err, Error::Engine(_)));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn artifact_is_rendered_on_request() {
        let dir = temp_dir("artifact");
        let a = dir.join("frame1.png");
        let b = dir.join("expect1.png");
        write_png(&a, 4, 4, [255, 0, 0]);
        write_png(&b, 4, 4, [0, 255, 0]);

        let artifact = dir.join("diffs").join("frame1_diff.png");
        let engine = PixelDiffEngine::default();
        let mut req = request(&a, &b, Tolerance::Percent(0.0));
        req.artifact = Some(artifact.clone());
        let outcome = engine.diff(&req).unwrap();
        assert!(!outcome.passed);

        let rendered = image::open(&artifact).unwrap().to_rgba8();
        assert_eq!(rendered.dimensions(), (4, 4));
        // Every pixel differed, so every pixel is marked.
        assert_eq!(*rendered.get_pixel(0, 0), Rgba([255, 0, 0, 255]));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn artifact_dims_equal_pixels_and_outlines_the_crop() {
        let dir = temp_dir("artifact_crop");
        let a = dir.join("frame1.png");
        let b = dir.join("expect1.png");
        write_png(&a, 8, 8, [100, 100, 100]);
        write_png(&b, 8, 8, [100, 100, 100]);

        let artifact = dir.join("frame1_diff.png");
        let engine = PixelDiffEngine::default();
        let mut req = request(&a, &b, Tolerance::Percent(0.0));
        req.crop = Some(CropRect { x: 2, y: 2, w: 4, h: 4 });
        req.artifact = Some(artifact.clone());
        assert!(engine.diff(&req).unwrap().passed);

        let rendered = image::open(&artifact).unwrap().to_rgba8();
        // Untouched pixels are dimmed, the crop boundary is drawn.
        assert_eq!(*rendered.get_pixel(0, 0), Rgba([50, 50, 50, 255]));
        assert_eq!(*rendered.get_pixel(2, 2), Rgba([255, 0, 0, 255]));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
