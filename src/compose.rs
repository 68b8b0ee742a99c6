use std::path::PathBuf;

use anyhow::Context as _;
use image::RgbaImage;

use crate::{
    error::{PhotoreelError, PhotoreelResult},
    model::{MediaItem, OutputFormat},
    overlay::{OverlayLayout, paint_overlay},
};

/// One rendered frame: straight-alpha RGBA8, row-major, tightly packed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRgba {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl FrameRgba {
    pub fn new(width: u32, height: u32, fill: [u8; 4]) -> Self {
        let mut data = vec![0u8; (width as usize) * (height as usize) * 4];
        for px in data.chunks_exact_mut(4) {
            px.copy_from_slice(&fill);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Pixel at `(x, y)`. Panics out of bounds; test/debug helper.
    pub fn px(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }
}

/// Source-image loading seam for the compositor.
///
/// Implementations decode a source locator into straight-alpha RGBA
/// pixels; failures surface as [`PhotoreelError::FrameLoad`] so the
/// pipeline can apply its skip policy.
pub trait ImageLoader {
    fn load(&self, source: &str) -> PhotoreelResult<RgbaImage>;
}

/// Filesystem loader; relative sources resolve against `root`.
pub struct FsImageLoader {
    root: PathBuf,
}

impl FsImageLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ImageLoader for FsImageLoader {
    fn load(&self, source: &str) -> PhotoreelResult<RgbaImage> {
        let path = {
            let p = PathBuf::from(source);
            if p.is_absolute() { p } else { self.root.join(p) }
        };
        let bytes = std::fs::read(&path)
            .map_err(|e| PhotoreelError::frame_load(format!("read '{}': {e}", path.display())))?;
        let img = image::load_from_memory(&bytes)
            .map_err(|e| PhotoreelError::frame_load(format!("decode '{}': {e}", path.display())))?;
        Ok(img.to_rgba8())
    }
}

/// Placement of a source image letterboxed into a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FitRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Scale-to-fit, aspect preserved, centered on both axes.
///
/// Width-first: try full frame width; fall back to full frame height when
/// the scaled image would overflow vertically. Never crops, never exceeds
/// the frame.
pub fn fit_rect(src_w: u32, src_h: u32, frame_w: u32, frame_h: u32) -> FitRect {
    if src_w == 0 || src_h == 0 || frame_w == 0 || frame_h == 0 {
        return FitRect {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
        };
    }

    let aspect = src_w as f64 / src_h as f64;
    let mut draw_w = frame_w as f64;
    let mut draw_h = draw_w / aspect;
    if draw_h > frame_h as f64 {
        draw_h = frame_h as f64;
        draw_w = draw_h * aspect;
    }

    let width = (draw_w.round() as u32).clamp(1, frame_w);
    let height = (draw_h.round() as u32).clamp(1, frame_h);
    FitRect {
        x: (frame_w - width) / 2,
        y: (frame_h - height) / 2,
        width,
        height,
    }
}

/// Composite one item into a frame of exactly `format.width x format.height`:
/// black background, letterboxed image, then the overlay.
pub fn compose_frame(
    item: &MediaItem,
    format: &OutputFormat,
    layout: &OverlayLayout,
    loader: &dyn ImageLoader,
) -> PhotoreelResult<FrameRgba> {
    let img = loader.load(&item.source)?;

    let mut frame = FrameRgba::new(format.width, format.height, [0, 0, 0, 255]);
    let fit = fit_rect(img.width(), img.height(), format.width, format.height);
    if fit.width > 0 && fit.height > 0 {
        let resized = if fit.width == img.width() && fit.height == img.height() {
            img
        } else {
            image::imageops::resize(&img, fit.width, fit.height, image::imageops::FilterType::Triangle)
        };
        blit_image(&mut frame, &resized, fit.x, fit.y);
    }

    paint_overlay(&mut frame, item, layout)?;
    Ok(frame)
}

/// Render one composed frame to a PNG file.
pub fn save_frame_png(frame: &FrameRgba, out: &std::path::Path) -> PhotoreelResult<()> {
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        out,
        &frame.data,
        frame.width,
        frame.height,
        image::ExtendedColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", out.display()))?;
    Ok(())
}

/// Straight-alpha blend of a source image onto the frame at `(x, y)`.
fn blit_image(frame: &mut FrameRgba, img: &RgbaImage, x: u32, y: u32) {
    let (iw, ih) = img.dimensions();
    let x_end = (x + iw).min(frame.width);
    let y_end = (y + ih).min(frame.height);

    for dy in y..y_end {
        for dx in x..x_end {
            let src = img.get_pixel(dx - x, dy - y).0;
            let sa = u16::from(src[3]);
            if sa == 0 {
                continue;
            }
            let idx = (dy as usize * frame.width as usize + dx as usize) * 4;
            if sa == 255 {
                frame.data[idx..idx + 4].copy_from_slice(&src);
                continue;
            }
            let inv = 255 - sa;
            for c in 0..3 {
                let s = mul_div255(u16::from(src[c]), sa);
                let d = mul_div255(u16::from(frame.data[idx + c]), inv);
                frame.data[idx + c] = s.saturating_add(d);
            }
            frame.data[idx + 3] =
                (sa as u8).saturating_add(mul_div255(u16::from(frame.data[idx + 3]), inv));
        }
    }
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

/// In-memory loader keyed by source string; used across the crate's
/// tests to exercise the pipeline without touching the filesystem.
#[cfg(test)]
pub(crate) struct MemoryImageLoader {
    images: std::collections::HashMap<String, RgbaImage>,
}

#[cfg(test)]
impl MemoryImageLoader {
    pub(crate) fn new() -> Self {
        Self {
            images: std::collections::HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, source: &str, width: u32, height: u32, rgba: [u8; 4]) {
        let img = RgbaImage::from_pixel(width, height, image::Rgba(rgba));
        self.images.insert(source.to_string(), img);
    }
}

#[cfg(test)]
impl ImageLoader for MemoryImageLoader {
    fn load(&self, source: &str) -> PhotoreelResult<RgbaImage> {
        self.images
            .get(source)
            .cloned()
            .ok_or_else(|| PhotoreelError::frame_load(format!("no such source '{source}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;

    use crate::model::ItemId;

    fn item(source: &str) -> MediaItem {
        MediaItem {
            id: ItemId(0),
            source: source.to_string(),
            timestamp: chrono::Utc.with_ymd_and_hms(2026, 8, 6, 0, 0, 0).unwrap(),
            label: "Crystal Lake".to_string(),
            measurement: 5.2,
            selected: true,
        }
    }

    #[test]
    fn fit_wide_image_letterboxes_vertically() {
        // 200x100 into 640x480: width-bound, centered vertically.
        let fit = fit_rect(200, 100, 640, 480);
        assert_eq!(fit, FitRect { x: 0, y: 80, width: 640, height: 320 });
    }

    #[test]
    fn fit_tall_image_pillarboxes_horizontally() {
        // 100x200 into 640x480: height-bound, centered horizontally.
        let fit = fit_rect(100, 200, 640, 480);
        assert_eq!(fit, FitRect { x: 200, y: 0, width: 240, height: 480 });
    }

    #[test]
    fn fit_exact_aspect_fills_frame() {
        let fit = fit_rect(320, 240, 640, 480);
        assert_eq!(fit, FitRect { x: 0, y: 0, width: 640, height: 480 });
    }

    #[test]
    fn fit_never_exceeds_frame() {
        for (sw, sh) in [(1, 1), (9999, 3), (3, 9999), (640, 480)] {
            let fit = fit_rect(sw, sh, 540, 960);
            assert!(fit.x + fit.width <= 540);
            assert!(fit.y + fit.height <= 960);
        }
        assert_eq!(fit_rect(0, 10, 64, 64).width, 0);
    }

    #[test]
    fn compose_produces_exact_frame_dimensions() {
        let mut loader = MemoryImageLoader::new();
        loader.insert("a", 32, 32, [200, 10, 10, 255]);

        let format = OutputFormat::by_key("landscape").unwrap();
        let frame =
            compose_frame(&item("a"), format, &OverlayLayout::default(), &loader).unwrap();
        assert_eq!(frame.width, format.width);
        assert_eq!(frame.height, format.height);
        assert_eq!(frame.data.len(), (format.width * format.height * 4) as usize);
    }

    #[test]
    fn compose_letterboxes_and_darkens_band() {
        let mut loader = MemoryImageLoader::new();
        // Square white image into landscape frame: pillarboxed.
        loader.insert("a", 64, 64, [255, 255, 255, 255]);

        let format = OutputFormat::by_key("landscape").unwrap();
        let frame =
            compose_frame(&item("a"), format, &OverlayLayout::default(), &loader).unwrap();

        // Pillarbox columns stay scrim-over-black (dark), image center is
        // white dimmed only by the 0.2 scrim.
        let side = frame.px(5, format.height / 2);
        let center = frame.px(format.width / 2, format.height / 3);
        assert!(side[0] < 40, "pillarbox not dark: {side:?}");
        assert!(center[0] > 180, "image area too dark: {center:?}");

        // Bottom band is darker than the image area above it.
        let in_band = frame.px(format.width / 2, format.height - 10);
        assert!(in_band[0] < center[0], "band not darker: {in_band:?} vs {center:?}");
        assert_eq!(in_band[3], 255);
    }

    #[test]
    fn compose_missing_source_is_frame_load_error() {
        let loader = MemoryImageLoader::new();
        let format = OutputFormat::by_key("square").unwrap();
        let err =
            compose_frame(&item("ghost"), format, &OverlayLayout::default(), &loader).unwrap_err();
        assert!(matches!(err, PhotoreelError::FrameLoad(_)));
    }

    #[test]
    fn fs_loader_reports_read_and_decode_failures() {
        let dir = std::path::PathBuf::from("target").join("compose_loader_test");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("not_an_image.png"), b"definitely not a png").unwrap();

        let loader = FsImageLoader::new(&dir);
        assert!(matches!(
            loader.load("missing.png"),
            Err(PhotoreelError::FrameLoad(_))
        ));
        assert!(matches!(
            loader.load("not_an_image.png"),
            Err(PhotoreelError::FrameLoad(_))
        ));

        let img = RgbaImage::from_pixel(3, 2, image::Rgba([1, 2, 3, 255]));
        img.save(dir.join("ok.png")).unwrap();
        let loaded = loader.load("ok.png").unwrap();
        assert_eq!(loaded.dimensions(), (3, 2));
    }
}
