//! Overlay layout and drawing.
//!
//! One configurable descriptor drives every overlay variant: band
//! placement, alignment rules and the font-scale formula live in
//! [`OverlayLayout`] instead of being hardcoded per call site.

use std::sync::Mutex;

use cosmic_text::{
    Attrs as TextAttrs, Buffer, Color, Family, FontSystem, Metrics, Shaping, SwashCache, Weight,
};
use once_cell::sync::Lazy;

use crate::compose::FrameRgba;
use crate::error::{PhotoreelError, PhotoreelResult};
use crate::model::MediaItem;

// Global font system (expensive to create, reused across all frames).
static FONT_SYSTEM: Lazy<Mutex<FontSystem>> = Lazy::new(|| Mutex::new(FontSystem::new()));
static SWASH_CACHE: Lazy<Mutex<SwashCache>> = Lazy::new(|| Mutex::new(SwashCache::new()));

/// Where the info band sits on the frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BandPlacement {
    /// Single band anchored to the bottom edge (video layout).
    #[default]
    Bottom,
    /// Label band at the top, detail band at the bottom (preview layout).
    TopAndBottom,
}

/// Overlay descriptor: band geometry, opacities, margins, font-scale
/// formula and measurement captioning.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OverlayLayout {
    pub band: BandPlacement,
    /// Band height in pixels.
    pub band_height: u32,
    /// Full-frame darkening applied before the bands, 0..=1.
    pub scrim_opacity: f32,
    /// Band darkening, 0..=1.
    pub band_opacity: f32,
    /// Horizontal text inset in pixels.
    pub margin_x: u32,
    /// Label size as a fraction of frame width.
    pub label_scale: f32,
    pub label_min_px: u32,
    /// Date/caption size as a fraction of frame width.
    pub detail_scale: f32,
    pub detail_min_px: u32,
    /// Caption drawn left of the measurement value.
    pub measurement_caption: String,
    /// Unit appended to the measurement value.
    pub measurement_unit: String,
}

impl Default for OverlayLayout {
    fn default() -> Self {
        Self {
            band: BandPlacement::Bottom,
            band_height: 70,
            scrim_opacity: 0.2,
            band_opacity: 0.4,
            margin_x: 15,
            label_scale: 0.025,
            label_min_px: 14,
            detail_scale: 0.022,
            detail_min_px: 12,
            measurement_caption: "Weight:".to_string(),
            measurement_unit: "lbs".to_string(),
        }
    }
}

impl OverlayLayout {
    pub fn validate(&self) -> PhotoreelResult<()> {
        if self.band_height == 0 {
            return Err(PhotoreelError::validation("overlay band_height must be > 0"));
        }
        for (name, v) in [
            ("scrim_opacity", self.scrim_opacity),
            ("band_opacity", self.band_opacity),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(PhotoreelError::validation(format!(
                    "overlay {name} must be within 0..=1, got {v}"
                )));
            }
        }
        for (name, v) in [
            ("label_scale", self.label_scale),
            ("detail_scale", self.detail_scale),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return Err(PhotoreelError::validation(format!(
                    "overlay {name} must be finite and > 0"
                )));
            }
        }
        Ok(())
    }

    /// Label text size: `max(label_min_px, round(width * label_scale))`.
    pub fn label_px(&self, frame_width: u32) -> f32 {
        (frame_width as f32 * self.label_scale)
            .round()
            .max(self.label_min_px as f32)
    }

    /// Detail text size: `max(detail_min_px, round(width * detail_scale))`.
    pub fn detail_px(&self, frame_width: u32) -> f32 {
        (frame_width as f32 * self.detail_scale)
            .round()
            .max(self.detail_min_px as f32)
    }

    /// Measurement text, value plus unit (`5.2 lbs`, `3 lbs`).
    pub fn measurement_text(&self, measurement: f64) -> String {
        format!("{} {}", measurement, self.measurement_unit)
    }
}

// Line tops inside a band, as fractions of the band height. With the
// default 70 px band these land on the original baselines.
const LABEL_LINE_FRAC: f32 = 0.17;
const DETAIL_LINE_FRAC: f32 = 0.54;
const CAPTION_GAP_PX: u32 = 6;

/// Draw scrim, band(s) and metadata text for `item` onto `frame`.
pub(crate) fn paint_overlay(
    frame: &mut FrameRgba,
    item: &MediaItem,
    layout: &OverlayLayout,
) -> PhotoreelResult<()> {
    layout.validate()?;

    let w = frame.width;
    let h = frame.height;
    let band_h = layout.band_height.min(h);

    fill_rect(frame, 0, 0, w, h, [0, 0, 0], layout.scrim_opacity);

    let bottom_band_top = h - band_h;
    fill_rect(frame, 0, bottom_band_top, w, band_h, [0, 0, 0], layout.band_opacity);
    if layout.band == BandPlacement::TopAndBottom {
        fill_rect(frame, 0, 0, w, band_h, [0, 0, 0], layout.band_opacity);
    }

    let label_px = layout.label_px(w);
    let detail_px = layout.detail_px(w);
    let label_line = (band_h as f32 * LABEL_LINE_FRAC) as u32;
    let detail_line = (band_h as f32 * DETAIL_LINE_FRAC) as u32;

    let (label_top, detail_top) = match layout.band {
        BandPlacement::Bottom => (
            bottom_band_top + label_line,
            bottom_band_top + detail_line,
        ),
        // Label moves into the top band; details stay at the bottom.
        BandPlacement::TopAndBottom => (label_line, bottom_band_top + detail_line),
    };

    let label = rasterize(&item.label, label_px, Weight::BOLD)?;
    blit_text(frame, &label, layout.margin_x as i32, label_top as i32);

    let date = rasterize(&item.formatted_date(), detail_px, Weight::NORMAL)?;
    blit_text(frame, &date, layout.margin_x as i32, detail_top as i32);

    let value = rasterize(&layout.measurement_text(item.measurement), label_px, Weight::BOLD)?;
    let caption = rasterize(&layout.measurement_caption, detail_px, Weight::NORMAL)?;
    let value_x = w.saturating_sub(layout.margin_x + value.width) as i32;
    let caption_x = value_x - (caption.width + CAPTION_GAP_PX) as i32;
    // Smaller caption sits on the same visual baseline as the value.
    let caption_top = detail_top as i32 + (label_px - detail_px).max(0.0) as i32;
    blit_text(frame, &value, value_x, detail_top as i32);
    blit_text(frame, &caption, caption_x, caption_top);

    Ok(())
}

/// Blend a constant color over a rectangle at the given opacity.
pub(crate) fn fill_rect(
    frame: &mut FrameRgba,
    x: u32,
    y: u32,
    rect_w: u32,
    rect_h: u32,
    rgb: [u8; 3],
    opacity: f32,
) {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 {
        return;
    }
    let op = (opacity * 255.0).round() as u16;
    let inv = 255 - op;
    let x_end = (x + rect_w).min(frame.width);
    let y_end = (y + rect_h).min(frame.height);

    for py in y..y_end {
        let row = (py * frame.width) as usize * 4;
        for px in x..x_end {
            let idx = row + px as usize * 4;
            for (c, src) in rgb.iter().enumerate() {
                let dst = u16::from(frame.data[idx + c]);
                frame.data[idx + c] = mul_div255(u16::from(*src), op)
                    .saturating_add(mul_div255(dst, inv));
            }
        }
    }
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

/// Rasterized text snippet, straight-alpha RGBA over transparent.
pub(crate) struct TextRaster {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) data: Vec<u8>,
}

/// Shape and rasterize a single white text line with the shared font
/// system. Empty input yields an empty raster.
pub(crate) fn rasterize(text: &str, size_px: f32, weight: Weight) -> PhotoreelResult<TextRaster> {
    if !size_px.is_finite() || size_px <= 0.0 {
        return Err(PhotoreelError::validation("text size_px must be finite and > 0"));
    }
    if text.is_empty() {
        return Ok(TextRaster {
            width: 0,
            height: 0,
            data: Vec::new(),
        });
    }

    let mut font_system = FONT_SYSTEM
        .lock()
        .map_err(|_| PhotoreelError::validation("font system lock poisoned"))?;
    let mut swash_cache = SWASH_CACHE
        .lock()
        .map_err(|_| PhotoreelError::validation("swash cache lock poisoned"))?;

    let line_height = size_px * 1.2;
    let metrics = Metrics::new(size_px, line_height);
    let mut buffer = Buffer::new(&mut font_system, metrics);
    buffer.set_size(&mut font_system, Some(4096.0), None);

    let attrs = TextAttrs::new().family(Family::SansSerif).weight(weight);
    buffer.set_text(&mut font_system, text, &attrs, Shaping::Advanced, None);
    buffer.shape_until_scroll(&mut font_system, false);

    // Measure actual bounds from the layout runs.
    let (mut max_x, mut max_y) = (0.0f32, 0.0f32);
    for run in buffer.layout_runs() {
        for glyph in run.glyphs.iter() {
            max_x = max_x.max(glyph.x + glyph.w);
        }
        max_y = max_y.max(run.line_y + line_height);
    }
    let width = max_x.ceil() as usize;
    let height = max_y.ceil() as usize;
    if width == 0 || height == 0 {
        return Ok(TextRaster {
            width: 0,
            height: 0,
            data: Vec::new(),
        });
    }

    let mut pixels = vec![0u8; width * height * 4];
    let white = Color::rgba(255, 255, 255, 255);
    buffer.draw(&mut font_system, &mut swash_cache, white, |x, y, w, h, color| {
        for dy in 0..h as i32 {
            for dx in 0..w as i32 {
                let (px, py) = (x + dx, y + dy);
                if px < 0 || py < 0 || px >= width as i32 || py >= height as i32 {
                    continue;
                }
                let (dest_x, dest_y) = (px as usize, py as usize);
                let idx = (dest_y * width + dest_x) * 4;
                let src_a = u16::from(color.a());
                let inv = 255 - src_a;
                pixels[idx] = mul_div255(u16::from(color.r()), src_a)
                    .saturating_add(mul_div255(u16::from(pixels[idx]), inv));
                pixels[idx + 1] = mul_div255(u16::from(color.g()), src_a)
                    .saturating_add(mul_div255(u16::from(pixels[idx + 1]), inv));
                pixels[idx + 2] = mul_div255(u16::from(color.b()), src_a)
                    .saturating_add(mul_div255(u16::from(pixels[idx + 2]), inv));
                pixels[idx + 3] =
                    (src_a as u8).saturating_add(mul_div255(u16::from(pixels[idx + 3]), inv));
            }
        }
    });

    Ok(TextRaster {
        width: width as u32,
        height: height as u32,
        data: pixels,
    })
}

/// Alpha-blend a text raster onto the frame at `(x, y)` (top-left),
/// clipping at the frame edges.
pub(crate) fn blit_text(frame: &mut FrameRgba, raster: &TextRaster, x: i32, y: i32) {
    for sy in 0..raster.height as i32 {
        let dy = y + sy;
        if dy < 0 || dy >= frame.height as i32 {
            continue;
        }
        for sx in 0..raster.width as i32 {
            let dx = x + sx;
            if dx < 0 || dx >= frame.width as i32 {
                continue;
            }
            let src = (sy as usize * raster.width as usize + sx as usize) * 4;
            let sa = u16::from(raster.data[src + 3]);
            if sa == 0 {
                continue;
            }
            let dst = (dy as usize * frame.width as usize + dx as usize) * 4;
            let inv = 255 - sa;
            for c in 0..3 {
                frame.data[dst + c] = mul_div255(u16::from(raster.data[src + c]), sa)
                    .saturating_add(mul_div255(u16::from(frame.data[dst + c]), inv));
            }
            frame.data[dst + 3] =
                (sa as u8).saturating_add(mul_div255(u16::from(frame.data[dst + 3]), inv));
        }
    }
}
