mod font;
mod layout;
mod render;

use anyhow::{Context, Result, anyhow};
use image::GenericImageView;

use crate::language::Language;

pub use font::{FontMetrics, ResolvedCaptionFont, measure_text_width_px, resolve_caption_font};
pub use layout::{RenderedLine, place_lines, wrap_caption};
pub use render::{ComposedScene, compose_scene, render_raster};

/// Output canvas width never exceeds this; wider sources are downscaled
/// preserving aspect ratio, narrower ones are left at their native size.
pub const MAX_CANVAS_WIDTH_PX: f32 = 800.0;

/// Fraction of the canvas width available to a wrapped line.
pub const WRAP_WIDTH_RATIO: f32 = 0.9;

/// Line spacing as a multiple of the font size. The source history used both
/// 1.2 and 1.5 at different points; 1.2 is the fixed choice here.
pub const LINE_HEIGHT_FACTOR: f32 = 1.2;

/// Outline width of the legibility stroke drawn beneath the fill.
pub const STROKE_WIDTH_PX: f32 = 4.0;

/// Gaussian sigma of the stroke blur (canvas shadowBlur 8 equivalent).
pub const SHADOW_BLUR_SIGMA: f32 = 4.0;

/// Style knobs for a single compose call. Immutable per render.
#[derive(Debug, Clone)]
pub struct CaptionStyle {
    pub font_size_px: f32,
    pub color: String,
    pub vertical_position_percent: f32,
    pub shadow: bool,
    pub language: Language,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_size_px: 40.0,
            color: "#ffffff".to_string(),
            vertical_position_percent: 50.0,
            shadow: true,
            language: Language::English,
        }
    }
}

/// A successfully decoded source raster. Construction is the only way to get
/// one, so every `SourceImage` reaching the compositor has positive
/// dimensions and a known mime type.
#[derive(Debug, Clone)]
pub struct SourceImage {
    bytes: Vec<u8>,
    mime: String,
    pixel_width: u32,
    pixel_height: u32,
}

impl SourceImage {
    /// Probe and decode `bytes` as an image. The mime type is sniffed from
    /// the content when `mime_hint` is absent.
    pub fn new(bytes: Vec<u8>, mime_hint: Option<&str>) -> Result<Self> {
        let mime = match mime_hint {
            Some(value) if !value.trim().is_empty() => value.trim().to_string(),
            _ => crate::data::sniff_image_mime(&bytes)
                .ok_or_else(|| anyhow!("could not detect an image type from the data"))?,
        };
        let decoded =
            image::load_from_memory(&bytes).with_context(|| "failed to decode source image")?;
        let (pixel_width, pixel_height) = decoded.dimensions();
        if pixel_width == 0 || pixel_height == 0 {
            return Err(anyhow!("source image has zero width or height"));
        }
        Ok(Self {
            bytes,
            mime,
            pixel_width,
            pixel_height,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn pixel_width(&self) -> u32 {
        self.pixel_width
    }

    pub fn pixel_height(&self) -> u32 {
        self.pixel_height
    }
}

/// Output canvas dimensions for a source raster: a uniform downscale keeping
/// the width at or under [`MAX_CANVAS_WIDTH_PX`], never an upscale.
pub fn canvas_size(pixel_width: u32, pixel_height: u32) -> (u32, u32) {
    let scale = (MAX_CANVAS_WIDTH_PX / pixel_width as f32).min(1.0);
    let width = (pixel_width as f32 * scale).round().max(1.0) as u32;
    let height = (pixel_height as f32 * scale).round().max(1.0) as u32;
    (width, height)
}

/// Compose `text` onto a scaled copy of `image` and encode the result.
///
/// Pure apart from the font metrics handed in: the same inputs produce the
/// same bytes. Passing `font: None` switches measurement to the explicit
/// character-class estimate and leaves glyph rendering to whatever fonts the
/// host exposes.
pub fn compose(
    image: &SourceImage,
    text: &str,
    style: &CaptionStyle,
    font: Option<&ResolvedCaptionFont>,
    output_mime: &str,
    jpeg_quality: u8,
) -> Result<Vec<u8>> {
    let scene = compose_scene(image, text, style, font);
    render_raster(
        &scene,
        output_mime,
        jpeg_quality,
        font.map(|resolved| resolved.metrics.data()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canvas_size_downscales_wide_images() {
        assert_eq!(canvas_size(1600, 900), (800, 450));
        assert_eq!(canvas_size(2400, 600), (800, 200));
    }

    #[test]
    fn canvas_size_never_upscales() {
        assert_eq!(canvas_size(400, 400), (400, 400));
        assert_eq!(canvas_size(800, 533), (800, 533));
    }

    #[test]
    fn canvas_size_preserves_aspect_within_rounding() {
        let (w, h) = canvas_size(1213, 781);
        assert_eq!(w, 800);
        let expected = 781.0 * 800.0 / 1213.0;
        assert!((h as f32 - expected).abs() <= 0.5);
    }

    #[test]
    fn source_image_rejects_garbage() {
        assert!(SourceImage::new(vec![0, 1, 2, 3], None).is_err());
    }
}
