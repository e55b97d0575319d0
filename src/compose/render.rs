use std::io::Cursor;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use resvg::render;
use tiny_skia::Pixmap;
use usvg::{Options, Tree, fontdb};

use super::layout::{RenderedLine, place_lines, wrap_caption};
use super::{
    CaptionStyle, LINE_HEIGHT_FACTOR, ResolvedCaptionFont, SHADOW_BLUR_SIGMA, STROKE_WIDTH_PX,
    SourceImage, WRAP_WIDTH_RATIO, canvas_size,
};
use crate::language::Language;

const SHADOW_FILTER_ID: &str = "caption-shadow";

/// A fully laid-out caption scene: the vector description of the flattened
/// output plus the line layout that produced it.
#[derive(Debug, Clone)]
pub struct ComposedScene {
    pub svg: String,
    pub width: u32,
    pub height: u32,
    pub lines: Vec<RenderedLine>,
}

/// Lay the caption out over a scaled copy of the source image.
///
/// Whitespace-only text skips the text stage entirely and yields the scaled
/// base image. Pure: no I/O, deterministic for fixed inputs and metrics.
pub fn compose_scene(
    image: &SourceImage,
    text: &str,
    style: &CaptionStyle,
    font: Option<&ResolvedCaptionFont>,
) -> ComposedScene {
    let (width, height) = canvas_size(image.pixel_width(), image.pixel_height());
    let data_uri = format!("data:{};base64,{}", image.mime(), BASE64.encode(image.bytes()));

    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    ));
    svg.push_str(&format!(
        r#"<image href="{uri}" xlink:href="{uri}" x="0" y="0" width="{w}" height="{h}" preserveAspectRatio="none"/>"#,
        uri = data_uri,
        w = width,
        h = height
    ));

    let trimmed = text.trim();
    let mut placed = Vec::new();
    if !trimmed.is_empty() {
        let max_width = width as f32 * WRAP_WIDTH_RATIO;
        let metrics = font.map(|resolved| &resolved.metrics);
        let wrapped = wrap_caption(trimmed, style.font_size_px, max_width, metrics);
        let line_height = style.font_size_px * LINE_HEIGHT_FACTOR;
        placed = place_lines(
            wrapped,
            height as f32,
            style.vertical_position_percent,
            line_height,
        );

        let family = font
            .map(|resolved| resolved.family.as_str())
            .unwrap_or(match style.language {
                Language::Urdu => "Noto Nastaliq Urdu",
                _ => "sans-serif",
            });
        let center_x = width as f32 / 2.0;

        if style.shadow {
            svg.push_str(&format!(
                r#"<defs><filter id="{id}" x="-50%" y="-50%" width="200%" height="200%"><feGaussianBlur stdDeviation="{sigma}"/></filter></defs>"#,
                id = SHADOW_FILTER_ID,
                sigma = SHADOW_BLUR_SIGMA
            ));
        }

        for line in &placed {
            let escaped = escape_xml(&line.text);
            if style.shadow {
                // blurred black outline beneath the fill; the fill pass below
                // carries no filter so the shadow never bleeds onto it
                svg.push_str(&format!(
                    r#"<text x="{x}" y="{y}" font-size="{size}" font-weight="bold" font-family="{family}" text-anchor="middle" dominant-baseline="central" fill="none" stroke="black" stroke-width="{stroke}" filter="url(#{filter})">{text}</text>"#,
                    x = center_x,
                    y = line.baseline_y,
                    size = style.font_size_px,
                    family = escape_xml(family),
                    stroke = STROKE_WIDTH_PX,
                    filter = SHADOW_FILTER_ID,
                    text = escaped
                ));
            }
            svg.push_str(&format!(
                r#"<text x="{x}" y="{y}" font-size="{size}" font-weight="bold" font-family="{family}" text-anchor="middle" dominant-baseline="central" fill="{color}">{text}</text>"#,
                x = center_x,
                y = line.baseline_y,
                size = style.font_size_px,
                family = escape_xml(family),
                color = escape_xml(&style.color),
                text = escaped
            ));
        }
    }

    svg.push_str("</svg>");
    ComposedScene {
        svg,
        width,
        height,
        lines: placed,
    }
}

/// Rasterize a composed scene and encode it as `output_mime`.
///
/// `font_data` is loaded into the renderer's font database alongside the
/// host fonts so measurement and rasterization agree on glyphs.
pub fn render_raster(
    scene: &ComposedScene,
    output_mime: &str,
    jpeg_quality: u8,
    font_data: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    if let Some(data) = font_data {
        db.load_font_data(data.to_vec());
    }
    let options = Options {
        fontdb: Arc::new(db),
        ..Options::default()
    };
    let tree = Tree::from_str(&scene.svg, &options).with_context(|| "failed to parse scene")?;
    let size = tree.size().to_int_size();
    let mut pixmap =
        Pixmap::new(size.width(), size.height()).ok_or_else(|| anyhow!("empty scene size"))?;
    let mut pixmap_mut = pixmap.as_mut();
    render(&tree, tiny_skia::Transform::identity(), &mut pixmap_mut);
    let raster = image::RgbaImage::from_raw(size.width(), size.height(), pixmap.data().to_vec())
        .ok_or_else(|| anyhow!("failed to build image buffer from scene"))?;
    encode_raster(raster, output_mime, jpeg_quality)
}

fn encode_raster(raster: image::RgbaImage, output_mime: &str, jpeg_quality: u8) -> Result<Vec<u8>> {
    let format = image_format_from_mime(output_mime)
        .ok_or_else(|| anyhow!("unsupported output image mime '{}'", output_mime))?;
    let mut bytes = Vec::new();
    let mut cursor = Cursor::new(&mut bytes);
    if format == image::ImageFormat::Jpeg {
        let quality = jpeg_quality.clamp(1, 100);
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality);
        let rgb = image::DynamicImage::ImageRgba8(raster).to_rgb8();
        rgb.write_with_encoder(encoder)
            .with_context(|| "failed to encode composed jpeg")?;
    } else {
        image::DynamicImage::ImageRgba8(raster)
            .write_to(&mut cursor, format)
            .with_context(|| "failed to encode composed image")?;
    }
    Ok(bytes)
}

fn image_format_from_mime(mime: &str) -> Option<image::ImageFormat> {
    match mime {
        "image/png" => Some(image::ImageFormat::Png),
        "image/jpeg" | "image/jpg" => Some(image::ImageFormat::Jpeg),
        "image/webp" => Some(image::ImageFormat::WebP),
        "image/bmp" => Some(image::ImageFormat::Bmp),
        _ => None,
    }
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;

    fn sample_image(width: u32, height: u32) -> SourceImage {
        let raster = image::RgbaImage::from_pixel(width, height, image::Rgba([30, 60, 90, 255]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgba8(raster)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        SourceImage::new(bytes, None).unwrap()
    }

    #[test]
    fn scene_scales_the_canvas() {
        let image = sample_image(1600, 900);
        let scene = compose_scene(&image, "hello", &CaptionStyle::default(), None);
        assert_eq!((scene.width, scene.height), (800, 450));
    }

    #[test]
    fn empty_text_skips_the_text_stage() {
        let image = sample_image(400, 400);
        let scene = compose_scene(&image, "", &CaptionStyle::default(), None);
        assert!(scene.lines.is_empty());
        assert!(!scene.svg.contains("<text"));
        assert!(scene.svg.contains("<image"));
    }

    #[test]
    fn whitespace_only_matches_empty() {
        let image = sample_image(400, 400);
        let style = CaptionStyle::default();
        let empty = compose_scene(&image, "", &style, None);
        let blank = compose_scene(&image, "  \t ", &style, None);
        assert_eq!(empty.svg, blank.svg);
    }

    #[test]
    fn shadow_adds_a_stroke_pass_per_line() {
        let image = sample_image(600, 600);
        let mut style = CaptionStyle::default();
        style.shadow = true;
        let scene = compose_scene(&image, "hello there", &style, None);
        assert!(scene.svg.contains("stroke=\"black\""));
        assert!(scene.svg.contains(SHADOW_FILTER_ID));

        style.shadow = false;
        let plain = compose_scene(&image, "hello there", &style, None);
        assert!(!plain.svg.contains("stroke=\"black\""));
        assert!(!plain.svg.contains("<filter"));
        assert!(!plain.svg.contains("filter=\"url("));
    }

    #[test]
    fn fill_pass_carries_no_filter() {
        let image = sample_image(600, 600);
        let scene = compose_scene(&image, "hi", &CaptionStyle::default(), None);
        let fill = scene
            .svg
            .split("<text")
            .find(|chunk| chunk.contains("fill=\"#ffffff\""))
            .unwrap();
        let fill_element = &fill[..fill.find("</text>").unwrap()];
        assert!(!fill_element.contains("filter"));
    }

    #[test]
    fn escapes_markup_in_caption_text() {
        let image = sample_image(600, 600);
        let style = CaptionStyle {
            language: Language::Roman,
            ..CaptionStyle::default()
        };
        let scene = compose_scene(&image, "<b> & \"q\"", &style, None);
        assert!(scene.svg.contains("&lt;b&gt; &amp; &quot;q&quot;"));
    }
}
