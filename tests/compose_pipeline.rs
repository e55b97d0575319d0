use std::io::Cursor;

use capshala::compose::{self, CaptionStyle, SourceImage};
use capshala::language::Language;

fn png_image(width: u32, height: u32) -> SourceImage {
    let raster = image::RgbaImage::from_pixel(width, height, image::Rgba([12, 34, 56, 255]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(raster)
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    SourceImage::new(bytes, None).unwrap()
}

fn output_dimensions(bytes: &[u8]) -> (u32, u32) {
    use image::GenericImageView;
    let decoded = image::load_from_memory(bytes).unwrap();
    decoded.dimensions()
}

#[test]
fn wide_source_is_downscaled_to_800() {
    let image = png_image(1600, 900);
    let style = CaptionStyle::default();
    let bytes = compose::compose(&image, "hello world", &style, None, "image/png", 80).unwrap();
    assert_eq!(output_dimensions(&bytes), (800, 450));
}

#[test]
fn narrow_source_keeps_its_size() {
    let image = png_image(400, 400);
    let style = CaptionStyle::default();
    let bytes = compose::compose(&image, "", &style, None, "image/png", 80).unwrap();
    assert_eq!(output_dimensions(&bytes), (400, 400));
}

#[test]
fn compose_is_deterministic() {
    let image = png_image(640, 480);
    let style = CaptionStyle::default();
    let first = compose::compose(&image, "same inputs", &style, None, "image/png", 80).unwrap();
    let second = compose::compose(&image, "same inputs", &style, None, "image/png", 80).unwrap();
    assert_eq!(first, second);
}

#[test]
fn whitespace_only_text_equals_empty_text() {
    let image = png_image(500, 300);
    let style = CaptionStyle::default();
    let empty = compose::compose(&image, "", &style, None, "image/png", 80).unwrap();
    let blank = compose::compose(&image, " \t  ", &style, None, "image/png", 80).unwrap();
    assert_eq!(empty, blank);
}

#[test]
fn jpeg_output_encodes() {
    let image = png_image(320, 240);
    let style = CaptionStyle::default();
    let bytes = compose::compose(&image, "quality", &style, None, "image/jpeg", 80).unwrap();
    assert_eq!(output_dimensions(&bytes), (320, 240));
    // jpeg magic
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
}

#[test]
fn unsupported_output_mime_is_an_error() {
    let image = png_image(100, 100);
    let style = CaptionStyle::default();
    assert!(compose::compose(&image, "x", &style, None, "image/tga", 80).is_err());
}

#[test]
fn sample_scenario_wraps_and_centers() {
    // 1600x900 at font 40 / anchor 50% comes out as an 800x450 canvas with
    // every line inside the 720px wrap limit and the block symmetric
    // around y = 225.
    let image = png_image(1600, 900);
    let style = CaptionStyle {
        font_size_px: 40.0,
        vertical_position_percent: 50.0,
        shadow: true,
        ..CaptionStyle::default()
    };
    let scene = compose::compose_scene(&image, "Wander often, wonder always.", &style, None);
    assert_eq!((scene.width, scene.height), (800, 450));
    assert!(!scene.lines.is_empty());
    for line in &scene.lines {
        let width = compose::measure_text_width_px(&line.text, style.font_size_px, None);
        assert!(width <= 720.0, "line '{}' measures {}px", line.text, width);
    }
    let first = scene.lines.first().unwrap().baseline_y;
    let last = scene.lines.last().unwrap().baseline_y;
    assert!(((first + last) / 2.0 - 225.0).abs() < 0.001);
    assert!(first <= 225.0);
}

#[test]
fn oversized_single_word_gets_its_own_line() {
    // 60 characters at font 100 on a 300-wide canvas dwarfs the 270px wrap
    // limit but still lands on exactly one unbroken line.
    let image = png_image(300, 300);
    let style = CaptionStyle {
        font_size_px: 100.0,
        ..CaptionStyle::default()
    };
    let word = "w".repeat(60);
    let scene = compose::compose_scene(&image, &word, &style, None);
    assert_eq!(scene.lines.len(), 1);
    assert_eq!(scene.lines[0].text, word);
    let width = compose::measure_text_width_px(&word, style.font_size_px, None);
    assert!(width > 270.0);
}

#[test]
fn extreme_vertical_anchors_still_render() {
    let image = png_image(400, 400);
    for position in [0.0, 100.0] {
        let style = CaptionStyle {
            vertical_position_percent: position,
            ..CaptionStyle::default()
        };
        let bytes =
            compose::compose(&image, "edge anchored text", &style, None, "image/png", 80).unwrap();
        assert_eq!(output_dimensions(&bytes), (400, 400));
    }
}

#[test]
fn language_tag_switches_the_fallback_family() {
    let image = png_image(500, 500);
    let urdu = CaptionStyle {
        language: Language::Urdu,
        ..CaptionStyle::default()
    };
    let scene = compose::compose_scene(&image, "دل سے", &urdu, None);
    assert!(scene.svg.contains("Noto Nastaliq Urdu"));

    let english = CaptionStyle::default();
    let scene = compose::compose_scene(&image, "heart", &english, None);
    assert!(scene.svg.contains("sans-serif"));
}
