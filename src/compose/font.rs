use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use ttf_parser::Face;
use ttf_parser::name_id;
use usvg::fontdb;

/// Parsed font data plus the numbers needed to measure a line of caption
/// text without rasterizing it.
#[derive(Clone)]
pub struct FontMetrics {
    data: Arc<Vec<u8>>,
    units_per_em: u16,
    space_advance: u16,
    family: Option<String>,
    face_index: u32,
}

impl FontMetrics {
    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_ref()
    }
}

/// The font picked for a compose call: metrics for measuring, family name
/// for the rendered scene.
pub struct ResolvedCaptionFont {
    pub metrics: FontMetrics,
    pub family: String,
}

/// Resolve the font for caption text. An explicit `font_path` wins; otherwise
/// the requested family is looked up among the host's installed fonts, with
/// generic sans-serif resolution for the "sans-serif" family name.
pub fn resolve_caption_font(
    font_path: Option<&Path>,
    family: &str,
) -> Result<ResolvedCaptionFont> {
    if let Some(path) = font_path {
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read font: {}", path.display()))?;
        let metrics = font_metrics_from_data(&data, None)
            .map_err(|err| anyhow!("failed to parse font: {} ({})", path.display(), err))?;
        let family = metrics
            .family()
            .map(|name| name.to_string())
            .unwrap_or_else(|| family.to_string());
        return Ok(ResolvedCaptionFont { metrics, family });
    }

    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    font_metrics_from_family(&db, family)
}

/// Measured pixel width of `text` at `font_size_px`.
///
/// With metrics available this sums the real horizontal glyph advances,
/// scaled by units-per-em. Without them it falls back to the character-class
/// estimate below; the caller opts into that by passing `None`, it is never a
/// silent substitution.
pub fn measure_text_width_px(text: &str, font_size_px: f32, font: Option<&FontMetrics>) -> f32 {
    if let Some(font) = font {
        if let Ok(face) = Face::parse(&font.data, font.face_index) {
            let mut advance = 0u32;
            for ch in text.chars() {
                if ch == '\n' {
                    continue;
                }
                if ch == ' ' {
                    advance = advance.saturating_add(font.space_advance as u32);
                    continue;
                }
                if let Some(glyph) = face.glyph_index(ch) {
                    let glyph_advance = face.glyph_hor_advance(glyph).unwrap_or(font.space_advance);
                    advance = advance.saturating_add(glyph_advance as u32);
                } else {
                    advance = advance.saturating_add(font.space_advance as u32);
                }
            }
            let units = font.units_per_em.max(1) as f32;
            return advance as f32 * (font_size_px / units);
        }
    }
    estimate_text_width_units(text) * font_size_px
}

fn estimate_char_units(ch: char) -> f32 {
    let code = ch as u32;
    if ch.is_whitespace() {
        0.25
    } else if ch.is_ascii_alphanumeric() {
        0.55
    } else if ch.is_ascii() {
        0.35
    } else if matches!(code, 0x0600..=0x06FF | 0x0750..=0x077F | 0xFB50..=0xFEFF) {
        // Arabic script blocks (urdu captions); nastaliq glyphs run narrow
        // per character but join, so a middling width works best.
        0.65
    } else {
        0.9
    }
}

fn estimate_text_width_units(text: &str) -> f32 {
    text.chars().map(estimate_char_units).sum()
}

fn font_metrics_from_data(data: &[u8], preferred_family: Option<&str>) -> Result<FontMetrics> {
    let mut fallback = None;
    let count = ttf_parser::fonts_in_collection(data).unwrap_or(1);
    for index in 0..count {
        if let Ok(face) = Face::parse(data, index) {
            let family = extract_family_name(&face);
            let units_per_em = face.units_per_em().max(1);
            let space_advance = face
                .glyph_index(' ')
                .and_then(|id| face.glyph_hor_advance(id))
                .unwrap_or(units_per_em / 2);
            let metrics = FontMetrics {
                data: Arc::new(data.to_vec()),
                units_per_em,
                space_advance,
                family: family.clone(),
                face_index: index,
            };
            if let (Some(preferred), Some(found)) = (preferred_family, &family) {
                if found.eq_ignore_ascii_case(preferred) {
                    return Ok(metrics);
                }
            }
            if fallback.is_none() {
                fallback = Some(metrics);
            }
        }
    }
    if preferred_family.is_some() {
        return Err(anyhow!("font family not found in font file"));
    }
    fallback.ok_or_else(|| anyhow!("failed to parse font data"))
}

fn font_metrics_from_family(db: &fontdb::Database, family: &str) -> Result<ResolvedCaptionFont> {
    let families = if family.eq_ignore_ascii_case("sans-serif") {
        vec![fontdb::Family::SansSerif]
    } else {
        vec![fontdb::Family::Name(family)]
    };
    // captions render bold, so measure with the bold face when one exists
    let query = fontdb::Query {
        families: &families,
        weight: fontdb::Weight::BOLD,
        ..Default::default()
    };
    let id = db
        .query(&query)
        .ok_or_else(|| anyhow!("font not found: {}", family))?;
    let (data, _face_index) = db
        .with_face_data(id, |data, index| (data.to_vec(), index))
        .ok_or_else(|| anyhow!("failed to load font data: {}", family))?;
    let metrics = font_metrics_from_data(&data, None)?;
    let resolved_family = metrics
        .family()
        .map(|name| name.to_string())
        .unwrap_or_else(|| family.to_string());
    Ok(ResolvedCaptionFont {
        metrics,
        family: resolved_family,
    })
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_scales_with_font_size() {
        let narrow = measure_text_width_px("hello", 20.0, None);
        let wide = measure_text_width_px("hello", 40.0, None);
        assert!((wide - narrow * 2.0).abs() < f32::EPSILON * 100.0);
    }

    #[test]
    fn estimate_counts_every_character() {
        // 5 alphanumerics and one space
        let width = measure_text_width_px("ab cde", 10.0, None);
        assert!((width - (5.0 * 0.55 + 0.25) * 10.0).abs() < 0.001);
    }

    #[test]
    fn estimate_handles_urdu_text() {
        let width = measure_text_width_px("دل", 10.0, None);
        assert!((width - 2.0 * 0.65 * 10.0).abs() < 0.001);
    }
}
