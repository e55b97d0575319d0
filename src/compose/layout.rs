use super::font::{FontMetrics, measure_text_width_px};

/// A line of caption text with its resolved baseline, fresh per render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedLine {
    pub text: String,
    pub baseline_y: f32,
}

/// Greedy word-wrap: words join the current line while the measured width of
/// the candidate stays within `max_width_px`; the word that would overflow
/// starts the next line. A single word wider than the limit still gets a line
/// of its own, never hyphenated or truncated.
pub fn wrap_caption(
    text: &str,
    font_size_px: f32,
    max_width_px: f32,
    font: Option<&FontMetrics>,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split(' ').filter(|word| !word.is_empty()) {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{} {}", current, word);
        if measure_text_width_px(&candidate, font_size_px, font) > max_width_px {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        } else {
            current = candidate;
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Vertical placement: the block of lines is centered on the anchor at
/// `canvas_height * vertical_position_percent / 100`, so the first baseline
/// sits half the block height above it. Blocks may run past the canvas edges
/// at extreme anchors; that is the caller's prerogative.
pub fn place_lines(
    lines: Vec<String>,
    canvas_height: f32,
    vertical_position_percent: f32,
    line_height: f32,
) -> Vec<RenderedLine> {
    let anchor_y = canvas_height * vertical_position_percent / 100.0;
    let start_y = anchor_y - (lines.len().saturating_sub(1)) as f32 * line_height / 2.0;
    lines
        .into_iter()
        .enumerate()
        .map(|(index, text)| RenderedLine {
            text,
            baseline_y: start_y + index as f32 * line_height,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // With estimate metrics an ascii alphanumeric is 0.55 units and a space
    // 0.25, so at font size 100 "aaaa" measures 220px and "aaaa aaaa" 465px.

    #[test]
    fn wraps_greedily_at_the_limit() {
        let lines = wrap_caption("aaaa aaaa aaaa", 100.0, 500.0, None);
        assert_eq!(lines, vec!["aaaa aaaa".to_string(), "aaaa".to_string()]);
    }

    #[test]
    fn keeps_everything_on_one_line_when_it_fits() {
        let lines = wrap_caption("aaaa aaaa aaaa", 100.0, 10_000.0, None);
        assert_eq!(lines, vec!["aaaa aaaa aaaa".to_string()]);
    }

    #[test]
    fn never_splits_a_single_long_word() {
        let word = "a".repeat(60);
        let lines = wrap_caption(&word, 100.0, 270.0, None);
        assert_eq!(lines, vec![word]);
    }

    #[test]
    fn long_word_between_short_ones_keeps_its_own_line() {
        let word = "b".repeat(40);
        let text = format!("hi {} yo", word);
        let lines = wrap_caption(&text, 100.0, 300.0, None);
        assert_eq!(lines, vec!["hi".to_string(), word, "yo".to_string()]);
    }

    #[test]
    fn empty_text_produces_no_lines() {
        assert!(wrap_caption("", 40.0, 720.0, None).is_empty());
        assert!(wrap_caption("   ", 40.0, 720.0, None).is_empty());
    }

    #[test]
    fn single_line_sits_on_the_anchor() {
        let placed = place_lines(vec!["only".to_string()], 450.0, 50.0, 48.0);
        assert_eq!(placed.len(), 1);
        assert!((placed[0].baseline_y - 225.0).abs() < 0.001);
    }

    #[test]
    fn block_is_centered_on_the_anchor() {
        let lines = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let placed = place_lines(lines, 450.0, 50.0, 48.0);
        assert!((placed[0].baseline_y - (225.0 - 48.0)).abs() < 0.001);
        assert!((placed[1].baseline_y - 225.0).abs() < 0.001);
        assert!((placed[2].baseline_y - (225.0 + 48.0)).abs() < 0.001);
        // block midpoint lands on the anchor
        let mid = (placed[0].baseline_y + placed[2].baseline_y) / 2.0;
        assert!((mid - 225.0).abs() < 0.001);
    }

    #[test]
    fn extreme_anchors_stay_finite() {
        let lines = vec!["a".to_string(), "b".to_string()];
        let top = place_lines(lines.clone(), 400.0, 0.0, 60.0);
        assert!(top[0].baseline_y < 0.0);
        let bottom = place_lines(lines, 400.0, 100.0, 60.0);
        assert!(bottom[1].baseline_y > 400.0);
    }
}
