//! Text measurement for the built-in Helvetica faces.
//!
//! The PDF converter only uses the standard PDF fonts, which are never
//! embedded, so widths come from an average-advance heuristic rather than
//! parsed glyph tables.

/// Average advance as a fraction of the font size.
const AVG_ADVANCE: f32 = 0.5;
/// Bold is ~10 % wider.
const AVG_ADVANCE_BOLD: f32 = 0.55;

/// Approximate width of `text` in points.
pub fn measure_text_width(text: &str, font_size: f32, bold: bool) -> f32 {
    let avg = if bold { AVG_ADVANCE_BOLD } else { AVG_ADVANCE };
    text.chars().count() as f32 * font_size * avg
}

/// Baseline offset from the top of a line box.
pub fn ascender(font_size: f32) -> f32 {
    font_size * 0.75
}

/// Word-wrap text to fit within `max_width` points. Returns a vec of lines.
///
/// Existing newlines are kept as hard breaks. A single word wider than
/// `max_width` is broken across lines by character.
pub fn wrap_text(text: &str, font_size: f32, bold: bool, max_width: f32) -> Vec<String> {
    if max_width <= 0.0 || text.is_empty() {
        return vec![text.to_string()];
    }

    let mut lines: Vec<String> = Vec::new();
    for paragraph in text.split('\n') {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current_line = String::new();
        for word in words {
            let candidate = if current_line.is_empty() {
                word.to_string()
            } else {
                format!("{current_line} {word}")
            };
            if measure_text_width(&candidate, font_size, bold) <= max_width {
                current_line = candidate;
                continue;
            }
            if !current_line.is_empty() {
                lines.push(std::mem::take(&mut current_line));
            }
            if measure_text_width(word, font_size, bold) <= max_width {
                current_line = word.to_string();
            } else {
                let mut pieces = break_word(word, font_size, bold, max_width);
                current_line = pieces.pop().unwrap_or_default();
                lines.extend(pieces);
            }
        }
        if !current_line.is_empty() {
            lines.push(current_line);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn break_word(word: &str, font_size: f32, bold: bool, max_width: f32) -> Vec<String> {
    let per_char = measure_text_width("m", font_size, bold);
    let chars_per_line = ((max_width / per_char).floor() as usize).max(1);
    word.chars()
        .collect::<Vec<_>>()
        .chunks(chars_per_line)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_text_width() {
        let w = measure_text_width("Hello", 16.0, false);
        // 5 chars × 16 × 0.5 = 40
        assert!((w - 40.0).abs() < 0.1);
        assert!(measure_text_width("Hello", 16.0, true) > w);
    }

    #[test]
    fn word_wrap_basic() {
        let lines = wrap_text("Hello world foo bar", 16.0, false, 60.0);
        assert!(lines.len() >= 2, "Expected wrapping, got {lines:?}");
        assert!(lines.iter().all(|l| measure_text_width(l, 16.0, false) <= 60.0));
    }

    #[test]
    fn newlines_are_hard_breaks() {
        let lines = wrap_text("one\ntwo", 10.0, false, 500.0);
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn long_word_is_broken() {
        let url = "https://example.com/a/very/long/path/without/any/spaces";
        let lines = wrap_text(url, 10.0, false, 100.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), url);
    }
}
