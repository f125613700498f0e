//! Text measurement and greedy word wrapping

use crate::geometry::Size;

/// Anything able to measure a string in a given font
pub trait TextMeasure {
    fn measure_text(&self, font: &str, text: &str) -> Size;
}

/// Result of laying out a text block
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    /// Wrapped lines, empty when the text fits on one line
    pub lines: Vec<String>,
    /// Height of a single line
    pub line_height: f64,
    pub size: Size,
}

/// Measure `text` and wrap it on spaces when it exceeds `max_line_width`.
///
/// A word joins the current line while the line plus the word and a
/// trailing space stays strictly under the limit. A single word wider than
/// the limit gets a line of its own.
pub fn layout_text(
    measure: &dyn TextMeasure,
    font: &str,
    text: &str,
    max_line_width: Option<f64>,
) -> TextLayout {
    let single = measure.measure_text(font, text);
    let line_height = single.height;

    let max = match max_line_width {
        Some(max) if max > 0.0 && single.width > max => max,
        _ => {
            return TextLayout {
                lines: Vec::new(),
                line_height,
                size: single,
            }
        }
    };

    let mut lines: Vec<Vec<&str>> = Vec::new();
    let mut widest: f64 = 0.0;

    for word in text.split(' ') {
        let fits = lines.last().is_some_and(|current| {
            let current_width = measure.measure_text(font, &current.join(" ")).width;
            let word_width = measure.measure_text(font, &format!("{word} ")).width;
            current_width + word_width < max
        });

        if fits {
            if let Some(current) = lines.last_mut() {
                current.push(word);
            }
        } else {
            lines.push(vec![word]);
        }

        if let Some(current) = lines.last() {
            widest = widest.max(measure.measure_text(font, &current.join(" ")).width);
        }
    }

    let lines: Vec<String> = lines.into_iter().map(|words| words.join(" ")).collect();
    let height = lines.len() as f64 * line_height;

    TextLayout {
        lines,
        line_height,
        size: Size::new(widest, height),
    }
}
