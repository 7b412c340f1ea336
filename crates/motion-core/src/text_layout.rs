//! Glyph layout for text layers.
//!
//! Real shaping lives outside this crate; hosts plug it in through
//! [`TextLayout`]. [`GraphemeLayout`] is a fixed-advance fallback for headless use.

use glam::Vec2;
use kurbo::Rect;
use motion_data::TextDocument;
use unicode_segmentation::UnicodeSegmentation;

#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    /// The grapheme this glyph renders.
    pub name: String,
    /// Origin of the glyph on its baseline.
    pub position: Vec2,
    pub advance: f32,
    pub bounds: Rect,
}

impl Glyph {
    /// Spaces, tabs and line breaks separate words.
    pub fn is_whitespace(&self) -> bool {
        match self.name.as_str() {
            "\n" | "\r" | "\r\n" => true,
            name if name.len() == 1 => {
                matches!(name.as_bytes()[0], b' ' | b'\t' | b'\n' | 0x0B | 0x0C | b'\r')
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextLines {
    pub lines: Vec<Vec<Glyph>>,
    pub bounds: Rect,
}

impl TextLines {
    pub fn glyph_count(&self) -> usize {
        self.lines.iter().map(Vec::len).sum()
    }

    pub fn glyphs(&self) -> impl Iterator<Item = &Glyph> {
        self.lines.iter().flatten()
    }
}

pub trait TextLayout: Send + Sync {
    /// Lays `document` out into lines of glyphs in reading order.
    fn get_lines(&self, document: &TextDocument) -> TextLines;
}

/// One glyph per grapheme with a fixed advance of `0.6 em`.
///
/// Trailing whitespace on a line does not produce glyphs.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphemeLayout;

const ADVANCE_EM: f32 = 0.6;
const ASCENT_EM: f32 = 0.8;
const DESCENT_EM: f32 = 0.2;
const LINE_HEIGHT_EM: f32 = 1.2;

impl TextLayout for GraphemeLayout {
    fn get_lines(&self, document: &TextDocument) -> TextLines {
        let size = document.font_size.max(0.0);
        let advance = size * ADVANCE_EM + document.tracking * size / 1000.0;
        let line_height = if document.leading > 0.0 {
            document.leading
        } else {
            size * LINE_HEIGHT_EM
        };

        let mut lines = Vec::new();
        let mut bounds: Option<Rect> = None;
        for (row, text) in document.text.split('\n').enumerate() {
            let text = text.trim_end_matches(|c: char| c.is_whitespace());
            let baseline = row as f32 * line_height - document.baseline_shift;
            let mut line = Vec::new();
            for (column, grapheme) in text.graphemes(true).enumerate() {
                let x = column as f32 * advance;
                let glyph_bounds = Rect::new(
                    x as f64,
                    (baseline - size * ASCENT_EM) as f64,
                    (x + advance) as f64,
                    (baseline + size * DESCENT_EM) as f64,
                );
                bounds = Some(bounds.map_or(glyph_bounds, |b| b.union(glyph_bounds)));
                line.push(Glyph {
                    name: grapheme.to_string(),
                    position: Vec2::new(x, baseline),
                    advance,
                    bounds: glyph_bounds,
                });
            }
            if !line.is_empty() {
                lines.push(line);
            }
        }

        TextLines {
            lines,
            bounds: bounds.unwrap_or(Rect::ZERO),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> TextDocument {
        TextDocument {
            text: text.into(),
            font_size: 10.0,
            ..TextDocument::default()
        }
    }

    #[test]
    fn one_glyph_per_grapheme() {
        let lines = GraphemeLayout.get_lines(&doc("ae\u{301}b"));
        assert_eq!(lines.glyph_count(), 3);
        assert_eq!(lines.lines[0][1].name, "e\u{301}");
        assert!((lines.lines[0][2].position.x - 12.0).abs() < 1e-4);
    }

    #[test]
    fn lines_split_and_trailing_space_dropped() {
        let lines = GraphemeLayout.get_lines(&doc("hi  \nyo"));
        assert_eq!(lines.lines.len(), 2);
        assert_eq!(lines.lines[0].len(), 2);
        assert!((lines.lines[1][0].position.y - 12.0).abs() < 1e-4);
        assert!((lines.bounds.width() - 12.0).abs() < 1e-4);
    }

    #[test]
    fn blank_text_has_no_glyphs() {
        let lines = GraphemeLayout.get_lines(&doc("   \n\t"));
        assert_eq!(lines.glyph_count(), 0);
        assert_eq!(lines.bounds, Rect::ZERO);
    }

    #[test]
    fn whitespace_classification() {
        let glyph = |name: &str| Glyph {
            name: name.into(),
            position: Vec2::ZERO,
            advance: 0.0,
            bounds: Rect::ZERO,
        };
        assert!(glyph(" ").is_whitespace());
        assert!(glyph("\t").is_whitespace());
        assert!(glyph("\r\n").is_whitespace());
        assert!(!glyph("").is_whitespace());
        assert!(!glyph("a").is_whitespace());
        assert!(!glyph("\u{3000}").is_whitespace());
    }
}
