//! Per-glyph evaluation of text animators.
//!
//! Each animator's range selectors produce a coverage factor per glyph; the
//! animator's typography values are then blended in by that factor.

use crate::animatable::Evaluate;
use crate::text_layout::TextLines;
use crate::time::FrameRange;
use glam::Vec2;
use motion_data::{
    Frame, TextAnimator, TextRangeSelector, TextRangeSelectorShape, TextRangeSelectorUnits,
    TextSelectorBasedOn, TextSelectorMode, OPAQUE,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GlyphStyle {
    pub offset: Vec2,
    pub scale: Vec2,
    pub rotation: f32,
    pub alpha: f32,
}

impl Default for GlyphStyle {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
            alpha: 1.0,
        }
    }
}

pub(crate) fn animator_varying_ranges(animators: &[TextAnimator]) -> Vec<FrameRange> {
    let mut ranges = Vec::new();
    for animator in animators {
        let typography = &animator.typography;
        if let Some(p) = &typography.opacity {
            ranges.extend(p.varying_ranges());
        }
        if let Some(p) = &typography.position {
            ranges.extend(p.varying_ranges());
        }
        if let Some(p) = &typography.scale {
            ranges.extend(p.varying_ranges());
        }
        if let Some(p) = &typography.rotation {
            ranges.extend(p.varying_ranges());
        }
        for selector in &animator.selectors {
            for p in [
                &selector.start,
                &selector.end,
                &selector.offset,
                &selector.amount,
                &selector.smoothness,
                &selector.ease_high,
                &selector.ease_low,
            ] {
                ranges.extend(p.varying_ranges());
            }
        }
    }
    ranges
}

/// Index of each glyph within the unit kind a selector counts, plus the unit total.
struct GlyphUnits {
    index: Vec<Option<usize>>,
    count: usize,
}

impl GlyphUnits {
    fn new(lines: &TextLines, based_on: TextSelectorBasedOn) -> Self {
        let mut index = Vec::with_capacity(lines.glyph_count());
        let mut count = 0;
        match based_on {
            TextSelectorBasedOn::Characters => {
                index.extend((0..lines.glyph_count()).map(Some));
                count = lines.glyph_count();
            }
            TextSelectorBasedOn::CharactersExcludingSpaces => {
                for glyph in lines.glyphs() {
                    if glyph.is_whitespace() {
                        index.push(None);
                    } else {
                        index.push(Some(count));
                        count += 1;
                    }
                }
            }
            TextSelectorBasedOn::Words => {
                for line in &lines.lines {
                    let mut in_word = false;
                    for glyph in line {
                        if glyph.is_whitespace() {
                            in_word = false;
                            index.push(None);
                        } else {
                            if !in_word {
                                count += 1;
                                in_word = true;
                            }
                            index.push(Some(count - 1));
                        }
                    }
                }
            }
            TextSelectorBasedOn::Lines => {
                for (row, line) in lines.lines.iter().enumerate() {
                    index.extend(line.iter().map(|_| Some(row)));
                }
                count = lines.lines.len();
            }
        }
        Self { index, count }
    }
}

fn shape_factor(shape: TextRangeSelectorShape, lo: f32, hi: f32, unit: usize) -> f32 {
    let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    let unit_lo = unit as f32;
    match shape {
        TextRangeSelectorShape::Square => {
            let overlap = (hi.min(unit_lo + 1.0) - lo.max(unit_lo)).max(0.0);
            overlap.clamp(0.0, 1.0)
        }
        _ => {
            let span = hi - lo;
            let center = unit_lo + 0.5;
            if span <= 0.0 || center < lo || center > hi {
                return 0.0;
            }
            let t = (center - lo) / span;
            match shape {
                TextRangeSelectorShape::RampUp => t,
                TextRangeSelectorShape::RampDown => 1.0 - t,
                TextRangeSelectorShape::Triangle => 1.0 - (2.0 * t - 1.0).abs(),
                TextRangeSelectorShape::Round => (1.0 - (2.0 * t - 1.0).powi(2)).max(0.0).sqrt(),
                _ => {
                    let x = 1.0 - (2.0 * t - 1.0).abs();
                    x * x * (3.0 - 2.0 * x)
                }
            }
        }
    }
}

fn selector_factors(selector: &TextRangeSelector, lines: &TextLines, frame: Frame) -> Vec<f32> {
    let units = GlyphUnits::new(lines, selector.based_on);
    let offset = selector.offset.value_at(frame);
    let (mut lo, mut hi) = (
        selector.start.value_at(frame) + offset,
        selector.end.value_at(frame) + offset,
    );
    if selector.units == TextRangeSelectorUnits::Percentage {
        lo *= units.count as f32;
        hi *= units.count as f32;
    }
    let amount = selector.amount.value_at(frame);
    units
        .index
        .iter()
        .map(|unit| unit.map_or(0.0, |u| shape_factor(selector.shape, lo, hi, u) * amount))
        .collect()
}

fn combine(mode: TextSelectorMode, total: f32, value: f32) -> f32 {
    match mode {
        TextSelectorMode::None => total,
        TextSelectorMode::Add => total + value,
        TextSelectorMode::Subtract => total - value,
        TextSelectorMode::Intersect => total * value,
        TextSelectorMode::Min => total.min(value),
        TextSelectorMode::Max => total.max(value),
        TextSelectorMode::Difference => (total - value).abs(),
    }
}

/// Coverage of each glyph by the animator's selectors, in `0..=1`.
pub fn selection_factors(animator: &TextAnimator, lines: &TextLines, frame: Frame) -> Vec<f32> {
    let mut totals = vec![0.0f32; lines.glyph_count()];
    for selector in &animator.selectors {
        let factors = selector_factors(selector, lines, frame);
        for (total, value) in totals.iter_mut().zip(factors) {
            *total = combine(selector.mode, *total, value);
        }
    }
    totals.iter_mut().for_each(|total| *total = total.clamp(0.0, 1.0));
    totals
}

/// Resolves the combined style of every glyph at a layer frame.
pub fn resolve_glyph_styles(animators: &[TextAnimator], lines: &TextLines, frame: Frame) -> Vec<GlyphStyle> {
    let mut styles = vec![GlyphStyle::default(); lines.glyph_count()];
    for animator in animators {
        let factors = selection_factors(animator, lines, frame);
        let typography = &animator.typography;
        let position = typography.position.as_ref().map(|p| p.value_at(frame));
        let scale = typography.scale.as_ref().map(|p| p.value_at(frame));
        let rotation = typography.rotation.as_ref().map(|p| p.value_at(frame));
        let opacity = typography
            .opacity
            .as_ref()
            .map(|p| p.value_at(frame) as f32 / OPAQUE as f32);

        for (style, factor) in styles.iter_mut().zip(factors) {
            if factor <= 0.0 {
                continue;
            }
            if let Some(position) = position {
                style.offset += position * factor;
            }
            if let Some(scale) = scale {
                style.scale *= Vec2::ONE + (scale - Vec2::ONE) * factor;
            }
            if let Some(rotation) = rotation {
                style.rotation += rotation * factor;
            }
            if let Some(opacity) = opacity {
                style.alpha *= 1.0 + (opacity - 1.0) * factor;
            }
        }
    }
    styles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text_layout::{GraphemeLayout, TextLayout};
    use motion_data::{Property, TextAnimatorTypographyProperties, TextDocument};

    fn lines(text: &str) -> TextLines {
        GraphemeLayout.get_lines(&TextDocument {
            text: text.into(),
            ..TextDocument::default()
        })
    }

    fn selector(start: f32, end: f32) -> TextRangeSelector {
        TextRangeSelector {
            start: Property::Static(start),
            end: Property::Static(end),
            ..TextRangeSelector::default()
        }
    }

    #[test]
    fn square_selector_covers_whole_and_partial_glyphs() {
        let animator = TextAnimator {
            selectors: vec![selector(0.25, 0.625)],
            ..TextAnimator::default()
        };
        let factors = selection_factors(&animator, &lines("abcd"), 0);
        assert_eq!(factors, vec![0.0, 1.0, 0.5, 0.0]);
    }

    #[test]
    fn word_units_skip_spaces() {
        let animator = TextAnimator {
            selectors: vec![TextRangeSelector {
                based_on: TextSelectorBasedOn::Words,
                ..selector(0.5, 1.0)
            }],
            ..TextAnimator::default()
        };
        let factors = selection_factors(&animator, &lines("ab cd"), 0);
        assert_eq!(factors, vec![0.0, 0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn typography_blends_by_coverage() {
        let animator = TextAnimator {
            selectors: vec![selector(0.0, 0.5)],
            typography: TextAnimatorTypographyProperties {
                opacity: Some(Property::Static(0)),
                position: Some(Property::Static(Vec2::new(0.0, 10.0))),
                scale: Some(Property::Static(Vec2::ZERO)),
                rotation: Some(Property::Static(20.0)),
            },
        };
        let styles = resolve_glyph_styles(&[animator], &lines("ab"), 0);
        assert_eq!(styles[0].alpha, 0.0);
        assert_eq!(styles[0].offset, Vec2::new(0.0, 10.0));
        assert_eq!(styles[0].scale, Vec2::ZERO);
        assert_eq!(styles[0].rotation, 20.0);
        assert_eq!(styles[1], GlyphStyle::default());
    }

    #[test]
    fn subtract_mode_removes_coverage() {
        let animator = TextAnimator {
            selectors: vec![
                selector(0.0, 1.0),
                TextRangeSelector {
                    mode: TextSelectorMode::Subtract,
                    ..selector(0.5, 1.0)
                },
            ],
            ..TextAnimator::default()
        };
        assert_eq!(selection_factors(&animator, &lines("ab"), 0), vec![1.0, 0.0]);
    }

    #[test]
    fn triangle_shape_peaks_in_the_middle() {
        assert_eq!(shape_factor(TextRangeSelectorShape::Triangle, 0.0, 3.0, 1), 1.0);
        assert!(shape_factor(TextRangeSelectorShape::Triangle, 0.0, 3.0, 0) < 0.5);
        assert_eq!(shape_factor(TextRangeSelectorShape::RampUp, 0.0, 2.0, 5), 0.0);
    }
}
