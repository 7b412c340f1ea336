//! Compiles [`TextMotionOptions`] into text animators.
//!
//! Glyphs are grouped into units (the whole text, letters or words). Each unit
//! gets one animator whose range selector covers exactly that unit and whose
//! single keyframe starts after the unit's stagger offset.

use crate::text_layer::{TextLayer, TextState};
use crate::text_layout::Glyph;
use crate::time::time_to_frame;
use glam::Vec2;
use motion_data::motion::{
    TextMotionDirection, TextMotionEasing, TextMotionEffect, TextMotionEffectSmooth, TextMotionOptions,
    TextMotionType,
};
use motion_data::{
    AnchorPointGrouping, Frame, Keyframe, KeyframeInterpolation, KeyframeValue, Opacity, Property,
    TextAnimator, TextAnimatorTypographyProperties, TextMoreOptions, TextRangeSelector, TextSelectorBasedOn,
    OPAQUE, TRANSPARENT,
};
use std::ops::Range;
use tracing::debug;

/// Builds and removes motion animators on one text layer.
///
/// Animators the layer already had when the preset was created are never touched.
pub struct TextMotionPreset {
    layer: TextLayer,
    frame_rate: f32,
    base_animator_count: usize,
    created_more_options: bool,
    original_grouping: AnchorPointGrouping,
}

impl TextMotionPreset {
    pub fn new(layer: &TextLayer, frame_rate: f32) -> Self {
        let (base_animator_count, original_grouping) = layer
            .with_tree(|arena, id, _| {
                let text = arena.node(id)?.text()?;
                let grouping = text
                    .more_options
                    .as_ref()
                    .map_or(AnchorPointGrouping::Character, |options| options.anchor_point_grouping);
                Some((text.animators.len(), grouping))
            })
            .flatten()
            .unwrap_or((0, AnchorPointGrouping::Character));
        Self {
            layer: layer.clone(),
            frame_rate,
            base_animator_count,
            created_more_options: false,
            original_grouping,
        }
    }

    /// Removes everything this preset added and restores the anchor grouping.
    pub fn clear(&mut self) {
        let base = self.base_animator_count;
        let original = self.original_grouping;
        let created = &mut self.created_more_options;
        self.layer.edit(|node| {
            if let Some(text) = node.text_mut() {
                restore(text, base, original, created);
            }
        });
    }

    /// Rebuilds the motion animators for `options`. Returns whether any animator was created.
    pub fn apply(&mut self, options: &TextMotionOptions) -> bool {
        let base = self.base_animator_count;
        let original = self.original_grouping;
        let frame_rate = self.frame_rate;
        let created = &mut self.created_more_options;
        let layer_id = self.layer.unique_id();
        self.layer
            .edit(|node| {
                let (start_time, duration) = (node.start_time, node.duration);
                let Some(text) = node.text_mut() else {
                    return false;
                };
                restore(text, base, original, created);
                let count = build(text, options, frame_rate, start_time, start_time + duration, created);
                debug!(layer = %layer_id, animators = count, "text motion applied");
                count > 0
            })
            .unwrap_or(false)
    }
}

impl Drop for TextMotionPreset {
    fn drop(&mut self) {
        self.clear();
    }
}

fn restore(text: &mut TextState, base: usize, original: AnchorPointGrouping, created: &mut bool) {
    if *created {
        text.more_options = None;
        *created = false;
    } else if let Some(options) = text.more_options.as_mut() {
        options.anchor_point_grouping = original;
    }
    text.animators.truncate(base);
}

/// Appends one animator per unit and returns how many were added.
fn build(
    text: &mut TextState,
    options: &TextMotionOptions,
    frame_rate: f32,
    start_time: Frame,
    last_frame: Frame,
    created: &mut bool,
) -> usize {
    let lines = text.lines();
    let glyphs: Vec<&Glyph> = lines.glyphs().collect();
    if glyphs.is_empty() {
        return 0;
    }
    let ranges = build_ranges(options.effect, &glyphs);
    let glyph_count = glyphs.len();
    let font_size = text.document().font_size;
    let (ease_out, ease_in) = easing_controls(options.easing);
    let duration_us = options.duration.max(0.0);
    let delay_us = options.effect_delay.max(0.0);
    let total_stagger_us = if ranges.len() > 1 {
        delay_us * (ranges.len() - 1) as f64
    } else {
        0.0
    };

    install_grouping(text, options.effect, created);

    let mut added = 0;
    for (index, range) in ranges.iter().enumerate() {
        let range = range.start.min(glyph_count)..range.end.min(glyph_count);
        if range.is_empty() {
            continue;
        }
        let offset_us = if options.effect != TextMotionEffect::None && ranges.len() > 1 {
            match options.effect_smooth {
                TextMotionEffectSmooth::None => delay_us * index as f64,
                smooth => {
                    let normalized = index as f64 / (ranges.len() - 1) as f64;
                    apply_effect_smooth(smooth, normalized) * total_stagger_us
                }
            }
        } else {
            0.0
        };
        let start_frame = start_time + time_to_frame(offset_us.round() as i64, frame_rate);
        let mut end_frame = start_time + time_to_frame((offset_us + duration_us).round() as i64, frame_rate);
        if end_frame <= start_frame {
            end_frame = start_frame + 1;
        }
        if end_frame > last_frame {
            end_frame = last_frame.max(start_frame + 1);
        }
        let frames = start_frame..end_frame;

        let mut typography = TextAnimatorTypographyProperties::default();
        match options.motion_type {
            TextMotionType::Scale => {
                typography.scale = Some(keyframe_property(frames, Vec2::ZERO, Vec2::ONE, ease_out, ease_in));
            }
            TextMotionType::Slide => {
                let offset = slide_offset(font_size, options.direction, options.distance);
                typography.position = Some(keyframe_property(frames, offset, Vec2::ZERO, ease_out, ease_in));
            }
            TextMotionType::Swing => {
                let angle = swing_angle(options.direction);
                typography.rotation = Some(keyframe_property(frames, angle, 0.0, ease_out, ease_in));
            }
            TextMotionType::Fade => {
                typography.opacity = Some(keyframe_property::<Opacity>(
                    frames,
                    TRANSPARENT,
                    OPAQUE,
                    ease_out,
                    ease_in,
                ));
            }
        }

        let based_on = if options.effect == TextMotionEffect::Word {
            TextSelectorBasedOn::Words
        } else {
            TextSelectorBasedOn::Characters
        };
        let selector = TextRangeSelector {
            start: Property::Static(to_percent(range.start, glyph_count)),
            end: Property::Static(to_percent(range.end, glyph_count)),
            based_on,
            ..TextRangeSelector::default()
        };
        text.animators.push(TextAnimator {
            selectors: vec![selector],
            typography,
        });
        added += 1;
    }
    added
}

fn install_grouping(text: &mut TextState, effect: TextMotionEffect, created: &mut bool) {
    let grouping = match effect {
        TextMotionEffect::Word => AnchorPointGrouping::Word,
        TextMotionEffect::None => AnchorPointGrouping::All,
        TextMotionEffect::Letter => AnchorPointGrouping::Character,
    };
    let alignment = || Property::Static(Vec2::new(0.5, 0.5));
    match text.more_options.as_mut() {
        Some(options) => {
            options.grouping_alignment.get_or_insert_with(alignment);
            options.anchor_point_grouping = grouping;
        }
        None => {
            text.more_options = Some(TextMoreOptions {
                anchor_point_grouping: grouping,
                grouping_alignment: Some(alignment()),
            });
            *created = true;
        }
    }
}

/// Splits glyphs into animated units. Never returns an empty list for non-empty input.
pub(crate) fn build_ranges(effect: TextMotionEffect, glyphs: &[&Glyph]) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    if glyphs.is_empty() {
        return ranges;
    }
    match effect {
        TextMotionEffect::Letter => {
            ranges.extend(
                glyphs
                    .iter()
                    .enumerate()
                    .filter(|(_, glyph)| !glyph.is_whitespace())
                    .map(|(i, _)| i..i + 1),
            );
        }
        TextMotionEffect::Word => {
            let mut word_start = None;
            for (i, glyph) in glyphs.iter().enumerate() {
                match (glyph.is_whitespace(), word_start) {
                    (true, Some(start)) => {
                        ranges.push(start..i);
                        word_start = None;
                    }
                    (false, None) => word_start = Some(i),
                    _ => {}
                }
            }
            if let Some(start) = word_start {
                ranges.push(start..glyphs.len());
            }
        }
        TextMotionEffect::None => ranges.push(0..glyphs.len()),
    }
    if ranges.is_empty() {
        ranges.push(0..glyphs.len());
    }
    ranges
}

fn to_percent(value: usize, total: usize) -> f32 {
    if total == 0 {
        return 0.0;
    }
    (value as f64 / total as f64) as f32
}

pub(crate) fn apply_effect_smooth(smooth: TextMotionEffectSmooth, t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    match smooth {
        TextMotionEffectSmooth::Smooth => t * t * (3.0 - 2.0 * t),
        TextMotionEffectSmooth::EaseIn => t * t,
        TextMotionEffectSmooth::EaseOut => {
            let inv = 1.0 - t;
            1.0 - inv * inv
        }
        TextMotionEffectSmooth::None => t,
    }
}

/// Out and in control points of each easing family.
pub(crate) fn easing_controls(easing: TextMotionEasing) -> (Vec2, Vec2) {
    match easing {
        TextMotionEasing::Smooth => (Vec2::new(0.42, 0.0), Vec2::new(0.58, 1.0)),
        TextMotionEasing::EaseIn => (Vec2::new(0.42, 0.0), Vec2::new(1.0, 1.0)),
        TextMotionEasing::EaseOut => (Vec2::new(0.0, 0.0), Vec2::new(0.58, 1.0)),
        TextMotionEasing::Back => (Vec2::new(0.36, -0.2), Vec2::new(0.66, 1.2)),
        TextMotionEasing::Bounce => (Vec2::new(0.3, 1.3), Vec2::new(0.6, 1.0)),
        TextMotionEasing::Spring => (Vec2::new(0.45, 1.4), Vec2::new(0.8, 1.0)),
    }
}

fn keyframe_property<T: KeyframeValue>(
    frames: Range<Frame>,
    start_value: T,
    end_value: T,
    ease_out: Vec2,
    ease_in: Vec2,
) -> Property<T> {
    Property::Animatable(vec![Keyframe {
        interpolation: KeyframeInterpolation::Bezier,
        bezier_out: vec![ease_out; T::DIMENSIONS],
        bezier_in: vec![ease_in; T::DIMENSIONS],
        ..Keyframe::linear(frames.start, frames.end, start_value, end_value)
    }])
}

fn slide_offset(font_size: f32, direction: TextMotionDirection, distance: f64) -> Vec2 {
    let magnitude = (distance * font_size as f64) as f32;
    match direction {
        TextMotionDirection::Up => Vec2::new(0.0, -magnitude),
        TextMotionDirection::Down => Vec2::new(0.0, magnitude),
        TextMotionDirection::Left => Vec2::new(-magnitude, 0.0),
        TextMotionDirection::Right | TextMotionDirection::Side => Vec2::new(magnitude, 0.0),
    }
}

fn swing_angle(direction: TextMotionDirection) -> f32 {
    match direction {
        TextMotionDirection::Up => -20.0,
        TextMotionDirection::Down => 20.0,
        TextMotionDirection::Left => -15.0,
        TextMotionDirection::Right => 15.0,
        TextMotionDirection::Side => 12.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Rect;

    fn glyphs(text: &str) -> Vec<Glyph> {
        text.chars()
            .map(|c| Glyph {
                name: c.to_string(),
                position: Vec2::ZERO,
                advance: 1.0,
                bounds: Rect::ZERO,
            })
            .collect()
    }

    fn ranges(effect: TextMotionEffect, text: &str) -> Vec<Range<usize>> {
        let owned = glyphs(text);
        let refs: Vec<&Glyph> = owned.iter().collect();
        build_ranges(effect, &refs)
    }

    #[test]
    fn words_split_on_whitespace() {
        assert_eq!(ranges(TextMotionEffect::Word, "ab  cd\ne"), vec![0..2, 4..6, 7..8]);
    }

    #[test]
    fn letters_skip_whitespace() {
        assert_eq!(ranges(TextMotionEffect::Letter, "a b"), vec![0..1, 2..3]);
    }

    #[test]
    fn whitespace_only_falls_back_to_full_span() {
        assert_eq!(ranges(TextMotionEffect::Word, "   "), vec![0..3]);
        assert_eq!(ranges(TextMotionEffect::None, "ab"), vec![0..2]);
        assert!(ranges(TextMotionEffect::Letter, "").is_empty());
    }

    #[test]
    fn smoothing_curves_hit_endpoints() {
        for smooth in [
            TextMotionEffectSmooth::None,
            TextMotionEffectSmooth::Smooth,
            TextMotionEffectSmooth::EaseIn,
            TextMotionEffectSmooth::EaseOut,
        ] {
            assert_eq!(apply_effect_smooth(smooth, 0.0), 0.0);
            assert_eq!(apply_effect_smooth(smooth, 1.0), 1.0);
        }
        assert_eq!(apply_effect_smooth(TextMotionEffectSmooth::EaseIn, 0.5), 0.25);
        assert_eq!(apply_effect_smooth(TextMotionEffectSmooth::EaseOut, 0.5), 0.75);
    }

    #[test]
    fn point_keyframes_ease_every_axis() {
        let property = keyframe_property(0..10, Vec2::ZERO, Vec2::ONE, Vec2::new(0.42, 0.0), Vec2::new(0.58, 1.0));
        let keyframe = &property.keyframes()[0];
        assert_eq!(keyframe.bezier_out.len(), 2);
        assert_eq!(keyframe.interpolation, KeyframeInterpolation::Bezier);
    }
}
