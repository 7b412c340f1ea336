//! Procedural text motion tests.

use glam::Vec2;
use kurbo::Rect;
use motion_core::{Evaluate, Glyph, Session, TextLayer, TextLayout, TextLines, TextMotionPreset};
use motion_data::motion::{TextMotionEffect, TextMotionEffectSmooth, TextMotionOptions, TextMotionType};
use motion_data::{AnchorPointGrouping, Property, TextDocument};
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn options(motion_type: TextMotionType, effect: TextMotionEffect) -> TextMotionOptions {
    TextMotionOptions {
        motion_type,
        effect,
        duration: 500_000.0,
        effect_delay: 100_000.0,
        ..TextMotionOptions::default()
    }
}

fn text_layer(session: &Session, text: &str) -> TextLayer {
    TextLayer::make(session, 2_000_000, text, 40.0, "Sans", "Regular").unwrap()
}

#[test]
fn reapplying_replaces_previous_animators() {
    init_tracing();
    let session = Session::new();
    let layer = text_layer(&session, "ab cd");
    let mut preset = TextMotionPreset::new(&layer, 60.0);

    assert!(preset.apply(&options(TextMotionType::Fade, TextMotionEffect::Letter)));
    assert_eq!(layer.animators().len(), 4);
    assert!(preset.apply(&options(TextMotionType::Fade, TextMotionEffect::Letter)));
    assert_eq!(layer.animators().len(), 4);

    assert!(preset.apply(&options(TextMotionType::Slide, TextMotionEffect::Word)));
    assert_eq!(layer.animators().len(), 2);
    assert_eq!(
        layer.more_options().map(|options| options.anchor_point_grouping),
        Some(AnchorPointGrouping::Word)
    );
}

#[test]
fn animators_present_before_the_preset_survive() {
    let session = Session::new();
    let layer = text_layer(&session, "abc");
    let mut first = TextMotionPreset::new(&layer, 60.0);
    assert!(first.apply(&options(TextMotionType::Scale, TextMotionEffect::None)));
    assert_eq!(layer.animators().len(), 1);

    let mut second = TextMotionPreset::new(&layer, 60.0);
    assert!(second.apply(&options(TextMotionType::Fade, TextMotionEffect::Letter)));
    assert_eq!(layer.animators().len(), 4);

    second.clear();
    assert_eq!(layer.animators().len(), 1);
}

#[test]
fn whitespace_only_text_produces_nothing() {
    let session = Session::new();
    let layer = text_layer(&session, "   ");
    let mut preset = TextMotionPreset::new(&layer, 60.0);
    assert!(!preset.apply(&options(TextMotionType::Fade, TextMotionEffect::Word)));
    assert!(layer.animators().is_empty());
}

/// Emits one glyph per character, whitespace included.
struct CharLayout;

impl TextLayout for CharLayout {
    fn get_lines(&self, document: &TextDocument) -> TextLines {
        let glyphs = document
            .text
            .chars()
            .enumerate()
            .map(|(i, c)| Glyph {
                name: c.to_string(),
                position: Vec2::new(i as f32 * 10.0, 0.0),
                advance: 10.0,
                bounds: Rect::new(i as f64 * 10.0, -8.0, i as f64 * 10.0 + 10.0, 2.0),
            })
            .collect();
        TextLines {
            lines: vec![glyphs],
            bounds: Rect::new(0.0, -8.0, document.text.chars().count() as f64 * 10.0, 2.0),
        }
    }
}

#[test]
fn whitespace_glyphs_fall_back_to_one_unit() {
    let session = Session::with_text_layout(Arc::new(CharLayout));
    let layer = text_layer(&session, "  ");
    assert_eq!(layer.glyphs().len(), 2);

    let mut preset = TextMotionPreset::new(&layer, 60.0);
    assert!(preset.apply(&options(TextMotionType::Fade, TextMotionEffect::Letter)));
    assert_eq!(layer.animators().len(), 1);
}

#[test]
fn letters_start_after_their_delay() {
    let session = Session::new();
    let layer = text_layer(&session, "abc");
    let mut preset = TextMotionPreset::new(&layer, 60.0);
    assert!(preset.apply(&options(TextMotionType::Fade, TextMotionEffect::Letter)));

    let starts: Vec<i64> = layer
        .animators()
        .iter()
        .map(|animator| match &animator.typography.opacity {
            Some(Property::Animatable(keyframes)) => keyframes[0].start_time,
            other => panic!("expected animated opacity, got {other:?}"),
        })
        .collect();
    // 100 ms at 60 fps is six frames.
    assert_eq!(starts, vec![0, 6, 12]);

    let opacity = layer.animators()[2].typography.opacity.clone().unwrap();
    assert_eq!(opacity.value_at(0), 0);
    assert_eq!(opacity.value_at(60), 255);
}

#[test]
fn smoothed_delays_keep_the_total_stagger() {
    let session = Session::new();
    let layer = text_layer(&session, "abc");
    let mut preset = TextMotionPreset::new(&layer, 60.0);
    let smoothed = TextMotionOptions {
        effect_smooth: TextMotionEffectSmooth::EaseIn,
        ..options(TextMotionType::Scale, TextMotionEffect::Letter)
    };
    assert!(preset.apply(&smoothed));

    let starts: Vec<i64> = layer
        .animators()
        .iter()
        .filter_map(|animator| animator.typography.scale.as_ref())
        .map(|scale| scale.keyframes()[0].start_time)
        .collect();
    // Total stagger 200 ms; ease-in puts the middle letter at a quarter of it.
    assert_eq!(starts, vec![0, 3, 12]);
}

#[test]
fn glyph_styles_fade_in_per_letter() {
    let session = Session::new();
    let layer = text_layer(&session, "ab");
    let mut preset = TextMotionPreset::new(&layer, 60.0);
    assert!(preset.apply(&options(TextMotionType::Fade, TextMotionEffect::Letter)));

    layer.set_current_time(0);
    let styles = layer.glyph_styles();
    assert_eq!(styles.len(), 2);
    assert!(styles.iter().all(|style| style.alpha == 0.0));

    layer.set_current_time(1_500_000);
    assert!(layer.glyph_styles().iter().all(|style| (style.alpha - 1.0).abs() < 1e-6));
}

#[test]
fn dropping_the_preset_restores_grouping() {
    let session = Session::new();
    let layer = text_layer(&session, "hello world");
    {
        let mut preset = TextMotionPreset::new(&layer, 60.0);
        assert!(preset.apply(&options(TextMotionType::Swing, TextMotionEffect::Word)));
        assert!(layer.more_options().is_some());
    }
    assert!(layer.animators().is_empty());
    assert!(layer.more_options().is_none());
}

#[test]
fn applying_bumps_the_content_version() {
    let session = Session::new();
    let layer = text_layer(&session, "abc");
    let before = layer.content_version();
    let mut preset = TextMotionPreset::new(&layer, 60.0);
    preset.apply(&options(TextMotionType::Fade, TextMotionEffect::None));
    assert!(layer.content_version() > before);
}
