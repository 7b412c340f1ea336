//! Slide-left preset driven through a text layer.

use motion_core::{Composition, Session, SlideLeftPreset, TextLayer, TransformExt};

const DURATION: i64 = 3_000_000;

fn layer(session: &Session) -> TextLayer {
    TextLayer::make(session, DURATION, "Hello", 48.0, "Sans", "Regular").unwrap()
}

fn position_x(layer: &TextLayer) -> f32 {
    layer.get_transform_2d().unwrap().position_at(0).x
}

#[test]
fn install_starts_at_the_start_position() {
    let session = Session::new();
    let layer = layer(&session);
    let preset = SlideLeftPreset::make(&layer, DURATION, 240.0, 40.0, 0.6, 1.0).unwrap();

    assert_eq!(preset.progress(), 0.0);
    assert_eq!(preset.duration(), DURATION);
    assert!(layer.has_glyph_transform_provider());
    assert!((position_x(&layer) - 240.0).abs() < 1e-4);
    // The vertical position comes from the layer's own transform.
    assert!((layer.get_transform_2d().unwrap().position_at(0).y - 48.0).abs() < 1e-4);
}

#[test]
fn apply_eases_the_position_and_moves_the_layer() {
    let session = Session::new();
    let layer = layer(&session);
    let mut preset = SlideLeftPreset::make(&layer, DURATION, 240.0, 40.0, 0.6, 1.0).unwrap();

    preset.apply(0.5);
    // ease_out_cubic(0.5) = 0.875
    assert!((position_x(&layer) - 65.0).abs() < 1e-3);
    assert!((layer.progress() - 0.5).abs() < 0.01);

    preset.apply(1.0);
    assert!((position_x(&layer) - 40.0).abs() < 1e-4);

    preset.apply(7.0);
    assert_eq!(preset.progress(), 1.0);

    preset.reset();
    assert!((position_x(&layer) - 240.0).abs() < 1e-4);
}

#[test]
fn glyph_offsets_trail_the_layer() {
    let session = Session::new();
    let layer = layer(&session);
    let mut preset = SlideLeftPreset::make(&layer, DURATION, 240.0, 40.0, 0.6, 1.0).unwrap();

    preset.apply(0.5);
    let offsets = layer.glyph_offsets().expect("provider should be active");
    assert_eq!(offsets.len(), 5);
    // Later glyphs start later, so they lag further behind the layer.
    assert!(offsets.dx[0] < offsets.dx[4]);
    assert!(offsets.alpha[0] > offsets.alpha[4]);
    assert!(offsets.dy.iter().all(|dy| *dy == 0.0));

    preset.apply(1.0);
    let settled = layer.glyph_offsets().unwrap();
    assert!(settled.dx.iter().all(|dx| dx.abs() < 1e-4));
    assert!(settled.alpha.iter().all(|alpha| (*alpha - 1.0).abs() < 1e-6));
}

#[test]
fn non_positive_durations_are_rejected() {
    let session = Session::new();
    let layer = layer(&session);
    assert!(SlideLeftPreset::make(&layer, 0, 240.0, 40.0, 0.6, 1.0).is_none());
    assert!(SlideLeftPreset::make(&layer, -5, 240.0, 40.0, 0.6, 1.0).is_none());
    assert!(!layer.has_glyph_transform_provider());
}

#[test]
fn dropping_removes_only_its_own_provider() {
    let session = Session::new();
    let layer = layer(&session);
    let preset = SlideLeftPreset::make(&layer, DURATION, 240.0, 40.0, 0.6, 1.0).unwrap();
    drop(preset);
    assert!(!layer.has_glyph_transform_provider());

    let stale = SlideLeftPreset::make(&layer, DURATION, 240.0, 40.0, 0.6, 1.0).unwrap();
    let replacement = SlideLeftPreset::make(&layer, DURATION, 0.0, 100.0, 0.2, 0.5).unwrap();
    drop(stale);
    assert!(layer.has_glyph_transform_provider());
    drop(replacement);
    assert!(!layer.has_glyph_transform_provider());
}

#[test]
fn preset_outliving_its_layer_is_inert() {
    let session = Session::new();
    let layer = layer(&session);
    let mut preset = SlideLeftPreset::make(&layer, DURATION, 240.0, 40.0, 0.6, 1.0).unwrap();
    drop(layer);

    preset.apply(0.75);
    assert_eq!(preset.progress(), 0.75);
}

/// The preset keeps driving a layer that only its composition still owns.
#[test]
fn preset_drives_a_layer_owned_only_by_its_composition() {
    let session = Session::new();
    let root = Composition::make(&session, 400.0, 200.0, DURATION).unwrap();
    let text = layer(&session);
    assert!(root.add_layer(&text));
    let mut preset = SlideLeftPreset::make(&text, DURATION, 240.0, 40.0, 0.6, 1.0).unwrap();
    drop(text);

    preset.apply(1.0);
    let text = root.layer_at(0).unwrap().as_text().unwrap();
    assert!((position_x(&text) - 40.0).abs() < 1e-4);
    assert!(text.has_glyph_transform_provider());
    drop(text);

    // The layer moves to another composition with no handle held anywhere.
    let other = Composition::make(&session, 400.0, 200.0, DURATION).unwrap();
    assert!(other.add_layer(&root.layer_at(0).unwrap()));
    preset.apply(0.0);
    let text = other.layer_at(0).unwrap().as_text().unwrap();
    assert!((position_x(&text) - 240.0).abs() < 1e-4);
    drop(text);

    drop(preset);
    let text = other.layer_at(0).unwrap().as_text().unwrap();
    assert!(!text.has_glyph_transform_provider());
}

#[test]
fn weak_handle_dies_with_its_tree() {
    let session = Session::new();
    let root = Composition::make(&session, 400.0, 200.0, DURATION).unwrap();
    let text = layer(&session);
    assert!(root.add_layer(&text));
    let weak = text.downgrade();
    drop(text);
    assert!(weak.upgrade().is_some());

    drop(root);
    assert!(weak.upgrade().is_none());
}
