use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::Vec2;
use motion_core::{Composition, Evaluate, Layer, Session, TextLayer, TextMotionPreset};
use motion_data::motion::{TextMotionEffect, TextMotionOptions};
use motion_data::{Keyframe, KeyframeInterpolation, Property};

fn eased_point_track(count: i64) -> Property<Vec2> {
    let keyframes = (0..count)
        .map(|i| Keyframe {
            interpolation: KeyframeInterpolation::Bezier,
            bezier_out: vec![Vec2::new(0.42, 0.0); 2],
            bezier_in: vec![Vec2::new(0.58, 1.0); 2],
            ..Keyframe::linear(i * 10, i * 10 + 10, Vec2::splat(i as f32), Vec2::splat(i as f32 + 1.0))
        })
        .collect();
    Property::make_animatable(keyframes).unwrap()
}

fn bench_property(c: &mut Criterion) {
    let track = eased_point_track(64);
    c.bench_function("property_value_at_64_keyframes", |b| {
        let mut frame = 0;
        b.iter(|| {
            frame = (frame + 7) % 640;
            black_box(track.value_at(black_box(frame)))
        })
    });
}

fn bench_timeline(c: &mut Criterion) {
    let session = Session::new();
    let root = Composition::make(&session, 1920.0, 1080.0, 10_000_000).unwrap();
    for _ in 0..16 {
        let inner = Composition::make(&session, 1920.0, 1080.0, 10_000_000).unwrap();
        for _ in 0..16 {
            inner.add_layer(&Layer::make_solid(&session, 10_000_000, 10.0, 10.0).unwrap());
        }
        root.add_layer(&inner);
    }
    c.bench_function("set_current_time_272_layers", |b| {
        let mut time = 0;
        b.iter(|| {
            time = (time + 16_667) % 10_000_000;
            black_box(root.set_current_time(time))
        })
    });
}

fn bench_glyph_styles(c: &mut Criterion) {
    let session = Session::new();
    let layer = TextLayer::make(&session, 4_000_000, "The quick brown fox jumps", 48.0, "", "").unwrap();
    let mut preset = TextMotionPreset::new(&layer, 60.0);
    preset.apply(&TextMotionOptions {
        duration: 600_000.0,
        effect: TextMotionEffect::Letter,
        effect_delay: 40_000.0,
        ..TextMotionOptions::default()
    });
    layer.set_current_time(500_000);
    c.bench_function("glyph_styles_letter_fade", |b| b.iter(|| black_box(layer.glyph_styles())));
}

criterion_group!(benches, bench_property, bench_timeline, bench_glyph_styles);
criterion_main!(benches);
