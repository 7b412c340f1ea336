use crate::animatable::Evaluate;
use crate::glyph::{clamp01, ease_out_cubic, GlyphOffsetAlphaProvider, SlideLeftGlyphProvider};
use crate::layer::WeakLayer;
use crate::text_layer::TextLayer;
use crate::transform::TransformExt;
use glam::Vec2;
use motion_data::{Opacity, Property, Transform2D};
use std::sync::Arc;
use tracing::debug;

/// Slides a text layer horizontally while its glyphs stagger in behind it.
///
/// The preset holds the layer weakly; once the layer is gone from every handle
/// and every tree, `apply` stops touching it. Dropping the preset removes its glyph provider.
pub struct SlideLeftPreset {
    layer: WeakLayer,
    duration_us: i64,
    current_progress: f64,
    anchor_point: Vec2,
    start_position: Vec2,
    end_position: Vec2,
    scale: Vec2,
    rotation: f32,
    opacity: Opacity,
    provider: Arc<SlideLeftGlyphProvider>,
}

impl SlideLeftPreset {
    /// Installs the preset at progress 0. Returns `None` for a non-positive duration
    /// or a layer that no longer resolves.
    pub fn make(
        layer: &TextLayer,
        duration_us: i64,
        start_x: f32,
        end_x: f32,
        stagger_fraction: f64,
        trailing_factor: f64,
    ) -> Option<SlideLeftPreset> {
        if duration_us <= 0 || !layer.is_live() {
            return None;
        }
        let base = layer.get_transform_2d().unwrap_or_default();
        let position = base.position_at(0);
        let provider = Arc::new(SlideLeftGlyphProvider::new(
            duration_us,
            f64::from(end_x - start_x),
            stagger_fraction,
            trailing_factor,
        ));
        let mut preset = SlideLeftPreset {
            layer: layer.downgrade(),
            duration_us,
            current_progress: 0.0,
            anchor_point: base.anchor_point.value_at(0),
            start_position: Vec2::new(start_x, position.y),
            end_position: Vec2::new(end_x, position.y),
            scale: base.scale.value_at(0),
            rotation: base.rotation.value_at(0),
            opacity: base.opacity.value_at(0),
            provider,
        };
        preset.initialize(layer);
        debug!(layer = %layer.unique_id(), duration_us, start_x, end_x, "slide preset installed");
        Some(preset)
    }

    fn initialize(&mut self, layer: &TextLayer) {
        self.provider.set_progress(0.0);
        layer.set_glyph_transform_provider(self.provider.clone());
        layer.set_progress(0.0);
        self.update_transform(layer, 0.0);
        layer.notify_modified(true);
    }

    fn live_layer(&self) -> Option<TextLayer> {
        self.layer.upgrade().map(TextLayer::from_layer)
    }

    /// Moves the animation to `progress`, clamped to `0..=1`.
    pub fn apply(&mut self, progress: f64) {
        self.current_progress = clamp01(progress);
        let Some(layer) = self.live_layer() else {
            return;
        };
        layer.set_progress(self.current_progress);
        self.provider.set_progress(self.current_progress);
        self.update_transform(&layer, ease_out_cubic(self.current_progress));
        layer.notify_modified(true);
    }

    pub fn reset(&mut self) {
        self.apply(0.0);
    }

    pub fn duration(&self) -> i64 {
        self.duration_us
    }

    /// Progress passed to the latest `apply`.
    pub fn progress(&self) -> f64 {
        self.current_progress
    }

    pub fn glyph_provider(&self) -> &Arc<SlideLeftGlyphProvider> {
        &self.provider
    }

    fn update_transform(&self, layer: &TextLayer, eased: f64) {
        let position = self.start_position + (self.end_position - self.start_position) * eased as f32;
        let transform = Transform2D {
            anchor_point: Property::Static(self.anchor_point),
            scale: Property::Static(self.scale),
            rotation: Property::Static(self.rotation),
            opacity: Property::Static(self.opacity),
            ..Transform2D::with_position(position)
        };
        layer.set_transform_2d(transform);
    }
}

impl Drop for SlideLeftPreset {
    fn drop(&mut self) {
        if let Some(layer) = self.live_layer() {
            let provider: Arc<dyn GlyphOffsetAlphaProvider> = self.provider.clone();
            layer.clear_glyph_transform_if(&provider);
        }
    }
}
