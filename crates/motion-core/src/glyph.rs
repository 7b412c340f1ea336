//! Per-frame glyph offset callbacks for text layers.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

const EPSILON: f64 = 1e-6;

/// Computes a positional offset and alpha for every glyph of a text layer.
///
/// Rendering calls this once per frame with the layer's local time. The three
/// output slices always have the same length, one entry per glyph.
pub trait GlyphOffsetAlphaProvider: Send + Sync {
    fn compute(&self, layer_time_us: i64, dx: &mut [f32], dy: &mut [f32], alpha: &mut [f32]) -> bool;
}

/// Offsets produced by a provider for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlyphOffsets {
    pub dx: Vec<f32>,
    pub dy: Vec<f32>,
    pub alpha: Vec<f32>,
}

impl GlyphOffsets {
    pub(crate) fn compute(provider: &dyn GlyphOffsetAlphaProvider, time_us: i64, count: usize) -> Option<Self> {
        if count == 0 {
            return None;
        }
        let mut offsets = Self {
            dx: vec![0.0; count],
            dy: vec![0.0; count],
            alpha: vec![1.0; count],
        };
        provider
            .compute(time_us, &mut offsets.dx, &mut offsets.dy, &mut offsets.alpha)
            .then_some(offsets)
    }

    pub fn len(&self) -> usize {
        self.dx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dx.is_empty()
    }
}

pub(crate) fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

pub(crate) fn ease_out_cubic(t: f64) -> f64 {
    let inv = 1.0 - clamp01(t);
    1.0 - inv * inv * inv
}

/// Staggers glyphs of a horizontal slide: early glyphs lead the layer, late ones trail and fade in.
pub struct SlideLeftGlyphProvider {
    duration_us: i64,
    stagger_fraction: f64,
    trailing_factor: f64,
    translation_delta_x: f64,
    /// `f64` bits of the manual time; negative means follow the layer time.
    manual_time_us: AtomicU64,
}

impl SlideLeftGlyphProvider {
    pub fn new(duration_us: i64, translation_delta_x: f64, stagger_fraction: f64, trailing_factor: f64) -> Self {
        Self {
            duration_us: duration_us.max(1),
            stagger_fraction: stagger_fraction.clamp(0.0, 0.95),
            trailing_factor: trailing_factor.max(0.0),
            translation_delta_x,
            manual_time_us: AtomicU64::new((-1.0f64).to_bits()),
        }
    }

    pub fn duration(&self) -> i64 {
        self.duration_us
    }

    /// Drives the provider from `progress` instead of the layer time.
    pub fn set_progress(&self, progress: f64) {
        let time = clamp01(progress) * self.duration_us as f64;
        self.manual_time_us.store(time.to_bits(), Ordering::Relaxed);
    }

    fn manual_time(&self) -> Option<f64> {
        let time = f64::from_bits(self.manual_time_us.load(Ordering::Relaxed));
        (time >= 0.0).then_some(time)
    }
}

impl GlyphOffsetAlphaProvider for SlideLeftGlyphProvider {
    fn compute(&self, layer_time_us: i64, dx: &mut [f32], dy: &mut [f32], alpha: &mut [f32]) -> bool {
        let count = dx.len().min(dy.len()).min(alpha.len());
        if count == 0 {
            return false;
        }
        let duration = self.duration_us as f64;
        let time = self
            .manual_time()
            .unwrap_or(layer_time_us as f64)
            .clamp(0.0, duration);
        let base_eased = ease_out_cubic(time / duration);
        let total_delay = duration * self.stagger_fraction;
        let per_glyph_delay = if count > 1 {
            total_delay / (count - 1) as f64
        } else {
            0.0
        };
        let mut active = duration - total_delay;
        if active <= EPSILON {
            active = duration;
        }

        let mut applied = false;
        for i in 0..count {
            let local = time - per_glyph_delay * i as f64;
            let t = if local <= 0.0 {
                0.0
            } else if local >= active {
                1.0
            } else {
                local / active
            };
            let glyph_eased = ease_out_cubic(t);
            let offset = ((glyph_eased - base_eased) * self.translation_delta_x * self.trailing_factor) as f32;
            dx[i] = offset;
            dy[i] = 0.0;
            alpha[i] = clamp01(glyph_eased) as f32;
            if f64::from(offset.abs()) > EPSILON || alpha[i] > 0.0 {
                applied = true;
            }
        }
        applied
    }
}

impl fmt::Debug for SlideLeftGlyphProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlideLeftGlyphProvider")
            .field("duration_us", &self.duration_us)
            .field("stagger_fraction", &self.stagger_fraction)
            .field("trailing_factor", &self.trailing_factor)
            .field("manual_time_us", &self.manual_time())
            .finish()
    }
}

/// Offset of a single glyph returned by [`FnGlyphProvider`] callbacks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphOffset {
    pub dx: f32,
    pub dy: f32,
    pub alpha: f32,
}

/// Provider backed by a closure called once per glyph with `(time_us, index, count)`.
pub struct FnGlyphProvider<F> {
    callback: F,
}

impl<F> FnGlyphProvider<F>
where
    F: Fn(i64, usize, usize) -> Option<GlyphOffset> + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> GlyphOffsetAlphaProvider for FnGlyphProvider<F>
where
    F: Fn(i64, usize, usize) -> Option<GlyphOffset> + Send + Sync,
{
    fn compute(&self, layer_time_us: i64, dx: &mut [f32], dy: &mut [f32], alpha: &mut [f32]) -> bool {
        let count = dx.len().min(dy.len()).min(alpha.len());
        let mut applied = false;
        for i in 0..count {
            if let Some(offset) = (self.callback)(layer_time_us, i, count) {
                dx[i] = offset.dx;
                dy[i] = offset.dy;
                alpha[i] = offset.alpha;
                applied = true;
            }
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DURATION: i64 = 3_000_000;

    fn sample(provider: &SlideLeftGlyphProvider, time: i64) -> ([f32; 5], [f32; 5], bool) {
        let mut dx = [0.0; 5];
        let mut dy = [0.0; 5];
        let mut alpha = [1.0; 5];
        let applied = provider.compute(time, &mut dx, &mut dy, &mut alpha);
        (dx, alpha, applied)
    }

    #[test]
    fn glyphs_lead_and_trail_at_half_time() {
        let provider = SlideLeftGlyphProvider::new(DURATION, 40.0 - 240.0, 0.6, 1.0);
        let (dx, alpha, applied) = sample(&provider, DURATION / 2);
        assert!(applied);
        assert!(dx[0] < 0.0);
        assert!((alpha[0] - 1.0).abs() < 1e-3);
        assert!(dx[4] > 0.0);
        assert!(alpha[4] < 1.0);
    }

    #[test]
    fn manual_progress_overrides_time() {
        let provider = SlideLeftGlyphProvider::new(DURATION, -200.0, 0.6, 1.0);
        provider.set_progress(0.75);
        let (dx, alpha, _) = sample(&provider, 0);
        assert!(dx[0] < 0.0);
        assert!(dx[4] > 0.0);
        assert!(alpha[4] < 1.0);
    }

    #[test]
    fn settles_at_end() {
        let provider = SlideLeftGlyphProvider::new(DURATION, -200.0, 0.6, 1.0);
        let (dx, alpha, _) = sample(&provider, DURATION);
        for i in 0..5 {
            assert!(dx[i].abs() < 1e-3);
            assert!((alpha[i] - 1.0).abs() < 1e-3);
        }
    }

    #[test]
    fn constructor_clamps_inputs() {
        let provider = SlideLeftGlyphProvider::new(0, 10.0, 2.0, -1.0);
        assert_eq!(provider.duration(), 1);
        assert_eq!(provider.stagger_fraction, 0.95);
        assert_eq!(provider.trailing_factor, 0.0);
        assert!(provider.manual_time().is_none());
    }

    #[test]
    fn closure_provider_fills_requested_glyphs() {
        let provider = FnGlyphProvider::new(|time, index, _| {
            (index % 2 == 0).then_some(GlyphOffset {
                dx: time as f32,
                dy: index as f32,
                alpha: 0.5,
            })
        });
        let offsets = GlyphOffsets::compute(&provider, 7, 3).unwrap();
        assert_eq!(offsets.dx, vec![7.0, 0.0, 7.0]);
        assert_eq!(offsets.dy, vec![0.0, 0.0, 2.0]);
        assert_eq!(offsets.alpha, vec![0.5, 1.0, 0.5]);
        assert!(GlyphOffsets::compute(&provider, 7, 0).is_none());
    }
}
