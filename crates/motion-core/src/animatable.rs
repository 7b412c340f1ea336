use crate::time::FrameRange;
use glam::Vec2;
use motion_data::{
    Frame, Keyframe, KeyframeInterpolation, KeyframeValue, KeyframeVariant, Property,
    TextDocument,
};

pub trait Interpolatable: KeyframeValue + PartialEq {
    fn lerp(&self, other: &Self, t: f32) -> Self;

    /// Follows the cubic through `self + spatial_out` and `other + spatial_in`.
    fn lerp_spatial(
        &self,
        other: &Self,
        t: f32,
        _spatial_out: Option<Vec2>,
        _spatial_in: Option<Vec2>,
    ) -> Self {
        self.lerp(other, t)
    }

    /// One progress per axis. Scalars only look at the first.
    fn lerp_axes(&self, other: &Self, progress: &[f32]) -> Self {
        self.lerp(other, progress.first().copied().unwrap_or(0.0))
    }
}

impl Interpolatable for f32 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl Interpolatable for u8 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        let (a, b) = (*self as f32, *other as f32);
        (a + (b - a) * t).round().clamp(0.0, u8::MAX as f32) as u8
    }
}

impl Interpolatable for u16 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        let (a, b) = (*self as f32, *other as f32);
        (a + (b - a) * t).round().clamp(0.0, u16::MAX as f32) as u16
    }
}

impl Interpolatable for Vec2 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Vec2::lerp(*self, *other, t)
    }

    fn lerp_spatial(
        &self,
        other: &Self,
        t: f32,
        spatial_out: Option<Vec2>,
        spatial_in: Option<Vec2>,
    ) -> Self {
        let p0 = *self;
        let p3 = *other;
        let p1 = p0 + spatial_out.unwrap_or(Vec2::ZERO);
        let p2 = p3 + spatial_in.unwrap_or(Vec2::ZERO);

        let one_minus_t = 1.0 - t;
        let one_minus_t_sq = one_minus_t * one_minus_t;
        let t_sq = t * t;

        p0 * one_minus_t_sq * one_minus_t
            + p1 * 3.0 * one_minus_t_sq * t
            + p2 * 3.0 * one_minus_t * t_sq
            + p3 * t_sq * t
    }

    fn lerp_axes(&self, other: &Self, progress: &[f32]) -> Self {
        let tx = progress.first().copied().unwrap_or(0.0);
        let ty = progress.get(1).copied().unwrap_or(tx);
        Vec2::new(
            Interpolatable::lerp(&self.x, &other.x, tx),
            Interpolatable::lerp(&self.y, &other.y, ty),
        )
    }
}

impl Interpolatable for TextDocument {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        if t < 1.0 {
            self.clone()
        } else {
            other.clone()
        }
    }
}

/// Solves the unit cubic ease `(0,0) p1 p2 (1,1)` for `y` at `x`.
pub fn solve_cubic_bezier(p1: Vec2, p2: Vec2, x: f32) -> f32 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    // Newton-Raphson
    let mut t = x;
    for _ in 0..8 {
        let one_minus_t = 1.0 - t;
        let x_est =
            3.0 * one_minus_t * one_minus_t * t * p1.x + 3.0 * one_minus_t * t * t * p2.x + t * t * t;

        let err = x_est - x;
        if err.abs() < 1e-4 {
            break;
        }

        let dx_dt = 3.0 * one_minus_t * one_minus_t * p1.x
            + 6.0 * one_minus_t * t * (p2.x - p1.x)
            + 3.0 * t * t * (1.0 - p2.x);

        if dx_dt.abs() < 1e-6 {
            break;
        }
        t -= err / dx_dt;
    }

    let one_minus_t = 1.0 - t;
    3.0 * one_minus_t * one_minus_t * t * p1.y + 3.0 * one_minus_t * t * t * p2.y + t * t * t
}

/// Resolves property values on integer frames.
pub trait Evaluate<T> {
    fn value_at(&self, frame: Frame) -> T;

    /// Frame spans over which the value may change.
    fn varying_ranges(&self) -> Vec<FrameRange>;
}

impl<T: Interpolatable> Evaluate<T> for Property<T> {
    fn value_at(&self, frame: Frame) -> T {
        match self {
            Property::Static(value) => value.clone(),
            Property::Animatable(keyframes) => resolve_keyframes(keyframes, frame),
        }
    }

    fn varying_ranges(&self) -> Vec<FrameRange> {
        let keyframes = self.keyframes();
        let mut ranges = Vec::new();
        for (index, keyframe) in keyframes.iter().enumerate() {
            if keyframe.start_value != keyframe.end_value {
                ranges.push(FrameRange::new(
                    keyframe.start_time,
                    keyframe.end_time.max(keyframe.start_time + 1),
                ));
            }
            // Jump across a gap into the next keyframe.
            if let Some(next) = keyframes.get(index + 1) {
                if next.start_value != keyframe.end_value {
                    ranges.push(FrameRange::new(next.start_time - 1, next.start_time));
                }
            }
        }
        ranges
    }
}

pub(crate) fn resolve_keyframes<T: Interpolatable>(keyframes: &[Keyframe<T>], frame: Frame) -> T {
    let (Some(first), Some(last)) = (keyframes.first(), keyframes.last()) else {
        return T::default();
    };
    if frame < first.start_time {
        return first.start_value.clone();
    }
    if frame >= last.end_time {
        return last.end_value.clone();
    }

    // Latest-starting keyframe at or before `frame` governs.
    let idx = keyframes.partition_point(|kf| kf.start_time <= frame);
    let keyframe = &keyframes[idx.saturating_sub(1)];
    if frame >= keyframe.end_time {
        return keyframe.end_value.clone();
    }
    interpolate(keyframe, frame)
}

fn interpolate<T: Interpolatable>(keyframe: &Keyframe<T>, frame: Frame) -> T {
    let span = keyframe.end_time - keyframe.start_time;
    if span <= 0 {
        return keyframe.end_value.clone();
    }
    let t = (frame - keyframe.start_time) as f32 / span as f32;

    if keyframe.interpolation == KeyframeInterpolation::Hold {
        return keyframe.start_value.clone();
    }

    match keyframe.variant() {
        KeyframeVariant::SingleEase => {
            let progress = ease(keyframe, 0, t);
            if keyframe.has_spatial_points() {
                keyframe.start_value.lerp_spatial(
                    &keyframe.end_value,
                    progress,
                    keyframe.spatial_out,
                    keyframe.spatial_in,
                )
            } else {
                keyframe.start_value.lerp(&keyframe.end_value, progress)
            }
        }
        KeyframeVariant::MultiDimension => {
            let progress: Vec<f32> = (0..T::DIMENSIONS).map(|axis| ease(keyframe, axis, t)).collect();
            keyframe.start_value.lerp_axes(&keyframe.end_value, &progress)
        }
    }
}

fn ease<T>(keyframe: &Keyframe<T>, axis: usize, t: f32) -> f32 {
    if keyframe.interpolation != KeyframeInterpolation::Bezier {
        return t;
    }
    let control_out = keyframe.bezier_out.get(axis).or(keyframe.bezier_out.first());
    let control_in = keyframe.bezier_in.get(axis).or(keyframe.bezier_in.first());
    match (control_out, control_in) {
        (Some(p1), Some(p2)) => solve_cubic_bezier(*p1, *p2, t),
        _ => t,
    }
}

/// Builds the replacement for a property from a new keyframe set.
///
/// An empty set yields a static property holding the previous value at frame 0,
/// or `fallback` when there was no previous property.
pub fn replace_with_animatable<T: Interpolatable>(
    current: Option<&Property<T>>,
    keyframes: Vec<Keyframe<T>>,
    fallback: T,
) -> Property<T> {
    match Property::make_animatable(keyframes) {
        Some(property) => property,
        None => {
            let value = current.map(|p| p.value_at(0)).unwrap_or(fallback);
            Property::make_static(value)
        }
    }
}
