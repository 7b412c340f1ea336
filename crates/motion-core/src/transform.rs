use crate::animatable::{replace_with_animatable, Evaluate};
use crate::time::FrameRange;
use glam::{Mat3, Vec2};
use kurbo::Rect;
use motion_data::{Frame, Keyframe, Opacity, PositionProperty, Property, Transform2D, OPAQUE};

/// Matrix and alpha of a layer at its current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedTransform {
    pub matrix: Mat3,
    pub alpha: f32,
}

pub trait TransformExt {
    fn position_at(&self, frame: Frame) -> Vec2;
    /// `translate(position) * rotate * scale * translate(-anchor)`
    fn matrix_at(&self, frame: Frame) -> Mat3;
    fn alpha_at(&self, frame: Frame) -> f32;
    fn varying_ranges(&self) -> Vec<FrameRange>;

    fn set_anchor_point_keyframes(&mut self, keyframes: Vec<Keyframe<Vec2>>);
    fn set_position_keyframes(&mut self, keyframes: Vec<Keyframe<Vec2>>);
    fn set_x_position_keyframes(&mut self, keyframes: Vec<Keyframe<f32>>);
    fn set_y_position_keyframes(&mut self, keyframes: Vec<Keyframe<f32>>);
    fn set_scale_keyframes(&mut self, keyframes: Vec<Keyframe<Vec2>>);
    fn set_rotation_keyframes(&mut self, keyframes: Vec<Keyframe<f32>>);
    fn set_opacity_keyframes(&mut self, keyframes: Vec<Keyframe<Opacity>>);
}

impl TransformExt for Transform2D {
    fn position_at(&self, frame: Frame) -> Vec2 {
        match &self.position {
            PositionProperty::Unified(position) => position.value_at(frame),
            PositionProperty::Split { x, y } => Vec2::new(x.value_at(frame), y.value_at(frame)),
        }
    }

    fn matrix_at(&self, frame: Frame) -> Mat3 {
        let anchor = self.anchor_point.value_at(frame);
        let scale = self.scale.value_at(frame);
        let rotation = self.rotation.value_at(frame).to_radians();
        Mat3::from_scale_angle_translation(scale, rotation, self.position_at(frame))
            * Mat3::from_translation(-anchor)
    }

    fn alpha_at(&self, frame: Frame) -> f32 {
        self.opacity.value_at(frame) as f32 / OPAQUE as f32
    }

    fn varying_ranges(&self) -> Vec<FrameRange> {
        let mut ranges = self.anchor_point.varying_ranges();
        match &self.position {
            PositionProperty::Unified(position) => ranges.extend(position.varying_ranges()),
            PositionProperty::Split { x, y } => {
                ranges.extend(x.varying_ranges());
                ranges.extend(y.varying_ranges());
            }
        }
        ranges.extend(self.scale.varying_ranges());
        ranges.extend(self.rotation.varying_ranges());
        ranges.extend(self.opacity.varying_ranges());
        ranges
    }

    fn set_anchor_point_keyframes(&mut self, keyframes: Vec<Keyframe<Vec2>>) {
        self.anchor_point = replace_with_animatable(Some(&self.anchor_point), keyframes, Vec2::ZERO);
    }

    fn set_position_keyframes(&mut self, keyframes: Vec<Keyframe<Vec2>>) {
        let previous = Property::Static(self.position_at(0));
        let current = match &self.position {
            PositionProperty::Unified(position) => position,
            PositionProperty::Split { .. } => &previous,
        };
        let position = replace_with_animatable(Some(current), keyframes, Vec2::ZERO);
        self.set_position(position);
    }

    fn set_x_position_keyframes(&mut self, keyframes: Vec<Keyframe<f32>>) {
        let (x, y) = split_channels(self);
        let x = replace_with_animatable(Some(&x), keyframes, 0.0);
        self.set_split_position(x, y);
    }

    fn set_y_position_keyframes(&mut self, keyframes: Vec<Keyframe<f32>>) {
        let (x, y) = split_channels(self);
        let y = replace_with_animatable(Some(&y), keyframes, 0.0);
        self.set_split_position(x, y);
    }

    fn set_scale_keyframes(&mut self, keyframes: Vec<Keyframe<Vec2>>) {
        self.scale = replace_with_animatable(Some(&self.scale), keyframes, Vec2::ONE);
    }

    fn set_rotation_keyframes(&mut self, keyframes: Vec<Keyframe<f32>>) {
        self.rotation = replace_with_animatable(Some(&self.rotation), keyframes, 0.0);
    }

    fn set_opacity_keyframes(&mut self, keyframes: Vec<Keyframe<Opacity>>) {
        self.opacity = replace_with_animatable(Some(&self.opacity), keyframes, OPAQUE);
    }
}

/// Current x/y channels, splitting a unified position at frame 0.
fn split_channels(transform: &Transform2D) -> (Property<f32>, Property<f32>) {
    match &transform.position {
        PositionProperty::Split { x, y } => (x.clone(), y.clone()),
        PositionProperty::Unified(position) => {
            let start = position.value_at(0);
            (Property::Static(start.x), Property::Static(start.y))
        }
    }
}

pub(crate) fn map_rect(matrix: Mat3, rect: Rect) -> Rect {
    let corners = [
        Vec2::new(rect.x0 as f32, rect.y0 as f32),
        Vec2::new(rect.x1 as f32, rect.y0 as f32),
        Vec2::new(rect.x0 as f32, rect.y1 as f32),
        Vec2::new(rect.x1 as f32, rect.y1 as f32),
    ]
    .map(|corner| matrix.transform_point2(corner));
    let (mut min, mut max) = (corners[0], corners[0]);
    for corner in &corners[1..] {
        min = min.min(*corner);
        max = max.max(*corner);
    }
    Rect::new(min.x as f64, min.y as f64, max.x as f64, max.y as f64)
}
