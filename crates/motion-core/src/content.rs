use crate::time::FrameRange;
use kurbo::Rect;
use motion_data::Frame;
use serde::Serialize;
use std::fmt::Debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LayerType {
    Null,
    Solid,
    Text,
    Shape,
    Image,
    PreCompose,
}

/// Drawable payload of a layer, owned by the host.
pub trait LayerContent: Send + Sync + Debug {
    /// Local-space bounds at a content frame.
    fn measure_bounds(&self, content_frame: Frame) -> Rect;

    /// Content frames over which the drawing changes.
    fn varying_ranges(&self) -> Vec<FrameRange> {
        Vec::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolidContent {
    pub width: f64,
    pub height: f64,
    pub varying: Vec<FrameRange>,
}

impl SolidContent {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            varying: Vec::new(),
        }
    }
}

impl LayerContent for SolidContent {
    fn measure_bounds(&self, _content_frame: Frame) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    fn varying_ranges(&self) -> Vec<FrameRange> {
        self.varying.clone()
    }
}
