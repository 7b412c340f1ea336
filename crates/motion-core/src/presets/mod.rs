//! Procedural animations built on top of existing text layers.

mod slide_left;
mod text_motion;

pub use slide_left::SlideLeftPreset;
pub use text_motion::TextMotionPreset;
