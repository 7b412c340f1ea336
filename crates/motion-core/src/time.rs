//! Time, frame and progress conversions.
//!
//! Time is in microseconds. Frames are integer indices at a given frame rate.

use motion_data::Frame;

pub const MICROS_PER_SECOND: f64 = 1_000_000.0;
pub const DEFAULT_FRAME_RATE: f32 = 60.0;

/// Half-open `[start, end)` span of frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRange {
    pub start: Frame,
    pub end: Frame,
}

impl FrameRange {
    pub fn new(start: Frame, end: Frame) -> Self {
        Self { start, end }
    }

    /// True if anything inside the range can differ between frames `a` and `b`.
    pub fn touches(&self, a: Frame, b: Frame) -> bool {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        self.start < hi && self.end > lo
    }

    pub fn offset(self, by: Frame) -> Self {
        Self::new(self.start + by, self.end + by)
    }
}

pub fn time_to_frame(time: i64, frame_rate: f32) -> Frame {
    (time as f64 * frame_rate as f64 / MICROS_PER_SECOND).floor() as Frame
}

pub fn frame_to_time(frame: Frame, frame_rate: f32) -> i64 {
    (frame as f64 * MICROS_PER_SECOND / frame_rate as f64).ceil() as i64
}

fn wrap_progress(progress: f64) -> f64 {
    let mut percent = progress % 1.0;
    if percent <= 0.0 && progress != 0.0 {
        percent += 1.0;
    }
    percent
}

/// Maps a progress onto `[0, total)`. Progress wraps, so `1.0` lands on the last unit.
pub fn progress_to_time(progress: f64, total_time: i64) -> i64 {
    if total_time <= 1 {
        return 0;
    }
    let current = (wrap_progress(progress) * total_time as f64).floor() as i64;
    if current >= total_time {
        total_time - 1
    } else {
        current
    }
}

pub fn progress_to_frame(progress: f64, total_frames: Frame) -> Frame {
    progress_to_time(progress, total_frames)
}

/// Inverse of [`progress_to_frame`]. The `+0.1` keeps the round trip on the same frame.
pub fn frame_to_progress(current_frame: Frame, total_frames: Frame) -> f64 {
    if total_frames <= 1 || current_frame < 0 {
        return 0.0;
    }
    if current_frame >= total_frames - 1 {
        return 1.0;
    }
    (current_frame as f64 + 0.1) / total_frames as f64
}
