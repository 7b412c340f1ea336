//! Declarative options for procedural text motion.
//!
//! Times are microseconds. `distance` is relative to the font size.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextMotionType {
    #[default]
    Fade,
    Scale,
    Slide,
    Swing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextMotionDirection {
    #[default]
    Up,
    Left,
    Right,
    Down,
    Side,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextMotionEasing {
    #[default]
    Smooth,
    EaseIn,
    EaseOut,
    Back,
    Bounce,
    Spring,
}

/// How glyphs are grouped into independently timed units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextMotionEffect {
    /// The whole text moves as one unit.
    #[default]
    None,
    Letter,
    Word,
}

/// Distribution curve of per-unit start offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextMotionEffectSmooth {
    #[default]
    None,
    Smooth,
    EaseIn,
    EaseOut,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextMotionOptions {
    #[serde(rename = "type")]
    pub motion_type: TextMotionType,
    pub direction: TextMotionDirection,
    pub duration: f64,
    pub distance: f64,
    pub easing: TextMotionEasing,
    pub effect: TextMotionEffect,
    /// Delay between successive units.
    pub effect_delay: f64,
    pub effect_smooth: TextMotionEffectSmooth,
}

impl Default for TextMotionOptions {
    fn default() -> Self {
        Self {
            motion_type: TextMotionType::Fade,
            direction: TextMotionDirection::Up,
            duration: 0.0,
            distance: 0.5,
            easing: TextMotionEasing::Smooth,
            effect: TextMotionEffect::None,
            effect_delay: 0.0,
            effect_smooth: TextMotionEffectSmooth::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_fields_take_defaults() {
        let options: TextMotionOptions = serde_json::from_value(json!({
            "type": "Slide",
            "duration": 1000000.0,
            "effect": "Letter"
        }))
        .unwrap();
        assert_eq!(options.motion_type, TextMotionType::Slide);
        assert_eq!(options.effect, TextMotionEffect::Letter);
        assert_eq!(options.distance, 0.5);
        assert_eq!(options.easing, TextMotionEasing::Smooth);
    }
}
