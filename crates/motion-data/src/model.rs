use glam::Vec2;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Frame index on a layer's own timeline.
pub type Frame = i64;

/// 8-bit opacity, `0` is fully transparent.
pub type Opacity = u8;

pub const OPAQUE: Opacity = 255;
pub const TRANSPARENT: Opacity = 0;
pub const ZERO_FRAME: Frame = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KeyframeInterpolation {
    #[default]
    Linear,
    Bezier,
    Hold,
}

/// Evaluation strategy of a keyframe.
///
/// Derived from the value type's dimensionality, never chosen by callers.
/// Keyframes with spatial control points follow one curve and always ease as one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyframeVariant {
    /// One eased progress drives every component.
    SingleEase,
    /// Each axis gets its own eased progress.
    MultiDimension,
}

impl KeyframeVariant {
    pub fn of<T: KeyframeValue>() -> Self {
        if T::DIMENSIONS > 1 {
            KeyframeVariant::MultiDimension
        } else {
            KeyframeVariant::SingleEase
        }
    }
}

/// Values that can live in a keyframe.
///
/// Types without an explicit dimensionality are treated as single-ease.
pub trait KeyframeValue: Clone + Default {
    const DIMENSIONS: usize = 1;
}

impl KeyframeValue for f32 {}
impl KeyframeValue for u8 {}
impl KeyframeValue for u16 {}
impl KeyframeValue for Vec2 {
    const DIMENSIONS: usize = 2;
}
impl KeyframeValue for TextDocument {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keyframe<T> {
    pub start_time: Frame,
    pub end_time: Frame,
    pub start_value: T,
    pub end_value: T,
    #[serde(default)]
    pub interpolation: KeyframeInterpolation,
    /// Outgoing ease control point, one per interpolated dimension.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bezier_out: Vec<Vec2>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bezier_in: Vec<Vec2>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spatial_out: Option<Vec2>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spatial_in: Option<Vec2>,
}

impl<T> Keyframe<T> {
    pub fn linear(start_time: Frame, end_time: Frame, start_value: T, end_value: T) -> Self {
        Self {
            start_time,
            end_time,
            start_value,
            end_value,
            interpolation: KeyframeInterpolation::Linear,
            bezier_out: Vec::new(),
            bezier_in: Vec::new(),
            spatial_out: None,
            spatial_in: None,
        }
    }

    /// Cubic ease shared by every dimension.
    pub fn eased(
        start_time: Frame,
        end_time: Frame,
        start_value: T,
        end_value: T,
        bezier_out: Vec2,
        bezier_in: Vec2,
    ) -> Self {
        Self {
            interpolation: KeyframeInterpolation::Bezier,
            bezier_out: vec![bezier_out],
            bezier_in: vec![bezier_in],
            ..Self::linear(start_time, end_time, start_value, end_value)
        }
    }

    pub fn variant(&self) -> KeyframeVariant
    where
        T: KeyframeValue,
    {
        if self.has_spatial_points() {
            KeyframeVariant::SingleEase
        } else {
            KeyframeVariant::of::<T>()
        }
    }

    pub fn has_spatial_points(&self) -> bool {
        self.spatial_out.is_some() || self.spatial_in.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyframeError {
    #[error("animatable property requires at least one keyframe")]
    Empty,
    #[error("keyframe {index} ends at {end}, not after its start at {start}")]
    Reversed { index: usize, start: Frame, end: Frame },
    #[error("keyframe {index} starts at {start} inside the previous keyframe ending at {previous_end}")]
    Overlap {
        index: usize,
        start: Frame,
        previous_end: Frame,
    },
}

/// A value that is either constant or driven by keyframes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Property<T> {
    Static(T),
    Animatable(Vec<Keyframe<T>>),
}

impl<T: KeyframeValue> Property<T> {
    pub fn make_static(value: T) -> Self {
        Property::Static(value)
    }

    /// Returns `None` for an empty keyframe set. Keyframes are kept sorted by start.
    pub fn make_animatable(mut keyframes: Vec<Keyframe<T>>) -> Option<Self> {
        if keyframes.is_empty() {
            None
        } else {
            keyframes.sort_by_key(|k| k.start_time);
            Some(Property::Animatable(keyframes))
        }
    }

    /// Like [`Property::make_animatable`] but also rejects reversed and overlapping keyframes.
    pub fn try_animatable(mut keyframes: Vec<Keyframe<T>>) -> Result<Self, KeyframeError> {
        if keyframes.is_empty() {
            return Err(KeyframeError::Empty);
        }
        keyframes.sort_by_key(|k| k.start_time);
        for (index, keyframe) in keyframes.iter().enumerate() {
            if keyframe.end_time <= keyframe.start_time {
                return Err(KeyframeError::Reversed {
                    index,
                    start: keyframe.start_time,
                    end: keyframe.end_time,
                });
            }
            if index > 0 {
                let previous_end = keyframes[index - 1].end_time;
                if keyframe.start_time < previous_end {
                    return Err(KeyframeError::Overlap {
                        index,
                        start: keyframe.start_time,
                        previous_end,
                    });
                }
            }
        }
        Ok(Property::Animatable(keyframes))
    }

    pub fn is_animatable(&self) -> bool {
        matches!(self, Property::Animatable(_))
    }

    pub fn keyframes(&self) -> &[Keyframe<T>] {
        match self {
            Property::Static(_) => &[],
            Property::Animatable(keyframes) => keyframes,
        }
    }
}

impl<T: KeyframeValue> Default for Property<T> {
    fn default() -> Self {
        Property::Static(T::default())
    }
}

impl<'de, T: KeyframeValue + DeserializeOwned> Deserialize<'de> for Property<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = serde_json::Value::deserialize(deserializer)?;

        // Keyframe lists are arrays of objects; `[x, y]` falls through to a static point.
        if v.as_array()
            .is_some_and(|items| items.first().is_some_and(|first| first.is_object()))
        {
            let keyframes: Vec<Keyframe<T>> =
                serde_json::from_value(v).map_err(serde::de::Error::custom)?;
            return Property::try_animatable(keyframes).map_err(serde::de::Error::custom);
        }

        if v.as_array().is_some_and(|items| items.is_empty()) {
            return Err(serde::de::Error::custom(KeyframeError::Empty));
        }

        serde_json::from_value::<T>(v)
            .map(Property::Static)
            .map_err(serde::de::Error::custom)
    }
}

/// Unified point or separate x/y channels; never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PositionProperty {
    Unified(Property<Vec2>),
    Split { x: Property<f32>, y: Property<f32> },
}

impl Default for PositionProperty {
    fn default() -> Self {
        PositionProperty::Unified(Property::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transform2D {
    #[serde(default)]
    pub anchor_point: Property<Vec2>,
    #[serde(default)]
    pub position: PositionProperty,
    #[serde(default = "default_scale")]
    pub scale: Property<Vec2>,
    #[serde(default)]
    pub rotation: Property<f32>,
    #[serde(default = "default_opacity")]
    pub opacity: Property<Opacity>,
}

fn default_scale() -> Property<Vec2> {
    Property::Static(Vec2::ONE)
}

fn default_opacity() -> Property<Opacity> {
    Property::Static(OPAQUE)
}

impl Default for Transform2D {
    fn default() -> Self {
        Self {
            anchor_point: Property::default(),
            position: PositionProperty::default(),
            scale: default_scale(),
            rotation: Property::default(),
            opacity: default_opacity(),
        }
    }
}

impl Transform2D {
    pub fn with_position(position: Vec2) -> Self {
        Self {
            position: PositionProperty::Unified(Property::Static(position)),
            ..Self::default()
        }
    }

    /// Installs a unified position, dropping any split channels.
    pub fn set_position(&mut self, position: Property<Vec2>) {
        self.position = PositionProperty::Unified(position);
    }

    /// Installs split channels, dropping any unified position.
    pub fn set_split_position(&mut self, x: Property<f32>, y: Property<f32>) {
        self.position = PositionProperty::Split { x, y };
    }

    pub fn has_split_position(&self) -> bool {
        matches!(self.position, PositionProperty::Split { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParagraphJustification {
    #[default]
    LeftJustify,
    CenterJustify,
    RightJustify,
    FullJustifyLastLineLeft,
    FullJustifyLastLineRight,
    FullJustifyLastLineCenter,
    FullJustifyLastLineFull,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextDocument {
    pub text: String,
    pub font_family: String,
    pub font_style: String,
    pub font_size: f32,
    pub apply_fill: bool,
    pub apply_stroke: bool,
    pub fill_color: Color,
    pub stroke_color: Color,
    pub stroke_width: f32,
    pub stroke_over_fill: bool,
    pub faux_bold: bool,
    pub faux_italic: bool,
    pub justification: ParagraphJustification,
    /// Line height; `0` means automatic.
    pub leading: f32,
    /// Extra spacing in thousandths of an em.
    pub tracking: f32,
    pub baseline_shift: f32,
    pub box_text: bool,
    pub box_text_pos: Vec2,
    pub box_text_size: Vec2,
    pub background_color: Color,
    pub background_alpha: Opacity,
}

impl Default for TextDocument {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_family: String::new(),
            font_style: String::new(),
            font_size: 24.0,
            apply_fill: true,
            apply_stroke: false,
            fill_color: Color::BLACK,
            stroke_color: Color::BLACK,
            stroke_width: 1.0,
            stroke_over_fill: true,
            faux_bold: false,
            faux_italic: false,
            justification: ParagraphJustification::LeftJustify,
            leading: 0.0,
            tracking: 0.0,
            baseline_shift: 0.0,
            box_text: false,
            box_text_pos: Vec2::ZERO,
            box_text_size: Vec2::ZERO,
            background_color: Color::WHITE,
            background_alpha: TRANSPARENT,
        }
    }
}

impl TextDocument {
    /// Copies the fields a host may edit at runtime, leaving layout-box data untouched.
    pub fn apply_editable_fields(&mut self, other: &TextDocument) {
        self.apply_fill = other.apply_fill;
        self.apply_stroke = other.apply_stroke;
        self.faux_bold = other.faux_bold;
        self.faux_italic = other.faux_italic;
        self.fill_color = other.fill_color;
        self.font_family = other.font_family.clone();
        self.font_style = other.font_style.clone();
        self.font_size = other.font_size;
        self.stroke_color = other.stroke_color;
        self.stroke_over_fill = other.stroke_over_fill;
        self.stroke_width = other.stroke_width;
        self.text = other.text.clone();
        self.justification = other.justification;
        self.leading = other.leading;
        self.tracking = other.tracking;
        self.background_color = other.background_color;
        self.background_alpha = other.background_alpha;
    }
}

// ---- text animators -------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextRangeSelectorUnits {
    #[default]
    Percentage,
    Index,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextSelectorBasedOn {
    #[default]
    Characters,
    CharactersExcludingSpaces,
    Words,
    Lines,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextSelectorMode {
    None,
    #[default]
    Add,
    Subtract,
    Intersect,
    Min,
    Max,
    Difference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextRangeSelectorShape {
    #[default]
    Square,
    RampUp,
    RampDown,
    Triangle,
    Round,
    Smooth,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextRangeSelector {
    /// Start of the selected range, `0..=1` in percentage units.
    pub start: Property<f32>,
    pub end: Property<f32>,
    pub offset: Property<f32>,
    pub units: TextRangeSelectorUnits,
    pub based_on: TextSelectorBasedOn,
    pub mode: TextSelectorMode,
    pub amount: Property<f32>,
    pub shape: TextRangeSelectorShape,
    pub smoothness: Property<f32>,
    pub ease_high: Property<f32>,
    pub ease_low: Property<f32>,
    pub randomize_order: bool,
    pub random_seed: Property<u16>,
}

impl Default for TextRangeSelector {
    fn default() -> Self {
        Self {
            start: Property::Static(0.0),
            end: Property::Static(1.0),
            offset: Property::Static(0.0),
            units: TextRangeSelectorUnits::Percentage,
            based_on: TextSelectorBasedOn::Characters,
            mode: TextSelectorMode::Add,
            amount: Property::Static(1.0),
            shape: TextRangeSelectorShape::Square,
            smoothness: Property::Static(1.0),
            ease_high: Property::Static(0.0),
            ease_low: Property::Static(0.0),
            randomize_order: false,
            random_seed: Property::Static(0),
        }
    }
}

/// Typography values an animator blends in over its selected glyphs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextAnimatorTypographyProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<Property<Opacity>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Property<Vec2>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<Property<Vec2>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Property<f32>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextAnimator {
    pub selectors: Vec<TextRangeSelector>,
    pub typography: TextAnimatorTypographyProperties,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AnchorPointGrouping {
    #[default]
    Character,
    Word,
    Line,
    All,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextMoreOptions {
    pub anchor_point_grouping: AnchorPointGrouping,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grouping_alignment: Option<Property<Vec2>>,
}

// ---- file ----------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeStretchMode {
    #[default]
    None,
    Scale,
    Repeat,
    RepeatInverted,
}

/// Settings shared by every layer loaded from one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    pub frame_rate: f32,
    #[serde(default)]
    pub time_stretch_mode: TimeStretchMode,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            frame_rate: 60.0,
            time_stretch_mode: TimeStretchMode::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn variant_follows_dimensionality() {
        let point = Keyframe::linear(0, 10, Vec2::ZERO, Vec2::ONE);
        let scalar = Keyframe::linear(0, 10, 0.0f32, 1.0);
        assert_eq!(point.variant(), KeyframeVariant::MultiDimension);
        assert_eq!(scalar.variant(), KeyframeVariant::SingleEase);

        let spatial = Keyframe {
            spatial_out: Some(Vec2::new(0.0, -20.0)),
            ..point
        };
        assert_eq!(spatial.variant(), KeyframeVariant::SingleEase);
    }

    #[test]
    fn static_point_is_not_mistaken_for_keyframes() {
        let p: Property<Vec2> = serde_json::from_value(json!([3.0, 4.0])).unwrap();
        assert_eq!(p, Property::Static(Vec2::new(3.0, 4.0)));
    }

    #[test]
    fn keyframe_list_parses_as_animatable() {
        let p: Property<f32> = serde_json::from_value(json!([
            { "startTime": 0, "endTime": 10, "startValue": 0.0, "endValue": 90.0 }
        ]))
        .unwrap();
        assert!(p.is_animatable());
        assert_eq!(p.keyframes()[0].end_time, 10);
    }

    #[test]
    fn overlapping_keyframes_are_rejected() {
        let err = Property::try_animatable(vec![
            Keyframe::linear(0, 10, 0.0f32, 1.0),
            Keyframe::linear(5, 15, 1.0, 2.0),
        ])
        .unwrap_err();
        assert!(matches!(err, KeyframeError::Overlap { index: 1, .. }));
        assert!(Property::<f32>::try_animatable(Vec::new()).is_err());
        assert!(Property::<f32>::make_animatable(Vec::new()).is_none());
    }

    #[test]
    fn keyframes_must_end_after_they_start() {
        let err = Property::try_animatable(vec![Keyframe::linear(4, 4, 0.0f32, 1.0)]).unwrap_err();
        assert_eq!(err, KeyframeError::Reversed { index: 0, start: 4, end: 4 });
        let err = Property::try_animatable(vec![Keyframe::linear(8, 2, 0.0f32, 1.0)]).unwrap_err();
        assert!(matches!(err, KeyframeError::Reversed { index: 0, .. }));

        let json = json!([{ "startTime": 3, "endTime": 3, "startValue": 0.0, "endValue": 1.0 }]);
        assert!(serde_json::from_value::<Property<f32>>(json).is_err());
    }

    #[test]
    fn empty_keyframe_list_fails_to_parse() {
        assert!(serde_json::from_value::<Property<f32>>(json!([])).is_err());
    }

    #[test]
    fn split_position_round_trips_through_json() {
        let mut t = Transform2D::default();
        t.set_split_position(Property::Static(1.0), Property::Static(2.0));
        let back: Transform2D = serde_json::from_value(serde_json::to_value(&t).unwrap()).unwrap();
        assert!(back.has_split_position());
        t.set_position(Property::Static(Vec2::ONE));
        assert!(!t.has_split_position());
    }

    #[test]
    fn editable_fields_leave_box_untouched() {
        let mut doc = TextDocument {
            box_text: true,
            ..TextDocument::default()
        };
        let edit = TextDocument {
            text: "hi".into(),
            font_size: 40.0,
            ..TextDocument::default()
        };
        doc.apply_editable_fields(&edit);
        assert_eq!(doc.text, "hi");
        assert_eq!(doc.font_size, 40.0);
        assert!(doc.box_text);
    }
}
