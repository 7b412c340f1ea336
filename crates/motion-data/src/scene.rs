//! JSON scene descriptions consumed by the scene builder.
//!
//! A scene is a root composition with nested layers. Frame rates are declared
//! on compositions and inherited by everything beneath them.

use crate::model::{
    Frame, TextAnimator, TextDocument, TextMoreOptions, TimeStretchMode, Transform2D,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneFile {
    #[serde(default)]
    pub name: Option<String>,
    pub root: LayerDescription,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDescription {
    #[serde(default)]
    pub name: String,
    /// First frame of the layer's content on its own timeline.
    #[serde(default)]
    pub start_time: Frame,
    pub duration: Frame,
    /// Offset of the layer within its parent, in the parent's frames.
    #[serde(default)]
    pub start_frame: Frame,
    #[serde(default)]
    pub transform: Option<Transform2D>,
    #[serde(default)]
    pub track_matte: Option<Box<LayerDescription>>,
    #[serde(default)]
    pub excluded_from_timeline: bool,
    #[serde(flatten)]
    pub content: LayerContentDescription,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LayerContentDescription {
    #[serde(rename_all = "camelCase")]
    Solid {
        width: f64,
        height: f64,
        /// Frames on which the solid's pixels change, as `[start, end)` pairs.
        #[serde(default)]
        varying: Vec<(Frame, Frame)>,
    },
    #[serde(rename_all = "camelCase")]
    Text {
        document: TextDocument,
        #[serde(default)]
        animators: Vec<TextAnimator>,
        #[serde(default)]
        more_options: Option<TextMoreOptions>,
    },
    #[serde(rename_all = "camelCase")]
    Composition {
        width: f64,
        height: f64,
        /// Declares a new file scope with its own frame rate.
        #[serde(default)]
        frame_rate: Option<f32>,
        #[serde(default)]
        time_stretch_mode: TimeStretchMode,
        #[serde(default)]
        layers: Vec<LayerDescription>,
    },
    Null,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_scene_parses() {
        let scene: SceneFile = serde_json::from_value(json!({
            "root": {
                "name": "root",
                "duration": 120,
                "type": "composition",
                "width": 720.0,
                "height": 1280.0,
                "frameRate": 24.0,
                "layers": [
                    {
                        "name": "title",
                        "duration": 60,
                        "type": "text",
                        "document": { "text": "Hello", "fontSize": 48.0 }
                    },
                    {
                        "name": "card",
                        "duration": 60,
                        "startFrame": 10,
                        "type": "solid",
                        "width": 100.0,
                        "height": 50.0,
                        "trackMatte": { "name": "mask", "duration": 60, "type": "null" }
                    }
                ]
            }
        }))
        .unwrap();

        let LayerContentDescription::Composition { frame_rate, layers, .. } = &scene.root.content
        else {
            panic!("root should be a composition");
        };
        assert_eq!(*frame_rate, Some(24.0));
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[1].start_frame, 10);
        assert!(layers[1].track_matte.is_some());
    }
}
