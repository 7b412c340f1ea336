//! Builds layer trees from JSON scene descriptions.

use crate::arena::{CompositionState, LayerKind, LayerNode};
use crate::composition::Composition;
use crate::content::{LayerType, SolidContent};
use crate::layer::Layer;
use crate::session::Session;
use crate::text_layer::TextState;
use crate::time::FrameRange;
use motion_data::scene::{LayerContentDescription, LayerDescription, SceneFile};
use motion_data::{FileConfig, Frame, TimeStretchMode};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("failed to parse scene description: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("scene root `{0}` is not a composition")]
    RootNotComposition(String),
    #[error("layer `{name}` has a non-positive duration of {duration} frames")]
    InvalidDuration { name: String, duration: Frame },
    #[error("composition `{name}` declares an invalid frame rate {rate}")]
    InvalidFrameRate { name: String, rate: f32 },
    #[error("layer `{name}` could not be attached to `{owner}`")]
    LayerRejected { name: String, owner: String },
}

pub fn load_scene_str(session: &Session, json: &str) -> Result<Composition, SceneError> {
    let scene: SceneFile = serde_json::from_str(json)?;
    build_scene(session, &scene)
}

/// Builds the root composition of `scene` and everything beneath it.
pub fn build_scene(session: &Session, scene: &SceneFile) -> Result<Composition, SceneError> {
    if !matches!(scene.root.content, LayerContentDescription::Composition { .. }) {
        return Err(SceneError::RootNotComposition(scene.root.name.clone()));
    }
    let root = build_layer(session, &scene.root, &Arc::new(FileConfig::default()))?;
    debug!(scene = scene.name.as_deref().unwrap_or(""), root = %root.unique_id(), "scene built");
    Ok(Composition::from_layer(root))
}

fn build_layer(session: &Session, desc: &LayerDescription, file: &Arc<FileConfig>) -> Result<Layer, SceneError> {
    if desc.duration <= 0 {
        return Err(SceneError::InvalidDuration {
            name: desc.name.clone(),
            duration: desc.duration,
        });
    }

    let (layer_type, kind, file, children) = match &desc.content {
        LayerContentDescription::Null => (LayerType::Null, LayerKind::Content(None), Arc::clone(file), &[][..]),
        LayerContentDescription::Solid { width, height, varying } => {
            let content = SolidContent {
                width: *width,
                height: *height,
                varying: varying.iter().map(|(start, end)| FrameRange::new(*start, *end)).collect(),
            };
            (
                LayerType::Solid,
                LayerKind::Content(Some(Box::new(content))),
                Arc::clone(file),
                &[][..],
            )
        }
        LayerContentDescription::Text {
            document,
            animators,
            more_options,
        } => {
            let mut state = TextState::new(document.clone(), session.text_layout());
            state.animators = animators.clone();
            state.more_options = more_options.clone();
            (LayerType::Text, LayerKind::Text(state), Arc::clone(file), &[][..])
        }
        LayerContentDescription::Composition {
            width,
            height,
            frame_rate,
            time_stretch_mode,
            layers,
        } => {
            let file = composition_file(desc, file, *frame_rate, *time_stretch_mode)?;
            let mut state = CompositionState::new(*width, *height);
            state.time_stretch_mode = *time_stretch_mode;
            (LayerType::PreCompose, LayerKind::Composition(state), file, layers.as_slice())
        }
    };

    let mut node = LayerNode::new(session.next_layer_id(), layer_type, desc.duration, kind);
    node.name = desc.name.clone();
    node.start_time = desc.start_time;
    node.start_frame = desc.start_frame;
    node.excluded_from_timeline = desc.excluded_from_timeline;
    if let Some(transform) = &desc.transform {
        node.transform = Some(transform.clone());
    }
    node.file = Some(Arc::clone(&file));
    let layer = Layer::from_node(node);

    if let Some(matte) = &desc.track_matte {
        let matte_layer = build_layer(session, matte, &file)?;
        if !layer.set_track_matte(&matte_layer) {
            return Err(rejected(matte, desc));
        }
    }

    if !children.is_empty() {
        let composition = Composition::from_layer(layer.clone());
        for child in children {
            let child_layer = build_layer(session, child, &file)?;
            if !composition.add_layer(&child_layer) {
                return Err(rejected(child, desc));
            }
        }
    }
    Ok(layer)
}

/// Settings for a composition: a declared frame rate opens a new file scope.
fn composition_file(
    desc: &LayerDescription,
    inherited: &Arc<FileConfig>,
    frame_rate: Option<f32>,
    time_stretch_mode: TimeStretchMode,
) -> Result<Arc<FileConfig>, SceneError> {
    let frame_rate = match frame_rate {
        Some(rate) if !rate.is_finite() || rate <= 0.0 => {
            return Err(SceneError::InvalidFrameRate {
                name: desc.name.clone(),
                rate,
            })
        }
        Some(rate) => rate,
        None => inherited.frame_rate,
    };
    if frame_rate == inherited.frame_rate && time_stretch_mode == inherited.time_stretch_mode {
        return Ok(Arc::clone(inherited));
    }
    Ok(Arc::new(FileConfig {
        frame_rate,
        time_stretch_mode,
    }))
}

fn rejected(child: &LayerDescription, owner: &LayerDescription) -> SceneError {
    SceneError::LayerRejected {
        name: child.name.clone(),
        owner: owner.name.clone(),
    }
}
