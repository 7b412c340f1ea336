use crate::arena::{CompositionState, LayerArena, LayerKind, LayerNode};
use crate::content::LayerType;
use crate::layer::{isolate, move_into, Layer};
use crate::session::{LayerId, Session};
use crate::time::{time_to_frame, DEFAULT_FRAME_RATE};
use motion_data::{FileConfig, Frame, TimeStretchMode};
use std::ops::Deref;
use std::sync::Arc;
use tracing::{debug, warn};

/// Handle to a layer that nests other layers on its own timeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Composition {
    layer: Layer,
}

impl Deref for Composition {
    type Target = Layer;

    fn deref(&self) -> &Layer {
        &self.layer
    }
}

impl Composition {
    /// Creates an empty composition. Returns `None` for a non-positive duration.
    pub fn make(session: &Session, width: f64, height: f64, duration_us: i64) -> Option<Composition> {
        if duration_us <= 0 {
            return None;
        }
        let duration = time_to_frame(duration_us, DEFAULT_FRAME_RATE);
        Some(Composition::make_node(session, width, height, duration, None))
    }

    /// Creates a composition that owns a file's settings, with `duration` in that file's frames.
    pub(crate) fn make_node(
        session: &Session,
        width: f64,
        height: f64,
        duration: Frame,
        file: Option<Arc<FileConfig>>,
    ) -> Composition {
        let mut state = CompositionState::new(width, height);
        if let Some(file) = &file {
            state.time_stretch_mode = file.time_stretch_mode;
        }
        let mut node = LayerNode::new(
            session.next_layer_id(),
            LayerType::PreCompose,
            duration,
            LayerKind::Composition(state),
        );
        node.file = file;
        Composition::from_layer(Layer::from_node(node))
    }

    pub(crate) fn from_layer(layer: Layer) -> Composition {
        Composition { layer }
    }

    pub fn layer(&self) -> &Layer {
        &self.layer
    }

    fn state<R: Default>(&self, f: impl FnOnce(&CompositionState) -> R) -> R {
        self.with_tree(|arena, id, _| arena.node(id).and_then(LayerNode::composition).map(f))
            .flatten()
            .unwrap_or_default()
    }

    pub fn width(&self) -> f64 {
        self.state(|state| state.width)
    }

    pub fn height(&self) -> f64 {
        self.state(|state| state.height)
    }

    pub fn set_content_size(&self, width: f64, height: f64) {
        self.with_tree(|arena, id, _| {
            let Some(state) = arena.node_mut(id).and_then(LayerNode::composition_mut) else {
                return;
            };
            if state.width == width && state.height == height {
                return;
            }
            state.width = width;
            state.height = height;
            arena.notify_modified(id, true);
        });
    }

    pub fn num_children(&self) -> usize {
        self.state(|state| state.children.len())
    }

    pub fn layer_at(&self, index: usize) -> Option<Layer> {
        self.with_tree(|arena, id, tree| {
            let child = *arena.node(id)?.composition()?.children.get(index)?;
            Layer::in_tree(arena, tree, child)
        })
        .flatten()
    }

    pub fn layer_index(&self, layer: &Layer) -> Option<usize> {
        let target = layer.unique_id();
        self.state(|state| state.children.iter().position(|child| *child == target))
    }

    /// True if `layer` is this composition or nested anywhere beneath it.
    pub fn contains(&self, layer: &Layer) -> bool {
        let target = layer.unique_id();
        self.with_tree(|arena, id, _| arena.contains(target) && arena.is_self_or_ancestor(id, target))
            .unwrap_or(false)
    }

    /// Appends `layer` on top of the existing children.
    pub fn add_layer(&self, layer: &Layer) -> bool {
        self.add_layer_at(layer, usize::MAX)
    }

    /// Inserts `layer` at `index` (clamped), moving it out of whatever tree it was in.
    pub fn add_layer_at(&self, layer: &Layer, index: usize) -> bool {
        let added = move_into(self, layer, |arena, parent, child| arena.insert_child(parent, index, child));
        if added {
            debug!(composition = %self.unique_id(), layer = %layer.unique_id(), "layer added");
        } else {
            warn!(composition = %self.unique_id(), layer = %layer.unique_id(), "layer not added");
        }
        added
    }

    pub fn remove_layer(&self, layer: &Layer) -> Option<Layer> {
        let index = self.layer_index(layer)?;
        self.remove_layer_at(index)
    }

    /// Removes the child at `index` into a tree of its own.
    pub fn remove_layer_at(&self, index: usize) -> Option<Layer> {
        let (detached, child) = self
            .with_tree(|arena, id, _| {
                let child = *arena.node(id)?.composition()?.children.get(index)?;
                arena.detach(child).map(|detached| (detached, child))
            })
            .flatten()?;
        isolate(detached, child)
    }

    pub fn remove_all_layers(&self) {
        let removed: Vec<(LayerArena, LayerId)> = self
            .with_tree(|arena, id, _| {
                let children = arena
                    .node(id)
                    .and_then(LayerNode::composition)
                    .map(|state| state.children.clone())
                    .unwrap_or_default();
                children
                    .into_iter()
                    .filter_map(|child| arena.detach(child).map(|detached| (detached, child)))
                    .collect()
            })
            .unwrap_or_default();
        for (detached, child) in removed {
            isolate(detached, child);
        }
    }

    /// Every layer beneath this composition named `name`, depth first.
    pub fn get_layers_by_name(&self, name: &str) -> Vec<Layer> {
        self.with_tree(|arena, id, tree| {
            arena
                .find_by_name(id, name)
                .into_iter()
                .filter_map(|member| Layer::in_tree(arena, tree, member))
                .collect()
        })
        .unwrap_or_default()
    }

    /// Stretches the composition's content to `duration` microseconds.
    ///
    /// Only compositions loaded from a file can be stretched.
    pub fn set_duration(&self, duration: i64) -> bool {
        self.with_tree(|arena, id, _| arena.set_duration(id, duration))
            .unwrap_or(false)
    }

    pub fn time_stretch_mode(&self) -> TimeStretchMode {
        self.state(|state| state.time_stretch_mode)
    }

    pub fn set_time_stretch_mode(&self, mode: TimeStretchMode) {
        self.with_tree(|arena, id, _| arena.set_time_stretch_mode(id, mode));
    }

    /// Makes this composition's tree displayable.
    pub fn attach_stage(&self) {
        self.with_tree(|arena, _, _| arena.install_stage());
    }

    pub fn stage_layer_count(&self) -> usize {
        self.with_tree(|arena, _, _| arena.stage().map_or(0, |stage| stage.layer_count()))
            .unwrap_or(0)
    }

    /// Layers whose rasterization scale must be recomputed since the last call.
    pub fn take_invalid_cache_scales(&self) -> Vec<LayerId> {
        self.with_tree(|arena, _, _| {
            arena
                .stage_mut()
                .map(|stage| stage.take_invalid_cache_scales())
                .unwrap_or_default()
        })
        .unwrap_or_default()
    }
}
