//! Public layer handles.
//!
//! A [`Layer`] is a cheap, clonable reference to one node of a layer tree.
//! Every method takes the tree's lock exactly once. Handles follow their layer
//! when it moves between trees: each handle shares a slot that the arena
//! repoints whenever the layer is absorbed into another tree. A [`WeakLayer`]
//! additionally tracks the node itself, so it stays valid while a composition
//! still owns the layer even after every handle is gone.

use crate::arena::{LayerArena, LayerKind, LayerNode};
use crate::composition::Composition;
use crate::content::{LayerContent, LayerType, SolidContent};
use crate::lock::TreeLock;
use crate::session::{LayerId, Session};
use crate::text_layer::TextLayer;
use crate::time::{time_to_frame, DEFAULT_FRAME_RATE};
use crate::transform::{map_rect, ResolvedTransform};
use glam::{Mat3, Vec2};
use kurbo::Rect;
use motion_data::{Frame, Transform2D};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tracing::{debug, warn};

pub(crate) type SharedTree = Arc<TreeLock<LayerArena>>;

/// Number of times a handle re-reads its slot while the layer is between trees.
const MAX_TREE_HOPS: usize = 64;

/// Where a layer currently lives. Shared by every handle to that layer.
pub(crate) struct LayerSlot {
    id: LayerId,
    tree: Mutex<SharedTree>,
}

impl LayerSlot {
    pub(crate) fn new(id: LayerId, tree: SharedTree) -> Self {
        Self {
            id,
            tree: Mutex::new(tree),
        }
    }

    pub(crate) fn id(&self) -> LayerId {
        self.id
    }

    fn tree(&self) -> SharedTree {
        Arc::clone(&self.tree.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub(crate) fn retarget(&self, tree: &SharedTree) {
        *self.tree.lock().unwrap_or_else(PoisonError::into_inner) = Arc::clone(tree);
    }
}

/// Where a layer node lives, owned by the arena holding the node.
///
/// Points at its tree weakly, so it never keeps the tree alive on its own.
pub(crate) struct LayerAnchor {
    id: LayerId,
    tree: Mutex<Weak<TreeLock<LayerArena>>>,
}

impl LayerAnchor {
    pub(crate) fn new(id: LayerId, tree: &SharedTree) -> Self {
        Self {
            id,
            tree: Mutex::new(Arc::downgrade(tree)),
        }
    }

    fn tree(&self) -> Option<SharedTree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner).upgrade()
    }

    pub(crate) fn retarget(&self, tree: &SharedTree) {
        *self.tree.lock().unwrap_or_else(PoisonError::into_inner) = Arc::downgrade(tree);
    }
}

#[derive(Clone)]
pub struct Layer {
    slot: Arc<LayerSlot>,
}

/// Non-owning counterpart of [`Layer`].
///
/// Upgrades while any handle to the layer exists or while the layer sits in a
/// tree that something still holds.
#[derive(Clone, Default)]
pub struct WeakLayer {
    slot: Weak<LayerSlot>,
    anchor: Weak<LayerAnchor>,
}

impl WeakLayer {
    pub fn upgrade(&self) -> Option<Layer> {
        if let Some(slot) = self.slot.upgrade() {
            return Some(Layer { slot });
        }
        let anchor = self.anchor.upgrade()?;
        for _ in 0..MAX_TREE_HOPS {
            let slot = anchor
                .tree()
                .and_then(|tree| tree.scoped(|arena| arena.slot(anchor.id, &tree)));
            if let Some(slot) = slot {
                return Some(Layer { slot });
            }
            std::thread::yield_now();
        }
        None
    }
}

/// Wraps a detached arena in a tree of its own and returns a handle to `root`.
pub(crate) fn isolate(arena: LayerArena, root: LayerId) -> Option<Layer> {
    let tree: SharedTree = Arc::new(TreeLock::new(arena));
    tree.scoped(|arena| {
        arena.retarget_slots(&tree);
        arena.slot(root, &tree)
    })
    .map(|slot| Layer { slot })
}

impl Layer {
    /// Creates a standalone layer. Returns `None` for a non-positive duration.
    pub fn make(
        session: &Session,
        layer_type: LayerType,
        duration_us: i64,
        content: Option<Box<dyn LayerContent>>,
    ) -> Option<Layer> {
        if duration_us <= 0 {
            return None;
        }
        let duration = time_to_frame(duration_us, DEFAULT_FRAME_RATE);
        let node = LayerNode::new(session.next_layer_id(), layer_type, duration, LayerKind::Content(content));
        Some(Layer::from_node(node))
    }

    pub fn make_solid(session: &Session, duration_us: i64, width: f64, height: f64) -> Option<Layer> {
        Layer::make(
            session,
            LayerType::Solid,
            duration_us,
            Some(Box::new(SolidContent::new(width, height))),
        )
    }

    pub fn make_null(session: &Session, duration_us: i64) -> Option<Layer> {
        Layer::make(session, LayerType::Null, duration_us, None)
    }

    pub(crate) fn from_node(node: LayerNode) -> Layer {
        let id = node.id;
        let tree: SharedTree = Arc::new(TreeLock::new(LayerArena::with_root(node)));
        let slot = Arc::new(LayerSlot::new(id, Arc::clone(&tree)));
        tree.scoped(|arena| arena.register_slot(&slot));
        Layer { slot }
    }

    pub(crate) fn from_slot(slot: Arc<LayerSlot>) -> Layer {
        Layer { slot }
    }

    /// Handle to `id` within the tree whose lock the caller holds.
    pub(crate) fn in_tree(arena: &mut LayerArena, tree: &SharedTree, id: LayerId) -> Option<Layer> {
        arena.slot(id, tree).map(Layer::from_slot)
    }

    /// Runs `f` under this layer's tree lock.
    ///
    /// Returns `None` when the handle no longer resolves to a tree holding the layer.
    pub(crate) fn with_tree<R>(&self, f: impl FnOnce(&mut LayerArena, LayerId, &SharedTree) -> R) -> Option<R> {
        let id = self.slot.id;
        let mut f = Some(f);
        for _ in 0..MAX_TREE_HOPS {
            let tree = self.slot.tree();
            let result = tree.scoped(|arena| {
                if !arena.contains(id) {
                    return None;
                }
                f.take().map(|f| f(arena, id, &tree))
            });
            if result.is_some() {
                return result;
            }
            // Moving between trees; the slot is repointed once the move lands.
            std::thread::yield_now();
        }
        warn!(layer = %id, "layer handle no longer resolves to a tree");
        None
    }

    fn read<R: Default>(&self, f: impl FnOnce(&LayerArena, LayerId) -> R) -> R {
        self.with_tree(|arena, id, _| f(arena, id)).unwrap_or_default()
    }

    fn node_value<R: Default>(&self, f: impl FnOnce(&LayerNode) -> R) -> R {
        self.read(|arena, id| arena.node(id).map(f).unwrap_or_default())
    }

    pub fn unique_id(&self) -> LayerId {
        self.slot.id
    }

    pub fn downgrade(&self) -> WeakLayer {
        let anchor = self
            .with_tree(|arena, id, tree| arena.anchor(id, tree))
            .flatten()
            .map(|anchor| Arc::downgrade(&anchor))
            .unwrap_or_default();
        WeakLayer {
            slot: Arc::downgrade(&self.slot),
            anchor,
        }
    }

    /// Id of the lock currently guarding this layer's tree.
    pub fn tree_lock_id(&self) -> u64 {
        self.slot.tree().id()
    }

    pub fn is_live(&self) -> bool {
        self.with_tree(|_, _, _| ()).is_some()
    }

    pub fn layer_type(&self) -> LayerType {
        self.read(|arena, id| arena.node(id).map(|node| node.layer_type))
            .unwrap_or(LayerType::Null)
    }

    pub fn layer_name(&self) -> String {
        self.node_value(|node| node.name.clone())
    }

    pub fn set_layer_name(&self, name: &str) {
        self.with_tree(|arena, id, _| {
            if let Some(node) = arena.node_mut(id) {
                node.name = name.to_owned();
            }
        });
    }

    pub fn as_text(&self) -> Option<TextLayer> {
        (self.layer_type() == LayerType::Text).then(|| TextLayer::from_layer(self.clone()))
    }

    pub fn as_composition(&self) -> Option<Composition> {
        (self.layer_type() == LayerType::PreCompose).then(|| Composition::from_layer(self.clone()))
    }

    // ---- time ---------------------------------------------------------------

    pub fn frame_rate(&self) -> f32 {
        self.with_tree(|arena, id, _| arena.frame_rate(id))
            .unwrap_or(DEFAULT_FRAME_RATE)
    }

    /// Offset of the layer within its timeline owner, in microseconds.
    pub fn start_time(&self) -> i64 {
        self.read(|arena, id| arena.start_time_us(id))
    }

    pub fn set_start_time(&self, time: i64) {
        self.with_tree(|arena, id, _| arena.set_start_time(id, time));
    }

    /// Played duration in microseconds, after any stretch.
    pub fn duration(&self) -> i64 {
        self.read(|arena, id| arena.duration_us(id))
    }

    /// Position on the owner's timeline, in microseconds.
    pub fn current_time(&self) -> i64 {
        self.read(|arena, id| arena.current_time(id))
    }

    /// Moves the layer to `time` on its owner's timeline. Returns whether the output changed.
    pub fn set_current_time(&self, time: i64) -> bool {
        self.read_mut(|arena, id| arena.goto_time_and_notify_changed(id, time))
    }

    pub fn progress(&self) -> f64 {
        self.read(|arena, id| arena.progress(id))
    }

    pub fn set_progress(&self, progress: f64) -> bool {
        self.read_mut(|arena, id| arena.set_progress(id, progress))
    }

    pub fn pre_frame(&self) {
        self.with_tree(|arena, id, _| arena.step_frame(id, false));
    }

    pub fn next_frame(&self) {
        self.with_tree(|arena, id, _| arena.step_frame(id, true));
    }

    /// Position on the layer's content timeline, before any stretch is undone.
    pub fn content_frame(&self) -> Frame {
        self.node_value(|node| node.content_frame)
    }

    /// Frame at which the layer's properties are evaluated.
    pub fn layer_frame(&self) -> Frame {
        self.read(|arena, id| arena.layer_frame(id))
    }

    pub fn local_frame_to_global(&self, local_frame: Frame) -> Frame {
        self.read(|arena, id| arena.local_frame_to_global(id, local_frame))
    }

    pub fn global_to_local_frame(&self, global_frame: Frame) -> Frame {
        self.read(|arena, id| arena.global_to_local_frame(id, global_frame))
    }

    pub fn local_time_to_global(&self, local_time: i64) -> i64 {
        self.read(|arena, id| arena.local_time_to_global(id, local_time))
    }

    pub fn global_to_local_time(&self, global_time: i64) -> i64 {
        self.read(|arena, id| arena.global_to_local_time(id, global_time))
    }

    pub fn excluded_from_timeline(&self) -> bool {
        self.node_value(|node| node.excluded_from_timeline)
    }

    /// Excluded layers keep their frame when their parent moves in time.
    pub fn set_excluded_from_timeline(&self, excluded: bool) {
        self.with_tree(|arena, id, _| {
            if let Some(node) = arena.node_mut(id) {
                node.excluded_from_timeline = excluded;
            }
        });
    }

    // ---- versions -----------------------------------------------------------

    pub fn content_version(&self) -> u64 {
        self.node_value(|node| node.content_version)
    }

    pub fn audio_version(&self) -> u64 {
        self.node_value(|node| node.audio_version)
    }

    pub fn notify_modified(&self, content_changed: bool) {
        self.with_tree(|arena, id, _| arena.notify_modified(id, content_changed));
    }

    // ---- rendering surface --------------------------------------------------

    pub fn matrix(&self) -> Mat3 {
        self.node_value(|node| node.matrix)
    }

    pub fn set_matrix(&self, matrix: Mat3) {
        self.with_tree(|arena, id, _| {
            let Some(node) = arena.node_mut(id) else {
                return;
            };
            if node.matrix == matrix {
                return;
            }
            node.matrix = matrix;
            arena.notify_modified(id, true);
            arena.invalidate_cache_scale(id);
        });
    }

    pub fn reset_matrix(&self) {
        self.set_matrix(Mat3::IDENTITY);
    }

    /// Layer matrix and transform of this layer and every parent composition.
    pub fn total_matrix(&self) -> Mat3 {
        self.read(|arena, id| global_matrix(arena, id))
    }

    pub fn alpha(&self) -> f32 {
        self.node_value(|node| node.alpha)
    }

    pub fn set_alpha(&self, alpha: f32) {
        self.with_tree(|arena, id, _| {
            let Some(node) = arena.node_mut(id) else {
                return;
            };
            if node.alpha == alpha {
                return;
            }
            node.alpha = alpha;
            arena.notify_modified(id, true);
        });
    }

    pub fn visible(&self) -> bool {
        self.node_value(|node| node.visible)
    }

    pub fn set_visible(&self, visible: bool) {
        self.with_tree(|arena, id, _| {
            let Some(node) = arena.node_mut(id) else {
                return;
            };
            if node.visible == visible {
                return;
            }
            node.visible = visible;
            arena.notify_modified(id, true);
        });
    }

    /// Resolved matrix and alpha at the current frame, `None` when nothing would draw.
    pub fn get_transform(&self) -> Option<ResolvedTransform> {
        self.with_tree(|arena, id, _| arena.resolved_transform(id)).flatten()
    }

    /// Local-space bounds of the content at the current frame.
    pub fn measure_bounds(&self) -> Rect {
        self.with_tree(|arena, id, _| arena.measure_bounds(id))
            .unwrap_or(Rect::ZERO)
    }

    /// Bounds in the coordinate space of the tree's root.
    pub fn bounds(&self) -> Rect {
        self.with_tree(|arena, id, _| map_rect(global_matrix(arena, id), arena.measure_bounds(id)))
            .unwrap_or(Rect::ZERO)
    }

    /// Maps a point from the root's coordinate space into this layer's local space.
    pub fn global_to_local_point(&self, point: Vec2) -> Vec2 {
        self.with_tree(|arena, id, _| {
            let matrix = global_matrix(arena, id);
            if matrix.determinant() == 0.0 {
                return point;
            }
            matrix.inverse().transform_point2(point)
        })
        .unwrap_or(point)
    }

    pub fn get_transform_2d(&self) -> Option<Transform2D> {
        self.with_tree(|arena, id, _| arena.node(id).and_then(|node| node.transform.clone()))
            .flatten()
    }

    pub fn set_transform_2d(&self, transform: Transform2D) {
        self.with_tree(|arena, id, _| arena.set_transform_2d(id, transform));
    }

    // ---- structure ----------------------------------------------------------

    pub fn parent(&self) -> Option<Composition> {
        self.with_tree(|arena, id, tree| {
            let parent = arena.node(id)?.parent?;
            Layer::in_tree(arena, tree, parent).map(Composition::from_layer)
        })
        .flatten()
    }

    pub fn track_matte_layer(&self) -> Option<Layer> {
        self.with_tree(|arena, id, tree| {
            let matte = arena.node(id)?.track_matte?;
            Layer::in_tree(arena, tree, matte)
        })
        .flatten()
    }

    /// Installs `matte` as this layer's track matte, moving it into this layer's tree.
    pub fn set_track_matte(&self, matte: &Layer) -> bool {
        if matte.unique_id() == self.unique_id() {
            warn!(layer = %self.unique_id(), "a layer cannot matte itself");
            return false;
        }
        if self.track_matte_layer().is_some_and(|current| current == *matte) {
            return true;
        }
        self.remove_track_matte();
        move_into(self, matte, |arena, owner, matte| {
            arena.attach_matte(owner, matte);
            true
        })
    }

    /// Detaches the track matte into a tree of its own and returns it.
    pub fn remove_track_matte(&self) -> Option<Layer> {
        let (detached, matte) = self
            .with_tree(|arena, id, _| {
                let matte = arena.node(id)?.track_matte?;
                arena.detach(matte).map(|detached| (detached, matte))
            })
            .flatten()?;
        isolate(detached, matte)
    }

    pub fn is_on_stage(&self) -> bool {
        self.node_value(|node| node.on_stage)
    }

    fn read_mut<R: Default>(&self, f: impl FnOnce(&mut LayerArena, LayerId) -> R) -> R {
        self.with_tree(|arena, id, _| f(arena, id)).unwrap_or_default()
    }
}

impl PartialEq for Layer {
    fn eq(&self, other: &Self) -> bool {
        self.slot.id == other.slot.id
    }
}

impl Eq for Layer {}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer").field("id", &self.slot.id).finish()
    }
}

fn global_matrix(arena: &LayerArena, id: LayerId) -> Mat3 {
    let mut matrix = arena.total_matrix(id);
    let mut cursor = arena.node(id).and_then(|node| node.parent);
    while let Some(parent) = cursor {
        matrix = arena.total_matrix(parent) * matrix;
        cursor = arena.node(parent).and_then(|node| node.parent);
    }
    matrix
}

/// Moves `moving` into the tree of `target` and links it there.
///
/// Only one tree lock is held at a time: the layer is detached under its own
/// tree's lock, then absorbed and linked under the target's.
pub(crate) fn move_into(
    target: &Layer,
    moving: &Layer,
    link: impl FnOnce(&mut LayerArena, LayerId, LayerId) -> bool,
) -> bool {
    let moving_id = moving.unique_id();
    let mut link = Some(link);

    // Same tree: relink in place.
    let same_tree = target.with_tree(|arena, target_id, _| {
        if !arena.contains(moving_id) {
            return None;
        }
        if arena.is_self_or_ancestor(moving_id, target_id) {
            warn!(layer = %moving_id, target = %target_id, "refusing to move a layer beneath itself");
            return Some(false);
        }
        arena.unlink(moving_id);
        link.take().map(|link| link(arena, target_id, moving_id))
    });
    match same_tree {
        None => return false,
        Some(Some(linked)) => return linked,
        Some(None) => {}
    }

    let Some(detached) = moving.with_tree(|arena, id, _| arena.detach(id)).flatten() else {
        return false;
    };
    let mut pending = Some(detached);
    let linked = target.with_tree(|arena, target_id, tree| {
        let detached = pending.take()?;
        match arena.absorb(detached, tree) {
            Ok(()) => link.take().map(|link| link(arena, target_id, moving_id)),
            Err(detached) => {
                pending = Some(detached);
                None
            }
        }
    });
    match (linked.flatten(), pending) {
        (Some(linked), _) => {
            debug!(layer = %moving_id, target = %target.unique_id(), "layer moved between trees");
            linked
        }
        (None, Some(detached)) => {
            warn!(layer = %moving_id, "layer ids collide with the target tree; layer left on its own");
            isolate(detached, moving_id);
            false
        }
        (None, None) => false,
    }
}
