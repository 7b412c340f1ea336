//! Layer storage and timeline resolution.
//!
//! ## Responsibilities
//! - Owns every layer node of one tree, keyed by [`LayerId`].
//! - Maps times to content frames across nested compositions with
//!   independent frame rates and stretched durations.
//! - Propagates content/audio version bumps up the parent-or-owner chain.
//! - Moves subtrees between trees on attach and detach.
//!
//! Nothing in here locks a tree. Callers hold the tree's [`crate::lock::TreeLock`].

use crate::cache::LayerCache;
use crate::content::{LayerContent, LayerType};
use crate::layer::{LayerAnchor, LayerSlot, SharedTree};
use crate::session::LayerId;
use crate::stage::Stage;
use crate::text_animator::animator_varying_ranges;
use crate::text_layer::TextState;
use crate::time::{frame_to_time, time_to_frame, FrameRange, DEFAULT_FRAME_RATE};
use crate::transform::{map_rect, ResolvedTransform, TransformExt};
use glam::Mat3;
use kurbo::Rect;
use motion_data::{FileConfig, Frame, TimeStretchMode, Transform2D};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::debug;

pub(crate) struct CompositionState {
    pub width: f64,
    pub height: f64,
    pub children: Vec<LayerId>,
    pub time_stretch_mode: TimeStretchMode,
    /// Duration the content is stretched to; `None` plays at natural length.
    pub stretched_duration: Option<Frame>,
}

impl CompositionState {
    pub(crate) fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            children: Vec::new(),
            time_stretch_mode: TimeStretchMode::None,
            stretched_duration: None,
        }
    }
}

pub(crate) enum LayerKind {
    Content(Option<Box<dyn LayerContent>>),
    Text(TextState),
    Composition(CompositionState),
}

pub(crate) struct LayerNode {
    pub id: LayerId,
    pub name: String,
    pub layer_type: LayerType,
    /// First frame of the content on the layer's own timeline.
    pub start_time: Frame,
    pub duration: Frame,
    pub transform: Option<Transform2D>,
    pub file: Option<Arc<FileConfig>>,
    /// Offset of the layer within its timeline owner.
    pub start_frame: Frame,
    /// Position on the layer's (stretched) content timeline.
    pub content_frame: Frame,
    pub content_version: u64,
    pub audio_version: u64,
    pub parent: Option<LayerId>,
    pub track_matte: Option<LayerId>,
    pub track_matte_owner: Option<LayerId>,
    pub on_stage: bool,
    pub matrix: Mat3,
    pub alpha: f32,
    pub visible: bool,
    pub excluded_from_timeline: bool,
    pub cache: LayerCache,
    pub kind: LayerKind,
}

impl LayerNode {
    pub(crate) fn new(id: LayerId, layer_type: LayerType, duration: Frame, kind: LayerKind) -> Self {
        Self {
            id,
            name: String::new(),
            layer_type,
            start_time: 0,
            duration,
            transform: Some(Transform2D::default()),
            file: None,
            start_frame: 0,
            content_frame: 0,
            content_version: 0,
            audio_version: 0,
            parent: None,
            track_matte: None,
            track_matte_owner: None,
            on_stage: false,
            matrix: Mat3::IDENTITY,
            alpha: 1.0,
            visible: true,
            excluded_from_timeline: false,
            cache: LayerCache::default(),
            kind,
        }
    }

    pub(crate) fn composition(&self) -> Option<&CompositionState> {
        match &self.kind {
            LayerKind::Composition(composition) => Some(composition),
            _ => None,
        }
    }

    pub(crate) fn composition_mut(&mut self) -> Option<&mut CompositionState> {
        match &mut self.kind {
            LayerKind::Composition(composition) => Some(composition),
            _ => None,
        }
    }

    pub(crate) fn text(&self) -> Option<&TextState> {
        match &self.kind {
            LayerKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub(crate) fn text_mut(&mut self) -> Option<&mut TextState> {
        match &mut self.kind {
            LayerKind::Text(text) => Some(text),
            _ => None,
        }
    }

    fn frame_rate(&self) -> f32 {
        self.file
            .as_ref()
            .map(|file| file.frame_rate)
            .filter(|rate| *rate > 0.0)
            .unwrap_or(DEFAULT_FRAME_RATE)
    }

    fn stretch(&self) -> Option<(TimeStretchMode, Frame)> {
        let composition = self.composition()?;
        composition
            .stretched_duration
            .map(|stretched| (composition.time_stretch_mode, stretched))
    }
}

/// Maps a frame on the stretched timeline back onto the content timeline.
pub(crate) fn stretched_to_content(
    mode: TimeStretchMode,
    frame: Frame,
    duration: Frame,
    stretched: Frame,
) -> Frame {
    if duration <= 0 || stretched <= 0 || frame < 0 {
        return frame;
    }
    match mode {
        TimeStretchMode::None => frame,
        TimeStretchMode::Scale => {
            (frame as f64 * duration as f64 / stretched as f64).floor() as Frame
        }
        TimeStretchMode::Repeat => frame % duration,
        TimeStretchMode::RepeatInverted => {
            let remainder = frame % duration;
            if (frame / duration) % 2 == 1 {
                duration - 1 - remainder
            } else {
                remainder
            }
        }
    }
}

/// Places a content frame on the stretched timeline; repeats map into the first cycle.
pub(crate) fn content_to_stretched(
    mode: TimeStretchMode,
    frame: Frame,
    duration: Frame,
    stretched: Frame,
) -> Frame {
    match mode {
        TimeStretchMode::Scale if duration > 0 => {
            (frame as f64 * stretched as f64 / duration as f64).round() as Frame
        }
        _ => frame,
    }
}

#[derive(Default)]
pub struct LayerArena {
    nodes: HashMap<LayerId, LayerNode>,
    stage: Option<Stage>,
    /// Handle slots of the layers held here; retargeted when layers change trees.
    slots: HashMap<LayerId, Weak<LayerSlot>>,
    /// Anchors of weak handles; live exactly as long as their node.
    anchors: HashMap<LayerId, Arc<LayerAnchor>>,
}

impl LayerArena {
    pub(crate) fn with_root(node: LayerNode) -> Self {
        let id = node.id;
        let mut arena = Self::default();
        arena.nodes.insert(id, node);
        arena.rebuild_cache(id);
        arena
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, id: LayerId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn stage(&self) -> Option<&Stage> {
        self.stage.as_ref()
    }

    pub(crate) fn stage_mut(&mut self) -> Option<&mut Stage> {
        self.stage.as_mut()
    }

    pub(crate) fn node(&self, id: LayerId) -> Option<&LayerNode> {
        self.nodes.get(&id)
    }

    pub(crate) fn node_mut(&mut self, id: LayerId) -> Option<&mut LayerNode> {
        self.nodes.get_mut(&id)
    }

    pub(crate) fn frame_rate(&self, id: LayerId) -> f32 {
        self.node(id).map_or(DEFAULT_FRAME_RATE, LayerNode::frame_rate)
    }

    /// Shared slot for a handle to `id`, created on first use.
    pub(crate) fn slot(&mut self, id: LayerId, tree: &SharedTree) -> Option<Arc<LayerSlot>> {
        if !self.contains(id) {
            return None;
        }
        if let Some(slot) = self.slots.get(&id).and_then(Weak::upgrade) {
            return Some(slot);
        }
        let slot = Arc::new(LayerSlot::new(id, Arc::clone(tree)));
        self.register_slot(&slot);
        Some(slot)
    }

    /// Anchor for weak handles to `id`, created on first use.
    pub(crate) fn anchor(&mut self, id: LayerId, tree: &SharedTree) -> Option<Arc<LayerAnchor>> {
        if !self.contains(id) {
            return None;
        }
        let anchor = self
            .anchors
            .entry(id)
            .or_insert_with(|| Arc::new(LayerAnchor::new(id, tree)));
        Some(Arc::clone(anchor))
    }

    pub(crate) fn register_slot(&mut self, slot: &Arc<LayerSlot>) {
        self.slots.insert(slot.id(), Arc::downgrade(slot));
    }

    /// Points every live handle and anchor of this arena at `tree`.
    pub(crate) fn retarget_slots(&mut self, tree: &SharedTree) {
        for anchor in self.anchors.values() {
            anchor.retarget(tree);
        }
        self.slots.retain(|_, slot| match slot.upgrade() {
            Some(slot) => {
                slot.retarget(tree);
                true
            }
            None => false,
        });
    }

    // ---- stretch ----------------------------------------------------------

    pub(crate) fn stretched_frame_duration(&self, id: LayerId) -> Frame {
        self.node(id).map_or(0, |node| {
            node.stretch().map_or(node.duration, |(_, stretched)| stretched)
        })
    }

    /// Content frame the layer is showing after undoing any stretch.
    pub(crate) fn mapped_content_frame(&self, id: LayerId) -> Frame {
        self.node(id)
            .map_or(0, |node| self.stretched_to_content(id, node.content_frame))
    }

    fn stretched_to_content(&self, id: LayerId, frame: Frame) -> Frame {
        match self.node(id) {
            Some(node) => match node.stretch() {
                Some((mode, stretched)) => stretched_to_content(mode, frame, node.duration, stretched),
                None => frame,
            },
            None => frame,
        }
    }

    fn content_to_stretched(&self, id: LayerId, frame: Frame) -> Frame {
        match self.node(id) {
            Some(node) => match node.stretch() {
                Some((mode, stretched)) => content_to_stretched(mode, frame, node.duration, stretched),
                None => frame,
            },
            None => frame,
        }
    }

    /// Frame on the layer's own timeline at which its properties are evaluated.
    pub(crate) fn layer_frame(&self, id: LayerId) -> Frame {
        self.node(id)
            .map_or(0, |node| node.start_time + self.mapped_content_frame(id))
    }

    pub(crate) fn frame_visible(&self, id: LayerId) -> bool {
        self.node(id).is_some_and(|node| {
            node.content_frame >= 0 && node.content_frame < self.stretched_frame_duration(id)
        })
    }

    // ---- time -------------------------------------------------------------

    /// Moves the layer, its matte and its children to `layer_time` on the owner's timeline.
    ///
    /// Returns whether anything that renders changed.
    pub(crate) fn goto_time(&mut self, id: LayerId, layer_time: i64) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        let matte = node.track_matte;
        let mut changed = false;
        if let Some(matte) = matte {
            changed |= self.goto_time(matte, layer_time);
        }

        let rate = self.frame_rate(id);
        let old_frame = self.mapped_content_frame(id);
        let old_stretched = self.node(id).map_or(0, |node| node.content_frame);
        let Some(node) = self.node_mut(id) else {
            return changed;
        };
        node.content_frame = time_to_frame(layer_time, rate) - node.start_frame;
        let new_stretched = node.content_frame;
        let start_frame = node.start_frame;
        let new_frame = self.mapped_content_frame(id);

        if !changed && self.content_frame_changed(id, old_stretched, new_stretched, old_frame, new_frame) {
            changed = true;
        }

        let Some(node) = self.node(id) else {
            return changed;
        };
        if let Some(composition) = node.composition() {
            let child_time = if node.stretch().is_some() {
                frame_to_time(new_frame, rate)
            } else {
                layer_time - frame_to_time(start_frame, rate)
            };
            let children = composition.children.clone();
            for child in children {
                if self.node(child).is_some_and(|c| c.excluded_from_timeline) {
                    continue;
                }
                changed |= self.goto_time(child, child_time);
            }
        }
        changed
    }

    fn content_frame_changed(
        &self,
        id: LayerId,
        old_stretched: Frame,
        new_stretched: Frame,
        old_frame: Frame,
        new_frame: Frame,
    ) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        let duration = self.stretched_frame_duration(id);
        let visible = |frame: Frame| frame >= 0 && frame < duration;
        if visible(old_stretched) != visible(new_stretched) {
            return true;
        }
        if !visible(new_stretched) {
            return false;
        }
        node.cache.varies_between(old_frame, new_frame)
    }

    pub(crate) fn goto_time_and_notify_changed(&mut self, id: LayerId, time: i64) -> bool {
        let changed = self.goto_time(id, time);
        if changed {
            self.notify_modified(id, false);
        }
        changed
    }

    /// Time of the layer's owner at which this layer currently sits.
    fn owner_time(&self, id: LayerId) -> i64 {
        self.node(id).map_or(0, |node| {
            frame_to_time(node.start_frame + node.content_frame, self.frame_rate(id))
        })
    }

    /// Time handed to children of the composition `id` for its current frame.
    fn child_time(&self, id: LayerId) -> i64 {
        let Some(node) = self.node(id) else {
            return 0;
        };
        let rate = self.frame_rate(id);
        if node.stretch().is_some() {
            frame_to_time(self.mapped_content_frame(id), rate)
        } else {
            self.owner_time(id) - frame_to_time(node.start_frame, rate)
        }
    }

    pub(crate) fn start_time_us(&self, id: LayerId) -> i64 {
        self.node(id)
            .map_or(0, |node| frame_to_time(node.start_frame, self.frame_rate(id)))
    }

    pub(crate) fn set_start_time(&mut self, id: LayerId, time: i64) {
        let rate = self.frame_rate(id);
        let target = time_to_frame(time, rate);
        let Some(node) = self.node_mut(id) else {
            return;
        };
        if node.start_frame == target {
            return;
        }
        let layer_frame = node.start_frame + node.content_frame;
        node.start_frame = target;
        self.goto_time_and_notify_changed(id, frame_to_time(layer_frame, rate));
        self.notify_audio_modified(id);
    }

    pub(crate) fn duration_us(&self, id: LayerId) -> i64 {
        frame_to_time(self.stretched_frame_duration(id), self.frame_rate(id))
    }

    pub(crate) fn current_time(&self, id: LayerId) -> i64 {
        self.owner_time(id)
    }

    pub(crate) fn progress(&self, id: LayerId) -> f64 {
        self.node(id).map_or(0.0, |node| {
            crate::time::frame_to_progress(node.content_frame, self.stretched_frame_duration(id))
        })
    }

    pub(crate) fn set_progress(&mut self, id: LayerId, progress: f64) -> bool {
        let time =
            self.start_time_us(id) + crate::time::progress_to_time(progress, self.duration_us(id));
        self.goto_time_and_notify_changed(id, time)
    }

    pub(crate) fn step_frame(&mut self, id: LayerId, forward: bool) {
        let total = self.stretched_frame_duration(id);
        if total <= 1 {
            return;
        }
        let Some(node) = self.node(id) else {
            return;
        };
        let mut target = node.content_frame + if forward { 1 } else { -1 };
        if target >= total {
            target = 0;
        } else if target < 0 {
            target = total - 1;
        }
        let time = frame_to_time(node.start_frame + target, self.frame_rate(id));
        self.goto_time_and_notify_changed(id, time);
    }

    /// Stretches a file-backed composition to `duration` microseconds.
    pub(crate) fn set_duration(&mut self, id: LayerId, duration: i64) -> bool {
        let rate = self.frame_rate(id);
        let time = self.owner_time(id);
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        if node.file.is_none() {
            return false;
        }
        let natural = node.duration;
        let Some(composition) = node.composition_mut() else {
            return false;
        };
        let target = time_to_frame(duration, rate);
        composition.stretched_duration = if target <= 0 || target == natural {
            None
        } else {
            Some(target)
        };
        debug!(layer = %id, natural, stretched = target, "composition duration set");
        self.goto_time(id, time);
        self.notify_modified(id, true);
        self.notify_audio_modified(id);
        true
    }

    pub(crate) fn set_time_stretch_mode(&mut self, id: LayerId, mode: TimeStretchMode) {
        let time = self.owner_time(id);
        if let Some(composition) = self.node_mut(id).and_then(LayerNode::composition_mut) {
            if composition.time_stretch_mode == mode {
                return;
            }
            composition.time_stretch_mode = mode;
            self.goto_time(id, time);
            self.notify_modified(id, true);
        }
    }

    // ---- owners and frame mapping ----------------------------------------------

    pub(crate) fn parent_or_owner(&self, id: LayerId) -> Option<LayerId> {
        let node = self.node(id)?;
        node.parent.or(node.track_matte_owner)
    }

    pub(crate) fn timeline_owner(&self, id: LayerId) -> Option<LayerId> {
        let node = self.node(id)?;
        node.parent
            .or_else(|| node.track_matte_owner.and_then(|owner| self.node(owner)?.parent))
    }

    fn timeline_root(&self, id: LayerId) -> LayerId {
        let mut root = id;
        while let Some(owner) = self.timeline_owner(root) {
            root = owner;
        }
        root
    }

    pub(crate) fn child_frame_to_local(&self, owner: LayerId, child_frame: Frame, child_rate: f32) -> Frame {
        let Some(node) = self.node(owner) else {
            return child_frame;
        };
        let scale = self.frame_rate(owner) as f64 / child_rate as f64;
        let frame = (child_frame as f64 * scale).round() as Frame;
        self.content_to_stretched(owner, frame) + node.start_frame
    }

    pub(crate) fn local_frame_to_child(&self, owner: LayerId, local_frame: Frame, child_rate: f32) -> Frame {
        let Some(node) = self.node(owner) else {
            return local_frame;
        };
        let scale = child_rate as f64 / self.frame_rate(owner) as f64;
        let frame = self.stretched_to_content(owner, local_frame - node.start_frame);
        (frame as f64 * scale).round() as Frame
    }

    pub(crate) fn local_frame_to_global(&self, id: LayerId, local_frame: Frame) -> Frame {
        let mut frame = local_frame;
        let mut child_rate = self.frame_rate(id);
        let mut owner = self.timeline_owner(id);
        while let Some(current) = owner {
            frame = self.child_frame_to_local(current, frame, child_rate);
            child_rate = self.frame_rate(current);
            owner = self.timeline_owner(current);
        }
        frame
    }

    pub(crate) fn global_to_local_frame(&self, id: LayerId, global_frame: Frame) -> Frame {
        let mut chain = Vec::new();
        let mut owner = self.timeline_owner(id);
        while let Some(current) = owner {
            chain.push(current);
            owner = self.timeline_owner(current);
        }
        let mut frame = global_frame;
        for i in (0..chain.len()).rev() {
            let child_rate = if i > 0 {
                self.frame_rate(chain[i - 1])
            } else {
                self.frame_rate(id)
            };
            frame = self.local_frame_to_child(chain[i], frame, child_rate);
        }
        frame
    }

    pub(crate) fn local_time_to_global(&self, id: LayerId, local_time: i64) -> i64 {
        let local_frame = time_to_frame(local_time, self.frame_rate(id));
        let global_frame = self.local_frame_to_global(id, local_frame);
        frame_to_time(global_frame, self.frame_rate(self.timeline_root(id)))
    }

    pub(crate) fn global_to_local_time(&self, id: LayerId, global_time: i64) -> i64 {
        let global_frame = time_to_frame(global_time, self.frame_rate(self.timeline_root(id)));
        let local_frame = self.global_to_local_frame(id, global_frame);
        frame_to_time(local_frame, self.frame_rate(id))
    }

    // ---- versions ---------------------------------------------------------

    pub(crate) fn notify_modified(&mut self, id: LayerId, content_changed: bool) {
        if content_changed {
            if let Some(node) = self.node_mut(id) {
                node.content_version += 1;
            }
        }
        let mut cursor = self.parent_or_owner(id);
        while let Some(current) = cursor {
            if let Some(node) = self.node_mut(current) {
                node.content_version += 1;
            }
            cursor = self.parent_or_owner(current);
        }
    }

    pub(crate) fn notify_audio_modified(&mut self, id: LayerId) {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if let Some(node) = self.node_mut(current) {
                node.audio_version += 1;
            }
            cursor = self.parent_or_owner(current);
        }
    }

    // ---- rendering surface -----------------------------------------------------

    pub(crate) fn set_transform_2d(&mut self, id: LayerId, transform: Transform2D) {
        if let Some(node) = self.node_mut(id) {
            node.transform = Some(transform);
            self.rebuild_cache(id);
            self.notify_modified(id, true);
            self.invalidate_cache_scale(id);
        }
    }

    /// Recomputes where the layer's output varies after its properties changed.
    pub(crate) fn rebuild_cache(&mut self, id: LayerId) {
        let Some(node) = self.node(id) else {
            return;
        };
        let offset = -node.start_time;
        let mut ranges: Vec<FrameRange> = node
            .transform
            .as_ref()
            .map(TransformExt::varying_ranges)
            .unwrap_or_default();
        let always_varying = match &node.kind {
            LayerKind::Content(Some(content)) => {
                ranges.extend(content.varying_ranges().into_iter().map(|r| r.offset(node.start_time)));
                false
            }
            LayerKind::Text(text) => {
                ranges.extend(animator_varying_ranges(&text.animators));
                text.glyph_provider.is_some()
            }
            _ => false,
        };
        let cache = if always_varying {
            LayerCache::always_varying()
        } else {
            LayerCache::new(ranges.into_iter().map(|r| r.offset(offset)).collect())
        };
        if let Some(node) = self.node_mut(id) {
            node.cache = cache;
        }
    }

    pub(crate) fn resolved_transform(&self, id: LayerId) -> Option<ResolvedTransform> {
        let node = self.node(id)?;
        if !self.frame_visible(id) || node.matrix.determinant() == 0.0 || node.alpha == 0.0 {
            return None;
        }
        let frame = self.layer_frame(id);
        let (matrix, alpha) = node
            .transform
            .as_ref()
            .map_or((Mat3::IDENTITY, 1.0), |t| (t.matrix_at(frame), t.alpha_at(frame)));
        if alpha <= 0.0 {
            return None;
        }
        Some(ResolvedTransform {
            matrix: node.matrix * matrix,
            alpha: alpha * node.alpha,
        })
    }

    pub(crate) fn total_matrix(&self, id: LayerId) -> Mat3 {
        let Some(node) = self.node(id) else {
            return Mat3::IDENTITY;
        };
        let frame = self.layer_frame(id);
        let matrix = node
            .transform
            .as_ref()
            .map_or(Mat3::IDENTITY, |t| t.matrix_at(frame));
        node.matrix * matrix
    }

    pub(crate) fn measure_bounds(&self, id: LayerId) -> Rect {
        let Some(node) = self.node(id) else {
            return Rect::ZERO;
        };
        match &node.kind {
            LayerKind::Content(Some(content)) => content.measure_bounds(self.mapped_content_frame(id)),
            LayerKind::Content(None) => Rect::ZERO,
            LayerKind::Text(text) => text.layout.get_lines(text.document()).bounds,
            LayerKind::Composition(composition) => {
                let mut bounds: Option<Rect> = None;
                for child in &composition.children {
                    if !self.node(*child).is_some_and(|c| c.visible) {
                        continue;
                    }
                    let Some(transform) = self.resolved_transform(*child) else {
                        continue;
                    };
                    let child_bounds = map_rect(transform.matrix, self.measure_bounds(*child));
                    bounds = Some(bounds.map_or(child_bounds, |b| b.union(child_bounds)));
                }
                bounds.unwrap_or(Rect::ZERO)
            }
        }
    }

    pub(crate) fn invalidate_cache_scale(&mut self, id: LayerId) {
        let on_stage = self.node(id).is_some_and(|node| node.on_stage);
        if let (true, Some(stage)) = (on_stage, self.stage.as_mut()) {
            stage.invalidate_cache_scale(id);
        }
    }

    // ---- tree structure --------------------------------------------------------

    /// The layer, its matte subtree and, for compositions, every descendant.
    pub(crate) fn subtree_ids(&self, id: LayerId) -> Vec<LayerId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.node(current) else {
                continue;
            };
            out.push(current);
            if let Some(matte) = node.track_matte {
                stack.push(matte);
            }
            if let Some(composition) = node.composition() {
                stack.extend(composition.children.iter().rev());
            }
        }
        out
    }

    /// True if `candidate` is `id` or reachable from it through parents and matte owners.
    pub(crate) fn is_self_or_ancestor(&self, candidate: LayerId, id: LayerId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == candidate {
                return true;
            }
            cursor = self.parent_or_owner(current);
        }
        false
    }

    /// Cuts the parent and matte-owner links of `id`.
    pub(crate) fn unlink(&mut self, id: LayerId) {
        let Some(node) = self.node_mut(id) else {
            return;
        };
        let parent = node.parent.take();
        let owner = node.track_matte_owner.take();
        if let Some(parent) = parent {
            if let Some(composition) = self.node_mut(parent).and_then(LayerNode::composition_mut) {
                composition.children.retain(|child| *child != id);
            }
            self.notify_modified(parent, true);
            self.notify_audio_modified(parent);
        }
        if let Some(owner) = owner {
            if let Some(node) = self.node_mut(owner) {
                node.track_matte = None;
            }
            self.notify_modified(owner, true);
        }
    }

    /// Moves `id` and its subtree out into an arena of their own.
    pub(crate) fn detach(&mut self, id: LayerId) -> Option<LayerArena> {
        if !self.contains(id) {
            return None;
        }
        self.unlink(id);
        let mut detached = LayerArena::default();
        for member in self.subtree_ids(id) {
            let Some(mut node) = self.nodes.remove(&member) else {
                continue;
            };
            if node.on_stage {
                if let Some(stage) = self.stage.as_mut() {
                    stage.remove_reference(member);
                }
                node.on_stage = false;
            }
            detached.nodes.insert(member, node);
            if let Some(slot) = self.slots.remove(&member) {
                detached.slots.insert(member, slot);
            }
            if let Some(anchor) = self.anchors.remove(&member) {
                detached.anchors.insert(member, anchor);
            }
        }
        debug!(layer = %id, moved = detached.len(), "layer detached from tree");
        Some(detached)
    }

    /// Merges a detached arena into `tree`, whose lock the caller holds.
    ///
    /// Fails without changes on id collisions.
    pub(crate) fn absorb(&mut self, mut other: LayerArena, tree: &SharedTree) -> Result<(), LayerArena> {
        if other.nodes.keys().any(|id| self.nodes.contains_key(id)) {
            return Err(other);
        }
        other.retarget_slots(tree);
        let ids: Vec<LayerId> = other.nodes.keys().copied().collect();
        self.nodes.extend(other.nodes);
        self.slots.extend(other.slots);
        self.anchors.extend(other.anchors);
        self.register_on_stage(&ids);
        Ok(())
    }

    fn register_on_stage(&mut self, ids: &[LayerId]) {
        let Some(stage) = self.stage.as_mut() else {
            return;
        };
        for id in ids {
            if let Some(node) = self.nodes.get_mut(id) {
                if !node.on_stage {
                    stage.add_reference(*id);
                    node.on_stage = true;
                }
            }
        }
    }

    /// Makes this tree displayable, registering every layer it holds.
    pub(crate) fn install_stage(&mut self) {
        if self.stage.is_some() {
            return;
        }
        self.stage = Some(Stage::new());
        let ids: Vec<LayerId> = self.nodes.keys().copied().collect();
        self.register_on_stage(&ids);
    }

    pub(crate) fn insert_child(&mut self, parent: LayerId, index: usize, child: LayerId) -> bool {
        let Some(composition) = self.node_mut(parent).and_then(LayerNode::composition_mut) else {
            return false;
        };
        let index = index.min(composition.children.len());
        composition.children.insert(index, child);
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        let time = self.child_time(parent);
        self.goto_time(child, time);
        self.notify_modified(parent, true);
        self.notify_audio_modified(parent);
        true
    }

    pub(crate) fn attach_matte(&mut self, owner: LayerId, matte: LayerId) {
        if let Some(node) = self.node_mut(owner) {
            node.track_matte = Some(matte);
        }
        if let Some(node) = self.node_mut(matte) {
            node.track_matte_owner = Some(owner);
        }
        let time = self.owner_time(owner);
        self.goto_time(matte, time);
        self.notify_modified(owner, true);
    }

    /// Layers named `name` beneath the composition `id`, in depth-first order.
    pub(crate) fn find_by_name(&self, id: LayerId, name: &str) -> Vec<LayerId> {
        self.subtree_ids(id)
            .into_iter()
            .filter(|member| *member != id)
            .filter(|member| self.node(*member).is_some_and(|node| node.name == name))
            .collect()
    }
}
