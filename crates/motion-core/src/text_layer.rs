use crate::arena::{LayerKind, LayerNode};
use crate::content::LayerType;
use crate::glyph::{GlyphOffsetAlphaProvider, GlyphOffsets};
use crate::layer::Layer;
use crate::session::Session;
use crate::text_animator::{resolve_glyph_styles, GlyphStyle};
use crate::text_layout::{Glyph, TextLayout, TextLines};
use crate::time::{frame_to_time, time_to_frame, DEFAULT_FRAME_RATE};
use glam::Vec2;
use motion_data::{Color, Frame, TextAnimator, TextDocument, TextMoreOptions, Transform2D};
use std::ops::Deref;
use std::sync::Arc;

pub(crate) struct TextState {
    pub source: TextDocument,
    /// Host edits layered over the source document; `reset` drops them.
    pub replacement: Option<TextDocument>,
    pub animators: Vec<TextAnimator>,
    pub more_options: Option<TextMoreOptions>,
    pub glyph_provider: Option<Arc<dyn GlyphOffsetAlphaProvider>>,
    pub layout: Arc<dyn TextLayout>,
}

impl TextState {
    pub(crate) fn new(source: TextDocument, layout: Arc<dyn TextLayout>) -> Self {
        Self {
            source,
            replacement: None,
            animators: Vec::new(),
            more_options: None,
            glyph_provider: None,
            layout,
        }
    }

    pub(crate) fn document(&self) -> &TextDocument {
        self.replacement.as_ref().unwrap_or(&self.source)
    }

    fn document_mut(&mut self) -> &mut TextDocument {
        self.replacement.get_or_insert_with(|| self.source.clone())
    }

    pub(crate) fn lines(&self) -> TextLines {
        self.layout.get_lines(self.document())
    }
}

/// Handle to a text layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextLayer {
    layer: Layer,
}

impl Deref for TextLayer {
    type Target = Layer;

    fn deref(&self) -> &Layer {
        &self.layer
    }
}

impl TextLayer {
    /// Creates a text layer with one line of `text`. Returns `None` for a non-positive duration.
    pub fn make(
        session: &Session,
        duration_us: i64,
        text: &str,
        font_size: f32,
        font_family: &str,
        font_style: &str,
    ) -> Option<TextLayer> {
        if duration_us <= 0 {
            return None;
        }
        let document = TextDocument {
            text: text.to_owned(),
            font_size,
            font_family: font_family.to_owned(),
            font_style: font_style.to_owned(),
            ..TextDocument::default()
        };
        let duration = time_to_frame(duration_us, DEFAULT_FRAME_RATE);
        let transform = Transform2D::with_position(Vec2::new(0.0, font_size));
        Some(TextLayer::make_node(session, duration, document, Vec::new(), None, transform))
    }

    pub(crate) fn make_node(
        session: &Session,
        duration: Frame,
        document: TextDocument,
        animators: Vec<TextAnimator>,
        more_options: Option<TextMoreOptions>,
        transform: Transform2D,
    ) -> TextLayer {
        let mut state = TextState::new(document, session.text_layout());
        state.animators = animators;
        state.more_options = more_options;
        let mut node = LayerNode::new(session.next_layer_id(), LayerType::Text, duration, LayerKind::Text(state));
        node.transform = Some(transform);
        TextLayer::from_layer(Layer::from_node(node))
    }

    pub(crate) fn from_layer(layer: Layer) -> TextLayer {
        TextLayer { layer }
    }

    pub fn layer(&self) -> &Layer {
        &self.layer
    }

    fn read<R: Default>(&self, f: impl FnOnce(&TextState) -> R) -> R {
        self.with_tree(|arena, id, _| arena.node(id).and_then(LayerNode::text).map(f))
            .flatten()
            .unwrap_or_default()
    }

    /// Edits the text state, then rebuilds the layer cache and reports a content change.
    pub(crate) fn edit<R>(&self, f: impl FnOnce(&mut LayerNode) -> R) -> Option<R> {
        self.with_tree(|arena, id, _| {
            let node = arena.node_mut(id).filter(|node| node.text().is_some())?;
            let result = f(node);
            arena.rebuild_cache(id);
            arena.notify_modified(id, true);
            Some(result)
        })
        .flatten()
    }

    fn edit_document(&self, f: impl FnOnce(&mut TextDocument)) {
        self.edit(|node| {
            if let Some(text) = node.text_mut() {
                f(text.document_mut());
            }
        });
    }

    pub fn text(&self) -> String {
        self.read(|state| state.document().text.clone())
    }

    pub fn set_text(&self, text: &str) {
        self.edit_document(|document| document.text = text.to_owned());
    }

    pub fn font_size(&self) -> f32 {
        self.read(|state| state.document().font_size)
    }

    pub fn set_font_size(&self, font_size: f32) {
        self.edit_document(|document| document.font_size = font_size);
    }

    pub fn fill_color(&self) -> Color {
        self.read(|state| state.document().fill_color)
    }

    pub fn set_fill_color(&self, color: Color) {
        self.edit_document(|document| document.fill_color = color);
    }

    pub fn stroke_color(&self) -> Color {
        self.read(|state| state.document().stroke_color)
    }

    pub fn set_stroke_color(&self, color: Color) {
        self.edit_document(|document| document.stroke_color = color);
    }

    /// Font family and style.
    pub fn font(&self) -> (String, String) {
        self.read(|state| {
            let document = state.document();
            (document.font_family.clone(), document.font_style.clone())
        })
    }

    pub fn set_font(&self, family: &str, style: &str) {
        self.edit_document(|document| {
            document.font_family = family.to_owned();
            document.font_style = style.to_owned();
        });
    }

    /// Copy of the document currently displayed.
    pub fn text_document(&self) -> TextDocument {
        self.read(|state| state.document().clone())
    }

    /// Applies the host-editable fields of `document`; layout-box data stays as loaded.
    pub fn set_text_document(&self, document: &TextDocument) {
        self.edit_document(|current| current.apply_editable_fields(document));
    }

    /// Drops every host edit and shows the source document again.
    pub fn reset(&self) {
        self.edit(|node| {
            if let Some(text) = node.text_mut() {
                text.replacement = None;
            }
        });
    }

    pub fn glyphs(&self) -> Vec<Glyph> {
        self.lines().glyphs().cloned().collect()
    }

    pub fn lines(&self) -> TextLines {
        self.read(TextState::lines)
    }

    pub fn animators(&self) -> Vec<TextAnimator> {
        self.read(|state| state.animators.clone())
    }

    pub fn more_options(&self) -> Option<TextMoreOptions> {
        self.read(|state| state.more_options.clone())
    }

    /// Style of every glyph at the current frame after text animators are applied.
    pub fn glyph_styles(&self) -> Vec<GlyphStyle> {
        self.with_tree(|arena, id, _| {
            let frame = arena.layer_frame(id);
            let text = arena.node(id)?.text()?;
            Some(resolve_glyph_styles(&text.animators, &text.lines(), frame))
        })
        .flatten()
        .unwrap_or_default()
    }

    pub fn set_glyph_transform_provider(&self, provider: Arc<dyn GlyphOffsetAlphaProvider>) {
        self.edit(|node| {
            if let Some(text) = node.text_mut() {
                text.glyph_provider = Some(provider);
            }
        });
    }

    pub fn clear_glyph_transform(&self) {
        self.edit(|node| {
            if let Some(text) = node.text_mut() {
                text.glyph_provider = None;
            }
        });
    }

    /// Clears the provider only if it is still `provider`.
    pub(crate) fn clear_glyph_transform_if(&self, provider: &Arc<dyn GlyphOffsetAlphaProvider>) {
        self.edit(|node| {
            if let Some(text) = node.text_mut() {
                let installed = text
                    .glyph_provider
                    .as_ref()
                    .is_some_and(|current| std::ptr::addr_eq(Arc::as_ptr(current), Arc::as_ptr(provider)));
                if installed {
                    text.glyph_provider = None;
                }
            }
        });
    }

    pub fn has_glyph_transform_provider(&self) -> bool {
        self.read(|state| state.glyph_provider.is_some())
    }

    /// Runs the installed provider at the layer's local content time.
    ///
    /// The provider is called after the tree lock is released, so it may query the layer.
    pub fn glyph_offsets(&self) -> Option<GlyphOffsets> {
        let (provider, time, count) = self
            .with_tree(|arena, id, _| {
                let time = frame_to_time(arena.mapped_content_frame(id), arena.frame_rate(id));
                let text = arena.node(id)?.text()?;
                let provider = Arc::clone(text.glyph_provider.as_ref()?);
                Some((provider, time, text.lines().glyph_count()))
            })
            .flatten()?;
        GlyphOffsets::compute(provider.as_ref(), time, count)
    }
}
