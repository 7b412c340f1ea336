//! Runtime core of a layered vector-animation player.
//!
//! ## Layout
//! - [`animatable`]: keyframe evaluation for [`motion_data::Property`].
//! - [`Layer`], [`Composition`], [`TextLayer`]: handles onto layer trees with
//!   nested timelines, version counters and track mattes.
//! - [`presets`] and [`glyph`]: procedural text motion and per-glyph offsets.
//! - [`scene`]: building trees from JSON scene descriptions.

pub mod animatable;
mod arena;
mod cache;
pub mod composition;
pub mod content;
pub mod glyph;
pub mod layer;
pub mod lock;
pub mod presets;
pub mod scene;
pub mod session;
pub mod stage;
pub mod text_animator;
pub mod text_layer;
pub mod text_layout;
pub mod time;
pub mod transform;

pub use animatable::{replace_with_animatable, Evaluate, Interpolatable};
pub use composition::Composition;
pub use content::{LayerContent, LayerType, SolidContent};
pub use glyph::{FnGlyphProvider, GlyphOffset, GlyphOffsetAlphaProvider, GlyphOffsets, SlideLeftGlyphProvider};
pub use layer::{Layer, WeakLayer};
pub use presets::{SlideLeftPreset, TextMotionPreset};
pub use scene::{build_scene, load_scene_str, SceneError};
pub use session::{LayerId, Session};
pub use text_animator::GlyphStyle;
pub use text_layer::TextLayer;
pub use text_layout::{Glyph, GraphemeLayout, TextLayout, TextLines};
pub use transform::{ResolvedTransform, TransformExt};
