use crate::text_layout::{GraphemeLayout, TextLayout};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Identity of a layer, unique within the [`Session`] that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(u32);

impl LayerId {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issues layer ids and carries collaborators shared by every layer it creates.
///
/// Layers that end up in one tree must come from the same session.
pub struct Session {
    next_id: AtomicU32,
    text_layout: Arc<dyn TextLayout>,
}

impl Session {
    pub fn new() -> Self {
        Self::with_text_layout(Arc::new(GraphemeLayout))
    }

    pub fn with_text_layout(text_layout: Arc<dyn TextLayout>) -> Self {
        Self {
            next_id: AtomicU32::new(1),
            text_layout,
        }
    }

    pub fn next_layer_id(&self) -> LayerId {
        LayerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn text_layout(&self) -> Arc<dyn TextLayout> {
        Arc::clone(&self.text_layout)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
