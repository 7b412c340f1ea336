use crate::session::LayerId;
use std::collections::{BTreeSet, HashMap};

/// Registry of the layers attached to a displayed tree.
#[derive(Debug, Default)]
pub struct Stage {
    references: HashMap<LayerId, usize>,
    invalid_cache_scales: BTreeSet<LayerId>,
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_reference(&mut self, id: LayerId) {
        *self.references.entry(id).or_insert(0) += 1;
    }

    pub(crate) fn remove_reference(&mut self, id: LayerId) {
        if let Some(count) = self.references.get_mut(&id) {
            *count -= 1;
            if *count == 0 {
                self.references.remove(&id);
                self.invalid_cache_scales.remove(&id);
            }
        }
    }

    pub fn reference_count(&self, id: LayerId) -> usize {
        self.references.get(&id).copied().unwrap_or(0)
    }

    pub fn layer_count(&self) -> usize {
        self.references.len()
    }

    pub(crate) fn invalidate_cache_scale(&mut self, id: LayerId) {
        if self.references.contains_key(&id) {
            self.invalid_cache_scales.insert(id);
        }
    }

    /// Layers whose rasterization scale must be recomputed, oldest id first.
    pub fn take_invalid_cache_scales(&mut self) -> Vec<LayerId> {
        std::mem::take(&mut self.invalid_cache_scales).into_iter().collect()
    }
}
