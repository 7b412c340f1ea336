use crate::time::FrameRange;
use motion_data::Frame;

/// Frame spans where a layer's rendered output varies, in content frames.
#[derive(Debug, Clone, Default)]
pub(crate) struct LayerCache {
    varying: Vec<FrameRange>,
    always_varying: bool,
}

impl LayerCache {
    pub(crate) fn new(varying: Vec<FrameRange>) -> Self {
        Self {
            varying,
            always_varying: false,
        }
    }

    /// Output driven by something outside the keyframes, such as a glyph callback.
    pub(crate) fn always_varying() -> Self {
        Self {
            varying: Vec::new(),
            always_varying: true,
        }
    }

    pub(crate) fn varies_between(&self, old: Frame, new: Frame) -> bool {
        if old == new {
            return false;
        }
        self.always_varying || self.varying.iter().any(|range| range.touches(old, new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_layer_never_varies() {
        assert!(!LayerCache::default().varies_between(3, 9));
    }

    #[test]
    fn varying_span_is_detected() {
        let cache = LayerCache::new(vec![FrameRange::new(5, 10)]);
        assert!(cache.varies_between(0, 6));
        assert!(cache.varies_between(12, 9));
        assert!(!cache.varies_between(11, 15));
        assert!(!cache.varies_between(6, 6));
        assert!(LayerCache::always_varying().varies_between(1, 2));
    }
}
