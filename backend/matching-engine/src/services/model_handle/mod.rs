// ============================================
// Model Handle
// ============================================
// Copy-on-write slot for a trained model. Readers clone the `Arc` under a short
// read lock and compute without holding it; training builds the replacement
// outside the lock and swaps the pointer under a short write lock.

use parking_lot::RwLock;
use std::sync::Arc;

pub struct ModelHandle<M> {
    slot: Arc<RwLock<Option<Arc<M>>>>,
}

impl<M> Clone for ModelHandle<M> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<M> Default for ModelHandle<M> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<M> ModelHandle<M> {
    pub fn empty() -> Self {
        Self {
            slot: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_model(model: M) -> Self {
        Self {
            slot: Arc::new(RwLock::new(Some(Arc::new(model)))),
        }
    }

    /// Snapshot of the current model, if any.
    pub fn load(&self) -> Option<Arc<M>> {
        self.slot.read().clone()
    }

    /// Install a fully built model, returning the one it replaced.
    pub fn store(&self, model: M) -> Option<Arc<M>> {
        let model = Arc::new(model);
        let mut slot = self.slot.write();
        slot.replace(model)
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.read().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_then_store() {
        let handle: ModelHandle<u32> = ModelHandle::empty();
        assert!(!handle.is_loaded());
        assert!(handle.load().is_none());

        assert!(handle.store(7).is_none());
        assert_eq!(handle.load().as_deref(), Some(&7));
    }

    #[test]
    fn test_snapshot_survives_swap() {
        let handle = ModelHandle::with_model(String::from("v1"));
        let snapshot = handle.load().unwrap();

        let previous = handle.store(String::from("v2")).unwrap();
        assert_eq!(previous.as_str(), "v1");
        assert_eq!(snapshot.as_str(), "v1");
        assert_eq!(handle.load().unwrap().as_str(), "v2");
    }

    #[test]
    fn test_clones_share_slot() {
        let handle: ModelHandle<u8> = ModelHandle::empty();
        let other = handle.clone();
        other.store(1);
        assert!(handle.is_loaded());
    }
}
