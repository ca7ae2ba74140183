use std::sync::{Arc, PoisonError, RwLock};

use crate::model::PanelSnapshot;

/// Sole owner of the current panel snapshot. `replace` swaps the whole
/// value at once, so a reader on another thread either sees the old
/// snapshot or the new one, never a mix.
#[derive(Debug)]
pub struct StateCache {
    current: RwLock<Arc<PanelSnapshot>>,
}

impl StateCache {
    pub fn new(initial: PanelSnapshot) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    pub fn snapshot(&self) -> Arc<PanelSnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, next: PanelSnapshot) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
    }
}
