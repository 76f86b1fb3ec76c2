//! In-progress registry
//!
//! At most one organization runs per result id. Acquiring returns a guard;
//! dropping the guard releases the id, whichever way the attempt ends.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

#[derive(Debug, Clone, Default)]
pub struct InProgressRegistry {
    ids: Arc<Mutex<HashSet<String>>>,
}

impl InProgressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `id` if absent. `None` means someone else is processing it.
    pub fn try_acquire(&self, id: &str) -> Option<InProgressGuard> {
        if self.ids.lock().insert(id.to_string()) {
            Some(InProgressGuard {
                registry: self.clone(),
                id: id.to_string(),
            })
        } else {
            None
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.lock().contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
pub struct InProgressGuard {
    registry: InProgressRegistry,
    id: String,
}

impl Drop for InProgressGuard {
    fn drop(&mut self) {
        self.registry.ids.lock().remove(&self.id);
    }
}
