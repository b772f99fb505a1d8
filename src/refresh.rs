//! Layout re-measure collaborator
//!
//! New section markup can change scrollable geometry, so the controller asks
//! the scroll-animation layer to re-measure after every load.

use std::cell::Cell;
use std::rc::Rc;

pub trait LayoutRefresh {
    /// Recompute element offsets and animation triggers from scratch
    fn refresh_hard(&mut self);
}

/// Refresh that does nothing; used when no scroll-animation layer is present
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRefresh;

impl LayoutRefresh for NoopRefresh {
    fn refresh_hard(&mut self) {}
}

/// Refresh that only counts calls; clones share the count
#[derive(Debug, Default, Clone)]
pub struct RefreshCounter {
    calls: Rc<Cell<usize>>,
}

impl RefreshCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.calls.get()
    }
}

impl LayoutRefresh for RefreshCounter {
    fn refresh_hard(&mut self) {
        self.calls.set(self.calls.get() + 1);
    }
}
