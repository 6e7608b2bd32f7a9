//! Runtime → UI notifications.
//!
//! Turns and archive edits run in spawned futures; the UI learns what
//! happened by draining this queue once per frame. Single-threaded.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use archive_types::event::ArchiveEvent;

/// Queue handle shared by the runtime and the UI.
#[derive(Clone)]
pub struct EventBus {
    inner: Rc<RefCell<VecDeque<ArchiveEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(VecDeque::new())),
        }
    }

    pub fn emit(&self, event: ArchiveEvent) {
        self.inner.borrow_mut().push_back(event);
    }

    /// Everything emitted since the last drain, oldest first
    pub fn drain(&self) -> Vec<ArchiveEvent> {
        self.inner.borrow_mut().drain(..).collect()
    }

    pub fn has_pending(&self) -> bool {
        !self.inner.borrow().is_empty()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
