//! Finalization queue backing identity-map cleanup.
//!
//! Every entity constructed by an [`IdentityMap`](crate::IdentityMap) owns a
//! [`Finalizer`]. When the last strong reference to the entity is dropped,
//! the finalizer pushes `(key, generation)` onto the registry's queue. The
//! map drains that queue during a sweep and removes a slot only if the slot
//! still carries the same generation and its weak reference is dead, so a
//! replacement installed in the meantime is never evicted.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use plume_shared::EntityKey;

/// A finalized entity awaiting slot cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finalized {
    pub key: EntityKey,
    pub generation: u64,
}

#[derive(Clone, Default)]
pub struct FinalizationRegistry {
    queue: Rc<RefCell<Vec<Finalized>>>,
}

impl FinalizationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate a new finalizer with the entity installed under `key`.
    pub fn register(&self, key: EntityKey, generation: u64) -> Finalizer {
        Finalizer {
            target: Some(Finalized { key, generation }),
            queue: Rc::downgrade(&self.queue),
        }
    }

    /// Take every queued entry.
    pub fn drain(&self) -> Vec<Finalized> {
        std::mem::take(&mut *self.queue.borrow_mut())
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

impl fmt::Debug for FinalizationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinalizationRegistry")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Drop hook owned by a cached entity.
pub struct Finalizer {
    target: Option<Finalized>,
    queue: Weak<RefCell<Vec<Finalized>>>,
}

impl Finalizer {
    pub fn key(&self) -> Option<&EntityKey> {
        self.target.as_ref().map(|t| &t.key)
    }
}

impl Drop for Finalizer {
    fn drop(&mut self) {
        let (Some(target), Some(queue)) = (self.target.take(), self.queue.upgrade()) else {
            return;
        };

        // A failed borrow means a drain is in progress; the slot then stays
        // until its key is merged again, which replaces it.
        if let Ok(mut pending) = queue.try_borrow_mut() {
            pending.push(target);
        };
    }
}

impl fmt::Debug for Finalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Finalizer")
            .field("target", &self.target)
            .finish()
    }
}
