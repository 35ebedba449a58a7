//! Weak-reference keyed store guaranteeing one live entity per key.
//!
//! The map never owns its entities: callers (in practice, the UI and the
//! cached query results) hold the `Rc`s, the map only keeps a `Weak` for
//! lookup. Dead slots are reclaimed by [`IdentityMap::sweep`], which runs
//! automatically every `sweep_interval` merges.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use plume_shared::EntityKey;

use crate::gc::{FinalizationRegistry, Finalizer};

/// The entity categories cached by Plume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Profile,
    Post,
    List,
    Conversation,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Profile => "profile",
            Self::Post => "post",
            Self::List => "list",
            Self::Conversation => "conversation",
        };
        f.write_str(name)
    }
}

/// Marker identifying one logical server response.
///
/// Tags are minted by [`EntityCache::next_version_tag`](crate::EntityCache::next_version_tag)
/// and are unique per cache instance, so two different responses can never
/// share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionTag(pub(crate) u64);

impl VersionTag {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Bookkeeping carried by every cached entity.
pub struct Tracking {
    version: Cell<Option<VersionTag>>,
    finalizer: Finalizer,
}

impl Tracking {
    pub fn version(&self) -> Option<VersionTag> {
        self.version.get()
    }

    pub fn key(&self) -> Option<&EntityKey> {
        self.finalizer.key()
    }
}

impl fmt::Debug for Tracking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracking")
            .field("version", &self.version.get())
            .field("finalizer", &self.finalizer)
            .finish()
    }
}

pub trait Tracked {
    fn tracking(&self) -> &Tracking;
}

struct Slot<E> {
    generation: u64,
    entity: Weak<E>,
}

pub struct IdentityMap<E> {
    kind: EntityKind,
    slots: RefCell<HashMap<EntityKey, Slot<E>>>,
    registry: FinalizationRegistry,
    next_generation: Cell<u64>,
    sweep_interval: u32,
    merges_since_sweep: Cell<u32>,
}

impl<E: Tracked> IdentityMap<E> {
    /// Create an empty map. `sweep_interval == 0` disables automatic sweeps.
    pub fn new(kind: EntityKind, sweep_interval: u32) -> Self {
        Self {
            kind,
            slots: RefCell::new(HashMap::new()),
            registry: FinalizationRegistry::new(),
            next_generation: Cell::new(0),
            sweep_interval,
            merges_since_sweep: Cell::new(0),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Return the live entity for `key`, if any.
    pub fn get(&self, key: &EntityKey) -> Option<Rc<E>> {
        self.slots
            .borrow()
            .get(key)
            .and_then(|slot| slot.entity.upgrade())
    }

    /// Get-or-create-and-merge.
    ///
    /// * No live entity: `create` builds one, which is installed and
    ///   registered for finalization.
    /// * Live entity and `tag` equal to its last applied tag: returned as is.
    /// * Otherwise `update` merges into the live entity and `tag` is recorded.
    pub fn merge(
        &self,
        key: EntityKey,
        tag: Option<VersionTag>,
        create: impl FnOnce(Tracking) -> E,
        update: impl FnOnce(&E),
    ) -> Rc<E> {
        self.tick();

        if let Some(existing) = self.get(&key) {
            let tracking = existing.tracking();
            if tag.is_some() && tracking.version.get() == tag {
                trace!(kind = %self.kind, %key, "skipping merge with applied version tag");
                return existing;
            }

            update(&existing);
            tracking.version.set(tag);
            return existing;
        }

        let generation = self.next_generation.get() + 1;
        self.next_generation.set(generation);

        let tracking = Tracking {
            version: Cell::new(tag),
            finalizer: self.registry.register(key.clone(), generation),
        };
        let entity = Rc::new(create(tracking));

        debug!(kind = %self.kind, %key, generation, "constructed entity");

        self.slots.borrow_mut().insert(
            key,
            Slot {
                generation,
                entity: Rc::downgrade(&entity),
            },
        );
        entity
    }

    /// Drop the slot for `key` immediately.
    ///
    /// Live references keep working; later merges for `key` construct a new
    /// instance.
    pub fn remove(&self, key: &EntityKey) -> bool {
        let removed = self.slots.borrow_mut().remove(key).is_some();
        if removed {
            debug!(kind = %self.kind, %key, "evicted entity");
        }
        removed
    }

    /// Reclaim slots whose entity has been finalized.
    ///
    /// Returns the number of slots removed.
    pub fn sweep(&self) -> usize {
        self.merges_since_sweep.set(0);

        let finalized = self.registry.drain();
        if finalized.is_empty() {
            return 0;
        }

        let mut slots = self.slots.borrow_mut();
        let mut removed = 0;
        for item in &finalized {
            let stale = slots.get(&item.key).is_some_and(|slot| {
                slot.generation == item.generation && slot.entity.strong_count() == 0
            });
            if stale {
                slots.remove(&item.key);
                removed += 1;
            }
        }

        debug!(
            kind = %self.kind,
            finalized = finalized.len(),
            removed,
            remaining = slots.len(),
            "swept identity map"
        );
        removed
    }

    /// Number of slots, including dead ones not yet swept.
    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }

    /// Number of slots whose entity is still alive.
    pub fn live_count(&self) -> usize {
        self.slots
            .borrow()
            .values()
            .filter(|slot| slot.entity.strong_count() > 0)
            .count()
    }

    /// Entities finalized but not yet swept.
    pub fn pending_finalizations(&self) -> usize {
        self.registry.pending()
    }

    fn tick(&self) {
        if self.sweep_interval == 0 {
            return;
        }

        let merges = self.merges_since_sweep.get() + 1;
        if merges >= self.sweep_interval {
            self.sweep();
        } else {
            self.merges_since_sweep.set(merges);
        }
    }
}

impl<E> fmt::Debug for IdentityMap<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityMap")
            .field("kind", &self.kind)
            .field("slots", &self.slots.borrow().len())
            .field("registry", &self.registry)
            .finish()
    }
}
