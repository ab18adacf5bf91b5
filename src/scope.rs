use parking_lot::Mutex;
use std::{
    any::Any,
    collections::BTreeMap,
    mem,
    sync::{Arc, Weak},
};
use tracing::debug;

use crate::{any::RcAny, cache::Slot, context::Context, errors::ResolveErrorKind, key::Key};

/// Lifetime policy of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum DefaultScope {
    /// A new instance on every retrieval.
    Unscoped,
    /// One instance per binding for the container lifetime.
    Singleton,
    /// One instance per binding and context identity, released when the context is dropped.
    Multiton,
}

impl DefaultScope {
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            DefaultScope::Unscoped => "unscoped",
            DefaultScope::Singleton => "singleton",
            DefaultScope::Multiton => "multiton",
        }
    }

    #[inline]
    #[must_use]
    pub fn is_cached(&self) -> bool {
        !matches!(self, DefaultScope::Unscoped)
    }
}

pub(crate) trait Scope {
    /// Returns the instance cached for `key` and `context`, or creates it with `create`.
    fn get_or_create<F>(&self, key: &Key, context: &Context, create: F) -> Result<RcAny, ResolveErrorKind>
    where
        F: FnOnce() -> Result<RcAny, ResolveErrorKind>;

    /// Drops every cached instance.
    fn clear(&self);
}

#[derive(Default)]
pub(crate) struct Unscoped;

impl Scope for Unscoped {
    #[inline]
    fn get_or_create<F>(&self, _key: &Key, _context: &Context, create: F) -> Result<RcAny, ResolveErrorKind>
    where
        F: FnOnce() -> Result<RcAny, ResolveErrorKind>,
    {
        create()
    }

    #[inline]
    fn clear(&self) {}
}

#[derive(Default)]
pub(crate) struct Singleton {
    slots: Mutex<BTreeMap<Key, Arc<Slot>>>,
}

impl Singleton {
    #[cfg(test)]
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.slots.lock().len()
    }
}

impl Scope for Singleton {
    fn get_or_create<F>(&self, key: &Key, _context: &Context, create: F) -> Result<RcAny, ResolveErrorKind>
    where
        F: FnOnce() -> Result<RcAny, ResolveErrorKind>,
    {
        // Map lock is released before construction, so factories may resolve other singletons
        let slot = self.slots.lock().entry(key.clone()).or_default().clone();
        slot.get_or_create(key, create)
    }

    fn clear(&self) {
        // Instances are dropped after the lock is released
        let slots = mem::take(&mut *self.slots.lock());
        drop(slots);
    }
}

struct MultitonEntry {
    context: Weak<dyn Any + Send + Sync>,
    slot: Arc<Slot>,
}

#[derive(Default)]
pub(crate) struct Multiton {
    slots: Mutex<BTreeMap<(Key, usize), MultitonEntry>>,
}

impl Multiton {
    #[cfg(test)]
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        let mut slots = self.slots.lock();
        let _released = Self::prune(&mut slots);
        slots.len()
    }

    /// Removes entries of dropped contexts, returning them so they are dropped outside the lock.
    #[must_use]
    fn prune(slots: &mut BTreeMap<(Key, usize), MultitonEntry>) -> Vec<MultitonEntry> {
        let dead: Vec<(Key, usize)> = slots
            .iter()
            .filter(|(_, entry)| entry.context.strong_count() == 0)
            .map(|(key, _)| key.clone())
            .collect();
        if !dead.is_empty() {
            debug!(released = dead.len(), "Released slots of dropped contexts");
        }
        dead.iter().filter_map(|key| slots.remove(key)).collect()
    }
}

impl Scope for Multiton {
    fn get_or_create<F>(&self, key: &Key, context: &Context, create: F) -> Result<RcAny, ResolveErrorKind>
    where
        F: FnOnce() -> Result<RcAny, ResolveErrorKind>,
    {
        let (slot, _released) = {
            let mut slots = self.slots.lock();
            // Dead entries go first, so a reused address never hits a stale slot
            let released = Self::prune(&mut slots);
            let slot = slots
                .entry((key.clone(), context.identity()))
                .or_insert_with(|| MultitonEntry {
                    context: context.downgrade(),
                    slot: Arc::default(),
                })
                .slot
                .clone();
            (slot, released)
        };
        slot.get_or_create(key, create)
    }

    fn clear(&self) {
        // Instances are dropped after the lock is released
        let slots = mem::take(&mut *self.slots.lock());
        drop(slots);
    }
}

/// Scope instances owned by a container.
#[derive(Default)]
pub(crate) struct Scopes {
    pub(crate) unscoped: Unscoped,
    pub(crate) singleton: Singleton,
    pub(crate) multiton: Multiton,
}

impl Scopes {
    #[inline]
    pub(crate) fn get_or_create<F>(&self, scope: DefaultScope, key: &Key, context: &Context, create: F) -> Result<RcAny, ResolveErrorKind>
    where
        F: FnOnce() -> Result<RcAny, ResolveErrorKind>,
    {
        match scope {
            DefaultScope::Unscoped => self.unscoped.get_or_create(key, context, create),
            DefaultScope::Singleton => self.singleton.get_or_create(key, context, create),
            DefaultScope::Multiton => self.multiton.get_or_create(key, context, create),
        }
    }

    pub(crate) fn clear(&self) {
        self.unscoped.clear();
        self.singleton.clear();
        self.multiton.clear();
    }
}
