use parking_lot::{Condvar, Mutex};
use std::{
    any::Any,
    collections::VecDeque,
    mem,
    sync::Weak,
    thread::{self, ThreadId},
};
use tracing::debug;

use crate::{any::RcAny, errors::ResolveErrorKind, key::Key};

enum SlotState {
    Empty,
    Constructing(ThreadId),
    Ready(RcAny),
}

/// Cache cell of a scoped instance.
///
/// A slot is either empty, under construction by exactly one thread, or ready.
/// Other threads wait for a slot under construction and never observe a partial value.
pub(crate) struct Slot {
    state: Mutex<SlotState>,
    ready: Condvar,
}

impl Default for Slot {
    fn default() -> Self {
        Self::new()
    }
}

impl Slot {
    #[inline]
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Empty),
            ready: Condvar::new(),
        }
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn get(&self) -> Option<RcAny> {
        match &*self.state.lock() {
            SlotState::Ready(instance) => Some(instance.clone()),
            SlotState::Empty | SlotState::Constructing(_) => None,
        }
    }

    /// Returns the cached instance or claims the slot and runs `create`.
    ///
    /// # Errors
    /// - Returns the error of `create`, the slot is released and can be claimed again
    /// - Returns [`ResolveErrorKind::DependencyLoop`] if the current thread already constructs this slot
    pub(crate) fn get_or_create<F>(&self, key: &Key, create: F) -> Result<RcAny, ResolveErrorKind>
    where
        F: FnOnce() -> Result<RcAny, ResolveErrorKind>,
    {
        let current = thread::current().id();

        let mut state = self.state.lock();
        loop {
            let owner = match &*state {
                SlotState::Ready(instance) => {
                    debug!("Found in cache");
                    return Ok(instance.clone());
                }
                SlotState::Constructing(owner) => *owner,
                SlotState::Empty => break,
            };
            if owner == current {
                return Err(ResolveErrorKind::DependencyLoop {
                    cycle: vec![key.clone(), key.clone()],
                });
            }

            debug!("Waiting for construction in another thread");
            self.ready.wait(&mut state);
        }
        *state = SlotState::Constructing(current);
        drop(state);

        debug!("Not found in cache");

        let claim = Claim { slot: self, fulfilled: false };
        let instance = create()?;
        claim.fulfil(instance.clone());

        debug!("Cached");
        Ok(instance)
    }
}

/// Construction claim on a slot.
/// Dropping an unfulfilled claim (failed or panicked construction) empties the slot and wakes waiters.
struct Claim<'a> {
    slot: &'a Slot,
    fulfilled: bool,
}

impl Claim<'_> {
    fn fulfil(mut self, instance: RcAny) {
        *self.slot.state.lock() = SlotState::Ready(instance);
        self.fulfilled = true;
        self.slot.ready.notify_all();
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if !self.fulfilled {
            *self.slot.state.lock() = SlotState::Empty;
            self.slot.ready.notify_all();
        }
    }
}

/// Cached instance with a finalizer, kept until the container is closed
/// or, for multiton instances, until their context is dropped.
pub(crate) struct Resolved {
    pub(crate) key: Key,
    pub(crate) dependency: RcAny,
    pub(crate) context: Option<Weak<dyn Any + Send + Sync>>,
}

impl Resolved {
    #[inline]
    fn is_context_dropped(&self) -> bool {
        self.context.as_ref().is_some_and(|context| context.strong_count() == 0)
    }
}

/// Cached instances with finalizers, in creation order.
///
/// `generation` changes on every close, instances created before a close finishes aren't cached anymore
/// and must not be pushed.
#[derive(Default)]
pub(crate) struct ResolvedSet {
    entries: VecDeque<Resolved>,
    generation: u64,
}

impl ResolvedSet {
    #[inline]
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn push(&mut self, resolved: Resolved) {
        self.entries.push_back(resolved);
    }

    /// Removes entries whose context is dropped, in reverse creation order.
    #[must_use]
    pub(crate) fn take_dropped(&mut self) -> Vec<Resolved> {
        if !self.entries.iter().any(Resolved::is_context_dropped) {
            return Vec::new();
        }

        let (dropped, kept) = mem::take(&mut self.entries)
            .into_iter()
            .partition::<VecDeque<_>, _>(Resolved::is_context_dropped);
        self.entries = kept;
        dropped.into_iter().rev().collect()
    }

    /// Removes all entries, in reverse creation order, and starts a new generation.
    #[must_use]
    pub(crate) fn take_all(&mut self) -> Vec<Resolved> {
        self.generation += 1;
        mem::take(&mut self.entries).into_iter().rev().collect()
    }
}
