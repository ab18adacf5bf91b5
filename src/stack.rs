use std::cell::RefCell;

use crate::{errors::ResolveErrorKind, key::Key};

struct Frame {
    container: usize,
    key: Key,
}

thread_local! {
    // Keys under construction on this thread, in construction order.
    // Frames of different containers never form a loop with each other.
    static RESOLUTION_STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// Frame of the resolution stack, popped on drop so every exit path releases it.
pub(crate) struct ResolutionGuard {
    _private: (),
}

impl ResolutionGuard {
    /// Pushes `key` of `container` onto the current thread's resolution stack.
    ///
    /// # Errors
    /// Returns [`ResolveErrorKind::DependencyLoop`] with the cycle (first and last key are `key`)
    /// if `key` is already under construction
    pub(crate) fn enter(container: usize, key: &Key) -> Result<Self, ResolveErrorKind> {
        RESOLUTION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();

            if let Some(position) = stack
                .iter()
                .position(|frame| frame.container == container && frame.key == *key)
            {
                let mut cycle: Vec<Key> = stack[position..]
                    .iter()
                    .filter(|frame| frame.container == container)
                    .map(|frame| frame.key.clone())
                    .collect();
                cycle.push(key.clone());

                return Err(ResolveErrorKind::DependencyLoop { cycle });
            }

            stack.push(Frame {
                container,
                key: key.clone(),
            });
            Ok(Self { _private: () })
        })
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        RESOLUTION_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

#[cfg(test)]
pub(crate) fn depth() -> usize {
    RESOLUTION_STACK.with(|stack| stack.borrow().len())
}
