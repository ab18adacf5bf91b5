use std::{
    any::Any,
    fmt::{self, Debug, Formatter},
    sync::{Arc, Weak},
};

use crate::{any::TypeInfo, errors::ResolveErrorKind};

/// Type-erased context supplied by a caller or produced by a context translator.
///
/// Identity of a context is the identity of the shared value, so clones of a context and
/// contexts created from clones of the same [`Arc`] are the same context.
#[derive(Clone)]
pub struct Context {
    pub(crate) type_info: TypeInfo,
    pub(crate) value: Arc<dyn Any + Send + Sync>,
}

impl Context {
    #[inline]
    #[must_use]
    pub fn new<C: Send + Sync + 'static>(value: Arc<C>) -> Self {
        Self {
            type_info: TypeInfo::of::<C>(),
            value,
        }
    }

    /// Creates a fresh "no context" value.
    /// Each call creates a new identity, containers create it once and reuse it.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::new(Arc::new(()))
    }

    #[inline]
    #[must_use]
    pub fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    #[inline]
    #[must_use]
    pub fn downcast_ref<C: 'static>(&self) -> Option<&C> {
        self.value.downcast_ref()
    }

    /// # Errors
    /// Returns [`ResolveErrorKind::IncorrectType`] if the context isn't a `C`
    pub fn downcast<C: Send + Sync + 'static>(&self) -> Result<Arc<C>, ResolveErrorKind> {
        self.value.clone().downcast().map_err(|_| ResolveErrorKind::IncorrectType {
            expected: TypeInfo::of::<C>(),
            actual: self.type_info.id,
        })
    }

    #[inline]
    #[must_use]
    pub(crate) fn identity(&self) -> usize {
        Arc::as_ptr(&self.value).cast::<()>() as usize
    }

    #[inline]
    #[must_use]
    pub(crate) fn downgrade(&self) -> Weak<dyn Any + Send + Sync> {
        Arc::downgrade(&self.value)
    }
}

impl Debug for Context {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("type", &self.type_info.name)
            .field("identity", &self.identity())
            .finish()
    }
}
