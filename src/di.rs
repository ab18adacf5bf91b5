use std::sync::Arc;

use crate::{container::Container, context::Context, errors::ResolveErrorKind, retrieval::DiAware};

/// Handle passed to binding bodies, and returned by [`Container::on`].
///
/// Retrievals made through it use `context` as the caller's context.
/// For bindings on a context type, `context` is the caller's context already translated to that type.
pub struct Di<C = ()> {
    container: Container,
    context: Arc<C>,
    erased: Context,
}

impl<C> Di<C>
where
    C: Send + Sync + 'static,
{
    #[inline]
    #[must_use]
    pub(crate) fn new(container: Container, context: Arc<C>) -> Self {
        let erased = Context::new(context.clone());
        Self {
            container,
            context,
            erased,
        }
    }

    pub(crate) fn from_context(container: Container, erased: Context) -> Result<Self, ResolveErrorKind> {
        let context = erased.downcast::<C>()?;
        Ok(Self {
            container,
            context,
            erased,
        })
    }

    #[inline]
    #[must_use]
    pub fn context(&self) -> &Arc<C> {
        &self.context
    }
}

impl<C> Clone for Di<C> {
    fn clone(&self) -> Self {
        Self {
            container: self.container.clone(),
            context: self.context.clone(),
            erased: self.erased.clone(),
        }
    }
}

impl<C> DiAware for Di<C> {
    #[inline]
    fn container(&self) -> &Container {
        &self.container
    }

    #[inline]
    fn supplied_context(&self) -> &Context {
        &self.erased
    }
}
