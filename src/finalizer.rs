use std::sync::Arc;

use crate::{
    any::{RcAny, TypeInfo},
    errors::ResolveErrorKind,
    key::Tag,
    service::{service_fn, BoxedService},
};

pub trait Finalizer<Dep>: Send + Sync + 'static {
    fn finalize(&self, dependency: Arc<Dep>);
}

impl<F, Dep> Finalizer<Dep> for F
where
    F: Fn(Arc<Dep>) + Send + Sync + 'static,
{
    #[inline]
    fn finalize(&self, dependency: Arc<Dep>) {
        self(dependency);
    }
}

pub(crate) type BoxedFinalizer = BoxedService<RcAny, (), ResolveErrorKind>;

/// Finalizers apply to every cached instance of a bound type and tag,
/// whatever argument or context type its binding declares.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct FinalizerKey {
    pub(crate) bound: TypeInfo,
    pub(crate) tag: Option<Tag>,
}

#[must_use]
pub(crate) fn boxed_finalizer<Dep, Fin>(finalizer: Fin) -> BoxedFinalizer
where
    Dep: Send + Sync + 'static,
    Fin: Finalizer<Dep>,
{
    BoxedService::new(service_fn(move |dependency: RcAny| -> Result<(), ResolveErrorKind> {
        let dependency = dependency.downcast::<Dep>().map_err(|incorrect_type| ResolveErrorKind::IncorrectType {
            expected: TypeInfo::of::<Dep>(),
            actual: (*incorrect_type).type_id(),
        })?;
        finalizer.finalize(dependency);
        Ok(())
    }))
}
