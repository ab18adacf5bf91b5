use std::sync::Arc;
use tracing::debug;

use crate::{
    any::{BoxAny, RcAny, TypeInfo},
    container::Container,
    context::Context,
    di::Di,
    errors::{InstantiateErrorKind, ResolveErrorKind},
    service::{service_fn, BoxedService},
};

/// Everything a binding needs to build an instance.
/// `context` already has the context type the binding requires.
pub(crate) struct InstantiateRequest {
    pub(crate) container: Container,
    pub(crate) context: Context,
    pub(crate) argument: BoxAny,
}

pub(crate) type BoxedInstantiator = BoxedService<InstantiateRequest, RcAny, InstantiateErrorKind>;

/// Instantiator of a binding without argument. An argument of the request, if any, is ignored.
#[must_use]
pub(crate) fn boxed_provider<C, T, F>(provider: F) -> BoxedInstantiator
where
    C: Send + Sync + 'static,
    T: Send + Sync + 'static,
    F: Fn(&Di<C>) -> Result<T, InstantiateErrorKind> + Send + Sync + 'static,
{
    BoxedService::new(service_fn(move |request: InstantiateRequest| -> Result<RcAny, InstantiateErrorKind> {
        let di = Di::<C>::from_context(request.container, request.context)?;
        let dependency = provider(&di)?;

        debug!("Instantiated");
        Ok(Arc::new(dependency) as RcAny)
    }))
}

#[must_use]
pub(crate) fn boxed_factory<C, A, T, F>(factory: F) -> BoxedInstantiator
where
    C: Send + Sync + 'static,
    A: Send + 'static,
    T: Send + Sync + 'static,
    F: Fn(&Di<C>, A) -> Result<T, InstantiateErrorKind> + Send + Sync + 'static,
{
    BoxedService::new(service_fn(move |request: InstantiateRequest| -> Result<RcAny, InstantiateErrorKind> {
        let argument = request
            .argument
            .downcast::<A>()
            .map_err(|incorrect_type| ResolveErrorKind::IncorrectType {
                expected: TypeInfo::of::<A>(),
                actual: (*incorrect_type).type_id(),
            })?;
        let di = Di::<C>::from_context(request.container, request.context)?;
        let dependency = factory(&di, *argument)?;

        debug!("Instantiated");
        Ok(Arc::new(dependency) as RcAny)
    }))
}

/// Instantiator that just returns a clone of the passed value.
/// It can be used when the value was created outside the container.
#[must_use]
pub(crate) fn boxed_instance<T>(value: T) -> BoxedInstantiator
where
    T: Clone + Send + Sync + 'static,
{
    boxed_provider(move |_: &Di| Ok(value.clone()))
}
