use std::{any::type_name, marker::PhantomData, sync::Arc};
use tracing::{debug, error, info_span};

use crate::{
    any::TypeInfo,
    container::Container,
    context::Context,
    errors::ResolveErrorKind,
    key::{IntoTag, Key, Tag},
};

/// Retrieval of dependencies on behalf of a context.
///
/// Every retrieval is identified by the requested type `T`, an optional tag, the argument type `A`
/// (`()` if there is no argument) and the type of [`DiAware::supplied_context`].
///
/// Methods without `_or_none` suffix fail with [`ResolveErrorKind::NotFound`] if there is no binding for the request.
/// Methods with it return `None` instead, but only if the requested dependency itself has no binding:
/// missing dependencies of the requested dependency are still errors.
pub trait DiAware {
    fn container(&self) -> &Container;

    /// Context retrievals are made on behalf of.
    fn supplied_context(&self) -> &Context;

    /// Returns a function creating `T` from an argument of type `A` on each call.
    ///
    /// # Errors
    /// - Returns [`ResolveErrorKind::NotFound`] if there is no binding for `T` with argument `A`
    /// - Returns [`ResolveErrorKind::NoContextTranslator`] if bindings exist, but the context can't be translated
    fn factory<T, A>(&self, tag: impl IntoTag) -> Result<Factory<A, T>, ResolveErrorKind>
    where
        T: Send + Sync + 'static,
        A: Send + 'static,
    {
        let key = request_key::<T, A>(tag.into_tag(), self.supplied_context());
        let span = info_span!("factory", dependency = type_name::<T>(), argument = type_name::<A>(), tag = ?key.tag);
        let _guard = span.enter();

        logged(factory_for(self.container(), key, self.supplied_context()))
    }

    fn factory_or_none<T, A>(&self, tag: impl IntoTag) -> Result<Option<Factory<A, T>>, ResolveErrorKind>
    where
        T: Send + Sync + 'static,
        A: Send + 'static,
    {
        let key = request_key::<T, A>(tag.into_tag(), self.supplied_context());
        let span = info_span!("factory_or_none", dependency = type_name::<T>(), argument = type_name::<A>(), tag = ?key.tag);
        let _guard = span.enter();

        or_none(key.clone(), factory_for(self.container(), key, self.supplied_context()))
    }

    /// Returns a function creating or returning the cached `T` on each call.
    ///
    /// # Errors
    /// - Returns [`ResolveErrorKind::NotFound`] if there is no binding for `T`
    /// - Returns [`ResolveErrorKind::NoContextTranslator`] if bindings exist, but the context can't be translated
    fn provider<T>(&self, tag: impl IntoTag) -> Result<Provider<T>, ResolveErrorKind>
    where
        T: Send + Sync + 'static,
    {
        let key = request_key::<T, ()>(tag.into_tag(), self.supplied_context());
        let span = info_span!("provider", dependency = type_name::<T>(), tag = ?key.tag);
        let _guard = span.enter();

        logged(provider_for(self.container(), key, self.supplied_context(), || ()))
    }

    /// Same as [`DiAware::provider`], but every call passes a clone of `argument`.
    fn provider_with<T, A>(&self, tag: impl IntoTag, argument: A) -> Result<Provider<T>, ResolveErrorKind>
    where
        T: Send + Sync + 'static,
        A: Clone + Send + Sync + 'static,
    {
        self.provider_with_fn(tag, move || argument.clone())
    }

    /// Same as [`DiAware::provider`], but every call passes an argument produced by `argument`.
    fn provider_with_fn<T, A, F>(&self, tag: impl IntoTag, argument: F) -> Result<Provider<T>, ResolveErrorKind>
    where
        T: Send + Sync + 'static,
        A: Send + 'static,
        F: Fn() -> A + Send + Sync + 'static,
    {
        let key = request_key::<T, A>(tag.into_tag(), self.supplied_context());
        let span = info_span!("provider", dependency = type_name::<T>(), argument = type_name::<A>(), tag = ?key.tag);
        let _guard = span.enter();

        logged(provider_for(self.container(), key, self.supplied_context(), argument))
    }

    fn provider_or_none<T>(&self, tag: impl IntoTag) -> Result<Option<Provider<T>>, ResolveErrorKind>
    where
        T: Send + Sync + 'static,
    {
        self.provider_with_fn_or_none(tag, || ())
    }

    fn provider_with_or_none<T, A>(&self, tag: impl IntoTag, argument: A) -> Result<Option<Provider<T>>, ResolveErrorKind>
    where
        T: Send + Sync + 'static,
        A: Clone + Send + Sync + 'static,
    {
        self.provider_with_fn_or_none(tag, move || argument.clone())
    }

    fn provider_with_fn_or_none<T, A, F>(&self, tag: impl IntoTag, argument: F) -> Result<Option<Provider<T>>, ResolveErrorKind>
    where
        T: Send + Sync + 'static,
        A: Send + 'static,
        F: Fn() -> A + Send + Sync + 'static,
    {
        let key = request_key::<T, A>(tag.into_tag(), self.supplied_context());
        let span = info_span!("provider_or_none", dependency = type_name::<T>(), argument = type_name::<A>(), tag = ?key.tag);
        let _guard = span.enter();

        or_none(key.clone(), provider_for(self.container(), key, self.supplied_context(), argument))
    }

    /// Returns a new or the cached `T`, depending on the scope of its binding.
    ///
    /// # Errors
    /// - Returns [`ResolveErrorKind::NotFound`] if there is no binding for `T` or for one of its dependencies
    /// - Returns [`ResolveErrorKind::DependencyLoop`] if `T` depends on itself
    /// - Returns [`ResolveErrorKind::NoContextTranslator`] if bindings exist, but the context can't be translated
    /// - Returns [`ResolveErrorKind::Instantiate`] if a binding body fails
    fn instance<T>(&self, tag: impl IntoTag) -> Result<Arc<T>, ResolveErrorKind>
    where
        T: Send + Sync + 'static,
    {
        self.instance_with_fn(tag, || ())
    }

    fn instance_with<T, A>(&self, tag: impl IntoTag, argument: A) -> Result<Arc<T>, ResolveErrorKind>
    where
        T: Send + Sync + 'static,
        A: Send + 'static,
    {
        self.instance_with_fn(tag, move || argument)
    }

    fn instance_with_fn<T, A, F>(&self, tag: impl IntoTag, argument: F) -> Result<Arc<T>, ResolveErrorKind>
    where
        T: Send + Sync + 'static,
        A: Send + 'static,
        F: FnOnce() -> A,
    {
        let key = request_key::<T, A>(tag.into_tag(), self.supplied_context());
        let span = info_span!("instance", dependency = type_name::<T>(), argument = type_name::<A>(), tag = ?key.tag);
        let _guard = span.enter();

        logged(
            self.container()
                .resolve_as::<T>(&key, Box::new(argument()), self.supplied_context()),
        )
    }

    fn instance_or_none<T>(&self, tag: impl IntoTag) -> Result<Option<Arc<T>>, ResolveErrorKind>
    where
        T: Send + Sync + 'static,
    {
        self.instance_with_fn_or_none(tag, || ())
    }

    fn instance_with_or_none<T, A>(&self, tag: impl IntoTag, argument: A) -> Result<Option<Arc<T>>, ResolveErrorKind>
    where
        T: Send + Sync + 'static,
        A: Send + 'static,
    {
        self.instance_with_fn_or_none(tag, move || argument)
    }

    fn instance_with_fn_or_none<T, A, F>(&self, tag: impl IntoTag, argument: F) -> Result<Option<Arc<T>>, ResolveErrorKind>
    where
        T: Send + Sync + 'static,
        A: Send + 'static,
        F: FnOnce() -> A,
    {
        let key = request_key::<T, A>(tag.into_tag(), self.supplied_context());
        let span = info_span!("instance_or_none", dependency = type_name::<T>(), argument = type_name::<A>(), tag = ?key.tag);
        let _guard = span.enter();

        let result = self
            .container()
            .resolve_as::<T>(&key, Box::new(argument()), self.supplied_context());
        or_none(key, result)
    }
}

/// Function creating a `T` from an `A`, see [`DiAware::factory`].
pub struct Factory<A, T> {
    container: Container,
    key: Key,
    context: Context,
    _marker: PhantomData<fn(A) -> T>,
}

impl<A, T> Factory<A, T>
where
    A: Send + 'static,
    T: Send + Sync + 'static,
{
    /// # Errors
    /// Returns errors of the binding as [`DiAware::instance`] does
    pub fn call(&self, argument: A) -> Result<Arc<T>, ResolveErrorKind> {
        self.container.resolve_as::<T>(&self.key, Box::new(argument), &self.context)
    }
}

impl<A, T> Clone for Factory<A, T> {
    fn clone(&self) -> Self {
        Self {
            container: self.container.clone(),
            key: self.key.clone(),
            context: self.context.clone(),
            _marker: PhantomData,
        }
    }
}

type BoxedGet<T> = Arc<dyn Fn() -> Result<Arc<T>, ResolveErrorKind> + Send + Sync>;

/// Function returning a `T`, see [`DiAware::provider`].
pub struct Provider<T> {
    get: BoxedGet<T>,
}

impl<T> Provider<T> {
    /// # Errors
    /// Returns errors of the binding as [`DiAware::instance`] does
    #[inline]
    pub fn get(&self) -> Result<Arc<T>, ResolveErrorKind> {
        (self.get)()
    }
}

impl<T> Clone for Provider<T> {
    fn clone(&self) -> Self {
        Self { get: self.get.clone() }
    }
}

fn request_key<T: 'static, A: 'static>(tag: Option<Tag>, context: &Context) -> Key {
    Key::new(TypeInfo::of::<T>(), TypeInfo::of::<A>(), context.type_info(), tag)
}

fn factory_for<A, T>(container: &Container, key: Key, context: &Context) -> Result<Factory<A, T>, ResolveErrorKind> {
    container.lookup(&key)?;
    Ok(Factory {
        container: container.clone(),
        key,
        context: context.clone(),
        _marker: PhantomData,
    })
}

fn provider_for<T, A, F>(container: &Container, key: Key, context: &Context, argument: F) -> Result<Provider<T>, ResolveErrorKind>
where
    T: Send + Sync + 'static,
    A: Send + 'static,
    F: Fn() -> A + Send + Sync + 'static,
{
    container.lookup(&key)?;

    let container = container.clone();
    let context = context.clone();
    Ok(Provider {
        get: Arc::new(move || container.resolve_as::<T>(&key, Box::new(argument()), &context)),
    })
}

fn logged<R>(result: Result<R, ResolveErrorKind>) -> Result<R, ResolveErrorKind> {
    if let Err(err) = &result {
        error!("{}", err);
    }
    result
}

/// Converts a missing binding of the requested `key` into `None`.
fn or_none<R>(key: Key, result: Result<R, ResolveErrorKind>) -> Result<Option<R>, ResolveErrorKind> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ResolveErrorKind::NotFound { key: missing }) if missing == key => {
            debug!(%key, "Not found");
            Ok(None)
        }
        Err(err) => {
            error!("{}", err);
            Err(err)
        }
    }
}
