use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, debug_span, error};

use crate::{
    any::{BoxAny, RcAny, TypeInfo},
    cache::{Resolved, ResolvedSet},
    context::Context,
    di::Di,
    errors::{InstantiateErrorKind, ResolveErrorKind},
    instantiator::InstantiateRequest,
    key::Key,
    registry::Registry,
    retrieval::DiAware,
    scope::{DefaultScope, Scopes},
    service::Service as _,
    stack::ResolutionGuard,
};

/// Resolves bindings of a [`Registry`] and owns the instances cached by their scopes.
///
/// Clones share the same caches. The container is closed when the last clone is dropped,
/// but instances holding a clone of their container keep it alive, so call [`Container::close`] explicitly in that case.
///
/// # Thread safety
/// The container can be shared between threads. A scoped instance is created once, concurrent requests for it
/// wait for the construction and receive the same instance.
#[derive(Clone)]
pub struct Container {
    pub(crate) inner: Arc<ContainerInner>,
}

impl Container {
    #[inline]
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                registry,
                scopes: Scopes::default(),
                context: Context::none(),
                resolved: Mutex::new(ResolvedSet::new()),
            }),
        }
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Returns a handle retrieving dependencies on behalf of `context`.
    #[inline]
    #[must_use]
    pub fn on<C: Send + Sync + 'static>(&self, context: Arc<C>) -> Di<C> {
        Di::new(self.clone(), context)
    }

    /// Calls finalizers of the cached instances in reverse order of their creation and clears the caches.
    /// The container stays usable, next retrievals create new instances.
    pub fn close(&self) {
        self.inner.close();
    }

    #[inline]
    #[must_use]
    pub(crate) fn id(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    /// Checks that a binding can serve `key` without creating anything.
    pub(crate) fn lookup(&self, key: &Key) -> Result<(), ResolveErrorKind> {
        self.inner.registry.find(key).map(|_| ())
    }

    pub(crate) fn resolve(&self, key: &Key, argument: BoxAny, context: &Context) -> Result<RcAny, ResolveErrorKind> {
        let span = debug_span!("resolve", %key);
        let _guard = span.enter();

        let inner = &self.inner;
        let binding = inner.registry.find(key)?;
        let _frame = ResolutionGuard::enter(self.id(), &binding.key)?;

        let context = if binding.key.context.is_unit() {
            inner.context.clone()
        } else {
            inner.registry.translate(context, binding.key.context)?
        };

        if binding.scope == DefaultScope::Multiton {
            inner.release_dropped_contexts();
        }

        inner.scopes.get_or_create(binding.scope, &binding.key, &context, || {
            let generation = inner.resolved.lock().generation();
            let request = InstantiateRequest {
                container: self.clone(),
                context: context.clone(),
                argument,
            };
            let dependency = match binding.instantiator.call(request) {
                Ok(dependency) => dependency,
                Err(InstantiateErrorKind::Resolve(err)) => return Err(err),
                Err(InstantiateErrorKind::Custom(source)) => {
                    return Err(ResolveErrorKind::Instantiate {
                        key: binding.key.clone(),
                        source,
                    })
                }
            };

            if binding.scope.is_cached() && inner.registry.finalizer(&binding.key).is_some() {
                let mut resolved_set = inner.resolved.lock();
                // The container was closed during construction, the instance isn't cached anymore
                if resolved_set.generation() != generation {
                    debug!("Container closed during construction, not pushed to resolved set");
                    return Ok(dependency);
                }
                resolved_set.push(Resolved {
                    key: binding.key.clone(),
                    dependency: dependency.clone(),
                    context: (binding.scope == DefaultScope::Multiton).then(|| context.downgrade()),
                });
                debug!("Pushed to resolved set");
            }
            Ok(dependency)
        })
    }

    pub(crate) fn resolve_as<T>(&self, key: &Key, argument: BoxAny, context: &Context) -> Result<Arc<T>, ResolveErrorKind>
    where
        T: Send + Sync + 'static,
    {
        self.resolve(key, argument, context)?
            .downcast::<T>()
            .map_err(|incorrect_type| ResolveErrorKind::IncorrectType {
                expected: TypeInfo::of::<T>(),
                actual: (*incorrect_type).type_id(),
            })
    }
}

impl DiAware for Container {
    #[inline]
    fn container(&self) -> &Container {
        self
    }

    #[inline]
    fn supplied_context(&self) -> &Context {
        &self.inner.context
    }
}

pub(crate) struct ContainerInner {
    registry: Registry,
    scopes: Scopes,
    // Context of bindings without context and of retrievals made on the container itself
    context: Context,
    resolved: Mutex<ResolvedSet>,
}

impl ContainerInner {
    fn close(&self) {
        let resolved = self.resolved.lock().take_all();
        self.finalize(resolved);

        self.scopes.clear();
        // Instances cached between the first take and the clear are gone with the caches too
        let resolved = self.resolved.lock().take_all();
        self.finalize(resolved);

        debug!("Container closed");
    }

    /// Finalizes multiton instances whose context is dropped and releases them.
    fn release_dropped_contexts(&self) {
        let resolved = self.resolved.lock().take_dropped();
        if !resolved.is_empty() {
            debug!(released = resolved.len(), "Finalizing instances of dropped contexts");
            self.finalize(resolved);
        }
    }

    fn finalize(&self, resolved: Vec<Resolved>) {
        for Resolved { key, dependency, .. } in resolved {
            let Some(finalizer) = self.registry.finalizer(&key) else {
                continue;
            };
            match finalizer.call(dependency) {
                Ok(()) => debug!(%key, "Finalizer called"),
                Err(err) => error!(%key, "{}", err),
            }
        }
    }
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        self.close();
    }
}
