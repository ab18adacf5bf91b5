use std::{
    borrow::Cow,
    fmt::{self, Debug, Formatter},
    sync::Arc,
};

use crate::{
    any::TypeInfo,
    di::Di,
    errors::InstantiateErrorKind,
    finalizer::{boxed_finalizer, BoxedFinalizer, Finalizer, FinalizerKey},
    instantiator::{boxed_factory, boxed_instance, boxed_provider, BoxedInstantiator},
    key::{IntoTag, Key, Tag},
    scope::DefaultScope,
    translator::ContextTranslator,
};

/// Tag and override flag of a binding declaration.
#[derive(Debug, Clone, Default)]
pub struct Bind {
    pub(crate) tag: Option<Tag>,
    pub(crate) overrides: bool,
}

impl Bind {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn tagged(tag: impl IntoTag) -> Self {
        Self {
            tag: tag.into_tag(),
            overrides: false,
        }
    }

    /// Marks the binding as replacing an already imported binding with the same key.
    #[inline]
    #[must_use]
    pub fn overrides(mut self) -> Self {
        self.overrides = true;
        self
    }
}

#[derive(Clone)]
pub(crate) struct BindingData {
    pub(crate) key: Key,
    pub(crate) scope: DefaultScope,
    pub(crate) instantiator: BoxedInstantiator,
    pub(crate) overrides: bool,
}

/// Named, reusable group of bindings, context translators and finalizers.
///
/// Modules are imported into a [`crate::RegistryBuilder`]. A module imported several times,
/// directly or through [`Module::import_once`], contributes its declarations once.
///
/// # Example
/// ```
/// use dicon::{Bind, DefaultScope, DiAware as _, Module};
///
/// struct Client {
///     url: String,
/// }
///
/// let module = Module::new("net")
///     .instance(Bind::tagged("url"), String::from("http://localhost"))
///     .provide(Bind::new(), DefaultScope::Singleton, |di| {
///         Ok(Client {
///             url: (*di.instance::<String>("url")?).clone(),
///         })
///     });
/// assert_eq!(module.name(), "net");
/// ```
/// Identity of a module value, shared by its clones and renewed by every declaration.
#[derive(Debug, Clone)]
pub(crate) struct ModuleIdentity(Arc<()>);

impl ModuleIdentity {
    fn new() -> Self {
        Self(Arc::new(()))
    }

    #[inline]
    pub(crate) fn is(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Clone)]
pub struct Module {
    pub(crate) name: Cow<'static, str>,
    pub(crate) identity: ModuleIdentity,
    pub(crate) imports: Vec<Module>,
    pub(crate) bindings: Vec<BindingData>,
    pub(crate) translators: Vec<ContextTranslator>,
    pub(crate) finalizers: Vec<(FinalizerKey, BoxedFinalizer)>,
}

impl Module {
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            identity: ModuleIdentity::new(),
            imports: Vec::new(),
            bindings: Vec::new(),
            translators: Vec::new(),
            finalizers: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn renewed(mut self) -> Self {
        self.identity = ModuleIdentity::new();
        self
    }

    /// Binds `T` without argument and context.
    #[inline]
    #[must_use]
    pub fn provide<T, F>(self, bind: Bind, scope: DefaultScope, provider: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Di) -> Result<T, InstantiateErrorKind> + Send + Sync + 'static,
    {
        self.provide_in::<(), T, F>(bind, scope, provider)
    }

    /// Binds `T` on context type `C`.
    /// Callers with another context type reach it through context translators.
    #[must_use]
    pub fn provide_in<C, T, F>(mut self, bind: Bind, scope: DefaultScope, provider: F) -> Self
    where
        C: Send + Sync + 'static,
        T: Send + Sync + 'static,
        F: Fn(&Di<C>) -> Result<T, InstantiateErrorKind> + Send + Sync + 'static,
    {
        self.bindings.push(BindingData {
            key: Key::of::<T, (), C>(bind.tag),
            scope,
            instantiator: boxed_provider(provider),
            overrides: bind.overrides,
        });
        self.renewed()
    }

    /// Binds `T` built from an argument of type `A`.
    #[inline]
    #[must_use]
    pub fn factory<A, T, F>(self, bind: Bind, scope: DefaultScope, factory: F) -> Self
    where
        A: Send + 'static,
        T: Send + Sync + 'static,
        F: Fn(&Di, A) -> Result<T, InstantiateErrorKind> + Send + Sync + 'static,
    {
        self.factory_in::<(), A, T, F>(bind, scope, factory)
    }

    #[must_use]
    pub fn factory_in<C, A, T, F>(mut self, bind: Bind, scope: DefaultScope, factory: F) -> Self
    where
        C: Send + Sync + 'static,
        A: Send + 'static,
        T: Send + Sync + 'static,
        F: Fn(&Di<C>, A) -> Result<T, InstantiateErrorKind> + Send + Sync + 'static,
    {
        self.bindings.push(BindingData {
            key: Key::of::<T, A, C>(bind.tag),
            scope,
            instantiator: boxed_factory(factory),
            overrides: bind.overrides,
        });
        self.renewed()
    }

    /// Binds an already created value.
    /// It's cached as a singleton, so every retrieval shares one clone of it.
    #[must_use]
    pub fn instance<T>(mut self, bind: Bind, value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.bindings.push(BindingData {
            key: Key::of::<T, (), ()>(bind.tag),
            scope: DefaultScope::Singleton,
            instantiator: boxed_instance(value),
            overrides: bind.overrides,
        });
        self.renewed()
    }

    /// Registers a context translator from `S` to `T`.
    #[inline]
    #[must_use]
    pub fn translator<S, T, F>(self, translate: F) -> Self
    where
        S: Send + Sync + 'static,
        T: Send + Sync + 'static,
        F: Fn(&S) -> Arc<T> + Send + Sync + 'static,
    {
        self.add_translator(ContextTranslator::new(translate))
    }

    #[inline]
    #[must_use]
    pub fn add_translator(mut self, translator: ContextTranslator) -> Self {
        self.translators.push(translator);
        self.renewed()
    }

    /// Imports `module` before the declarations of this module.
    /// The import is skipped if this module (or a clone of it) is already imported.
    #[inline]
    #[must_use]
    pub fn import_once(mut self, module: Module) -> Self {
        self.imports.push(module);
        self.renewed()
    }

    /// Adds a finalizer called on [`crate::Container::close`] for every cached `Dep` with `tag`.
    #[must_use]
    pub fn add_finalizer<Dep, Fin>(mut self, tag: impl IntoTag, finalizer: Fin) -> Self
    where
        Dep: Send + Sync + 'static,
        Fin: Finalizer<Dep>,
    {
        self.finalizers.push((
            FinalizerKey {
                bound: TypeInfo::of::<Dep>(),
                tag: tag.into_tag(),
            },
            boxed_finalizer(finalizer),
        ));
        self.renewed()
    }
}

impl Debug for Module {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("imports", &self.imports)
            .field("bindings", &self.bindings.iter().map(|binding| &binding.key).collect::<Vec<_>>())
            .field("translators", &self.translators.len())
            .field("finalizers", &self.finalizers.len())
            .finish()
    }
}
