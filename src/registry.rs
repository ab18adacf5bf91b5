use std::{
    borrow::Cow,
    collections::BTreeMap,
    iter,
};
use tracing::{debug, warn};

use crate::{
    any::TypeInfo,
    config::Config,
    context::Context,
    errors::{ImportErrorKind, ResolveErrorKind},
    finalizer::{BoxedFinalizer, FinalizerKey},
    key::{Key, Signature},
    module::{BindingData, Module, ModuleIdentity},
    translator::TranslatorChain,
};

pub struct RegistryBuilder {
    config: Config,
    bindings: BTreeMap<Key, BindingData>,
    translators: TranslatorChain,
    finalizers: BTreeMap<FinalizerKey, BoxedFinalizer>,
    modules: BTreeMap<Cow<'static, str>, ModuleIdentity>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    #[inline]
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            bindings: BTreeMap::new(),
            translators: TranslatorChain::new(),
            finalizers: BTreeMap::new(),
            modules: BTreeMap::new(),
        }
    }

    /// Starts from the declarations of an already built registry.
    /// Modules imported into `registry` are skipped by later imports, its bindings can be overridden.
    #[must_use]
    pub fn extend(registry: &Registry) -> Self {
        Self {
            config: registry.config,
            bindings: registry.bindings.clone(),
            translators: registry.translators.clone(),
            finalizers: registry.finalizers.clone(),
            modules: registry.modules.clone(),
        }
    }

    /// Imports `module` and, depth-first, the modules it imports.
    ///
    /// # Errors
    /// - Returns [`ImportErrorKind::BindingConflict`] if a binding with the same key is already declared,
    ///   the binding isn't marked as override and silent override isn't allowed
    /// - Returns [`ImportErrorKind::NothingToOverride`] if a binding is marked as override, but there is no binding to replace
    /// - Returns [`ImportErrorKind::TranslatorConflict`] if a translator between the same context types is already registered
    /// - Returns [`ImportErrorKind::ModuleConflict`] if another module with the same name is already imported
    pub fn import(mut self, module: &Module) -> Result<Self, ImportErrorKind> {
        self.import_module(module)?;
        Ok(self)
    }

    fn import_module(&mut self, module: &Module) -> Result<(), ImportErrorKind> {
        if let Some(identity) = self.modules.get(&module.name) {
            if !identity.is(&module.identity) {
                return Err(ImportErrorKind::ModuleConflict {
                    name: module.name.clone(),
                });
            }
            debug!(module = %module.name, "Module already imported, skipped");
            return Ok(());
        }
        // Marked before the nested imports, so modules importing each other terminate
        self.modules.insert(module.name.clone(), module.identity.clone());

        for import in &module.imports {
            self.import_module(import)?;
        }
        for binding in &module.bindings {
            self.add_binding(binding.clone())?;
        }
        for translator in &module.translators {
            self.translators.push(translator.clone())?;
        }
        for (key, finalizer) in &module.finalizers {
            self.finalizers.insert(key.clone(), finalizer.clone());
        }

        debug!(module = %module.name, bindings = module.bindings.len(), "Module imported");
        Ok(())
    }

    fn add_binding(&mut self, binding: BindingData) -> Result<(), ImportErrorKind> {
        let exists = self.bindings.contains_key(&binding.key);
        match (exists, binding.overrides) {
            (false, false) => {}
            (false, true) => return Err(ImportErrorKind::NothingToOverride { key: binding.key }),
            (true, true) => debug!(key = %binding.key, "Binding overridden"),
            (true, false) if self.config.allow_silent_override => {
                warn!(key = %binding.key, "Binding silently overridden");
            }
            (true, false) => return Err(ImportErrorKind::BindingConflict { key: binding.key }),
        }

        self.bindings.insert(binding.key.clone(), binding);
        Ok(())
    }

    #[must_use]
    pub fn build(self) -> Registry {
        let mut signatures: BTreeMap<Signature, Vec<TypeInfo>> = BTreeMap::new();
        for key in self.bindings.keys() {
            signatures.entry(key.signature()).or_default().push(key.context);
        }

        Registry {
            config: self.config,
            bindings: self.bindings,
            signatures,
            translators: self.translators,
            finalizers: self.finalizers,
            modules: self.modules,
        }
    }
}

/// Immutable set of bindings, context translators and finalizers.
#[derive(Clone)]
pub struct Registry {
    config: Config,
    bindings: BTreeMap<Key, BindingData>,
    // Context types of bindings sharing a signature
    signatures: BTreeMap<Signature, Vec<TypeInfo>>,
    translators: TranslatorChain,
    finalizers: BTreeMap<FinalizerKey, BoxedFinalizer>,
    modules: BTreeMap<Cow<'static, str>, ModuleIdentity>,
}

impl Registry {
    #[inline]
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.bindings.keys()
    }

    /// Checks for a binding with exactly this key, without argument or context fallback.
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &Key) -> bool {
        self.bindings.contains_key(key)
    }

    /// Names of the imported modules.
    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(AsRef::as_ref)
    }

    /// Finds the binding serving a request.
    ///
    /// A binding with the requested argument type is preferred over a binding without argument.
    /// For each of them the binding on the requested context type is preferred, then a binding on a context type
    /// reachable with the fewest translator hops, then a binding without context.
    ///
    /// # Errors
    /// - Returns [`ResolveErrorKind::NoContextTranslator`] if bindings exist, but none is reachable from the requested context
    /// - Returns [`ResolveErrorKind::NotFound`] if there are no bindings for the type, tag and argument
    pub(crate) fn find(&self, key: &Key) -> Result<&BindingData, ResolveErrorKind> {
        let signature = key.signature();
        let without_argument = (!key.arg.is_unit()).then(|| signature.with_arg(TypeInfo::unit()));

        let mut unreachable = None;
        for signature in iter::once(signature).chain(without_argument) {
            let Some(contexts) = self.signatures.get(&signature) else {
                continue;
            };
            if let Some(binding) = self.find_on_context(&signature, key.context, contexts) {
                return Ok(binding);
            }
            if let (None, Some(&to)) = (&unreachable, contexts.first()) {
                unreachable = Some(ResolveErrorKind::NoContextTranslator { from: key.context, to });
            }
        }

        Err(unreachable.unwrap_or_else(|| ResolveErrorKind::NotFound { key: key.clone() }))
    }

    fn find_on_context(&self, signature: &Signature, context: TypeInfo, contexts: &[TypeInfo]) -> Option<&BindingData> {
        let required = if contexts.contains(&context) {
            context
        } else if let Some((_, reachable)) = contexts
            .iter()
            .filter(|candidate| !candidate.is_unit())
            .filter_map(|&candidate| {
                self.translators
                    .hops(context, candidate, self.config.max_translator_hops)
                    .map(|hops| (hops, candidate))
            })
            .min_by_key(|(hops, _)| *hops)
        {
            reachable
        } else if contexts.iter().any(TypeInfo::is_unit) {
            TypeInfo::unit()
        } else {
            return None;
        };

        self.bindings.get(&signature.key(required))
    }

    /// Adapts `context` to the context type a binding requires.
    pub(crate) fn translate(&self, context: &Context, to: TypeInfo) -> Result<Context, ResolveErrorKind> {
        self.translators.translate(context, to, self.config.max_translator_hops)
    }

    pub(crate) fn finalizer(&self, key: &Key) -> Option<&BoxedFinalizer> {
        self.finalizers.get(&FinalizerKey {
            bound: key.bound,
            tag: key.tag.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use tracing_test::traced_test;

    use super::RegistryBuilder;
    use crate::{
        config::Config,
        errors::{ImportErrorKind, ResolveErrorKind},
        key::{Key, Tag},
        module::{Bind, Module},
        scope::DefaultScope::Unscoped,
        Di,
    };

    struct Request;
    struct Application;
    struct Activity(Arc<Application>);
    struct Fragment(Arc<Activity>);
    struct View(Arc<Fragment>);

    fn request_module(name: &'static str) -> Module {
        Module::new(name).provide(Bind::new(), Unscoped, |_| Ok(Request))
    }

    fn translators() -> Module {
        Module::new("translators")
            .translator(|view: &View| view.0.clone())
            .translator(|fragment: &Fragment| fragment.0.clone())
            .translator(|activity: &Activity| activity.0.clone())
    }

    #[test]
    #[traced_test]
    fn test_import_once() {
        let module = request_module("request");
        let registry = RegistryBuilder::new()
            .import(&module)
            .unwrap()
            .import(&Module::new("app").import_once(module.clone()))
            .unwrap()
            .build();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.modules().collect::<Vec<_>>(), ["app", "request"]);
        assert!(logs_contain("Module already imported, skipped"));
    }

    #[test]
    #[traced_test]
    fn test_nested_imports_first() {
        let registry = RegistryBuilder::new()
            .import(
                &Module::new("outer")
                    .import_once(request_module("inner"))
                    .provide(Bind::new().overrides(), Unscoped, |_| Ok(Request)),
            )
            .unwrap()
            .build();

        assert_eq!(registry.len(), 1);
    }

    #[test]
    #[traced_test]
    fn test_module_name_conflict() {
        let result = RegistryBuilder::new()
            .import(&request_module("app"))
            .unwrap()
            .import(&Module::new("app").provide(Bind::tagged("other"), Unscoped, |_| Ok(Request)));

        let Err(ImportErrorKind::ModuleConflict { name }) = result else {
            panic!("module conflict expected");
        };
        assert_eq!(name, "app");
    }

    #[test]
    #[traced_test]
    fn test_module_name_conflict_nested() {
        let result = RegistryBuilder::new()
            .import(&request_module("shared"))
            .unwrap()
            .import(&Module::new("app").import_once(request_module("shared")));

        assert!(matches!(result, Err(ImportErrorKind::ModuleConflict { .. })));
    }

    #[test]
    #[traced_test]
    fn test_conflict() {
        let result = RegistryBuilder::new()
            .import(&request_module("first"))
            .unwrap()
            .import(&request_module("second"));

        assert!(matches!(result, Err(ImportErrorKind::BindingConflict { .. })));
    }

    #[test]
    #[traced_test]
    fn test_silent_override() {
        let registry = RegistryBuilder::with_config(Config {
            allow_silent_override: true,
            ..Config::default()
        })
        .import(&request_module("first"))
        .unwrap()
        .import(&request_module("second"))
        .unwrap()
        .build();

        assert_eq!(registry.len(), 1);
        assert!(logs_contain("Binding silently overridden"));
    }

    #[test]
    #[traced_test]
    fn test_nothing_to_override() {
        let result = RegistryBuilder::new().import(&Module::new("first").provide(Bind::new().overrides(), Unscoped, |_| Ok(Request)));

        assert!(matches!(result, Err(ImportErrorKind::NothingToOverride { .. })));
    }

    #[test]
    #[traced_test]
    fn test_translator_conflict() {
        let result = RegistryBuilder::new()
            .import(&translators())
            .unwrap()
            .import(&Module::new("again").translator(|view: &View| view.0.clone()));

        assert!(matches!(result, Err(ImportErrorKind::TranslatorConflict { .. })));
    }

    #[test]
    #[traced_test]
    fn test_extend() {
        let request = request_module("request");
        let base = RegistryBuilder::new().import(&request).unwrap().build();
        let registry = RegistryBuilder::extend(&base)
            .import(&request)
            .unwrap()
            .import(&Module::new("tests").provide(Bind::new().overrides(), Unscoped, |_| Ok(Request)))
            .unwrap()
            .build();

        assert_eq!(registry.len(), 1);
        assert_eq!(base.len(), 1);
    }

    #[test]
    #[traced_test]
    fn test_find_argument_fallback() {
        let registry = RegistryBuilder::new()
            .import(
                &Module::new("request")
                    .provide(Bind::new(), Unscoped, |_| Ok(Request))
                    .factory(Bind::new(), Unscoped, |_, _: u8| Ok(Request)),
            )
            .unwrap()
            .build();

        let with_u8 = Key::of::<Request, u8, ()>(None);
        let with_u16 = Key::of::<Request, u16, ()>(None);
        assert_eq!(registry.find(&with_u8).unwrap().key, with_u8);
        assert_eq!(registry.find(&with_u16).unwrap().key, Key::of::<Request, (), ()>(None));
        assert!(matches!(
            registry.find(&Key::of::<Request, (), ()>(Some(Tag::new("other")))),
            Err(ResolveErrorKind::NotFound { .. })
        ));
    }

    #[test]
    #[traced_test]
    fn test_find_context() {
        let registry = RegistryBuilder::new()
            .import(&translators())
            .unwrap()
            .import(
                &Module::new("request")
                    .provide_in(Bind::new(), Unscoped, |_: &Di<Application>| Ok(Request))
                    .provide_in(Bind::new(), Unscoped, |_: &Di<Activity>| Ok(Request))
                    .provide_in(Bind::tagged("app"), Unscoped, |_: &Di<Application>| Ok(Request)),
            )
            .unwrap()
            .build();

        // Exact context type
        let on_app = Key::of::<Request, (), Application>(None);
        assert_eq!(registry.find(&on_app).unwrap().key, on_app);
        // Fewest hops wins
        let on_fragment = Key::of::<Request, (), Fragment>(None);
        assert_eq!(
            registry.find(&on_fragment).unwrap().key,
            Key::of::<Request, (), Activity>(None)
        );
        // Out of the default hops bound
        assert!(matches!(
            registry.find(&Key::of::<Request, (), View>(Some(Tag::new("app")))),
            Err(ResolveErrorKind::NoContextTranslator { .. })
        ));
        // No translator from the unit context
        assert!(matches!(
            registry.find(&Key::of::<Request, (), ()>(None)),
            Err(ResolveErrorKind::NoContextTranslator { .. })
        ));
    }

    #[test]
    #[traced_test]
    fn test_find_unit_context_fallback() {
        let registry = RegistryBuilder::new()
            .import(&request_module("request"))
            .unwrap()
            .build();

        let on_activity = Key::of::<Request, (), Activity>(None);
        assert_eq!(registry.find(&on_activity).unwrap().key, Key::of::<Request, (), ()>(None));
        assert!(registry.contains(&Key::of::<Request, (), ()>(None)));
        assert!(!registry.contains(&on_activity));
    }
}
