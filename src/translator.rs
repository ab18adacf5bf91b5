use std::{
    collections::{BTreeSet, VecDeque},
    sync::Arc,
};
use tracing::debug;

use crate::{
    any::TypeInfo,
    context::Context,
    errors::{ImportErrorKind, ResolveErrorKind},
    service::{service_fn, BoxedService, Service as _},
};

pub(crate) type BoxedTranslator = BoxedService<Context, Context, ResolveErrorKind>;

/// Adapts a context of type `source` into a context of type `target`.
#[derive(Clone)]
pub struct ContextTranslator {
    pub(crate) source: TypeInfo,
    pub(crate) target: TypeInfo,
    pub(crate) translate: BoxedTranslator,
}

impl ContextTranslator {
    #[must_use]
    pub fn new<S, T, F>(translate: F) -> Self
    where
        S: Send + Sync + 'static,
        T: Send + Sync + 'static,
        F: Fn(&S) -> Arc<T> + Send + Sync + 'static,
    {
        Self {
            source: TypeInfo::of::<S>(),
            target: TypeInfo::of::<T>(),
            translate: BoxedService::new(service_fn(move |context: Context| match context.downcast_ref::<S>() {
                Some(source) => Ok(Context::new(translate(source))),
                None => Err(ResolveErrorKind::IncorrectType {
                    expected: TypeInfo::of::<S>(),
                    actual: context.type_info.id,
                }),
            })),
        }
    }

    #[inline]
    #[must_use]
    pub fn source(&self) -> TypeInfo {
        self.source
    }

    #[inline]
    #[must_use]
    pub fn target(&self) -> TypeInfo {
        self.target
    }
}

/// Append-only set of translators, searched as a graph with context types as nodes.
#[derive(Clone, Default)]
pub(crate) struct TranslatorChain {
    translators: Vec<ContextTranslator>,
}

impl TranslatorChain {
    #[inline]
    #[must_use]
    pub(crate) fn new() -> Self {
        Self { translators: Vec::new() }
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.translators.len()
    }

    pub(crate) fn push(&mut self, translator: ContextTranslator) -> Result<(), ImportErrorKind> {
        if self
            .translators
            .iter()
            .any(|registered| registered.source == translator.source && registered.target == translator.target)
        {
            return Err(ImportErrorKind::TranslatorConflict {
                from: translator.source,
                to: translator.target,
            });
        }

        debug!(source = %translator.source, target = %translator.target, "Translator registered");
        self.translators.push(translator);
        Ok(())
    }

    /// Shortest sequence of translators leading from `from` to `to`, at most `max_hops` long.
    /// Empty for identical types.
    #[must_use]
    pub(crate) fn path(&self, from: TypeInfo, to: TypeInfo, max_hops: usize) -> Option<Vec<&ContextTranslator>> {
        if from == to {
            return Some(Vec::new());
        }

        let mut visited = BTreeSet::from([from]);
        let mut queue = VecDeque::from([(from, Vec::new())]);
        while let Some((node, path)) = queue.pop_front() {
            if path.len() == max_hops {
                continue;
            }
            for translator in self.translators.iter().filter(|translator| translator.source == node) {
                let mut next_path: Vec<&ContextTranslator> = path.clone();
                next_path.push(translator);

                if translator.target == to {
                    return Some(next_path);
                }
                if visited.insert(translator.target) {
                    queue.push_back((translator.target, next_path));
                }
            }
        }

        None
    }

    #[inline]
    #[must_use]
    pub(crate) fn hops(&self, from: TypeInfo, to: TypeInfo, max_hops: usize) -> Option<usize> {
        self.path(from, to, max_hops).map(|path| path.len())
    }

    /// Adapts `context` to `to`, returning it unchanged if it already has the required type.
    pub(crate) fn translate(&self, context: &Context, to: TypeInfo, max_hops: usize) -> Result<Context, ResolveErrorKind> {
        let from = context.type_info;
        let Some(path) = self.path(from, to, max_hops) else {
            return Err(ResolveErrorKind::NoContextTranslator { from, to });
        };

        let mut context = context.clone();
        for translator in path {
            context = translator.translate.call(context)?;
            debug!(source = %translator.source, target = %translator.target, "Context translated");
        }

        Ok(context)
    }
}
