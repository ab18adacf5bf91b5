use std::{
    any::TypeId,
    fmt::{self, Display, Formatter},
};

use crate::{any::TypeInfo, key::Key};

#[derive(thiserror::Error, Debug)]
pub enum ResolveErrorKind {
    #[error("No binding found for {key}")]
    NotFound { key: Key },
    #[error("Dependency loop detected: {}", Cycle(cycle))]
    DependencyLoop { cycle: Vec<Key> },
    #[error("No context translator from {from} to {to}")]
    NoContextTranslator { from: TypeInfo, to: TypeInfo },
    #[error("Incorrect type. Actual: {actual:?}, expected: {expected}")]
    IncorrectType { expected: TypeInfo, actual: TypeId },
    #[error("Instantiation of {key} failed: {source}")]
    Instantiate {
        key: Key,
        #[source]
        source: anyhow::Error,
    },
}

impl ResolveErrorKind {
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[inline]
    #[must_use]
    pub fn is_dependency_loop(&self) -> bool {
        matches!(self, Self::DependencyLoop { .. })
    }
}

struct Cycle<'a>(&'a [Key]);

impl Display for Cycle<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (index, key) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{key}")?;
        }
        Ok(())
    }
}
