use std::borrow::Cow;

use crate::{any::TypeInfo, key::Key};

/// Misconfiguration detected while importing a module, before any retrieval is possible.
#[derive(thiserror::Error, Debug)]
pub enum ImportErrorKind {
    #[error("Binding {key} is already declared. Mark the new binding as override to replace it.")]
    BindingConflict { key: Key },
    #[error("Binding {key} is marked as override, but there is no binding to override")]
    NothingToOverride { key: Key },
    #[error("Context translator from {from} to {to} is already registered")]
    TranslatorConflict { from: TypeInfo, to: TypeInfo },
    #[error("Another module named \"{name}\" is already imported")]
    ModuleConflict { name: Cow<'static, str> },
}
