use super::ResolveErrorKind;

/// Error returned by a binding factory.
///
/// Nested retrievals convert into it with `?`, as do user errors through [`anyhow::Error`].
#[derive(thiserror::Error, Debug)]
pub enum InstantiateErrorKind {
    #[error(transparent)]
    Resolve(#[from] ResolveErrorKind),
    #[error(transparent)]
    Custom(#[from] anyhow::Error),
}
