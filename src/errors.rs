mod import;
mod instantiate;
mod resolve;

pub use import::ImportErrorKind;
pub use instantiate::InstantiateErrorKind;
pub use resolve::ResolveErrorKind;
