/// Config for a registry
/// ## Fields
/// - `allow_silent_override`:
///   If `true`, a binding declared again without [`crate::Bind::overrides`] replaces the previous one
///   instead of failing the import with [`crate::ImportErrorKind::BindingConflict`].
///
/// - `max_translator_hops`:
///   Maximal number of context translators composed to adapt a caller's context to the context of a binding.
///   `1` allows direct translation only, `2` allows one level of composition.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub allow_silent_override: bool,
    pub max_translator_hops: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allow_silent_override: false,
            max_translator_hops: 2,
        }
    }
}
