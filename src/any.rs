use std::{
    any::{type_name, Any, TypeId},
    cmp::Ordering,
    fmt::{self, Display, Formatter},
    hash::{Hash, Hasher},
    sync::Arc,
};

/// Runtime descriptor of a type, created at the call site.
///
/// Two descriptors are equal iff their [`TypeId`]s are equal, the name is only used for diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    pub name: &'static str,
    pub id: TypeId,
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl PartialOrd for TypeInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Display for TypeInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl TypeInfo {
    #[inline]
    #[must_use]
    pub fn of<T>() -> Self
    where
        T: ?Sized + 'static,
    {
        Self {
            name: type_name::<T>(),
            id: TypeId::of::<T>(),
        }
    }

    /// Descriptor of `()`, used both as "no argument" and "no context".
    #[inline]
    #[must_use]
    pub fn unit() -> Self {
        Self::of::<()>()
    }

    #[inline]
    #[must_use]
    pub fn is_unit(&self) -> bool {
        self.id == TypeId::of::<()>()
    }

    /// Type name without its module path, generic parameters keep their full paths.
    #[inline]
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split_once('<').map_or(self.name, |(base, _)| base);
        match base.rsplit_once("::") {
            Some((path, _)) => &self.name[path.len() + 2..],
            None => self.name,
        }
    }
}

pub(crate) type RcAny = Arc<dyn Any + Send + Sync>;
pub(crate) type BoxAny = Box<dyn Any + Send>;
