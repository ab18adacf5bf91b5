use std::{
    borrow::Cow,
    fmt::{self, Display, Formatter},
};

use crate::any::TypeInfo;

/// Tag distinguishing several bindings of the same type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(Cow<'static, str>);

impl Tag {
    #[inline]
    #[must_use]
    pub const fn new(tag: &'static str) -> Self {
        Self(Cow::Borrowed(tag))
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Tag {
    fn from(tag: &'static str) -> Self {
        Self(Cow::Borrowed(tag))
    }
}

impl From<String> for Tag {
    fn from(tag: String) -> Self {
        Self(Cow::Owned(tag))
    }
}

/// Conversion into an optional tag, so retrievals accept `()`, `"tag"`, `String`, [`Tag`] and their `Option`s.
pub trait IntoTag {
    fn into_tag(self) -> Option<Tag>;
}

impl IntoTag for () {
    #[inline]
    fn into_tag(self) -> Option<Tag> {
        None
    }
}

impl IntoTag for Tag {
    #[inline]
    fn into_tag(self) -> Option<Tag> {
        Some(self)
    }
}

impl IntoTag for &'static str {
    #[inline]
    fn into_tag(self) -> Option<Tag> {
        Some(Tag::from(self))
    }
}

impl IntoTag for String {
    #[inline]
    fn into_tag(self) -> Option<Tag> {
        Some(Tag::from(self))
    }
}

impl<T: IntoTag> IntoTag for Option<T> {
    #[inline]
    fn into_tag(self) -> Option<Tag> {
        self.and_then(IntoTag::into_tag)
    }
}

/// Identity of a dependency request or of a declared binding.
///
/// `()` as argument type means "no argument", `()` as context type means "no context".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key {
    pub bound: TypeInfo,
    pub tag: Option<Tag>,
    pub arg: TypeInfo,
    pub context: TypeInfo,
}

impl Key {
    #[inline]
    #[must_use]
    pub fn new(bound: TypeInfo, arg: TypeInfo, context: TypeInfo, tag: Option<Tag>) -> Self {
        Self { bound, tag, arg, context }
    }

    #[inline]
    #[must_use]
    pub fn of<T, A, C>(tag: Option<Tag>) -> Self
    where
        T: ?Sized + 'static,
        A: 'static,
        C: 'static,
    {
        Self::new(TypeInfo::of::<T>(), TypeInfo::of::<A>(), TypeInfo::of::<C>(), tag)
    }

    #[inline]
    #[must_use]
    pub(crate) fn signature(&self) -> Signature {
        Signature {
            bound: self.bound,
            tag: self.tag.clone(),
            arg: self.arg,
        }
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bound)?;
        if let Some(tag) = &self.tag {
            write!(f, "(tag = \"{tag}\")")?;
        }
        if !self.arg.is_unit() {
            write!(f, " with argument {}", self.arg)?;
        }
        if !self.context.is_unit() {
            write!(f, " on {}", self.context)?;
        }
        Ok(())
    }
}

/// Key without its context type.
/// Bindings sharing a signature differ only by the context they require.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct Signature {
    pub(crate) bound: TypeInfo,
    pub(crate) tag: Option<Tag>,
    pub(crate) arg: TypeInfo,
}

impl Signature {
    #[inline]
    #[must_use]
    pub(crate) fn with_arg(&self, arg: TypeInfo) -> Self {
        Self {
            bound: self.bound,
            tag: self.tag.clone(),
            arg,
        }
    }

    #[inline]
    #[must_use]
    pub(crate) fn key(&self, context: TypeInfo) -> Key {
        Key::new(self.bound, self.arg, context, self.tag.clone())
    }
}
