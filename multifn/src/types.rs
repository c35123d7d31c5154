//! Nominal type tags and built-in subtyping.
//!
//! A [`TypeTag`] names a runtime type. Every tag is either a *class*, which
//! may extend at most one superclass, or an *interface*; both may implement
//! any number of interfaces. Supertypes are fixed when the tag is defined,
//! so a tag's transitive supertype set is a pure function of the tag and is
//! memoized on first use.
//!
//! ```text
//!        Object            Comparable (interface)
//!          │                    ▲
//!        Number ────────────────┘
//!       ╱      ╲
//!   Integer   Double
//! ```
//!
//! # Example
//!
//! ```
//! use multifn::TypeTag;
//!
//! let comparable = TypeTag::interface("Comparable").build();
//! let number = TypeTag::class("Number").implements(&comparable).build();
//! let integer = TypeTag::class("Integer").extends(&number).build();
//!
//! assert!(number.is_assignable_from(&integer));
//! assert!(comparable.is_assignable_from(&integer));
//! assert!(!integer.is_assignable_from(&number));
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use rustc_hash::FxHashSet;

/// Source of process-unique type ids.
static NEXT_TYPE_ID: AtomicU64 = AtomicU64::new(1);

/// Whether a tag is a class or an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// A class: at most one superclass.
    Class,
    /// An interface: no superclass.
    Interface,
}

struct TypeInfo {
    id: u64,
    name: Arc<str>,
    kind: TypeKind,
    superclass: Option<TypeTag>,
    interfaces: Vec<TypeTag>,
    supertypes: OnceLock<Supertypes>,
}

/// Memoized transitive supertypes of a tag.
struct Supertypes {
    /// Superclass chain, nearest first.
    superclasses: Vec<TypeTag>,
    /// Every interface implemented directly or inherited, in discovery order.
    interfaces: Vec<TypeTag>,
    /// Ids of all of the above.
    ids: FxHashSet<u64>,
}

/// A nominal runtime type.
///
/// Cloning is cheap. Equality and hashing use the tag's identity, so two tags
/// defined separately with the same name are distinct types.
#[derive(Clone)]
pub struct TypeTag(Arc<TypeInfo>);

impl TypeTag {
    /// Start defining a class.
    pub fn class(name: impl Into<Arc<str>>) -> TypeBuilder {
        TypeBuilder::new(name.into(), TypeKind::Class)
    }

    /// Start defining an interface.
    pub fn interface(name: impl Into<Arc<str>>) -> TypeBuilder {
        TypeBuilder::new(name.into(), TypeKind::Interface)
    }

    /// Process-unique identity of this tag.
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// Fully qualified name, as given at definition.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// The last `.`- or `::`-separated segment of the name.
    pub fn simple_name(&self) -> &str {
        let name = self.name();
        let tail = name.rsplit("::").next().unwrap_or(name);
        tail.rsplit('.').next().unwrap_or(tail)
    }

    pub fn kind(&self) -> TypeKind {
        self.0.kind
    }

    pub fn is_interface(&self) -> bool {
        self.0.kind == TypeKind::Interface
    }

    /// The direct superclass, if any.
    pub fn superclass(&self) -> Option<&TypeTag> {
        self.0.superclass.as_ref()
    }

    /// Directly implemented interfaces.
    pub fn direct_interfaces(&self) -> &[TypeTag] {
        &self.0.interfaces
    }

    /// Direct supertypes: the superclass followed by the direct interfaces.
    pub fn bases(&self) -> impl Iterator<Item = &TypeTag> {
        self.0.superclass.iter().chain(self.0.interfaces.iter())
    }

    /// Transitive superclass chain, nearest first.
    pub fn superclasses(&self) -> &[TypeTag] {
        &self.supertypes().superclasses
    }

    /// All interfaces implemented by this tag, its superclasses, and
    /// (recursively) by those interfaces.
    pub fn interfaces(&self) -> &[TypeTag] {
        &self.supertypes().interfaces
    }

    /// `true` if a value of type `other` can be used where `self` is expected.
    ///
    /// Reflexive: every tag is assignable from itself.
    pub fn is_assignable_from(&self, other: &TypeTag) -> bool {
        self == other || other.supertypes().ids.contains(&self.id())
    }

    fn supertypes(&self) -> &Supertypes {
        self.0.supertypes.get_or_init(|| Supertypes::collect(self))
    }
}

impl Supertypes {
    fn collect(tag: &TypeTag) -> Self {
        let mut superclasses = Vec::new();
        let mut current = tag.superclass();
        while let Some(c) = current {
            superclasses.push(c.clone());
            current = c.superclass();
        }

        let mut interfaces = Vec::new();
        let mut seen = FxHashSet::default();
        let mut stack: Vec<&TypeTag> = Vec::new();
        for c in std::iter::once(tag).chain(superclasses.iter()) {
            stack.extend(c.direct_interfaces().iter().rev());
            while let Some(i) = stack.pop() {
                if seen.insert(i.id()) {
                    interfaces.push(i.clone());
                    stack.extend(i.direct_interfaces().iter().rev());
                }
            }
        }

        let ids = superclasses
            .iter()
            .chain(interfaces.iter())
            .map(TypeTag::id)
            .collect();

        Supertypes {
            superclasses,
            interfaces,
            ids,
        }
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for TypeTag {}

impl Hash for TypeTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name(), self.id())
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Builder for a [`TypeTag`].
pub struct TypeBuilder {
    name: Arc<str>,
    kind: TypeKind,
    superclass: Option<TypeTag>,
    interfaces: Vec<TypeTag>,
}

impl TypeBuilder {
    fn new(name: Arc<str>, kind: TypeKind) -> Self {
        Self {
            name,
            kind,
            superclass: None,
            interfaces: Vec::new(),
        }
    }

    /// Set the superclass. Ignored for interfaces, which extend other
    /// interfaces through [`TypeBuilder::implements`].
    pub fn extends(mut self, superclass: &TypeTag) -> Self {
        if self.kind == TypeKind::Class {
            self.superclass = Some(superclass.clone());
        }
        self
    }

    /// Add a directly implemented (or, for interfaces, extended) interface.
    pub fn implements(mut self, interface: &TypeTag) -> Self {
        if !self.interfaces.contains(interface) {
            self.interfaces.push(interface.clone());
        }
        self
    }

    /// Allocate the tag.
    pub fn build(self) -> TypeTag {
        TypeTag(Arc::new(TypeInfo {
            id: NEXT_TYPE_ID.fetch_add(1, Ordering::Relaxed),
            name: self.name,
            kind: self.kind,
            superclass: self.superclass,
            interfaces: self.interfaces,
            supertypes: OnceLock::new(),
        }))
    }
}

/// Runtime values that know their type tag.
///
/// Implemented by argument types so the stock dispatch functions in
/// [`crate::dispatch`] can compute type and signature dispatch values.
pub trait Typed {
    /// The tag of this value's runtime type, or `None` for a null value.
    fn type_tag(&self) -> Option<TypeTag>;
}

impl<T: Typed> Typed for &T {
    fn type_tag(&self) -> Option<TypeTag> {
        (**self).type_tag()
    }
}

impl<T: Typed> Typed for Option<T> {
    fn type_tag(&self) -> Option<TypeTag> {
        self.as_ref().and_then(Typed::type_tag)
    }
}

/// Null-safe assignability: `None` is assignable only to `None`.
pub fn is_assignable_from(parent: Option<&TypeTag>, child: Option<&TypeTag>) -> bool {
    match (parent, child) {
        (None, child) => child.is_none(),
        (Some(_), None) => false,
        (Some(p), Some(c)) => p.is_assignable_from(c),
    }
}

/// Null-safe type name.
pub fn type_name(tag: Option<&TypeTag>) -> &str {
    tag.map_or("nil", TypeTag::name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_not_name() {
        let a = TypeTag::class("A").build();
        let a2 = TypeTag::class("A").build();
        assert_ne!(a, a2);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_superclass_chain() {
        let object = TypeTag::class("Object").build();
        let number = TypeTag::class("Number").extends(&object).build();
        let integer = TypeTag::class("Integer").extends(&number).build();

        assert_eq!(integer.superclasses(), &[number.clone(), object.clone()]);
        assert!(object.is_assignable_from(&integer));
        assert!(!integer.is_assignable_from(&object));
        assert!(integer.is_assignable_from(&integer));
    }

    #[test]
    fn test_transitive_interfaces() {
        let iterable = TypeTag::interface("Iterable").build();
        let collection = TypeTag::interface("Collection")
            .implements(&iterable)
            .build();
        let list = TypeTag::interface("List").implements(&collection).build();
        let base = TypeTag::class("AbstractList").implements(&list).build();
        let array_list = TypeTag::class("ArrayList").extends(&base).build();

        let names: Vec<_> = array_list.interfaces().iter().map(TypeTag::name).collect();
        assert_eq!(names, vec!["List", "Collection", "Iterable"]);
        assert!(iterable.is_assignable_from(&array_list));
        assert!(collection.is_assignable_from(&list));
    }

    #[test]
    fn test_interface_ignores_superclass() {
        let object = TypeTag::class("Object").build();
        let marker = TypeTag::interface("Marker").extends(&object).build();
        assert!(marker.superclass().is_none());
        assert!(marker.is_interface());
        assert!(!object.is_interface());
    }

    #[test]
    fn test_simple_name() {
        assert_eq!(TypeTag::class("java.lang.Long").build().simple_name(), "Long");
        assert_eq!(TypeTag::class("num::Ratio").build().simple_name(), "Ratio");
        assert_eq!(TypeTag::class("Plain").build().simple_name(), "Plain");
    }

    #[test]
    fn test_null_safe_assignability() {
        let a = TypeTag::class("A").build();
        assert!(is_assignable_from(None, None));
        assert!(!is_assignable_from(None, Some(&a)));
        assert!(!is_assignable_from(Some(&a), None));
        assert!(is_assignable_from(Some(&a), Some(&a)));
        assert_eq!(type_name(None), "nil");
    }
}
