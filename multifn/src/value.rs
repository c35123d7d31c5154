//! Dispatch values: the keys that select a method.

use std::fmt;
use std::sync::Arc;

use crate::signature::Signature;
use crate::types::TypeTag;

/// A symbolic tag such as `:shape/circle`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Keyword {
    namespace: Option<Arc<str>>,
    name: Arc<str>,
}

impl Keyword {
    /// A namespaced keyword, `:namespace/name`.
    pub fn new(namespace: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }

    /// A keyword without a namespace, `:name`.
    pub fn simple(name: impl Into<Arc<str>>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_namespaced(&self) -> bool {
        self.namespace.is_some()
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, ":{}/{}", ns, self.name),
            None => write!(f, ":{}", self.name),
        }
    }
}

/// A value used to select a method.
///
/// Dispatch values are immutable and compare by value: type tags by
/// identity, signatures and vectors elementwise. Constructing the same logical
/// value twice yields equal, equally-hashed keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DispatchValue {
    /// The null value. Legal, but has no ancestors.
    Nil,
    /// The `:default` sentinel.
    Default,
    /// A runtime type.
    Type(TypeTag),
    /// A symbolic tag.
    Keyword(Keyword),
    /// A fixed-size tuple of type tags.
    Signature(Signature),
    /// A nested vector of dispatch values, for structural dispatch.
    Vector(Arc<[DispatchValue]>),
    /// An integer. Only legal under the unchecked policy.
    Int(i64),
    /// A string. Only legal under the unchecked policy.
    Str(Arc<str>),
}

impl DispatchValue {
    /// Namespaced keyword shorthand.
    pub fn keyword(namespace: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        DispatchValue::Keyword(Keyword::new(namespace, name))
    }

    /// Build a composite dispatch value.
    pub fn vector(items: impl IntoIterator<Item = DispatchValue>) -> Self {
        DispatchValue::Vector(items.into_iter().collect())
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, DispatchValue::Nil)
    }

    pub fn as_type(&self) -> Option<&TypeTag> {
        match self {
            DispatchValue::Type(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_signature(&self) -> Option<&Signature> {
        match self {
            DispatchValue::Signature(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&[DispatchValue]> {
        match self {
            DispatchValue::Vector(items) => Some(items),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            DispatchValue::Nil => "nil",
            DispatchValue::Default => "default",
            DispatchValue::Type(_) => "type",
            DispatchValue::Keyword(_) => "keyword",
            DispatchValue::Signature(_) => "signature",
            DispatchValue::Vector(_) => "vector",
            DispatchValue::Int(_) => "int",
            DispatchValue::Str(_) => "string",
        }
    }
}

impl From<TypeTag> for DispatchValue {
    fn from(tag: TypeTag) -> Self {
        DispatchValue::Type(tag)
    }
}

impl From<&TypeTag> for DispatchValue {
    fn from(tag: &TypeTag) -> Self {
        DispatchValue::Type(tag.clone())
    }
}

impl From<Option<TypeTag>> for DispatchValue {
    fn from(tag: Option<TypeTag>) -> Self {
        tag.map_or(DispatchValue::Nil, DispatchValue::Type)
    }
}

impl From<Keyword> for DispatchValue {
    fn from(kw: Keyword) -> Self {
        DispatchValue::Keyword(kw)
    }
}

impl From<Signature> for DispatchValue {
    fn from(sig: Signature) -> Self {
        DispatchValue::Signature(sig)
    }
}

impl From<Vec<DispatchValue>> for DispatchValue {
    fn from(items: Vec<DispatchValue>) -> Self {
        DispatchValue::Vector(items.into())
    }
}

impl From<i64> for DispatchValue {
    fn from(n: i64) -> Self {
        DispatchValue::Int(n)
    }
}

impl From<&str> for DispatchValue {
    fn from(s: &str) -> Self {
        DispatchValue::Str(s.into())
    }
}

impl fmt::Display for DispatchValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchValue::Nil => f.write_str("nil"),
            DispatchValue::Default => f.write_str(":default"),
            DispatchValue::Type(t) => write!(f, "{}", t),
            DispatchValue::Keyword(k) => write!(f, "{}", k),
            DispatchValue::Signature(s) => write!(f, "{}", s),
            DispatchValue::Vector(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            DispatchValue::Int(n) => write!(f, "{}", n),
            DispatchValue::Str(s) => write!(f, "{:?}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    fn hash_of(v: &DispatchValue) -> u64 {
        let mut h = DefaultHasher::new();
        v.hash(&mut h);
        h.finish()
    }

    #[test]
    fn test_reconstructed_values_are_equal() {
        let a = TypeTag::class("A").build();
        let b = TypeTag::class("B").build();
        let v1 = DispatchValue::vector([a.clone().into(), DispatchValue::keyword("x", "y")]);
        let v2 = DispatchValue::vector([a.into(), DispatchValue::keyword("x", "y")]);
        assert_eq!(v1, v2);
        assert_eq!(hash_of(&v1), hash_of(&v2));

        let v3 = DispatchValue::vector([b.into(), DispatchValue::keyword("x", "y")]);
        assert_ne!(v1, v3);
    }

    #[test]
    fn test_display() {
        let a = TypeTag::class("A").build();
        let v = DispatchValue::vector([
            DispatchValue::Nil,
            a.into(),
            DispatchValue::keyword("shape", "circle"),
            Keyword::simple("plain").into(),
        ]);
        assert_eq!(v.to_string(), "[nil A :shape/circle :plain]");
        assert_eq!(DispatchValue::Default.to_string(), ":default");
    }

    #[test]
    fn test_variant_accessors() {
        let a = TypeTag::class("A").build();
        let ty: DispatchValue = a.clone().into();
        let sig: DispatchValue = Signature::two(a.clone(), a.clone()).into();
        let vec = DispatchValue::vector([DispatchValue::Nil, ty.clone()]);

        assert_eq!(ty.as_type(), Some(&a));
        assert_eq!(sig.as_signature().map(Signature::len), Some(2));
        assert_eq!(vec.as_vector().map(<[DispatchValue]>::len), Some(2));
        assert!(ty.as_signature().is_none());
        assert!(sig.as_vector().is_none());
        assert!(vec.as_type().is_none());

        let kinds: Vec<&str> = [
            DispatchValue::Nil,
            DispatchValue::Default,
            ty,
            DispatchValue::keyword("x", "y"),
            sig,
            vec,
            DispatchValue::Int(1),
            DispatchValue::from("s"),
        ]
        .iter()
        .map(DispatchValue::kind_name)
        .collect();
        assert_eq!(
            kinds,
            ["nil", "default", "type", "keyword", "signature", "vector", "int", "string"]
        );
    }

    #[test]
    fn test_optional_type_conversion() {
        assert_eq!(DispatchValue::from(None::<TypeTag>), DispatchValue::Nil);
    }
}
