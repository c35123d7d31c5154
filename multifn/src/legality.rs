//! Which dispatch values a multimethod accepts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::DispatchValue;

/// Legality policy for dispatch values.
///
/// Checked on every registration and preference, and on lookup unless
/// disabled in [`crate::DispatchConfig`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LegalityPolicy {
    /// Nil, type tags, `:default`, namespaced keywords, signatures, and
    /// vectors of legal values.
    #[default]
    Hierarchy,
    /// Nil, type tags and signatures only.
    TypesOnly,
    /// Anything.
    Unchecked,
}

impl LegalityPolicy {
    /// Parse `hierarchy`, `types-only` or `unchecked`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hierarchy" => Some(LegalityPolicy::Hierarchy),
            "types-only" | "types_only" | "typesonly" => Some(LegalityPolicy::TypesOnly),
            "unchecked" => Some(LegalityPolicy::Unchecked),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LegalityPolicy::Hierarchy => "hierarchy",
            LegalityPolicy::TypesOnly => "types-only",
            LegalityPolicy::Unchecked => "unchecked",
        }
    }

    /// `true` if this policy accepts `value`.
    pub fn is_legal(self, value: &DispatchValue) -> bool {
        match self {
            LegalityPolicy::Hierarchy => legal_in_hierarchy(value),
            LegalityPolicy::TypesOnly => legal_types_only(value),
            LegalityPolicy::Unchecked => true,
        }
    }

    /// Whether multimethods under this policy may consult a hierarchy.
    pub fn allows_hierarchy(self) -> bool {
        self != LegalityPolicy::TypesOnly
    }
}

/// Nil, a type, a signature, or the vector `signature::extract` builds for
/// an argument list containing a null.
fn legal_types_only(value: &DispatchValue) -> bool {
    match value {
        DispatchValue::Nil | DispatchValue::Type(_) | DispatchValue::Signature(_) => true,
        DispatchValue::Vector(items) => items
            .iter()
            .all(|item| matches!(item, DispatchValue::Nil | DispatchValue::Type(_))),
        _ => false,
    }
}

fn legal_in_hierarchy(value: &DispatchValue) -> bool {
    match value {
        DispatchValue::Nil
        | DispatchValue::Default
        | DispatchValue::Type(_)
        | DispatchValue::Signature(_) => true,
        DispatchValue::Keyword(k) => k.is_namespaced(),
        DispatchValue::Vector(items) => items.iter().all(legal_in_hierarchy),
        DispatchValue::Int(_) | DispatchValue::Str(_) => false,
    }
}

impl fmt::Display for LegalityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::Signature;
    use crate::types::TypeTag;
    use crate::value::Keyword;

    #[test]
    fn test_hierarchy_policy() {
        let p = LegalityPolicy::Hierarchy;
        let t = TypeTag::class("T").build();

        assert!(p.is_legal(&DispatchValue::Nil));
        assert!(p.is_legal(&DispatchValue::Default));
        assert!(p.is_legal(&t.clone().into()));
        assert!(p.is_legal(&DispatchValue::keyword("ns", "k")));
        assert!(p.is_legal(&Signature::two(t.clone(), t.clone()).into()));
        assert!(p.is_legal(&DispatchValue::vector([
            DispatchValue::keyword("ns", "k"),
            DispatchValue::vector([t.clone().into()]),
        ])));

        assert!(!p.is_legal(&Keyword::simple("bare").into()));
        assert!(!p.is_legal(&DispatchValue::Int(3)));
        assert!(!p.is_legal(&DispatchValue::from("s")));
        assert!(!p.is_legal(&DispatchValue::vector([DispatchValue::Int(1)])));
    }

    #[test]
    fn test_types_only_policy() {
        let p = LegalityPolicy::TypesOnly;
        let t = TypeTag::class("T").build();

        assert!(p.is_legal(&DispatchValue::Nil));
        assert!(p.is_legal(&t.clone().into()));
        assert!(p.is_legal(&Signature::three(t.clone(), t.clone(), t.clone()).into()));
        assert!(!p.is_legal(&DispatchValue::Default));
        assert!(!p.is_legal(&DispatchValue::keyword("ns", "k")));
        assert!(p.is_legal(&DispatchValue::vector([t.clone().into(), DispatchValue::Nil])));
        assert!(!p.is_legal(&DispatchValue::vector([DispatchValue::vector([t.into()])])));
        assert!(!p.is_legal(&DispatchValue::vector([DispatchValue::keyword("ns", "k")])));
        assert!(!p.allows_hierarchy());
    }

    #[test]
    fn test_unchecked_accepts_everything() {
        let p = LegalityPolicy::Unchecked;
        assert!(p.is_legal(&DispatchValue::Int(3)));
        assert!(p.is_legal(&Keyword::simple("bare").into()));
    }

    #[test]
    fn test_parse() {
        assert_eq!(LegalityPolicy::parse("Types-Only"), Some(LegalityPolicy::TypesOnly));
        assert_eq!(LegalityPolicy::parse(" unchecked "), Some(LegalityPolicy::Unchecked));
        assert_eq!(LegalityPolicy::parse("strict"), None);
        for p in [
            LegalityPolicy::Hierarchy,
            LegalityPolicy::TypesOnly,
            LegalityPolicy::Unchecked,
        ] {
            assert_eq!(LegalityPolicy::parse(p.as_str()), Some(p));
        }
    }
}
