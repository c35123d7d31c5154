//! Type signatures: tuples of type tags for multi-argument dispatch.
//!
//! Two- and three-position signatures get dedicated fixed-size
//! representations because they dominate real call sites; every other arity
//! uses a shared slice. The representation is private and chosen by arity,
//! so a signature of length two built through any constructor is the same
//! value.

use std::fmt;
use std::sync::Arc;

use crate::types::{TypeTag, Typed};
use crate::value::DispatchValue;

#[derive(Clone, PartialEq, Eq, Hash)]
enum Repr {
    Two([TypeTag; 2]),
    Three([TypeTag; 3]),
    Many(Arc<[TypeTag]>),
}

/// An ordered, fixed-size tuple of type tags.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Signature(Repr);

impl Signature {
    pub fn two(k0: TypeTag, k1: TypeTag) -> Self {
        Signature(Repr::Two([k0, k1]))
    }

    pub fn three(k0: TypeTag, k1: TypeTag, k2: TypeTag) -> Self {
        Signature(Repr::Three([k0, k1, k2]))
    }

    /// Signature of any arity, including zero.
    ///
    /// A one-position signature is its own shape: it is not equal to, and
    /// never matches, the bare type tag. Single-argument calls dispatch on
    /// the bare tag, which is what [`extract`] produces.
    pub fn new(tags: impl IntoIterator<Item = TypeTag>) -> Self {
        let tags: Vec<TypeTag> = tags.into_iter().collect();
        let tags = match <[TypeTag; 2]>::try_from(tags) {
            Ok(ks) => return Signature(Repr::Two(ks)),
            Err(tags) => tags,
        };
        let tags = match <[TypeTag; 3]>::try_from(tags) {
            Ok(ks) => return Signature(Repr::Three(ks)),
            Err(tags) => tags,
        };
        Signature(Repr::Many(tags.into()))
    }

    /// The zero-arity signature.
    pub fn empty() -> Self {
        Signature(Repr::Many(Arc::from(Vec::new())))
    }

    pub fn len(&self) -> usize {
        self.tags().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> Option<&TypeTag> {
        self.tags().get(i)
    }

    pub fn tags(&self) -> &[TypeTag] {
        match &self.0 {
            Repr::Two(ks) => ks,
            Repr::Three(ks) => ks,
            Repr::Many(ks) => ks,
        }
    }

    /// `true` if a method defined for `self` applies to arguments whose
    /// signature is `that`: same arity, and every position of `self` is
    /// assignable from the same position of `that`.
    pub fn is_assignable_from(&self, that: &Signature) -> bool {
        match (&self.0, &that.0) {
            (Repr::Two([a0, a1]), Repr::Two([b0, b1])) => {
                a0.is_assignable_from(b0) && a1.is_assignable_from(b1)
            }
            (Repr::Three([a0, a1, a2]), Repr::Three([b0, b1, b2])) => {
                a0.is_assignable_from(b0) && a1.is_assignable_from(b1) && a2.is_assignable_from(b2)
            }
            (Repr::Many(a), Repr::Many(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(p, c)| p.is_assignable_from(c))
            }
            _ => false,
        }
    }

    /// Positional check against loose tags, avoiding a signature allocation.
    pub fn is_assignable_from_tags(&self, tags: &[TypeTag]) -> bool {
        let mine = self.tags();
        mine.len() == tags.len()
            && mine.iter().zip(tags).all(|(p, c)| p.is_assignable_from(c))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Signature").field(&self.tags()).finish()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, tag) in self.tags().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(tag.simple_name())?;
        }
        f.write_str(")")
    }
}

/// Dispatch value for an argument list.
///
/// No arguments give the empty signature, one argument its bare type tag,
/// two or more a signature. A null argument yields [`DispatchValue::Nil`]
/// when alone; in a longer list it makes the whole value a vector so the
/// null position is still represented.
pub fn extract<T: Typed>(args: &[T]) -> DispatchValue {
    match args {
        [] => DispatchValue::Signature(Signature::empty()),
        [x] => DispatchValue::from(x.type_tag()),
        _ => {
            let tags: Option<Vec<TypeTag>> = args.iter().map(Typed::type_tag).collect();
            match tags {
                Some(tags) => DispatchValue::Signature(Signature::new(tags)),
                None => DispatchValue::vector(args.iter().map(|x| DispatchValue::from(x.type_tag()))),
            }
        }
    }
}
