//! Stock dispatch functions.
//!
//! Each is a plain function over an argument slice, usable directly as the
//! dispatch function of [`crate::MultiFn::builder`]:
//!
//! ```
//! use multifn::{dispatch, DispatchValue, MultiFn, TypeTag, Typed};
//!
//! #[derive(Clone)]
//! struct Num(TypeTag, f64);
//!
//! impl Typed for Num {
//!     fn type_tag(&self) -> Option<TypeTag> {
//!         Some(self.0.clone())
//!     }
//! }
//!
//! let float = TypeTag::class("Float").build();
//! let negate: MultiFn<Num, f64> = MultiFn::builder("negate", dispatch::by_type::<Num>)
//!     .build()
//!     .unwrap();
//! negate.add_method(&float, |args: &[Num]| -args[0].1).unwrap();
//!
//! assert_eq!(negate.invoke(&[Num(float, 2.0)]).unwrap(), -2.0);
//! ```

use crate::signature;
use crate::types::Typed;
use crate::value::DispatchValue;

/// Type tag of the first argument; `nil` for a null or missing argument.
pub fn by_type<A: Typed>(args: &[A]) -> DispatchValue {
    args.first()
        .and_then(Typed::type_tag)
        .map_or(DispatchValue::Nil, DispatchValue::Type)
}

/// Signature of the whole argument list.
///
/// See [`signature::extract`] for how arity and null arguments map to
/// dispatch values.
pub fn by_signature<A: Typed>(args: &[A]) -> DispatchValue {
    signature::extract(args)
}

/// A vector of per-argument type tags, with `nil` for null arguments.
///
/// Unlike [`by_signature`] this always produces a vector, for methods keyed
/// on nested structural values.
pub fn by_types<A: Typed>(args: &[A]) -> DispatchValue {
    DispatchValue::vector(args.iter().map(|a| DispatchValue::from(a.type_tag())))
}
