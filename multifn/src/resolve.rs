//! Method resolution: the unique most specific applicable method.
//!
//! An entry `(k, m)` of the method table is applicable to a dispatch value
//! `v` when `is_a(v, k)`. Among applicable entries resolution keeps the
//! *minimal* ones under dominance: an entry survives unless some other
//! applicable key dominates it. One survivor resolves; none falls back to
//! the default method; several are ambiguous.

use crate::relation::Relations;
use crate::table::{Method, MethodTable};
use crate::value::DispatchValue;

/// Outcome of resolving one dispatch value.
pub enum Resolution<A, R> {
    /// A unique most specific method.
    Resolved {
        /// The key the method is registered under.
        key: DispatchValue,
        method: Method<A, R>,
    },
    /// Nothing applied; the method registered for the default value.
    Default(Method<A, R>),
    /// Nothing applied and there is no default method.
    NoMatch,
    /// Several mutually non-dominating keys applied. Sorted by display form.
    Ambiguous(Vec<DispatchValue>),
}

impl<A, R> Resolution<A, R> {
    /// The method to cache and call, if resolution found one.
    pub fn method(&self) -> Option<&Method<A, R>> {
        match self {
            Resolution::Resolved { method, .. } | Resolution::Default(method) => Some(method),
            Resolution::NoMatch | Resolution::Ambiguous(_) => None,
        }
    }

    pub fn into_method(self) -> Option<Method<A, R>> {
        match self {
            Resolution::Resolved { method, .. } | Resolution::Default(method) => Some(method),
            Resolution::NoMatch | Resolution::Ambiguous(_) => None,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Resolution::Ambiguous(_))
    }
}

impl<A, R> std::fmt::Debug for Resolution<A, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::Resolved { key, .. } => f.debug_tuple("Resolved").field(key).finish(),
            Resolution::Default(_) => f.write_str("Default"),
            Resolution::NoMatch => f.write_str("NoMatch"),
            Resolution::Ambiguous(keys) => f.debug_tuple("Ambiguous").field(keys).finish(),
        }
    }
}

/// Resolve `value` against `methods` under `relations`.
///
/// `default` is the multimethod's default dispatch value, consulted only
/// when no entry applies.
pub fn resolve<A, R>(
    relations: &Relations<'_>,
    methods: &MethodTable<A, R>,
    value: &DispatchValue,
    default: Option<&DispatchValue>,
) -> Resolution<A, R> {
    let mut minima: Vec<(&DispatchValue, &Method<A, R>)> = Vec::new();

    for (key, method) in methods.iter() {
        if relations.is_a(value, key) {
            update_minima(relations, &mut minima, key, method);
        }
    }

    match minima.len() {
        0 => default
            .and_then(|d| methods.get(d))
            .map_or(Resolution::NoMatch, |m| Resolution::Default(m.clone())),
        1 => {
            let (key, method) = minima[0];
            Resolution::Resolved {
                key: key.clone(),
                method: method.clone(),
            }
        }
        _ => {
            let mut keys: Vec<DispatchValue> = minima.into_iter().map(|(k, _)| k.clone()).collect();
            keys.sort_by_cached_key(ToString::to_string);
            Resolution::Ambiguous(keys)
        }
    }
}

/// Insert `key` into the set of minimal keys.
///
/// Every current minimum that `key` dominates is dropped. `key` is added
/// unless some current minimum dominates it.
fn update_minima<'t, A, R>(
    relations: &Relations<'_>,
    minima: &mut Vec<(&'t DispatchValue, &'t Method<A, R>)>,
    key: &'t DispatchValue,
    method: &'t Method<A, R>,
) {
    let mut add = true;
    minima.retain(|&(existing, _)| {
        if relations.dominates(key, existing) {
            return false;
        }
        if relations.dominates(existing, key) {
            add = false;
        }
        true
    });
    if add {
        minima.push((key, method));
    }
}
