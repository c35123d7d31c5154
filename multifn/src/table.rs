//! Copy-on-write method and preference tables.
//!
//! Tables are never mutated in place once published. Every edit builds a new
//! table from the old one, so a reader holding an `Arc` to a table always
//! sees a complete, consistent version.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};

use crate::value::DispatchValue;

/// An implementation callable.
pub type Method<A, R> = Arc<dyn Fn(&[A]) -> R + Send + Sync>;

/// Dispatch value -> method.
///
/// Iteration follows registration order, which keeps resolution and its
/// diagnostics deterministic.
pub struct MethodTable<A, R> {
    methods: IndexMap<DispatchValue, Method<A, R>, FxBuildHasher>,
}

impl<A, R> MethodTable<A, R> {
    pub fn new() -> Self {
        Self {
            methods: IndexMap::default(),
        }
    }

    pub fn get(&self, value: &DispatchValue) -> Option<&Method<A, R>> {
        self.methods.get(value)
    }

    pub fn contains(&self, value: &DispatchValue) -> bool {
        self.methods.contains_key(value)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &DispatchValue> {
        self.methods.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DispatchValue, &Method<A, R>)> {
        self.methods.iter()
    }

    /// A copy of this table with `value` bound to `method`.
    pub fn with_method(&self, value: DispatchValue, method: Method<A, R>) -> Self {
        let mut methods = self.methods.clone();
        methods.insert(value, method);
        Self { methods }
    }

    /// A copy of this table without `value`.
    pub fn without_method(&self, value: &DispatchValue) -> Self {
        let mut methods = self.methods.clone();
        methods.shift_remove(value);
        Self { methods }
    }
}

impl<A, R> Default for MethodTable<A, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, R> Clone for MethodTable<A, R> {
    fn clone(&self) -> Self {
        Self {
            methods: self.methods.clone(),
        }
    }
}

impl<A, R> fmt::Debug for MethodTable<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.methods.keys()).finish()
    }
}

/// Dispatch value -> values it is explicitly preferred over.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PreferTable {
    prefs: FxHashMap<DispatchValue, FxHashSet<DispatchValue>>,
}

impl PreferTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Values `x` was explicitly preferred over.
    pub fn get(&self, x: &DispatchValue) -> Option<&FxHashSet<DispatchValue>> {
        self.prefs.get(x)
    }

    /// `true` if `prefer_method(x, y)` was registered directly.
    pub fn contains(&self, x: &DispatchValue, y: &DispatchValue) -> bool {
        self.prefs.get(x).is_some_and(|ys| ys.contains(y))
    }

    pub fn keys(&self) -> impl Iterator<Item = &DispatchValue> {
        self.prefs.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DispatchValue, &FxHashSet<DispatchValue>)> {
        self.prefs.iter()
    }

    pub fn len(&self) -> usize {
        self.prefs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefs.is_empty()
    }

    /// A copy of this table with `y` added to the preferred-over set of `x`.
    pub fn with_preference(&self, x: DispatchValue, y: DispatchValue) -> Self {
        let mut prefs = self.prefs.clone();
        prefs.entry(x).or_default().insert(y);
        Self { prefs }
    }
}

impl fmt::Debug for PreferTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.prefs.iter()).finish()
    }
}
