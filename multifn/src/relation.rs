//! Specificity, preference and dominance between dispatch values.
//!
//! All three relations are evaluated against an explicit snapshot: the
//! hierarchy (if the multimethod has one) and the preference table. Nothing
//! here reads shared state, so a resolution that captured a snapshot can run
//! without holding any lock.
//!
//! # isA
//!
//! `is_a(child, parent)` holds when a method for `parent` applies to
//! `child`:
//!
//! 1. equal values;
//! 2. two type tags where `parent` is a built-in supertype of `child`;
//! 3. `parent` is a hierarchy ancestor of `child`, or of any built-in
//!    supertype of a type tag `child`;
//! 4. two signatures or two vectors of the same arity whose positions
//!    are pairwise `is_a`.
//!
//! # prefers
//!
//! `prefers(x, y)` holds when `y` is reachable from `x` through explicit
//! preferences, where from any value the search may also step to a
//! preference-table key it `is_a`, or to one of its parents.

use rustc_hash::FxHashSet;

use crate::hierarchy::Hierarchy;
use crate::signature::Signature;
use crate::table::PreferTable;
use crate::types::TypeTag;
use crate::value::DispatchValue;

/// The specificity and preference relations over one snapshot.
#[derive(Debug, Clone, Copy)]
pub struct Relations<'a> {
    hierarchy: Option<&'a Hierarchy>,
    prefer_table: &'a PreferTable,
}

impl<'a> Relations<'a> {
    /// Relations for a multimethod with an optional hierarchy.
    ///
    /// Without a hierarchy only built-in type subtyping and structural
    /// matching apply.
    pub fn new(hierarchy: Option<&'a Hierarchy>, prefer_table: &'a PreferTable) -> Self {
        Self {
            hierarchy,
            prefer_table,
        }
    }

    pub fn hierarchy(&self) -> Option<&'a Hierarchy> {
        self.hierarchy
    }

    pub fn prefer_table(&self) -> &'a PreferTable {
        self.prefer_table
    }

    /// Is `child` at least as specific as `parent`?
    pub fn is_a(&self, child: &DispatchValue, parent: &DispatchValue) -> bool {
        if child == parent {
            return true;
        }
        if child.is_nil() {
            return false;
        }

        if let (DispatchValue::Type(c), DispatchValue::Type(p)) = (child, parent) {
            if p.is_assignable_from(c) {
                return true;
            }
        }

        if let Some(h) = self.hierarchy {
            if derives(h, child, parent) {
                return true;
            }
            if let DispatchValue::Type(c) = child {
                if supertypes(c).any(|s| derives(h, &s, parent)) {
                    return true;
                }
            }
        }

        match (child, parent) {
            (DispatchValue::Signature(c), DispatchValue::Signature(p)) => {
                self.is_a_signature(c, p)
            }
            (DispatchValue::Vector(c), DispatchValue::Vector(p)) => {
                c.len() == p.len() && c.iter().zip(p.iter()).all(|(c, p)| self.is_a(c, p))
            }
            _ => false,
        }
    }

    fn is_a_signature(&self, child: &Signature, parent: &Signature) -> bool {
        if child.len() != parent.len() {
            return false;
        }
        if parent.is_assignable_from(child) {
            return true;
        }
        if self.hierarchy.is_none() {
            // elementwise isA would only repeat the assignability check
            return false;
        }
        child
            .tags()
            .iter()
            .zip(parent.tags())
            .all(|(c, p)| self.is_a(&DispatchValue::Type(c.clone()), &DispatchValue::Type(p.clone())))
    }

    /// Is a method for `x` preferred over a method for `y`?
    pub fn prefers(&self, x: &DispatchValue, y: &DispatchValue) -> bool {
        let mut visited = FxHashSet::default();
        self.prefers_from(x, y, &mut visited)
    }

    fn prefers_from(
        &self,
        x: &DispatchValue,
        y: &DispatchValue,
        visited: &mut FxHashSet<DispatchValue>,
    ) -> bool {
        // `y` is fixed for the whole search, so a value already explored
        // (or being explored) cannot add a new proof.
        if !visited.insert(x.clone()) {
            return false;
        }

        // Step 1 and 2: explicit preference, then its transitive closure.
        if let Some(xprefs) = self.prefer_table.get(x) {
            if xprefs.contains(y) {
                return true;
            }
            for xx in xprefs {
                if self.prefers_from(xx, y, visited) {
                    return true;
                }
            }
        }

        // Step 3: a preference declared for a more general key applies to
        // every key that is_a it. Needed for signature and vector values.
        for k in self.prefer_table.keys() {
            if k != x && self.is_a(x, k) && self.prefers_from(k, y, visited) {
                return true;
            }
        }

        // Step 4: preferences of any parent.
        for p in self.parents(x) {
            if self.prefers_from(&p, y, visited) {
                return true;
            }
        }

        false
    }

    /// `prefers(x, y) || is_a(x, y)`.
    pub fn dominates(&self, x: &DispatchValue, y: &DispatchValue) -> bool {
        self.prefers(x, y) || self.is_a(x, y)
    }

    /// Immediate parents of `x`: its hierarchy parents, plus the superclass
    /// and direct interfaces of a type tag.
    pub fn parents(&self, x: &DispatchValue) -> Vec<DispatchValue> {
        let mut parents: Vec<DispatchValue> = self
            .hierarchy
            .and_then(|h| h.parents(x))
            .map(|ps| ps.iter().cloned().collect())
            .unwrap_or_default();
        if let DispatchValue::Type(t) = x {
            for base in t.bases() {
                let base = DispatchValue::Type(base.clone());
                if !parents.contains(&base) {
                    parents.push(base);
                }
            }
        }
        parents
    }
}

fn derives(h: &Hierarchy, child: &DispatchValue, parent: &DispatchValue) -> bool {
    h.ancestors(child).is_some_and(|a| a.contains(parent))
}

/// Built-in supertypes of a tag as dispatch values, nearest superclass first.
pub fn supertypes(tag: &TypeTag) -> impl Iterator<Item = DispatchValue> + '_ {
    tag.superclasses()
        .iter()
        .chain(tag.interfaces())
        .map(|t| DispatchValue::Type(t.clone()))
}
