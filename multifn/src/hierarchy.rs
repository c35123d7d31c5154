//! Ad-hoc ancestor hierarchies over dispatch values.
//!
//! A [`Hierarchy`] is an immutable snapshot of `derive` relationships:
//! direct parents plus the transitive ancestor and descendant closures.
//! Editing a hierarchy produces a new snapshot. Multimethods never edit a
//! hierarchy; they read one through a [`HierarchySource`] and treat every
//! distinct snapshot (by `Arc` identity) as a new version.
//!
//! # Example
//!
//! ```
//! use multifn::{DispatchValue, Hierarchy, HierarchySource, SharedHierarchy};
//!
//! let shape = DispatchValue::keyword("geo", "shape");
//! let circle = DispatchValue::keyword("geo", "circle");
//!
//! let shared = SharedHierarchy::new();
//! let before = shared.snapshot();
//! shared.derive(circle.clone(), shape.clone()).unwrap();
//! let after = shared.snapshot();
//!
//! assert!(after.isa(&circle, &shape));
//! assert!(!before.isa(&circle, &shape));
//! ```

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::HierarchyError;
use crate::value::DispatchValue;

type Relation = FxHashMap<DispatchValue, FxHashSet<DispatchValue>>;

/// An immutable snapshot of ancestor relationships.
#[derive(Clone, Default)]
pub struct Hierarchy {
    /// child -> direct parents
    parents: Relation,
    /// child -> all ancestors
    ancestors: Relation,
    /// parent -> all descendants
    descendants: Relation,
}

impl Hierarchy {
    /// An empty hierarchy.
    pub fn new() -> Self {
        Self::default()
    }

    /// A new snapshot in which `child` derives from `parent`.
    ///
    /// Fails if `child == parent` or if `parent` already derives from
    /// `child`.
    pub fn derive(
        &self,
        child: DispatchValue,
        parent: DispatchValue,
    ) -> Result<Hierarchy, HierarchyError> {
        if child == parent {
            return Err(HierarchyError::SelfDerivation(child));
        }
        if self.isa(&parent, &child) {
            return Err(HierarchyError::CyclicDerivation { child, parent });
        }
        if self.parents.get(&child).is_some_and(|ps| ps.contains(&parent)) {
            return Ok(self.clone());
        }

        let mut parents = self.parents.clone();
        parents.entry(child).or_default().insert(parent);
        Ok(Self::from_parents(parents))
    }

    /// A new snapshot without the direct `child -> parent` edge.
    pub fn underive(&self, child: &DispatchValue, parent: &DispatchValue) -> Hierarchy {
        let mut parents = self.parents.clone();
        if let Some(ps) = parents.get_mut(child) {
            ps.remove(parent);
            if ps.is_empty() {
                parents.remove(child);
            }
        }
        Self::from_parents(parents)
    }

    /// Reflexive, transitive `derive` check. Built-in type subtyping is not
    /// consulted here; see [`crate::Relations::is_a`].
    pub fn isa(&self, child: &DispatchValue, parent: &DispatchValue) -> bool {
        child == parent
            || self
                .ancestors
                .get(child)
                .is_some_and(|a| a.contains(parent))
    }

    /// Direct parents of `child`, if any were derived.
    pub fn parents(&self, child: &DispatchValue) -> Option<&FxHashSet<DispatchValue>> {
        self.parents.get(child)
    }

    /// All ancestors of `child`, if any.
    pub fn ancestors(&self, child: &DispatchValue) -> Option<&FxHashSet<DispatchValue>> {
        self.ancestors.get(child)
    }

    /// All descendants of `parent`, if any.
    pub fn descendants(&self, parent: &DispatchValue) -> Option<&FxHashSet<DispatchValue>> {
        self.descendants.get(parent)
    }

    /// Number of values with at least one derived parent.
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    fn from_parents(parents: Relation) -> Self {
        let mut ancestors = Relation::default();
        for child in parents.keys() {
            let mut found = FxHashSet::default();
            let mut stack: Vec<&DispatchValue> = parents[child].iter().collect();
            while let Some(p) = stack.pop() {
                if found.insert(p.clone()) {
                    if let Some(pps) = parents.get(p) {
                        stack.extend(pps.iter());
                    }
                }
            }
            ancestors.insert(child.clone(), found);
        }

        let mut descendants = Relation::default();
        for (child, ancs) in &ancestors {
            for a in ancs {
                descendants
                    .entry(a.clone())
                    .or_default()
                    .insert(child.clone());
            }
        }

        Hierarchy {
            parents,
            ancestors,
            descendants,
        }
    }
}

impl fmt::Debug for Hierarchy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<Hierarchy: {} relationships>", self.parents.len())
    }
}

/// A dereferenceable source of hierarchy snapshots.
///
/// Each call returns the current snapshot. Implementations must return the
/// *same* `Arc` until the hierarchy changes: multimethods compare snapshots
/// with [`Arc::ptr_eq`] to decide whether their method cache is stale.
pub trait HierarchySource: Send + Sync {
    fn snapshot(&self) -> Arc<Hierarchy>;
}

impl HierarchySource for ArcSwap<Hierarchy> {
    fn snapshot(&self) -> Arc<Hierarchy> {
        self.load_full()
    }
}

impl<S: HierarchySource + ?Sized> HierarchySource for Arc<S> {
    fn snapshot(&self) -> Arc<Hierarchy> {
        (**self).snapshot()
    }
}

/// A mutable reference to a hierarchy, shared between multimethods.
///
/// Every successful edit publishes a fresh snapshot.
#[derive(Default)]
pub struct SharedHierarchy {
    current: ArcSwap<Hierarchy>,
    writer: Mutex<()>,
}

impl SharedHierarchy {
    pub fn new() -> Self {
        Self::from_hierarchy(Hierarchy::new())
    }

    pub fn from_hierarchy(hierarchy: Hierarchy) -> Self {
        Self {
            current: ArcSwap::from_pointee(hierarchy),
            writer: Mutex::new(()),
        }
    }

    /// Derive `child` from `parent` and publish the result.
    pub fn derive(
        &self,
        child: DispatchValue,
        parent: DispatchValue,
    ) -> Result<(), HierarchyError> {
        let _guard = self.writer.lock();
        let next = self.current.load().derive(child, parent)?;
        self.current.store(Arc::new(next));
        Ok(())
    }

    /// Remove the `child -> parent` edge and publish the result.
    pub fn underive(&self, child: &DispatchValue, parent: &DispatchValue) {
        let _guard = self.writer.lock();
        let next = self.current.load().underive(child, parent);
        self.current.store(Arc::new(next));
    }

    /// Replace the whole hierarchy.
    pub fn replace(&self, hierarchy: Hierarchy) {
        let _guard = self.writer.lock();
        self.current.store(Arc::new(hierarchy));
    }
}

impl HierarchySource for SharedHierarchy {
    fn snapshot(&self) -> Arc<Hierarchy> {
        self.current.load_full()
    }
}

impl fmt::Debug for SharedHierarchy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedHierarchy")
            .field(&*self.current.load())
            .finish()
    }
}
