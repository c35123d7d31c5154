//! The multimethod: tables, cache and call forwarding.
//!
//! # Concurrency
//!
//! Each table lives in its own [`ArcSwap`] cell and is replaced wholesale on
//! every edit. A cache hit is a lock-free load of the current cache
//! snapshot. Edits take the write side of a per-multimethod lock for the
//! whole read-modify-write, then reset the cache.
//!
//! A cache miss resolves under the read lock against a captured snapshot of
//! the method table, preference table and hierarchy, then takes the write
//! lock to commit. If any of the three changed in between, the result is
//! discarded and resolution starts over.
//!
//! ```text
//!  get_method(v)
//!      │
//!      ├─ hierarchy changed? ──yes──▶ [write] reset cache
//!      │
//!      ├─ cache hit? ──yes──▶ return
//!      │
//!      └─ loop:
//!           [read]  snapshot (methods, prefs, hierarchy); resolve
//!           [write] snapshot still current? ──yes──▶ commit, return
//!                                          └─no───▶ reset cache, retry
//! ```

use std::fmt;
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use parking_lot::{RwLock, RwLockWriteGuard};
use tracing::{debug, trace, warn};

use crate::config::DispatchConfig;
use crate::error::{ConfigError, DispatchError, Result};
use crate::hierarchy::{Hierarchy, HierarchySource};
use crate::legality::LegalityPolicy;
use crate::relation::Relations;
use crate::resolve::{resolve, Resolution};
use crate::table::{Method, MethodTable, PreferTable};
use crate::value::DispatchValue;

/// Computes the dispatch value of an argument list.
pub type DispatchFn<A> = Arc<dyn Fn(&[A]) -> DispatchValue + Send + Sync>;

/// A function whose implementation is selected by the dispatch value of its
/// arguments.
///
/// `A` is the argument type and `R` the result type shared by every method.
pub struct MultiFn<A, R> {
    name: Arc<str>,
    dispatch_fn: DispatchFn<A>,
    config: DispatchConfig,
    default_dispatch: Option<DispatchValue>,
    hierarchy: Option<Arc<dyn HierarchySource>>,

    /// Serializes edits and cache commits.
    rw: RwLock<()>,
    method_table: ArcSwap<MethodTable<A, R>>,
    prefer_table: ArcSwap<PreferTable>,
    method_cache: ArcSwap<MethodTable<A, R>>,
    /// The hierarchy snapshot the cache was computed against.
    cached_hierarchy: ArcSwapOption<Hierarchy>,
}

impl<A, R> MultiFn<A, R> {
    /// Start building a multimethod.
    pub fn builder<F>(name: impl Into<Arc<str>>, dispatch_fn: F) -> MultiFnBuilder<A, R>
    where
        F: Fn(&[A]) -> DispatchValue + Send + Sync + 'static,
    {
        MultiFnBuilder::new(name.into(), Arc::new(dispatch_fn))
    }

    /// Start building a multimethod around an already shared dispatch
    /// function.
    pub fn builder_shared(name: impl Into<Arc<str>>, dispatch_fn: DispatchFn<A>) -> MultiFnBuilder<A, R> {
        MultiFnBuilder::new(name.into(), dispatch_fn)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> LegalityPolicy {
        self.config.policy
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// The value whose method is used when nothing else applies.
    pub fn default_dispatch(&self) -> Option<&DispatchValue> {
        self.default_dispatch.as_ref()
    }

    /// The dispatch value `args` would be looked up under.
    pub fn dispatch_value(&self, args: &[A]) -> DispatchValue {
        (self.dispatch_fn)(args)
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register `method` for `value`, replacing any previous method for it.
    pub fn add_method<F>(&self, value: impl Into<DispatchValue>, method: F) -> Result<&Self>
    where
        F: Fn(&[A]) -> R + Send + Sync + 'static,
    {
        self.add_shared_method(value, Arc::new(method))
    }

    /// Register an already shared method.
    pub fn add_shared_method(
        &self,
        value: impl Into<DispatchValue>,
        method: Method<A, R>,
    ) -> Result<&Self> {
        let value = value.into();
        self.check_legal(&value)?;

        let guard = self.rw.write();
        let next = self.method_table.load().with_method(value.clone(), method);
        self.method_table.store(Arc::new(next));
        self.reset_cache(&guard);

        debug!(multimethod = %self.name, value = %value, "added method");
        Ok(self)
    }

    /// Remove the method registered for `value`, if any.
    pub fn remove_method(&self, value: impl Into<DispatchValue>) -> Result<&Self> {
        let value = value.into();
        self.check_legal(&value)?;

        let guard = self.rw.write();
        let next = self.method_table.load().without_method(&value);
        self.method_table.store(Arc::new(next));
        self.reset_cache(&guard);

        debug!(multimethod = %self.name, value = %value, "removed method");
        Ok(self)
    }

    /// Prefer the method for `x` over the method for `y` when both apply.
    ///
    /// Fails if `y` is already preferred over `x` under the current
    /// hierarchy; the preference table is then left unchanged.
    pub fn prefer_method(
        &self,
        x: impl Into<DispatchValue>,
        y: impl Into<DispatchValue>,
    ) -> Result<&Self> {
        let (x, y) = (x.into(), y.into());
        self.check_legal(&x)?;
        self.check_legal(&y)?;

        let guard = self.rw.write();
        let prefs = self.prefer_table.load_full();
        let hierarchy = self.current_hierarchy();
        if Relations::new(hierarchy.as_deref(), &prefs).prefers(&y, &x) {
            return Err(DispatchError::PreferenceConflict {
                name: self.name.to_string(),
                preferred: x,
                over: y,
            });
        }
        self.prefer_table
            .store(Arc::new(prefs.with_preference(x.clone(), y.clone())));
        self.reset_cache(&guard);

        debug!(multimethod = %self.name, preferred = %x, over = %y, "added preference");
        Ok(self)
    }

    /// Drop every method and preference.
    pub fn reset(&self) -> &Self {
        let guard = self.rw.write();
        self.method_table.store(Arc::new(MethodTable::new()));
        self.prefer_table.store(Arc::new(PreferTable::new()));
        self.reset_cache(&guard);

        debug!(multimethod = %self.name, "reset");
        self
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// The method that handles `value`, or `None` if no method (and no
    /// default method) applies.
    ///
    /// Fails if `value` is illegal under the policy or if several methods
    /// apply and none dominates the others.
    pub fn get_method(&self, value: &DispatchValue) -> Result<Option<Method<A, R>>> {
        if self.hierarchy_changed() {
            let guard = self.rw.write();
            if self.hierarchy_changed() {
                self.reset_cache(&guard);
            }
        }

        if let Some(method) = self.method_cache.load().get(value) {
            trace!(multimethod = %self.name, value = %value, "cache hit");
            return Ok(Some(method.clone()));
        }

        trace!(multimethod = %self.name, value = %value, "cache miss");
        if self.config.validate_on_lookup {
            self.check_legal(value)?;
        }
        self.find_and_cache_best_method(value)
    }

    fn find_and_cache_best_method(&self, value: &DispatchValue) -> Result<Option<Method<A, R>>> {
        let mut retries = 0usize;
        loop {
            let (methods, prefs, hierarchy, resolution) = {
                let _read = self.rw.read();
                let methods = self.method_table.load_full();
                let prefs = self.prefer_table.load_full();
                let hierarchy = self.current_hierarchy();
                let relations = Relations::new(hierarchy.as_deref(), &prefs);
                let resolution =
                    resolve(&relations, &*methods, value, self.default_dispatch.as_ref());
                (methods, prefs, hierarchy, resolution)
            };

            let guard = self.rw.write();
            let current = Arc::ptr_eq(&methods, &*self.method_table.load())
                && Arc::ptr_eq(&prefs, &*self.prefer_table.load())
                && same_snapshot(hierarchy.as_ref(), self.current_hierarchy().as_ref());

            if current {
                debug!(multimethod = %self.name, value = %value, resolution = ?resolution, "resolved");
                return match resolution {
                    Resolution::Resolved { method, .. } | Resolution::Default(method) => {
                        let next = self.method_cache.load().with_method(value.clone(), method.clone());
                        self.method_cache.store(Arc::new(next));
                        Ok(Some(method))
                    }
                    Resolution::NoMatch => Ok(None),
                    Resolution::Ambiguous(candidates) => Err(DispatchError::AmbiguousDispatch {
                        name: self.name.to_string(),
                        value: value.clone(),
                        candidates,
                    }),
                };
            }

            self.reset_cache(&guard);
            retries += 1;
            if retries % self.config.retry_warn_threshold.max(1) == 0 {
                warn!(
                    multimethod = %self.name,
                    value = %value,
                    retries,
                    "method resolution keeps restarting after concurrent edits"
                );
            }
        }
    }

    // =========================================================================
    // Invocation
    // =========================================================================

    /// Compute the dispatch value of `args`, select a method and call it.
    ///
    /// The method runs outside any lock.
    pub fn invoke(&self, args: &[A]) -> Result<R> {
        let value = self.dispatch_value(args);
        match self.get_method(&value)? {
            Some(method) => Ok(method(args)),
            None => Err(DispatchError::NoMethod {
                name: self.name.to_string(),
                value,
            }),
        }
    }

    /// [`MultiFn::invoke`] with positional arguments followed by a
    /// variadic tail.
    pub fn invoke_spread(&self, fixed: &[A], rest: impl IntoIterator<Item = A>) -> Result<R>
    where
        A: Clone,
    {
        let mut args = fixed.to_vec();
        args.extend(rest);
        self.invoke(&args)
    }

    // =========================================================================
    // Relations over the current snapshot
    // =========================================================================

    pub fn is_a(&self, child: &DispatchValue, parent: &DispatchValue) -> bool {
        let prefs = self.prefer_table.load();
        let hierarchy = self.current_hierarchy();
        Relations::new(hierarchy.as_deref(), &prefs).is_a(child, parent)
    }

    pub fn prefers(&self, x: &DispatchValue, y: &DispatchValue) -> bool {
        let prefs = self.prefer_table.load();
        let hierarchy = self.current_hierarchy();
        Relations::new(hierarchy.as_deref(), &prefs).prefers(x, y)
    }

    pub fn dominates(&self, x: &DispatchValue, y: &DispatchValue) -> bool {
        let prefs = self.prefer_table.load();
        let hierarchy = self.current_hierarchy();
        Relations::new(hierarchy.as_deref(), &prefs).dominates(x, y)
    }

    /// Hierarchy parents of `x`, plus the direct supertypes of a type tag.
    pub fn parents(&self, x: &DispatchValue) -> Vec<DispatchValue> {
        let prefs = self.prefer_table.load();
        let hierarchy = self.current_hierarchy();
        Relations::new(hierarchy.as_deref(), &prefs).parents(x)
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// The current method table. Later edits do not affect it.
    pub fn method_table(&self) -> Arc<MethodTable<A, R>> {
        self.method_table.load_full()
    }

    /// The current preference table. Later edits do not affect it.
    pub fn prefer_table(&self) -> Arc<PreferTable> {
        self.prefer_table.load_full()
    }

    /// Number of cached dispatch values, including exact registrations.
    pub fn cache_len(&self) -> usize {
        self.method_cache.load().len()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn check_legal(&self, value: &DispatchValue) -> Result<()> {
        if self.config.policy.is_legal(value) {
            Ok(())
        } else {
            Err(DispatchError::IllegalDispatchValue {
                name: self.name.to_string(),
                value: value.clone(),
            })
        }
    }

    fn current_hierarchy(&self) -> Option<Arc<Hierarchy>> {
        self.hierarchy.as_ref().map(|source| source.snapshot())
    }

    fn hierarchy_changed(&self) -> bool {
        let Some(source) = &self.hierarchy else {
            return false;
        };
        let current = source.snapshot();
        match &*self.cached_hierarchy.load() {
            Some(cached) => !Arc::ptr_eq(cached, &current),
            None => true,
        }
    }

    /// Re-seed the cache with the exact registrations and record the
    /// hierarchy it is valid for.
    fn reset_cache(&self, _guard: &RwLockWriteGuard<'_, ()>) {
        self.method_cache.store(self.method_table.load_full());
        self.cached_hierarchy.store(self.current_hierarchy());
        trace!(multimethod = %self.name, "cache reset");
    }
}

fn same_snapshot(a: Option<&Arc<Hierarchy>>, b: Option<&Arc<Hierarchy>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

impl<A, R> fmt::Debug for MultiFn<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiFn")
            .field("name", &self.name)
            .field("policy", &self.config.policy)
            .field("default_dispatch", &self.default_dispatch)
            .field("methods", &self.method_table.load().len())
            .field("preferences", &self.prefer_table.load().len())
            .finish()
    }
}

enum DefaultChoice {
    /// `:default` unless the policy is types-only.
    Policy,
    Explicit(DispatchValue),
    Disabled,
}

/// Builder for [`MultiFn`].
pub struct MultiFnBuilder<A, R> {
    name: Arc<str>,
    dispatch_fn: DispatchFn<A>,
    config: DispatchConfig,
    default_dispatch: DefaultChoice,
    hierarchy: Option<Arc<dyn HierarchySource>>,
    _result: std::marker::PhantomData<fn() -> R>,
}

impl<A, R> MultiFnBuilder<A, R> {
    fn new(name: Arc<str>, dispatch_fn: DispatchFn<A>) -> Self {
        Self {
            name,
            dispatch_fn,
            config: DispatchConfig::default(),
            default_dispatch: DefaultChoice::Policy,
            hierarchy: None,
            _result: std::marker::PhantomData,
        }
    }

    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn policy(mut self, policy: LegalityPolicy) -> Self {
        self.config.policy = policy;
        self
    }

    /// Use `value` instead of `:default` as the fallback dispatch value.
    pub fn default_dispatch(mut self, value: impl Into<DispatchValue>) -> Self {
        self.default_dispatch = DefaultChoice::Explicit(value.into());
        self
    }

    /// No fallback dispatch value.
    pub fn without_default(mut self) -> Self {
        self.default_dispatch = DefaultChoice::Disabled;
        self
    }

    /// Consult `source` for ad-hoc ancestors.
    pub fn hierarchy(mut self, source: Arc<dyn HierarchySource>) -> Self {
        self.hierarchy = Some(source);
        self
    }

    pub fn build(self) -> std::result::Result<MultiFn<A, R>, ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "name".into(),
                message: "must not be empty".into(),
            });
        }
        self.config.validate()?;

        let policy = self.config.policy;
        if !policy.allows_hierarchy() && self.hierarchy.is_some() {
            return Err(ConfigError::InvalidValue {
                field: "hierarchy".into(),
                message: format!("the {} policy does not consult a hierarchy", policy),
            });
        }

        let default_dispatch = match self.default_dispatch {
            DefaultChoice::Policy if policy.allows_hierarchy() => Some(DispatchValue::Default),
            DefaultChoice::Policy | DefaultChoice::Disabled => None,
            DefaultChoice::Explicit(value) => {
                if !policy.allows_hierarchy() {
                    return Err(ConfigError::InvalidValue {
                        field: "default_dispatch".into(),
                        message: format!("the {} policy has no default dispatch value", policy),
                    });
                }
                if !policy.is_legal(&value) {
                    return Err(ConfigError::InvalidValue {
                        field: "default_dispatch".into(),
                        message: format!("{} is not a legal dispatch value", value),
                    });
                }
                Some(value)
            }
        };

        let cached_hierarchy = self.hierarchy.as_ref().map(|source| source.snapshot());
        let methods = Arc::new(MethodTable::new());

        debug!(multimethod = %self.name, policy = %policy, "created multimethod");
        Ok(MultiFn {
            name: self.name,
            dispatch_fn: self.dispatch_fn,
            config: self.config,
            default_dispatch,
            hierarchy: self.hierarchy,
            rw: RwLock::new(()),
            method_cache: ArcSwap::new(Arc::clone(&methods)),
            method_table: ArcSwap::new(methods),
            prefer_table: ArcSwap::from_pointee(PreferTable::new()),
            cached_hierarchy: ArcSwapOption::new(cached_hierarchy),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::SharedHierarchy;

    fn kw(name: &str) -> DispatchValue {
        DispatchValue::keyword("shape", name)
    }

    /// Dispatches on the keyword given as the only argument.
    fn by_keyword(args: &[DispatchValue]) -> DispatchValue {
        args.first().cloned().unwrap_or(DispatchValue::Nil)
    }

    fn shapes(hierarchy: &Arc<SharedHierarchy>) -> MultiFn<DispatchValue, &'static str> {
        MultiFn::builder("describe", by_keyword)
            .hierarchy(hierarchy.clone())
            .build()
            .unwrap()
    }

    #[test]
    fn test_cache_is_seeded_with_exact_registrations() {
        let h = Arc::new(SharedHierarchy::new());
        let mf = shapes(&h);
        mf.add_method(kw("circle"), |_: &[DispatchValue]| "circle").unwrap();
        mf.add_method(kw("square"), |_: &[DispatchValue]| "square").unwrap();
        assert_eq!(mf.cache_len(), 2);
        assert_eq!(mf.invoke(&[kw("circle")]).unwrap(), "circle");
        assert_eq!(mf.cache_len(), 2);
    }

    #[test]
    fn test_resolved_values_are_cached() {
        let h = Arc::new(SharedHierarchy::new());
        h.derive(kw("circle"), kw("round")).unwrap();
        let mf = shapes(&h);
        mf.add_method(kw("round"), |_: &[DispatchValue]| "round").unwrap();

        assert_eq!(mf.invoke(&[kw("circle")]).unwrap(), "round");
        assert_eq!(mf.cache_len(), 2);
    }

    #[test]
    fn test_hierarchy_change_invalidates_cache() {
        let h = Arc::new(SharedHierarchy::new());
        let mf = shapes(&h);
        mf.add_method(kw("round"), |_: &[DispatchValue]| "round").unwrap();
        mf.add_method(DispatchValue::Default, |_: &[DispatchValue]| "unknown").unwrap();

        assert_eq!(mf.invoke(&[kw("circle")]).unwrap(), "unknown");
        assert_eq!(mf.cache_len(), 3);

        h.derive(kw("circle"), kw("round")).unwrap();
        assert_eq!(mf.invoke(&[kw("circle")]).unwrap(), "round");
    }

    #[test]
    fn test_failed_mutation_leaves_tables_unchanged() {
        let h = Arc::new(SharedHierarchy::new());
        let mf = shapes(&h);
        mf.add_method(kw("a"), |_: &[DispatchValue]| "a").unwrap();
        let before = mf.method_table();

        let err = mf.add_method(DispatchValue::Int(1), |_: &[DispatchValue]| "int");
        assert!(matches!(err, Err(DispatchError::IllegalDispatchValue { .. })));
        assert!(Arc::ptr_eq(&before, &mf.method_table()));
    }

    #[test]
    fn test_snapshots_are_isolated_from_later_edits() {
        let h = Arc::new(SharedHierarchy::new());
        let mf = shapes(&h);
        mf.add_method(kw("a"), |_: &[DispatchValue]| "a").unwrap();
        let snapshot = mf.method_table();
        mf.remove_method(kw("a")).unwrap();
        assert!(snapshot.contains(&kw("a")));
        assert!(mf.method_table().is_empty());
    }

    #[test]
    fn test_builder_validation() {
        let empty = MultiFn::<DispatchValue, ()>::builder(" ", by_keyword).build();
        assert!(matches!(empty, Err(ConfigError::InvalidValue { ref field, .. }) if field == "name"));

        let types_with_hierarchy = MultiFn::<DispatchValue, ()>::builder("f", by_keyword)
            .policy(LegalityPolicy::TypesOnly)
            .hierarchy(Arc::new(SharedHierarchy::new()))
            .build();
        assert!(types_with_hierarchy.is_err());

        let types_with_default = MultiFn::<DispatchValue, ()>::builder("f", by_keyword)
            .policy(LegalityPolicy::TypesOnly)
            .default_dispatch(DispatchValue::Nil)
            .build();
        assert!(types_with_default.is_err());

        let illegal_default = MultiFn::<DispatchValue, ()>::builder("f", by_keyword)
            .default_dispatch(DispatchValue::Int(0))
            .build();
        assert!(illegal_default.is_err());

        let types_only = MultiFn::<DispatchValue, ()>::builder("f", by_keyword)
            .policy(LegalityPolicy::TypesOnly)
            .build()
            .unwrap();
        assert_eq!(types_only.default_dispatch(), None);
        assert_eq!(types_only.policy(), LegalityPolicy::TypesOnly);
    }

    #[test]
    fn test_custom_default_dispatch() {
        let mf: MultiFn<DispatchValue, &str> = MultiFn::builder("f", by_keyword)
            .default_dispatch(kw("fallback"))
            .build()
            .unwrap();
        mf.add_method(kw("fallback"), |_: &[DispatchValue]| "fallback").unwrap();
        mf.add_method(DispatchValue::Default, |_: &[DispatchValue]| "default").unwrap();
        assert_eq!(mf.invoke(&[kw("other")]).unwrap(), "fallback");
    }

    #[test]
    fn test_multimethods_share_a_dispatch_fn() {
        let dispatch: DispatchFn<DispatchValue> = Arc::new(by_keyword);
        let area: MultiFn<DispatchValue, &str> = MultiFn::builder_shared("area", dispatch.clone())
            .build()
            .unwrap();
        let perimeter: MultiFn<DispatchValue, &str> =
            MultiFn::builder_shared("perimeter", dispatch.clone())
                .build()
                .unwrap();
        area.add_method(kw("circle"), |_: &[DispatchValue]| "pi r^2").unwrap();
        perimeter.add_method(kw("circle"), |_: &[DispatchValue]| "2 pi r").unwrap();

        assert_eq!(area.invoke(&[kw("circle")]).unwrap(), "pi r^2");
        assert_eq!(perimeter.invoke(&[kw("circle")]).unwrap(), "2 pi r");
        assert_eq!(Arc::strong_count(&dispatch), 3);
    }

    #[test]
    fn test_multifn_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MultiFn<DispatchValue, String>>();
    }
}
