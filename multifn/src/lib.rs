//! Multiple Dispatch
//!
//! A multimethod selects one of several registered implementations by the
//! *dispatch value* of its arguments: a runtime type, a tuple of types, a
//! namespaced keyword, or a nested vector of those.
//!
//! # Features
//!
//! - Built-in nominal subtyping (classes and interfaces) plus ad-hoc
//!   ancestor hierarchies shared between multimethods
//! - Elementwise specificity for signatures and nested vectors
//! - Transitive preferences to break ties, with conflict detection
//! - Ambiguity detection over the full set of most specific methods
//! - A lock-free read cache, invalidated when any table or the hierarchy
//!   changes
//!
//! # Module Structure
//!
//! ```text
//!   types ─┬─ value ─ signature
//!          │
//!   hierarchy ─ relation ─ resolve
//!                  │          │
//!   table ─────────┴──────────┴─ multifn ─ dispatch
//!                                   │
//!                       legality ─ config ─ error
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use multifn::{DispatchValue, MultiFn, SharedHierarchy};
//!
//! let hierarchy = Arc::new(SharedHierarchy::new());
//! let shape = DispatchValue::keyword("geo", "shape");
//! let circle = DispatchValue::keyword("geo", "circle");
//! hierarchy.derive(circle.clone(), shape.clone()).unwrap();
//!
//! let describe: MultiFn<DispatchValue, String> =
//!     MultiFn::builder("describe", |args: &[DispatchValue]| args[0].clone())
//!         .hierarchy(hierarchy)
//!         .build()
//!         .unwrap();
//!
//! describe
//!     .add_method(shape, |args: &[DispatchValue]| format!("some shape {}", args[0]))
//!     .unwrap();
//!
//! assert_eq!(describe.invoke(&[circle]).unwrap(), "some shape :geo/circle");
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod hierarchy;
pub mod legality;
pub mod multifn;
pub mod relation;
pub mod resolve;
pub mod signature;
pub mod table;
pub mod types;
pub mod value;

pub use config::{DispatchConfig, DispatchConfigBuilder};
pub use error::{ConfigError, DispatchError, HierarchyError, Result};
pub use hierarchy::{Hierarchy, HierarchySource, SharedHierarchy};
pub use legality::LegalityPolicy;
pub use multifn::{DispatchFn, MultiFn, MultiFnBuilder};
pub use relation::Relations;
pub use resolve::{resolve, Resolution};
pub use signature::Signature;
pub use table::{Method, MethodTable, PreferTable};
pub use types::{TypeKind, TypeTag, Typed};
pub use value::{DispatchValue, Keyword};
