//! Shared fixtures: a small type universe and argument values that know
//! their types.
//!
//! ```text
//!        Object          Comparable       Dog     Cat
//!          │                 ▲              ▲      ▲
//!        Number ─────────────┘              └ DogCat ┘
//!       ╱      ╲
//!   Integer   Double
//! ```

#![allow(dead_code)]

use std::sync::OnceLock;

use multifn::{DispatchValue, TypeTag, Typed};

pub struct Universe {
    pub object: TypeTag,
    pub comparable: TypeTag,
    pub number: TypeTag,
    pub integer: TypeTag,
    pub double: TypeTag,
    pub dog: TypeTag,
    pub cat: TypeTag,
    pub dog_cat: TypeTag,
}

pub fn universe() -> &'static Universe {
    static UNIVERSE: OnceLock<Universe> = OnceLock::new();
    UNIVERSE.get_or_init(|| {
        let object = TypeTag::class("lang.Object").build();
        let comparable = TypeTag::interface("lang.Comparable").build();
        let number = TypeTag::class("lang.Number")
            .extends(&object)
            .implements(&comparable)
            .build();
        let integer = TypeTag::class("lang.Integer").extends(&number).build();
        let double = TypeTag::class("lang.Double").extends(&number).build();
        let dog = TypeTag::interface("zoo.Dog").build();
        let cat = TypeTag::interface("zoo.Cat").build();
        let dog_cat = TypeTag::class("zoo.DogCat")
            .extends(&object)
            .implements(&dog)
            .implements(&cat)
            .build();
        Universe {
            object,
            comparable,
            number,
            integer,
            double,
            dog,
            cat,
            dog_cat,
        }
    })
}

/// A runtime argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Val {
    Nil,
    Int(i64),
    Double(f64),
    DogCat,
}

impl Typed for Val {
    fn type_tag(&self) -> Option<TypeTag> {
        let u = universe();
        match self {
            Val::Nil => None,
            Val::Int(_) => Some(u.integer.clone()),
            Val::Double(_) => Some(u.double.clone()),
            Val::DogCat => Some(u.dog_cat.clone()),
        }
    }
}

pub fn t(tag: &TypeTag) -> DispatchValue {
    DispatchValue::Type(tag.clone())
}

pub fn kw(ns: &str, name: &str) -> DispatchValue {
    DispatchValue::keyword(ns, name)
}

/// Install a test-writer subscriber once. Honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
