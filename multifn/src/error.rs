//! Error types for dispatch, hierarchies and configuration.

use thiserror::Error;

use crate::value::DispatchValue;

/// Errors raised by multimethod registration, lookup and invocation.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// A dispatch value failed the multimethod's legality policy.
    #[error("illegal dispatch value in multimethod '{name}': {value}")]
    IllegalDispatchValue { name: String, value: DispatchValue },

    /// `prefer_method(preferred, over)` contradicts an existing preference.
    #[error(
        "preference conflict in multimethod '{name}': {over} is already preferred to {preferred}"
    )]
    PreferenceConflict {
        name: String,
        preferred: DispatchValue,
        over: DispatchValue,
    },

    /// More than one incomparable method matched a dispatch value.
    #[error(
        "multiple methods in multimethod '{name}' match dispatch value: {value} -> [{}], and none is preferred",
        display_list(.candidates)
    )]
    AmbiguousDispatch {
        name: String,
        value: DispatchValue,
        candidates: Vec<DispatchValue>,
    },

    /// No method (and no default method) applies to a dispatch value.
    #[error("no method in multimethod '{name}' for dispatch value: {value}")]
    NoMethod { name: String, value: DispatchValue },
}

impl DispatchError {
    /// The name of the multimethod that raised this error.
    pub fn multimethod(&self) -> &str {
        match self {
            DispatchError::IllegalDispatchValue { name, .. }
            | DispatchError::PreferenceConflict { name, .. }
            | DispatchError::AmbiguousDispatch { name, .. }
            | DispatchError::NoMethod { name, .. } => name,
        }
    }
}

/// Errors raised when editing a [`crate::Hierarchy`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    #[error("cannot derive {0} from itself")]
    SelfDerivation(DispatchValue),

    #[error("cyclic derivation: {parent} already derives from {child}")]
    CyclicDerivation {
        child: DispatchValue,
        parent: DispatchValue,
    },
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("invalid config value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    /// The configuration text could not be parsed.
    #[error("config parse error: {0}")]
    Parse(String),
}

/// Result alias for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;

fn display_list(values: &[DispatchValue]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
