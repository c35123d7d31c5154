//! Multimethod configuration.
//!
//! Configuration can be loaded from:
//! - Defaults
//! - Environment variables (`MULTIFN_*`)
//! - TOML text
//! - The programmatic builder
//!
//! # Environment Variables
//!
//! - `MULTIFN_POLICY`: `hierarchy`, `types-only` or `unchecked`
//! - `MULTIFN_RETRY_WARN_THRESHOLD`: resolution attempts before a warning is logged
//! - `MULTIFN_VALIDATE_ON_LOOKUP`: check legality of looked-up values (true/false)

use std::env;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::legality::LegalityPolicy;

/// Default number of optimistic resolution attempts before a warning.
pub const DEFAULT_RETRY_WARN_THRESHOLD: usize = 8;

/// Configuration shared by the multimethods built from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Which dispatch values are legal.
    pub policy: LegalityPolicy,

    /// A cache miss that has to restart resolution more than this many
    /// times because of concurrent edits logs a warning. Resolution keeps
    /// retrying regardless.
    pub retry_warn_threshold: usize,

    /// Check the legality of dispatch values on cache misses, not only on
    /// registration.
    pub validate_on_lookup: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            policy: LegalityPolicy::default(),
            retry_warn_threshold: DEFAULT_RETRY_WARN_THRESHOLD,
            validate_on_lookup: true,
        }
    }
}

impl DispatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> DispatchConfigBuilder {
        DispatchConfigBuilder::new()
    }

    /// Load configuration from environment variables.
    ///
    /// Unset or unparseable variables keep their default values.
    pub fn from_env() -> Self {
        Self::from_vars(|name| env::var(name).ok())
    }

    fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(policy) = lookup("MULTIFN_POLICY").and_then(|s| LegalityPolicy::parse(&s)) {
            config.policy = policy;
        }

        if let Some(val) = lookup("MULTIFN_RETRY_WARN_THRESHOLD").and_then(|s| s.parse().ok()) {
            if val > 0 {
                config.retry_warn_threshold = val;
            }
        }

        if let Some(val) = lookup("MULTIFN_VALIDATE_ON_LOOKUP").and_then(|s| parse_bool(&s)) {
            config.validate_on_lookup = val;
        }

        config
    }

    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: DispatchConfig =
            toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry_warn_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry_warn_threshold".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Builder for [`DispatchConfig`].
#[derive(Debug, Clone, Default)]
pub struct DispatchConfigBuilder {
    config: DispatchConfig,
}

impl DispatchConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn policy(mut self, policy: LegalityPolicy) -> Self {
        self.config.policy = policy;
        self
    }

    pub fn retry_warn_threshold(mut self, n: usize) -> Self {
        self.config.retry_warn_threshold = n;
        self
    }

    pub fn validate_on_lookup(mut self, enabled: bool) -> Self {
        self.config.validate_on_lookup = enabled;
        self
    }

    /// Build and validate.
    pub fn build(self) -> Result<DispatchConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
