//! Metamodel configuration (morphe.toml)
//!
//! ```toml
//! [introspection]
//! policy = "annotation_optional"
//! ignored_methods = ["toString", "equals", "hashCode"]
//! never_introspect = ["Secret"]
//!
//! [mixins]
//! main_method = "act"
//!
//! [validation]
//! report_orphans = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::meta::policy::IntrospectionPolicy;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MetaModelConfig {
    /// How classes are scanned
    #[serde(default)]
    pub introspection: IntrospectionConfig,

    /// Mixin conventions
    #[serde(default)]
    pub mixins: MixinConfig,

    /// Deferred validation
    #[serde(default)]
    pub validation: ValidationConfig,
}

/// Introspection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntrospectionConfig {
    /// Policy for classes that do not declare their own
    #[serde(default)]
    pub policy: IntrospectionPolicy,

    /// Method names that are never members
    #[serde(default = "default_ignored_methods")]
    pub ignored_methods: Vec<String>,

    /// Types that are never introspected; members using them are skipped
    #[serde(default)]
    pub never_introspect: Vec<String>,
}

fn default_ignored_methods() -> Vec<String> {
    ["toString", "equals", "hashCode", "clone", "getClass"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for IntrospectionConfig {
    fn default() -> Self {
        Self {
            policy: IntrospectionPolicy::default(),
            ignored_methods: default_ignored_methods(),
            never_introspect: Vec::new(),
        }
    }
}

/// Mixin settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MixinConfig {
    /// Main method name for mixins that do not name one
    #[serde(default = "default_main_method")]
    pub main_method: String,
}

fn default_main_method() -> String {
    "act".to_string()
}

impl Default for MixinConfig {
    fn default() -> Self {
        Self {
            main_method: default_main_method(),
        }
    }
}

/// Validation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationConfig {
    /// Report supporting methods that matched no member
    #[serde(default = "default_true")]
    pub report_orphans: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            report_orphans: true,
        }
    }
}

impl MetaModelConfig {
    /// Parse configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: MetaModelConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let main = &self.mixins.main_method;
        if main.is_empty() {
            return Err(ConfigError::ValidationError(
                "Mixin main method name cannot be empty".to_string(),
            ));
        }
        if !main.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$') {
            return Err(ConfigError::ValidationError(format!(
                "Invalid mixin main method name: {}",
                main
            )));
        }
        if let Some(blank) = self
            .introspection
            .ignored_methods
            .iter()
            .chain(&self.introspection.never_introspect)
            .find(|name| name.trim().is_empty())
        {
            return Err(ConfigError::ValidationError(format!(
                "Blank entry in introspection lists: {:?}",
                blank
            )));
        }
        Ok(())
    }
}
