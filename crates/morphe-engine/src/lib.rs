//! Morphe Engine
//!
//! Builds a metamodel of registered classes and lets callers interact with
//! the resulting members under business rules:
//! - **Introspection**: classes become lazily built specifications with
//!   properties, collections and actions (`meta::spec`, `meta::loader`)
//! - **Facets**: capabilities derived from metadata and naming conventions
//!   (`meta::facet`, `meta::factory`)
//! - **Mixins**: members contributed to a type by other types (`meta::mixin`)
//! - **Interaction**: visibility, usability and validity checks, execution
//!   and command recording (`meta::interaction`, `meta::member`)
//!
//! # Example
//!
//! ```rust,ignore
//! use morphe_engine::{MetaModelConfig, SpecificationLoader, TypeRegistry};
//! use morphe_engine::meta::{ClassDescriptor, ClassKind, MixedIn};
//!
//! let registry = TypeRegistry::new();
//! registry.register(ClassDescriptor::new("Order", ClassKind::Entity))?;
//!
//! let loader = SpecificationLoader::new(registry, MetaModelConfig::default());
//! let order = loader.specification("Order")?;
//! for action in order.actions(MixedIn::Included) {
//!     println!("{}", action.friendly_name());
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// ============================================================================
// Modules
// ============================================================================

/// Engine configuration loaded from TOML
pub mod config;

/// Error types
pub mod error;

/// Metamodel: registry, specifications, facets, members and interactions
pub mod meta;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::{ConfigError, MetaModelConfig};
pub use error::{InteractionError, MetaModelError, MetaModelResult};
pub use meta::{
    ObjectAction, ObjectAssociation, ObjectSpecification, SpecificationLoader, TypeRegistry,
};
pub use morphe_types::{Consent, FeatureType, Identifier, ManagedObject, Value};
