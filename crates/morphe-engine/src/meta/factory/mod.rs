//! Facet factories
//!
//! A [`FacetFactory`] inspects class metadata and installs facets on a
//! [`FacetHolder`]. Factories declare which feature types they apply to and
//! which supporting-method prefixes (`hide`, `disable`, ...) they consume;
//! the [`FacetProcessor`] runs them in priority order and answers whether a
//! method name is reserved by some factory.

mod builtin;

use std::sync::Arc;

use morphe_types::{FeatureType, Identifier};

use super::class::{ClassDescriptor, MethodDescriptor, ParameterDescriptor, TypeRegistry};
use super::facet::FacetHolder;
use super::policy::IntrospectionPolicy;
use super::validate::ValidationReport;
use crate::config::MetaModelConfig;

pub use builtin::{
    ActionInvocationFacetFactory, ActionSemanticsFacetFactory, DisableMethodFacetFactory,
    DisabledFacetFactory, HiddenFacetFactory, HideMethodFacetFactory, IgnoredMethodsFacetFactory,
    IntrospectionPolicyFacetFactory, MandatoryFacetFactory, MemberOrderFacetFactory,
    MixinFacetFactory, NamedFacetFactory, ParameterValidateMethodFacetFactory,
    PropertyAccessorFacetFactory, ValidateMethodFacetFactory,
};

/// Claims methods out of the pool being introspected
pub trait MethodRemover {
    /// Remove and return the first remaining method with this name and arity
    fn claim_method(&self, name: &str, param_count: usize) -> Option<Arc<MethodDescriptor>>;

    /// Remove and return every remaining method matching the predicate
    fn claim_methods(
        &self,
        predicate: &dyn Fn(&MethodDescriptor) -> bool,
    ) -> Vec<Arc<MethodDescriptor>>;
}

/// Shared services available to every factory
#[derive(Clone, Copy)]
pub struct MetaModelContext<'a> {
    /// Class registry
    pub registry: &'a TypeRegistry,
    /// Engine configuration
    pub config: &'a MetaModelConfig,
    /// Where definition problems are reported
    pub report: &'a ValidationReport,
}

/// Input for class-level processing
pub struct ProcessClassContext<'a> {
    /// Class being introspected
    pub class: &'a ClassDescriptor,
    /// Effective policy
    pub policy: IntrospectionPolicy,
    /// Type-level facet holder
    pub holder: &'a FacetHolder,
    /// Method pool
    pub remover: &'a dyn MethodRemover,
    /// Shared services
    pub meta: MetaModelContext<'a>,
}

/// Input for member-level processing
pub struct ProcessMethodContext<'a> {
    /// Class being introspected
    pub class: &'a ClassDescriptor,
    /// Method backing the member
    pub method: &'a Arc<MethodDescriptor>,
    /// Property, collection or action
    pub feature_type: FeatureType,
    /// Member id
    pub member_id: &'a str,
    /// Member identifier
    pub identifier: &'a Identifier,
    /// Number of effective parameters (actions only)
    pub parameter_count: usize,
    /// Whether this is the main method of a mixin
    pub is_mixin_main: bool,
    /// Member facet holder
    pub holder: &'a FacetHolder,
    /// Method pool
    pub remover: &'a dyn MethodRemover,
    /// Shared services
    pub meta: MetaModelContext<'a>,
}

/// Input for action-parameter processing
pub struct ProcessParameterContext<'a> {
    /// Class being introspected
    pub class: &'a ClassDescriptor,
    /// Action method
    pub method: &'a Arc<MethodDescriptor>,
    /// Action id
    pub member_id: &'a str,
    /// Scalar or collection parameter
    pub feature_type: FeatureType,
    /// Parameter position
    pub index: usize,
    /// Parameter description
    pub parameter: &'a ParameterDescriptor,
    /// Parameter facet holder
    pub holder: &'a FacetHolder,
    /// Method pool
    pub remover: &'a dyn MethodRemover,
    /// Shared services
    pub meta: MetaModelContext<'a>,
}

/// When a factory runs relative to others
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FactoryPriority {
    /// Before regular factories (method filtering)
    Early,
    /// Regular factories
    Default,
    /// After regular factories
    Late,
}

/// Produces facets from class metadata
pub trait FacetFactory: Send + Sync {
    /// Name for diagnostics
    fn name(&self) -> &'static str;

    /// Feature types this factory applies to
    fn feature_types(&self) -> &'static [FeatureType];

    /// Run order
    fn priority(&self) -> FactoryPriority {
        FactoryPriority::Default
    }

    /// Supporting-method prefixes this factory consumes
    fn support_prefixes(&self) -> &'static [&'static str] {
        &[]
    }

    /// Install type-level facets
    fn process_class(&self, _ctx: &ProcessClassContext<'_>) {}

    /// Install facets on a property, collection or action
    fn process_method(&self, _ctx: &ProcessMethodContext<'_>) {}

    /// Install facets on an action parameter
    fn process_parameter(&self, _ctx: &ProcessParameterContext<'_>) {}
}

/// Runs facet factories in priority order
pub struct FacetProcessor {
    factories: Vec<Arc<dyn FacetFactory>>,
    support_prefixes: Vec<&'static str>,
}

impl FacetProcessor {
    /// Create a processor from factories; ties keep registration order
    pub fn new(mut factories: Vec<Arc<dyn FacetFactory>>) -> Self {
        factories.sort_by_key(|f| f.priority());
        let mut support_prefixes: Vec<&'static str> = factories
            .iter()
            .flat_map(|f| f.support_prefixes().iter().copied())
            .collect();
        support_prefixes.sort();
        support_prefixes.dedup();
        Self {
            factories,
            support_prefixes,
        }
    }

    /// Processor with every built-in factory
    pub fn with_builtin_factories() -> Self {
        Self::new(builtin_factories())
    }

    /// Factories in run order
    pub fn factories(&self) -> &[Arc<dyn FacetFactory>] {
        &self.factories
    }

    /// Whether a method name is reserved as a supporting method.
    ///
    /// A name is reserved when it starts with a consumed prefix followed by
    /// an upper-case letter or a digit (`hideName`, `validate0Place`).
    pub fn recognizes(&self, method_name: &str) -> bool {
        self.support_prefixes.iter().any(|prefix| {
            method_name
                .strip_prefix(prefix)
                .and_then(|rest| rest.chars().next())
                .is_some_and(|c| c.is_uppercase() || c.is_ascii_digit())
        })
    }

    /// Run class-level processing
    pub fn process_class(&self, ctx: &ProcessClassContext<'_>) {
        for factory in self.applicable(FeatureType::Object) {
            factory.process_class(ctx);
        }
    }

    /// Run member-level processing
    pub fn process_method(&self, ctx: &ProcessMethodContext<'_>) {
        for factory in self.applicable(ctx.feature_type) {
            factory.process_method(ctx);
        }
    }

    /// Run parameter-level processing
    pub fn process_parameter(&self, ctx: &ProcessParameterContext<'_>) {
        for factory in self.applicable(ctx.feature_type) {
            factory.process_parameter(ctx);
        }
    }

    fn applicable(&self, feature_type: FeatureType) -> impl Iterator<Item = &Arc<dyn FacetFactory>> {
        self.factories
            .iter()
            .filter(move |f| f.feature_types().contains(&feature_type))
    }
}

impl Default for FacetProcessor {
    fn default() -> Self {
        Self::with_builtin_factories()
    }
}

impl std::fmt::Debug for FacetProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.factories.iter().map(|f| f.name()).collect();
        f.debug_struct("FacetProcessor")
            .field("factories", &names)
            .field("support_prefixes", &self.support_prefixes)
            .finish()
    }
}

/// Every built-in factory
pub fn builtin_factories() -> Vec<Arc<dyn FacetFactory>> {
    vec![
        Arc::new(IgnoredMethodsFacetFactory),
        Arc::new(IntrospectionPolicyFacetFactory),
        Arc::new(MixinFacetFactory),
        Arc::new(NamedFacetFactory),
        Arc::new(MemberOrderFacetFactory),
        Arc::new(HiddenFacetFactory),
        Arc::new(DisabledFacetFactory),
        Arc::new(ActionSemanticsFacetFactory),
        Arc::new(ActionInvocationFacetFactory),
        Arc::new(PropertyAccessorFacetFactory),
        Arc::new(HideMethodFacetFactory),
        Arc::new(DisableMethodFacetFactory),
        Arc::new(ValidateMethodFacetFactory),
        Arc::new(ParameterValidateMethodFacetFactory),
        Arc::new(MandatoryFacetFactory),
    ]
}
