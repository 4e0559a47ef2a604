//! Class introspection
//!
//! A [`ClassIntrospector`] turns the candidate methods of one class into
//! [`FacetedMethod`]s. Candidates sit in a [`MethodPool`]; each pass claims
//! the methods it recognises so that later passes never see them:
//!
//! 1. class-level facets (ignored, bridge and synthetic methods are removed here)
//! 2. collection accessors: getters returning a collection
//! 3. property accessors: remaining getters
//! 4. actions: whatever is left and passes the action test
//!
//! Supporting methods (`hideXxx`, `validateXxx`, ...) are claimed by facet
//! factories while their member is processed. Methods still in the pool at
//! the end that look like they were meant to support something become
//! potential orphans.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use morphe_types::names::property_id_from_getter;
use morphe_types::{FeatureType, Identifier};

use crate::error::unexpected_code_reach;

use super::class::{ClassDescriptor, MethodDescriptor, ParameterDescriptor, TypeRegistry};
use super::facet::{FacetHolder, ParametersTupleFacet};
use super::factory::{
    FacetProcessor, MetaModelContext, MethodRemover, ProcessClassContext, ProcessMethodContext,
    ProcessParameterContext,
};
use super::faceted::FacetedMethod;
use super::policy::{ClassSubstitutor, IntrospectionPolicy, MemberAnnotationPolicy};
use super::validate::{FailureKind, ValidationFailure};

/// Metadata keys that show a method was meant to be a member
const MEMBER_METADATA_KEYS: &[&str] = &["action", "named", "hidden", "disabled", "sequence", "semantics"];

// ============================================================================
// MethodPool
// ============================================================================

/// Candidate methods not yet claimed by any introspection pass.
///
/// Claims are atomic: a method is tested and removed under one lock, so two
/// concurrent claimers never both receive it.
#[derive(Debug, Default)]
pub struct MethodPool {
    methods: Mutex<Vec<Arc<MethodDescriptor>>>,
}

impl MethodPool {
    /// Create a pool
    pub fn new(methods: Vec<Arc<MethodDescriptor>>) -> Self {
        Self {
            methods: Mutex::new(methods),
        }
    }

    /// Unclaimed methods in their original order
    pub fn remaining(&self) -> Vec<Arc<MethodDescriptor>> {
        self.methods.lock().clone()
    }

    /// Number of unclaimed methods
    pub fn len(&self) -> usize {
        self.methods.lock().len()
    }

    /// Check if every method was claimed
    pub fn is_empty(&self) -> bool {
        self.methods.lock().is_empty()
    }
}

impl MethodRemover for MethodPool {
    fn claim_method(&self, name: &str, param_count: usize) -> Option<Arc<MethodDescriptor>> {
        let claimed = {
            let mut methods = self.methods.lock();
            let index = methods
                .iter()
                .position(|m| m.name() == name && m.parameters().len() == param_count)?;
            methods.remove(index)
        };
        trace!(method = %claimed.name(), "claimed");
        Some(claimed)
    }

    fn claim_methods(
        &self,
        predicate: &dyn Fn(&MethodDescriptor) -> bool,
    ) -> Vec<Arc<MethodDescriptor>> {
        let claimed: Vec<Arc<MethodDescriptor>> = {
            let mut methods = self.methods.lock();
            let (claimed, kept) = methods.drain(..).partition(|m| predicate(m.as_ref()));
            *methods = kept;
            claimed
        };
        if !claimed.is_empty() {
            trace!(count = claimed.len(), "claimed");
        }
        claimed
    }
}

// ============================================================================
// ClassIntrospector
// ============================================================================

/// Services the introspector needs from its loader
#[derive(Clone, Copy)]
pub struct IntrospectionEnv<'a> {
    /// Facet factories
    pub processor: &'a FacetProcessor,
    /// Registry, configuration and report
    pub meta: MetaModelContext<'a>,
    /// Excluded types
    pub substitutor: &'a dyn ClassSubstitutor,
}

/// Introspects the methods of one class
#[derive(Debug)]
pub struct ClassIntrospector {
    class: Arc<ClassDescriptor>,
    policy: IntrospectionPolicy,
    pool: MethodPool,
    potential_orphans: Mutex<Vec<Arc<MethodDescriptor>>>,
}

impl ClassIntrospector {
    /// Create an introspector over the class's candidate methods
    pub fn new(
        class: Arc<ClassDescriptor>,
        registry: &TypeRegistry,
        policy: IntrospectionPolicy,
    ) -> Self {
        let candidates = registry.candidate_methods(class.name(), policy.encapsulation());
        Self {
            class,
            policy,
            pool: MethodPool::new(candidates),
            potential_orphans: Mutex::new(Vec::new()),
        }
    }

    /// Effective policy
    pub fn policy(&self) -> IntrospectionPolicy {
        self.policy
    }

    /// Methods no pass has claimed yet
    pub fn remaining_methods(&self) -> Vec<Arc<MethodDescriptor>> {
        self.pool.remaining()
    }

    /// Leftover methods that look like misnamed supporting methods or
    /// unmarked members
    pub fn potential_orphans(&self) -> Vec<Arc<MethodDescriptor>> {
        self.potential_orphans.lock().clone()
    }

    /// Install type-level facets
    pub fn introspect_class(&self, env: &IntrospectionEnv<'_>, holder: &FacetHolder) {
        let ctx = ProcessClassContext {
            class: &self.class,
            policy: self.policy,
            holder,
            remover: &self.pool,
            meta: env.meta,
        };
        env.processor.process_class(&ctx);
    }

    /// Collections first, then properties
    pub fn association_faceted_methods(&self, env: &IntrospectionEnv<'_>) -> Vec<FacetedMethod> {
        let mut associations = Vec::new();

        let collection_getters = self
            .pool
            .claim_methods(&|m| is_getter(m) && m.return_type().is_collection());
        for getter in collection_getters {
            if let Some(member) = self.create_association(env, FeatureType::Collection, getter) {
                associations.push(member);
            }
        }

        let property_getters = self.pool.claim_methods(&is_getter);
        for getter in property_getters {
            if let Some(member) = self.create_association(env, FeatureType::Property, getter) {
                associations.push(member);
            }
        }

        associations
    }

    /// Actions from the remaining methods.
    ///
    /// For a mixin only its main method qualifies. Otherwise a method is an
    /// action if it is marked `action`, or if the policy does not require
    /// marking and its name is not reserved for a supporting method.
    pub fn action_faceted_methods(
        &self,
        env: &IntrospectionEnv<'_>,
        mixin_main: Option<&str>,
    ) -> Vec<FacetedMethod> {
        if let Some(method) = self.pool.remaining().iter().find(|m| m.is_synthetic()) {
            unexpected_code_reach(format!(
                "synthetic method {}.{} reached action classification",
                self.class.name(),
                method.name()
            ));
        }

        let annotations = self.policy.member_annotations();
        let is_mixin = self.class.is_mixin();

        let accepted = self.pool.claim_methods(&|method| {
            if method.is_static() {
                return false;
            }
            if let Some(main) = mixin_main {
                return method.name() == main;
            }
            if is_mixin {
                return false;
            }
            method.metadata().has("action")
                || (annotations == MemberAnnotationPolicy::Optional
                    && !env.processor.recognizes(method.name()))
        });

        let mut actions = Vec::new();
        for method in accepted {
            let is_mixin_main = mixin_main == Some(method.name());
            if let Some(action) = self.create_action(env, method, is_mixin_main) {
                actions.push(action);
            }
        }

        self.collect_potential_orphans(env);
        actions
    }

    fn create_association(
        &self,
        env: &IntrospectionEnv<'_>,
        feature_type: FeatureType,
        getter: Arc<MethodDescriptor>,
    ) -> Option<FacetedMethod> {
        if env.substitutor.excludes(getter.return_type()) {
            debug!(class = %self.class.name(), method = %getter.name(), "skipped, type never introspected");
            return None;
        }
        let member_id = property_id_from_getter(getter.name())?;
        let logical = self.class.logical_type_name();
        let member = match feature_type {
            FeatureType::Collection => FacetedMethod::for_collection(logical, &member_id, getter),
            _ => FacetedMethod::for_property(logical, &member_id, getter),
        };

        let ctx = ProcessMethodContext {
            class: &self.class,
            method: member.method(),
            feature_type,
            member_id: &member_id,
            identifier: member.identifier(),
            parameter_count: 0,
            is_mixin_main: false,
            holder: member.facets(),
            remover: &self.pool,
            meta: env.meta,
        };
        env.processor.process_method(&ctx);
        Some(member)
    }

    fn create_action(
        &self,
        env: &IntrospectionEnv<'_>,
        method: Arc<MethodDescriptor>,
        is_mixin_main: bool,
    ) -> Option<FacetedMethod> {
        let excluded = env.substitutor.excludes(method.return_type())
            || method
                .parameters()
                .iter()
                .any(|p| env.substitutor.excludes(p.type_ref()));
        if excluded {
            debug!(class = %self.class.name(), method = %method.name(), "skipped, type never introspected");
            return None;
        }

        let (parameters, tuple) = self.effective_parameters(env, &method);
        let action = FacetedMethod::for_action(self.class.logical_type_name(), method, parameters);
        if let Some(tuple) = tuple {
            action.facets().add_facet(Arc::new(tuple));
        }

        let member_id = action.member_id().to_string();
        let ctx = ProcessMethodContext {
            class: &self.class,
            method: action.method(),
            feature_type: FeatureType::Action,
            member_id: &member_id,
            identifier: action.identifier(),
            parameter_count: action.parameters().len(),
            is_mixin_main,
            holder: action.facets(),
            remover: &self.pool,
            meta: env.meta,
        };
        env.processor.process_method(&ctx);

        for parameter in action.parameters() {
            let ctx = ProcessParameterContext {
                class: &self.class,
                method: action.method(),
                member_id: &member_id,
                feature_type: parameter.feature_type(),
                index: parameter.index(),
                parameter: parameter.descriptor(),
                holder: parameter.facets(),
                remover: &self.pool,
                meta: env.meta,
            };
            env.processor.process_parameter(&ctx);
        }

        Some(action)
    }

    /// Declared parameters, or the constructor parameters of a parameters
    /// tuple when the method is marked `parameters_tuple`
    fn effective_parameters(
        &self,
        env: &IntrospectionEnv<'_>,
        method: &MethodDescriptor,
    ) -> (Vec<ParameterDescriptor>, Option<ParametersTupleFacet>) {
        let declared = method.parameters().to_vec();
        if !method.metadata().has("parameters_tuple") {
            return (declared, None);
        }

        let origin = || {
            Identifier::action_identifier(
                self.class.logical_type_name(),
                method.name(),
                method.parameter_type_names(),
            )
        };

        let tuple_class = match declared.as_slice() {
            [single] => single
                .type_ref()
                .class_name()
                .and_then(|name| env.meta.registry.get(name)),
            _ => None,
        };
        let Some(tuple_class) = tuple_class else {
            env.meta.report.add(ValidationFailure::new(
                FailureKind::ParametersTuple,
                origin(),
                "A parameters-tuple action must take exactly one parameter of a registered class",
            ));
            return (declared, None);
        };

        match tuple_class.constructors() {
            [constructor] => (
                constructor.parameters().to_vec(),
                Some(ParametersTupleFacet::new(tuple_class.name(), constructor.clone())),
            ),
            constructors => {
                env.meta.report.add(ValidationFailure::new(
                    FailureKind::ParametersTuple,
                    origin(),
                    format!(
                        "Parameters tuple {} must have exactly one constructor, found {}",
                        tuple_class.name(),
                        constructors.len()
                    ),
                ));
                (declared, None)
            }
        }
    }

    fn collect_potential_orphans(&self, env: &IntrospectionEnv<'_>) {
        let orphans: Vec<Arc<MethodDescriptor>> = self
            .pool
            .remaining()
            .into_iter()
            .filter(|m| !m.is_synthetic() && !m.is_static())
            .filter(|m| {
                env.processor.recognizes(m.name())
                    || MEMBER_METADATA_KEYS.iter().any(|key| m.metadata().has(key))
            })
            .collect();
        *self.potential_orphans.lock() = orphans;
    }
}

/// Zero-argument, non-void `getXxx`, or `isXxx` returning `bool`
fn is_getter(method: &MethodDescriptor) -> bool {
    if method.is_static()
        || method.is_synthetic()
        || !method.parameters().is_empty()
        || method.return_type().is_void()
    {
        return false;
    }
    if property_id_from_getter(method.name()).is_none() {
        return false;
    }
    method.name().starts_with("get") || method.return_type().is_bool()
}
