//! Specification loader
//!
//! Owns the type registry, the facet processor and a cache of
//! [`ObjectSpecification`]s, one per class. Specifications are created on
//! first request and introspected only as far as the caller asks.
//!
//! The cache is a sharded concurrent map; entry guards are always released
//! before introspection starts, since introspecting one specification loads
//! the specifications it references.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::class::{ClassDescriptor, TypeRegistry};
use super::factory::{builtin_factories, FacetFactory, FacetProcessor, MetaModelContext};
use super::introspector::{ClassIntrospector, IntrospectionEnv};
use super::policy::{ClassSubstitutor, ExcludingSubstitutor, IntrospectionPolicy};
use super::spec::{IntrospectionState, MixedIn, ObjectSpecification};
use super::validate::{validate_specification, ValidationFailure, ValidationReport};
use crate::config::MetaModelConfig;
use crate::error::{MetaModelError, MetaModelResult};

// ============================================================================
// Statistics
// ============================================================================

/// Counts of introspection work done by a loader
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoaderStats {
    /// Type stages run
    pub type_stages: usize,
    /// Class-facet passes run (one per specification at most)
    pub class_passes: usize,
    /// Member stages run
    pub member_stages: usize,
    /// Mixin scans run (one per mixee at most)
    pub mixin_scans: usize,
    /// Specifications created
    pub specifications: usize,
}

#[derive(Debug, Default)]
pub(crate) struct StatCounters {
    type_stages: AtomicUsize,
    class_passes: AtomicUsize,
    member_stages: AtomicUsize,
    mixin_scans: AtomicUsize,
}

impl StatCounters {
    pub(crate) fn record_type_stage(&self) {
        self.type_stages.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_class_pass(&self) {
        self.class_passes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_member_stage(&self) {
        self.member_stages.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_mixin_scan(&self) {
        self.mixin_scans.fetch_add(1, Ordering::Relaxed);
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Configures and creates a [`SpecificationLoader`]
pub struct LoaderBuilder {
    registry: TypeRegistry,
    config: MetaModelConfig,
    factories: Vec<Arc<dyn FacetFactory>>,
    substitutor: Option<Box<dyn ClassSubstitutor>>,
}

impl LoaderBuilder {
    /// Start from a registry, default configuration and the built-in factories
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            registry,
            config: MetaModelConfig::default(),
            factories: builtin_factories(),
            substitutor: None,
        }
    }

    /// Use this configuration
    pub fn config(mut self, config: MetaModelConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a facet factory after the built-in ones
    pub fn factory(mut self, factory: Arc<dyn FacetFactory>) -> Self {
        self.factories.push(factory);
        self
    }

    /// Decide which types are never introspected.
    ///
    /// Defaults to the configured `never_introspect` list.
    pub fn substitutor(mut self, substitutor: Box<dyn ClassSubstitutor>) -> Self {
        self.substitutor = Some(substitutor);
        self
    }

    /// Create the loader
    pub fn build(self) -> Arc<SpecificationLoader> {
        let substitutor = self.substitutor.unwrap_or_else(|| {
            Box::new(ExcludingSubstitutor::new(
                self.config.introspection.never_introspect.clone(),
            ))
        });
        let processor = FacetProcessor::new(self.factories);
        info!(
            classes = self.registry.len(),
            factories = processor.factories().len(),
            policy = ?self.config.introspection.policy,
            "specification loader created"
        );
        Arc::new_cyclic(|self_ref| SpecificationLoader {
            config: self.config,
            registry: self.registry,
            processor,
            substitutor,
            report: ValidationReport::new(),
            specs: DashMap::new(),
            pending_validation: Mutex::new(Vec::new()),
            counters: StatCounters::default(),
            self_ref: self_ref.clone(),
        })
    }
}

// ============================================================================
// Loader
// ============================================================================

/// Creates, caches and introspects object specifications
pub struct SpecificationLoader {
    config: MetaModelConfig,
    registry: TypeRegistry,
    processor: FacetProcessor,
    substitutor: Box<dyn ClassSubstitutor>,
    report: ValidationReport,
    specs: DashMap<String, Arc<ObjectSpecification>>,
    pending_validation: Mutex<Vec<Weak<ObjectSpecification>>>,
    counters: StatCounters,
    self_ref: Weak<SpecificationLoader>,
}

impl SpecificationLoader {
    /// Loader over a registry with the given configuration
    pub fn new(registry: TypeRegistry, config: MetaModelConfig) -> Arc<Self> {
        LoaderBuilder::new(registry).config(config).build()
    }

    /// Start configuring a loader
    pub fn builder(registry: TypeRegistry) -> LoaderBuilder {
        LoaderBuilder::new(registry)
    }

    /// Specification of a class, introspected up to `up_to`.
    ///
    /// Repeated calls return the same instance.
    pub fn load_specification(
        &self,
        class_name: &str,
        up_to: IntrospectionState,
    ) -> MetaModelResult<Arc<ObjectSpecification>> {
        let spec = self.cached_or_create(class_name)?;
        spec.introspect_up_to(up_to)?;
        Ok(spec)
    }

    /// Fully introspected specification of a class
    pub fn specification(&self, class_name: &str) -> MetaModelResult<Arc<ObjectSpecification>> {
        self.load_specification(class_name, IntrospectionState::FullyIntrospected)
    }

    /// Fully introspected specification for a logical type name
    pub fn lookup_by_logical_type_name(
        &self,
        logical_type_name: &str,
    ) -> MetaModelResult<Arc<ObjectSpecification>> {
        let class_name = self
            .registry
            .class_name_for_logical(logical_type_name)
            .ok_or_else(|| MetaModelError::UnknownLogicalType(logical_type_name.to_string()))?;
        self.specification(&class_name)
    }

    /// Cached specification, without creating or introspecting it
    pub fn lookup_cached(&self, class_name: &str) -> Option<Arc<ObjectSpecification>> {
        self.specs.get(class_name).map(|entry| entry.value().clone())
    }

    /// Every cached specification, by class name
    pub fn cached_specifications(&self) -> Vec<Arc<ObjectSpecification>> {
        let mut specs: Vec<Arc<ObjectSpecification>> =
            self.specs.iter().map(|entry| entry.value().clone()).collect();
        specs.sort_by(|a, b| a.class().name().cmp(b.class().name()));
        specs
    }

    fn cached_or_create(&self, class_name: &str) -> MetaModelResult<Arc<ObjectSpecification>> {
        if let Some(spec) = self.lookup_cached(class_name) {
            return Ok(spec);
        }
        let class = self
            .registry
            .get(class_name)
            .ok_or_else(|| MetaModelError::UnknownClass(class_name.to_string()))?;
        let spec = self
            .specs
            .entry(class_name.to_string())
            .or_insert_with(|| {
                debug!(class = %class_name, "specification created");
                Arc::new(self.create_specification(class))
            })
            .value()
            .clone();
        Ok(spec)
    }

    fn create_specification(&self, class: Arc<ClassDescriptor>) -> ObjectSpecification {
        let policy = IntrospectionPolicy::for_class(&class, self.config.introspection.policy);
        let introspector = ClassIntrospector::new(class.clone(), &self.registry, policy);
        ObjectSpecification::new(class, self.self_ref.clone(), introspector)
    }

    /// Load a type referenced by `referrer`, naming the reference on failure
    pub(crate) fn resolve_referenced(
        &self,
        class_name: &str,
        referrer: &ClassDescriptor,
        context: &str,
        up_to: IntrospectionState,
    ) -> MetaModelResult<Arc<ObjectSpecification>> {
        self.load_specification(class_name, up_to)
            .map_err(|err| match err {
                MetaModelError::UnknownClass(referenced) => MetaModelError::UnresolvableType {
                    class: referrer.name().to_string(),
                    referenced,
                    context: context.to_string(),
                },
                other => other,
            })
    }

    /// Fully introspected specifications of every registered mixin.
    ///
    /// Mixins that fail to introspect are reported and skipped.
    pub fn mixin_specifications(&self) -> Vec<Arc<ObjectSpecification>> {
        self.registry
            .mixin_class_names()
            .iter()
            .filter_map(|name| match self.specification(name) {
                Ok(spec) => Some(spec),
                Err(err) => {
                    warn!(mixin = %name, error = %err, "mixin skipped");
                    None
                }
            })
            .collect()
    }

    /// Fully introspect every registered class, including mixed-in members.
    ///
    /// Stops at the first class that cannot be introspected.
    pub fn introspect_all(&self) -> MetaModelResult<usize> {
        let names = self.registry.class_names();
        for name in &names {
            let spec = self.specification(name)?;
            spec.actions(MixedIn::Included);
        }
        info!(classes = names.len(), "metamodel introspected");
        Ok(names.len())
    }

    pub(crate) fn schedule_validation(&self, spec: &Arc<ObjectSpecification>) {
        self.pending_validation.lock().push(Arc::downgrade(spec));
    }

    /// Validate every specification introspected since the last call and
    /// return all failures reported so far
    pub fn validate(&self) -> Vec<ValidationFailure> {
        let pending = std::mem::take(&mut *self.pending_validation.lock());
        for spec in pending.iter().filter_map(Weak::upgrade) {
            // Mixing in may report clashes
            spec.actions(MixedIn::Included);
            validate_specification(&spec, &self.config, &self.report);
        }
        let failures = self.report.failures();
        if !failures.is_empty() {
            warn!(count = failures.len(), "metamodel validation failures");
        }
        failures
    }

    /// Snapshot of the work counters
    pub fn stats(&self) -> LoaderStats {
        LoaderStats {
            type_stages: self.counters.type_stages.load(Ordering::Relaxed),
            class_passes: self.counters.class_passes.load(Ordering::Relaxed),
            member_stages: self.counters.member_stages.load(Ordering::Relaxed),
            mixin_scans: self.counters.mixin_scans.load(Ordering::Relaxed),
            specifications: self.specs.len(),
        }
    }

    pub(crate) fn counters(&self) -> &StatCounters {
        &self.counters
    }

    pub(crate) fn introspection_env(&self) -> IntrospectionEnv<'_> {
        IntrospectionEnv {
            processor: &self.processor,
            meta: MetaModelContext {
                registry: &self.registry,
                config: &self.config,
                report: &self.report,
            },
            substitutor: self.substitutor.as_ref(),
        }
    }

    /// Class registry
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Configuration
    pub fn config(&self) -> &MetaModelConfig {
        &self.config
    }

    /// Facet processor
    pub fn processor(&self) -> &FacetProcessor {
        &self.processor
    }

    /// Validation report
    pub fn report(&self) -> &ValidationReport {
        &self.report
    }
}

impl fmt::Debug for SpecificationLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecificationLoader")
            .field("classes", &self.registry.len())
            .field("specifications", &self.specs.len())
            .field("processor", &self.processor)
            .finish()
    }
}
