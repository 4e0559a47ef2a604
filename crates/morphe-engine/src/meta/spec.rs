//! Object specifications
//!
//! An [`ObjectSpecification`] is the introspected description of one class:
//! its type-level facets, its place in the type hierarchy and its members.
//! Specifications are built lazily, in two stages:
//!
//! ```text
//! NotIntrospected
//!   -> TypeBeingIntrospected -> TypeIntrospected           (facets, hierarchy)
//!   -> MembersBeingIntrospected -> FullyIntrospected       (members)
//! ```
//!
//! Progress is guarded by a reentrant lock so that the thread running a
//! stage can ask for its own specification again (self-referencing and
//! mutually referencing types) and receive the partially built instance,
//! while every other thread waits. Reads of the state go through an atomic
//! mirror so that settled specifications never touch the lock.
//!
//! A failed type stage can be retried once the missing type is registered.
//! The class-level facet pass runs only on the first attempt.
//!
//! Mixed-in members are merged on first request, once the specification is
//! fully introspected.

use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;
use parking_lot::{Mutex, ReentrantMutex};
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use morphe_types::names::natural_name;
use morphe_types::{FeatureType, Identifier};

use super::class::{ClassDescriptor, MethodDescriptor};
use super::facet::{select_facet, Facet, FacetHolder, FacetType, MixinFacet, NamedFacet};
use super::faceted::FacetedMethod;
use super::introspector::ClassIntrospector;
use super::loader::SpecificationLoader;
use super::member::{
    MemberCore, ObjectAction, ObjectAssociation, ObjectMember, OneToManyAssociation,
    OneToOneAssociation,
};
use super::policy::IntrospectionPolicy;
use super::sequence::sort_members;
use super::validate::{FailureKind, ValidationFailure, ValidationReport};
use crate::error::{MetaModelError, MetaModelResult};

/// How far a specification has been introspected
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IntrospectionState {
    /// Nothing done yet
    NotIntrospected = 0,
    /// Type-level facets and hierarchy are being built
    TypeBeingIntrospected = 1,
    /// Type-level facets and hierarchy are available
    TypeIntrospected = 2,
    /// Members are being built
    MembersBeingIntrospected = 3,
    /// Everything is available
    FullyIntrospected = 4,
}

impl IntrospectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => IntrospectionState::NotIntrospected,
            1 => IntrospectionState::TypeBeingIntrospected,
            2 => IntrospectionState::TypeIntrospected,
            3 => IntrospectionState::MembersBeingIntrospected,
            _ => IntrospectionState::FullyIntrospected,
        }
    }
}

/// Whether member queries include mixed-in members
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MixedIn {
    /// Declared and mixed-in members
    Included,
    /// Declared members only
    Excluded,
}

/// Direct or transitive subclasses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    /// Immediate subtypes only
    Direct,
    /// All subtypes, at any depth
    Transitive,
}

#[derive(Default)]
struct MemberLists {
    actions: Vec<Arc<ObjectAction>>,
    associations: Vec<ObjectAssociation>,
    action_snapshot: Option<Arc<[Arc<ObjectAction>]>>,
    association_snapshot: Option<Arc<[ObjectAssociation]>>,
}

impl MemberLists {
    fn replace(&mut self, actions: Vec<Arc<ObjectAction>>, associations: Vec<ObjectAssociation>) {
        self.actions = sort_members(actions);
        self.associations = sort_members(associations);
        self.action_snapshot = None;
        self.association_snapshot = None;
    }

    fn actions(&mut self) -> Arc<[Arc<ObjectAction>]> {
        self.action_snapshot
            .get_or_insert_with(|| self.actions.iter().cloned().collect())
            .clone()
    }

    fn associations(&mut self) -> Arc<[ObjectAssociation]> {
        self.association_snapshot
            .get_or_insert_with(|| self.associations.iter().cloned().collect())
            .clone()
    }
}

/// The introspected description of one class
pub struct ObjectSpecification {
    class: Arc<ClassDescriptor>,
    identifier: Identifier,
    loader: Weak<SpecificationLoader>,
    facets: FacetHolder,
    introspector: ClassIntrospector,
    class_facets: OnceCell<()>,

    state: AtomicU8,
    introspection: ReentrantMutex<Cell<IntrospectionState>>,
    failure: OnceCell<MetaModelError>,

    superclass: OnceCell<Option<Arc<ObjectSpecification>>>,
    interfaces: OnceCell<Vec<Arc<ObjectSpecification>>>,
    direct_subclasses: Mutex<Vec<Weak<ObjectSpecification>>>,
    transitive_subclasses: OnceCell<Vec<Arc<ObjectSpecification>>>,

    members: Mutex<MemberLists>,
    mixed_in: OnceCell<()>,
}

impl ObjectSpecification {
    pub(crate) fn new(
        class: Arc<ClassDescriptor>,
        loader: Weak<SpecificationLoader>,
        introspector: ClassIntrospector,
    ) -> Self {
        Self {
            identifier: Identifier::class_identifier(class.logical_type_name()),
            class,
            loader,
            facets: FacetHolder::new(),
            introspector,
            class_facets: OnceCell::new(),
            state: AtomicU8::new(IntrospectionState::NotIntrospected as u8),
            introspection: ReentrantMutex::new(Cell::new(IntrospectionState::NotIntrospected)),
            failure: OnceCell::new(),
            superclass: OnceCell::new(),
            interfaces: OnceCell::new(),
            direct_subclasses: Mutex::new(Vec::new()),
            transitive_subclasses: OnceCell::new(),
            members: Mutex::new(MemberLists::default()),
            mixed_in: OnceCell::new(),
        }
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Current introspection state
    pub fn introspection_state(&self) -> IntrospectionState {
        IntrospectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Introspect up to (at least) the requested state.
    ///
    /// Idempotent. When called again by the thread that is already
    /// introspecting this specification, returns immediately with the
    /// partial state. A type-stage failure leaves the specification where it
    /// was; a member-stage failure is remembered and returned on every later
    /// request.
    pub fn introspect_up_to(self: &Arc<Self>, up_to: IntrospectionState) -> MetaModelResult<()> {
        if self.introspection_state() >= up_to {
            return Ok(());
        }

        let guard = self.introspection.lock();
        if let Some(err) = self.failure.get() {
            return Err(err.clone());
        }
        // Re-entered from a stage running on this thread
        if matches!(
            guard.get(),
            IntrospectionState::TypeBeingIntrospected | IntrospectionState::MembersBeingIntrospected
        ) {
            return Ok(());
        }

        let loader = self.loader.upgrade().ok_or(MetaModelError::LoaderDropped)?;

        if guard.get() < IntrospectionState::TypeIntrospected {
            self.transition(&guard, IntrospectionState::TypeBeingIntrospected);
            if let Err(err) = self.introspect_type(&loader) {
                self.transition(&guard, IntrospectionState::NotIntrospected);
                return Err(err);
            }
            self.transition(&guard, IntrospectionState::TypeIntrospected);
        }

        if up_to > IntrospectionState::TypeIntrospected && guard.get() < IntrospectionState::FullyIntrospected {
            self.transition(&guard, IntrospectionState::MembersBeingIntrospected);
            if let Err(err) = self.introspect_members(&loader) {
                self.transition(&guard, IntrospectionState::TypeIntrospected);
                loader.report().add(ValidationFailure::new(
                    FailureKind::Introspection,
                    self.identifier.clone(),
                    err.to_string(),
                ));
                let _ = self.failure.set(err.clone());
                return Err(err);
            }
            self.transition(&guard, IntrospectionState::FullyIntrospected);
            loader.schedule_validation(self);
        }

        Ok(())
    }

    fn transition(&self, cell: &Cell<IntrospectionState>, state: IntrospectionState) {
        cell.set(state);
        self.state.store(state as u8, Ordering::Release);
        trace!(class = %self.class.name(), ?state, "introspection state");
    }

    fn introspect_type(self: &Arc<Self>, loader: &SpecificationLoader) -> MetaModelResult<()> {
        loader.counters().record_type_stage();
        // A retried type stage must not rerun the class factories
        self.class_facets.get_or_init(|| {
            loader.counters().record_class_pass();
            self.introspector.introspect_class(&loader.introspection_env(), &self.facets);
        });

        let superclass = match self.class.superclass() {
            Some(name) => Some(loader.resolve_referenced(
                name,
                &self.class,
                "superclass",
                IntrospectionState::TypeIntrospected,
            )?),
            None => None,
        };
        let interfaces = self
            .class
            .interfaces()
            .iter()
            .map(|name| {
                loader.resolve_referenced(name, &self.class, "interface", IntrospectionState::TypeIntrospected)
            })
            .collect::<MetaModelResult<Vec<_>>>()?;

        if let Some(parent) = &superclass {
            parent.register_subclass(self);
        }
        for interface in &interfaces {
            interface.register_subclass(self);
        }
        let _ = self.superclass.set(superclass);
        let _ = self.interfaces.set(interfaces);

        debug!(class = %self.class.name(), facets = self.facets.len(), "type introspected");
        Ok(())
    }

    fn introspect_members(self: &Arc<Self>, loader: &SpecificationLoader) -> MetaModelResult<()> {
        loader.counters().record_member_stage();
        if self.class.is_value() {
            self.members.lock().replace(Vec::new(), Vec::new());
            debug!(class = %self.class.name(), "value type, no members");
            return Ok(());
        }

        let env = loader.introspection_env();
        let mixin_main = self.mixin_facet().map(|m| m.main_method().to_string());
        let faceted_associations = self.introspector.association_faceted_methods(&env);
        let faceted_actions = self.introspector.action_faceted_methods(&env, mixin_main.as_deref());

        let mut associations = Vec::with_capacity(faceted_associations.len());
        for faceted in faceted_associations {
            faceted.freeze();
            let element = match faceted.type_ref().class_name() {
                Some(name) => Some(loader.resolve_referenced(
                    name,
                    &self.class,
                    faceted.member_id(),
                    IntrospectionState::TypeIntrospected,
                )?),
                None => None,
            };
            associations.push(self.declared_association(faceted, element.as_ref()));
        }

        let actions: Vec<Arc<ObjectAction>> = faceted_actions
            .into_iter()
            .map(|faceted| {
                faceted.freeze();
                Arc::new(ObjectAction::new(MemberCore::declared(Arc::new(faceted), self)))
            })
            .collect();

        debug!(
            class = %self.class.name(),
            actions = actions.len(),
            associations = associations.len(),
            "members introspected"
        );
        self.members.lock().replace(actions, associations);
        Ok(())
    }

    fn declared_association(
        self: &Arc<Self>,
        faceted: FacetedMethod,
        element: Option<&Arc<ObjectSpecification>>,
    ) -> ObjectAssociation {
        let feature_type = faceted.feature_type();
        let core = MemberCore::declared(Arc::new(faceted), self);
        match feature_type {
            FeatureType::Collection => {
                ObjectAssociation::OneToMany(Arc::new(OneToManyAssociation::new(core, element)))
            }
            _ => ObjectAssociation::OneToOne(Arc::new(OneToOneAssociation::new(core, element))),
        }
    }

    fn ensure_introspected(self: &Arc<Self>) {
        if let Err(err) = self.introspect_up_to(IntrospectionState::FullyIntrospected) {
            warn!(class = %self.class.name(), error = %err, "introspection failed");
        }
    }

    fn ensure_mixed_in(self: &Arc<Self>) {
        if self.introspection_state() != IntrospectionState::FullyIntrospected {
            return;
        }
        self.mixed_in.get_or_init(|| {
            if let Some(loader) = self.loader.upgrade() {
                super::mixin::contribute_mixed_in_members(self, &loader);
            }
        });
    }

    /// Add mixed-in members, skipping any whose id is already taken.
    ///
    /// Actions and associations are checked separately. Declared ids are
    /// collected first (for duplicate declared ids the last one wins); each
    /// clash is reported and the merge continues.
    pub(crate) fn merge_mixed_in_members(
        &self,
        actions: Vec<Arc<ObjectAction>>,
        associations: Vec<ObjectAssociation>,
        report: &ValidationReport,
    ) {
        let mut lists = self.members.lock();

        let mut action_ids: FxHashMap<String, FeatureType> = lists
            .actions
            .iter()
            .map(|a| (a.id().to_string(), a.feature_type()))
            .collect();
        let mut merged_actions = lists.actions.clone();
        for action in actions {
            if let Some(existing) = action_ids.get(action.id()) {
                report.add(self.clash(action.id(), *existing, action.core()));
                continue;
            }
            action_ids.insert(action.id().to_string(), action.feature_type());
            merged_actions.push(action);
        }

        let mut association_ids: FxHashMap<String, FeatureType> = lists
            .associations
            .iter()
            .map(|a| (a.id().to_string(), a.feature_type()))
            .collect();
        let mut merged_associations = lists.associations.clone();
        for association in associations {
            if let Some(existing) = association_ids.get(association.id()) {
                report.add(self.clash(association.id(), *existing, association.core()));
                continue;
            }
            association_ids.insert(association.id().to_string(), association.feature_type());
            merged_associations.push(association);
        }

        lists.replace(merged_actions, merged_associations);
    }

    fn clash(&self, id: &str, existing: FeatureType, contributed: &MemberCore) -> ValidationFailure {
        let mixin = contributed
            .mixin_origin()
            .map(|origin| origin.mixin_specification().class().name().to_string())
            .unwrap_or_default();
        ValidationFailure::new(
            FailureKind::MemberIdClash,
            self.identifier.clone(),
            format!(
                "{:?} '{}' contributed by mixin {} clashes with an existing {:?} of {}",
                contributed.feature_type(),
                id,
                mixin,
                existing,
                self.class.name()
            ),
        )
    }

    // ========================================================================
    // Members
    // ========================================================================

    /// Actions in layout order
    pub fn actions(self: &Arc<Self>, mixed_in: MixedIn) -> Vec<Arc<ObjectAction>> {
        self.ensure_introspected();
        if mixed_in == MixedIn::Included {
            self.ensure_mixed_in();
        }
        let snapshot = self.members.lock().actions();
        snapshot
            .iter()
            .filter(|a| mixed_in == MixedIn::Included || !a.is_mixed_in())
            .cloned()
            .collect()
    }

    /// Properties and collections in layout order
    pub fn associations(self: &Arc<Self>, mixed_in: MixedIn) -> Vec<ObjectAssociation> {
        self.ensure_introspected();
        if mixed_in == MixedIn::Included {
            self.ensure_mixed_in();
        }
        let snapshot = self.members.lock().associations();
        snapshot
            .iter()
            .filter(|a| mixed_in == MixedIn::Included || !a.is_mixed_in())
            .cloned()
            .collect()
    }

    /// Properties in layout order
    pub fn properties(self: &Arc<Self>, mixed_in: MixedIn) -> Vec<Arc<OneToOneAssociation>> {
        self.associations(mixed_in)
            .iter()
            .filter_map(|a| a.as_one_to_one().cloned())
            .collect()
    }

    /// Collections in layout order
    pub fn collections(self: &Arc<Self>, mixed_in: MixedIn) -> Vec<Arc<OneToManyAssociation>> {
        self.associations(mixed_in)
            .iter()
            .filter_map(|a| a.as_one_to_many().cloned())
            .collect()
    }

    /// Associations included in object snapshots
    pub fn snapshot_associations(self: &Arc<Self>) -> Vec<ObjectAssociation> {
        self.associations(MixedIn::Included)
            .into_iter()
            .filter(|a| !a.is_snapshot_excluded())
            .collect()
    }

    /// Action by id, searching supertypes when this type has none
    pub fn get_action(self: &Arc<Self>, id: &str, mixed_in: MixedIn) -> Option<Arc<ObjectAction>> {
        self.actions(mixed_in)
            .into_iter()
            .find(|a| a.id() == id)
            .or_else(|| self.superclass()?.get_action(id, mixed_in))
    }

    /// Association by id, searching supertypes when this type has none
    pub fn get_association(self: &Arc<Self>, id: &str, mixed_in: MixedIn) -> Option<ObjectAssociation> {
        self.associations(mixed_in)
            .into_iter()
            .find(|a| a.id() == id)
            .or_else(|| self.superclass()?.get_association(id, mixed_in))
    }

    /// Declared action by id, without triggering introspection
    pub fn declared_action(&self, id: &str) -> Option<Arc<ObjectAction>> {
        self.members
            .lock()
            .actions
            .iter()
            .find(|a| a.id() == id && !a.is_mixed_in())
            .cloned()
    }

    // ========================================================================
    // Facets and hierarchy
    // ========================================================================

    /// Type-level facets declared on this type
    pub fn facets(&self) -> &FacetHolder {
        &self.facets
    }

    /// Facet of the given type, searching this type, its interfaces and then
    /// its superclass. Fallback facets lose to any non-fallback candidate.
    pub fn get_facet(&self, facet_type: FacetType) -> Option<Arc<dyn Facet>> {
        let own = self.facets.get_facet(facet_type);
        let interfaces = self
            .interfaces
            .get()
            .into_iter()
            .flatten()
            .filter_map(move |i| i.get_facet(facet_type));
        let superclass = std::iter::once_with(|| {
            self.superclass
                .get()
                .and_then(Option::as_ref)
                .and_then(|s| s.get_facet(facet_type))
        })
        .flatten();
        select_facet(own.into_iter().chain(interfaces).chain(superclass))
    }

    /// Mixin facet, for mixin types
    pub fn mixin_facet(&self) -> Option<MixinFacet> {
        self.facets.get_as::<MixinFacet>(FacetType::MIXIN)
    }

    /// Superclass specification
    pub fn superclass(&self) -> Option<Arc<ObjectSpecification>> {
        self.superclass.get().cloned().flatten()
    }

    /// Interface specifications
    pub fn interfaces(&self) -> Vec<Arc<ObjectSpecification>> {
        self.interfaces.get().cloned().unwrap_or_default()
    }

    fn register_subclass(&self, subclass: &Arc<ObjectSpecification>) {
        let weak = Arc::downgrade(subclass);
        let mut subclasses = self.direct_subclasses.lock();
        if !subclasses.iter().any(|s| Weak::ptr_eq(s, &weak)) {
            subclasses.push(weak);
        }
    }

    /// Known subtypes.
    ///
    /// Subtypes register themselves when their type stage runs. The
    /// transitive set is computed on first request and kept.
    pub fn subclasses(&self, depth: Depth) -> Vec<Arc<ObjectSpecification>> {
        match depth {
            Depth::Direct => self.direct_subclasses(),
            Depth::Transitive => self
                .transitive_subclasses
                .get_or_init(|| {
                    let mut found: Vec<Arc<ObjectSpecification>> = Vec::new();
                    let mut pending = self.direct_subclasses();
                    while let Some(next) = pending.pop() {
                        if found.iter().any(|s| Arc::ptr_eq(s, &next)) {
                            continue;
                        }
                        pending.extend(next.direct_subclasses());
                        found.push(next);
                    }
                    found.sort_by(|a, b| a.class.name().cmp(b.class.name()));
                    found
                })
                .clone(),
        }
    }

    fn direct_subclasses(&self) -> Vec<Arc<ObjectSpecification>> {
        self.direct_subclasses
            .lock()
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    /// Check if this type is `other` or one of its subtypes
    pub fn is_of_type(&self, other: &ObjectSpecification) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        self.superclass().is_some_and(|s| s.is_of_type(other))
            || self.interfaces().iter().any(|i| i.is_of_type(other))
    }

    /// Specification of another class from the same loader, introspected
    /// up to its type stage
    pub fn specification_for(&self, class_name: &str) -> Option<Arc<ObjectSpecification>> {
        let loader = self.loader.upgrade()?;
        loader
            .load_specification(class_name, IntrospectionState::TypeIntrospected)
            .ok()
    }

    // ========================================================================
    // Descriptive accessors
    // ========================================================================

    /// Class descriptor
    pub fn class(&self) -> &Arc<ClassDescriptor> {
        &self.class
    }

    /// Class name
    pub fn full_identifier(&self) -> &str {
        self.class.name()
    }

    /// Logical type name
    pub fn logical_type_name(&self) -> &str {
        self.class.logical_type_name()
    }

    /// Type identifier
    pub fn identifier(&self) -> Identifier {
        self.identifier.clone()
    }

    /// Display name
    pub fn friendly_name(&self) -> String {
        self.facets
            .get_as::<NamedFacet>(FacetType::NAMED)
            .map(|f| f.name().to_string())
            .unwrap_or_else(|| natural_name(self.class.simple_name()))
    }

    /// Effective introspection policy
    pub fn introspection_policy(&self) -> IntrospectionPolicy {
        self.introspector.policy()
    }

    /// Check if this is a value type
    pub fn is_value(&self) -> bool {
        self.class.is_value()
    }

    /// Check if this is a mixin type
    pub fn is_mixin(&self) -> bool {
        self.facets.contains(FacetType::MIXIN)
    }

    /// Check if this type cannot be instantiated
    pub fn is_abstract(&self) -> bool {
        self.class.is_abstract()
    }

    /// Leftover methods that look like they were meant for a member
    pub fn potential_orphans(&self) -> Vec<Arc<MethodDescriptor>> {
        self.introspector.potential_orphans()
    }
}

impl fmt::Debug for ObjectSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectSpecification")
            .field("class", &self.class.name())
            .field("logical_type_name", &self.logical_type_name())
            .field("state", &self.introspection_state())
            .finish()
    }
}
