//! Member models
//!
//! The runtime view of an object's properties, collections and actions.
//! Each member wraps a frozen [`FacetedMethod`] and knows the specification
//! that declares it. Members contributed by a mixin also remember where
//! they came from, so that interactions target a mixin instance built
//! around the owner rather than the owner itself.

mod action;
mod association;

use std::sync::{Arc, Weak};

use morphe_types::{
    Consent, FeatureType, Identifier, InteractionResult, InteractionType, ManagedObject,
};

use super::facet::{Facet, FacetHolder, FacetType, MixinFacet};
use super::faceted::FacetedMethod;
use super::interaction::{
    usability_result, visibility_result, InteractionContext, InteractionHead,
    InteractionInitiatedBy, Where,
};
use super::sequence::Sequenced;
use super::spec::ObjectSpecification;
use crate::error::InteractionError;

pub use action::{ObjectAction, ObjectActionParameter};
pub use association::{ObjectAssociation, OneToManyAssociation, OneToOneAssociation};

/// Where a mixed-in member comes from
#[derive(Debug, Clone)]
pub struct MixinOrigin {
    mixin_spec: Arc<ObjectSpecification>,
    mixin_facet: MixinFacet,
    mixin_action: Arc<ObjectAction>,
}

impl MixinOrigin {
    pub(crate) fn new(
        mixin_spec: Arc<ObjectSpecification>,
        mixin_facet: MixinFacet,
        mixin_action: Arc<ObjectAction>,
    ) -> Self {
        Self {
            mixin_spec,
            mixin_facet,
            mixin_action,
        }
    }

    /// Specification of the mixin type
    pub fn mixin_specification(&self) -> &Arc<ObjectSpecification> {
        &self.mixin_spec
    }

    /// The mixin's main action, as declared on the mixin type
    pub fn mixin_action(&self) -> &Arc<ObjectAction> {
        &self.mixin_action
    }

    /// Mixin facet used to construct the mixin
    pub fn mixin_facet(&self) -> &MixinFacet {
        &self.mixin_facet
    }
}

/// Declared on the type itself, or contributed by a mixin
#[derive(Debug, Clone)]
pub enum MemberOrigin {
    /// Declared by the owning type or one of its supertypes
    Declared,
    /// Contributed by a mixin
    MixedIn(MixinOrigin),
}

/// State shared by every kind of member
#[derive(Debug)]
pub struct MemberCore {
    faceted: Arc<FacetedMethod>,
    declaring_type: Weak<ObjectSpecification>,
    origin: MemberOrigin,
}

impl MemberCore {
    pub(crate) fn declared(faceted: Arc<FacetedMethod>, declaring_type: &Arc<ObjectSpecification>) -> Self {
        Self {
            faceted,
            declaring_type: Arc::downgrade(declaring_type),
            origin: MemberOrigin::Declared,
        }
    }

    pub(crate) fn mixed_in(
        faceted: Arc<FacetedMethod>,
        declaring_type: &Arc<ObjectSpecification>,
        origin: MixinOrigin,
    ) -> Self {
        Self {
            faceted,
            declaring_type: Arc::downgrade(declaring_type),
            origin: MemberOrigin::MixedIn(origin),
        }
    }

    /// Member id
    pub fn id(&self) -> &str {
        self.faceted.member_id()
    }

    /// Member identifier
    pub fn identifier(&self) -> &Identifier {
        self.faceted.identifier()
    }

    /// Property, collection or action
    pub fn feature_type(&self) -> FeatureType {
        self.faceted.feature_type()
    }

    /// Display name
    pub fn friendly_name(&self) -> String {
        self.faceted.friendly_name()
    }

    /// Layout sequence
    pub fn sequence(&self) -> Option<String> {
        self.faceted.sequence()
    }

    /// Facets
    pub fn facets(&self) -> &FacetHolder {
        self.faceted.facets()
    }

    /// Facet of the given type
    pub fn get_facet(&self, facet_type: FacetType) -> Option<Arc<dyn Facet>> {
        self.faceted.facets().get_facet(facet_type)
    }

    /// Underlying faceted method
    pub fn faceted_method(&self) -> &FacetedMethod {
        &self.faceted
    }

    /// Specification this member belongs to, while it is alive
    pub fn declaring_type(&self) -> Option<Arc<ObjectSpecification>> {
        self.declaring_type.upgrade()
    }

    /// Declared or mixed in
    pub fn origin(&self) -> &MemberOrigin {
        &self.origin
    }

    /// Check if a mixin contributed this member
    pub fn is_mixed_in(&self) -> bool {
        matches!(self.origin, MemberOrigin::MixedIn(_))
    }

    /// Mixin origin, for mixed-in members
    pub fn mixin_origin(&self) -> Option<&MixinOrigin> {
        match &self.origin {
            MemberOrigin::MixedIn(origin) => Some(origin),
            MemberOrigin::Declared => None,
        }
    }

    /// Owner and target for an interaction with this member.
    ///
    /// Mixed-in members construct a fresh mixin instance around the owner.
    pub fn interaction_head(&self, owner: &ManagedObject) -> Result<InteractionHead, InteractionError> {
        match &self.origin {
            MemberOrigin::Declared => Ok(InteractionHead::regular(owner.clone())),
            MemberOrigin::MixedIn(origin) => origin
                .mixin_facet
                .instantiate(owner)
                .map(|mixin| InteractionHead::mixin(owner.clone(), mixin))
                .map_err(|message| InteractionError::MixinInstantiation {
                    mixin: origin.mixin_spec.class().name().to_string(),
                    message,
                }),
        }
    }

    pub(crate) fn visibility(
        &self,
        head: &InteractionHead,
        initiated_by: InteractionInitiatedBy,
        where_: Where,
    ) -> InteractionResult {
        let ctx = InteractionContext::new(
            InteractionType::MemberVisibility,
            self.identifier(),
            head,
            initiated_by,
            where_,
        );
        visibility_result(self.facets(), &ctx)
    }

    pub(crate) fn usability(
        &self,
        head: &InteractionHead,
        initiated_by: InteractionInitiatedBy,
        where_: Where,
    ) -> InteractionResult {
        let ctx = InteractionContext::new(
            InteractionType::MemberUsability,
            self.identifier(),
            head,
            initiated_by,
            where_,
        );
        usability_result(self.facets(), &ctx)
    }

    /// Visibility consent; framework-initiated interactions always see the member
    pub fn is_visible(
        &self,
        owner: &ManagedObject,
        initiated_by: InteractionInitiatedBy,
        where_: Where,
    ) -> Consent {
        if initiated_by.is_framework() {
            return Consent::allow();
        }
        match self.interaction_head(owner) {
            Ok(head) => self.visibility(&head, initiated_by, where_).create_consent(),
            Err(err) => Consent::veto(err.to_string()),
        }
    }

    /// Usability consent; framework-initiated interactions can always use the member
    pub fn is_usable(
        &self,
        owner: &ManagedObject,
        initiated_by: InteractionInitiatedBy,
        where_: Where,
    ) -> Consent {
        if initiated_by.is_framework() {
            return Consent::allow();
        }
        match self.interaction_head(owner) {
            Ok(head) => self.usability(&head, initiated_by, where_).create_consent(),
            Err(err) => Consent::veto(err.to_string()),
        }
    }

    /// Visibility then usability, as errors
    pub(crate) fn check_accessible(
        &self,
        head: &InteractionHead,
        initiated_by: InteractionInitiatedBy,
        where_: Where,
    ) -> Result<(), InteractionError> {
        if initiated_by.is_framework() {
            return Ok(());
        }
        if self.visibility(head, initiated_by, where_).is_vetoing() {
            return Err(InteractionError::Hidden {
                identifier: self.identifier().clone(),
            });
        }
        let usability = self.usability(head, initiated_by, where_);
        if usability.is_vetoing() {
            return Err(InteractionError::Disabled {
                identifier: self.identifier().clone(),
                reason: usability
                    .create_consent()
                    .reason_or_default()
                    .unwrap_or_default()
                    .to_string(),
            });
        }
        Ok(())
    }
}

/// Behaviour common to actions and associations
pub trait ObjectMember {
    /// Shared member state
    fn core(&self) -> &MemberCore;

    /// Member id
    fn id(&self) -> &str {
        self.core().id()
    }

    /// Member identifier
    fn identifier(&self) -> &Identifier {
        self.core().identifier()
    }

    /// Display name
    fn friendly_name(&self) -> String {
        self.core().friendly_name()
    }

    /// Property, collection or action
    fn feature_type(&self) -> FeatureType {
        self.core().feature_type()
    }

    /// Check if a mixin contributed this member
    fn is_mixed_in(&self) -> bool {
        self.core().is_mixed_in()
    }

    /// Facet of the given type
    fn get_facet(&self, facet_type: FacetType) -> Option<Arc<dyn Facet>> {
        self.core().get_facet(facet_type)
    }

    /// Visibility consent
    fn is_visible(
        &self,
        owner: &ManagedObject,
        initiated_by: InteractionInitiatedBy,
        where_: Where,
    ) -> Consent {
        self.core().is_visible(owner, initiated_by, where_)
    }

    /// Usability consent
    fn is_usable(
        &self,
        owner: &ManagedObject,
        initiated_by: InteractionInitiatedBy,
        where_: Where,
    ) -> Consent {
        self.core().is_usable(owner, initiated_by, where_)
    }
}

impl<T: ObjectMember + ?Sized> ObjectMember for Arc<T> {
    fn core(&self) -> &MemberCore {
        (**self).core()
    }
}

impl<T: ObjectMember> Sequenced for T {
    fn member_id(&self) -> &str {
        self.id()
    }

    fn sequence(&self) -> Option<String> {
        self.core().sequence()
    }
}
