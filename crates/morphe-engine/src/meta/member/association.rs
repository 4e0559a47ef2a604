//! Properties and collections

use std::sync::{Arc, Weak};

use tracing::debug;

use morphe_types::{Consent, InteractionResult, InteractionType, ManagedObject, Value};

use super::{MemberCore, ObjectMember};
use crate::error::{unexpected_code_reach, InteractionError};
use crate::meta::class::TypeRef;
use crate::meta::facet::{
    ActionInvocationFacet, CollectionAccessorFacet, FacetType, MandatoryFacet,
    PropertyAccessorFacet, PropertySetterFacet,
};
use crate::meta::interaction::{
    validity_result, CommandRecord, ExecutionContext, InteractionContext, InteractionHead,
    InteractionInitiatedBy, Where,
};
use crate::meta::spec::ObjectSpecification;

/// Read a mixed-in association through the mixin's main action
fn read_through_mixin(core: &MemberCore, head: &InteractionHead) -> Result<Value, String> {
    let invocation = core
        .facets()
        .get_as::<ActionInvocationFacet>(FacetType::ACTION_INVOCATION)
        .unwrap_or_else(|| unexpected_code_reach(format!("{} has no accessor", core.identifier())));
    invocation.invoke(head.target(), &[])
}

/// A single-valued property
#[derive(Debug)]
pub struct OneToOneAssociation {
    core: MemberCore,
    element_spec: Option<Weak<ObjectSpecification>>,
}

impl OneToOneAssociation {
    pub(crate) fn new(core: MemberCore, element_spec: Option<&Arc<ObjectSpecification>>) -> Self {
        Self {
            core,
            element_spec: element_spec.map(Arc::downgrade),
        }
    }

    /// Property type
    pub fn type_ref(&self) -> &TypeRef {
        self.core.faceted.type_ref()
    }

    /// Specification of the property type, for object-valued properties
    pub fn element_specification(&self) -> Option<Arc<ObjectSpecification>> {
        self.element_spec.as_ref().and_then(Weak::upgrade)
    }

    /// Check if a null value is acceptable
    pub fn is_optional(&self) -> bool {
        self.core
            .facets()
            .get_as::<MandatoryFacet>(FacetType::MANDATORY)
            .is_none_or(|f| f.is_optional())
    }

    /// Check if the property has a setter
    pub fn is_modifiable(&self) -> bool {
        self.core.facets().contains(FacetType::PROPERTY_SETTER)
    }

    /// Current value
    pub fn get(&self, owner: &ManagedObject) -> Result<Value, InteractionError> {
        let head = self.core.interaction_head(owner)?;
        let value = match self
            .core
            .facets()
            .get_as::<PropertyAccessorFacet>(FacetType::PROPERTY_ACCESSOR)
        {
            Some(accessor) => accessor.get(head.target()),
            None => read_through_mixin(&self.core, &head),
        };
        value.map_err(|message| InteractionError::Invocation {
            identifier: self.identifier().clone(),
            message,
        })
    }

    /// Validity of a proposed value
    pub fn value_validity(
        &self,
        head: &InteractionHead,
        proposed: &Value,
        initiated_by: InteractionInitiatedBy,
    ) -> InteractionResult {
        let arguments = std::slice::from_ref(proposed);
        let ctx = InteractionContext::new(
            InteractionType::PropertyModify,
            self.identifier(),
            head,
            initiated_by,
            Where::NotSpecified,
        )
        .with_arguments(arguments);
        validity_result(self.core.facets(), &ctx)
    }

    /// Validity consent for a proposed value
    pub fn is_associated_value_valid(
        &self,
        owner: &ManagedObject,
        proposed: &Value,
        initiated_by: InteractionInitiatedBy,
    ) -> Consent {
        match self.core.interaction_head(owner) {
            Ok(head) => self
                .value_validity(&head, proposed, initiated_by)
                .create_consent(),
            Err(err) => Consent::veto(err.to_string()),
        }
    }

    /// Write a value without checking business rules
    pub fn set(
        &self,
        owner: &ManagedObject,
        value: Value,
        ctx: &ExecutionContext<'_>,
    ) -> Result<(), InteractionError> {
        let head = self.core.interaction_head(owner)?;
        self.write(&head, value, ctx)
    }

    /// Check visibility, usability and validity, then write
    pub fn set_with_rule_checking(
        &self,
        owner: &ManagedObject,
        value: Value,
        ctx: &ExecutionContext<'_>,
    ) -> Result<(), InteractionError> {
        let head = self.core.interaction_head(owner)?;
        self.core.check_accessible(&head, ctx.initiated_by, ctx.where_)?;

        let validity = self.value_validity(&head, &value, ctx.initiated_by);
        if validity.is_vetoing() {
            return Err(InteractionError::Invalid {
                identifier: self.identifier().clone(),
                reason: validity
                    .create_consent()
                    .reason_or_default()
                    .unwrap_or_default()
                    .to_string(),
            });
        }

        self.write(&head, value, ctx)
    }

    fn write(
        &self,
        head: &InteractionHead,
        value: Value,
        ctx: &ExecutionContext<'_>,
    ) -> Result<(), InteractionError> {
        let Some(setter) = self
            .core
            .facets()
            .get_as::<PropertySetterFacet>(FacetType::PROPERTY_SETTER)
        else {
            return Err(InteractionError::Disabled {
                identifier: self.identifier().clone(),
                reason: "Property cannot be modified".to_string(),
            });
        };

        ctx.record(|| CommandRecord {
            identifier: self.identifier().clone(),
            owner_class: head.owner().class_name().to_string(),
            arguments: vec![value.clone()],
            initiated_by: ctx.initiated_by,
        });
        setter
            .set(head.target(), value)
            .map_err(|message| InteractionError::Invocation {
                identifier: self.identifier().clone(),
                message,
            })?;

        debug!(property = %self.identifier(), "property modified");
        Ok(())
    }
}

impl ObjectMember for OneToOneAssociation {
    fn core(&self) -> &MemberCore {
        &self.core
    }
}

/// A collection of objects
#[derive(Debug)]
pub struct OneToManyAssociation {
    core: MemberCore,
    element_spec: Option<Weak<ObjectSpecification>>,
}

impl OneToManyAssociation {
    pub(crate) fn new(core: MemberCore, element_spec: Option<&Arc<ObjectSpecification>>) -> Self {
        Self {
            core,
            element_spec: element_spec.map(Arc::downgrade),
        }
    }

    /// Element type
    pub fn element_type(&self) -> &TypeRef {
        self.core.faceted.type_ref()
    }

    /// Specification of the element type
    pub fn element_specification(&self) -> Option<Arc<ObjectSpecification>> {
        self.element_spec.as_ref().and_then(Weak::upgrade)
    }

    /// Current elements
    pub fn get(&self, owner: &ManagedObject) -> Result<Value, InteractionError> {
        let head = self.core.interaction_head(owner)?;
        let value = match self
            .core
            .facets()
            .get_as::<CollectionAccessorFacet>(FacetType::COLLECTION_ACCESSOR)
        {
            Some(accessor) => accessor.get(head.target()),
            None => read_through_mixin(&self.core, &head),
        };
        value.map_err(|message| InteractionError::Invocation {
            identifier: self.identifier().clone(),
            message,
        })
    }
}

impl ObjectMember for OneToManyAssociation {
    fn core(&self) -> &MemberCore {
        &self.core
    }
}

/// A property or a collection
#[derive(Debug, Clone)]
pub enum ObjectAssociation {
    /// Single-valued
    OneToOne(Arc<OneToOneAssociation>),
    /// Multi-valued
    OneToMany(Arc<OneToManyAssociation>),
}

impl ObjectAssociation {
    /// The property, if this is one
    pub fn as_one_to_one(&self) -> Option<&Arc<OneToOneAssociation>> {
        match self {
            ObjectAssociation::OneToOne(property) => Some(property),
            ObjectAssociation::OneToMany(_) => None,
        }
    }

    /// The collection, if this is one
    pub fn as_one_to_many(&self) -> Option<&Arc<OneToManyAssociation>> {
        match self {
            ObjectAssociation::OneToMany(collection) => Some(collection),
            ObjectAssociation::OneToOne(_) => None,
        }
    }

    /// Check if this is a collection
    pub fn is_one_to_many(&self) -> bool {
        matches!(self, ObjectAssociation::OneToMany(_))
    }

    /// Current value
    pub fn get(&self, owner: &ManagedObject) -> Result<Value, InteractionError> {
        match self {
            ObjectAssociation::OneToOne(property) => property.get(owner),
            ObjectAssociation::OneToMany(collection) => collection.get(owner),
        }
    }

    /// Specification of the value or element type
    pub fn element_specification(&self) -> Option<Arc<ObjectSpecification>> {
        match self {
            ObjectAssociation::OneToOne(property) => property.element_specification(),
            ObjectAssociation::OneToMany(collection) => collection.element_specification(),
        }
    }

    /// Check if snapshots leave this association out
    pub fn is_snapshot_excluded(&self) -> bool {
        self.core().facets().contains(FacetType::SNAPSHOT_EXCLUDED)
    }
}

impl ObjectMember for ObjectAssociation {
    fn core(&self) -> &MemberCore {
        match self {
            ObjectAssociation::OneToOne(property) => property.core(),
            ObjectAssociation::OneToMany(collection) => collection.core(),
        }
    }
}
