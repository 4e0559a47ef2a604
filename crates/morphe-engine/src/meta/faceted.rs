//! Faceted methods
//!
//! Intermediate representation produced by the class introspector: one
//! [`FacetedMethod`] per candidate member, carrying its feature type, the
//! backing method, the member type, parameters and a facet holder that the
//! facet factories populate. Member models are built from these.

use std::sync::Arc;

use morphe_types::names::natural_name;
use morphe_types::{FeatureType, Identifier};

use super::class::{MethodDescriptor, ParameterDescriptor, TypeRef};
use super::facet::{FacetHolder, FacetType, MemberOrderFacet, NamedFacet};

/// An action parameter with its facets
#[derive(Debug)]
pub struct FacetedMethodParameter {
    feature_type: FeatureType,
    index: usize,
    descriptor: ParameterDescriptor,
    identifier: Identifier,
    facets: FacetHolder,
}

impl FacetedMethodParameter {
    /// Create a parameter of the given action
    pub fn new(index: usize, descriptor: ParameterDescriptor, action: &Identifier) -> Self {
        let feature_type = if descriptor.type_ref().is_collection() {
            FeatureType::ActionParameterCollection
        } else {
            FeatureType::ActionParameterScalar
        };
        Self {
            feature_type,
            index,
            descriptor,
            identifier: action.clone(),
            facets: FacetHolder::new(),
        }
    }

    /// Scalar or collection parameter
    pub fn feature_type(&self) -> FeatureType {
        self.feature_type
    }

    /// Position
    pub fn index(&self) -> usize {
        self.index
    }

    /// Parameter name
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// Parameter type
    pub fn type_ref(&self) -> &TypeRef {
        self.descriptor.type_ref()
    }

    /// Parameter description
    pub fn descriptor(&self) -> &ParameterDescriptor {
        &self.descriptor
    }

    /// Identifier of the owning action
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Facets
    pub fn facets(&self) -> &FacetHolder {
        &self.facets
    }

    fn contributed(&self, action: &Identifier) -> Self {
        let copy = Self::new(self.index, self.descriptor.clone(), action);
        copy.facets.copy_from(&self.facets, &[]);
        copy
    }
}

/// A member candidate with its facets
#[derive(Debug)]
pub struct FacetedMethod {
    feature_type: FeatureType,
    identifier: Identifier,
    method: Arc<MethodDescriptor>,
    type_ref: TypeRef,
    parameters: Vec<FacetedMethodParameter>,
    facets: FacetHolder,
}

impl FacetedMethod {
    /// Property backed by a getter
    pub fn for_property(logical_type_name: &str, member_id: &str, getter: Arc<MethodDescriptor>) -> Self {
        Self {
            feature_type: FeatureType::Property,
            identifier: Identifier::association_identifier(logical_type_name, member_id),
            type_ref: getter.return_type().clone(),
            method: getter,
            parameters: Vec::new(),
            facets: FacetHolder::new(),
        }
    }

    /// Collection backed by a getter; the member type is the element type
    pub fn for_collection(
        logical_type_name: &str,
        member_id: &str,
        getter: Arc<MethodDescriptor>,
    ) -> Self {
        Self {
            feature_type: FeatureType::Collection,
            identifier: Identifier::association_identifier(logical_type_name, member_id),
            type_ref: getter.return_type().element_type().clone(),
            method: getter,
            parameters: Vec::new(),
            facets: FacetHolder::new(),
        }
    }

    /// Action with the given effective parameters
    pub fn for_action(
        logical_type_name: &str,
        method: Arc<MethodDescriptor>,
        parameters: Vec<ParameterDescriptor>,
    ) -> Self {
        let parameter_types = parameters.iter().map(|p| p.type_ref().type_name()).collect();
        let identifier =
            Identifier::action_identifier(logical_type_name, method.name(), parameter_types);
        let parameters = parameters
            .into_iter()
            .enumerate()
            .map(|(index, descriptor)| FacetedMethodParameter::new(index, descriptor, &identifier))
            .collect();
        Self {
            feature_type: FeatureType::Action,
            identifier,
            type_ref: method.return_type().clone(),
            method,
            parameters,
            facets: FacetHolder::new(),
        }
    }

    /// Copy this member for another owning type, under another id.
    ///
    /// Facets are copied except the listed capabilities; the copy is not frozen.
    pub fn contributed(
        &self,
        logical_type_name: &str,
        feature_type: FeatureType,
        member_id: &str,
        except: &[FacetType],
    ) -> Self {
        let identifier = match feature_type {
            FeatureType::Action => Identifier::action_identifier(
                logical_type_name,
                member_id,
                self.identifier.parameter_types().to_vec(),
            ),
            _ => Identifier::association_identifier(logical_type_name, member_id),
        };
        let type_ref = match feature_type {
            FeatureType::Collection => self.type_ref.element_type().clone(),
            _ => self.type_ref.clone(),
        };
        let parameters = self
            .parameters
            .iter()
            .map(|p| p.contributed(&identifier))
            .collect();
        let facets = FacetHolder::new();
        facets.copy_from(&self.facets, except);
        Self {
            feature_type,
            identifier,
            method: self.method.clone(),
            type_ref,
            parameters,
            facets,
        }
    }

    /// Property, collection or action
    pub fn feature_type(&self) -> FeatureType {
        self.feature_type
    }

    /// Member identifier
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Member id
    pub fn member_id(&self) -> &str {
        self.identifier.member_id()
    }

    /// Backing method
    pub fn method(&self) -> &Arc<MethodDescriptor> {
        &self.method
    }

    /// Property type, collection element type or action return type
    pub fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }

    /// Action parameters
    pub fn parameters(&self) -> &[FacetedMethodParameter] {
        &self.parameters
    }

    /// Facets
    pub fn facets(&self) -> &FacetHolder {
        &self.facets
    }

    /// Friendly name from the name facet, else derived from the id
    pub fn friendly_name(&self) -> String {
        self.facets
            .get_as::<NamedFacet>(FacetType::NAMED)
            .map(|f| f.name().to_string())
            .unwrap_or_else(|| natural_name(self.member_id()))
    }

    /// Layout sequence, if any
    pub fn sequence(&self) -> Option<String> {
        self.facets
            .get_as::<MemberOrderFacet>(FacetType::MEMBER_ORDER)
            .map(|f| f.sequence().to_string())
    }

    /// Freeze this member's and its parameters' facets
    pub fn freeze(&self) {
        self.facets.freeze();
        for parameter in &self.parameters {
            parameter.facets.freeze();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::facet::Precedence;

    #[test]
    fn test_action_identifier_uses_effective_parameters() {
        let method = Arc::new(
            MethodDescriptor::new("addLine")
                .with_param("product", TypeRef::class("Product"))
                .with_param("quantity", TypeRef::scalar("i64")),
        );
        let parameters = method.parameters().to_vec();
        let action = FacetedMethod::for_action("shop.Order", method, parameters);

        assert_eq!(action.identifier().to_string(), "shop.Order#addLine(Product,i64)");
        assert_eq!(action.parameters().len(), 2);
        assert_eq!(action.parameters()[1].name(), "quantity");
        assert_eq!(
            action.parameters()[0].feature_type(),
            FeatureType::ActionParameterScalar
        );
    }

    #[test]
    fn test_collection_type_is_element_type() {
        let getter = Arc::new(
            MethodDescriptor::new("getLines")
                .returning(TypeRef::collection_of(TypeRef::class("OrderLine"))),
        );
        let lines = FacetedMethod::for_collection("Order", "lines", getter);
        assert_eq!(lines.type_ref(), &TypeRef::class("OrderLine"));
        assert_eq!(lines.friendly_name(), "Lines");
    }

    #[test]
    fn test_contributed_copy_replaces_identity() {
        let method = Arc::new(MethodDescriptor::new("act").returning(TypeRef::scalar("String")));
        let source = FacetedMethod::for_action("Order_changeStatus", method, Vec::new());
        source
            .facets()
            .add_facet(Arc::new(NamedFacet::new("Act", Precedence::Inferred)));
        source
            .facets()
            .add_facet(Arc::new(MemberOrderFacet::new("2", Precedence::Annotated)));
        source.freeze();

        let copy = source.contributed("Order", FeatureType::Property, "changeStatus", &[FacetType::NAMED]);

        assert_eq!(copy.identifier().to_string(), "Order#changeStatus");
        assert_eq!(copy.feature_type(), FeatureType::Property);
        assert_eq!(copy.friendly_name(), "Change status");
        assert_eq!(copy.sequence().as_deref(), Some("2"));
        assert!(!copy.facets().is_frozen());
    }
}
