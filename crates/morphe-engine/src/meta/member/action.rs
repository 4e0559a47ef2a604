//! Actions and their parameters

use std::sync::Arc;

use tracing::debug;

use morphe_types::{
    Consent, FeatureType, Identifier, InteractionResult, InteractionResultSet, InteractionType,
    ManagedObject, Value,
};

use super::{MemberCore, ObjectMember};
use crate::error::{unexpected_code_reach, InteractionError};
use crate::meta::class::TypeRef;
use crate::meta::facet::{
    ActionInvocationFacet, ActionSemanticsFacet, FacetHolder, FacetType, MandatoryFacet,
    NamedFacet, ParametersTupleFacet, SemanticsOf,
};
use crate::meta::faceted::{FacetedMethod, FacetedMethodParameter};
use crate::meta::interaction::{
    validity_result, CommandRecord, ExecutionContext, InteractionContext, InteractionHead,
    InteractionInitiatedBy, Where,
};
use crate::meta::spec::ObjectSpecification;

/// One parameter of an action
#[derive(Debug, Clone)]
pub struct ObjectActionParameter {
    action: Arc<FacetedMethod>,
    index: usize,
}

impl ObjectActionParameter {
    fn faceted(&self) -> &FacetedMethodParameter {
        &self.action.parameters()[self.index]
    }

    /// Position in the argument list
    pub fn index(&self) -> usize {
        self.index
    }

    /// Parameter name
    pub fn name(&self) -> &str {
        self.faceted().name()
    }

    /// Display name
    pub fn friendly_name(&self) -> String {
        self.facets()
            .get_as::<NamedFacet>(FacetType::NAMED)
            .map(|f| f.name().to_string())
            .unwrap_or_else(|| morphe_types::names::natural_name(self.name()))
    }

    /// Parameter type
    pub fn type_ref(&self) -> &TypeRef {
        self.faceted().type_ref()
    }

    /// Scalar or collection parameter
    pub fn feature_type(&self) -> FeatureType {
        self.faceted().feature_type()
    }

    /// Identifier of the owning action
    pub fn identifier(&self) -> &Identifier {
        self.faceted().identifier()
    }

    /// Facets
    pub fn facets(&self) -> &FacetHolder {
        self.faceted().facets()
    }

    /// Check if a null argument is acceptable
    pub fn is_optional(&self) -> bool {
        self.facets()
            .get_as::<MandatoryFacet>(FacetType::MANDATORY)
            .is_some_and(|f| f.is_optional())
    }

    /// Validity of this parameter's argument within a proposed argument list
    pub fn validity(
        &self,
        head: &InteractionHead,
        arguments: &[Value],
        initiated_by: InteractionInitiatedBy,
    ) -> InteractionResult {
        let ctx = InteractionContext::new(
            InteractionType::ActionParameterValidity,
            self.identifier(),
            head,
            initiated_by,
            Where::NotSpecified,
        )
        .with_arguments(arguments)
        .with_parameter_index(self.index);
        validity_result(self.facets(), &ctx)
    }
}

/// An operation that can be invoked on an object
#[derive(Debug)]
pub struct ObjectAction {
    core: MemberCore,
    parameters: Vec<ObjectActionParameter>,
}

impl ObjectAction {
    pub(crate) fn new(core: MemberCore) -> Self {
        let faceted = core.faceted.clone();
        let parameters = (0..faceted.parameters().len())
            .map(|index| ObjectActionParameter {
                action: faceted.clone(),
                index,
            })
            .collect();
        Self { core, parameters }
    }

    /// Parameters in declaration order
    pub fn parameters(&self) -> &[ObjectActionParameter] {
        &self.parameters
    }

    /// Number of parameters
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Parameter by name
    pub fn parameter(&self, name: &str) -> Option<&ObjectActionParameter> {
        self.parameters.iter().find(|p| p.name() == name)
    }

    /// Declared return type
    pub fn return_type(&self) -> &TypeRef {
        self.core.faceted.type_ref()
    }

    /// Specification of the returned type, for actions returning objects
    pub fn return_specification(&self) -> Option<Arc<ObjectSpecification>> {
        let class_name = self.return_type().element_type().class_name()?;
        let declaring = self.core.declaring_type()?;
        declaring.specification_for(class_name)
    }

    /// Side-effect semantics; non-idempotent unless declared otherwise
    pub fn semantics(&self) -> SemanticsOf {
        self.core
            .facets()
            .get_as::<ActionSemanticsFacet>(FacetType::ACTION_SEMANTICS)
            .map(|f| f.semantics())
            .unwrap_or(SemanticsOf::NonIdempotent)
    }

    /// Per-parameter results followed by the whole-action result.
    ///
    /// The action as a whole is only checked once every parameter passes.
    /// An argument list of the wrong length yields a single vetoing result.
    pub fn argument_set_validity(
        &self,
        head: &InteractionHead,
        arguments: &[Value],
        initiated_by: InteractionInitiatedBy,
    ) -> InteractionResultSet {
        let mut results = InteractionResultSet::new();
        if arguments.len() != self.parameters.len() {
            let mut result =
                InteractionResult::new(InteractionType::ActionArgumentSetValidity, self.identifier().clone());
            result.advise(Some(format!(
                "Expected {} arguments, got {}",
                self.parameters.len(),
                arguments.len()
            )));
            results.add(result);
            return results;
        }

        for parameter in &self.parameters {
            results.add(parameter.validity(head, arguments, initiated_by));
        }
        if results.is_vetoing() {
            return results;
        }

        let ctx = InteractionContext::new(
            InteractionType::ActionArgumentSetValidity,
            self.identifier(),
            head,
            initiated_by,
            Where::NotSpecified,
        )
        .with_arguments(arguments);
        results.add(validity_result(self.core.facets(), &ctx));
        results
    }

    /// Validity consent for a proposed argument list; reports the first veto
    pub fn is_argument_set_valid(
        &self,
        owner: &ManagedObject,
        arguments: &[Value],
        initiated_by: InteractionInitiatedBy,
    ) -> Consent {
        match self.core.interaction_head(owner) {
            Ok(head) => self
                .argument_set_validity(&head, arguments, initiated_by)
                .create_consent(),
            Err(err) => Consent::veto(err.to_string()),
        }
    }

    /// Invoke the action without checking business rules.
    ///
    /// The command is recorded before the callable runs, so a failed
    /// invocation still leaves a record. A void action returns [`Value::Empty`].
    pub fn execute(
        &self,
        owner: &ManagedObject,
        arguments: &[Value],
        ctx: &ExecutionContext<'_>,
    ) -> Result<Value, InteractionError> {
        let head = self.core.interaction_head(owner)?;
        self.invoke(&head, arguments, ctx)
    }

    /// Check visibility, usability and validity, then invoke.
    ///
    /// Fails fast with the first failing check. Framework-initiated
    /// executions skip visibility and usability.
    pub fn execute_with_rule_checking(
        &self,
        owner: &ManagedObject,
        arguments: &[Value],
        ctx: &ExecutionContext<'_>,
    ) -> Result<Value, InteractionError> {
        let head = self.core.interaction_head(owner)?;
        self.core.check_accessible(&head, ctx.initiated_by, ctx.where_)?;

        let validity = self.argument_set_validity(&head, arguments, ctx.initiated_by);
        if let Some(invalid) = validity.first_vetoing() {
            return Err(InteractionError::Invalid {
                identifier: self.identifier().clone(),
                reason: invalid
                    .create_consent()
                    .reason_or_default()
                    .unwrap_or_default()
                    .to_string(),
            });
        }

        self.invoke(&head, arguments, ctx)
    }

    fn invoke(
        &self,
        head: &InteractionHead,
        arguments: &[Value],
        ctx: &ExecutionContext<'_>,
    ) -> Result<Value, InteractionError> {
        let invocation = self
            .core
            .facets()
            .get_as::<ActionInvocationFacet>(FacetType::ACTION_INVOCATION)
            .unwrap_or_else(|| unexpected_code_reach(format!("{} has no invocation facet", self.identifier())));

        ctx.record(|| CommandRecord {
            identifier: self.identifier().clone(),
            owner_class: head.owner().class_name().to_string(),
            arguments: arguments.to_vec(),
            initiated_by: ctx.initiated_by,
        });

        let packed;
        let call_arguments: &[Value] =
            match self.core.facets().get_as::<ParametersTupleFacet>(FacetType::PARAMETERS_TUPLE) {
                Some(tuple) => {
                    packed = [tuple.pack(arguments).map_err(|message| InteractionError::Invocation {
                        identifier: self.identifier().clone(),
                        message,
                    })?];
                    &packed
                }
                None => arguments,
            };

        let result = invocation
            .invoke(head.target(), call_arguments)
            .map_err(|message| InteractionError::Invocation {
                identifier: self.identifier().clone(),
                message,
            })?;

        debug!(action = %self.identifier(), initiated_by = ?ctx.initiated_by, "action executed");

        if self.return_type().is_void() {
            Ok(Value::Empty)
        } else {
            Ok(result)
        }
    }
}

impl ObjectMember for ObjectAction {
    fn core(&self) -> &MemberCore {
        &self.core
    }
}
