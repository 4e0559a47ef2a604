//! Built-in facets

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use morphe_types::{InteractionType, ManagedObject, Value, Veto};

use super::{Facet, FacetType, Precedence};
use crate::meta::class::{ConstructorDescriptor, MethodDescriptor, TypeRegistry};
use crate::meta::interaction::{InteractionContext, Where};
use crate::meta::policy::IntrospectionPolicy;

/// A method a facet calls back into (accessor, invoker or supporting method)
#[derive(Clone)]
pub struct SupportMethod {
    method: Arc<MethodDescriptor>,
}

impl SupportMethod {
    /// Wrap a method
    pub fn new(method: Arc<MethodDescriptor>) -> Self {
        Self { method }
    }

    /// Method name
    pub fn name(&self) -> &str {
        self.method.name()
    }

    /// Underlying method
    pub fn method(&self) -> &Arc<MethodDescriptor> {
        &self.method
    }

    /// Invoke on a target
    pub fn call(&self, target: &ManagedObject, args: &[Value]) -> Result<Value, String> {
        self.method.invoke(target, args)
    }

    /// Invoke and read the result as advice.
    ///
    /// Non-empty text vetoes with that reason, `true` vetoes without one,
    /// anything else allows. A failing call vetoes with the failure text.
    fn advise(&self, target: &ManagedObject, args: &[Value]) -> Option<Veto> {
        match self.call(target, args) {
            Ok(Value::Text(reason)) if !reason.is_empty() => Some(Veto::new(reason)),
            Ok(Value::Bool(true)) => Some(Veto::unexplained()),
            Ok(_) => None,
            Err(message) => {
                warn!(method = %self.name(), error = %message, "supporting method failed");
                Some(Veto::new(message))
            }
        }
    }
}

impl fmt::Debug for SupportMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.method.declaring_class(), self.method.name())
    }
}

// ============================================================================
// Visibility and usability
// ============================================================================

/// Statically hidden member
#[derive(Debug, Clone)]
pub struct HiddenFacet {
    scope: Where,
    precedence: Precedence,
}

impl HiddenFacet {
    /// Hidden within a scope
    pub fn new(scope: Where, precedence: Precedence) -> Self {
        Self { scope, precedence }
    }

    /// Scope the member is hidden in
    pub fn scope(&self) -> Where {
        self.scope
    }
}

impl Facet for HiddenFacet {
    fn facet_type(&self) -> FacetType {
        FacetType::HIDDEN
    }

    fn precedence(&self) -> Precedence {
        self.precedence
    }

    fn hides(&self, ctx: &InteractionContext<'_>) -> Option<Veto> {
        self.scope
            .includes(ctx.where_)
            .then(Veto::unexplained)
    }
}

/// Member hidden by a `hideXxx()` supporting method
#[derive(Debug, Clone)]
pub struct HideMethodFacet {
    support: SupportMethod,
}

impl HideMethodFacet {
    /// Create from the supporting method
    pub fn new(support: SupportMethod) -> Self {
        Self { support }
    }
}

impl Facet for HideMethodFacet {
    fn facet_type(&self) -> FacetType {
        FacetType::HIDE_METHOD
    }

    fn hides(&self, ctx: &InteractionContext<'_>) -> Option<Veto> {
        self.support.advise(ctx.head.target(), &[])
    }
}

/// Statically disabled member
#[derive(Debug, Clone)]
pub struct DisabledFacet {
    reason: Option<String>,
    scope: Where,
    precedence: Precedence,
}

impl DisabledFacet {
    /// Disabled everywhere
    pub fn new(reason: Option<String>, precedence: Precedence) -> Self {
        Self {
            reason,
            scope: Where::Anywhere,
            precedence,
        }
    }

    /// Forced on associations contributed by mixins
    pub fn for_contributed_association() -> Self {
        Self::new(
            Some("Contributed associations cannot be edited".to_string()),
            Precedence::High,
        )
    }

    /// Disabling reason
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

impl Facet for DisabledFacet {
    fn facet_type(&self) -> FacetType {
        FacetType::DISABLED
    }

    fn precedence(&self) -> Precedence {
        self.precedence
    }

    fn disables(&self, ctx: &InteractionContext<'_>) -> Option<Veto> {
        if !self.scope.includes(ctx.where_) {
            return None;
        }
        Some(match &self.reason {
            Some(reason) => Veto::new(reason.clone()),
            None => Veto::unexplained(),
        })
    }
}

/// Member disabled by a `disableXxx()` supporting method
#[derive(Debug, Clone)]
pub struct DisableMethodFacet {
    support: SupportMethod,
}

impl DisableMethodFacet {
    /// Create from the supporting method
    pub fn new(support: SupportMethod) -> Self {
        Self { support }
    }
}

impl Facet for DisableMethodFacet {
    fn facet_type(&self) -> FacetType {
        FacetType::DISABLE_METHOD
    }

    fn disables(&self, ctx: &InteractionContext<'_>) -> Option<Veto> {
        self.support.advise(ctx.head.target(), &[])
    }
}

// ============================================================================
// Validity
// ============================================================================

/// Action argument set checked by `validateXxx(args..)`
#[derive(Debug, Clone)]
pub struct ActionValidateMethodFacet {
    support: SupportMethod,
}

impl ActionValidateMethodFacet {
    /// Create from the supporting method
    pub fn new(support: SupportMethod) -> Self {
        Self { support }
    }
}

impl Facet for ActionValidateMethodFacet {
    fn facet_type(&self) -> FacetType {
        FacetType::ACTION_VALIDATE_METHOD
    }

    fn invalidates(&self, ctx: &InteractionContext<'_>) -> Option<Veto> {
        if ctx.interaction_type != InteractionType::ActionArgumentSetValidity {
            return None;
        }
        self.support.advise(ctx.head.target(), ctx.arguments)
    }
}

/// Proposed property value checked by `validateXxx(value)`
#[derive(Debug, Clone)]
pub struct PropertyValidateMethodFacet {
    support: SupportMethod,
}

impl PropertyValidateMethodFacet {
    /// Create from the supporting method
    pub fn new(support: SupportMethod) -> Self {
        Self { support }
    }
}

impl Facet for PropertyValidateMethodFacet {
    fn facet_type(&self) -> FacetType {
        FacetType::PROPERTY_VALIDATE_METHOD
    }

    fn invalidates(&self, ctx: &InteractionContext<'_>) -> Option<Veto> {
        if ctx.interaction_type != InteractionType::PropertyModify {
            return None;
        }
        let proposed = ctx.proposed_value().cloned().unwrap_or(Value::Null);
        self.support.advise(ctx.head.target(), &[proposed])
    }
}

/// Single action argument checked by `validateNXxx(arg)`
#[derive(Debug, Clone)]
pub struct ParameterValidateMethodFacet {
    support: SupportMethod,
    index: usize,
}

impl ParameterValidateMethodFacet {
    /// Create from the supporting method and the parameter position
    pub fn new(support: SupportMethod, index: usize) -> Self {
        Self { support, index }
    }
}

impl Facet for ParameterValidateMethodFacet {
    fn facet_type(&self) -> FacetType {
        FacetType::PARAMETER_VALIDATE_METHOD
    }

    fn invalidates(&self, ctx: &InteractionContext<'_>) -> Option<Veto> {
        if ctx.interaction_type != InteractionType::ActionParameterValidity
            || ctx.parameter_index != Some(self.index)
        {
            return None;
        }
        let proposed = ctx.proposed_value().cloned().unwrap_or(Value::Null);
        self.support.advise(ctx.head.target(), &[proposed])
    }
}

/// Whether a parameter or property value is required
#[derive(Debug, Clone)]
pub struct MandatoryFacet {
    name: String,
    optional: bool,
    precedence: Precedence,
}

impl MandatoryFacet {
    /// Required value
    pub fn mandatory(name: &str, precedence: Precedence) -> Self {
        Self {
            name: name.to_string(),
            optional: false,
            precedence,
        }
    }

    /// Optional value
    pub fn optional(name: &str, precedence: Precedence) -> Self {
        Self {
            name: name.to_string(),
            optional: true,
            precedence,
        }
    }

    /// Check if the value may be absent
    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

impl Facet for MandatoryFacet {
    fn facet_type(&self) -> FacetType {
        FacetType::MANDATORY
    }

    fn precedence(&self) -> Precedence {
        self.precedence
    }

    fn invalidates(&self, ctx: &InteractionContext<'_>) -> Option<Veto> {
        if self.optional {
            return None;
        }
        match ctx.interaction_type {
            InteractionType::ActionParameterValidity | InteractionType::PropertyModify => {}
            _ => return None,
        }
        match ctx.proposed_value() {
            Some(value) if !value.is_null() => None,
            _ => Some(Veto::new(format!("'{}' is mandatory", self.name))),
        }
    }
}

// ============================================================================
// Naming, layout and semantics
// ============================================================================

/// Friendly name of a type, member or parameter
#[derive(Debug, Clone)]
pub struct NamedFacet {
    name: String,
    precedence: Precedence,
}

impl NamedFacet {
    /// Create a name facet
    pub fn new(name: &str, precedence: Precedence) -> Self {
        Self {
            name: name.to_string(),
            precedence,
        }
    }

    /// Friendly name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Facet for NamedFacet {
    fn facet_type(&self) -> FacetType {
        FacetType::NAMED
    }

    fn precedence(&self) -> Precedence {
        self.precedence
    }
}

/// Dewey-decimal position of a member, such as `"1.2"`
#[derive(Debug, Clone)]
pub struct MemberOrderFacet {
    sequence: String,
    precedence: Precedence,
}

impl MemberOrderFacet {
    /// Create an order facet
    pub fn new(sequence: &str, precedence: Precedence) -> Self {
        Self {
            sequence: sequence.to_string(),
            precedence,
        }
    }

    /// Sequence string
    pub fn sequence(&self) -> &str {
        &self.sequence
    }
}

impl Facet for MemberOrderFacet {
    fn facet_type(&self) -> FacetType {
        FacetType::MEMBER_ORDER
    }

    fn precedence(&self) -> Precedence {
        self.precedence
    }
}

/// Side effects of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticsOf {
    /// No side effects (query only)
    Safe,
    /// Repeating has no further effect
    Idempotent,
    /// Each invocation has an effect
    NonIdempotent,
}

impl SemanticsOf {
    /// Parse a `semantics` metadata value
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "safe" => Some(Self::Safe),
            "idempotent" => Some(Self::Idempotent),
            "non_idempotent" => Some(Self::NonIdempotent),
            _ => None,
        }
    }

    /// Check if the action is a query
    pub fn is_safe(self) -> bool {
        self == Self::Safe
    }
}

/// Side-effect classification of an action
#[derive(Debug, Clone)]
pub struct ActionSemanticsFacet {
    semantics: SemanticsOf,
    precedence: Precedence,
}

impl ActionSemanticsFacet {
    /// Create a semantics facet
    pub fn new(semantics: SemanticsOf, precedence: Precedence) -> Self {
        Self {
            semantics,
            precedence,
        }
    }

    /// Default for actions that say nothing: non-idempotent
    pub fn fallback() -> Self {
        Self::new(SemanticsOf::NonIdempotent, Precedence::Fallback)
    }

    /// Semantics
    pub fn semantics(&self) -> SemanticsOf {
        self.semantics
    }
}

impl Facet for ActionSemanticsFacet {
    fn facet_type(&self) -> FacetType {
        FacetType::ACTION_SEMANTICS
    }

    fn precedence(&self) -> Precedence {
        self.precedence
    }
}

/// Excluded from structural snapshots
#[derive(Debug, Clone, Default)]
pub struct SnapshotExcludedFacet;

impl SnapshotExcludedFacet {
    /// Create the marker
    pub fn new() -> Self {
        Self
    }
}

impl Facet for SnapshotExcludedFacet {
    fn facet_type(&self) -> FacetType {
        FacetType::SNAPSHOT_EXCLUDED
    }

    fn precedence(&self) -> Precedence {
        Precedence::High
    }
}

/// Introspection policy a type was scanned with
#[derive(Debug, Clone)]
pub struct IntrospectionPolicyFacet {
    policy: IntrospectionPolicy,
}

impl IntrospectionPolicyFacet {
    /// Create a policy facet
    pub fn new(policy: IntrospectionPolicy) -> Self {
        Self { policy }
    }

    /// Policy
    pub fn policy(&self) -> IntrospectionPolicy {
        self.policy
    }
}

impl Facet for IntrospectionPolicyFacet {
    fn facet_type(&self) -> FacetType {
        FacetType::INTROSPECTION_POLICY
    }
}

// ============================================================================
// Invocation and access
// ============================================================================

/// Invokes the method behind an action
#[derive(Debug, Clone)]
pub struct ActionInvocationFacet {
    support: SupportMethod,
}

impl ActionInvocationFacet {
    /// Create from the action method
    pub fn new(support: SupportMethod) -> Self {
        Self { support }
    }

    /// Invoke on a target
    pub fn invoke(&self, target: &ManagedObject, args: &[Value]) -> Result<Value, String> {
        self.support.call(target, args)
    }

    /// Invoked method
    pub fn method(&self) -> &Arc<MethodDescriptor> {
        self.support.method()
    }
}

impl Facet for ActionInvocationFacet {
    fn facet_type(&self) -> FacetType {
        FacetType::ACTION_INVOCATION
    }
}

/// Reads a property through its getter
#[derive(Debug, Clone)]
pub struct PropertyAccessorFacet {
    support: SupportMethod,
}

impl PropertyAccessorFacet {
    /// Create from the getter
    pub fn new(support: SupportMethod) -> Self {
        Self { support }
    }

    /// Read the property
    pub fn get(&self, target: &ManagedObject) -> Result<Value, String> {
        self.support.call(target, &[])
    }
}

impl Facet for PropertyAccessorFacet {
    fn facet_type(&self) -> FacetType {
        FacetType::PROPERTY_ACCESSOR
    }
}

/// Writes a property through its `setXxx(value)` method
#[derive(Debug, Clone)]
pub struct PropertySetterFacet {
    support: SupportMethod,
}

impl PropertySetterFacet {
    /// Create from the setter
    pub fn new(support: SupportMethod) -> Self {
        Self { support }
    }

    /// Write the property
    pub fn set(&self, target: &ManagedObject, value: Value) -> Result<(), String> {
        self.support.call(target, &[value]).map(|_| ())
    }
}

impl Facet for PropertySetterFacet {
    fn facet_type(&self) -> FacetType {
        FacetType::PROPERTY_SETTER
    }
}

/// Reads a collection through its getter
#[derive(Debug, Clone)]
pub struct CollectionAccessorFacet {
    support: SupportMethod,
}

impl CollectionAccessorFacet {
    /// Create from the getter
    pub fn new(support: SupportMethod) -> Self {
        Self { support }
    }

    /// Read the collection
    pub fn get(&self, target: &ManagedObject) -> Result<Value, String> {
        self.support.call(target, &[])
    }
}

impl Facet for CollectionAccessorFacet {
    fn facet_type(&self) -> FacetType {
        FacetType::COLLECTION_ACCESSOR
    }
}

// ============================================================================
// Mixins and parameter tuples
// ============================================================================

/// Marks a type as a mixin and knows how to construct it around a mixee
#[derive(Debug, Clone)]
pub struct MixinFacet {
    mixin_class: String,
    mixee_type: String,
    main_method: String,
    constructor: ConstructorDescriptor,
}

impl MixinFacet {
    /// Create a mixin facet from its single-argument constructor
    pub fn new(
        mixin_class: &str,
        mixee_type: &str,
        main_method: &str,
        constructor: ConstructorDescriptor,
    ) -> Self {
        Self {
            mixin_class: mixin_class.to_string(),
            mixee_type: mixee_type.to_string(),
            main_method: main_method.to_string(),
            constructor,
        }
    }

    /// Name of the main method
    pub fn main_method(&self) -> &str {
        &self.main_method
    }

    /// Type the mixin contributes to (its constructor parameter type)
    pub fn mixee_type(&self) -> &str {
        &self.mixee_type
    }

    /// Whether instances of `class_name` receive this mixin
    pub fn is_mixin_for(&self, class_name: &str, registry: &TypeRegistry) -> bool {
        registry.is_assignable(class_name, &self.mixee_type)
    }

    /// Construct the mixin around a mixee instance
    pub fn instantiate(&self, mixee: &ManagedObject) -> Result<ManagedObject, String> {
        self.constructor
            .instantiate(&[Value::Object(mixee.clone())])
            .map_err(|message| format!("{}: {}", self.mixin_class, message))
    }
}

impl Facet for MixinFacet {
    fn facet_type(&self) -> FacetType {
        FacetType::MIXIN
    }
}

/// Action whose parameters are the constructor parameters of a tuple class
#[derive(Debug, Clone)]
pub struct ParametersTupleFacet {
    tuple_class: String,
    constructor: ConstructorDescriptor,
}

impl ParametersTupleFacet {
    /// Create from the tuple class constructor
    pub fn new(tuple_class: &str, constructor: ConstructorDescriptor) -> Self {
        Self {
            tuple_class: tuple_class.to_string(),
            constructor,
        }
    }

    /// Tuple class name
    pub fn tuple_class(&self) -> &str {
        &self.tuple_class
    }

    /// Pack flattened arguments into a tuple instance
    pub fn pack(&self, args: &[Value]) -> Result<Value, String> {
        self.constructor.instantiate(args).map(Value::Object)
    }
}

impl Facet for ParametersTupleFacet {
    fn facet_type(&self) -> FacetType {
        FacetType::PARAMETERS_TUPLE
    }
}
