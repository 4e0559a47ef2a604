//! Built-in facet factories

use std::sync::Arc;

use tracing::{debug, warn};

use morphe_types::names::{natural_name, support_method_name};
use morphe_types::{FeatureType, Identifier};

use super::{
    FacetFactory, FactoryPriority, ProcessClassContext, ProcessMethodContext,
    ProcessParameterContext,
};
use crate::meta::class::{MetadataValue, TypeRef};
use crate::meta::facet::{
    ActionInvocationFacet, ActionSemanticsFacet, ActionValidateMethodFacet,
    CollectionAccessorFacet, DisableMethodFacet, DisabledFacet, HiddenFacet, HideMethodFacet,
    IntrospectionPolicyFacet, MandatoryFacet, MemberOrderFacet, MixinFacet, NamedFacet,
    ParameterValidateMethodFacet, Precedence, PropertyAccessorFacet, PropertySetterFacet,
    PropertyValidateMethodFacet, SemanticsOf, SupportMethod,
};
use crate::meta::interaction::Where;
use crate::meta::validate::{FailureKind, ValidationFailure};

const MEMBERS: &[FeatureType] = &[
    FeatureType::Property,
    FeatureType::Collection,
    FeatureType::Action,
];

const PARAMETERS: &[FeatureType] = &[
    FeatureType::ActionParameterScalar,
    FeatureType::ActionParameterCollection,
];

// ============================================================================
// Class level
// ============================================================================

/// Removes methods that can never be members: bridge and synthetic
/// methods, configured ignored names, and methods marked `programmatic`
pub struct IgnoredMethodsFacetFactory;

impl FacetFactory for IgnoredMethodsFacetFactory {
    fn name(&self) -> &'static str {
        "ignored-methods"
    }

    fn feature_types(&self) -> &'static [FeatureType] {
        &[FeatureType::Object]
    }

    fn priority(&self) -> FactoryPriority {
        FactoryPriority::Early
    }

    fn process_class(&self, ctx: &ProcessClassContext<'_>) {
        let ignored = &ctx.meta.config.introspection.ignored_methods;
        let removed = ctx.remover.claim_methods(&|method| {
            method.is_bridge()
                || method.is_synthetic()
                || method.metadata().has("programmatic")
                || ignored.iter().any(|name| name == method.name())
        });
        if !removed.is_empty() {
            debug!(class = %ctx.class.name(), count = removed.len(), "ignored methods removed");
        }
    }
}

/// Records the policy a class is introspected with
pub struct IntrospectionPolicyFacetFactory;

impl FacetFactory for IntrospectionPolicyFacetFactory {
    fn name(&self) -> &'static str {
        "introspection-policy"
    }

    fn feature_types(&self) -> &'static [FeatureType] {
        &[FeatureType::Object]
    }

    fn priority(&self) -> FactoryPriority {
        FactoryPriority::Early
    }

    fn process_class(&self, ctx: &ProcessClassContext<'_>) {
        ctx.holder
            .add_facet(Arc::new(IntrospectionPolicyFacet::new(ctx.policy)));
    }
}

/// Marks mixin classes. A mixin needs exactly one constructor taking a
/// single domain object (its mixee).
pub struct MixinFacetFactory;

impl FacetFactory for MixinFacetFactory {
    fn name(&self) -> &'static str {
        "mixin"
    }

    fn feature_types(&self) -> &'static [FeatureType] {
        &[FeatureType::Object]
    }

    fn process_class(&self, ctx: &ProcessClassContext<'_>) {
        let class = ctx.class;
        if !class.is_mixin() {
            return;
        }

        let candidates: Vec<_> = class
            .constructors()
            .iter()
            .filter(|c| {
                c.parameters().len() == 1
                    && matches!(c.parameters()[0].type_ref(), TypeRef::Class(_))
            })
            .collect();

        let [constructor] = candidates.as_slice() else {
            ctx.meta.report.add(ValidationFailure::new(
                FailureKind::MixinConstructor,
                Identifier::class_identifier(class.logical_type_name()),
                format!(
                    "Mixin {} must have exactly one constructor taking its mixee, found {}",
                    class.name(),
                    candidates.len()
                ),
            ));
            return;
        };

        let Some(mixee_type) = constructor.parameters()[0].type_ref().class_name() else {
            return;
        };
        let main_method = class
            .metadata()
            .text("mixin_main")
            .unwrap_or(ctx.meta.config.mixins.main_method.as_str());

        ctx.holder.add_facet(Arc::new(MixinFacet::new(
            class.name(),
            mixee_type,
            main_method,
            (*constructor).clone(),
        )));
    }
}

// ============================================================================
// Naming, layout, static visibility and usability
// ============================================================================

/// Friendly names: `named` metadata, else derived from the id
pub struct NamedFacetFactory;

impl FacetFactory for NamedFacetFactory {
    fn name(&self) -> &'static str {
        "named"
    }

    fn feature_types(&self) -> &'static [FeatureType] {
        &FeatureType::ALL
    }

    fn process_class(&self, ctx: &ProcessClassContext<'_>) {
        if let Some(name) = ctx.class.metadata().text("named") {
            ctx.holder
                .add_facet(Arc::new(NamedFacet::new(name, Precedence::Annotated)));
        }
    }

    fn process_method(&self, ctx: &ProcessMethodContext<'_>) {
        match ctx.method.metadata().text("named") {
            Some(name) => ctx
                .holder
                .add_facet(Arc::new(NamedFacet::new(name, Precedence::Annotated))),
            None => ctx.holder.add_facet(Arc::new(NamedFacet::new(
                &natural_name(ctx.member_id),
                Precedence::Inferred,
            ))),
        };
    }

    fn process_parameter(&self, ctx: &ProcessParameterContext<'_>) {
        match ctx.parameter.metadata().text("named") {
            Some(name) => ctx
                .holder
                .add_facet(Arc::new(NamedFacet::new(name, Precedence::Annotated))),
            None => ctx.holder.add_facet(Arc::new(NamedFacet::new(
                &natural_name(ctx.parameter.name()),
                Precedence::Inferred,
            ))),
        };
    }
}

/// Layout position from `sequence` metadata
pub struct MemberOrderFacetFactory;

impl FacetFactory for MemberOrderFacetFactory {
    fn name(&self) -> &'static str {
        "member-order"
    }

    fn feature_types(&self) -> &'static [FeatureType] {
        MEMBERS
    }

    fn process_method(&self, ctx: &ProcessMethodContext<'_>) {
        let sequence = match ctx.method.metadata().get("sequence") {
            Some(MetadataValue::Text(s)) => s.clone(),
            Some(MetadataValue::Int(i)) => i.to_string(),
            _ => return,
        };
        ctx.holder
            .add_facet(Arc::new(MemberOrderFacet::new(&sequence, Precedence::Annotated)));
    }
}

/// Static hiding from `hidden` metadata (flag, or a scope name)
pub struct HiddenFacetFactory;

impl FacetFactory for HiddenFacetFactory {
    fn name(&self) -> &'static str {
        "hidden"
    }

    fn feature_types(&self) -> &'static [FeatureType] {
        MEMBERS
    }

    fn process_method(&self, ctx: &ProcessMethodContext<'_>) {
        let scope = match ctx.method.metadata().get("hidden") {
            Some(MetadataValue::Flag) => Where::Anywhere,
            Some(MetadataValue::Text(scope)) => match Where::parse(scope) {
                Some(scope) => scope,
                None => {
                    warn!(member = %ctx.identifier, scope = %scope, "unknown hidden scope, hiding everywhere");
                    Where::Anywhere
                }
            },
            _ => return,
        };
        ctx.holder
            .add_facet(Arc::new(HiddenFacet::new(scope, Precedence::Annotated)));
    }
}

/// Static disabling from `disabled` metadata (flag, or the reason text)
pub struct DisabledFacetFactory;

impl FacetFactory for DisabledFacetFactory {
    fn name(&self) -> &'static str {
        "disabled"
    }

    fn feature_types(&self) -> &'static [FeatureType] {
        MEMBERS
    }

    fn process_method(&self, ctx: &ProcessMethodContext<'_>) {
        let reason = match ctx.method.metadata().get("disabled") {
            Some(MetadataValue::Flag) => None,
            Some(MetadataValue::Text(reason)) => Some(reason.clone()),
            _ => return,
        };
        ctx.holder
            .add_facet(Arc::new(DisabledFacet::new(reason, Precedence::Annotated)));
    }
}

/// Action semantics from `semantics` metadata, non-idempotent by default
pub struct ActionSemanticsFacetFactory;

impl FacetFactory for ActionSemanticsFacetFactory {
    fn name(&self) -> &'static str {
        "action-semantics"
    }

    fn feature_types(&self) -> &'static [FeatureType] {
        &[FeatureType::Action]
    }

    fn process_method(&self, ctx: &ProcessMethodContext<'_>) {
        ctx.holder.add_facet(Arc::new(ActionSemanticsFacet::fallback()));
        let Some(text) = ctx.method.metadata().text("semantics") else {
            return;
        };
        match SemanticsOf::parse(text) {
            Some(semantics) => {
                ctx.holder.add_facet(Arc::new(ActionSemanticsFacet::new(
                    semantics,
                    Precedence::Annotated,
                )));
            }
            None => {
                warn!(member = %ctx.identifier, semantics = %text, "unknown semantics ignored");
            }
        }
    }
}

// ============================================================================
// Invocation and access
// ============================================================================

/// Invocation through the action method itself
pub struct ActionInvocationFacetFactory;

impl FacetFactory for ActionInvocationFacetFactory {
    fn name(&self) -> &'static str {
        "action-invocation"
    }

    fn feature_types(&self) -> &'static [FeatureType] {
        &[FeatureType::Action]
    }

    fn process_method(&self, ctx: &ProcessMethodContext<'_>) {
        ctx.holder.add_facet(Arc::new(ActionInvocationFacet::new(
            SupportMethod::new(ctx.method.clone()),
        )));
    }
}

/// Getter-based access, plus the `setXxx(value)` modifier for properties
pub struct PropertyAccessorFacetFactory;

impl FacetFactory for PropertyAccessorFacetFactory {
    fn name(&self) -> &'static str {
        "property-accessor"
    }

    fn feature_types(&self) -> &'static [FeatureType] {
        &[FeatureType::Property, FeatureType::Collection]
    }

    fn support_prefixes(&self) -> &'static [&'static str] {
        &["set"]
    }

    fn process_method(&self, ctx: &ProcessMethodContext<'_>) {
        let getter = SupportMethod::new(ctx.method.clone());
        if ctx.feature_type == FeatureType::Collection {
            ctx.holder
                .add_facet(Arc::new(CollectionAccessorFacet::new(getter)));
            return;
        }

        ctx.holder.add_facet(Arc::new(PropertyAccessorFacet::new(getter)));
        let setter_name = support_method_name("set", ctx.member_id);
        if let Some(setter) = ctx.remover.claim_method(&setter_name, 1) {
            ctx.holder.add_facet(Arc::new(PropertySetterFacet::new(
                SupportMethod::new(setter),
            )));
        }
    }
}

// ============================================================================
// Supporting methods
// ============================================================================

/// `hideXxx()` supporting methods
pub struct HideMethodFacetFactory;

impl FacetFactory for HideMethodFacetFactory {
    fn name(&self) -> &'static str {
        "hide-method"
    }

    fn feature_types(&self) -> &'static [FeatureType] {
        MEMBERS
    }

    fn support_prefixes(&self) -> &'static [&'static str] {
        &["hide"]
    }

    fn process_method(&self, ctx: &ProcessMethodContext<'_>) {
        let name = support_method_name("hide", ctx.member_id);
        if let Some(method) = ctx.remover.claim_method(&name, 0) {
            ctx.holder
                .add_facet(Arc::new(HideMethodFacet::new(SupportMethod::new(method))));
        }
    }
}

/// `disableXxx()` supporting methods
pub struct DisableMethodFacetFactory;

impl FacetFactory for DisableMethodFacetFactory {
    fn name(&self) -> &'static str {
        "disable-method"
    }

    fn feature_types(&self) -> &'static [FeatureType] {
        MEMBERS
    }

    fn support_prefixes(&self) -> &'static [&'static str] {
        &["disable"]
    }

    fn process_method(&self, ctx: &ProcessMethodContext<'_>) {
        let name = support_method_name("disable", ctx.member_id);
        if let Some(method) = ctx.remover.claim_method(&name, 0) {
            ctx.holder
                .add_facet(Arc::new(DisableMethodFacet::new(SupportMethod::new(method))));
        }
    }
}

/// `validateXxx(..)` supporting methods for actions and properties
pub struct ValidateMethodFacetFactory;

impl FacetFactory for ValidateMethodFacetFactory {
    fn name(&self) -> &'static str {
        "validate-method"
    }

    fn feature_types(&self) -> &'static [FeatureType] {
        &[FeatureType::Action, FeatureType::Property]
    }

    fn support_prefixes(&self) -> &'static [&'static str] {
        &["validate"]
    }

    fn process_method(&self, ctx: &ProcessMethodContext<'_>) {
        let name = support_method_name("validate", ctx.member_id);
        if ctx.feature_type == FeatureType::Action {
            let arity = ctx.parameter_count;
            if let Some(method) = ctx.remover.claim_method(&name, arity) {
                ctx.holder.add_facet(Arc::new(ActionValidateMethodFacet::new(
                    SupportMethod::new(method),
                )));
            }
        } else if let Some(method) = ctx.remover.claim_method(&name, 1) {
            ctx.holder.add_facet(Arc::new(PropertyValidateMethodFacet::new(
                SupportMethod::new(method),
            )));
        }
    }
}

/// `validateNXxx(arg)` supporting methods for single parameters
pub struct ParameterValidateMethodFacetFactory;

impl FacetFactory for ParameterValidateMethodFacetFactory {
    fn name(&self) -> &'static str {
        "parameter-validate-method"
    }

    fn feature_types(&self) -> &'static [FeatureType] {
        PARAMETERS
    }

    fn support_prefixes(&self) -> &'static [&'static str] {
        &["validate"]
    }

    fn process_parameter(&self, ctx: &ProcessParameterContext<'_>) {
        let name = support_method_name(&format!("validate{}", ctx.index), ctx.member_id);
        if let Some(method) = ctx.remover.claim_method(&name, 1) {
            ctx.holder.add_facet(Arc::new(ParameterValidateMethodFacet::new(
                SupportMethod::new(method),
                ctx.index,
            )));
        }
    }
}

/// Required values: mandatory unless marked `optional`
pub struct MandatoryFacetFactory;

impl FacetFactory for MandatoryFacetFactory {
    fn name(&self) -> &'static str {
        "mandatory"
    }

    fn feature_types(&self) -> &'static [FeatureType] {
        &[
            FeatureType::Property,
            FeatureType::ActionParameterScalar,
            FeatureType::ActionParameterCollection,
        ]
    }

    fn process_method(&self, ctx: &ProcessMethodContext<'_>) {
        let facet = if ctx.method.metadata().has("optional") {
            MandatoryFacet::optional(ctx.member_id, Precedence::Annotated)
        } else {
            MandatoryFacet::mandatory(ctx.member_id, Precedence::Inferred)
        };
        ctx.holder.add_facet(Arc::new(facet));
    }

    fn process_parameter(&self, ctx: &ProcessParameterContext<'_>) {
        let name = ctx.parameter.name();
        let facet = if ctx.parameter.metadata().has("optional") {
            MandatoryFacet::optional(name, Precedence::Annotated)
        } else {
            MandatoryFacet::mandatory(name, Precedence::Inferred)
        };
        ctx.holder.add_facet(Arc::new(facet));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MetaModelConfig;
    use crate::meta::class::{ClassDescriptor, ClassKind, ConstructorDescriptor, MethodDescriptor, TypeRegistry};
    use crate::meta::facet::{Facet, FacetHolder, FacetType};
    use crate::meta::factory::{FacetProcessor, MetaModelContext};
    use crate::meta::introspector::MethodPool;
    use crate::meta::policy::IntrospectionPolicy;
    use crate::meta::validate::ValidationReport;

    struct Fixture {
        registry: TypeRegistry,
        config: MetaModelConfig,
        report: ValidationReport,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                registry: TypeRegistry::new(),
                config: MetaModelConfig::default(),
                report: ValidationReport::new(),
            }
        }

        fn meta(&self) -> MetaModelContext<'_> {
            MetaModelContext {
                registry: &self.registry,
                config: &self.config,
                report: &self.report,
            }
        }
    }

    fn process_action(
        fixture: &Fixture,
        class: &ClassDescriptor,
        method_name: &str,
        pool: &MethodPool,
    ) -> FacetHolder {
        let method = class
            .methods()
            .iter()
            .find(|m| m.name() == method_name)
            .cloned()
            .unwrap();
        let identifier = Identifier::action_identifier(class.name(), method_name, vec![]);
        let holder = FacetHolder::new();
        let ctx = ProcessMethodContext {
            class,
            method: &method,
            feature_type: FeatureType::Action,
            member_id: method_name,
            identifier: &identifier,
            parameter_count: method.parameters().len(),
            is_mixin_main: false,
            holder: &holder,
            remover: pool,
            meta: fixture.meta(),
        };
        FacetProcessor::with_builtin_factories().process_method(&ctx);
        holder
    }

    #[test]
    fn test_supporting_methods_are_claimed() {
        let fixture = Fixture::new();
        let class = ClassDescriptor::new("Order", ClassKind::Entity)
            .with_method(MethodDescriptor::new("close"))
            .with_method(MethodDescriptor::new("hideClose").returning(TypeRef::scalar("bool")))
            .with_method(MethodDescriptor::new("disableClose").returning(TypeRef::scalar("String")))
            .with_method(MethodDescriptor::new("validateClose").returning(TypeRef::scalar("String")));
        let pool = MethodPool::new(class.methods().to_vec());

        let holder = process_action(&fixture, &class, "close", &pool);

        assert!(holder.contains(FacetType::HIDE_METHOD));
        assert!(holder.contains(FacetType::DISABLE_METHOD));
        assert!(holder.contains(FacetType::ACTION_VALIDATE_METHOD));
        assert!(holder.contains(FacetType::ACTION_INVOCATION));
        let remaining: Vec<String> = pool.remaining().iter().map(|m| m.name().to_string()).collect();
        assert_eq!(remaining, vec!["close"]);
    }

    #[test]
    fn test_semantics_and_names() {
        let fixture = Fixture::new();
        let class = ClassDescriptor::new("Order", ClassKind::Entity)
            .with_method(MethodDescriptor::new("placeOrder"))
            .with_method(
                MethodDescriptor::new("total")
                    .with_metadata_text("semantics", "safe")
                    .with_metadata_text("named", "Grand total"),
            );
        let pool = MethodPool::new(class.methods().to_vec());

        let place = process_action(&fixture, &class, "placeOrder", &pool);
        let semantics = place
            .get_as::<ActionSemanticsFacet>(FacetType::ACTION_SEMANTICS)
            .unwrap();
        assert_eq!(semantics.semantics(), SemanticsOf::NonIdempotent);
        assert!(semantics.precedence().is_fallback());
        assert_eq!(
            place.get_as::<NamedFacet>(FacetType::NAMED).unwrap().name(),
            "Place order"
        );

        let total = process_action(&fixture, &class, "total", &pool);
        assert_eq!(
            total
                .get_as::<ActionSemanticsFacet>(FacetType::ACTION_SEMANTICS)
                .unwrap()
                .semantics(),
            SemanticsOf::Safe
        );
        assert_eq!(
            total.get_as::<NamedFacet>(FacetType::NAMED).unwrap().name(),
            "Grand total"
        );
    }

    #[test]
    fn test_mixin_constructor_must_be_unique() {
        let fixture = Fixture::new();
        let class = ClassDescriptor::new("Order_close", ClassKind::Mixin)
            .with_constructor(ConstructorDescriptor::new().with_param("order", TypeRef::class("Order")))
            .with_constructor(ConstructorDescriptor::new().with_param("other", TypeRef::class("Customer")));
        let pool = MethodPool::new(Vec::new());
        let holder = FacetHolder::new();
        let ctx = ProcessClassContext {
            class: &class,
            policy: IntrospectionPolicy::AnnotationOptional,
            holder: &holder,
            remover: &pool,
            meta: fixture.meta(),
        };

        MixinFacetFactory.process_class(&ctx);

        assert!(!holder.contains(FacetType::MIXIN));
        assert!(fixture.report.has_kind(FailureKind::MixinConstructor));
    }

    #[test]
    fn test_mixin_facet_uses_configured_main_method() {
        let mut fixture = Fixture::new();
        fixture.config.mixins.main_method = "exec".to_string();
        let class = ClassDescriptor::new("Order_close", ClassKind::Mixin)
            .with_constructor(ConstructorDescriptor::new().with_param("order", TypeRef::class("Order")));
        let pool = MethodPool::new(Vec::new());
        let holder = FacetHolder::new();
        let ctx = ProcessClassContext {
            class: &class,
            policy: IntrospectionPolicy::AnnotationOptional,
            holder: &holder,
            remover: &pool,
            meta: fixture.meta(),
        };

        MixinFacetFactory.process_class(&ctx);

        let mixin = holder.get_as::<MixinFacet>(FacetType::MIXIN).unwrap();
        assert_eq!(mixin.main_method(), "exec");
        assert_eq!(mixin.mixee_type(), "Order");
    }

    #[test]
    fn test_ignored_methods_are_removed() {
        let fixture = Fixture::new();
        let class = ClassDescriptor::new("Order", ClassKind::Entity)
            .with_method(MethodDescriptor::new("toString").returning(TypeRef::scalar("String")))
            .with_method(MethodDescriptor::new("internal").with_metadata_flag("programmatic"))
            .with_method(MethodDescriptor::new("bridged").bridge())
            .with_method(MethodDescriptor::new("generated").synthetic())
            .with_method(MethodDescriptor::new("close"));
        let pool = MethodPool::new(class.methods().to_vec());
        let holder = FacetHolder::new();
        let ctx = ProcessClassContext {
            class: &class,
            policy: IntrospectionPolicy::AnnotationOptional,
            holder: &holder,
            remover: &pool,
            meta: fixture.meta(),
        };

        FacetProcessor::with_builtin_factories().process_class(&ctx);

        let remaining: Vec<String> = pool.remaining().iter().map(|m| m.name().to_string()).collect();
        assert_eq!(remaining, vec!["close"]);
        assert!(holder.contains(FacetType::INTROSPECTION_POLICY));
    }
}
