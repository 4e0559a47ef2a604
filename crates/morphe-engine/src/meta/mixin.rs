//! Mixed-in members
//!
//! A mixin is a type with a single-argument constructor taking its mixee
//! and one main method. Every mixin whose mixee type is assignable from a
//! specification contributes one member to it:
//!
//! - a property or collection when the main method is safe, takes no
//!   arguments and returns something
//! - an action otherwise
//!
//! The member id comes from the mixin's simple name after its last `_` or
//! `$` (`Order_changeStatus` contributes `changeStatus`). An explicit name
//! on the mixin type or its main method changes only the display name.

use std::sync::Arc;

use tracing::{debug, info, warn};

use morphe_types::names::{camel_lower_first, mixin_suffix, natural_name};
use morphe_types::FeatureType;

use super::class::TypeRef;
use super::facet::{
    DisabledFacet, FacetHolder, FacetType, NamedFacet, Precedence, SnapshotExcludedFacet,
};
use super::loader::SpecificationLoader;
use super::member::{
    MemberCore, MixinOrigin, ObjectAction, ObjectAssociation, ObjectMember, OneToManyAssociation,
    OneToOneAssociation,
};
use super::spec::{IntrospectionState, ObjectSpecification};

/// Id and display name of a mixed-in member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixinNaming {
    /// Member id on the mixee
    pub member_id: String,
    /// Display name
    pub friendly_name: String,
    /// Whether the display name was given explicitly
    pub explicit: bool,
}

fn explicit_name(holder: &FacetHolder) -> Option<String> {
    let facet = holder.get_facet(FacetType::NAMED)?;
    if facet.precedence() < Precedence::Annotated {
        return None;
    }
    holder
        .get_as::<NamedFacet>(FacetType::NAMED)
        .map(|f| f.name().to_string())
}

/// Derive the id and display name a mixin's member gets on its mixee
pub fn mixin_naming(mixin_spec: &ObjectSpecification, main_action: &ObjectAction) -> MixinNaming {
    let suffix = mixin_suffix(mixin_spec.class().simple_name());
    let explicit = explicit_name(main_action.core().facets())
        .or_else(|| explicit_name(mixin_spec.facets()));
    MixinNaming {
        member_id: camel_lower_first(suffix),
        explicit: explicit.is_some(),
        friendly_name: explicit.unwrap_or_else(|| natural_name(suffix)),
    }
}

/// Whether a main action is contributed as a property or collection
pub fn is_association_shaped(main_action: &ObjectAction) -> bool {
    main_action.parameter_count() == 0
        && !main_action.return_type().is_void()
        && main_action.semantics().is_safe()
}

/// Collect the members every applicable mixin contributes and merge them
/// into the mixee
pub(crate) fn contribute_mixed_in_members(
    mixee: &Arc<ObjectSpecification>,
    loader: &SpecificationLoader,
) {
    loader.counters().record_mixin_scan();

    let mut actions = Vec::new();
    let mut associations = Vec::new();

    for mixin_spec in loader.mixin_specifications() {
        if Arc::ptr_eq(&mixin_spec, mixee) {
            continue;
        }
        let Some(mixin) = mixin_spec.mixin_facet() else {
            continue;
        };
        if !mixin.is_mixin_for(mixee.class().name(), loader.registry()) {
            continue;
        }
        // Reported by validation
        let Some(main) = mixin_spec.declared_action(mixin.main_method()) else {
            continue;
        };
        if mixee.is_value() && main.return_type() != &TypeRef::class(mixee.class().name()) {
            debug!(mixin = %mixin_spec.class().name(), mixee = %mixee.class().name(), "value mixee, mixin skipped");
            continue;
        }

        let naming = mixin_naming(&mixin_spec, &main);
        let name_precedence = if naming.explicit {
            Precedence::Annotated
        } else {
            Precedence::Inferred
        };
        let origin = MixinOrigin::new(mixin_spec.clone(), mixin.clone(), main.clone());
        let source = main.core().faceted_method();

        if is_association_shaped(&main) {
            let feature_type = if main.return_type().is_collection() {
                FeatureType::Collection
            } else {
                FeatureType::Property
            };
            let faceted = source.contributed(
                mixee.logical_type_name(),
                feature_type,
                &naming.member_id,
                &[FacetType::NAMED],
            );
            faceted
                .facets()
                .add_facet(Arc::new(NamedFacet::new(&naming.friendly_name, name_precedence)));
            faceted
                .facets()
                .add_facet(Arc::new(DisabledFacet::for_contributed_association()));
            faceted.facets().add_facet(Arc::new(SnapshotExcludedFacet::new()));
            faceted.freeze();

            let element = faceted.type_ref().class_name().and_then(|name| {
                loader
                    .load_specification(name, IntrospectionState::TypeIntrospected)
                    .map_err(|err| warn!(mixin = %mixin_spec.class().name(), error = %err, "element type unavailable"))
                    .ok()
            });
            let core = MemberCore::mixed_in(Arc::new(faceted), mixee, origin);
            associations.push(match feature_type {
                FeatureType::Collection => ObjectAssociation::OneToMany(Arc::new(
                    OneToManyAssociation::new(core, element.as_ref()),
                )),
                _ => ObjectAssociation::OneToOne(Arc::new(OneToOneAssociation::new(
                    core,
                    element.as_ref(),
                ))),
            });
        } else {
            let faceted = source.contributed(
                mixee.logical_type_name(),
                FeatureType::Action,
                &naming.member_id,
                &[FacetType::NAMED],
            );
            faceted
                .facets()
                .add_facet(Arc::new(NamedFacet::new(&naming.friendly_name, name_precedence)));
            faceted.freeze();
            actions.push(Arc::new(ObjectAction::new(MemberCore::mixed_in(
                Arc::new(faceted),
                mixee,
                origin,
            ))));
        }
    }

    info!(
        mixee = %mixee.class().name(),
        actions = actions.len(),
        associations = associations.len(),
        "mixed-in members contributed"
    );
    mixee.merge_mixed_in_members(actions, associations, loader.report());
}
