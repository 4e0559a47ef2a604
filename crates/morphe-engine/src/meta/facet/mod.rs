//! Facets
//!
//! A facet is a unit of metadata attached to a type, member or parameter.
//! Each facet has a capability type ([`FacetType`]); a [`FacetHolder`]
//! stores at most one facet per capability. Facets that take part in
//! interaction checks implement the advisor hooks of [`Facet`]:
//! `hides` (visibility), `disables` (usability) and `invalidates`
//! (validity).
//!
//! ## Precedence
//!
//! When two facets of the same capability are installed, the one with the
//! higher [`Precedence`] wins; on a tie the first one stays. Fallback facets
//! are placeholders that any other facet replaces, and hierarchical lookup
//! ([`select_facet`]) prefers the first non-fallback candidate.

mod builtin;

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use morphe_types::Veto;

use super::interaction::InteractionContext;
use crate::error::unexpected_code_reach;

pub use builtin::{
    ActionInvocationFacet, ActionSemanticsFacet, ActionValidateMethodFacet,
    CollectionAccessorFacet, DisableMethodFacet, DisabledFacet, HiddenFacet, HideMethodFacet,
    IntrospectionPolicyFacet, MandatoryFacet, MixinFacet, NamedFacet, MemberOrderFacet,
    ParameterValidateMethodFacet, ParametersTupleFacet, PropertyAccessorFacet,
    PropertySetterFacet, PropertyValidateMethodFacet, SemanticsOf, SnapshotExcludedFacet,
    SupportMethod,
};

/// Capability type of a facet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FacetType(&'static str);

impl FacetType {
    /// Statically hidden
    pub const HIDDEN: Self = Self("hidden");
    /// Hidden by a `hide` supporting method
    pub const HIDE_METHOD: Self = Self("hide-method");
    /// Statically disabled
    pub const DISABLED: Self = Self("disabled");
    /// Disabled by a `disable` supporting method
    pub const DISABLE_METHOD: Self = Self("disable-method");
    /// Action argument set checked by a `validate` supporting method
    pub const ACTION_VALIDATE_METHOD: Self = Self("action-validate-method");
    /// Property value checked by a `validate` supporting method
    pub const PROPERTY_VALIDATE_METHOD: Self = Self("property-validate-method");
    /// Single argument checked by a `validateN` supporting method
    pub const PARAMETER_VALIDATE_METHOD: Self = Self("parameter-validate-method");
    /// Value required or optional
    pub const MANDATORY: Self = Self("mandatory");
    /// Friendly name
    pub const NAMED: Self = Self("named");
    /// Position in the member layout
    pub const MEMBER_ORDER: Self = Self("member-order");
    /// Side-effect classification of an action
    pub const ACTION_SEMANTICS: Self = Self("action-semantics");
    /// How an action is invoked
    pub const ACTION_INVOCATION: Self = Self("action-invocation");
    /// How a property is read
    pub const PROPERTY_ACCESSOR: Self = Self("property-accessor");
    /// How a property is written
    pub const PROPERTY_SETTER: Self = Self("property-setter");
    /// How a collection is read
    pub const COLLECTION_ACCESSOR: Self = Self("collection-accessor");
    /// Type is a mixin
    pub const MIXIN: Self = Self("mixin");
    /// Excluded from structural snapshots
    pub const SNAPSHOT_EXCLUDED: Self = Self("snapshot-excluded");
    /// Action parameters come from a tuple class
    pub const PARAMETERS_TUPLE: Self = Self("parameters-tuple");
    /// Introspection policy of a type
    pub const INTROSPECTION_POLICY: Self = Self("introspection-policy");

    /// A capability type for facets defined outside this crate
    pub const fn custom(name: &'static str) -> Self {
        Self(name)
    }

    /// Capability name
    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for FacetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Precedence of a facet within its capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Precedence {
    /// Placeholder default, replaced by anything else
    Fallback,
    /// Inferred from naming conventions
    Inferred,
    /// Regular facet
    Default,
    /// Explicitly declared in metadata
    Annotated,
    /// Forced by the framework
    High,
}

impl Precedence {
    /// Check if this is a fallback
    pub fn is_fallback(self) -> bool {
        self == Precedence::Fallback
    }
}

/// A unit of metadata attached to a type, member or parameter
pub trait Facet: Any + Send + Sync + fmt::Debug {
    /// Capability type
    fn facet_type(&self) -> FacetType;

    /// Precedence within the capability
    fn precedence(&self) -> Precedence {
        Precedence::Default
    }

    /// Visibility advice
    fn hides(&self, _ctx: &InteractionContext<'_>) -> Option<Veto> {
        None
    }

    /// Usability advice
    fn disables(&self, _ctx: &InteractionContext<'_>) -> Option<Veto> {
        None
    }

    /// Validity advice (parameter, argument set or property value)
    fn invalidates(&self, _ctx: &InteractionContext<'_>) -> Option<Veto> {
        None
    }
}

/// Borrow a facet as its concrete type
pub fn downcast_facet<T: Facet>(facet: &dyn Facet) -> Option<&T> {
    let any: &dyn Any = facet;
    any.downcast_ref::<T>()
}

/// Pick a facet from candidates in search order.
///
/// The first non-fallback candidate wins; if every candidate is a fallback
/// the first one is returned. Candidates are consumed lazily.
pub fn select_facet<I>(candidates: I) -> Option<Arc<dyn Facet>>
where
    I: IntoIterator<Item = Arc<dyn Facet>>,
{
    let mut first_fallback = None;
    for facet in candidates {
        if !facet.precedence().is_fallback() {
            return Some(facet);
        }
        if first_fallback.is_none() {
            first_fallback = Some(facet);
        }
    }
    first_fallback
}

// ============================================================================
// FacetHolder
// ============================================================================

/// Storage for the facets of one type, member or parameter.
///
/// Writable during introspection, frozen afterwards. Writing to a frozen
/// holder is a framework bug.
#[derive(Default)]
pub struct FacetHolder {
    facets: RwLock<FxHashMap<FacetType, Arc<dyn Facet>>>,
    frozen: AtomicBool,
}

impl FacetHolder {
    /// Create an empty holder
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a facet.
    ///
    /// Returns whether it was installed: an existing facet of the same
    /// capability is kept unless the new one has strictly higher precedence.
    pub fn add_facet(&self, facet: Arc<dyn Facet>) -> bool {
        if self.is_frozen() {
            unexpected_code_reach(format!(
                "facet {} added to a frozen holder",
                facet.facet_type()
            ));
        }
        let mut facets = self.facets.write();
        let facet_type = facet.facet_type();
        match facets.get(&facet_type) {
            Some(existing) if existing.precedence() >= facet.precedence() => false,
            _ => {
                facets.insert(facet_type, facet);
                true
            }
        }
    }

    /// Get the facet of a capability
    pub fn get_facet(&self, facet_type: FacetType) -> Option<Arc<dyn Facet>> {
        self.facets.read().get(&facet_type).cloned()
    }

    /// Get a copy of the facet of a capability as its concrete type
    pub fn get_as<T: Facet + Clone>(&self, facet_type: FacetType) -> Option<T> {
        let facets = self.facets.read();
        let facet = facets.get(&facet_type)?;
        downcast_facet::<T>(facet.as_ref()).cloned()
    }

    /// Check if a capability is present
    pub fn contains(&self, facet_type: FacetType) -> bool {
        self.facets.read().contains_key(&facet_type)
    }

    /// All facets, ordered by capability name
    pub fn facets(&self) -> Vec<Arc<dyn Facet>> {
        let facets = self.facets.read();
        let mut all: Vec<Arc<dyn Facet>> = facets.values().cloned().collect();
        all.sort_by_key(|f| f.facet_type());
        all
    }

    /// Installed capability types, ordered by name
    pub fn facet_types(&self) -> Vec<FacetType> {
        let mut types: Vec<FacetType> = self.facets.read().keys().copied().collect();
        types.sort();
        types
    }

    /// Number of installed facets
    pub fn len(&self) -> usize {
        self.facets.read().len()
    }

    /// Check if no facets are installed
    pub fn is_empty(&self) -> bool {
        self.facets.read().is_empty()
    }

    /// Copy every facet of `other` except the listed capabilities
    pub fn copy_from(&self, other: &FacetHolder, except: &[FacetType]) {
        for facet in other.facets() {
            if !except.contains(&facet.facet_type()) {
                self.add_facet(facet);
            }
        }
    }

    /// Make the holder read-only
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    /// Check if the holder is read-only
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }
}

impl fmt::Debug for FacetHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FacetHolder")
            .field("facets", &self.facet_types())
            .field("frozen", &self.is_frozen())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str, precedence: Precedence) -> Arc<dyn Facet> {
        Arc::new(NamedFacet::new(name, precedence))
    }

    fn name_of(facet: &Arc<dyn Facet>) -> String {
        downcast_facet::<NamedFacet>(facet.as_ref())
            .map(|f| f.name().to_string())
            .unwrap_or_default()
    }

    #[test]
    fn test_higher_precedence_replaces() {
        let holder = FacetHolder::new();
        assert!(holder.add_facet(named("derived", Precedence::Inferred)));
        assert!(holder.add_facet(named("explicit", Precedence::Annotated)));
        assert!(!holder.add_facet(named("late", Precedence::Inferred)));

        let facet = holder.get_facet(FacetType::NAMED).unwrap();
        assert_eq!(name_of(&facet), "explicit");
    }

    #[test]
    fn test_equal_precedence_keeps_first() {
        let holder = FacetHolder::new();
        holder.add_facet(named("first", Precedence::Default));
        holder.add_facet(named("second", Precedence::Default));
        assert_eq!(
            holder.get_as::<NamedFacet>(FacetType::NAMED).unwrap().name(),
            "first"
        );
    }

    #[test]
    fn test_fallback_is_replaced() {
        let holder = FacetHolder::new();
        holder.add_facet(Arc::new(ActionSemanticsFacet::fallback()));
        holder.add_facet(Arc::new(ActionSemanticsFacet::new(
            SemanticsOf::Safe,
            Precedence::Annotated,
        )));
        let semantics = holder
            .get_as::<ActionSemanticsFacet>(FacetType::ACTION_SEMANTICS)
            .unwrap();
        assert_eq!(semantics.semantics(), SemanticsOf::Safe);
    }

    #[test]
    #[should_panic(expected = "frozen holder")]
    fn test_add_to_frozen_holder_panics() {
        let holder = FacetHolder::new();
        holder.freeze();
        holder.add_facet(named("late", Precedence::Default));
    }

    #[test]
    fn test_select_prefers_first_non_fallback() {
        let candidates = vec![
            Arc::new(ActionSemanticsFacet::fallback()) as Arc<dyn Facet>,
            named("interface", Precedence::Default),
            named("superclass", Precedence::Annotated),
        ];
        let selected = select_facet(candidates).unwrap();
        assert_eq!(name_of(&selected), "interface");
    }

    #[test]
    fn test_select_falls_back_to_first_fallback() {
        let first: Arc<dyn Facet> = Arc::new(ActionSemanticsFacet::fallback());
        let second: Arc<dyn Facet> = Arc::new(ActionSemanticsFacet::fallback());
        let selected = select_facet(vec![first.clone(), second]).unwrap();
        assert!(Arc::ptr_eq(&selected, &first));
        assert!(select_facet(Vec::new()).is_none());
    }

    #[test]
    fn test_copy_from_skips_excluded() {
        let source = FacetHolder::new();
        source.add_facet(named("source", Precedence::Default));
        source.add_facet(Arc::new(SnapshotExcludedFacet::new()));

        let target = FacetHolder::new();
        target.copy_from(&source, &[FacetType::NAMED]);
        assert!(!target.contains(FacetType::NAMED));
        assert!(target.contains(FacetType::SNAPSHOT_EXCLUDED));
        assert_eq!(target.facet_types(), vec![FacetType::SNAPSHOT_EXCLUDED]);
    }
}
