//! Introspection policy and class substitution

use serde::{Deserialize, Serialize};

use super::class::{ClassDescriptor, TypeRef};

/// Which methods are candidates for members
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncapsulationPolicy {
    /// Only public methods
    OnlyPublic,
    /// Public and non-public methods
    IncludeNonPublic,
}

/// Whether a method needs explicit marking to become an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberAnnotationPolicy {
    /// Unmarked public methods may become actions
    Optional,
    /// Only methods marked `action` become actions
    Required,
}

/// Per-class introspection policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntrospectionPolicy {
    /// Public methods, actions need no marking
    #[default]
    AnnotationOptional,
    /// Public methods, actions must be marked
    AnnotationRequired,
    /// All methods, actions must be marked
    EncapsulationEnabled,
}

impl IntrospectionPolicy {
    /// Candidate method visibility
    pub fn encapsulation(self) -> EncapsulationPolicy {
        match self {
            IntrospectionPolicy::EncapsulationEnabled => EncapsulationPolicy::IncludeNonPublic,
            _ => EncapsulationPolicy::OnlyPublic,
        }
    }

    /// Action marking requirement
    pub fn member_annotations(self) -> MemberAnnotationPolicy {
        match self {
            IntrospectionPolicy::AnnotationOptional => MemberAnnotationPolicy::Optional,
            _ => MemberAnnotationPolicy::Required,
        }
    }

    /// Parse the value of an `introspection` metadata entry
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "annotation_optional" => Some(Self::AnnotationOptional),
            "annotation_required" => Some(Self::AnnotationRequired),
            "encapsulation_enabled" => Some(Self::EncapsulationEnabled),
            _ => None,
        }
    }

    /// Policy for a class: its own `introspection` entry, else the default
    pub fn for_class(class: &ClassDescriptor, default: IntrospectionPolicy) -> Self {
        class
            .metadata()
            .text("introspection")
            .and_then(Self::parse)
            .unwrap_or(default)
    }
}

/// Decides which referenced types are never introspected.
///
/// Members whose return or parameter types are excluded are skipped
/// entirely during introspection.
pub trait ClassSubstitutor: Send + Sync {
    /// Whether the named class must never be introspected
    fn is_never_introspected(&self, class_name: &str) -> bool;

    /// Whether any class in the type reference is excluded
    fn excludes(&self, type_ref: &TypeRef) -> bool {
        match type_ref {
            TypeRef::Class(name) => self.is_never_introspected(name),
            TypeRef::Collection(element) => self.excludes(element),
            TypeRef::Void | TypeRef::Scalar(_) => false,
        }
    }
}

/// Substitutor backed by a fixed list of excluded class names
#[derive(Debug, Clone, Default)]
pub struct ExcludingSubstitutor {
    excluded: Vec<String>,
}

impl ExcludingSubstitutor {
    /// Exclude the given class names
    pub fn new(excluded: Vec<String>) -> Self {
        Self { excluded }
    }
}

impl ClassSubstitutor for ExcludingSubstitutor {
    fn is_never_introspected(&self, class_name: &str) -> bool {
        self.excluded.iter().any(|name| name == class_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::class::ClassKind;

    #[test]
    fn test_policy_flags() {
        assert_eq!(
            IntrospectionPolicy::AnnotationOptional.encapsulation(),
            EncapsulationPolicy::OnlyPublic
        );
        assert_eq!(
            IntrospectionPolicy::AnnotationRequired.member_annotations(),
            MemberAnnotationPolicy::Required
        );
        assert_eq!(
            IntrospectionPolicy::EncapsulationEnabled.encapsulation(),
            EncapsulationPolicy::IncludeNonPublic
        );
    }

    #[test]
    fn test_class_metadata_overrides_default() {
        let class = ClassDescriptor::new("Ledger", ClassKind::Entity)
            .with_metadata_text("introspection", "annotation_required");
        assert_eq!(
            IntrospectionPolicy::for_class(&class, IntrospectionPolicy::AnnotationOptional),
            IntrospectionPolicy::AnnotationRequired
        );

        let plain = ClassDescriptor::new("Plain", ClassKind::Entity);
        assert_eq!(
            IntrospectionPolicy::for_class(&plain, IntrospectionPolicy::EncapsulationEnabled),
            IntrospectionPolicy::EncapsulationEnabled
        );
    }

    #[test]
    fn test_substitutor_looks_into_collections() {
        let substitutor = ExcludingSubstitutor::new(vec!["Secret".to_string()]);
        assert!(substitutor.excludes(&TypeRef::class("Secret")));
        assert!(substitutor.excludes(&TypeRef::collection_of(TypeRef::class("Secret"))));
        assert!(!substitutor.excludes(&TypeRef::class("Order")));
        assert!(!substitutor.excludes(&TypeRef::scalar("i64")));
    }
}
