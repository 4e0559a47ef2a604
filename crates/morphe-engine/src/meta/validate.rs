//! Deferred metamodel validation
//!
//! Definition problems found while introspecting (member id clashes,
//! ambiguous mixin constructors, unusable parameter tuples) do not abort
//! introspection. They are collected in a [`ValidationReport`]. Checks that
//! need a fully introspected specification run when the loader drains its
//! validation queue.

use std::fmt;

use parking_lot::Mutex;
use tracing::warn;

use morphe_types::Identifier;

use super::facet::{FacetType, MixinFacet};
use super::spec::ObjectSpecification;
use crate::config::MetaModelConfig;

/// Category of a validation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// A mixed-in member id is already used on the mixee
    MemberIdClash,
    /// A supporting-looking method matched no member
    OrphanedMethod,
    /// A mixin has no unique single-argument constructor
    MixinConstructor,
    /// A mixin does not declare its main method
    MixinMainMethod,
    /// A parameters-tuple action cannot be expanded
    ParametersTuple,
    /// A referenced type cannot be introspected
    Introspection,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::MemberIdClash => "member id clash",
            FailureKind::OrphanedMethod => "orphaned method",
            FailureKind::MixinConstructor => "mixin constructor",
            FailureKind::MixinMainMethod => "mixin main method",
            FailureKind::ParametersTuple => "parameters tuple",
            FailureKind::Introspection => "introspection",
        };
        f.write_str(name)
    }
}

/// One validation failure
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFailure {
    kind: FailureKind,
    origin: Identifier,
    message: String,
}

impl ValidationFailure {
    /// Create a failure
    pub fn new(kind: FailureKind, origin: Identifier, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }

    /// Category
    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    /// Type or member the failure is about
    pub fn origin(&self) -> &Identifier {
        &self.origin
    }

    /// Description
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.origin, self.message)
    }
}

/// Thread-safe collection of validation failures
#[derive(Debug, Default)]
pub struct ValidationReport {
    failures: Mutex<Vec<ValidationFailure>>,
}

impl ValidationReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure
    pub fn add(&self, failure: ValidationFailure) {
        warn!(kind = %failure.kind, origin = %failure.origin, "{}", failure.message);
        self.failures.lock().push(failure);
    }

    /// Copy of all failures in recording order
    pub fn failures(&self) -> Vec<ValidationFailure> {
        self.failures.lock().clone()
    }

    /// Failures of one kind
    pub fn of_kind(&self, kind: FailureKind) -> Vec<ValidationFailure> {
        self.failures
            .lock()
            .iter()
            .filter(|f| f.kind == kind)
            .cloned()
            .collect()
    }

    /// Check if a failure of this kind was recorded
    pub fn has_kind(&self, kind: FailureKind) -> bool {
        self.failures.lock().iter().any(|f| f.kind == kind)
    }

    /// Number of failures
    pub fn len(&self) -> usize {
        self.failures.lock().len()
    }

    /// Check if nothing failed
    pub fn is_empty(&self) -> bool {
        self.failures.lock().is_empty()
    }
}

// ============================================================================
// Validators
// ============================================================================

/// Run every validator against a fully introspected specification
pub(crate) fn validate_specification(
    spec: &ObjectSpecification,
    config: &MetaModelConfig,
    report: &ValidationReport,
) {
    if config.validation.report_orphans {
        validate_orphans(spec, report);
    }
    validate_mixin_main(spec, report);
}

fn validate_orphans(spec: &ObjectSpecification, report: &ValidationReport) {
    for method in spec.potential_orphans() {
        report.add(ValidationFailure::new(
            FailureKind::OrphanedMethod,
            spec.identifier(),
            format!(
                "{}.{} is not used by any member; check its name or mark the member it belongs to",
                method.declaring_class(),
                method.name()
            ),
        ));
    }
}

fn validate_mixin_main(spec: &ObjectSpecification, report: &ValidationReport) {
    let Some(mixin) = spec.facets().get_as::<MixinFacet>(FacetType::MIXIN) else {
        return;
    };
    if spec.declared_action(mixin.main_method()).is_none() {
        report.add(ValidationFailure::new(
            FailureKind::MixinMainMethod,
            spec.identifier(),
            format!(
                "Mixin {} has no action named {}",
                spec.class().name(),
                mixin.main_method()
            ),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_filters_by_kind() {
        let report = ValidationReport::new();
        assert!(report.is_empty());

        report.add(ValidationFailure::new(
            FailureKind::MemberIdClash,
            Identifier::class_identifier("Order"),
            "close clashes",
        ));
        report.add(ValidationFailure::new(
            FailureKind::OrphanedMethod,
            Identifier::class_identifier("Order"),
            "hideNothing",
        ));

        assert_eq!(report.len(), 2);
        assert!(report.has_kind(FailureKind::MemberIdClash));
        assert!(!report.has_kind(FailureKind::MixinConstructor));
        assert_eq!(report.of_kind(FailureKind::OrphanedMethod).len(), 1);
        assert_eq!(
            report.failures()[0].to_string(),
            "[member id clash] Order: close clashes"
        );
    }
}
