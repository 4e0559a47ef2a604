//! Engine error types

use morphe_types::Identifier;

/// Errors raised while building the metamodel.
///
/// These describe a mismatch between the registered class metadata and what
/// the engine needs; they are not recoverable by retrying the same call.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum MetaModelError {
    /// No class with this name has been registered
    #[error("Unknown class: {0}")]
    UnknownClass(String),

    /// No class is registered under this logical type name
    #[error("Unknown logical type: {0}")]
    UnknownLogicalType(String),

    /// A class was registered twice
    #[error("Class already registered: {0}")]
    DuplicateClass(String),

    /// Two classes claim the same logical type name
    #[error("Logical type {logical_type_name} is claimed by both {existing} and {class}")]
    DuplicateLogicalType {
        /// Contested logical type name
        logical_type_name: String,
        /// Class that registered the name first
        existing: String,
        /// Class that tried to register it again
        class: String,
    },

    /// A type referenced by a class cannot be resolved
    #[error("{class} references unresolvable type {referenced} ({context})")]
    UnresolvableType {
        /// Class doing the referencing
        class: String,
        /// Name that could not be resolved
        referenced: String,
        /// Where the reference was found
        context: String,
    },

    /// The specification loader was dropped while a specification was in use
    #[error("Specification loader is no longer available")]
    LoaderDropped,
}

/// Failures surfaced by the fail-fast interaction helpers and by invocation.
///
/// Hidden, disabled and invalid outcomes are business-rule vetoes; only
/// `execute_with_rule_checking` style helpers turn them into errors.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum InteractionError {
    /// The member is not visible to the caller
    #[error("{identifier} is hidden")]
    Hidden {
        /// Member that was hidden
        identifier: Identifier,
    },

    /// The member is visible but cannot be used
    #[error("{identifier} is disabled: {reason}")]
    Disabled {
        /// Member that was disabled
        identifier: Identifier,
        /// Disabling reason
        reason: String,
    },

    /// The proposed arguments or value broke a business rule
    #[error("{reason}")]
    Invalid {
        /// Member that was invoked
        identifier: Identifier,
        /// Validation reason
        reason: String,
    },

    /// The underlying method reported a failure
    #[error("Invocation of {identifier} failed: {message}")]
    Invocation {
        /// Member that was invoked
        identifier: Identifier,
        /// Failure text from the method
        message: String,
    },

    /// A mixin could not be constructed around its mixee
    #[error("Cannot instantiate mixin {mixin}: {message}")]
    MixinInstantiation {
        /// Mixin class name
        mixin: String,
        /// Failure text
        message: String,
    },
}

impl InteractionError {
    /// Whether the caller can correct the input and retry
    pub fn is_recoverable(&self) -> bool {
        matches!(self, InteractionError::Invalid { .. })
    }

    /// The veto or failure reason, when one applies
    pub fn reason(&self) -> Option<&str> {
        match self {
            InteractionError::Hidden { .. } => None,
            InteractionError::Disabled { reason, .. } | InteractionError::Invalid { reason, .. } => {
                Some(reason)
            }
            InteractionError::Invocation { message, .. }
            | InteractionError::MixinInstantiation { message, .. } => Some(message),
        }
    }
}

/// Signal a framework bug. Never caught by callers.
#[track_caller]
pub fn unexpected_code_reach(message: impl std::fmt::Display) -> ! {
    panic!("Unexpected code reach: {}", message)
}

/// Metamodel result type
pub type MetaModelResult<T> = Result<T, MetaModelError>;
