//! Stable member identifiers
//!
//! An [`Identifier`] names a type or one of its members independently of
//! the in-memory metamodel. Rendering layers use the string form as a key
//! in URLs and layout files, so it must never depend on discovery order.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What an identifier points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IdentifierKind {
    /// The type itself
    Class,
    /// A property or collection
    Association,
    /// An action (has a parameter list)
    Action,
}

/// Logical type name + member id + ordered parameter type names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identifier {
    kind: IdentifierKind,
    logical_type_name: String,
    member_id: String,
    parameter_types: Vec<String>,
}

impl Identifier {
    /// Identifier of a type
    pub fn class_identifier(logical_type_name: impl Into<String>) -> Self {
        Self {
            kind: IdentifierKind::Class,
            logical_type_name: logical_type_name.into(),
            member_id: String::new(),
            parameter_types: Vec::new(),
        }
    }

    /// Identifier of a property or collection
    pub fn association_identifier(
        logical_type_name: impl Into<String>,
        member_id: impl Into<String>,
    ) -> Self {
        Self {
            kind: IdentifierKind::Association,
            logical_type_name: logical_type_name.into(),
            member_id: member_id.into(),
            parameter_types: Vec::new(),
        }
    }

    /// Identifier of an action with its parameter type names
    pub fn action_identifier(
        logical_type_name: impl Into<String>,
        member_id: impl Into<String>,
        parameter_types: Vec<String>,
    ) -> Self {
        Self {
            kind: IdentifierKind::Action,
            logical_type_name: logical_type_name.into(),
            member_id: member_id.into(),
            parameter_types,
        }
    }

    /// Re-home this identifier onto another type, keeping the member part.
    ///
    /// Used when a mixin's main method is contributed to a mixee.
    pub fn with_logical_type_name(&self, logical_type_name: impl Into<String>) -> Self {
        Self {
            logical_type_name: logical_type_name.into(),
            ..self.clone()
        }
    }

    /// Same type and parameters, different member id
    pub fn with_member_id(&self, member_id: impl Into<String>) -> Self {
        Self {
            member_id: member_id.into(),
            ..self.clone()
        }
    }

    /// Identifier kind
    pub fn kind(&self) -> IdentifierKind {
        self.kind
    }

    /// Logical name of the owning type
    pub fn logical_type_name(&self) -> &str {
        &self.logical_type_name
    }

    /// Member id (empty for class identifiers)
    pub fn member_id(&self) -> &str {
        &self.member_id
    }

    /// Parameter type names (actions only)
    pub fn parameter_types(&self) -> &[String] {
        &self.parameter_types
    }

    /// `Type#member` without the parameter list
    pub fn full_identity_string(&self) -> String {
        match self.kind {
            IdentifierKind::Class => self.logical_type_name.clone(),
            _ => format!("{}#{}", self.logical_type_name, self.member_id),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            IdentifierKind::Class => write!(f, "{}", self.logical_type_name),
            IdentifierKind::Association => {
                write!(f, "{}#{}", self.logical_type_name, self.member_id)
            }
            IdentifierKind::Action => write!(
                f,
                "{}#{}({})",
                self.logical_type_name,
                self.member_id,
                self.parameter_types.join(",")
            ),
        }
    }
}
