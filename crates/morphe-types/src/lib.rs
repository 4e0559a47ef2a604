//! Morphe Types
//!
//! Vocabulary shared by the metamodel engine and the layers that consume it:
//! stable member identifiers, feature kinds, interaction consents, and the
//! runtime values passed through member invocations.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod consent;
pub mod feature;
pub mod identifier;
pub mod names;
pub mod value;

pub use consent::{
    Consent, InteractionResult, InteractionResultSet, InteractionType, Veto, DEFAULT_VETO_REASON,
};
pub use feature::FeatureType;
pub use identifier::{Identifier, IdentifierKind};
pub use value::{ManagedObject, Value};
