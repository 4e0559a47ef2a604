//! Metamodel
//!
//! Class descriptors go in through the [`TypeRegistry`]; the
//! [`SpecificationLoader`] turns them into [`ObjectSpecification`]s whose
//! members can be queried, checked and invoked.
//!
//! - `class`: class, method and type descriptors, and the registry
//! - `facet` / `factory`: capabilities attached to types and members, and
//!   the factories that derive them from metadata
//! - `introspector` / `faceted`: method classification
//! - `spec` / `loader`: lazily introspected specifications
//! - `member` / `mixin` / `sequence`: member models and their ordering
//! - `interaction`: the visibility, usability and validity pipeline
//! - `validate`: deferred definition checks

pub mod class;
pub mod facet;
pub mod factory;
pub mod faceted;
pub mod interaction;
pub mod introspector;
pub mod loader;
pub mod member;
pub mod mixin;
pub mod policy;
pub mod sequence;
pub mod spec;
pub mod validate;

pub use class::{
    ClassDescriptor, ClassKind, ConstructorDescriptor, MetadataValue, MethodDescriptor,
    ParameterDescriptor, TypeRef, TypeRegistry,
};
pub use facet::{Facet, FacetHolder, FacetType, Precedence};
pub use factory::{FacetFactory, FacetProcessor};
pub use interaction::{
    CommandLog, CommandRecord, CommandRecorder, ExecutionContext, InteractionHead,
    InteractionInitiatedBy, Where,
};
pub use loader::{LoaderBuilder, LoaderStats, SpecificationLoader};
pub use member::{
    MemberOrigin, ObjectAction, ObjectActionParameter, ObjectAssociation, ObjectMember,
    OneToManyAssociation, OneToOneAssociation,
};
pub use policy::{ClassSubstitutor, IntrospectionPolicy};
pub use spec::{Depth, IntrospectionState, MixedIn, ObjectSpecification};
pub use validate::{FailureKind, ValidationFailure, ValidationReport};
