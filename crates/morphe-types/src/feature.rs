//! Feature kinds of introspected members

use std::fmt;

use serde::{Deserialize, Serialize};

/// The role a faceted element plays in the metamodel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureType {
    /// The type itself
    Object,
    /// Scalar-valued accessor
    Property,
    /// Collection-valued accessor
    Collection,
    /// Invocable method
    Action,
    /// Scalar action parameter
    ActionParameterScalar,
    /// Collection action parameter
    ActionParameterCollection,
}

impl FeatureType {
    /// All feature types, in declaration order
    pub const ALL: [FeatureType; 6] = [
        FeatureType::Object,
        FeatureType::Property,
        FeatureType::Collection,
        FeatureType::Action,
        FeatureType::ActionParameterScalar,
        FeatureType::ActionParameterCollection,
    ];

    /// Member types only (no object, no parameters)
    pub const MEMBERS: [FeatureType; 3] = [
        FeatureType::Property,
        FeatureType::Collection,
        FeatureType::Action,
    ];

    /// Properties and collections
    pub fn is_association(self) -> bool {
        matches!(self, FeatureType::Property | FeatureType::Collection)
    }

    /// Either kind of action parameter
    pub fn is_action_parameter(self) -> bool {
        matches!(
            self,
            FeatureType::ActionParameterScalar | FeatureType::ActionParameterCollection
        )
    }

    /// Property, collection or action
    pub fn is_member(self) -> bool {
        self.is_association() || self == FeatureType::Action
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeatureType::Object => "object",
            FeatureType::Property => "property",
            FeatureType::Collection => "collection",
            FeatureType::Action => "action",
            FeatureType::ActionParameterScalar => "action parameter",
            FeatureType::ActionParameterCollection => "action parameter (collection)",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_type_classification() {
        assert!(FeatureType::Property.is_association());
        assert!(FeatureType::Collection.is_association());
        assert!(!FeatureType::Action.is_association());
        assert!(FeatureType::Action.is_member());
        assert!(!FeatureType::Object.is_member());
        assert!(FeatureType::ActionParameterCollection.is_action_parameter());
    }
}
