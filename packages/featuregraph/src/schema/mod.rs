//! Feature types, the schema registry and heuristic type synthesis.

mod guess;
mod registry;
mod types;

pub(crate) use guess::is_structural;
pub use guess::{synthesize_feature_type, widen_feature_type};
pub use registry::{FeatureTypeLookup, FeatureTypeRegistry};
pub use types::{
    FeatureType, MaxOccurs, PropertyKind, PropertyType, QName, Representation, ScalarKind,
    TypeOrigin,
};
