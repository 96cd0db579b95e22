//! In-memory feature graph.
//!
//! Features live in a [`FeatureGraph`] arena and refer to each other by
//! [`FeatureHandle`]. A property value is one of the closed set in
//! [`PropertyValue`]; same-document references stay
//! [`PropertyValue::Unresolved`] until the parser's resolution pass runs.

mod feature;
mod graph;
mod value;

pub use feature::{
    EnvelopeCache, Feature, FeatureBody, FeatureHandle, FeatureProperty, Owner, PropertyRef,
};
pub use graph::FeatureGraph;
pub use value::{PropertyValue, ScalarValue};
