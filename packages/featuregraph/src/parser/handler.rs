//! Property handler trait definition.

use roxmltree::Node;

use super::context::ParseContext;
use crate::error::Result;
use crate::model::{FeatureHandle, PropertyValue};
use crate::schema::{PropertyKind, PropertyType};

/// Function type for recursive parsing of nested feature elements.
pub type RecurseFn<'a, 'input> =
    dyn Fn(Node<'a, 'input>, &mut ParseContext<'_>) -> Result<FeatureHandle> + 'a;

/// Which family of property kinds a handler reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Primitive,
    Geometry,
    Feature,
}

impl From<PropertyKind> for HandlerKind {
    fn from(kind: PropertyKind) -> Self {
        match kind {
            PropertyKind::Primitive(_) => Self::Primitive,
            PropertyKind::Geometry | PropertyKind::MultiGeometry => Self::Geometry,
            PropertyKind::Feature(_) => Self::Feature,
        }
    }
}

/// Trait for property handlers.
///
/// A handler turns one property element into a [`PropertyValue`]. Handlers
/// for nested features receive a `recurse` function to parse the child
/// feature element.
pub trait PropertyHandler: Send + Sync {
    /// Return the kind of property this handler reads.
    fn kind(&self) -> HandlerKind;

    /// Read the property element.
    ///
    /// # Arguments
    /// * `node` - The property element
    /// * `property` - Declared (or synthesized) slot for the element
    /// * `feature_id` - Id of the feature owning the property, for errors
    /// * `context` - Current parse session
    /// * `recurse` - Function to call for nested feature elements
    fn handle<'a, 'input>(
        &self,
        node: Node<'a, 'input>,
        property: &PropertyType,
        feature_id: &str,
        context: &mut ParseContext<'_>,
        recurse: &RecurseFn<'a, 'input>,
    ) -> Result<PropertyValue>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GmlGeometryAdapter;
    use crate::model::ScalarValue;
    use crate::parser::ParserOptions;
    use crate::schema::{QName, ScalarKind};

    struct ConstantHandler;

    impl PropertyHandler for ConstantHandler {
        fn kind(&self) -> HandlerKind {
            HandlerKind::Primitive
        }

        fn handle<'a, 'input>(
            &self,
            _node: Node<'a, 'input>,
            _property: &PropertyType,
            _feature_id: &str,
            _context: &mut ParseContext<'_>,
            _recurse: &RecurseFn<'a, 'input>,
        ) -> Result<PropertyValue> {
            Ok(PropertyValue::Primitive(ScalarValue::Integer(7)))
        }
    }

    #[test]
    fn test_handler_trait() {
        let handler = ConstantHandler;
        assert_eq!(handler.kind(), HandlerKind::Primitive);

        let doc = roxmltree::Document::parse("<lanes/>").unwrap();
        let options = ParserOptions::new();
        let mut context = ParseContext::new(&GmlGeometryAdapter, &options);
        let property = PropertyType::new(
            QName::new("", "lanes"),
            PropertyKind::Primitive(ScalarKind::Integer),
        );

        let recurse = |_: Node<'_, '_>, ctx: &mut ParseContext<'_>| -> Result<FeatureHandle> {
            Ok(ctx.graph.handles().next().unwrap_or(FeatureHandle(0)))
        };
        let value = handler
            .handle(doc.root_element(), &property, "r1", &mut context, &recurse)
            .unwrap();
        assert_eq!(value, PropertyValue::Primitive(ScalarValue::Integer(7)));
    }

    #[test]
    fn test_handler_kind_from_property_kind() {
        assert_eq!(HandlerKind::from(PropertyKind::MultiGeometry), HandlerKind::Geometry);
        assert_eq!(
            HandlerKind::from(PropertyKind::Feature(crate::schema::Representation::Either)),
            HandlerKind::Feature
        );
    }
}
