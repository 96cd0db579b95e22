//! Built-in property handlers.

use roxmltree::Node;
use url::Url;

use super::context::ParseContext;
use super::handler::{HandlerKind, PropertyHandler, RecurseFn};
use crate::config::validate_identifier;
use crate::error::{FeatureError, Result};
use crate::model::PropertyValue;
use crate::model::ScalarValue;
use crate::schema::{PropertyKind, PropertyType, QName, ScalarKind};
use crate::xml::{element_children, get_href, get_text};

fn child_count_error(feature_id: &str, property: &QName, count: usize, expected: &'static str) -> FeatureError {
    FeatureError::ChildCount {
        feature: feature_id.to_string(),
        property: property.to_string(),
        count,
        expected,
    }
}

/// Handler for primitive (text-only) properties.
pub struct PrimitiveHandler;

impl PropertyHandler for PrimitiveHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Primitive
    }

    fn handle<'a, 'input>(
        &self,
        node: Node<'a, 'input>,
        property: &PropertyType,
        feature_id: &str,
        _context: &mut ParseContext<'_>,
        _recurse: &RecurseFn<'a, 'input>,
    ) -> Result<PropertyValue> {
        let count = element_children(node).count();
        if count > 0 {
            return Err(child_count_error(feature_id, &property.name, count, "0"));
        }
        let kind = match property.kind {
            PropertyKind::Primitive(kind) => kind,
            _ => ScalarKind::String,
        };
        ScalarValue::parse(&get_text(node), kind, &property.name).map(PropertyValue::Primitive)
    }
}

/// Handler for properties wrapping one geometry element.
pub struct GeometryHandler;

impl PropertyHandler for GeometryHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Geometry
    }

    fn handle<'a, 'input>(
        &self,
        node: Node<'a, 'input>,
        property: &PropertyType,
        feature_id: &str,
        context: &mut ParseContext<'_>,
        _recurse: &RecurseFn<'a, 'input>,
    ) -> Result<PropertyValue> {
        let children: Vec<Node<'a, 'input>> = element_children(node).collect();
        match children.as_slice() {
            [geometry] => context
                .adapter
                .parse_geometry(*geometry, context.default_srs())
                .map(PropertyValue::Geometry),
            _ => Err(child_count_error(feature_id, &property.name, children.len(), "1")),
        }
    }
}

/// Handler for nested feature properties, inline or by `xlink:href`.
pub struct FeatureHandler;

impl PropertyHandler for FeatureHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Feature
    }

    fn handle<'a, 'input>(
        &self,
        node: Node<'a, 'input>,
        property: &PropertyType,
        feature_id: &str,
        context: &mut ParseContext<'_>,
        recurse: &RecurseFn<'a, 'input>,
    ) -> Result<PropertyValue> {
        let children: Vec<Node<'a, 'input>> = element_children(node).collect();
        match children.as_slice() {
            [child] => recurse(*child, context).map(PropertyValue::Feature),
            [] => match get_href(node) {
                Some(href) => classify_href(href, &property.name, context.options.base_url.as_ref()),
                None => Err(child_count_error(
                    feature_id,
                    &property.name,
                    0,
                    "1 or an xlink:href",
                )),
            },
            _ => Err(child_count_error(feature_id, &property.name, children.len(), "1")),
        }
    }
}

/// Classify an `xlink:href` as a same-document or external reference.
///
/// `#id` and URLs equal to `base_url` up to the fragment are same-document
/// references. Other absolute URLs are external; relative ones are made
/// absolute against `base_url`.
///
/// # Examples
/// ```
/// use featuregraph::model::PropertyValue;
/// use featuregraph::parser::classify_href;
/// use featuregraph::schema::QName;
///
/// let p = QName::new("http://example.com/app", "owner");
/// assert_eq!(
///     classify_href("#o1", &p, None).unwrap(),
///     PropertyValue::Unresolved("o1".to_string())
/// );
/// assert_eq!(
///     classify_href("https://example.com/owners.xml#o1", &p, None).unwrap(),
///     PropertyValue::External("https://example.com/owners.xml#o1".to_string())
/// );
/// assert!(classify_href("owners.xml#o1", &p, None).is_err());
/// ```
pub fn classify_href(href: &str, property: &QName, base_url: Option<&Url>) -> Result<PropertyValue> {
    if let Some(id) = href.strip_prefix('#') {
        validate_identifier(id, &property.to_string())?;
        return Ok(PropertyValue::Unresolved(id.to_string()));
    }

    let (absolute, keep_original) = match Url::parse(href) {
        Ok(url) => (url, true),
        Err(url::ParseError::RelativeUrlWithoutBase) => match base_url {
            Some(base) => (base.join(href)?, false),
            None => {
                return Err(FeatureError::UnresolvableReference {
                    href: href.to_string(),
                    property: property.to_string(),
                })
            }
        },
        Err(e) => return Err(e.into()),
    };

    if let (Some(base), Some(fragment)) = (base_url, absolute.fragment()) {
        if same_document(base, &absolute) {
            validate_identifier(fragment, &property.to_string())?;
            return Ok(PropertyValue::Unresolved(fragment.to_string()));
        }
    }

    if keep_original {
        Ok(PropertyValue::External(href.to_string()))
    } else {
        Ok(PropertyValue::External(absolute.to_string()))
    }
}

fn same_document(base: &Url, url: &Url) -> bool {
    let mut a = base.clone();
    let mut b = url.clone();
    a.set_fragment(None);
    b.set_fragment(None);
    a == b
}
