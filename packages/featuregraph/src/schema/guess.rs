//! Heuristic feature types for elements without a declared type.
//!
//! A child element becomes a geometry property when it wraps a single GML
//! geometry, a feature property when it wraps any other element or carries
//! an `xlink:href`, and a primitive property otherwise. Every synthesized
//! slot has cardinality `(0, unbounded)`.

use roxmltree::Node;

use super::types::{FeatureType, MaxOccurs, PropertyKind, PropertyType, Representation, ScalarKind};
use crate::config::{is_gml_namespace, MULTI_GEOMETRY_ELEMENTS, STRUCTURAL_PROPERTIES};
use crate::xml::{element_children, get_href, get_tag_name, get_text, is_gml_element, qualified_name};

/// Build a feature type from the child elements of `node`.
///
/// Repeated property names share one slot; slots keep the order of their
/// first appearance. Primitive kinds are guessed from the text only when
/// `guess_simple_types` is set, otherwise they are strings.
#[must_use]
pub fn synthesize_feature_type(node: Node<'_, '_>, guess_simple_types: bool) -> FeatureType {
    let mut properties: Vec<PropertyType> = Vec::new();
    collect_properties(node, guess_simple_types, &mut properties);
    FeatureType::synthesized(qualified_name(node), properties)
}

/// Widen an earlier synthesized type with what a later instance shows.
///
/// Returns `None` when `existing` already covers `node`. New property
/// names are appended; primitive kinds that disagree are relaxed, and a
/// primitive slot becomes a feature or geometry slot once an instance holds
/// element content there.
#[must_use]
pub fn widen_feature_type(
    existing: &FeatureType,
    node: Node<'_, '_>,
    guess_simple_types: bool,
) -> Option<FeatureType> {
    let mut properties = existing.properties().to_vec();
    let mut changed = false;

    let mut observed: Vec<PropertyType> = Vec::new();
    collect_properties(node, guess_simple_types, &mut observed);

    for candidate in observed {
        match properties.iter_mut().find(|p| p.name == candidate.name) {
            Some(slot) => {
                let widened = widen_kind(slot.kind, candidate.kind);
                if widened != slot.kind {
                    slot.kind = widened;
                    changed = true;
                }
            }
            None => {
                properties.push(candidate);
                changed = true;
            }
        }
    }

    changed.then(|| FeatureType::synthesized(existing.name().clone(), properties))
}

fn collect_properties(node: Node<'_, '_>, guess: bool, properties: &mut Vec<PropertyType>) {
    for child in element_children(node) {
        if is_structural(child) {
            continue;
        }
        let name = qualified_name(child);
        let kind = guess_kind(child, guess);
        match properties.iter_mut().find(|p| p.name == name) {
            Some(slot) => slot.kind = widen_kind(slot.kind, kind),
            None => properties
                .push(PropertyType::new(name, kind).with_occurs(0, MaxOccurs::Unbounded)),
        }
    }
}

/// Structural GML properties never become feature content.
pub(crate) fn is_structural(node: Node<'_, '_>) -> bool {
    node.tag_name().namespace().is_some_and(is_gml_namespace)
        && STRUCTURAL_PROPERTIES.contains(&get_tag_name(node))
}

fn guess_kind(property: Node<'_, '_>, guess: bool) -> PropertyKind {
    let children: Vec<Node<'_, '_>> = element_children(property).collect();
    match children.as_slice() {
        [] if get_href(property).is_some() => PropertyKind::Feature(Representation::Either),
        [] => PropertyKind::Primitive(guess_scalar(get_text(property).trim(), guess)),
        [single] if is_geometry(*single) => {
            if MULTI_GEOMETRY_ELEMENTS.contains(&get_tag_name(*single)) {
                PropertyKind::MultiGeometry
            } else {
                PropertyKind::Geometry
            }
        }
        _ => PropertyKind::Feature(Representation::Either),
    }
}

fn is_geometry(node: Node<'_, '_>) -> bool {
    crate::config::is_geometry_element(get_tag_name(node))
        && is_gml_element(node, get_tag_name(node))
}

fn guess_scalar(text: &str, guess: bool) -> ScalarKind {
    if !guess || text.is_empty() {
        return ScalarKind::String;
    }
    if text.parse::<i64>().is_ok() {
        ScalarKind::Integer
    } else if text.parse::<f64>().is_ok() {
        ScalarKind::Float
    } else {
        ScalarKind::String
    }
}

fn widen_kind(current: PropertyKind, observed: PropertyKind) -> PropertyKind {
    use PropertyKind::Primitive;

    match (current, observed) {
        (a, b) if a == b => a,
        (Primitive(ScalarKind::Integer), Primitive(ScalarKind::Float))
        | (Primitive(ScalarKind::Float), Primitive(ScalarKind::Integer)) => {
            Primitive(ScalarKind::Float)
        }
        (Primitive(_), Primitive(_)) => Primitive(ScalarKind::String),
        (PropertyKind::Geometry, PropertyKind::MultiGeometry)
        | (PropertyKind::MultiGeometry, PropertyKind::Geometry) => PropertyKind::Geometry,
        // Element content seen where earlier instances only had text
        (Primitive(_), b) => b,
        (a, _) => a,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{QName, TypeOrigin};
    use roxmltree::Document;

    const APP: &str = "http://example.com/app";

    fn app(local: &str) -> QName {
        QName::new(APP, local)
    }

    const ROAD: &str = r##"<app:Road xmlns:app="http://example.com/app"
            xmlns:gml="http://www.opengis.net/gml/3.2"
            xmlns:xlink="http://www.w3.org/1999/xlink" gml:id="r1">
        <gml:name>A1</gml:name>
        <app:name>Main</app:name>
        <app:lanes>2</app:lanes>
        <app:width>7.5</app:width>
        <app:geometry><gml:LineString><gml:posList>0 0 1 1</gml:posList></gml:LineString></app:geometry>
        <app:area><gml:MultiSurface/></app:area>
        <app:owner xlink:href="#o1"/>
        <app:lanes>3</app:lanes>
        <app:segment><app:Segment gml:id="s1"/></app:segment>
    </app:Road>"##;

    #[test]
    fn test_synthesize_kinds() {
        let doc = Document::parse(ROAD).unwrap();
        let ft = synthesize_feature_type(doc.root_element(), true);

        assert_eq!(ft.origin(), TypeOrigin::Synthesized);
        let names: Vec<&str> = ft.properties().iter().map(|p| p.name.local_name()).collect();
        assert_eq!(
            names,
            vec!["name", "lanes", "width", "geometry", "area", "owner", "segment"]
        );
        let kind = |local: &str| ft.property(&app(local)).unwrap().kind;
        assert_eq!(kind("lanes"), PropertyKind::Primitive(ScalarKind::Integer));
        assert_eq!(kind("width"), PropertyKind::Primitive(ScalarKind::Float));
        assert_eq!(kind("geometry"), PropertyKind::Geometry);
        assert_eq!(kind("area"), PropertyKind::MultiGeometry);
        assert_eq!(kind("owner"), PropertyKind::Feature(Representation::Either));
        assert_eq!(kind("segment"), PropertyKind::Feature(Representation::Either));
        assert!(ft
            .properties()
            .iter()
            .all(|p| p.min_occurs == 0 && p.max_occurs == MaxOccurs::Unbounded));
    }

    #[test]
    fn test_synthesize_without_guessing() {
        let doc = Document::parse(ROAD).unwrap();
        let ft = synthesize_feature_type(doc.root_element(), false);
        assert_eq!(
            ft.property(&app("lanes")).unwrap().kind,
            PropertyKind::Primitive(ScalarKind::String)
        );
    }

    #[test]
    fn test_widen_appends_and_relaxes() {
        let first = Document::parse(r#"<Road><lanes>2</lanes></Road>"#).unwrap();
        let ft = synthesize_feature_type(first.root_element(), true);

        let same = Document::parse(r#"<Road><lanes>4</lanes></Road>"#).unwrap();
        assert!(widen_feature_type(&ft, same.root_element(), true).is_none());

        let later =
            Document::parse(r#"<Road><lanes>two</lanes><surface>asphalt</surface></Road>"#)
                .unwrap();
        let widened = widen_feature_type(&ft, later.root_element(), true).unwrap();
        let lanes = widened.property(&QName::new("", "lanes")).unwrap();
        assert_eq!(lanes.kind, PropertyKind::Primitive(ScalarKind::String));
        assert!(widened.property(&QName::new("", "surface")).is_some());
    }

    #[test]
    fn test_widen_primitive_to_nested_content() {
        let first = Document::parse(r#"<Road><segment/></Road>"#).unwrap();
        let ft = synthesize_feature_type(first.root_element(), true);
        let segment = QName::new("", "segment");
        assert_eq!(
            ft.property(&segment).unwrap().kind,
            PropertyKind::Primitive(ScalarKind::String)
        );

        let later = Document::parse(r#"<Road><segment><Segment/></segment></Road>"#).unwrap();
        let widened = widen_feature_type(&ft, later.root_element(), true).unwrap();
        assert_eq!(
            widened.property(&segment).unwrap().kind,
            PropertyKind::Feature(Representation::Either)
        );

        // Text after nested content does not narrow the slot again
        let text = Document::parse(r#"<Road><segment>none</segment></Road>"#).unwrap();
        assert!(widen_feature_type(&widened, text.root_element(), true).is_none());
    }
}
