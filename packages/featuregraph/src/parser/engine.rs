//! Document parser that builds a feature graph using the handler registry.

use std::sync::Arc;

use roxmltree::{Document, Node};

use super::context::{ParseContext, ParserOptions, PendingMember, UnresolvedRef};
use super::document::ParsedDocument;
use super::handlers::classify_href;
use super::registry::{create_default_registry, PropertyHandlerRegistry};
use crate::config::{is_gml_namespace, validate_identifier, WFS_NS};
use crate::error::{FeatureError, Result};
use crate::geometry::GeometryAdapter;
use crate::model::{FeatureBody, FeatureHandle, PropertyValue};
use crate::schema::{is_structural, FeatureType, FeatureTypeLookup};
use crate::xml::{element_children, get_feature_id, get_href, get_tag_name, qualified_name};

/// Attributes of collection elements that describe the response, not the data.
const COLLECTION_COUNT_ATTRIBUTES: &[&str] = &["numberOfFeatures", "numberMatched", "numberReturned"];

/// Role of a child element of a feature collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemberRole {
    /// `gml:featureMember` or `wfs:member`: exactly one feature or a tuple.
    Single,
    /// `gml:featureMembers`: any number of features.
    List,
}

fn member_role(node: Node<'_, '_>) -> Option<MemberRole> {
    let namespace = node.tag_name().namespace().unwrap_or_default();
    match get_tag_name(node) {
        "featureMember" if is_gml_namespace(namespace) => Some(MemberRole::Single),
        "featureMembers" if is_gml_namespace(namespace) => Some(MemberRole::List),
        "member" if namespace == WFS_NS => Some(MemberRole::Single),
        _ => None,
    }
}

fn is_tuple(node: Node<'_, '_>) -> bool {
    get_tag_name(node) == "Tuple" && node.tag_name().namespace() == Some(WFS_NS)
}

/// Check whether an element is a feature collection.
///
/// `FeatureCollection` in the GML or WFS namespace always is; any other
/// element is when it has member children.
#[must_use]
pub fn is_feature_collection(node: Node<'_, '_>) -> bool {
    let namespace = node.tag_name().namespace().unwrap_or_default();
    let named = get_tag_name(node) == "FeatureCollection"
        && (is_gml_namespace(namespace) || namespace == WFS_NS);
    named || element_children(node).any(|c| member_role(c).is_some())
}

/// Parser from GML/WFS documents to a [`ParsedDocument`].
///
/// Feature types come from the lookup; elements without a declared type
/// get a synthesized one.
pub struct DocumentParser<'a> {
    lookup: &'a dyn FeatureTypeLookup,
    adapter: &'a dyn GeometryAdapter,
    handlers: PropertyHandlerRegistry,
    options: ParserOptions,
}

impl<'a> DocumentParser<'a> {
    /// Create a parser with the built-in handlers and default options.
    #[must_use]
    pub fn new(lookup: &'a dyn FeatureTypeLookup, adapter: &'a dyn GeometryAdapter) -> Self {
        Self {
            lookup,
            adapter,
            handlers: create_default_registry(),
            options: ParserOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_handlers(mut self, handlers: PropertyHandlerRegistry) -> Self {
        self.handlers = handlers;
        self
    }

    #[must_use]
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Parse XML text. References are not resolved yet.
    pub fn parse_str(&self, xml: &str) -> Result<ParsedDocument> {
        let document = Document::parse(xml)?;
        self.parse(document.root_element())
    }

    /// Parse the tree rooted at `root`. References are not resolved yet.
    pub fn parse(&self, root: Node<'_, '_>) -> Result<ParsedDocument> {
        let mut context = ParseContext::new(self.adapter, &self.options);
        let handle = self.parse_element(root, &mut context)?;
        tracing::debug!(
            features = context.graph.len(),
            unresolved = context.unresolved.len(),
            "parsed document"
        );
        Ok(context.into_document(handle))
    }

    /// Parse an element as a feature or feature collection.
    ///
    /// # Errors
    /// Returns a parse error on the first malformed element; nothing is
    /// recovered.
    pub fn parse_element(
        &self,
        node: Node<'_, '_>,
        context: &mut ParseContext<'_>,
    ) -> Result<FeatureHandle> {
        if is_feature_collection(node) {
            self.parse_collection(node, context)
        } else {
            self.parse_feature(node, context)
        }
    }

    fn feature_type(&self, node: Node<'_, '_>, context: &mut ParseContext<'_>) -> Arc<FeatureType> {
        match self.lookup.feature_type_for(&qualified_name(node)) {
            Some(declared) => declared,
            None => context.synthesized_type(node),
        }
    }

    fn element_id(&self, node: Node<'_, '_>, context: &mut ParseContext<'_>) -> Result<String> {
        let local = get_tag_name(node);
        match get_feature_id(node) {
            Some(id) => {
                validate_identifier(id, local)?;
                Ok(id.to_string())
            }
            None => Ok(context.next_id(local)),
        }
    }

    fn parse_feature(
        &self,
        node: Node<'_, '_>,
        context: &mut ParseContext<'_>,
    ) -> Result<FeatureHandle> {
        let feature_type = self.feature_type(node, context);
        let id = self.element_id(node, context)?;
        let handle = context
            .graph
            .add_feature(Arc::clone(&feature_type), Some(id.clone()));

        for attribute in node.attributes() {
            if attribute.namespace().is_none() && attribute.name() != "fid" {
                context
                    .graph
                    .set_attribute(handle, attribute.name(), attribute.value());
            }
        }

        let pushed = context.push_bounded_by(node);
        let result = self.parse_properties(node, handle, &feature_type, &id, context);
        if pushed {
            context.pop_srs();
        }
        result?;

        context.register_id(id, handle)?;
        Ok(handle)
    }

    fn parse_properties(
        &self,
        node: Node<'_, '_>,
        handle: FeatureHandle,
        feature_type: &FeatureType,
        id: &str,
        context: &mut ParseContext<'_>,
    ) -> Result<()> {
        let recurse = |child: Node<'_, '_>, ctx: &mut ParseContext<'_>| -> Result<FeatureHandle> {
            self.parse_element(child, ctx)
        };

        for child in element_children(node) {
            let name = qualified_name(child);
            if self.handlers.should_skip(&name) {
                continue;
            }
            let property = feature_type
                .property(&name)
                .ok_or_else(|| FeatureError::UnknownProperty {
                    feature: id.to_string(),
                    property: name.to_string(),
                })?;
            let handler = self.handlers.get_handler(property).ok_or_else(|| {
                FeatureError::Config(format!("no handler for {}", property.kind.describe()))
            })?;

            let value = handler.handle(child, property, id, context, &recurse)?;
            let target = match &value {
                PropertyValue::Unresolved(target) => Some(target.clone()),
                _ => None,
            };
            let pref = context.graph.push_property(handle, name, value);
            if let Some(target) = target {
                context.unresolved.push(UnresolvedRef {
                    property: pref,
                    target,
                });
            }
        }
        Ok(())
    }

    fn parse_collection(
        &self,
        node: Node<'_, '_>,
        context: &mut ParseContext<'_>,
    ) -> Result<FeatureHandle> {
        let name = qualified_name(node);
        let feature_type = context.collection_type(&name);
        let id = self.element_id(node, context)?;

        let tuple_length = element_children(node)
            .filter(|c| member_role(*c) == Some(MemberRole::Single))
            .find_map(|m| element_children(m).find(|c| is_tuple(*c)))
            .map(|tuple| element_children(tuple).count());
        let handle = match tuple_length {
            Some(length) => {
                context
                    .graph
                    .add_tuple_collection(feature_type, Some(id.clone()), length)
            }
            None => context.graph.add_collection(feature_type, Some(id.clone())),
        };

        for attribute in node.attributes() {
            if attribute.namespace().is_none()
                && !COLLECTION_COUNT_ATTRIBUTES.contains(&attribute.name())
            {
                context
                    .graph
                    .set_attribute(handle, attribute.name(), attribute.value());
            }
        }

        let pushed = context.push_bounded_by(node);
        let result = self.parse_members(node, handle, &id, context);
        if pushed {
            context.pop_srs();
        }
        result?;

        context.register_id(id, handle)?;
        Ok(handle)
    }

    fn parse_members(
        &self,
        node: Node<'_, '_>,
        collection: FeatureHandle,
        id: &str,
        context: &mut ParseContext<'_>,
    ) -> Result<()> {
        for child in element_children(node) {
            match member_role(child) {
                Some(MemberRole::Single) => self.parse_member(child, collection, id, context)?,
                Some(MemberRole::List) => {
                    for feature in element_children(child) {
                        let member = self.parse_element(feature, context)?;
                        context.graph.add_member(collection, member)?;
                    }
                }
                None if is_structural(child) => {}
                None => {
                    return Err(FeatureError::UnknownProperty {
                        feature: id.to_string(),
                        property: qualified_name(child).to_string(),
                    })
                }
            }
        }
        Ok(())
    }

    fn parse_member(
        &self,
        member: Node<'_, '_>,
        collection: FeatureHandle,
        id: &str,
        context: &mut ParseContext<'_>,
    ) -> Result<()> {
        let children: Vec<Node<'_, '_>> = element_children(member).collect();
        let tuple_length = match context.graph.feature(collection).body() {
            FeatureBody::TupleCollection { tuple_length, .. } => Some(*tuple_length),
            _ => None,
        };
        match children.as_slice() {
            [tuple] if is_tuple(*tuple) => {
                let mut handles = Vec::new();
                for slot in element_children(*tuple) {
                    let features: Vec<Node<'_, '_>> = element_children(slot).collect();
                    match features.as_slice() {
                        [feature] => handles.push(self.parse_element(*feature, context)?),
                        _ => {
                            return Err(FeatureError::ChildCount {
                                feature: id.to_string(),
                                property: qualified_name(slot).to_string(),
                                count: features.len(),
                                expected: "1",
                            })
                        }
                    }
                }
                context.graph.add_tuple(collection, handles)
            }
            [feature] => {
                let handle = self.parse_element(*feature, context)?;
                context.graph.add_member(collection, handle)
            }
            [] => match (get_href(member), tuple_length) {
                // Tuples are never given by reference
                (Some(_), Some(expected)) => Err(FeatureError::TupleLength {
                    collection: id.to_string(),
                    expected,
                    actual: 1,
                }),
                (Some(href), None) => {
                    let property = qualified_name(member);
                    match classify_href(href, &property, self.options.base_url.as_ref())? {
                        PropertyValue::Unresolved(target) => {
                            context.pending_members.push(PendingMember { collection, target });
                        }
                        _ => {
                            tracing::warn!(href, collection = id, "skipping member outside the document");
                        }
                    }
                    Ok(())
                }
                (None, _) => Err(FeatureError::ChildCount {
                    feature: id.to_string(),
                    property: qualified_name(member).to_string(),
                    count: 0,
                    expected: "1 or an xlink:href",
                }),
            },
            _ => Err(FeatureError::ChildCount {
                feature: id.to_string(),
                property: qualified_name(member).to_string(),
                count: children.len(),
                expected: "1",
            }),
        }
    }
}

/// Parse and resolve a document in one step.
///
/// # Examples
/// ```
/// use featuregraph::geometry::GmlGeometryAdapter;
/// use featuregraph::parser::{parse_document, ParserOptions};
/// use featuregraph::schema::FeatureTypeRegistry;
///
/// let xml = r##"<Road xmlns:xlink="http://www.w3.org/1999/xlink" fid="r1">
///     <name>Main</name>
///     <next xlink:href="#r1"/>
/// </Road>"##;
/// let registry = FeatureTypeRegistry::new();
/// let doc = parse_document(xml, &registry, &GmlGeometryAdapter, ParserOptions::new()).unwrap();
/// assert!(doc.is_resolved());
/// assert_eq!(doc.graph.feature_id(doc.root), "r1");
/// ```
pub fn parse_document(
    xml: &str,
    lookup: &dyn FeatureTypeLookup,
    adapter: &dyn GeometryAdapter,
    options: ParserOptions,
) -> Result<ParsedDocument> {
    let parser = DocumentParser::new(lookup, adapter).with_options(options);
    let mut document = parser.parse_str(xml)?;
    document.resolve()?;
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{GmlGeometryAdapter, Shape};
    use crate::model::{FeatureBody, Owner, ScalarValue};
    use crate::schema::{FeatureTypeRegistry, QName, TypeOrigin};
    use pretty_assertions::assert_eq;

    const APP: &str = "http://example.com/app";

    fn app(local: &str) -> QName {
        QName::new(APP, local)
    }

    fn parse(xml: &str) -> Result<ParsedDocument> {
        let registry = FeatureTypeRegistry::new();
        let parser = DocumentParser::new(&registry, &GmlGeometryAdapter)
            .with_options(ParserOptions::new().with_guess_simple_types(true));
        parser.parse_str(xml)
    }

    const ROADS: &str = r##"<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs/2.0"
            xmlns:gml="http://www.opengis.net/gml/3.2"
            xmlns:xlink="http://www.w3.org/1999/xlink"
            xmlns:app="http://example.com/app"
            numberMatched="2" numberReturned="2" timeStamp="2024-01-01T00:00:00">
        <gml:boundedBy><gml:Envelope srsName="EPSG:28992"/></gml:boundedBy>
        <wfs:member>
            <app:Road gml:id="r1" status="open">
                <gml:name>A1</gml:name>
                <app:lanes>2</app:lanes>
                <app:geometry><gml:Point><gml:pos>1 2</gml:pos></gml:Point></app:geometry>
                <app:segment><app:Segment gml:id="s1"><app:length>10</app:length></app:Segment></app:segment>
                <app:next xlink:href="#r2"/>
            </app:Road>
        </wfs:member>
        <wfs:member>
            <app:Road gml:id="r2">
                <app:lanes>4</app:lanes>
                <app:next xlink:href="#r1"/>
            </app:Road>
        </wfs:member>
    </wfs:FeatureCollection>"##;

    #[test]
    fn test_parse_collection() {
        let mut doc = parse(ROADS).unwrap();
        assert_eq!(doc.unresolved_count(), 2);
        doc.resolve().unwrap();
        assert!(doc.is_resolved());

        let graph = &doc.graph;
        let root = graph.feature(doc.root);
        assert!(root.feature_type().is_collection());
        assert_eq!(graph.members(doc.root).len(), 2);
        assert!(!root.attributes().contains_key("numberMatched"));
        assert_eq!(
            root.attributes().get("timeStamp").map(String::as_str),
            Some("2024-01-01T00:00:00")
        );

        let r1 = doc.lookup("r1").unwrap();
        let r2 = doc.lookup("r2").unwrap();
        let road = graph.feature(r1);
        assert_eq!(road.feature_type().origin(), TypeOrigin::Synthesized);
        assert_eq!(road.attributes().get("status").map(String::as_str), Some("open"));
        assert_eq!(graph.owner(r1), Some(Owner::Collection(doc.root)));

        let names: Vec<&str> = road
            .properties()
            .iter()
            .map(|p| p.name.local_name())
            .collect();
        assert_eq!(names, vec!["lanes", "geometry", "segment", "next"]);
        assert_eq!(
            road.properties()[0].value,
            PropertyValue::Primitive(ScalarValue::Integer(2))
        );

        // Geometry picked up the collection's boundedBy CRS
        let PropertyValue::Geometry(geometry) = &road.properties()[1].value else {
            panic!("expected geometry");
        };
        assert_eq!(geometry.srs_name.as_deref(), Some("EPSG:28992"));
        assert!(matches!(geometry.shape, Shape::Point(_)));

        let s1 = doc.lookup("s1").unwrap();
        assert_eq!(road.properties()[2].value, PropertyValue::Feature(s1));
        assert_eq!(road.properties()[3].value, PropertyValue::Feature(r2));
        assert_eq!(
            graph.feature(r2).properties()[1].value,
            PropertyValue::Feature(r1)
        );
    }

    #[test]
    fn test_dangling_reference() {
        let xml = r##"<app:Road xmlns:app="http://example.com/app"
                xmlns:xlink="http://www.w3.org/1999/xlink" fid="r1">
            <app:next xlink:href="#nowhere"/>
        </app:Road>"##;
        let mut doc = parse(xml).unwrap();
        let err = doc.resolve().unwrap_err();
        assert!(matches!(err, FeatureError::DanglingReference { ref id, .. } if id == "nowhere"));
        assert_eq!(doc.unresolved_count(), 1);
    }

    #[test]
    fn test_duplicate_id() {
        let xml = r#"<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs/2.0"
                xmlns:gml="http://www.opengis.net/gml/3.2">
            <wfs:member><Road gml:id="r1"/></wfs:member>
            <wfs:member><Road gml:id="r1"/></wfs:member>
        </wfs:FeatureCollection>"#;
        assert!(matches!(parse(xml), Err(FeatureError::DuplicateId(id)) if id == "r1"));
    }

    #[test]
    fn test_invalid_identifier() {
        let xml = r#"<Road xmlns:gml="http://www.opengis.net/gml/3.2" gml:id="1road"/>"#;
        assert!(matches!(
            parse(xml),
            Err(FeatureError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_generated_ids() {
        let xml = r#"<Road><segment><Segment/></segment></Road>"#;
        let doc = parse(xml).unwrap();
        assert_eq!(doc.graph.feature_id(doc.root), "Road1");
        assert!(doc.lookup("Segment2").is_some());
    }

    #[test]
    fn test_empty_id_is_generated() {
        let xml = r#"<app:Road xmlns:app="http://example.com/app"
                xmlns:gml="http://www.opengis.net/gml/3.2" gml:id="">
            <app:name>Main</app:name>
        </app:Road>"#;
        let doc = parse(xml).unwrap();
        assert_eq!(doc.graph.feature_id(doc.root), "Road1");
        assert!(doc.lookup("").is_none());
    }

    #[test]
    fn test_later_instance_with_nested_feature_widens_type() {
        let xml = r#"<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs/2.0"
                xmlns:app="http://example.com/app">
            <wfs:member><app:Road fid="r1"><app:segment/></app:Road></wfs:member>
            <wfs:member><app:Road fid="r2"><app:segment><app:Segment fid="s1"/></app:segment></app:Road></wfs:member>
        </wfs:FeatureCollection>"#;
        let doc = parse(xml).unwrap();
        let r2 = doc.graph.feature(doc.lookup("r2").unwrap());
        let s1 = doc.lookup("s1").unwrap();
        assert_eq!(r2.properties()[0].value, PropertyValue::Feature(s1));
    }

    #[test]
    fn test_declared_type_rejects_unknown_property() {
        let registry = FeatureTypeRegistry::from_yaml_str(
            "namespaces: {app: http://example.com/app}\nfeature_types:\n  - name: app:Road\n    properties:\n      - {name: app:name, type: string}\n",
        )
        .unwrap();
        let xml = r#"<app:Road xmlns:app="http://example.com/app" fid="r1">
            <app:name>Main</app:name><app:width>7</app:width>
        </app:Road>"#;
        let parser = DocumentParser::new(&registry, &GmlGeometryAdapter);
        let err = parser.parse_str(xml).unwrap_err();
        assert!(matches!(err, FeatureError::UnknownProperty { ref property, .. }
            if property == "{http://example.com/app}width"));
    }

    #[test]
    fn test_declared_type_conversion_error() {
        let registry = FeatureTypeRegistry::from_yaml_str(
            "namespaces: {app: http://example.com/app}\nfeature_types:\n  - name: app:Road\n    properties:\n      - {name: app:lanes, type: integer}\n",
        )
        .unwrap();
        let xml = r#"<app:Road xmlns:app="http://example.com/app" fid="r1"><app:lanes>abc</app:lanes></app:Road>"#;
        let parser = DocumentParser::new(&registry, &GmlGeometryAdapter);
        let err = parser.parse_str(xml).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot convert 'abc' of property {http://example.com/app}lanes to integer"
        );
    }

    #[test]
    fn test_nested_feature_child_count() {
        let registry = FeatureTypeRegistry::from_yaml_str(
            "namespaces: {app: http://example.com/app}\nfeature_types:\n  - name: app:Road\n    properties:\n      - {name: app:segment, type: feature}\n",
        )
        .unwrap();
        let xml = r#"<app:Road xmlns:app="http://example.com/app" fid="r1">
            <app:segment><app:A/><app:B/></app:segment>
        </app:Road>"#;
        let parser = DocumentParser::new(&registry, &GmlGeometryAdapter);
        assert!(matches!(
            parser.parse_str(xml),
            Err(FeatureError::ChildCount { count: 2, .. })
        ));
    }

    #[test]
    fn test_tuple_collection() {
        let xml = r#"<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs/2.0"
                xmlns:app="http://example.com/app">
            <wfs:member><wfs:Tuple>
                <wfs:member><app:Road fid="r1"/></wfs:member>
                <wfs:member><app:Owner fid="o1"/></wfs:member>
            </wfs:Tuple></wfs:member>
            <wfs:member><wfs:Tuple>
                <wfs:member><app:Road fid="r2"/></wfs:member>
            </wfs:Tuple></wfs:member>
        </wfs:FeatureCollection>"#;
        let err = parse(xml).unwrap_err();
        assert!(matches!(
            err,
            FeatureError::TupleLength {
                expected: 2,
                actual: 1,
                ..
            }
        ));

        let ok = xml.replace(
            r#"<wfs:member><app:Road fid="r2"/></wfs:member>"#,
            r#"<wfs:member><app:Road fid="r2"/></wfs:member><wfs:member><app:Owner fid="o2"/></wfs:member>"#,
        );
        let doc = parse(&ok).unwrap();
        match doc.graph.feature(doc.root).body() {
            FeatureBody::TupleCollection {
                tuple_length,
                tuples,
            } => {
                assert_eq!(*tuple_length, 2);
                assert_eq!(tuples.len(), 2);
            }
            other => panic!("expected tuple collection, got {other:?}"),
        }
    }

    #[test]
    fn test_tuple_collection_rejects_member_reference() {
        let xml = r##"<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs/2.0"
                xmlns:xlink="http://www.w3.org/1999/xlink" xmlns:app="http://example.com/app">
            <wfs:member><wfs:Tuple>
                <wfs:member><app:Road fid="r1"/></wfs:member>
                <wfs:member><app:Owner fid="o1"/></wfs:member>
            </wfs:Tuple></wfs:member>
            <wfs:member xlink:href="#r1"/>
        </wfs:FeatureCollection>"##;
        assert!(matches!(
            parse(xml),
            Err(FeatureError::TupleLength {
                expected: 2,
                actual: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_member_by_reference() {
        let xml = r##"<gml:FeatureCollection xmlns:gml="http://www.opengis.net/gml/3.2"
                xmlns:xlink="http://www.w3.org/1999/xlink">
            <gml:featureMember><Road gml:id="r1"/></gml:featureMember>
            <gml:featureMember xlink:href="#r1"/>
            <gml:featureMembers><Road gml:id="r2"/><Road gml:id="r3"/></gml:featureMembers>
        </gml:FeatureCollection>"##;
        let mut doc = parse(xml).unwrap();
        doc.resolve().unwrap();
        let ids: Vec<String> = doc
            .graph
            .members(doc.root)
            .iter()
            .map(|h| doc.graph.feature_id(*h))
            .collect();
        assert_eq!(ids, vec!["r1", "r2", "r3"]);
    }

    #[test]
    fn test_unknown_collection_child() {
        let xml = r#"<wfs:FeatureCollection xmlns:wfs="http://www.opengis.net/wfs/2.0">
            <wfs:additionalObjects/>
        </wfs:FeatureCollection>"#;
        assert!(matches!(
            parse(xml),
            Err(FeatureError::UnknownProperty { .. })
        ));
    }

    #[test]
    fn test_external_reference_kept() {
        let xml = r#"<app:Road xmlns:app="http://example.com/app"
                xmlns:xlink="http://www.w3.org/1999/xlink" fid="r1">
            <app:owner xlink:href="https://example.com/owners.xml#o1"/>
        </app:Road>"#;
        let mut doc = parse(xml).unwrap();
        doc.resolve().unwrap();
        let road = doc.graph.feature(doc.root);
        assert_eq!(
            road.properties_named(&app("owner")).next().unwrap().value,
            PropertyValue::External("https://example.com/owners.xml#o1".to_string())
        );
    }
}
