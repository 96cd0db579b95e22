//! XML utility functions for navigating namespaced DOM trees.

use roxmltree::Node;

use crate::config::{is_gml_namespace, GML31_NS, GML_NS, XLINK_NS};
use crate::schema::QName;

/// Get the tag name without namespace prefix.
///
/// # Arguments
/// * `node` - XML node
///
/// # Returns
/// Local tag name (e.g., "Road" for `<app:Road>`)
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use featuregraph::xml::get_tag_name;
///
/// let xml = r#"<app:Road xmlns:app="http://example.com/app"/>"#;
/// let doc = Document::parse(xml).unwrap();
/// assert_eq!(get_tag_name(doc.root_element()), "Road");
/// ```
pub fn get_tag_name<'a>(node: Node<'a, '_>) -> &'a str {
    node.tag_name().name()
}

/// Get the namespace-qualified name of an element.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use featuregraph::xml::qualified_name;
///
/// let xml = r#"<app:Road xmlns:app="http://example.com/app"/>"#;
/// let doc = Document::parse(xml).unwrap();
/// let name = qualified_name(doc.root_element());
/// assert_eq!(name.namespace(), "http://example.com/app");
/// assert_eq!(name.local_name(), "Road");
/// ```
pub fn qualified_name(node: Node<'_, '_>) -> QName {
    let tag = node.tag_name();
    QName::new(tag.namespace().unwrap_or_default(), tag.name())
}

/// Check whether an element is in one of the GML namespaces with the given
/// local name.
pub fn is_gml_element(node: Node<'_, '_>, local: &str) -> bool {
    node.is_element()
        && get_tag_name(node) == local
        && node.tag_name().namespace().is_some_and(is_gml_namespace)
}

/// Find the first child element in a GML namespace with the given local name.
///
/// # Arguments
/// * `node` - Parent node to search in
/// * `local` - Local name to search for
///
/// # Returns
/// First matching child element, or `None` if not found
pub fn find_gml_child<'a, 'input>(
    node: Node<'a, 'input>,
    local: &str,
) -> Option<Node<'a, 'input>> {
    node.children().find(|child| is_gml_element(*child, local))
}

/// Find all child elements in a GML namespace with the given local name.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use featuregraph::xml::find_gml_children;
///
/// let xml = r#"<gml:Polygon xmlns:gml="http://www.opengis.net/gml/3.2">
///     <gml:interior/><gml:exterior/><gml:interior/>
/// </gml:Polygon>"#;
/// let doc = Document::parse(xml).unwrap();
/// assert_eq!(find_gml_children(doc.root_element(), "interior").count(), 2);
/// ```
pub fn find_gml_children<'a, 'input>(
    node: Node<'a, 'input>,
    local: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |child| is_gml_element(*child, local))
}

/// Get all element children of a node.
///
/// # Arguments
/// * `node` - Parent node
///
/// # Returns
/// Iterator over element children (excludes text nodes, comments, etc.)
pub fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|child| child.is_element())
}

/// Get the text content of a node.
///
/// All direct text and CDATA children are joined, so text split by a
/// comment is kept whole. Whitespace is preserved; callers parsing numbers
/// or dates trim themselves.
///
/// # Arguments
/// * `node` - Node to get text from
///
/// # Returns
/// Text content, or empty string if no text
pub fn get_text(node: Node<'_, '_>) -> String {
    node.children()
        .filter(|child| child.is_text())
        .filter_map(|child| child.text())
        .collect()
}

/// Get the `xlink:href` attribute of an element.
pub fn get_href<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    node.attribute((XLINK_NS, "href"))
}

/// Get the GML id of an element.
///
/// Looks for `gml:id` in the GML 3.2 namespace, then GML 3.1, then the
/// legacy unqualified `fid` attribute.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use featuregraph::xml::get_feature_id;
///
/// let xml = r#"<Road xmlns:gml="http://www.opengis.net/gml/3.2" gml:id="r1"/>"#;
/// let doc = Document::parse(xml).unwrap();
/// assert_eq!(get_feature_id(doc.root_element()), Some("r1"));
///
/// let legacy = Document::parse(r#"<Road fid="r2"/>"#).unwrap();
/// assert_eq!(get_feature_id(legacy.root_element()), Some("r2"));
/// ```
pub fn get_feature_id<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    node.attribute((GML_NS, "id"))
        .or_else(|| node.attribute((GML31_NS, "id")))
        .or_else(|| node.attribute("fid"))
        .filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    #[test]
    fn test_get_tag_name_with_namespace() {
        let xml = r#"<ns:root xmlns:ns="http://example.com"><ns:child/></ns:root>"#;
        let doc = Document::parse(xml).unwrap();
        assert_eq!(get_tag_name(doc.root_element()), "root");
    }

    #[test]
    fn test_qualified_name_unqualified() {
        let doc = Document::parse("<root/>").unwrap();
        let name = qualified_name(doc.root_element());
        assert_eq!(name.namespace(), "");
        assert_eq!(name.local_name(), "root");
    }

    #[test]
    fn test_find_gml_child_accepts_both_namespaces() {
        let xml = r#"<root xmlns:a="http://www.opengis.net/gml/3.2"
                           xmlns:b="http://www.opengis.net/gml">
            <b:exterior/><a:interior/><other/>
        </root>"#;
        let doc = Document::parse(xml).unwrap();
        let root = doc.root_element();

        assert!(find_gml_child(root, "exterior").is_some());
        assert!(find_gml_child(root, "interior").is_some());
        assert!(find_gml_child(root, "other").is_none());
    }

    #[test]
    fn test_get_text_keeps_whitespace() {
        let xml = r#"<root>  Main St  </root>"#;
        let doc = Document::parse(xml).unwrap();
        assert_eq!(get_text(doc.root_element()), "  Main St  ");
    }

    #[test]
    fn test_get_text_joins_around_comments_and_cdata() {
        let xml = r#"<root>Main<!-- split --> St<![CDATA[ & co]]></root>"#;
        let doc = Document::parse(xml).unwrap();
        assert_eq!(get_text(doc.root_element()), "Main St & co");
    }

    #[test]
    fn test_get_feature_id_empty_is_absent() {
        let xml = r#"<Road xmlns:gml="http://www.opengis.net/gml/3.2" gml:id=""/>"#;
        let doc = Document::parse(xml).unwrap();
        assert_eq!(get_feature_id(doc.root_element()), None);
    }

    #[test]
    fn test_get_href() {
        let xml = r##"<p xmlns:xlink="http://www.w3.org/1999/xlink" xlink:href="#r1"/>"##;
        let doc = Document::parse(xml).unwrap();
        assert_eq!(get_href(doc.root_element()), Some("#r1"));

        let plain = Document::parse(r##"<p href="#r1"/>"##).unwrap();
        assert_eq!(get_href(plain.root_element()), None);
    }

    #[test]
    fn test_get_feature_id_gml31() {
        let xml = r#"<Road xmlns:gml="http://www.opengis.net/gml" gml:id="old" fid="legacy"/>"#;
        let doc = Document::parse(xml).unwrap();
        assert_eq!(get_feature_id(doc.root_element()), Some("old"));
    }

    #[test]
    fn test_element_children() {
        let xml = r#"<root>text<child1/>more<child2/></root>"#;
        let doc = Document::parse(xml).unwrap();
        let children: Vec<_> = element_children(doc.root_element()).collect();
        assert_eq!(children.len(), 2);
    }
}
