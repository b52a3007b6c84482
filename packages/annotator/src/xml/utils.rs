//! XML utility functions for navigating parsed documents and writing
//! fragments back out.

use roxmltree::Node;

use super::escape::{escape_attribute, escape_text};
use crate::config::XML_NS;

/// Get the tag name without namespace prefix.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use standoff_annotator::xml::get_tag_name;
///
/// let xml = r#"<tei:TEI xmlns:tei="http://www.tei-c.org/ns/1.0"/>"#;
/// let doc = Document::parse(xml).unwrap();
/// assert_eq!(get_tag_name(doc.root_element()), "TEI");
/// ```
pub fn get_tag_name<'a>(node: Node<'a, '_>) -> &'a str {
    node.tag_name().name()
}

/// Get the tag name with its namespace prefix, as written in the source.
pub fn qualified_tag_name(node: Node<'_, '_>) -> String {
    let name = node.tag_name().name();
    match node.tag_name().namespace().and_then(|ns| node.lookup_prefix(ns)) {
        Some(prefix) => format!("{prefix}:{name}"),
        None => name.to_string(),
    }
}

/// Get the attributes of an element as `(qualified name, value)` pairs in
/// document order. Namespace declarations are not included.
pub fn qualified_attributes<'a>(node: Node<'a, '_>) -> Vec<(String, &'a str)> {
    node.attributes()
        .map(|attr| {
            let name = match attr.namespace() {
                Some(XML_NS) => format!("xml:{}", attr.name()),
                Some(ns) => match node.lookup_prefix(ns) {
                    Some(prefix) => format!("{prefix}:{}", attr.name()),
                    None => attr.name().to_string(),
                },
                None => attr.name().to_string(),
            };
            (name, attr.value())
        })
        .collect()
}

/// Find the first child element with the given tag name.
///
/// # Examples
/// ```
/// use roxmltree::Document;
/// use standoff_annotator::xml::find_child;
///
/// let xml = r#"<choice><sic>teh</sic><corr>the</corr></choice>"#;
/// let doc = Document::parse(xml).unwrap();
///
/// assert!(find_child(doc.root_element(), "corr").is_some());
/// assert!(find_child(doc.root_element(), "reg").is_none());
/// ```
pub fn find_child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && get_tag_name(*child) == tag)
}

/// Find all child elements with the given tag name.
pub fn find_children<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |child| child.is_element() && get_tag_name(*child) == tag)
}

/// Find the first child element with the given namespace and local name.
pub fn find_child_ns<'a, 'input>(
    node: Node<'a, 'input>,
    namespace: &str,
    name: &str,
) -> Option<Node<'a, 'input>> {
    node.children().find(|child| child.has_tag_name((namespace, name)))
}

/// Find all child elements with the given namespace and local name.
pub fn find_children_ns<'a, 'input>(
    node: Node<'a, 'input>,
    namespace: &'a str,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |child| child.has_tag_name((namespace, name)))
}

/// Get all element children of a node.
pub fn element_children<'a, 'input>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|child| child.is_element())
}

/// Check if a node has a specific tag name.
pub fn has_tag(node: Node<'_, '_>, tag: &str) -> bool {
    node.is_element() && get_tag_name(node) == tag
}

/// Get the concatenated text of a node and all its descendants.
pub fn get_text(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

/// Serialize a node (element or text) back to XML.
///
/// Namespace declarations are dropped; prefixed names keep their prefix.
pub fn serialize_node(node: Node<'_, '_>) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

/// Serialize the children of a node back to XML.
pub fn inner_xml(node: Node<'_, '_>) -> String {
    let mut out = String::new();
    for child in node.children() {
        write_node(child, &mut out);
    }
    out
}

fn write_node(node: Node<'_, '_>, out: &mut String) {
    if node.is_text() {
        out.push_str(&escape_text(node.text().unwrap_or_default()));
        return;
    }
    if !node.is_element() {
        return;
    }
    let name = qualified_tag_name(node);
    out.push('<');
    out.push_str(&name);
    for (attr, value) in qualified_attributes(node) {
        out.push_str(&format!(" {attr}=\"{}\"", escape_attribute(value)));
    }
    if node.has_children() {
        out.push('>');
        for child in node.children() {
            write_node(child, out);
        }
        out.push_str(&format!("</{name}>"));
    } else {
        out.push_str("/>");
    }
}
