//! Tree serialization.

use super::Exporter;
use crate::config::{is_reserved_attribute, ANNOTATION_ID_ATTR, INVISIBLE_MARKER, OFFSET_ID_ATTR};
use crate::document::Document;
use crate::registry::entity_attributes;
use crate::tree::{Element, NodeId, Tree};
use crate::xml::{escape_attribute, normalize_text};

/// Serialize the document root of `tree`, embedding `rdf` right after the
/// root start tag.
pub(super) fn write_xml(exporter: &Exporter<'_>, document: &Document, tree: &Tree, rdf: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(root) = tree.root_element() {
        let writer = XmlWriter { exporter, document, tree };
        writer.write_element(root, true, rdf, &mut out);
    }
    out
}

struct XmlWriter<'w, 'a> {
    exporter: &'w Exporter<'a>,
    document: &'w Document,
    tree: &'w Tree,
}

impl XmlWriter<'_, '_> {
    fn write_node(&self, node: NodeId, out: &mut String) {
        if let Some(text) = self.tree.text(node) {
            let visible: String = text.chars().filter(|&c| c != INVISIBLE_MARKER).collect();
            out.push_str(&normalize_text(&visible));
        } else if self.tree.element(node).is_some() {
            self.write_element(node, false, None, out);
        }
    }

    fn write_children(&self, node: NodeId, out: &mut String) {
        for &child in self.tree.children(node) {
            self.write_node(child, out);
        }
    }

    fn write_element(&self, node: NodeId, is_root: bool, rdf: Option<&str>, out: &mut String) {
        let Some(element) = self.tree.element(node) else {
            return;
        };
        if let Some(marker) = &element.entity {
            self.write_entity(node, &marker.entity_id, out);
            return;
        }
        let Some(tag) = &element.tag else {
            self.write_children(node, out);
            return;
        };

        let mut inner = String::new();
        if let Some(rdf) = rdf {
            inner.push_str(rdf);
        }
        self.write_children(node, &mut inner);

        out.push('<');
        out.push_str(tag);
        if is_root {
            for (name, uri) in self.exporter.schema.root_namespaces() {
                if !element.attributes.contains_key(name) {
                    out.push_str(&format!(" {name}=\"{}\"", escape_attribute(uri)));
                }
            }
        }
        out.push_str(&attributes(element));
        if inner.is_empty() {
            out.push_str("/>");
        } else {
            out.push('>');
            out.push_str(&inner);
            out.push_str(&format!("</{tag}>"));
        }
    }

    /// Registered markup of an inline entity; unknown entities leave only
    /// their content behind.
    fn write_entity(&self, node: NodeId, entity_id: &str, out: &mut String) {
        let mut inner = String::new();
        self.write_children(node, &mut inner);
        let entity = self.document.entity(entity_id);
        let handler = entity.and_then(|entity| self.exporter.kinds.get(entity.kind));
        match (entity, handler) {
            (Some(entity), Some(handler)) => {
                let attributes = entity_attributes(handler, entity, ANNOTATION_ID_ATTR);
                out.push_str(&handler.render(entity, self.exporter.schema, &attributes, &inner));
            }
            _ => {
                tracing::debug!(entity_id = %entity_id, "writing fragment of unregistered entity as text");
                out.push_str(&inner);
            }
        }
    }
}

/// The anchor id, if any, followed by the user attributes.
fn attributes(element: &Element) -> String {
    let mut out = String::new();
    if let Some(offset_id) = element.attributes.get(OFFSET_ID_ATTR) {
        out.push_str(&format!(" {OFFSET_ID_ATTR}=\"{}\"", escape_attribute(offset_id)));
    }
    for (name, value) in &element.attributes {
        if !is_reserved_attribute(name) {
            out.push_str(&format!(" {name}=\"{}\"", escape_attribute(value)));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tei;
    use crate::tree::{Boundary, EntityMarker};
    use crate::types::{EntityAnnotation, EntityKind, KindInfo, Mode};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reserved_attributes_are_skipped() {
        let mut element = Element::structural("p", "struct_1");
        element.attributes.insert("_tag".into(), "p".into());
        element.attributes.insert("rend".into(), "a\"b".into());
        element.attributes.insert("class".into(), "x".into());
        element.attributes.insert(OFFSET_ID_ATTR.into(), "struct_1".into());
        assert_eq!(attributes(&element), " offsetId=\"struct_1\" rend=\"a&quot;b\"");
    }

    #[test]
    fn test_empty_elements_and_markers() {
        let mut document = Document::new("TEI", Mode::XmlOnly);
        let mut note = EntityAnnotation::new("ent_3", EntityKind::Note);
        note.info.details = KindInfo::Note {
            content: "see <hi>here</hi> &amp; there".into(),
        };
        document.insert_entity(note);
        let mut tree = Tree::new();
        let body = tree.body();
        let root = tree.append_element(body, Element::structural("TEI", "struct_1"));
        let lb = tree.append_element(root, Element::structural("lb", "struct_2"));
        tree.append_text(lb, "\u{FEFF}");
        let mut marker = EntityMarker::new("ent_3", EntityKind::Note, Boundary::Whole);
        marker.note = true;
        let fragment = tree.append_element(root, Element::fragment(marker));
        tree.append_text(fragment, "\u{FEFF}");

        let exporter = Exporter::new(tei());
        let xml = write_xml(&exporter, &document, &tree, Some("<rdf:RDF/>"));
        assert_eq!(
            xml,
            "<TEI xmlns=\"http://www.tei-c.org/ns/1.0\" xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\" xmlns:cw=\"http://cwrc.ca/ns/cw#\"><rdf:RDF/><lb/><note annotationId=\"ent_3\">see <hi>here</hi> &amp; there</note></TEI>"
        );
    }
}
