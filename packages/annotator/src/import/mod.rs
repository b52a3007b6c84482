//! XML/RDF importer.
//!
//! Turns an annotated XML document into a [`Document`] registry and an
//! editable [`Tree`]. Entities come from the embedded `rdf:RDF` block
//! (RDF/XML or JSON-LD annotations) and from elements carrying an
//! `annotationId` attribute.
//!
//! Only a malformed document, a missing root element or a syntactically
//! invalid XPath abort the import. Every other anomaly drops the affected
//! entity and is reported as an [`ImportWarning`].

mod anchor;
mod build;
mod inline;
mod rdf;

use std::collections::HashMap;

use roxmltree::Node;

use crate::config::{ANNOTATION_ID_ATTR, OFFSET_ID_ATTR, RDF_NS};
use crate::document::Document;
use crate::error::{AnnotatorError, Result};
use crate::registry::{create_kind_registry, KindRegistry};
use crate::schema::SchemaMapper;
use crate::tree::Tree;
use crate::types::{EntityKind, Mode, TextAnchor};
use crate::xml::get_tag_name;

/// A per-entity anomaly that did not stop the import.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportWarning {
    #[error("xpointer matched no node: {xpointer}")]
    UnresolvedXpointer { xpointer: String },

    #[error("malformed selector in annotation {annotation}")]
    MalformedSelector { annotation: String },

    #[error("annotation {annotation} has no body")]
    MissingBody { annotation: String },

    #[error("annotation {annotation} has no target")]
    MissingTarget { annotation: String },

    #[error("no entity kind for annotation {annotation}")]
    UnknownKind { annotation: String },

    #[error("invalid JSON in {context}: {reason}")]
    InvalidJson { context: String, reason: String },

    #[error("could not anchor entity {entity_id}: {reason}")]
    AnchoringFailed { entity_id: String, reason: String },

    #[error("element <{tag}> carries an annotation id but maps to no entity kind")]
    UnknownEntityTag { tag: String },

    #[error("synthesized id {id} for {target}")]
    SynthesizedId { target: String, id: String },
}

/// Import settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Treat the document as plain XML even if it embeds an RDF block.
    pub ignore_rdf: bool,
}

/// Result of an import.
#[derive(Debug)]
pub struct Imported {
    pub document: Document,
    pub tree: Tree,
    pub warnings: Vec<ImportWarning>,
}

/// A standoff entity waiting for the tree to exist.
#[derive(Debug, Clone)]
struct PendingStandoff {
    entity_id: String,
    kind: EntityKind,
    start: TextAnchor,
    end: TextAnchor,
}

/// Mutable state shared by the import passes.
///
/// Anchor roles and transient ids are kept in side tables keyed by
/// `roxmltree` node ids, since the parsed document is read-only.
struct ImportContext<'a> {
    schema: &'a dyn SchemaMapper,
    kinds: &'a KindRegistry,
    document: Document,
    warnings: Vec<ImportWarning>,
    /// Elements that anchor an inline entity.
    anchors: HashMap<roxmltree::NodeId, (String, EntityKind)>,
    /// Structure ids of elements addressed by standoff selectors.
    struct_ids: HashMap<roxmltree::NodeId, String>,
    standoff: Vec<PendingStandoff>,
}

impl<'a> ImportContext<'a> {
    fn new(schema: &'a dyn SchemaMapper, kinds: &'a KindRegistry, document: Document) -> Self {
        Self {
            schema,
            kinds,
            document,
            warnings: Vec::new(),
            anchors: HashMap::new(),
            struct_ids: HashMap::new(),
            standoff: Vec::new(),
        }
    }

    fn warn(&mut self, warning: ImportWarning) {
        tracing::warn!(warning = %warning, "skipping during import");
        self.warnings.push(warning);
    }

    /// Advance the id counter past every anchor id in the document.
    fn observe_ids(&mut self, root: Node<'_, '_>) {
        for node in root.descendants().filter(Node::is_element) {
            for attr in [ANNOTATION_ID_ATTR, OFFSET_ID_ATTR] {
                if let Some(id) = node.attribute(attr) {
                    self.document.observe_id(id);
                }
            }
        }
    }

    /// Use an imported id for a new entity unless it is missing or taken.
    fn claim_entity_id(&mut self, candidate: Option<&str>) -> String {
        match candidate.map(str::trim) {
            Some(id)
                if !id.is_empty()
                    && self.document.entity(id).is_none()
                    && self.document.struct_node(id).is_none() =>
            {
                id.to_string()
            }
            _ => self.document.next_entity_id(),
        }
    }

    /// Structure id of an element addressed by a standoff selector.
    fn struct_id_for(&mut self, node: Node<'_, '_>, xpath: &str) -> String {
        if let Some(id) = self.struct_ids.get(&node.id()) {
            return id.clone();
        }
        let id = match node.attribute(OFFSET_ID_ATTR) {
            Some(id) => id.to_string(),
            None => {
                let id = self.document.next_struct_id();
                self.warn(ImportWarning::SynthesizedId {
                    target: xpath.to_string(),
                    id: id.clone(),
                });
                id
            }
        };
        self.struct_ids.insert(node.id(), id.clone());
        id
    }

    fn owns_children(&self, kind: EntityKind) -> bool {
        self.kinds.get(kind).is_some_and(|handler| handler.owns_children())
    }
}

/// Whether a node is the embedded annotation block.
fn is_rdf_block(node: Node<'_, '_>) -> bool {
    node.has_tag_name((RDF_NS, "RDF"))
}

/// Imports annotated XML documents.
pub struct Importer<'a> {
    schema: &'a dyn SchemaMapper,
    kinds: KindRegistry,
    options: ImportOptions,
}

impl<'a> Importer<'a> {
    #[must_use]
    pub fn new(schema: &'a dyn SchemaMapper) -> Self {
        Self {
            schema,
            kinds: create_kind_registry(),
            options: ImportOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ImportOptions) -> Self {
        self.options = options;
        self
    }

    /// Import a document.
    ///
    /// # Arguments
    /// * `xml` - The annotated XML document
    ///
    /// # Returns
    /// The registry, the editable tree and the warnings collected on the way
    ///
    /// # Errors
    /// * `AnnotatorError::XmlParse` if the document is not well-formed
    /// * `AnnotatorError::RootNotFound` if the schema's root element is absent
    /// * `AnnotatorError::XPath` if a selector holds an invalid XPath
    pub fn import(&self, xml: &str) -> Result<Imported> {
        let parsed = roxmltree::Document::parse(xml)?;
        let root_tag = self.schema.root_tag();
        let root = find_root(&parsed, root_tag)
            .ok_or_else(|| AnnotatorError::RootNotFound(root_tag.to_string()))?;

        let rdf_block = if self.options.ignore_rdf {
            None
        } else {
            parsed.descendants().find(|node| is_rdf_block(*node))
        };
        let mode = rdf_block.map_or(Mode::XmlOnly, rdf::read_mode);

        let document = Document::new(get_tag_name(root), mode);
        let mut ctx = ImportContext::new(self.schema, &self.kinds, document);
        ctx.observe_ids(root);

        if let Some(block) = rdf_block {
            rdf::read_annotations(&mut ctx, &parsed, block)?;
        }
        inline::collect_inline_entities(&mut ctx, root);

        let mut tree = build::build_tree(&mut ctx, root);
        anchor::anchor_standoff(&mut ctx, &mut tree);
        anchor::compute_contents(&mut ctx, &tree);

        if let Some(block) = rdf_block {
            rdf::read_triples(&mut ctx, block);
        }

        tracing::info!(
            entities = ctx.document.entity_count(),
            structs = ctx.document.struct_count(),
            triples = ctx.document.triples().len(),
            warnings = ctx.warnings.len(),
            mode = ?mode,
            "imported document"
        );
        Ok(Imported {
            document: ctx.document,
            tree,
            warnings: ctx.warnings,
        })
    }
}

/// The document element, or the first element named like the schema root.
fn find_root<'a, 'input>(doc: &'a roxmltree::Document<'input>, root_tag: &str) -> Option<Node<'a, 'input>> {
    let matches = |node: &Node<'_, '_>| node.is_element() && get_tag_name(*node).eq_ignore_ascii_case(root_tag);
    let root = doc.root_element();
    if matches(&root) {
        return Some(root);
    }
    root.descendants().find(matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tei;
    use crate::types::{KindInfo, Range};
    use pretty_assertions::assert_eq;

    const INLINE: &str = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0">
<text><body>
<p>Letter from <persName annotationId="ent_3" ref="http://viaf.org/viaf/96994048" cert="high">Mary Shelley</persName> dated <date annotationId="ent_4" when="1818-01-01">1 January 1818</date>.</p>
<p>A mistake<note annotationId="ent_5">Editor's <hi>remark</hi></note> and <choice annotationId="ent_6"><sic>teh</sic><corr>the</corr></choice> end.</p>
<p>Cited<note annotationId="ent_7"><bibl>Smith, <title>Works</title></bibl></note> and tagged<note annotationId="ent_8"><term>gothic</term><term>novel</term></note>.</p>
</body></text>
</TEI>"#;

    #[test]
    fn test_inline_entities_without_rdf() {
        let imported = Importer::new(tei()).import(INLINE).unwrap();
        let doc = &imported.document;

        assert_eq!(doc.mode, Mode::XmlOnly);
        assert!(imported.warnings.is_empty(), "{:?}", imported.warnings);
        assert_eq!(doc.entity_count(), 6);

        let person = doc.entity("ent_3").unwrap();
        assert_eq!(person.kind, EntityKind::Person);
        assert_eq!(person.content, "Mary Shelley");
        assert_eq!(person.info.certainty.as_deref(), Some("high"));
        assert_eq!(person.info.lookup_id(), Some("http://viaf.org/viaf/96994048"));
        assert!(!person.is_finalized());
        assert!(matches!(person.annotation.range, Some(Range::Inline { ref node_id, .. }) if node_id == "ent_3"));

        assert_eq!(doc.entity("ent_4").unwrap().info.details, KindInfo::date_from_value("1818-01-01"));

        let note = doc.entity("ent_5").unwrap();
        assert_eq!(note.kind, EntityKind::Note);
        assert_eq!(note.content, "Editor's remark");

        let correction = doc.entity("ent_6").unwrap();
        assert_eq!(correction.kind, EntityKind::Correction);
        assert_eq!(correction.content, "teh");

        assert_eq!(doc.entity("ent_7").unwrap().kind, EntityKind::Citation);
        let keyword = doc.entity("ent_8").unwrap();
        assert_eq!(keyword.kind, EntityKind::Keyword);
        assert_eq!(keyword.content, "gothic, novel");
    }

    #[test]
    fn test_owned_children_are_not_structure() {
        let imported = Importer::new(tei()).import(INLINE).unwrap();
        let tree = &imported.tree;
        let note = tree.entity_fragments("ent_5")[0];
        assert_eq!(tree.text_content(note), "\u{FEFF}");
        assert!(imported.document.structs().all(|s| s.tag_name != "hi" && s.tag_name != "bibl"));
        assert_eq!(tree.entity_text("ent_6"), "teh");
    }

    #[test]
    fn test_generated_ids_do_not_collide() {
        let mut imported = Importer::new(tei()).import(INLINE).unwrap();
        let id = imported.document.next_entity_id();
        assert!(imported.document.entity(&id).is_none());
        assert_ne!(id, "ent_8");
    }

    #[test]
    fn test_huge_imported_id_keeps_ids_fresh() {
        let xml = r#"<TEI><p><persName annotationId="ent_18446744073709551615">Ada</persName> wrote.</p></TEI>"#;
        let mut imported = Importer::new(tei()).import(xml).unwrap();
        let doc = &mut imported.document;
        assert_eq!(doc.entity("ent_18446744073709551615").unwrap().content, "Ada");

        let id = doc.next_entity_id();
        assert!(doc.entity(&id).is_none());
        assert!(doc.struct_node(&id).is_none());
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let result = Importer::new(tei()).import("<html><body/></html>");
        assert!(matches!(result, Err(AnnotatorError::RootNotFound(root)) if root == "TEI"));
    }

    #[test]
    fn test_malformed_xml_is_fatal() {
        assert!(matches!(
            Importer::new(tei()).import("<TEI><p></TEI>"),
            Err(AnnotatorError::XmlParse(_))
        ));
    }

    #[test]
    fn test_unknown_entity_tag_is_structure() {
        let xml = r#"<TEI><p><hi annotationId="ent_1">odd</hi></p></TEI>"#;
        let imported = Importer::new(tei()).import(xml).unwrap();
        assert_eq!(imported.document.entity_count(), 0);
        assert_eq!(
            imported.warnings,
            vec![ImportWarning::UnknownEntityTag { tag: "hi".into() }]
        );
        assert!(imported.document.structs().any(|s| s.tag_name == "hi"));
    }

    #[test]
    fn test_ignore_rdf_option() {
        let xml = r#"<TEI xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns:cw="http://cwrc.ca/ns/cw#">
<rdf:RDF><rdf:Description rdf:about="http://id.cwrc.ca/doc"><cw:mode>1</cw:mode></rdf:Description></rdf:RDF>
<p>x</p></TEI>"#;
        let with_rdf = Importer::new(tei()).import(xml).unwrap();
        assert_eq!(with_rdf.document.mode, Mode::XmlRdf);
        let without = Importer::new(tei())
            .with_options(ImportOptions { ignore_rdf: true })
            .import(xml)
            .unwrap();
        assert_eq!(without.document.mode, Mode::XmlOnly);
    }
}
