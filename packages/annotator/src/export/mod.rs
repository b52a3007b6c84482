//! XML/RDF exporter.
//!
//! Serializes a [`Document`] and its editable [`Tree`] back into XML, with
//! an optional RDF annotation block embedded after the root start tag or
//! returned separately.
//!
//! Export works on a clone of the tree. Entities that cannot be written as
//! well-formed inline markup (boundary-spanning or overlapping ones) get a
//! standoff range and are unwrapped from the clone; every other entity keeps
//! its inline element, which then is its range.

mod rdf;
mod xml;

use std::collections::HashSet;

use crate::config::{ANNOTATION_ID_ATTR, DEFAULT_BASE_URI, XML_DECLARATION};
use crate::document::Document;
use crate::error::Result;
use crate::offset::{build_anchor, offset_of};
use crate::overlap::{determine_relationships, entity_intervals};
use crate::registry::{create_kind_registry, KindRegistry};
use crate::schema::SchemaMapper;
use crate::tree::{Boundary, NodeId, Tree};
use crate::types::{Range, TextAnchor};

/// Serialization of the annotation block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RdfFormat {
    /// One `rdf:Description` per annotation, body, target and selector.
    #[default]
    Xml,
    /// One JSON-LD literal per annotation.
    JsonLd,
}

/// Export settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub include_rdf: bool,
    /// Return the RDF block next to the XML instead of inside it.
    pub separate_rdf: bool,
    pub rdf_format: RdfFormat,
    /// Subject of the document-level mode statement.
    pub document_uri: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_rdf: true,
            separate_rdf: false,
            rdf_format: RdfFormat::default(),
            document_uri: format!("{DEFAULT_BASE_URI}/document"),
        }
    }
}

impl ExportOptions {
    #[must_use]
    pub fn with_rdf(mut self, include_rdf: bool) -> Self {
        self.include_rdf = include_rdf;
        self
    }

    #[must_use]
    pub fn with_separate_rdf(mut self, separate_rdf: bool) -> Self {
        self.separate_rdf = separate_rdf;
        self
    }

    #[must_use]
    pub fn with_rdf_format(mut self, rdf_format: RdfFormat) -> Self {
        self.rdf_format = rdf_format;
        self
    }

    #[must_use]
    pub fn with_document_uri(mut self, document_uri: impl Into<String>) -> Self {
        self.document_uri = document_uri.into();
        self
    }
}

/// Result of an export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutput {
    Combined(String),
    Separate { xml: String, rdf: String },
}

impl ExportOutput {
    /// The XML document.
    #[must_use]
    pub fn xml(&self) -> &str {
        match self {
            ExportOutput::Combined(xml) | ExportOutput::Separate { xml, .. } => xml,
        }
    }

    /// The separate RDF block, if one was requested.
    #[must_use]
    pub fn rdf(&self) -> Option<&str> {
        match self {
            ExportOutput::Combined(_) => None,
            ExportOutput::Separate { rdf, .. } => Some(rdf),
        }
    }
}

/// Exports documents to annotated XML.
pub struct Exporter<'a> {
    schema: &'a dyn SchemaMapper,
    kinds: KindRegistry,
}

impl<'a> Exporter<'a> {
    #[must_use]
    pub fn new(schema: &'a dyn SchemaMapper) -> Self {
        Self {
            schema,
            kinds: create_kind_registry(),
        }
    }

    /// Export a document.
    ///
    /// Entity ranges are recomputed and stored back into `document`; the
    /// tree itself is left untouched.
    ///
    /// # Errors
    /// Returns an error when a range cannot be written as an xpointer or an
    /// annotation cannot be serialized to JSON.
    pub fn export(&self, document: &mut Document, tree: &Tree, options: &ExportOptions) -> Result<ExportOutput> {
        let mut snapshot = tree.compacted();
        let standoff = self.compute_ranges(document, &mut snapshot);

        let rdf = if options.include_rdf {
            Some(rdf::write_rdf(self, document, options)?)
        } else {
            None
        };
        let embedded = match (&rdf, options.separate_rdf) {
            (Some(rdf), false) => Some(rdf.as_str()),
            _ => None,
        };
        let body = xml::write_xml(self, document, &snapshot, embedded);
        let xml = format!("{XML_DECLARATION}{body}");

        tracing::info!(
            entities = document.entity_count(),
            standoff = standoff,
            triples = document.triples().len(),
            rdf = options.include_rdf,
            "exported document"
        );
        Ok(match rdf {
            Some(rdf) if options.separate_rdf => ExportOutput::Separate { xml, rdf },
            _ => ExportOutput::Combined(xml),
        })
    }

    /// Export with the two flags of the document-level contract.
    ///
    /// # Errors
    /// See [`Exporter::export`].
    pub fn export_document(
        &self,
        document: &mut Document,
        tree: &Tree,
        include_rdf: bool,
        separate_rdf: bool,
    ) -> Result<ExportOutput> {
        let options = ExportOptions::default()
            .with_rdf(include_rdf)
            .with_separate_rdf(separate_rdf);
        self.export(document, tree, &options)
    }

    /// Assign every anchored entity its range and unwrap the standoff ones
    /// from the snapshot. Returns the number of standoff entities.
    fn compute_ranges(&self, document: &mut Document, snapshot: &mut Tree) -> usize {
        let relations = determine_relationships(&entity_intervals(snapshot));
        let overlapping: HashSet<&str> = relations
            .iter()
            .filter(|(_, relations)| !relations.overlaps.is_empty())
            .map(|(id, _)| id.as_str())
            .collect();

        let mut unwrap: Vec<NodeId> = Vec::new();
        for id in document.entity_ids() {
            let fragments = snapshot.entity_fragments(&id);
            let Some((&first, &last)) = fragments.first().zip(fragments.last()) else {
                tracing::debug!(entity_id = %id, "entity has no fragments, keeping its range");
                continue;
            };
            let Some(kind) = document.entity(&id).map(|entity| entity.kind) else {
                continue;
            };
            let single_whole = fragments.len() == 1
                && snapshot
                    .entity_marker(first)
                    .is_some_and(|marker| marker.boundary == Boundary::Whole);

            let range = if single_whole && !overlapping.contains(id.as_str()) {
                let tag = self.schema.tag_name_for_entity_type(kind);
                Range::Inline {
                    node_id: id.clone(),
                    xpath: format!("//{tag}[@{ANNOTATION_ID_ATTR}=\"{id}\"]"),
                }
            } else {
                let Some(range) = standoff_range(snapshot, document, first, last) else {
                    tracing::warn!(entity_id = %id, "no structural ancestor to anchor entity");
                    continue;
                };
                unwrap.extend(fragments);
                range
            };
            if let Some(entity) = document.entity_mut(&id) {
                entity.annotation.range = Some(range);
            }
        }

        let mut standoff = HashSet::new();
        for node in unwrap {
            if let Some(marker) = snapshot.entity_marker(node) {
                standoff.insert(marker.entity_id.clone());
            }
            let is_marker = snapshot.entity_marker(node).is_some_and(|marker| marker.note);
            if is_marker {
                snapshot.detach(node);
            } else if let Err(err) = snapshot.unwrap(node) {
                tracing::warn!(error = %err, "failed to unwrap standoff fragment");
            }
        }
        standoff.len()
    }
}

/// Standoff range from the first to the last fragment of an entity.
fn standoff_range(tree: &mut Tree, document: &mut Document, first: NodeId, last: NodeId) -> Option<Range> {
    let start = build_anchor(tree, first, document)?;
    let start_offset = offset_of(tree, start.node, |_, node| node == first, false)?;
    let end = build_anchor(tree, last, document)?;
    let end_offset = offset_of(tree, end.node, |_, node| node == last, true)?;
    Some(Range::Standoff {
        start: TextAnchor {
            xpath: start.xpath,
            struct_id: start.struct_id,
            offset: start_offset,
        },
        end: TextAnchor {
            xpath: end.xpath,
            struct_id: end.struct_id,
            offset: end_offset,
        },
    })
}
