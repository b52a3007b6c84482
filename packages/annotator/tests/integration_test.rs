//! End-to-end tests for the annotator.
//!
//! Imports the fixture documents, edits them through the tagger and
//! checks that export and re-import preserve the registry.

use std::fs;
use std::path::Path;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use standoff_annotator::overlap::entity_intervals;
use standoff_annotator::schema::tei;
use standoff_annotator::tree::{Boundary, NodeId};
use standoff_annotator::types::AnnotationUris;
use standoff_annotator::{
    determine_relationships, AnnotatorError, Document, EntityAnnotation, EntityInfo, EntityKind, ExportOptions,
    Exporter, IdentifierResolver, Importer, Interval, Mode, Position, Range, SequentialResolver, Tagger, TextRange,
    Tree,
};

/// Load fixture file content.
fn load_fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to load {}: {}", path.display(), e))
}

/// Route engine logs to the test output (respects RUST_LOG).
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// The text node with exactly this content.
fn text_node(tree: &Tree, content: &str) -> NodeId {
    tree.all_nodes()
        .into_iter()
        .find(|&node| tree.text(node) == Some(content))
        .unwrap_or_else(|| panic!("no text node {content:?}"))
}

fn uris_for(id: &str) -> AnnotationUris {
    AnnotationUris {
        entity: format!("http://id.cwrc.ca/entity/{id}"),
        annotation: format!("http://id.cwrc.ca/annotation/{id}"),
        document: "http://id.cwrc.ca/doc/1".to_string(),
        target: format!("http://id.cwrc.ca/target/{id}"),
        selector: format!("http://id.cwrc.ca/selector/{id}"),
        user: "http://id.cwrc.ca/user/1".to_string(),
    }
}

fn finalize_all(tagger: &mut Tagger<'_>, document: &mut Document) {
    for id in document.entity_ids() {
        tagger.finalize_entity(document, &id, uris_for(&id)).unwrap();
    }
}

// =============================================================================
// Import
// =============================================================================

#[test]
fn test_inline_fixture_import() {
    init_tracing();
    let imported = Importer::new(tei()).import(&load_fixture("tei_inline.xml")).unwrap();
    let doc = &imported.document;

    assert!(imported.warnings.is_empty(), "{:?}", imported.warnings);
    assert_eq!(doc.mode, Mode::XmlOnly);
    assert_eq!(doc.root_tag, "TEI");
    assert_eq!(doc.entity_count(), 10);

    let kinds: Vec<EntityKind> = (1..=10)
        .map(|n| doc.entity(&format!("ent_{n}")).unwrap().kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            EntityKind::Person,
            EntityKind::Place,
            EntityKind::Organization,
            EntityKind::Title,
            EntityKind::Date,
            EntityKind::Note,
            EntityKind::Correction,
            EntityKind::Link,
            EntityKind::Citation,
            EntityKind::Keyword,
        ]
    );

    assert_eq!(doc.entity("ent_1").unwrap().content, "Mary Shelley");
    assert_eq!(doc.entity("ent_6").unwrap().content, "Compare the journal entry.");
    assert_eq!(doc.entity("ent_10").unwrap().content, "gothic, travel");
    assert!(doc.entities().all(|entity| !entity.is_finalized()));

    // The header title has no annotation id and stays structure.
    assert!(doc.structs().any(|node| node.tag_name == "title"));
}

#[test]
fn test_spanning_standoff_entity() {
    let imported = Importer::new(tei()).import(&load_fixture("tei_rdf.xml")).unwrap();
    let doc = &imported.document;
    let tree = &imported.tree;

    assert!(imported.warnings.is_empty(), "{:?}", imported.warnings);
    assert_eq!(doc.mode, Mode::XmlRdf);
    assert_eq!(doc.entity_count(), 2);

    let person = doc.entities().find(|e| e.kind == EntityKind::Person).unwrap();
    assert_eq!(person.content, "Mary Wollstonecraft Godwin");
    assert_eq!(person.info.lookup_id(), Some("http://viaf.org/viaf/34464"));
    assert_eq!(person.info.certainty.as_deref(), Some("definite"));
    assert!(person.annotation.range.as_ref().is_some_and(Range::is_standoff));

    let boundaries: Vec<Boundary> = tree
        .entity_fragments(&person.id)
        .into_iter()
        .map(|node| tree.entity_marker(node).unwrap().boundary)
        .collect();
    assert_eq!(boundaries, vec![Boundary::Start, Boundary::Middle, Boundary::End]);

    let org = doc.entities().find(|e| e.kind == EntityKind::Organization).unwrap();
    assert_eq!(org.content, "Wollstonecraft");

    let relations = determine_relationships(&entity_intervals(tree));
    assert_eq!(relations[&person.id].contains, vec![org.id.clone()]);
    assert!(relations[&person.id].overlaps.is_empty());
    assert!(relations[&org.id].contains.is_empty());
}

#[test]
fn test_fixture_triples() {
    let imported = Importer::new(tei()).import(&load_fixture("tei_rdf.xml")).unwrap();
    let doc = &imported.document;
    let person = doc.entities().find(|e| e.kind == EntityKind::Person).unwrap();
    let triples = doc.triples();
    assert_eq!(triples.len(), 2);

    assert_eq!(triples[0].predicate.name, "memberOf");
    assert_eq!(triples[0].subject.text, person.title);
    assert_eq!(triples[0].object.text, "Wollstonecraft");
    assert!(!triples[0].object.external);

    assert_eq!(triples[1].predicate.text, "same as");
    assert!(triples[1].predicate.external);
    assert!(triples[1].object.external);
    assert_eq!(triples[1].object.text, "http://dbpedia.org/resource/Mary_Wollstonecraft");
}

#[test]
fn test_overlap_classification() {
    let intervals = vec![
        Interval::new("A", 0, 10),
        Interval::new("B", 5, 10),
        Interval::new("C", 2, 3),
    ];
    let relations = determine_relationships(&intervals);
    assert_eq!(relations["A"].contains, vec!["C".to_string()]);
    assert_eq!(relations["A"].overlaps, vec!["B".to_string()]);
    assert_eq!(relations["B"].overlaps, vec!["A".to_string()]);
    assert!(relations["C"].contains.is_empty());
    assert!(relations["C"].overlaps.is_empty());
}

// =============================================================================
// Tagging
// =============================================================================

#[test]
fn test_mode_controls_overlapping_selections() {
    let mut imported = Importer::new(tei()).import(&load_fixture("tei_inline.xml")).unwrap();
    let (doc, tree) = (&mut imported.document, &mut imported.tree);
    let mut tagger = Tagger::new(tei());

    // From inside "Mary Shelley" to the text after it.
    let range = TextRange::new(
        Position::new(text_node(tree, "Mary Shelley"), 5),
        Position::new(text_node(tree, " at "), 2),
    );
    let err = tagger
        .add_entity(doc, tree, EntityKind::Person, range, EntityInfo::default())
        .unwrap_err();
    assert!(matches!(err, AnnotatorError::OverlapNotAllowed));
    assert_eq!(doc.entity_count(), 10);

    doc.mode = Mode::XmlRdf;
    let id = tagger
        .add_entity(doc, tree, EntityKind::Person, range, EntityInfo::default())
        .unwrap();
    assert_eq!(tree.entity_fragments(&id).len(), 2);

    finalize_all(&mut tagger, doc);
    let output = Exporter::new(tei())
        .export(doc, tree, &ExportOptions::default().with_separate_rdf(true))
        .unwrap();
    assert!(doc.entity(&id).unwrap().annotation.range.as_ref().is_some_and(Range::is_standoff));
    let rdf = output.rdf().unwrap();
    assert!(rdf.contains("<cw:mode>1</cw:mode>"));
    assert!(rdf.contains("oa:TextPositionSelector"));
}

#[test]
fn test_mode_statement_gates_overlap() {
    let with_overlap = load_fixture("tei_rdf.xml");
    let without_overlap = with_overlap.replace("<cw:mode>1</cw:mode>", "<cw:mode>0</cw:mode>");
    let importer = Importer::new(tei());

    for (xml, mode) in [(without_overlap, Mode::XmlOnly), (with_overlap, Mode::XmlRdf)] {
        let mut imported = importer.import(&xml).unwrap();
        let (doc, tree) = (&mut imported.document, &mut imported.tree);
        assert_eq!(doc.mode, mode);

        // From plain paragraph text into the first fragment of the spanning person.
        let range = TextRange::new(
            Position::new(text_node(tree, "The author "), 4),
            Position::new(text_node(tree, "Mary "), 2),
        );
        let result = Tagger::new(tei()).add_entity(doc, tree, EntityKind::Title, range, EntityInfo::default());
        match mode {
            Mode::XmlOnly => assert!(matches!(result, Err(AnnotatorError::OverlapNotAllowed))),
            Mode::XmlRdf => assert!(result.is_ok()),
        }
    }
}

#[test]
fn test_raw_paste_duplicate_gets_fresh_id() {
    let mut imported = Importer::new(tei()).import(&load_fixture("tei_inline.xml")).unwrap();
    let (doc, tree) = (&mut imported.document, &mut imported.tree);
    let mut tagger = Tagger::new(tei());
    tagger.finalize_entity(doc, "ent_5", uris_for("ent_5")).unwrap();

    let fragment = tree.entity_fragments("ent_5")[0];
    let paragraph = tree.parent(fragment).unwrap();
    let element = tree.element(fragment).unwrap().clone();
    let copy = tree.append_element(paragraph, element);
    tree.append_text(copy, "16 June 1816");

    assert!(tagger.content_pasted(doc, tree));
    assert_eq!(tree.entity_fragments("ent_5").len(), 1);
    assert_eq!(doc.entity_count(), 11);

    let new_id = tree.entity_marker(copy).unwrap().entity_id.clone();
    assert_ne!(new_id, "ent_5");
    let original = doc.entity("ent_5").unwrap();
    let clone = doc.entity(&new_id).unwrap();
    assert_eq!(clone.info, original.info);
    assert!(original.is_finalized());
    assert!(!clone.is_finalized());

    assert!(!tagger.content_pasted(doc, tree));
}

#[test]
fn test_copy_and_paste_entity() {
    let mut imported = Importer::new(tei()).import(&load_fixture("tei_inline.xml")).unwrap();
    let (doc, tree) = (&mut imported.document, &mut imported.tree);
    let mut tagger = Tagger::new(tei());

    let paragraph = tree.parent(text_node(tree, "Written by ")).unwrap();
    let struct_id = tree.element(paragraph).unwrap().id.clone().unwrap();
    assert!(matches!(
        tagger.copy_entity(doc, &struct_id),
        Err(AnnotatorError::CannotCopyStructure(_))
    ));

    tagger.copy_entity(doc, "ent_2").unwrap();
    let at = Position::new(text_node(tree, "Written by "), 0);
    let id = tagger.paste_entity(doc, tree, at).unwrap();
    assert_ne!(id, "ent_2");

    let pasted = doc.entity(&id).unwrap();
    assert_eq!(pasted.kind, EntityKind::Place);
    assert_eq!(pasted.content, "Geneva");
    assert!(!pasted.is_finalized());
    assert_eq!(tree.entity_text(&id), "Geneva");
}

// =============================================================================
// Identifier resolution and round trip
// =============================================================================

#[tokio::test]
async fn test_round_trip_through_rdf() {
    init_tracing();
    let importer = Importer::new(tei());
    let mut imported = importer.import(&load_fixture("tei_inline.xml")).unwrap();
    let mut tagger = Tagger::new(tei());
    let resolver = SequentialResolver::default();
    let cancel = CancellationToken::new();
    for id in imported.document.entity_ids() {
        tagger
            .resolve_and_finalize(&mut imported.document, &resolver, &id, &cancel)
            .await
            .unwrap();
    }
    let person = imported.document.entity("ent_1").unwrap();
    assert_eq!(
        person.annotation.uris.as_ref().unwrap().entity,
        "http://viaf.org/viaf/96994048"
    );

    let output = Exporter::new(tei())
        .export(&mut imported.document, &imported.tree, &ExportOptions::default())
        .unwrap();
    assert!(output.rdf().is_none());
    assert!(output.xml().starts_with("<?xml"));

    let again = importer.import(output.xml()).unwrap();
    assert!(again.warnings.is_empty(), "{:?}", again.warnings);
    assert_eq!(again.document.mode, Mode::XmlOnly);
    assert_eq!(again.document.entity_count(), imported.document.entity_count());
    for original in imported.document.entities() {
        let copy = again.document.entity(&original.id).unwrap();
        assert_eq!(copy.kind, original.kind, "{}", original.id);
        assert_eq!(copy.info, original.info, "{}", original.id);
        assert_eq!(copy.content, original.content, "{}", original.id);
        let annotation_uri = |entity: &EntityAnnotation| entity.annotation.uris.as_ref().map(|uris| uris.annotation.clone());
        assert_eq!(annotation_uri(copy), annotation_uri(original), "{}", original.id);
    }
}

#[test]
fn test_structure_spanning_entity_survives_round_trip() {
    init_tracing();
    let importer = Importer::new(tei());
    let mut imported = importer.import(&load_fixture("tei_inline.xml")).unwrap();
    let (doc, tree) = (&mut imported.document, &mut imported.tree);
    assert_eq!(doc.mode, Mode::XmlOnly);
    let mut tagger = Tagger::new(tei());

    // From "the" in the first paragraph to "She" in the second.
    let range = TextRange::new(
        Position::new(text_node(tree, " for the "), 5),
        Position::new(text_node(tree, "She read "), 3),
    );
    let info = EntityInfo::default()
        .with_certainty("definite")
        .with_lookup(serde_json::json!({"id": "http://viaf.org/viaf/1", "name": "Society reader"}));
    let id = tagger.add_entity(doc, tree, EntityKind::Person, range, info).unwrap();
    let roles: Vec<Boundary> = tree
        .entity_fragments(&id)
        .iter()
        .map(|&node| tree.entity_marker(node).unwrap().boundary)
        .collect();
    assert_eq!(roles.first(), Some(&Boundary::Start));
    assert_eq!(roles.last(), Some(&Boundary::End));
    let text = tree.entity_text(&id);

    finalize_all(&mut tagger, doc);
    let output = Exporter::new(tei())
        .export(doc, tree, &ExportOptions::default())
        .unwrap();
    let original = doc.entity(&id).unwrap();
    assert!(original.annotation.range.as_ref().is_some_and(Range::is_standoff));
    assert!(!output.xml().contains(&format!("annotationId=\"{id}\"")));

    let again = importer.import(output.xml()).unwrap();
    assert!(again.warnings.is_empty(), "{:?}", again.warnings);
    assert_eq!(again.document.mode, Mode::XmlOnly);
    let annotation = &original.annotation.uris.as_ref().unwrap().annotation;
    let copy = again.document.entity_by_annotation_uri(annotation).unwrap();
    assert_eq!(copy.kind, EntityKind::Person);
    assert_eq!(copy.info, original.info);
    assert_eq!(copy.content, original.content);
    assert_eq!(again.tree.entity_text(&copy.id), text);
    assert_eq!(again.document.entity("ent_3").unwrap().content, "Royal Society");
}

#[test]
fn test_standoff_fixture_round_trip() {
    let importer = Importer::new(tei());
    let imported = importer.import(&load_fixture("tei_rdf.xml")).unwrap();
    let mut document = imported.document.clone();
    let output = Exporter::new(tei())
        .export(&mut document, &imported.tree, &ExportOptions::default())
        .unwrap();

    let again = importer.import(output.xml()).unwrap();
    assert!(again.warnings.is_empty(), "{:?}", again.warnings);
    assert_eq!(again.document.mode, Mode::XmlRdf);
    assert_eq!(again.document.entity_count(), imported.document.entity_count());
    assert_eq!(again.document.triples().len(), imported.document.triples().len());
    for original in imported.document.entities() {
        let annotation = &original.annotation.uris.as_ref().unwrap().annotation;
        let copy = again.document.entity_by_annotation_uri(annotation).unwrap();
        assert_eq!(copy.kind, original.kind, "{annotation}");
        assert_eq!(copy.info, original.info, "{annotation}");
        assert_eq!(copy.content, original.content, "{annotation}");
        assert_eq!(
            again.tree.entity_text(&copy.id),
            imported.tree.entity_text(&original.id),
            "{annotation}"
        );
    }
    let person = again.document.entity_by_annotation_uri("http://id.cwrc.ca/annotation/1").unwrap();
    assert!(person.annotation.range.as_ref().is_some_and(Range::is_standoff));
    assert_eq!(person.content, "Mary Wollstonecraft Godwin");
}

/// Resolver whose user lookup always fails.
struct FailingResolver;

#[async_trait]
impl IdentifierResolver for FailingResolver {
    async fn entity_uri(&self, _entity: &EntityAnnotation) -> standoff_annotator::Result<String> {
        Ok("http://id.cwrc.ca/person/1".to_string())
    }

    async fn annotation_uri(&self, _entity: &EntityAnnotation) -> standoff_annotator::Result<String> {
        Ok("http://id.cwrc.ca/annotation/1".to_string())
    }

    async fn document_uri(&self, _entity: &EntityAnnotation) -> standoff_annotator::Result<String> {
        Ok("http://id.cwrc.ca/doc/1".to_string())
    }

    async fn target_uri(&self, _entity: &EntityAnnotation) -> standoff_annotator::Result<String> {
        Ok("http://id.cwrc.ca/target/1".to_string())
    }

    async fn selector_uri(&self, _entity: &EntityAnnotation) -> standoff_annotator::Result<String> {
        Ok("http://id.cwrc.ca/selector/1".to_string())
    }

    async fn user_uri(&self, _entity: &EntityAnnotation) -> standoff_annotator::Result<String> {
        Err(AnnotatorError::UnknownId("user".to_string()))
    }
}

#[tokio::test]
async fn test_failed_resolution_leaves_entity_pending() {
    let mut imported = Importer::new(tei()).import(&load_fixture("tei_inline.xml")).unwrap();
    let mut tagger = Tagger::new(tei());
    let cancel = CancellationToken::new();

    let err = tagger
        .resolve_and_finalize(&mut imported.document, &FailingResolver, "ent_2", &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, AnnotatorError::Resolution { ref entity_id, .. } if entity_id == "ent_2"));
    assert!(!imported.document.entity("ent_2").unwrap().is_finalized());

    cancel.cancel();
    let err = tagger
        .resolve_and_finalize(&mut imported.document, &SequentialResolver::default(), "ent_3", &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, AnnotatorError::ResolutionCancelled(_)));
    assert!(!imported.document.entity("ent_3").unwrap().is_finalized());
}
