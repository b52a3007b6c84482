//! Reading the embedded `rdf:RDF` block.
//!
//! Each child description is one of: a JSON-LD annotation (marked by its
//! `rdf:datatype`), a triple (marked by `cw:external`), an RDF/XML
//! annotation (an `rdf:about` in the annotation namespace, or an
//! `oa:hasTarget` child), or a supporting description (body, target,
//! selector, mode) that is looked up by URI.

use indexmap::IndexMap;
use roxmltree::Node;
use serde_json::Value;

use super::{ImportContext, ImportWarning, PendingStandoff};
use crate::config::{ANNOTATION_ID_ATTR, ANNOTATION_URI_MARKER, CW_NS, JSON_LD_DATATYPE, OA_NS, RDF_NS};
use crate::error::Result;
use crate::jsonld::{JsonLdAnnotation, FRAGMENT_SELECTOR, TEXT_POSITION_SELECTOR};
use crate::offset::{resolve_xpath, Xpointer};
use crate::registry::certainty_from_uri;
use crate::types::{
    AnnotationUris, EntityAnnotation, EntityInfo, EntityKind, Mode, Predicate, Range, TextAnchor, Triple, TripleSide,
};
use crate::xml::{element_children, find_child_ns, find_children_ns, get_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Description {
    JsonLd,
    Triple,
    Annotation,
    Supporting,
}

fn classify(node: Node<'_, '_>) -> Description {
    if node.attribute((RDF_NS, "datatype")) == Some(JSON_LD_DATATYPE) {
        Description::JsonLd
    } else if node.attribute((CW_NS, "external")).is_some() {
        Description::Triple
    } else if node
        .attribute((RDF_NS, "about"))
        .is_some_and(|about| about.contains(ANNOTATION_URI_MARKER))
        || find_child_ns(node, OA_NS, "hasTarget").is_some()
    {
        Description::Annotation
    } else {
        Description::Supporting
    }
}

/// Document mode from the `cw:mode` statement.
///
/// An RDF block without a recognizable statement allows overlap.
pub(super) fn read_mode(block: Node<'_, '_>) -> Mode {
    block
        .descendants()
        .find(|node| node.has_tag_name((CW_NS, "mode")))
        .and_then(|node| node.text())
        .and_then(|text| Mode::from_marker(text.trim()))
        .unwrap_or(Mode::XmlRdf)
}

/// Where an annotation points.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Selector {
    /// One xpointer to the element bearing the annotation.
    Fragment(String),
    /// Start and end xpointers with character offsets.
    TextPosition { start: String, end: String },
}

/// An annotation read from either RDF/XML or JSON-LD.
#[derive(Debug, Clone)]
struct ParsedAnnotation {
    kind: EntityKind,
    info: EntityInfo,
    uris: AnnotationUris,
    selector: Selector,
}

/// Register every annotation of the RDF block.
///
/// # Errors
/// Returns `AnnotatorError::XPath` when a selector holds an invalid XPath.
pub(super) fn read_annotations(
    ctx: &mut ImportContext<'_>,
    doc: &roxmltree::Document<'_>,
    block: Node<'_, '_>,
) -> Result<()> {
    let descriptions: Vec<Node<'_, '_>> = element_children(block).collect();
    for node in &descriptions {
        let parsed = match classify(*node) {
            Description::JsonLd => match JsonLdAnnotation::from_json(&get_text(*node)) {
                Ok(annotation) => from_json_ld(ctx, annotation),
                Err(err) => {
                    ctx.warn(ImportWarning::InvalidJson {
                        context: "JSON-LD annotation".to_string(),
                        reason: err.to_string(),
                    });
                    None
                }
            },
            Description::Annotation => from_rdf_xml(ctx, &descriptions, *node),
            Description::Triple | Description::Supporting => None,
        };
        if let Some(parsed) = parsed {
            register(ctx, doc, parsed)?;
        }
    }
    Ok(())
}

fn about<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    node.attribute((RDF_NS, "about"))
}

/// The `rdf:resource` of the last child with the given name.
fn resource<'a>(node: Node<'a, '_>, namespace: &'a str, name: &'a str) -> Option<&'a str> {
    find_children_ns(node, namespace, name)
        .filter_map(|child| child.attribute((RDF_NS, "resource")))
        .last()
}

fn parse_json<T: serde::de::DeserializeOwned>(ctx: &mut ImportContext<'_>, text: &str, context: &str) -> Option<T> {
    if text.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(text) {
        Ok(value) => Some(value),
        Err(err) => {
            ctx.warn(ImportWarning::InvalidJson {
                context: context.to_string(),
                reason: err.to_string(),
            });
            None
        }
    }
}

fn from_rdf_xml(
    ctx: &mut ImportContext<'_>,
    descriptions: &[Node<'_, '_>],
    node: Node<'_, '_>,
) -> Option<ParsedAnnotation> {
    let kinds = ctx.kinds;
    let by_about = |uri: &str| descriptions.iter().copied().find(|d| about(*d) == Some(uri));
    let annotation = about(node).unwrap_or_default().to_string();

    let Some(body_uri) = resource(node, OA_NS, "hasBody") else {
        ctx.warn(ImportWarning::MissingBody { annotation });
        return None;
    };
    let body = by_about(body_uri);
    let body_type = body.and_then(|body| resource(body, RDF_NS, "type"));
    let motivation = resource(node, OA_NS, "motivatedBy");
    let Some(kind) = kinds.kind_for_annotation(body_type, motivation) else {
        ctx.warn(ImportWarning::UnknownKind { annotation });
        return None;
    };
    let handler = kinds.get(kind)?;

    let target_uri = resource(node, OA_NS, "hasTarget");
    let Some((target_uri, target)) = target_uri.and_then(|uri| by_about(uri).map(|target| (uri, target))) else {
        ctx.warn(ImportWarning::MissingTarget { annotation });
        return None;
    };
    let selector_uri = resource(target, OA_NS, "hasSelector").unwrap_or_default();
    let selector = by_about(selector_uri).and_then(|selector| {
        let is_fragment = resource(selector, RDF_NS, "type").is_some_and(|t| t.contains("FragmentSelector"));
        let text_of = |ns: &str, name: &str| find_child_ns(selector, ns, name).map(get_text);
        if is_fragment {
            text_of(RDF_NS, "value").map(Selector::Fragment)
        } else {
            Some(Selector::TextPosition {
                start: text_of(OA_NS, "start")?,
                end: text_of(OA_NS, "end")?,
            })
        }
    });
    let Some(selector) = selector else {
        ctx.warn(ImportWarning::MalformedSelector { annotation });
        return None;
    };

    let mut info = EntityInfo::new(handler.details_from_body(body, body_uri));
    info.certainty = resource(node, CW_NS, "hasCertainty").and_then(certainty_from_uri);
    let lookup_text = find_child_ns(node, CW_NS, "cwrcInfo").map(get_text).unwrap_or_default();
    info.lookup = parse_json::<Value>(ctx, &lookup_text, "cwrcInfo");
    let attributes_text = find_child_ns(node, CW_NS, "cwrcAttributes").map(get_text).unwrap_or_default();
    info.attributes = parse_json::<IndexMap<String, Value>>(ctx, &attributes_text, "cwrcAttributes").unwrap_or_default();

    Some(ParsedAnnotation {
        kind,
        info,
        uris: AnnotationUris {
            entity: body_uri.to_string(),
            annotation,
            document: resource(target, OA_NS, "hasSource").unwrap_or_default().to_string(),
            target: target_uri.to_string(),
            selector: selector_uri.to_string(),
            user: resource(node, OA_NS, "annotatedBy").unwrap_or_default().to_string(),
        },
        selector,
    })
}

fn from_json_ld(ctx: &mut ImportContext<'_>, annotation: JsonLdAnnotation) -> Option<ParsedAnnotation> {
    let selector = annotation.has_target.has_selector;
    let parsed = match selector.kind.as_str() {
        FRAGMENT_SELECTOR => selector.value.map(Selector::Fragment),
        TEXT_POSITION_SELECTOR => selector
            .start
            .zip(selector.end)
            .map(|(start, end)| Selector::TextPosition { start, end }),
        _ => None,
    };
    let Some(parsed) = parsed else {
        ctx.warn(ImportWarning::MalformedSelector {
            annotation: annotation.id,
        });
        return None;
    };

    let certainty = annotation.has_certainty.and_then(|certainty| {
        if certainty.contains('#') {
            certainty_from_uri(&certainty)
        } else {
            Some(certainty)
        }
    });
    Some(ParsedAnnotation {
        kind: annotation.cwrc_type,
        info: EntityInfo {
            certainty,
            lookup: annotation.cwrc_info,
            attributes: annotation.cwrc_attributes,
            details: annotation.cwrc_details,
        },
        uris: AnnotationUris {
            entity: annotation.has_body.id,
            annotation: annotation.id,
            document: annotation.has_target.has_source,
            target: annotation.has_target.id,
            selector: selector.id,
            user: annotation.annotated_by.unwrap_or_default(),
        },
        selector: parsed,
    })
}

/// A parsed xpointer and the element it addresses.
fn resolve<'a, 'input>(
    ctx: &mut ImportContext<'_>,
    doc: &'a roxmltree::Document<'input>,
    value: &str,
    annotation: &str,
) -> Result<Option<(Xpointer, Node<'a, 'input>)>> {
    let Ok(pointer) = Xpointer::parse(value) else {
        ctx.warn(ImportWarning::MalformedSelector {
            annotation: annotation.to_string(),
        });
        return Ok(None);
    };
    match resolve_xpath(doc, &pointer.xpath)? {
        Some(node) => Ok(Some((pointer, node))),
        None => {
            ctx.warn(ImportWarning::UnresolvedXpointer {
                xpointer: value.to_string(),
            });
            Ok(None)
        }
    }
}

fn register(ctx: &mut ImportContext<'_>, doc: &roxmltree::Document<'_>, parsed: ParsedAnnotation) -> Result<()> {
    let ParsedAnnotation {
        kind,
        mut info,
        uris,
        selector,
    } = parsed;

    let (id, range) = match selector {
        Selector::Fragment(value) => {
            let Some((pointer, node)) = resolve(ctx, doc, &value, &uris.annotation)? else {
                return Ok(());
            };
            if ctx.anchors.contains_key(&node.id()) {
                ctx.warn(ImportWarning::AnchoringFailed {
                    entity_id: uris.annotation.clone(),
                    reason: format!("{} already anchors another annotation", pointer.xpath),
                });
                return Ok(());
            }
            let declared = node.attribute(ANNOTATION_ID_ATTR);
            let id = ctx.claim_entity_id(declared);
            if declared.is_none() {
                ctx.warn(ImportWarning::SynthesizedId {
                    target: pointer.xpath.clone(),
                    id: id.clone(),
                });
            }
            if ctx.owns_children(kind) {
                let kinds = ctx.kinds;
                if let Some(handler) = kinds.get(kind) {
                    info.details = handler.info_from_element(node, ctx.schema).details;
                }
            }
            ctx.anchors.insert(node.id(), (id.clone(), kind));
            let range = Range::Inline {
                node_id: id.clone(),
                xpath: pointer.xpath,
            };
            (id, range)
        }
        Selector::TextPosition { start, end } => {
            let Some((start_pointer, start_node)) = resolve(ctx, doc, &start, &uris.annotation)? else {
                return Ok(());
            };
            let Some((end_pointer, end_node)) = resolve(ctx, doc, &end, &uris.annotation)? else {
                return Ok(());
            };
            let start = TextAnchor {
                struct_id: ctx.struct_id_for(start_node, &start_pointer.xpath),
                offset: start_pointer.offset.unwrap_or(0),
                xpath: start_pointer.xpath,
            };
            let end = TextAnchor {
                struct_id: ctx.struct_id_for(end_node, &end_pointer.xpath),
                offset: end_pointer.offset.unwrap_or(0),
                xpath: end_pointer.xpath,
            };
            let id = ctx.document.next_entity_id();
            ctx.standoff.push(PendingStandoff {
                entity_id: id.clone(),
                kind,
                start: start.clone(),
                end: end.clone(),
            });
            (id, Range::Standoff { start, end })
        }
    };

    let mut entity = EntityAnnotation::new(id.clone(), kind).with_info(info);
    entity.annotation.uris = Some(uris);
    entity.annotation.range = Some(range);
    tracing::debug!(entity_id = %id, kind = %kind.as_str(), "registered annotation");
    ctx.document.insert_entity(entity);
    Ok(())
}

/// Register the triples of the RDF block.
///
/// A side that is not external must name the annotation URI of a
/// registered entity; triples with a dangling side are dropped.
pub(super) fn read_triples(ctx: &mut ImportContext<'_>, block: Node<'_, '_>) {
    for node in element_children(block).filter(|node| classify(*node) == Description::Triple) {
        let Some(triple) = parse_triple(ctx, node) else {
            tracing::debug!(subject = about(node).unwrap_or_default(), "dropping dangling triple");
            continue;
        };
        ctx.document.add_triple(triple);
    }
}

fn is_external(node: Node<'_, '_>) -> bool {
    node.attribute((CW_NS, "external")) == Some("true")
}

fn triple_side(ctx: &ImportContext<'_>, node: Node<'_, '_>) -> Option<TripleSide> {
    let uri = about(node)?.to_string();
    let external = is_external(node);
    let text = if external {
        uri.clone()
    } else {
        ctx.document.entity_by_annotation_uri(&uri)?.title.clone()
    };
    Some(TripleSide { uri, text, external })
}

fn parse_triple(ctx: &ImportContext<'_>, node: Node<'_, '_>) -> Option<Triple> {
    let predicate = element_children(node).next()?;
    let object = element_children(predicate).find(|child| child.has_tag_name((RDF_NS, "Description")))?;
    Some(Triple {
        subject: triple_side(ctx, node)?,
        predicate: Predicate {
            name: predicate.tag_name().name().to_string(),
            text: predicate.attribute((CW_NS, "text")).unwrap_or_default().to_string(),
            external: is_external(predicate),
        },
        object: triple_side(ctx, object)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::Importer;
    use crate::schema::tei;
    use crate::types::KindInfo;
    use pretty_assertions::assert_eq;

    const RDF_XML: &str = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0" xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns:cw="http://cwrc.ca/ns/cw#" xmlns:oa="http://www.w3.org/ns/oa#" xmlns:cnt="http://www.w3.org/2011/content#" xmlns:xsd="http://www.w3.org/2001/XMLSchema#">
<rdf:RDF>
<rdf:Description rdf:about="http://id.cwrc.ca/doc/1"><cw:mode>0</cw:mode></rdf:Description>
<rdf:Description rdf:about="http://id.cwrc.ca/annotation/1">
  <oa:hasBody rdf:resource="http://id.cwrc.ca/date/1"/>
  <oa:hasTarget rdf:resource="http://id.cwrc.ca/target/1"/>
  <oa:annotatedBy rdf:resource="http://id.cwrc.ca/user/1"/>
  <oa:motivatedBy rdf:resource="http://www.w3.org/ns/oa#tagging"/>
  <cw:hasCertainty rdf:resource="http://cwrc.ca/ns/cw#reasonable"/>
  <cw:cwrcAttributes>{"calendar": "gregorian"}</cw:cwrcAttributes>
  <rdf:type rdf:resource="http://www.w3.org/ns/oa#Annotation"/>
</rdf:Description>
<rdf:Description rdf:about="http://id.cwrc.ca/date/1">
  <xsd:date>1818/1819</xsd:date>
  <rdf:type rdf:resource="http://www.w3.org/2006/time#TemporalEntity"/>
</rdf:Description>
<rdf:Description rdf:about="http://id.cwrc.ca/target/1">
  <oa:hasSource rdf:resource="http://id.cwrc.ca/doc/1"/>
  <oa:hasSelector rdf:resource="http://id.cwrc.ca/selector/1"/>
  <rdf:type rdf:resource="http://www.w3.org/ns/oa#SpecificResource"/>
</rdf:Description>
<rdf:Description rdf:about="http://id.cwrc.ca/selector/1">
  <oa:start>xpointer(string-range(//p[@offsetId="struct_9"],"",15))</oa:start>
  <oa:end>xpointer(string-range(//p[@offsetId="struct_9"],"",24))</oa:end>
  <rdf:type rdf:resource="http://www.w3.org/ns/oa#TextPositionSelector"/>
</rdf:Description>
<rdf:Description rdf:about="http://id.cwrc.ca/annotation/2">
  <oa:hasBody rdf:resource="http://id.cwrc.ca/person/2"/>
  <oa:hasTarget rdf:resource="http://id.cwrc.ca/target/2"/>
  <oa:motivatedBy rdf:resource="http://www.w3.org/ns/oa#identifying"/>
</rdf:Description>
<rdf:Description rdf:about="http://id.cwrc.ca/person/2">
  <rdf:type rdf:resource="http://xmlns.com/foaf/0.1/Person"/>
</rdf:Description>
<rdf:Description rdf:about="http://id.cwrc.ca/target/2">
  <oa:hasSource rdf:resource="http://id.cwrc.ca/doc/1"/>
  <oa:hasSelector rdf:resource="http://id.cwrc.ca/selector/2"/>
</rdf:Description>
<rdf:Description rdf:about="http://id.cwrc.ca/selector/2">
  <rdf:value>xpointer(//persName[@annotationId="ent_2"])</rdf:value>
  <rdf:type rdf:resource="http://www.w3.org/ns/oa#FragmentSelector"/>
</rdf:Description>
<rdf:Description rdf:about="http://id.cwrc.ca/annotation/2" cw:external="false">
  <cw:wrote cw:text="wrote about" cw:external="false">
    <rdf:Description rdf:about="http://id.cwrc.ca/annotation/1" cw:external="false"/>
  </cw:wrote>
</rdf:Description>
<rdf:Description rdf:about="http://id.cwrc.ca/annotation/2" cw:external="false">
  <cw:knew cw:text="knew" cw:external="false">
    <rdf:Description rdf:about="http://id.cwrc.ca/annotation/404" cw:external="false"/>
  </cw:knew>
</rdf:Description>
</rdf:RDF>
<text><body><p offsetId="struct_9"><persName annotationId="ent_2">Percy</persName> wrote in 1818-1819.</p></body></text>
</TEI>"#;

    #[test]
    fn test_rdf_xml_annotations() {
        let imported = Importer::new(tei()).import(RDF_XML).unwrap();
        let doc = &imported.document;
        assert!(imported.warnings.is_empty(), "{:?}", imported.warnings);
        assert_eq!(doc.mode, Mode::XmlOnly);
        assert_eq!(doc.entity_count(), 2);

        let person = doc.entity("ent_2").unwrap();
        assert_eq!(person.kind, EntityKind::Person);
        assert_eq!(person.content, "Percy");
        assert!(person.is_finalized());

        let date = doc
            .entities()
            .find(|entity| entity.kind == EntityKind::Date)
            .unwrap();
        assert_eq!(date.content, "1818-1819");
        assert_eq!(date.info.details, KindInfo::date_from_value("1818/1819"));
        assert_eq!(date.info.certainty.as_deref(), Some("reasonably certain"));
        assert_eq!(date.info.attributes.get("calendar"), Some(&Value::from("gregorian")));
        let uris = date.annotation.uris.as_ref().unwrap();
        assert_eq!(uris.user, "http://id.cwrc.ca/user/1");
        assert_eq!(uris.document, "http://id.cwrc.ca/doc/1");
        assert!(date.annotation.range.as_ref().is_some_and(Range::is_standoff));
        assert_eq!(imported.tree.entity_text(&date.id), "1818-1819");
    }

    #[test]
    fn test_dangling_triples_are_dropped() {
        let imported = Importer::new(tei()).import(RDF_XML).unwrap();
        let triples = imported.document.triples();
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].predicate.name, "wrote");
        assert_eq!(triples[0].subject.text, "Percy");
        assert_eq!(triples[0].object.text, "1818-1819");
    }

    #[test]
    fn test_json_ld_annotation() {
        let xml = r#"<TEI xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns:cw="http://cwrc.ca/ns/cw#">
<rdf:RDF>
<rdf:Description rdf:about="http://id.cwrc.ca/doc"><cw:mode>1</cw:mode></rdf:Description>
<rdf:Description rdf:datatype="http://www.w3.org/TR/json-ld/"><![CDATA[{
  "@id": "http://id.cwrc.ca/annotation/5",
  "hasBody": {"@id": "http://id.cwrc.ca/place/5"},
  "hasTarget": {
    "@id": "http://id.cwrc.ca/target/5",
    "hasSource": "http://id.cwrc.ca/doc",
    "hasSelector": {"@id": "http://id.cwrc.ca/selector/5", "@type": "oa:FragmentSelector", "rdf:value": "xpointer(//placeName[@annotationId=\"ent_1\"])"}
  },
  "cwrcType": "place",
  "hasCertainty": "http://cwrc.ca/ns/cw#definite"
}]]></rdf:Description>
<rdf:Description rdf:datatype="http://www.w3.org/TR/json-ld/"><![CDATA[{ not json ]]></rdf:Description>
</rdf:RDF>
<p>From <placeName annotationId="ent_1">Geneva</placeName></p>
</TEI>"#;
        let imported = Importer::new(tei()).import(xml).unwrap();
        assert_eq!(imported.document.mode, Mode::XmlRdf);
        let place = imported.document.entity("ent_1").unwrap();
        assert_eq!(place.kind, EntityKind::Place);
        assert_eq!(place.content, "Geneva");
        assert_eq!(place.info.certainty.as_deref(), Some("definite"));
        assert_eq!(place.annotation.uris.as_ref().unwrap().entity, "http://id.cwrc.ca/place/5");
        assert!(matches!(imported.warnings.as_slice(), [ImportWarning::InvalidJson { .. }]));
    }

    #[test]
    fn test_unresolved_xpointer_is_a_warning() {
        let xml = r#"<TEI xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"><rdf:RDF>
<rdf:Description rdf:datatype="http://www.w3.org/TR/json-ld/">{"@id": "a", "hasBody": {"@id": "b"}, "hasTarget": {"@id": "t", "hasSource": "d", "hasSelector": {"@id": "s", "@type": "oa:FragmentSelector", "rdf:value": "xpointer(//persName[@annotationId=\"ent_9\"])"}}, "cwrcType": "person"}</rdf:Description>
</rdf:RDF><p>nobody</p></TEI>"#;
        let imported = Importer::new(tei()).import(xml).unwrap();
        assert_eq!(imported.document.entity_count(), 0);
        assert!(matches!(
            imported.warnings.as_slice(),
            [ImportWarning::UnresolvedXpointer { .. }]
        ));
    }

    #[test]
    fn test_invalid_xpath_is_fatal() {
        let xml = r#"<TEI xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"><rdf:RDF>
<rdf:Description rdf:datatype="http://www.w3.org/TR/json-ld/">{"@id": "a", "hasBody": {"@id": "b"}, "hasTarget": {"@id": "t", "hasSource": "d", "hasSelector": {"@id": "s", "@type": "oa:FragmentSelector", "rdf:value": "xpointer(//p[@=])"}}, "cwrcType": "person"}</rdf:Description>
</rdf:RDF><p>x</p></TEI>"#;
        assert!(matches!(
            Importer::new(tei()).import(xml),
            Err(crate::error::AnnotatorError::XPath { .. })
        ));
    }

    #[test]
    fn test_missing_body_is_a_warning() {
        let xml = r#"<TEI xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns:oa="http://www.w3.org/ns/oa#"><rdf:RDF>
<rdf:Description rdf:about="http://id.cwrc.ca/annotation/3"><oa:hasTarget rdf:resource="t"/></rdf:Description>
</rdf:RDF><p>x</p></TEI>"#;
        let imported = Importer::new(tei()).import(xml).unwrap();
        assert_eq!(
            imported.warnings,
            vec![ImportWarning::MissingBody {
                annotation: "http://id.cwrc.ca/annotation/3".into()
            }]
        );
    }
}
