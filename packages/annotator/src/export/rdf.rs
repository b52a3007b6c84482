//! Writing the `rdf:RDF` annotation block.

use super::{ExportOptions, Exporter, RdfFormat};
use crate::config::{CNT_NS, CW_NS, OA_NS, RDF_NS, XSD_NS};
use crate::document::Document;
use crate::error::Result;
use crate::jsonld::{
    annotation_type, default_context, specific_resource, JsonLdAnnotation, JsonLdBody, JsonLdSelector, JsonLdTarget,
    FRAGMENT_SELECTOR, TEXT_POSITION_SELECTOR,
};
use crate::offset::Xpointer;
use crate::registry::{certainty_to_uri, KindHandler};
use crate::types::{AnnotationUris, EntityAnnotation, Range, Triple, TripleSide};
use crate::xml::{escape_attribute, escape_text};

const OA_ANNOTATION: &str = "http://www.w3.org/ns/oa#Annotation";
const OA_SPECIFIC_RESOURCE: &str = "http://www.w3.org/ns/oa#SpecificResource";
const OA_FRAGMENT_SELECTOR: &str = "http://www.w3.org/ns/oa#FragmentSelector";
const OA_TEXT_POSITION_SELECTOR: &str = "http://www.w3.org/ns/oa#TextPositionSelector";

/// Selector values of a range, as xpointers.
enum SelectorValue {
    Fragment(String),
    TextPosition { start: String, end: String },
}

impl SelectorValue {
    fn from_range(range: &Range) -> Result<Self> {
        Ok(match range {
            Range::Inline { xpath, .. } => SelectorValue::Fragment(Xpointer::new(xpath.clone(), None)?.to_string()),
            Range::Standoff { start, end } => SelectorValue::TextPosition {
                start: Xpointer::new(start.xpath.clone(), Some(start.offset))?.to_string(),
                end: Xpointer::new(end.xpath.clone(), Some(end.offset))?.to_string(),
            },
        })
    }
}

/// Build the annotation block: the mode statement, one annotation per
/// finalized entity, then the triples.
pub(super) fn write_rdf(exporter: &Exporter<'_>, document: &Document, options: &ExportOptions) -> Result<String> {
    let mut out = format!(
        "<rdf:RDF xmlns:rdf=\"{RDF_NS}\" xmlns:cw=\"{CW_NS}\" xmlns:oa=\"{OA_NS}\" xmlns:cnt=\"{CNT_NS}\" xmlns:xsd=\"{XSD_NS}\">\n"
    );
    out.push_str(&format!(
        "<rdf:Description rdf:about=\"{}\">\n<cw:mode>{}</cw:mode>\n</rdf:Description>\n",
        escape_attribute(&options.document_uri),
        document.mode.marker()
    ));

    let mut written = 0;
    for entity in document.entities() {
        let (Some(uris), Some(range)) = (&entity.annotation.uris, &entity.annotation.range) else {
            tracing::debug!(entity_id = %entity.id, "skipping pending entity in rdf");
            continue;
        };
        let Some(handler) = exporter.kinds.get(entity.kind) else {
            continue;
        };
        let selector = SelectorValue::from_range(range)?;
        match options.rdf_format {
            RdfFormat::Xml => write_annotation(&mut out, handler, entity, uris, &selector),
            RdfFormat::JsonLd => {
                out.push_str(&json_ld(handler, entity, uris, selector).to_description()?);
                out.push('\n');
            }
        }
        written += 1;
    }

    for triple in document.triples() {
        write_triple(&mut out, triple);
    }
    out.push_str("</rdf:RDF>\n");
    tracing::debug!(annotations = written, triples = document.triples().len(), "wrote rdf block");
    Ok(out)
}

fn resource(name: &str, uri: &str) -> String {
    format!("<{name} rdf:resource=\"{}\"/>\n", escape_attribute(uri))
}

fn write_annotation(
    out: &mut String,
    handler: &dyn KindHandler,
    entity: &EntityAnnotation,
    uris: &AnnotationUris,
    selector: &SelectorValue,
) {
    let info = &entity.info;
    let body_uri = handler.body_uri(info, uris);

    out.push_str(&format!("<rdf:Description rdf:about=\"{}\">\n", escape_attribute(&uris.annotation)));
    out.push_str(&resource("oa:hasTarget", &uris.target));
    out.push_str(&resource("oa:hasBody", &body_uri));
    if !uris.user.is_empty() {
        out.push_str(&resource("oa:annotatedBy", &uris.user));
    }
    out.push_str(&resource("oa:motivatedBy", handler.motivation()));
    if let Some(certainty) = &info.certainty {
        out.push_str(&resource("cw:hasCertainty", &certainty_to_uri(certainty)));
    }
    if let Some(lookup) = &info.lookup {
        out.push_str(&format!("<cw:cwrcInfo>{}</cw:cwrcInfo>\n", escape_text(&lookup.to_string())));
    }
    if !info.attributes.is_empty() {
        let attributes = serde_json::Value::Object(info.attributes.clone().into_iter().collect());
        out.push_str(&format!("<cw:cwrcAttributes>{}</cw:cwrcAttributes>\n", escape_text(&attributes.to_string())));
    }
    out.push_str(&resource("rdf:type", OA_ANNOTATION));
    out.push_str("</rdf:Description>\n");

    if let Some(body_type) = handler.body_type() {
        out.push_str(&format!("<rdf:Description rdf:about=\"{}\">\n", escape_attribute(&body_uri)));
        for property in handler.body_properties(&info.details) {
            out.push_str(&format!("<{0}>{1}</{0}>\n", property.name, escape_text(&property.value)));
        }
        out.push_str(&resource("rdf:type", body_type));
        out.push_str("</rdf:Description>\n");
    }

    out.push_str(&format!("<rdf:Description rdf:about=\"{}\">\n", escape_attribute(&uris.target)));
    out.push_str(&resource("oa:hasSource", &uris.document));
    out.push_str(&resource("oa:hasSelector", &uris.selector));
    out.push_str(&resource("rdf:type", OA_SPECIFIC_RESOURCE));
    out.push_str("</rdf:Description>\n");

    out.push_str(&format!("<rdf:Description rdf:about=\"{}\">\n", escape_attribute(&uris.selector)));
    match selector {
        SelectorValue::Fragment(value) => {
            out.push_str(&format!("<rdf:value>{}</rdf:value>\n", escape_text(value)));
            out.push_str(&resource("rdf:type", OA_FRAGMENT_SELECTOR));
        }
        SelectorValue::TextPosition { start, end } => {
            out.push_str(&format!("<oa:start>{}</oa:start>\n", escape_text(start)));
            out.push_str(&format!("<oa:end>{}</oa:end>\n", escape_text(end)));
            out.push_str(&resource("rdf:type", OA_TEXT_POSITION_SELECTOR));
        }
    }
    out.push_str("</rdf:Description>\n");
}

fn json_ld(
    handler: &dyn KindHandler,
    entity: &EntityAnnotation,
    uris: &AnnotationUris,
    selector: SelectorValue,
) -> JsonLdAnnotation {
    let info = &entity.info;
    let (kind, value, start, end) = match selector {
        SelectorValue::Fragment(value) => (FRAGMENT_SELECTOR, Some(value), None, None),
        SelectorValue::TextPosition { start, end } => (TEXT_POSITION_SELECTOR, None, Some(start), Some(end)),
    };
    JsonLdAnnotation {
        context: default_context(),
        id: uris.annotation.clone(),
        kind: annotation_type(),
        motivated_by: Some(handler.motivation().to_string()),
        annotated_by: Some(uris.user.clone()).filter(|user| !user.is_empty()),
        has_body: JsonLdBody {
            id: handler.body_uri(info, uris),
            kind: handler.body_type().map(str::to_string),
        },
        has_target: JsonLdTarget {
            id: uris.target.clone(),
            kind: specific_resource(),
            has_source: uris.document.clone(),
            has_selector: JsonLdSelector {
                id: uris.selector.clone(),
                kind: kind.to_string(),
                value,
                start,
                end,
            },
        },
        cwrc_type: entity.kind,
        cwrc_details: info.details.clone(),
        has_certainty: info.certainty.as_deref().map(certainty_to_uri),
        cwrc_info: info.lookup.clone(),
        cwrc_attributes: info.attributes.clone(),
    }
}

fn side(uri: &str, external: bool) -> String {
    format!("rdf:about=\"{}\" cw:external=\"{external}\"", escape_attribute(uri))
}

fn write_triple(out: &mut String, triple: &Triple) {
    let Triple {
        subject,
        predicate,
        object,
    } = triple;
    let TripleSide { uri, external, .. } = subject;
    out.push_str(&format!("<rdf:Description {}>\n", side(uri, *external)));
    out.push_str(&format!(
        "<cw:{0} cw:text=\"{1}\" cw:external=\"{2}\">\n<rdf:Description {3}/>\n</cw:{0}>\n",
        predicate.name,
        escape_attribute(&predicate.text),
        predicate.external,
        side(&object.uri, object.external)
    ));
    out.push_str("</rdf:Description>\n");
}
