//! Handlers for kinds that wrap the selected text.

use roxmltree::Node;
use serde_json::json;

use super::{
    DCTERMS_BIBLIOGRAPHIC_RESOURCE, FOAF_ORGANIZATION, FOAF_PERSON, GEO_SPATIAL_THING, OA_EDITING, OA_IDENTIFYING,
    OA_LINKING, OA_TAGGING, TIME_TEMPORAL_ENTITY,
};
use crate::config::{CNT_NS, CW_NS, XSD_NS};
use crate::registry::core::CONTENT_AS_TEXT;
use crate::registry::handler::{base_info, body_texts, BodyProperty, KindHandler};
use crate::schema::SchemaMapper;
use crate::types::{AnnotationUris, EntityAnnotation, EntityInfo, EntityKind, KindInfo};
use crate::xml::{escape_text, find_child, get_text};

const REF_ATTR: &str = "ref";

/// Handler for person, organization and place names.
///
/// The identifier picked in a lookup is written as `ref` and read back as
/// the lookup blob.
pub struct NamedHandler {
    kind: EntityKind,
}

impl NamedHandler {
    #[must_use]
    pub fn new(kind: EntityKind) -> Self {
        Self { kind }
    }
}

impl KindHandler for NamedHandler {
    fn kind(&self) -> EntityKind {
        self.kind
    }

    fn body_type(&self) -> Option<&'static str> {
        match self.kind {
            EntityKind::Person => Some(FOAF_PERSON),
            EntityKind::Organization => Some(FOAF_ORGANIZATION),
            _ => Some(GEO_SPATIAL_THING),
        }
    }

    fn motivation(&self) -> &'static str {
        OA_IDENTIFYING
    }

    fn info_from_element(&self, node: Node<'_, '_>, _schema: &dyn SchemaMapper) -> EntityInfo {
        let mut info = base_info(node, &[REF_ATTR]);
        if let Some(reference) = node.attribute(REF_ATTR) {
            info.lookup = Some(json!({ "id": reference }));
        }
        info
    }

    fn element_attributes(&self, info: &EntityInfo) -> Vec<(String, String)> {
        info.lookup_id()
            .map(|id| vec![(REF_ATTR.to_string(), id.to_string())])
            .unwrap_or_default()
    }
}

/// Handler for titles of works. The bibliographic level maps to
/// `cw:pubType` in RDF and `level` inline.
pub struct TitleHandler;

impl KindHandler for TitleHandler {
    fn kind(&self) -> EntityKind {
        EntityKind::Title
    }

    fn body_type(&self) -> Option<&'static str> {
        Some(DCTERMS_BIBLIOGRAPHIC_RESOURCE)
    }

    fn motivation(&self) -> &'static str {
        OA_IDENTIFYING
    }

    fn details_from_body(&self, body: Option<Node<'_, '_>>, _body_uri: &str) -> KindInfo {
        KindInfo::Title {
            level: body_texts(body, CW_NS, "pubType").into_iter().next(),
        }
    }

    fn body_properties(&self, details: &KindInfo) -> Vec<BodyProperty> {
        match details {
            KindInfo::Title { level: Some(level) } => vec![BodyProperty::new("cw:pubType", level.clone())],
            _ => Vec::new(),
        }
    }

    fn info_from_element(&self, node: Node<'_, '_>, _schema: &dyn SchemaMapper) -> EntityInfo {
        let mut info = base_info(node, &["level"]);
        info.details = KindInfo::Title {
            level: node.attribute("level").map(str::to_string),
        };
        info
    }

    fn element_attributes(&self, info: &EntityInfo) -> Vec<(String, String)> {
        match &info.details {
            KindInfo::Title { level: Some(level) } => vec![("level".to_string(), level.clone())],
            _ => Vec::new(),
        }
    }
}

/// Handler for dates and date intervals.
pub struct DateHandler;

/// `xsd:date` value of date details, `start/end` for intervals.
fn date_value(details: &KindInfo) -> Option<String> {
    match details {
        KindInfo::Date { date: Some(date), .. } => Some(date.clone()),
        KindInfo::Date {
            start: Some(start),
            end: Some(end),
            ..
        } => Some(format!("{start}/{end}")),
        _ => None,
    }
}

impl KindHandler for DateHandler {
    fn kind(&self) -> EntityKind {
        EntityKind::Date
    }

    fn body_type(&self) -> Option<&'static str> {
        Some(TIME_TEMPORAL_ENTITY)
    }

    fn motivation(&self) -> &'static str {
        OA_TAGGING
    }

    fn details_from_body(&self, body: Option<Node<'_, '_>>, _body_uri: &str) -> KindInfo {
        match body_texts(body, XSD_NS, "date").first() {
            Some(value) => KindInfo::date_from_value(value),
            None => KindInfo::Date {
                date: None,
                start: None,
                end: None,
            },
        }
    }

    fn body_properties(&self, details: &KindInfo) -> Vec<BodyProperty> {
        date_value(details)
            .map(|value| vec![BodyProperty::new("xsd:date", value)])
            .unwrap_or_default()
    }

    fn info_from_element(&self, node: Node<'_, '_>, _schema: &dyn SchemaMapper) -> EntityInfo {
        let mut info = base_info(node, &["when", "from", "to"]);
        info.details = match node.attribute("when") {
            Some(when) => KindInfo::date_from_value(when),
            None => KindInfo::Date {
                date: None,
                start: node.attribute("from").map(str::to_string),
                end: node.attribute("to").map(str::to_string),
            },
        };
        info
    }

    fn element_attributes(&self, info: &EntityInfo) -> Vec<(String, String)> {
        match &info.details {
            KindInfo::Date { date: Some(date), .. } => vec![("when".to_string(), date.clone())],
            KindInfo::Date { start, end, .. } => start
                .iter()
                .map(|start| ("from".to_string(), start.clone()))
                .chain(end.iter().map(|end| ("to".to_string(), end.clone())))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Handler for editorial corrections.
///
/// The wrapped text is the original reading; the corrected reading is
/// rendered next to it inside the correction element.
pub struct CorrectionHandler;

impl KindHandler for CorrectionHandler {
    fn kind(&self) -> EntityKind {
        EntityKind::Correction
    }

    fn body_type(&self) -> Option<&'static str> {
        Some(CONTENT_AS_TEXT)
    }

    fn motivation(&self) -> &'static str {
        OA_EDITING
    }

    fn owns_children(&self) -> bool {
        true
    }

    fn details_from_body(&self, body: Option<Node<'_, '_>>, _body_uri: &str) -> KindInfo {
        KindInfo::Correction {
            corrected: body_texts(body, CNT_NS, "chars").into_iter().next().unwrap_or_default(),
            original: None,
        }
    }

    fn body_properties(&self, details: &KindInfo) -> Vec<BodyProperty> {
        match details {
            KindInfo::Correction { corrected, .. } => vec![BodyProperty::new("cnt:chars", corrected.clone())],
            _ => Vec::new(),
        }
    }

    fn info_from_element(&self, node: Node<'_, '_>, schema: &dyn SchemaMapper) -> EntityInfo {
        let mut info = base_info(node, &[]);
        let corrected = schema
            .child_tag_for(EntityKind::Correction)
            .and_then(|tag| find_child(node, tag))
            .map(get_text)
            .unwrap_or_default();
        let original = schema
            .text_tag_for(EntityKind::Correction)
            .and_then(|tag| find_child(node, tag))
            .map(get_text);
        info.details = KindInfo::Correction { corrected, original };
        info
    }

    fn render(&self, entity: &EntityAnnotation, schema: &dyn SchemaMapper, attributes: &str, inner: &str) -> String {
        let tag = schema.tag_name_for_entity_type(EntityKind::Correction);
        let text_tag = schema.text_tag_for(EntityKind::Correction).unwrap_or("sic");
        let child_tag = schema.child_tag_for(EntityKind::Correction).unwrap_or("corr");
        let corrected = match &entity.info.details {
            KindInfo::Correction { corrected, .. } => escape_text(corrected),
            _ => String::new(),
        };
        format!("<{tag}{attributes}><{text_tag}>{inner}</{text_tag}><{child_tag}>{corrected}</{child_tag}></{tag}>")
    }
}

/// Handler for links to external resources. The link target is the
/// annotation body itself, so there is no body description.
pub struct LinkHandler;

impl KindHandler for LinkHandler {
    fn kind(&self) -> EntityKind {
        EntityKind::Link
    }

    fn body_type(&self) -> Option<&'static str> {
        None
    }

    fn motivation(&self) -> &'static str {
        OA_LINKING
    }

    fn body_uri(&self, info: &EntityInfo, uris: &AnnotationUris) -> String {
        match &info.details {
            KindInfo::Link { url } if !url.is_empty() => url.clone(),
            _ => uris.entity.clone(),
        }
    }

    fn details_from_body(&self, _body: Option<Node<'_, '_>>, body_uri: &str) -> KindInfo {
        KindInfo::Link {
            url: body_uri.to_string(),
        }
    }

    fn info_from_element(&self, node: Node<'_, '_>, _schema: &dyn SchemaMapper) -> EntityInfo {
        let mut info = base_info(node, &["target"]);
        info.details = KindInfo::Link {
            url: node.attribute("target").unwrap_or_default().to_string(),
        };
        info
    }

    fn element_attributes(&self, info: &EntityInfo) -> Vec<(String, String)> {
        match &info.details {
            KindInfo::Link { url } => vec![("target".to_string(), url.clone())],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tei;
    use pretty_assertions::assert_eq;
    use roxmltree::Document;

    #[test]
    fn test_named_reads_ref_as_lookup() {
        let doc = Document::parse(r#"<persName ref="http://viaf.org/42" cert="high">Ada</persName>"#).unwrap();
        let info = NamedHandler::new(EntityKind::Person).info_from_element(doc.root_element(), tei());
        assert_eq!(info.lookup_id(), Some("http://viaf.org/42"));
        assert_eq!(info.certainty.as_deref(), Some("high"));
        assert!(info.attributes.is_empty());
        assert_eq!(
            NamedHandler::new(EntityKind::Person).element_attributes(&info),
            vec![("ref".to_string(), "http://viaf.org/42".to_string())]
        );
    }

    #[test]
    fn test_named_body_types() {
        assert_eq!(NamedHandler::new(EntityKind::Place).body_type(), Some(GEO_SPATIAL_THING));
        assert_eq!(NamedHandler::new(EntityKind::Organization).body_type(), Some(FOAF_ORGANIZATION));
    }

    #[test]
    fn test_date_interval_from_attributes() {
        let doc = Document::parse(r#"<date from="1850" to="1860">the fifties</date>"#).unwrap();
        let info = DateHandler.info_from_element(doc.root_element(), tei());
        assert_eq!(
            info.details,
            KindInfo::Date {
                date: None,
                start: Some("1850".into()),
                end: Some("1860".into()),
            }
        );
        assert_eq!(
            DateHandler.body_properties(&info.details),
            vec![BodyProperty::new("xsd:date", "1850/1860")]
        );
    }

    #[test]
    fn test_date_from_body() {
        let xml = r#"<rdf:Description xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
            xmlns:xsd="http://www.w3.org/2001/XMLSchema#"><xsd:date>1901-02-03</xsd:date></rdf:Description>"#;
        let doc = Document::parse(xml).unwrap();
        assert_eq!(
            DateHandler.details_from_body(Some(doc.root_element()), "http://id.cwrc.ca/date/1"),
            KindInfo::date_from_value("1901-02-03")
        );
    }

    #[test]
    fn test_title_level() {
        let doc = Document::parse(r#"<title level="m">Frankenstein</title>"#).unwrap();
        let info = TitleHandler.info_from_element(doc.root_element(), tei());
        assert_eq!(info.details, KindInfo::Title { level: Some("m".into()) });
        assert_eq!(
            TitleHandler.body_properties(&info.details),
            vec![BodyProperty::new("cw:pubType", "m")]
        );
    }

    #[test]
    fn test_correction_render_and_read() {
        let doc = Document::parse(r#"<choice><sic>teh</sic><corr>the</corr></choice>"#).unwrap();
        let info = CorrectionHandler.info_from_element(doc.root_element(), tei());
        assert_eq!(
            info.details,
            KindInfo::Correction {
                corrected: "the".into(),
                original: Some("teh".into()),
            }
        );

        let entity = EntityAnnotation::new("ent_3", EntityKind::Correction).with_info(info);
        let xml = CorrectionHandler.render(&entity, tei(), " annotationId=\"ent_3\"", "teh");
        assert_eq!(xml, r#"<choice annotationId="ent_3"><sic>teh</sic><corr>the</corr></choice>"#);
    }

    #[test]
    fn test_link_body_is_the_url() {
        let doc = Document::parse(r#"<ref target="http://example.org/">here</ref>"#).unwrap();
        let info = LinkHandler.info_from_element(doc.root_element(), tei());
        let uris = AnnotationUris {
            entity: "http://id.cwrc.ca/link/1".into(),
            ..Default::default()
        };
        assert_eq!(LinkHandler.body_uri(&info, &uris), "http://example.org/");
        assert_eq!(LinkHandler.body_uri(&EntityInfo::default(), &uris), "http://id.cwrc.ca/link/1");
        assert_eq!(
            LinkHandler.details_from_body(None, "http://example.org/"),
            KindInfo::Link {
                url: "http://example.org/".into()
            }
        );
    }
}
