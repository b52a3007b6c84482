//! Handlers for kinds that own their content.
//!
//! These entities sit in the text as a collapsed marker. Their content is
//! held in [`KindInfo`] and rendered into the element on export.

use roxmltree::Node;

use super::{CW_CITING, OA_CLASSIFYING, OA_COMMENTING};
use crate::config::CNT_NS;
use crate::registry::core::CONTENT_AS_TEXT;
use crate::registry::handler::{base_info, body_texts, markup_or_escaped, BodyProperty, Containment, KindHandler};
use crate::schema::SchemaMapper;
use crate::text::fragment_text;
use crate::types::{EntityAnnotation, EntityInfo, EntityKind, KindInfo};
use crate::xml::{escape_text, find_child, find_children, get_text, inner_xml, serialize_node};

/// Handler for free-text notes.
pub struct NoteHandler;

impl KindHandler for NoteHandler {
    fn kind(&self) -> EntityKind {
        EntityKind::Note
    }

    fn containment(&self) -> Containment {
        Containment::Marker
    }

    fn body_type(&self) -> Option<&'static str> {
        Some(CONTENT_AS_TEXT)
    }

    fn motivation(&self) -> &'static str {
        OA_COMMENTING
    }

    fn details_from_body(&self, body: Option<Node<'_, '_>>, _body_uri: &str) -> KindInfo {
        KindInfo::Note {
            content: escape_text(&body_texts(body, CNT_NS, "chars").concat()),
        }
    }

    fn body_properties(&self, details: &KindInfo) -> Vec<BodyProperty> {
        match details {
            KindInfo::Note { content } => vec![BodyProperty::new("cnt:chars", fragment_text(content))],
            _ => Vec::new(),
        }
    }

    fn info_from_element(&self, node: Node<'_, '_>, _schema: &dyn SchemaMapper) -> EntityInfo {
        let mut info = base_info(node, &[]);
        info.details = KindInfo::Note {
            content: inner_xml(node),
        };
        info
    }

    fn render(&self, entity: &EntityAnnotation, schema: &dyn SchemaMapper, attributes: &str, _inner: &str) -> String {
        let tag = schema.tag_name_for_entity_type(EntityKind::Note);
        let content = match &entity.info.details {
            KindInfo::Note { content } => markup_or_escaped(content),
            _ => String::new(),
        };
        format!("<{tag}{attributes}>{content}</{tag}>")
    }

    fn content(&self, details: &KindInfo, _wrapped_text: &str) -> String {
        match details {
            KindInfo::Note { content } => fragment_text(content).trim().to_string(),
            _ => String::new(),
        }
    }
}

/// Handler for bibliographic citations. The owned content is a single
/// bibliographic element inside the note.
pub struct CitationHandler;

impl KindHandler for CitationHandler {
    fn kind(&self) -> EntityKind {
        EntityKind::Citation
    }

    fn containment(&self) -> Containment {
        Containment::Marker
    }

    fn body_type(&self) -> Option<&'static str> {
        Some(CONTENT_AS_TEXT)
    }

    fn motivation(&self) -> &'static str {
        CW_CITING
    }

    fn details_from_body(&self, body: Option<Node<'_, '_>>, _body_uri: &str) -> KindInfo {
        KindInfo::Citation {
            content: escape_text(&body_texts(body, CNT_NS, "chars").concat()),
        }
    }

    fn body_properties(&self, details: &KindInfo) -> Vec<BodyProperty> {
        match details {
            KindInfo::Citation { content } => vec![BodyProperty::new("cnt:chars", fragment_text(content))],
            _ => Vec::new(),
        }
    }

    fn info_from_element(&self, node: Node<'_, '_>, schema: &dyn SchemaMapper) -> EntityInfo {
        let mut info = base_info(node, &[]);
        let content = schema
            .child_tag_for(EntityKind::Citation)
            .and_then(|tag| find_child(node, tag))
            .map_or_else(|| inner_xml(node), serialize_node);
        info.details = KindInfo::Citation { content };
        info
    }

    fn render(&self, entity: &EntityAnnotation, schema: &dyn SchemaMapper, attributes: &str, _inner: &str) -> String {
        let tag = schema.tag_name_for_entity_type(EntityKind::Citation);
        let child = schema.child_tag_for(EntityKind::Citation).unwrap_or("bibl");
        let content = match &entity.info.details {
            KindInfo::Citation { content } => content.trim(),
            _ => "",
        };
        let bibl = if content.starts_with(&format!("<{child}")) {
            markup_or_escaped(content)
        } else {
            format!("<{child}>{}</{child}>", markup_or_escaped(content))
        };
        format!("<{tag}{attributes}>{bibl}</{tag}>")
    }

    fn content(&self, details: &KindInfo, _wrapped_text: &str) -> String {
        match details {
            KindInfo::Citation { content } => fragment_text(content).trim().to_string(),
            _ => String::new(),
        }
    }
}

/// Handler for keyword sets, one term element per keyword.
pub struct KeywordHandler;

impl KindHandler for KeywordHandler {
    fn kind(&self) -> EntityKind {
        EntityKind::Keyword
    }

    fn containment(&self) -> Containment {
        Containment::Marker
    }

    fn body_type(&self) -> Option<&'static str> {
        Some(CONTENT_AS_TEXT)
    }

    fn motivation(&self) -> &'static str {
        OA_CLASSIFYING
    }

    fn details_from_body(&self, body: Option<Node<'_, '_>>, _body_uri: &str) -> KindInfo {
        KindInfo::Keyword {
            keywords: body_texts(body, CNT_NS, "chars"),
        }
    }

    fn body_properties(&self, details: &KindInfo) -> Vec<BodyProperty> {
        match details {
            KindInfo::Keyword { keywords } => keywords
                .iter()
                .map(|keyword| BodyProperty::new("cnt:chars", keyword.clone()))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn info_from_element(&self, node: Node<'_, '_>, schema: &dyn SchemaMapper) -> EntityInfo {
        let mut info = base_info(node, &[]);
        let term = schema.child_tag_for(EntityKind::Keyword).unwrap_or("term");
        info.details = KindInfo::Keyword {
            keywords: find_children(node, term).map(get_text).collect(),
        };
        info
    }

    fn render(&self, entity: &EntityAnnotation, schema: &dyn SchemaMapper, attributes: &str, _inner: &str) -> String {
        let tag = schema.tag_name_for_entity_type(EntityKind::Keyword);
        let term = schema.child_tag_for(EntityKind::Keyword).unwrap_or("term");
        let terms: String = match &entity.info.details {
            KindInfo::Keyword { keywords } => keywords
                .iter()
                .map(|keyword| format!("<{term}>{}</{term}>", escape_text(keyword)))
                .collect(),
            _ => String::new(),
        };
        format!("<{tag}{attributes}>{terms}</{tag}>")
    }

    fn content(&self, details: &KindInfo, _wrapped_text: &str) -> String {
        match details {
            KindInfo::Keyword { keywords } => keywords.join(", "),
            _ => String::new(),
        }
    }
}
