//! Kind handler trait definition.

use roxmltree::Node;
use serde_json::Value;

use crate::config::{is_reserved_attribute, CW_NS, INVISIBLE_MARKER};
use crate::schema::SchemaMapper;
use crate::types::{AnnotationUris, EntityAnnotation, EntityInfo, EntityKind, KindInfo};
use crate::xml::{escape_attribute, escape_text, qualified_attributes};

/// How an entity occupies the editable tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    /// Wraps the selected text in one or more fragments.
    Wrap,
    /// A single collapsed marker; the entity owns its content.
    Marker,
}

/// A literal property of an annotation body description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyProperty {
    /// Qualified element name (`xsd:date`, `cnt:chars`).
    pub name: &'static str,
    pub value: String,
}

impl BodyProperty {
    #[must_use]
    pub fn new(name: &'static str, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

/// Trait for per-kind behavior.
///
/// One handler exists per [`EntityKind`]. Importer, exporter and tagger
/// consult the handler instead of branching on the kind themselves.
pub trait KindHandler: Send + Sync {
    fn kind(&self) -> EntityKind;

    fn containment(&self) -> Containment {
        Containment::Wrap
    }

    /// Whether the entity owns the children of its element, so nested
    /// markup is not imported as structure.
    fn owns_children(&self) -> bool {
        self.containment() == Containment::Marker
    }

    /// `rdf:type` of the annotation body, `None` when the body is an
    /// external resource without a description.
    fn body_type(&self) -> Option<&'static str>;

    /// `oa:motivatedBy` of the annotation.
    fn motivation(&self) -> &'static str;

    /// URI used as the annotation body.
    fn body_uri(&self, _info: &EntityInfo, uris: &AnnotationUris) -> String {
        uris.entity.clone()
    }

    /// Kind details from a parsed body description.
    ///
    /// # Arguments
    /// * `body` - The `rdf:Description` of the body, if the RDF contains one
    /// * `body_uri` - The `oa:hasBody` resource
    fn details_from_body(&self, _body: Option<Node<'_, '_>>, _body_uri: &str) -> KindInfo {
        KindInfo::None
    }

    /// Literal properties written into the body description.
    fn body_properties(&self, _details: &KindInfo) -> Vec<BodyProperty> {
        Vec::new()
    }

    /// Entity info from an inline entity element.
    fn info_from_element(&self, node: Node<'_, '_>, schema: &dyn SchemaMapper) -> EntityInfo;

    /// Kind-specific attributes written on an inline entity element.
    fn element_attributes(&self, _info: &EntityInfo) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Render the inline markup of an entity.
    ///
    /// # Arguments
    /// * `attributes` - Serialized attribute list, starting with a space
    /// * `inner` - Serialized content wrapped by the entity's fragment
    fn render(&self, entity: &EntityAnnotation, schema: &dyn SchemaMapper, attributes: &str, inner: &str) -> String {
        let tag = schema.tag_name_for_entity_type(entity.kind);
        format!("<{tag}{attributes}>{inner}</{tag}>")
    }

    /// Plain-text content of an entity.
    fn content(&self, _details: &KindInfo, wrapped_text: &str) -> String {
        wrapped_text.replace(INVISIBLE_MARKER, "").trim().to_string()
    }
}

/// Attributes of an element that are not consumed by a handler and not
/// reserved by the editor, as free-form entity attributes.
pub fn free_attributes(node: Node<'_, '_>, consumed: &[&str]) -> indexmap::IndexMap<String, Value> {
    qualified_attributes(node)
        .into_iter()
        .filter(|(name, _)| !is_reserved_attribute(name) && !consumed.contains(&name.as_str()))
        .filter(|(name, _)| !name.starts_with("xmlns"))
        .map(|(name, value)| (name, Value::String(value.to_string())))
        .collect()
}

/// Attribute carrying the certainty of an inline entity.
pub const CERTAINTY_ATTR: &str = "cert";

/// Certainty and free-form attributes shared by every kind.
///
/// `consumed` lists the attributes the calling handler maps itself.
pub fn base_info(node: Node<'_, '_>, consumed: &[&str]) -> EntityInfo {
    let mut skipped = consumed.to_vec();
    skipped.push(CERTAINTY_ATTR);
    EntityInfo {
        certainty: node.attribute(CERTAINTY_ATTR).map(str::to_string),
        attributes: free_attributes(node, &skipped),
        ..Default::default()
    }
}

/// Serialize the full attribute list of an inline entity element.
///
/// The entity id comes first, then the handler's attributes and the
/// certainty, then any free-form attributes not already written.
pub fn entity_attributes(handler: &dyn KindHandler, entity: &EntityAnnotation, id_attribute: &str) -> String {
    let mut pairs: Vec<(String, String)> = vec![(id_attribute.to_string(), entity.id.clone())];
    pairs.extend(handler.element_attributes(&entity.info));
    if let Some(certainty) = &entity.info.certainty {
        pairs.push((CERTAINTY_ATTR.to_string(), certainty.clone()));
    }
    for (name, value) in &entity.info.attributes {
        if pairs.iter().any(|(existing, _)| existing == name) || is_reserved_attribute(name) {
            continue;
        }
        let value = match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        pairs.push((name.clone(), value));
    }
    pairs
        .iter()
        .map(|(name, value)| format!(" {name}=\"{}\"", escape_attribute(value)))
        .collect()
}

/// Content that is already well-formed markup is kept, anything else is
/// escaped as character data.
pub fn markup_or_escaped(content: &str) -> String {
    let wrapped = format!("<fragment>{content}</fragment>");
    match roxmltree::Document::parse(&wrapped) {
        Ok(_) => content.to_string(),
        Err(_) => escape_text(content),
    }
}

/// Text of every `cw:`/`cnt:`/`xsd:` style child with the given local name.
pub fn body_texts(body: Option<Node<'_, '_>>, namespace: &str, name: &str) -> Vec<String> {
    body.map(|body| {
        body.children()
            .filter(|child| child.has_tag_name((namespace, name)))
            .map(|child| child.text().unwrap_or_default().to_string())
            .collect()
    })
    .unwrap_or_default()
}

/// Certainty value from the fragment of a `cw:hasCertainty` resource.
///
/// # Examples
/// ```
/// use standoff_annotator::registry::certainty_from_uri;
///
/// assert_eq!(certainty_from_uri("http://cwrc.ca/ns/cw#reasonable").as_deref(), Some("reasonably certain"));
/// assert_eq!(certainty_from_uri("http://cwrc.ca/ns/cw#definite").as_deref(), Some("definite"));
/// ```
#[must_use]
pub fn certainty_from_uri(uri: &str) -> Option<String> {
    let (_, fragment) = uri.split_once('#')?;
    match fragment {
        "" => None,
        "reasonable" => Some("reasonably certain".to_string()),
        other => Some(other.to_string()),
    }
}

/// `cw:hasCertainty` resource for a certainty value.
#[must_use]
pub fn certainty_to_uri(certainty: &str) -> String {
    let fragment = match certainty {
        "reasonably certain" => "reasonable",
        other => other,
    };
    format!("{CW_NS}{}", fragment.replace(' ', "_"))
}
