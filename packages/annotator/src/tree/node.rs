//! Node representation of the editable tree.

use crate::types::{Attributes, EntityKind};

/// Node identifier (index into the tree arena).
pub type NodeId = usize;

/// Role of an entity fragment within its annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// First fragment of a boundary-spanning entity.
    Start,
    /// Wrapped node strictly between start and end.
    Middle,
    /// Last fragment of a boundary-spanning entity.
    End,
    /// Single fragment acting as both start and end.
    Whole,
}

impl Boundary {
    #[must_use]
    pub fn is_start(&self) -> bool {
        matches!(self, Boundary::Start | Boundary::Whole)
    }

    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, Boundary::End | Boundary::Whole)
    }
}

/// Marks an element as (part of) an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMarker {
    pub entity_id: String,
    pub kind: EntityKind,
    pub boundary: Boundary,
    /// Collapsed marker of a kind that owns its content (note, citation,
    /// keyword). The surface binds its re-edit hook to these.
    pub note: bool,
}

impl EntityMarker {
    #[must_use]
    pub fn new(entity_id: impl Into<String>, kind: EntityKind, boundary: Boundary) -> Self {
        Self {
            entity_id: entity_id.into(),
            kind,
            boundary,
            note: false,
        }
    }
}

/// An element of the editable tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    /// Schema element name. `None` for entity fragments that only exist in
    /// the editor.
    pub tag: Option<String>,
    /// Structure id, or the entity id for a single-fragment entity.
    pub id: Option<String>,
    pub entity: Option<EntityMarker>,
    pub attributes: Attributes,
    pub text_allowed: bool,
    pub inline: bool,
}

impl Element {
    /// A tag-bearing structural element.
    #[must_use]
    pub fn structural(tag: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            id: Some(id.into()),
            text_allowed: true,
            ..Default::default()
        }
    }

    /// An editor-only entity fragment.
    #[must_use]
    pub fn fragment(marker: EntityMarker) -> Self {
        Self {
            entity: Some(marker),
            text_allowed: true,
            inline: true,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    #[must_use]
    pub fn with_inline(mut self, inline: bool) -> Self {
        self.inline = inline;
        self
    }

    #[must_use]
    pub fn with_text_allowed(mut self, text_allowed: bool) -> Self {
        self.text_allowed = text_allowed;
        self
    }

    #[must_use]
    pub fn entity_id(&self) -> Option<&str> {
        self.entity.as_ref().map(|marker| marker.entity_id.as_str())
    }
}

/// Payload of a tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    /// The editing surface's body, parent of the document root element.
    Body,
    Element(Element),
    Text(String),
}

/// A node in the arena.
#[derive(Debug, Clone)]
pub struct Node {
    pub data: NodeData,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    pub(crate) fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            children: Vec::new(),
        }
    }
}
