//! Core data types for annotated documents.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered attribute mapping of an element.
pub type Attributes = IndexMap<String, String>;

/// Closed set of semantic entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Person,
    Organization,
    Place,
    Title,
    Date,
    Note,
    Citation,
    Keyword,
    Correction,
    Link,
}

impl EntityKind {
    /// All kinds, in declaration order.
    pub const ALL: [EntityKind; 10] = [
        EntityKind::Person,
        EntityKind::Organization,
        EntityKind::Place,
        EntityKind::Title,
        EntityKind::Date,
        EntityKind::Note,
        EntityKind::Citation,
        EntityKind::Keyword,
        EntityKind::Correction,
        EntityKind::Link,
    ];

    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Person => "person",
            EntityKind::Organization => "organization",
            EntityKind::Place => "place",
            EntityKind::Title => "title",
            EntityKind::Date => "date",
            EntityKind::Note => "note",
            EntityKind::Citation => "citation",
            EntityKind::Keyword => "keyword",
            EntityKind::Correction => "correction",
            EntityKind::Link => "link",
        }
    }

    /// Parse a kind name. `org` is accepted as an alias of `organization`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "org" => Some(EntityKind::Organization),
            other => Self::ALL.into_iter().find(|kind| kind.as_str() == other),
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document-level annotation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mode {
    /// Plain XML, overlapping entities are rejected.
    #[default]
    XmlOnly,
    /// XML with an RDF block, overlapping entities become standoff ranges.
    XmlRdf,
}

impl Mode {
    /// Parse the integer marker of the mode statement (`0` or `1`).
    #[must_use]
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker.trim() {
            "0" => Some(Mode::XmlOnly),
            "1" => Some(Mode::XmlRdf),
            _ => None,
        }
    }

    /// The integer marker written to the mode statement.
    #[must_use]
    pub fn marker(&self) -> &'static str {
        match self {
            Mode::XmlOnly => "0",
            Mode::XmlRdf => "1",
        }
    }

    #[must_use]
    pub fn allows_overlap(&self) -> bool {
        matches!(self, Mode::XmlRdf)
    }
}

/// A structural, tag-bearing node of the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructNode {
    pub id: String,
    pub tag_name: String,
    /// Non-reserved attributes in document order.
    pub attributes: Attributes,
    pub can_contain_text: bool,
}

impl StructNode {
    #[must_use]
    pub fn new(id: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag_name: tag_name.into(),
            attributes: Attributes::new(),
            can_contain_text: true,
        }
    }
}

/// Kind-specific entity payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum KindInfo {
    #[default]
    None,
    /// A single date or a `start/end` interval.
    Date {
        date: Option<String>,
        start: Option<String>,
        end: Option<String>,
    },
    Title {
        level: Option<String>,
    },
    Correction {
        corrected: String,
        /// Text as it appeared before the correction.
        original: Option<String>,
    },
    Keyword {
        keywords: Vec<String>,
    },
    Link {
        url: String,
    },
    /// Serialized XML content owned by the note.
    Note {
        content: String,
    },
    /// Serialized bibliographic element owned by the citation.
    Citation {
        content: String,
    },
}

impl KindInfo {
    /// Build date info from a value that may be an interval (`start/end`).
    #[must_use]
    pub fn date_from_value(value: &str) -> Self {
        match value.split_once('/') {
            Some((start, end)) => KindInfo::Date {
                date: None,
                start: Some(start.trim().to_string()),
                end: Some(end.trim().to_string()),
            },
            None => KindInfo::Date {
                date: Some(value.trim().to_string()),
                start: None,
                end: None,
            },
        }
    }
}

/// Type-specific information attached to an entity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityInfo {
    pub certainty: Option<String>,
    /// Provenance blob returned by the lookup service (`cwrcInfo`).
    pub lookup: Option<Value>,
    /// Free-form attributes (`cwrcAttributes`).
    pub attributes: IndexMap<String, Value>,
    pub details: KindInfo,
}

impl EntityInfo {
    #[must_use]
    pub fn new(details: KindInfo) -> Self {
        Self {
            details,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_certainty(mut self, certainty: impl Into<String>) -> Self {
        self.certainty = Some(certainty.into());
        self
    }

    #[must_use]
    pub fn with_lookup(mut self, lookup: Value) -> Self {
        self.lookup = Some(lookup);
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Identifier chosen in the lookup service, if any.
    #[must_use]
    pub fn lookup_id(&self) -> Option<&str> {
        self.lookup.as_ref()?.get("id")?.as_str()
    }
}

/// Position of a standoff boundary: an anchor structure node plus a
/// character offset within its text content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextAnchor {
    pub xpath: String,
    pub struct_id: String,
    pub offset: usize,
}

/// Where an annotation lives in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Range {
    /// The node with this id bears the annotation as a well-formed tag.
    Inline { node_id: String, xpath: String },
    /// Character offsets within two anchor nodes.
    Standoff { start: TextAnchor, end: TextAnchor },
}

impl Range {
    #[must_use]
    pub fn is_standoff(&self) -> bool {
        matches!(self, Range::Standoff { .. })
    }
}

/// The six resolved identifiers of an annotation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnnotationUris {
    pub entity: String,
    pub annotation: String,
    pub document: String,
    pub target: String,
    pub selector: String,
    pub user: String,
}

/// Resolution state of an annotation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    Pending,
    Finalized,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnnotationRecord {
    /// `None` until the identifier resolver has settled.
    pub uris: Option<AnnotationUris>,
    pub range: Option<Range>,
}

impl AnnotationRecord {
    #[must_use]
    pub fn state(&self) -> ResolutionState {
        if self.uris.is_some() {
            ResolutionState::Finalized
        } else {
            ResolutionState::Pending
        }
    }
}

/// One semantic annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityAnnotation {
    pub id: String,
    pub kind: EntityKind,
    /// Plain text extracted from the anchored markup.
    pub content: String,
    /// Display label derived from the content.
    pub title: String,
    pub info: EntityInfo,
    pub annotation: AnnotationRecord,
}

impl EntityAnnotation {
    #[must_use]
    pub fn new(id: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            id: id.into(),
            kind,
            content: String::new(),
            title: String::new(),
            info: EntityInfo::default(),
            annotation: AnnotationRecord::default(),
        }
    }

    #[must_use]
    pub fn with_info(mut self, info: EntityInfo) -> Self {
        self.info = info;
        self
    }

    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.annotation.state() == ResolutionState::Finalized
    }
}

/// Subject or object of a triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripleSide {
    pub uri: String,
    pub text: String,
    pub external: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
    /// Local name of the relation (`cw:{name}`).
    pub name: String,
    pub text: String,
    pub external: bool,
}

/// An assertion between two entities, or an entity and an external resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triple {
    pub subject: TripleSide,
    pub predicate: Predicate,
    pub object: TripleSide,
}
