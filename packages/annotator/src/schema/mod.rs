//! Schema mapping between entity kinds and document markup.
//!
//! The engine never hard-codes element names. Everything it needs to know
//! about the target markup language goes through [`SchemaMapper`]. The
//! bundled [`Schema`] implementation is loaded from YAML; [`tei`] returns the
//! default TEI mapping.

use std::collections::HashSet;
use std::sync::LazyLock;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::EntityKind;

/// Bundled TEI mapping.
const TEI_YAML: &str = include_str!("tei.yaml");

#[allow(clippy::expect_used)] // Bundled configuration that is guaranteed to be valid
static TEI: LazyLock<Schema> =
    LazyLock::new(|| Schema::from_yaml_str(TEI_YAML).expect("valid bundled schema"));

/// Get the default TEI schema mapping.
#[must_use]
pub fn tei() -> &'static Schema {
    &TEI
}

/// Collaborator answering markup questions for importer, exporter and tagger.
pub trait SchemaMapper: Send + Sync {
    /// Name of the document root element.
    fn root_tag(&self) -> &str;

    /// Element name used to mark up an entity of this kind.
    fn tag_name_for_entity_type(&self, kind: EntityKind) -> &str;

    /// Entity kind declared by an element name, if it is an entity element.
    fn entity_type_for_tag(&self, tag: &str) -> Option<EntityKind>;

    /// Tag recorded on the editor-side wrapper of an entity.
    fn parent_tag_for(&self, kind: EntityKind) -> &str {
        self.tag_name_for_entity_type(kind)
    }

    fn is_block_level(&self, tag: &str) -> bool;

    fn can_contain_text(&self, tag: &str) -> bool;

    /// Child element holding the text an entity wraps (`sic` for corrections).
    fn text_tag_for(&self, _kind: EntityKind) -> Option<&str> {
        None
    }

    /// Child element that distinguishes or carries an entity's payload
    /// (`bibl` for citations, `term` for keywords, `corr` for corrections).
    fn child_tag_for(&self, _kind: EntityKind) -> Option<&str> {
        None
    }

    /// Namespace declarations required on the exported root element.
    fn root_namespaces(&self) -> Vec<(&str, &str)> {
        Vec::new()
    }
}

/// Markup used for one entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMapping {
    pub tag: String,
    #[serde(default)]
    pub child: Option<String>,
    #[serde(default)]
    pub text_tag: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
}

/// YAML-configured schema mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub root: String,
    #[serde(default)]
    pub namespaces: IndexMap<String, String>,
    #[serde(default)]
    pub block_tags: HashSet<String>,
    #[serde(default)]
    pub no_text_tags: HashSet<String>,
    pub entities: IndexMap<EntityKind, EntityMapping>,
}

impl Schema {
    /// Load a schema mapping from YAML.
    ///
    /// # Examples
    /// ```
    /// use standoff_annotator::schema::{Schema, SchemaMapper};
    /// use standoff_annotator::types::EntityKind;
    ///
    /// let schema = Schema::from_yaml_str(
    ///     "name: mini\nroot: doc\nentities:\n  person:\n    tag: name\n",
    /// )
    /// .unwrap();
    /// assert_eq!(schema.tag_name_for_entity_type(EntityKind::Person), "name");
    /// ```
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    fn mapping(&self, kind: EntityKind) -> Option<&EntityMapping> {
        self.entities.get(&kind)
    }
}

impl SchemaMapper for Schema {
    fn root_tag(&self) -> &str {
        &self.root
    }

    fn tag_name_for_entity_type(&self, kind: EntityKind) -> &str {
        self.mapping(kind)
            .map_or(kind.as_str(), |mapping| mapping.tag.as_str())
    }

    fn entity_type_for_tag(&self, tag: &str) -> Option<EntityKind> {
        // Kinds sharing an element (note, citation, keyword) resolve to the
        // one without a distinguishing child.
        let mut candidates = self
            .entities
            .iter()
            .filter(|(_, mapping)| mapping.tag == tag);
        let first = candidates.clone().next().map(|(kind, _)| *kind);
        candidates
            .find(|(_, mapping)| mapping.child.is_none() || mapping.text_tag.is_some())
            .map(|(kind, _)| *kind)
            .or(first)
    }

    fn parent_tag_for(&self, kind: EntityKind) -> &str {
        match self.mapping(kind) {
            Some(EntityMapping {
                parent: Some(parent),
                ..
            }) => parent.as_str(),
            _ => self.tag_name_for_entity_type(kind),
        }
    }

    fn is_block_level(&self, tag: &str) -> bool {
        self.block_tags.contains(tag)
    }

    fn can_contain_text(&self, tag: &str) -> bool {
        !self.no_text_tags.contains(tag)
    }

    fn text_tag_for(&self, kind: EntityKind) -> Option<&str> {
        self.mapping(kind)?.text_tag.as_deref()
    }

    fn child_tag_for(&self, kind: EntityKind) -> Option<&str> {
        self.mapping(kind)?.child.as_deref()
    }

    fn root_namespaces(&self) -> Vec<(&str, &str)> {
        self.namespaces
            .iter()
            .map(|(name, uri)| (name.as_str(), uri.as_str()))
            .collect()
    }
}
