//! The document registry.
//!
//! [`Document`] owns the canonical in-memory state of one editing session:
//! structure nodes, entity annotations, triples, the two deletion logs and
//! the id generator. It is passed explicitly to the importer, exporter and
//! tagger; there is no global registry.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::config::{id_suffix, ENTITY_ID_PREFIX, MAX_OBSERVED_ID_SUFFIX, STRUCT_ID_PREFIX};
use crate::types::{EntityAnnotation, EntityKind, Mode, StructNode, Triple};

/// Monotonic id generator shared by the entity and structure id spaces.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    counter: u64,
}

impl IdGenerator {
    /// Generate the next id with the given prefix.
    pub fn next(&mut self, prefix: &str) -> String {
        self.counter = self.counter.saturating_add(1);
        format!("{prefix}{}", self.counter)
    }

    /// Advance the counter past the numeric suffix of an existing id.
    ///
    /// Suffixes above [`MAX_OBSERVED_ID_SUFFIX`] are ignored so the counter
    /// always keeps room to grow.
    pub fn observe(&mut self, id: &str) {
        match id_suffix(id) {
            Some(suffix) if suffix <= MAX_OBSERVED_ID_SUFFIX => {
                self.counter = self.counter.max(suffix);
            }
            Some(_) => tracing::debug!(id, "id suffix too large to follow"),
            None => {}
        }
    }

    #[must_use]
    pub fn current(&self) -> u64 {
        self.counter
    }
}

/// Canonical state of an annotated document.
#[derive(Debug, Clone, Default)]
pub struct Document {
    pub root_tag: String,
    pub mode: Mode,
    entities: IndexMap<String, EntityAnnotation>,
    structs: IndexMap<String, StructNode>,
    triples: Vec<Triple>,
    deleted_entities: IndexMap<String, EntityAnnotation>,
    deleted_structs: IndexMap<String, StructNode>,
    ids: IdGenerator,
}

impl Document {
    #[must_use]
    pub fn new(root_tag: impl Into<String>, mode: Mode) -> Self {
        Self {
            root_tag: root_tag.into(),
            mode,
            ..Default::default()
        }
    }

    pub fn next_entity_id(&mut self) -> String {
        self.ids.next(ENTITY_ID_PREFIX)
    }

    pub fn next_struct_id(&mut self) -> String {
        self.ids.next(STRUCT_ID_PREFIX)
    }

    /// Make sure freshly generated ids never collide with `id`.
    pub fn observe_id(&mut self, id: &str) {
        self.ids.observe(id);
    }

    /// Allocate an id and register a new entity.
    pub fn create_entity(&mut self, kind: EntityKind) -> &mut EntityAnnotation {
        let id = self.next_entity_id();
        self.entities
            .entry(id.clone())
            .or_insert_with(|| EntityAnnotation::new(id, kind))
    }

    /// Allocate an id and register a new structure node.
    pub fn create_struct(&mut self, tag_name: impl Into<String>) -> &mut StructNode {
        let id = self.next_struct_id();
        self.structs
            .entry(id.clone())
            .or_insert_with(|| StructNode::new(id, tag_name))
    }

    /// Register an entity that already carries an id. Replaces any entry
    /// with the same id.
    pub fn insert_entity(&mut self, entity: EntityAnnotation) {
        self.ids.observe(&entity.id);
        self.entities.insert(entity.id.clone(), entity);
    }

    /// Register a structure node that already carries an id.
    pub fn insert_struct(&mut self, node: StructNode) {
        self.ids.observe(&node.id);
        self.structs.insert(node.id.clone(), node);
    }

    #[must_use]
    pub fn entity(&self, id: &str) -> Option<&EntityAnnotation> {
        self.entities.get(id)
    }

    pub fn entity_mut(&mut self, id: &str) -> Option<&mut EntityAnnotation> {
        self.entities.get_mut(id)
    }

    #[must_use]
    pub fn struct_node(&self, id: &str) -> Option<&StructNode> {
        self.structs.get(id)
    }

    pub fn struct_node_mut(&mut self, id: &str) -> Option<&mut StructNode> {
        self.structs.get_mut(id)
    }

    /// Move an entity to the deletion log.
    pub fn delete_entity(&mut self, id: &str) -> Option<&EntityAnnotation> {
        let entity = self.entities.shift_remove(id)?;
        self.deleted_entities.insert(id.to_string(), entity);
        self.deleted_entities.get(id)
    }

    /// Move a structure node to the deletion log.
    pub fn delete_struct(&mut self, id: &str) -> Option<&StructNode> {
        let node = self.structs.shift_remove(id)?;
        self.deleted_structs.insert(id.to_string(), node);
        self.deleted_structs.get(id)
    }

    /// Move a deleted entity back into the registry.
    pub fn restore_entity(&mut self, id: &str) -> bool {
        match self.deleted_entities.shift_remove(id) {
            Some(entity) => {
                self.entities.insert(id.to_string(), entity);
                true
            }
            None => false,
        }
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityAnnotation> {
        self.entities.values()
    }

    pub fn structs(&self) -> impl Iterator<Item = &StructNode> {
        self.structs.values()
    }

    #[must_use]
    pub fn entity_ids(&self) -> Vec<String> {
        self.entities.keys().cloned().collect()
    }

    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn struct_count(&self) -> usize {
        self.structs.len()
    }

    pub fn add_triple(&mut self, triple: Triple) {
        self.triples.push(triple);
    }

    #[must_use]
    pub fn triples(&self) -> &[Triple] {
        &self.triples
    }

    pub fn deleted_entities(&self) -> impl Iterator<Item = &EntityAnnotation> {
        self.deleted_entities.values()
    }

    pub fn deleted_structs(&self) -> impl Iterator<Item = &StructNode> {
        self.deleted_structs.values()
    }

    /// Entity with the given annotation URI.
    #[must_use]
    pub fn entity_by_annotation_uri(&self, uri: &str) -> Option<&EntityAnnotation> {
        self.entities.values().find(|entity| {
            entity
                .annotation
                .uris
                .as_ref()
                .is_some_and(|uris| uris.annotation == uri)
        })
    }

    /// Move every entry whose id is absent from `live_ids` into its
    /// deletion log.
    ///
    /// Returns the ids of the removed entities and whether anything changed.
    pub fn reconcile(&mut self, live_ids: &HashSet<String>) -> (Vec<String>, bool) {
        let dead_entities: Vec<String> = self
            .entities
            .keys()
            .filter(|id| !live_ids.contains(*id))
            .cloned()
            .collect();
        let dead_structs: Vec<String> = self
            .structs
            .keys()
            .filter(|id| !live_ids.contains(*id))
            .cloned()
            .collect();
        for id in &dead_entities {
            self.delete_entity(id);
        }
        for id in &dead_structs {
            self.delete_struct(id);
        }
        let changed = !dead_entities.is_empty() || !dead_structs.is_empty();
        (dead_entities, changed)
    }
}
