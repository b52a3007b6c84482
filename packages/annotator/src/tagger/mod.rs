//! Mutation engine for entity and structure tags.
//!
//! The [`Tagger`] applies user-level tagging actions to a [`Document`] and
//! its editable [`Tree`]:
//!
//! - entities are added over a selection, edited, removed, copied and
//!   pasted; their fragments are inserted by [`insert_boundary_tags`]
//! - structure tags are added, retagged and removed (see `structure.rs`)
//! - edits made outside the tagger are reconciled afterwards
//!
//! Every mutating operation is one undo transaction and publishes an
//! [`Event`].

mod boundary;
mod reconcile;
mod structure;

use tokio_util::sync::CancellationToken;

pub use boundary::{corresponding_entity_tag, find_entity_boundary, insert_boundary_tags};
pub use reconcile::{find_duplicate_tags, find_new_and_deleted_tags};
pub use structure::Placement;

use crate::config::INVISIBLE_MARKER;
use crate::document::Document;
use crate::error::{AnnotatorError, Result};
use crate::events::{Event, EventBus};
use crate::import::{Imported, Importer};
use crate::registry::{create_kind_registry, Containment, KindRegistry};
use crate::resolver::{resolve_uris, IdentifierResolver};
use crate::schema::SchemaMapper;
use crate::text::{strip_markup, title_from_content, trim_one_whitespace};
use crate::tree::{NodeId, Position, TextRange, Tree};
use crate::types::{AnnotationRecord, AnnotationUris, EntityAnnotation, EntityInfo, EntityKind};
use crate::undo::{NoopUndo, UndoHost};

/// Result of checking a selection before tagging it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionStatus {
    Valid,
    /// The selection is collapsed.
    NoSelection,
    /// Start and end lie in different parents.
    NoCommonParent,
    /// Start and end lie inside different sets of entities.
    Overlap,
}

/// The tag at a position in the tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CurrentTag<'d> {
    Entity(&'d EntityAnnotation),
    Struct(NodeId),
}

/// Applies tagging actions to a document and its tree.
pub struct Tagger<'a> {
    schema: &'a dyn SchemaMapper,
    kinds: KindRegistry,
    events: EventBus,
    undo: Box<dyn UndoHost + 'a>,
    clipboard: Option<EntityAnnotation>,
    /// Entity registered over an empty selection, waiting for content.
    deferred: Option<String>,
}

impl<'a> Tagger<'a> {
    #[must_use]
    pub fn new(schema: &'a dyn SchemaMapper) -> Self {
        Self {
            schema,
            kinds: create_kind_registry(),
            events: EventBus::new(),
            undo: Box::new(NoopUndo),
            clipboard: None,
            deferred: None,
        }
    }

    #[must_use]
    pub fn with_undo(mut self, undo: impl UndoHost + 'a) -> Self {
        self.undo = Box::new(undo);
        self
    }

    #[must_use]
    pub fn kinds(&self) -> &KindRegistry {
        &self.kinds
    }

    pub fn events(&mut self) -> &mut EventBus {
        &mut self.events
    }

    /// Id of the entity waiting for content, if any.
    #[must_use]
    pub fn deferred_entity(&self) -> Option<&str> {
        self.deferred.as_deref()
    }

    /// Frame the following mutation as a single undo level.
    fn transaction(&mut self) {
        self.undo.push_checkpoint();
        self.undo.suppress_next_checkpoint();
    }

    /// Import a document and announce it.
    pub fn load_document(&mut self, importer: &Importer<'_>, xml: &str) -> Result<Imported> {
        let imported = importer.import(xml)?;
        self.events.publish(Event::DocumentLoaded);
        Ok(imported)
    }

    /// Classify a selection.
    #[must_use]
    pub fn validate_selection(&self, tree: &Tree, range: TextRange) -> SelectionStatus {
        if range.is_collapsed() {
            return SelectionStatus::NoSelection;
        }
        if entity_ancestors(tree, range.start.node) != entity_ancestors(tree, range.end.node) {
            return SelectionStatus::Overlap;
        }
        if tree.parent(range.start.node) != tree.parent(range.end.node) {
            return SelectionStatus::NoCommonParent;
        }
        SelectionStatus::Valid
    }

    /// Validate the selection, then tag it.
    ///
    /// Owning kinds (notes, citations, keywords) accept a collapsed
    /// selection; every other kind needs selected text. Selections that
    /// cross entity markup need a document mode that allows overlap;
    /// selections that only cross structure are split into fragments in
    /// every mode.
    pub fn add_entity(
        &mut self,
        document: &mut Document,
        tree: &mut Tree,
        kind: EntityKind,
        range: TextRange,
        info: EntityInfo,
    ) -> Result<String> {
        let marker = self.kinds.containment(kind) == Containment::Marker;
        match self.validate_selection(tree, range) {
            SelectionStatus::NoSelection if !marker => return Err(AnnotatorError::NoSelection),
            SelectionStatus::Overlap if !document.mode.allows_overlap() => {
                return Err(AnnotatorError::OverlapNotAllowed)
            }
            _ => {}
        }
        self.add_entity_tag(document, tree, kind, range, info)
    }

    /// Register an entity over a selection and insert its fragments.
    ///
    /// When the selected text is empty the entity is registered without
    /// fragments and completed by [`Tagger::complete_deferred_entity`].
    pub fn add_entity_tag(
        &mut self,
        document: &mut Document,
        tree: &mut Tree,
        kind: EntityKind,
        range: TextRange,
        info: EntityInfo,
    ) -> Result<String> {
        self.transaction();
        let containment = self.kinds.containment(kind);

        let mut range = range;
        let content = match containment {
            Containment::Marker => self.content_of(kind, &info, ""),
            Containment::Wrap => {
                let raw = selected_text(tree, range);
                let stripped = strip_markup(&raw);
                let (trimmed, leading, trailing) = trim_one_whitespace(&stripped);
                if range.start.node == range.end.node && stripped == raw {
                    range.start.offset += leading;
                    range.end.offset = range.end.offset.saturating_sub(trailing).max(range.start.offset);
                }
                self.content_of(kind, &info, &trimmed)
            }
        };

        let id = document.next_entity_id();
        let mut entity = EntityAnnotation::new(id.clone(), kind).with_info(info);
        entity.title = title_from_content(&content);
        entity.content = content;
        let anchored = containment == Containment::Marker || !entity.content.is_empty();
        document.insert_entity(entity);

        if anchored {
            if let Err(err) = self.insert_boundary_tags(tree, &id, kind, range) {
                tracing::warn!(error = %err, entity_id = %id, "boundary insertion failed, entity left unanchored");
            }
        } else {
            tracing::debug!(entity_id = %id, "empty selection, deferring entity content");
            self.deferred = Some(id.clone());
        }
        self.events.publish(Event::EntityAdded(id.clone()));
        Ok(id)
    }

    /// Insert the fragments of an entity using its kind's containment and
    /// the schema's wrapper tag.
    pub fn insert_boundary_tags(&self, tree: &mut Tree, entity_id: &str, kind: EntityKind, range: TextRange) -> Result<NodeId> {
        insert_boundary_tags(
            tree,
            entity_id,
            kind,
            range,
            self.kinds.containment(kind),
            self.schema.parent_tag_for(kind),
        )
    }

    /// Supply the text of the deferred entity and anchor it at `position`.
    ///
    /// Returns the entity id, or `None` when nothing was deferred.
    pub fn complete_deferred_entity(
        &mut self,
        document: &mut Document,
        tree: &mut Tree,
        content: &str,
        position: Position,
    ) -> Result<Option<String>> {
        let Some(id) = self.deferred.take() else {
            return Ok(None);
        };
        let entity = document
            .entity_mut(&id)
            .ok_or_else(|| AnnotatorError::UnknownId(id.clone()))?;
        entity.content = content.trim().to_string();
        entity.title = title_from_content(&entity.content);
        let kind = entity.kind;

        self.transaction();
        let text = tree.create_text(content);
        tree.insert_at(position, text)?;
        let length = content.chars().count();
        self.insert_boundary_tags(tree, &id, kind, TextRange::within(text, 0, length))?;
        self.events.publish(Event::EntityEdited(id.clone()));
        Ok(Some(id))
    }

    /// Replace an entity's info. Owning kinds recompute content and title.
    pub fn edit_entity(&mut self, document: &mut Document, id: &str, info: EntityInfo) -> Result<()> {
        self.transaction();
        let entity = document
            .entity_mut(id)
            .ok_or_else(|| AnnotatorError::UnknownId(id.to_string()))?;
        if self.kinds.containment(entity.kind) == Containment::Marker {
            let content = self.content_of(entity.kind, &info, "");
            entity.title = title_from_content(&content);
            entity.content = content;
        }
        entity.info = info;
        self.events.publish(Event::EntityEdited(id.to_string()));
        Ok(())
    }

    /// Remove an entity's fragments, keeping the text they wrapped.
    pub fn remove_entity(&mut self, document: &mut Document, tree: &mut Tree, id: &str) -> Result<()> {
        if document.entity(id).is_none() {
            return Err(AnnotatorError::UnknownId(id.to_string()));
        }
        self.transaction();
        let fragments = tree.entity_fragments(id);
        let mut parents: Vec<NodeId> = Vec::new();
        for node in fragments {
            let Some(parent) = tree.parent(node) else {
                continue;
            };
            if !parents.contains(&parent) {
                parents.push(parent);
            }
            if tree.entity_marker(node).is_some_and(|marker| marker.note) {
                tree.detach(node);
            } else {
                tree.unwrap(node)?;
            }
        }
        for parent in parents {
            tree.normalize(parent);
        }
        document.delete_entity(id);
        self.events.publish(Event::EntityRemoved(id.to_string()));
        Ok(())
    }

    /// Remove an entity or structure tag by id, keeping its contents.
    pub fn remove_tag(&mut self, document: &mut Document, tree: &mut Tree, id: &str) -> Result<()> {
        if document.entity(id).is_some() {
            self.remove_entity(document, tree, id)
        } else {
            self.remove_structure_tag(document, tree, id, false)
        }
    }

    /// The innermost entity or structure tag around a node.
    #[must_use]
    pub fn current_tag<'d>(&self, document: &'d Document, tree: &Tree, node: NodeId) -> Option<CurrentTag<'d>> {
        let mut current = Some(node);
        while let Some(id) = current {
            if let Some(element) = tree.element(id) {
                if let Some(marker) = &element.entity {
                    if let Some(entity) = document.entity(&marker.entity_id) {
                        return Some(CurrentTag::Entity(entity));
                    }
                } else if element.tag.is_some() && element.id.is_some() {
                    return Some(CurrentTag::Struct(id));
                }
            }
            current = tree.parent(id);
        }
        None
    }

    /// Put a copy of an entity on the clipboard.
    pub fn copy_entity(&mut self, document: &Document, id: &str) -> Result<()> {
        match document.entity(id) {
            Some(entity) => {
                self.clipboard = Some(entity.clone());
                self.events.publish(Event::EntityCopied(id.to_string()));
                Ok(())
            }
            None if document.struct_node(id).is_some() => Err(AnnotatorError::CannotCopyStructure(id.to_string())),
            None => Err(AnnotatorError::UnknownId(id.to_string())),
        }
    }

    /// Insert the clipboard entity at a caret position under a fresh id.
    ///
    /// Wrapping kinds re-insert their content text; owning kinds insert
    /// only their marker. The copy starts out pending.
    pub fn paste_entity(&mut self, document: &mut Document, tree: &mut Tree, position: Position) -> Result<String> {
        let mut copy = self.clipboard.clone().ok_or(AnnotatorError::NothingToPaste)?;
        self.transaction();
        let id = document.next_entity_id();
        copy.id = id.clone();
        copy.annotation = AnnotationRecord::default();
        let kind = copy.kind;

        let range = match self.kinds.containment(kind) {
            Containment::Marker => TextRange::new(position, position),
            Containment::Wrap => {
                let text = tree.create_text(copy.content.clone());
                tree.insert_at(position, text)?;
                TextRange::within(text, 0, copy.content.chars().count())
            }
        };
        document.insert_entity(copy);
        if let Err(err) = self.insert_boundary_tags(tree, &id, kind, range) {
            tracing::warn!(error = %err, entity_id = %id, "pasted entity left unanchored");
        }
        self.events.publish(Event::EntityPasted(id.clone()));
        Ok(id)
    }

    /// Re-edit hook of owning-kind markers.
    pub fn marker_activated(&mut self, tree: &Tree, node: NodeId) -> Option<String> {
        let marker = tree.entity_marker(node).filter(|marker| marker.note)?;
        let id = marker.entity_id.clone();
        self.events.publish(Event::EditRequested(id.clone()));
        Some(id)
    }

    /// Reconcile ids after raw content was pasted into the tree.
    pub fn content_pasted(&mut self, document: &mut Document, tree: &mut Tree) -> bool {
        find_duplicate_tags(document, tree, &mut self.events)
    }

    /// See [`find_new_and_deleted_tags`].
    pub fn find_new_and_deleted_tags(&mut self, document: &mut Document, tree: &mut Tree) -> bool {
        find_new_and_deleted_tags(document, tree, &mut self.events)
    }

    /// See [`find_duplicate_tags`].
    pub fn find_duplicate_tags(&mut self, document: &mut Document, tree: &mut Tree) -> bool {
        find_duplicate_tags(document, tree, &mut self.events)
    }

    /// Move an entity from pending to finalized.
    ///
    /// An identifier chosen in a lookup replaces the resolved entity URI.
    pub fn finalize_entity(&mut self, document: &mut Document, id: &str, mut uris: AnnotationUris) -> Result<()> {
        let entity = document
            .entity_mut(id)
            .ok_or_else(|| AnnotatorError::UnknownId(id.to_string()))?;
        if let Some(lookup) = entity.info.lookup_id() {
            uris.entity = lookup.to_string();
        }
        entity.annotation.uris = Some(uris);
        self.events.publish(Event::EntityFinalized(id.to_string()));
        Ok(())
    }

    /// Resolve the URIs of an entity and finalize it.
    ///
    /// On failure or cancellation the entity stays pending and the error
    /// is returned.
    pub async fn resolve_and_finalize(
        &mut self,
        document: &mut Document,
        resolver: &dyn IdentifierResolver,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let entity = document
            .entity(id)
            .cloned()
            .ok_or_else(|| AnnotatorError::UnknownId(id.to_string()))?;
        match resolve_uris(resolver, &entity, cancel).await {
            Ok(uris) => self.finalize_entity(document, id, uris),
            Err(err) => {
                tracing::warn!(error = %err, entity_id = %id, "entity left pending");
                Err(err)
            }
        }
    }

    fn content_of(&self, kind: EntityKind, info: &EntityInfo, text: &str) -> String {
        match self.kinds.get(kind) {
            Some(handler) => handler.content(&info.details, text),
            None => text.replace(INVISIBLE_MARKER, "").trim().to_string(),
        }
    }
}

/// Ids of the entities whose fragments enclose a node, innermost first.
fn entity_ancestors(tree: &Tree, node: NodeId) -> Vec<String> {
    let mut ids = Vec::new();
    let mut current = tree.parent(node);
    while let Some(id) = current {
        if let Some(marker) = tree.entity_marker(id) {
            ids.push(marker.entity_id.clone());
        }
        current = tree.parent(id);
    }
    ids
}

/// Text covered by a selection, in document order.
fn selected_text(tree: &Tree, range: TextRange) -> String {
    let slice = |node: NodeId, from: usize, to: Option<usize>| -> String {
        let text = tree.text(node).unwrap_or_default();
        let chars = text.chars().skip(from);
        match to {
            Some(to) => chars.take(to.saturating_sub(from)).collect(),
            None => chars.collect(),
        }
    };
    if range.start.node == range.end.node {
        return slice(range.start.node, range.start.offset, Some(range.end.offset));
    }
    let mut text = slice(range.start.node, range.start.offset, None);
    for node in tree.nodes_between(range.start.node, range.end.node) {
        text.push_str(&tree.text_content(node));
    }
    text.push_str(&slice(range.end.node, 0, Some(range.end.offset)));
    text
}
