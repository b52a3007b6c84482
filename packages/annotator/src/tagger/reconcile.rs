//! Re-synchronizing the registry with edits made outside the tagger.
//!
//! Undo/redo and raw pastes change the tree without going through the
//! tagger. These passes detect the result: tags without an id, ids that
//! vanished from the tree, and ids that now occur more than once.

use indexmap::IndexMap;

use crate::config::is_reserved_attribute;
use crate::document::Document;
use crate::events::{Event, EventBus};
use crate::tree::{NodeId, Tree};
use crate::types::{AnnotationRecord, Attributes, StructNode};

/// Register tagged elements that lack an id and move registry entries
/// whose id is gone from the tree into the deletion logs.
///
/// Returns whether anything changed.
pub fn find_new_and_deleted_tags(document: &mut Document, tree: &mut Tree, events: &mut EventBus) -> bool {
    let mut changed = false;

    let unregistered: Vec<NodeId> = tree
        .descendants(tree.body())
        .into_iter()
        .filter(|&node| {
            tree.element(node)
                .is_some_and(|el| el.tag.is_some() && el.id.is_none() && el.entity.is_none())
        })
        .collect();
    for node in unregistered {
        let id = document.next_struct_id();
        let Some(element) = tree.element_mut(node) else {
            continue;
        };
        element.id = Some(id.clone());
        let mut struct_node = StructNode::new(id.clone(), element.tag.clone().unwrap_or_default());
        struct_node.attributes = user_attributes(&element.attributes);
        struct_node.can_contain_text = element.text_allowed;
        document.insert_struct(struct_node);
        tracing::debug!(id = %id, "registered new tag");
        events.publish(Event::TagAdded(id));
        changed = true;
    }

    let (removed, deleted_any) = document.reconcile(&tree.live_ids());
    for id in removed {
        tracing::debug!(id = %id, "entity no longer present in tree");
        events.publish(Event::EntityRemoved(id));
    }
    changed || deleted_any
}

fn user_attributes(attributes: &Attributes) -> Attributes {
    attributes
        .iter()
        .filter(|(name, _)| !is_reserved_attribute(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Give every duplicated id beyond its first occurrence a fresh id and a
/// cloned registry entry.
///
/// An entity occurrence starts at each `Start` or `Whole` fragment, so a
/// pasted copy of a boundary-spanning entity is renamed as a unit. Cloned
/// entities start out pending; their URIs belong to the original.
///
/// Returns whether anything changed.
pub fn find_duplicate_tags(document: &mut Document, tree: &mut Tree, events: &mut EventBus) -> bool {
    let mut changed = false;

    let mut entity_fragments: IndexMap<String, Vec<NodeId>> = IndexMap::new();
    let mut struct_elements: IndexMap<String, Vec<NodeId>> = IndexMap::new();
    for node in tree.descendants(tree.body()) {
        let Some(element) = tree.element(node) else {
            continue;
        };
        match (&element.entity, &element.id) {
            (Some(marker), _) => entity_fragments
                .entry(marker.entity_id.clone())
                .or_default()
                .push(node),
            (None, Some(id)) => struct_elements.entry(id.clone()).or_default().push(node),
            (None, None) => {}
        }
    }

    for (id, fragments) in entity_fragments {
        let mut occurrences: Vec<Vec<NodeId>> = Vec::new();
        for node in fragments {
            let starts = tree.entity_marker(node).is_some_and(|m| m.boundary.is_start());
            match occurrences.last_mut() {
                Some(current) if !starts => current.push(node),
                _ => occurrences.push(vec![node]),
            }
        }
        let Some(original) = document.entity(&id).cloned() else {
            continue;
        };
        for occurrence in occurrences.into_iter().skip(1) {
            let new_id = document.next_entity_id();
            for node in occurrence {
                if let Some(element) = tree.element_mut(node) {
                    if element.id.as_deref() == Some(id.as_str()) {
                        element.id = Some(new_id.clone());
                    }
                    if let Some(marker) = element.entity.as_mut() {
                        marker.entity_id = new_id.clone();
                    }
                }
            }
            let mut copy = original.clone();
            copy.id = new_id.clone();
            copy.annotation = AnnotationRecord::default();
            document.insert_entity(copy);
            tracing::debug!(original = %id, copy = %new_id, "reassigned duplicated entity");
            events.publish(Event::EntityAdded(new_id));
            changed = true;
        }
    }

    for (id, nodes) in struct_elements {
        let Some(original) = document.struct_node(&id).cloned() else {
            continue;
        };
        for node in nodes.into_iter().skip(1) {
            let new_id = document.next_struct_id();
            if let Some(element) = tree.element_mut(node) {
                element.id = Some(new_id.clone());
            }
            let mut copy = original.clone();
            copy.id = new_id.clone();
            document.insert_struct(copy);
            tracing::debug!(original = %id, copy = %new_id, "reassigned duplicated tag");
            events.publish(Event::TagAdded(new_id));
            changed = true;
        }
    }

    changed
}
