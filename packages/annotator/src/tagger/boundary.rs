//! Boundary-spanning insertion and lookup of entity fragments.
//!
//! An entity whose selection stays inside one parent is a single `Whole`
//! fragment. One that crosses structural boundaries is split into a
//! `Start` fragment, a `Middle` fragment around every node strictly in
//! between, and an `End` fragment. All fragments carry the same entity id.

use std::collections::HashSet;

use crate::config::INVISIBLE_MARKER;
use crate::error::{AnnotatorError, Result};
use crate::registry::Containment;
use crate::tree::{Boundary, Element, EntityMarker, NodeId, Position, TextRange, Tree};
use crate::types::EntityKind;

fn fragment(entity_id: &str, kind: EntityKind, boundary: Boundary) -> Element {
    Element::fragment(EntityMarker::new(entity_id, kind, boundary))
}

/// The single fragment of an entity, carrying the schema tag and the entity id.
fn whole(entity_id: &str, kind: EntityKind, tag: &str) -> Element {
    let mut element = fragment(entity_id, kind, Boundary::Whole);
    element.tag = Some(tag.to_string());
    element.id = Some(entity_id.to_string());
    element
}

/// Move a split point that would cut a single space off a text node to the
/// node edge next to it. Lone space nodes have zero width, so exported
/// offsets would drift once the space merges back into its neighbour.
fn clear_of_lone_space(tree: &Tree, position: Position) -> Position {
    let Some(text) = tree.text(position.node) else {
        return position;
    };
    let length = text.chars().count();
    if length < 2 {
        return position;
    }
    if position.offset == 1 && text.starts_with(' ') {
        return Position::new(position.node, 0);
    }
    if position.offset + 1 == length && text.ends_with(' ') {
        return Position::new(position.node, length);
    }
    position
}

/// Insert the fragments of an entity over a text range.
///
/// # Arguments
/// * `containment` - `Marker` kinds get one collapsed marker at the range end
/// * `tag` - Schema element of the entity, recorded on `Whole` fragments
///
/// # Returns
/// The first inserted fragment.
pub fn insert_boundary_tags(
    tree: &mut Tree,
    entity_id: &str,
    kind: EntityKind,
    range: TextRange,
    containment: Containment,
    tag: &str,
) -> Result<NodeId> {
    if containment == Containment::Marker {
        let mut element = whole(entity_id, kind, tag);
        if let Some(marker) = element.entity.as_mut() {
            marker.note = true;
        }
        let node = tree.create_element(element);
        tree.append_text(node, INVISIBLE_MARKER.to_string());
        tree.insert_at(range.end, node)?;
        return Ok(node);
    }

    let range = TextRange::new(
        clear_of_lone_space(tree, range.start),
        clear_of_lone_space(tree, range.end),
    );
    let start_parent = tree.parent(range.start.node);
    let end_parent = tree.parent(range.end.node);
    if start_parent.is_none() || end_parent.is_none() {
        return Err(AnnotatorError::InvalidRange("selection is detached".to_string()));
    }
    if start_parent == end_parent {
        return tree.surround(range.start, range.end, whole(entity_id, kind, tag));
    }

    let between = tree.nodes_between(range.start.node, range.end.node);
    let start_length = tree
        .text(range.start.node)
        .map(|text| text.chars().count())
        .ok_or_else(|| AnnotatorError::InvalidRange("selection start is not text".to_string()))?;

    let first = tree.surround(
        range.start,
        Position::new(range.start.node, start_length),
        fragment(entity_id, kind, Boundary::Start),
    )?;
    for node in between {
        tree.wrap(node, fragment(entity_id, kind, Boundary::Middle))?;
    }
    tree.surround(
        Position::new(range.end.node, 0),
        range.end,
        fragment(entity_id, kind, Boundary::End),
    )?;
    tracing::debug!(entity_id = %entity_id, "inserted boundary-spanning fragments");
    Ok(first)
}

/// Find the `wanted` fragment (`Start` or `End`) of an entity, walking
/// from `from` in document order (forward for `End`, backward for `Start`).
///
/// The walk is iterative. Descending pushes onto an ancestor stack and
/// climbing pops it; once the stack is exhausted the walk continues at the
/// parent's sibling without re-examining the parent. A node reached twice
/// ends the search.
#[must_use]
pub fn find_entity_boundary(tree: &Tree, entity_id: &str, wanted: Boundary, from: NodeId) -> Option<NodeId> {
    let forward = match wanted {
        Boundary::End => true,
        Boundary::Start => false,
        Boundary::Middle | Boundary::Whole => return None,
    };
    let step = |node: NodeId| {
        if forward {
            tree.next_sibling(node)
        } else {
            tree.previous_sibling(node)
        }
    };

    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut ancestors: Vec<NodeId> = Vec::new();
    let mut current = Some(from);

    while let Some(node) = current {
        if !visited.insert(node) {
            tracing::warn!(node = node, entity_id = %entity_id, "boundary search revisited a node");
            return None;
        }
        if let Some(marker) = tree.entity_marker(node) {
            if marker.entity_id == entity_id && marker.boundary == wanted {
                return Some(node);
            }
        }

        let children = tree.children(node);
        let first_child = if forward { children.first() } else { children.last() };
        if let Some(&child) = first_child {
            ancestors.push(node);
            current = Some(child);
            continue;
        }

        let mut climbing = node;
        current = loop {
            if let Some(sibling) = step(climbing) {
                break Some(sibling);
            }
            match ancestors.pop() {
                Some(parent) => climbing = parent,
                None => match tree.parent(climbing) {
                    Some(parent) => climbing = parent,
                    None => break None,
                },
            }
        };
    }
    None
}

/// The fragment pairing with `node`: itself for `Whole`, the `End` for a
/// `Start` and the `Start` for an `End`.
#[must_use]
pub fn corresponding_entity_tag(tree: &Tree, node: NodeId) -> Option<NodeId> {
    let marker = tree.entity_marker(node)?;
    match marker.boundary {
        Boundary::Whole => Some(node),
        Boundary::Start => find_entity_boundary(tree, &marker.entity_id, Boundary::End, node),
        Boundary::End => find_entity_boundary(tree, &marker.entity_id, Boundary::Start, node),
        Boundary::Middle => None,
    }
}
