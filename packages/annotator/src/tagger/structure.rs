//! Structure tag operations.

use crate::config::{is_reserved_attribute, INVISIBLE_MARKER};
use crate::document::Document;
use crate::error::{AnnotatorError, Result};
use crate::events::Event;
use crate::tree::{Element, NodeId, TextRange, Tree};
use crate::types::{Attributes, StructNode};

use super::{find_new_and_deleted_tags, Tagger};

/// Where a new structure tag goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// As the previous sibling of a node.
    Before(NodeId),
    /// As the next sibling of a node.
    After(NodeId),
    /// Wrapping a node.
    Around(NodeId),
    /// Wrapping all children of a node.
    Inside(NodeId),
    /// Wrapping a selection, or at the caret when collapsed.
    Selection(TextRange),
}

/// The tree element bearing a structure id.
fn struct_element(tree: &Tree, id: &str) -> Option<NodeId> {
    tree.elements_with_id(id)
        .into_iter()
        .find(|&node| tree.entity_marker(node).is_none())
}

fn user_attributes(attributes: &Attributes) -> Attributes {
    attributes
        .iter()
        .filter(|(name, _)| !is_reserved_attribute(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

impl Tagger<'_> {
    fn structural_element(&self, tag: &str, id: &str, attributes: &Attributes, inline_parent: bool) -> Element {
        Element::structural(tag, id)
            .with_attributes(user_attributes(attributes))
            .with_text_allowed(self.schema.can_contain_text(tag))
            .with_inline(inline_parent || !self.schema.is_block_level(tag))
    }

    fn is_inline(tree: &Tree, node: Option<NodeId>) -> bool {
        node.and_then(|node| tree.element(node)).is_some_and(|el| el.inline)
    }

    /// Insert a new structure tag and register it.
    ///
    /// An `xml:id` attribute becomes the tag's id; otherwise a fresh one
    /// is generated. Empty tags get an invisible placeholder so the caret
    /// can enter them.
    pub fn add_structure_tag(
        &mut self,
        document: &mut Document,
        tree: &mut Tree,
        tag: &str,
        attributes: &Attributes,
        placement: Placement,
    ) -> Result<String> {
        self.transaction();
        let id = match attributes.get("xml:id") {
            Some(id) => {
                document.observe_id(id);
                id.clone()
            }
            None => document.next_struct_id(),
        };

        let parent = match placement {
            Placement::Before(node) | Placement::After(node) | Placement::Around(node) => tree.parent(node),
            Placement::Inside(node) => Some(node),
            Placement::Selection(range) => tree.parent(range.start.node),
        };
        let element = self.structural_element(tag, &id, attributes, Self::is_inline(tree, parent));

        match placement {
            Placement::Before(node) | Placement::After(node) => {
                let new = tree.create_element(element);
                tree.append_text(new, INVISIBLE_MARKER.to_string());
                if matches!(placement, Placement::Before(_)) {
                    tree.insert_before(node, new)?;
                } else {
                    tree.insert_after(node, new)?;
                }
            }
            Placement::Around(node) => {
                tree.wrap(node, element)?;
            }
            Placement::Inside(node) => {
                let children = tree.children(node).to_vec();
                let new = tree.create_element(element);
                for child in children {
                    tree.append_child(new, child);
                }
                if tree.children(new).is_empty() {
                    tree.append_text(new, INVISIBLE_MARKER.to_string());
                }
                tree.append_child(node, new);
            }
            Placement::Selection(range) if range.is_collapsed() => {
                let new = tree.create_element(element);
                tree.append_text(new, INVISIBLE_MARKER.to_string());
                tree.insert_at(range.start, new)?;
            }
            Placement::Selection(range) => {
                tree.surround(range.start, range.end, element)?;
            }
        }

        let mut node = StructNode::new(id.clone(), tag);
        node.attributes = user_attributes(attributes);
        node.can_contain_text = self.schema.can_contain_text(tag);
        document.insert_struct(node);
        tracing::debug!(id = %id, tag = %tag, "added structure tag");
        self.events.publish(Event::TagAdded(id.clone()));
        Ok(id)
    }

    /// Change the tag name and attributes of a structure tag.
    ///
    /// A new tag name replaces the element, keeping its children; inside
    /// an inline parent the replacement is forced inline.
    pub fn edit_structure_tag(
        &mut self,
        document: &mut Document,
        tree: &mut Tree,
        id: &str,
        tag: &str,
        attributes: &Attributes,
    ) -> Result<NodeId> {
        let node = struct_element(tree, id).ok_or_else(|| AnnotatorError::UnknownId(id.to_string()))?;
        self.transaction();

        let current_tag = tree.element(node).and_then(|el| el.tag.clone());
        let node = if current_tag.as_deref() == Some(tag) {
            if let Some(element) = tree.element_mut(node) {
                element.attributes = user_attributes(attributes);
            }
            node
        } else {
            let inline_parent = Self::is_inline(tree, tree.parent(node));
            let element = self.structural_element(tag, id, attributes, inline_parent);
            tree.replace_element(node, element)?
        };

        let registered = match document.struct_node_mut(id) {
            Some(registered) => registered,
            None => {
                document.insert_struct(StructNode::new(id, tag));
                document
                    .struct_node_mut(id)
                    .ok_or_else(|| AnnotatorError::UnknownId(id.to_string()))?
            }
        };
        registered.tag_name = tag.to_string();
        registered.attributes = user_attributes(attributes);
        registered.can_contain_text = self.schema.can_contain_text(tag);
        self.events.publish(Event::TagEdited(id.to_string()));
        Ok(node)
    }

    /// Remove a structure tag, keeping its children unless
    /// `remove_contents` is set.
    ///
    /// Entities whose fragments disappear with the contents are moved to
    /// the deletion log.
    pub fn remove_structure_tag(
        &mut self,
        document: &mut Document,
        tree: &mut Tree,
        id: &str,
        remove_contents: bool,
    ) -> Result<()> {
        let node = struct_element(tree, id).ok_or_else(|| AnnotatorError::UnknownId(id.to_string()))?;
        self.transaction();
        let parent = tree.parent(node);
        if remove_contents {
            tree.detach(node);
        } else {
            tree.unwrap(node)?;
        }
        if let Some(parent) = parent {
            tree.normalize(parent);
        }
        document.delete_struct(id);
        self.events.publish(Event::TagRemoved(id.to_string()));
        find_new_and_deleted_tags(document, tree, &mut self.events);
        Ok(())
    }

    /// Empty a structure tag, leaving the tag itself in place.
    pub fn remove_structure_tag_contents(&mut self, document: &mut Document, tree: &mut Tree, id: &str) -> Result<()> {
        let node = struct_element(tree, id).ok_or_else(|| AnnotatorError::UnknownId(id.to_string()))?;
        self.transaction();
        tree.remove_children(node);
        tree.append_text(node, INVISIBLE_MARKER.to_string());
        self.events.publish(Event::TagContentsRemoved(id.to_string()));
        find_new_and_deleted_tags(document, tree, &mut self.events);
        Ok(())
    }
}
