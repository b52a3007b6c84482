//! Arena tree mirroring the editing surface.
//!
//! The tree holds a synthetic body node whose single element child is the
//! document root. Element nodes carry the schema tag name, structure id,
//! entity marker and attributes; text nodes carry character data. Offsets
//! into text nodes are counted in `char`s.
//!
//! Nodes removed from the tree stay in the arena, detached, and are never
//! reached by traversals.

mod edit;
mod node;

use std::collections::HashSet;

pub use node::{Boundary, Element, EntityMarker, Node, NodeData, NodeId};

/// A caret position inside a text node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub node: NodeId,
    /// Character offset within the text node.
    pub offset: usize,
}

impl Position {
    #[must_use]
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

/// A selection between two text positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRange {
    pub start: Position,
    pub end: Position,
}

impl TextRange {
    #[must_use]
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// A range covering the characters `from..to` of one text node.
    #[must_use]
    pub fn within(node: NodeId, from: usize, to: usize) -> Self {
        Self::new(Position::new(node, from), Position::new(node, to))
    }

    #[must_use]
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

const BODY: NodeId = 0;

/// The editable document tree.
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Create a tree holding only the body node.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeData::Body)],
        }
    }

    #[must_use]
    pub fn body(&self) -> NodeId {
        BODY
    }

    /// The document root element (first element child of the body).
    #[must_use]
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(BODY)
            .iter()
            .copied()
            .find(|&child| self.element(child).is_some())
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(Node::new(data));
        self.nodes.len() - 1
    }

    /// Create a detached element.
    pub fn create_element(&mut self, element: Element) -> NodeId {
        self.push(NodeData::Element(element))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(text.into()))
    }

    pub fn append_element(&mut self, parent: NodeId, element: Element) -> NodeId {
        let id = self.create_element(element);
        self.append_child(parent, id);
        id
    }

    pub fn append_text(&mut self, parent: NodeId, text: impl Into<String>) -> NodeId {
        let id = self.create_text(text);
        self.append_child(parent, id);
        id
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn data(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id).map(|node| &node.data)
    }

    #[must_use]
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.data(id) {
            Some(NodeData::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.nodes.get_mut(id).map(|node| &mut node.data) {
            Some(NodeData::Element(element)) => Some(element),
            _ => None,
        }
    }

    #[must_use]
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.data(id) {
            Some(NodeData::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    pub(crate) fn text_mut(&mut self, id: NodeId) -> Option<&mut String> {
        match self.nodes.get_mut(id).map(|node| &mut node.data) {
            Some(NodeData::Text(text)) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_text(&self, id: NodeId) -> bool {
        self.text(id).is_some()
    }

    /// Entity marker of an element, if it is an entity fragment.
    #[must_use]
    pub fn entity_marker(&self, id: NodeId) -> Option<&EntityMarker> {
        self.element(id)?.entity.as_ref()
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id)?.parent
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match self.nodes.get(id) {
            Some(node) => node.children.as_slice(),
            None => &[],
        }
    }

    #[must_use]
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&child| child == id)
    }

    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    #[must_use]
    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index
            .checked_sub(1)
            .and_then(|prev| self.children(parent).get(prev).copied())
    }

    /// Whether `ancestor` is a proper ancestor of `node`.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Nearest proper ancestor matching a predicate.
    pub fn closest_ancestor(&self, node: NodeId, predicate: impl Fn(&Element) -> bool) -> Option<NodeId> {
        let mut current = self.parent(node);
        while let Some(id) = current {
            if self.element(id).is_some_and(&predicate) {
                return Some(id);
            }
            current = self.parent(id);
        }
        None
    }

    /// All descendants of a node in document order, excluding the node.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Every attached node in document order, starting with the body.
    #[must_use]
    pub fn all_nodes(&self) -> Vec<NodeId> {
        let mut nodes = vec![BODY];
        nodes.extend(self.descendants(BODY));
        nodes
    }

    /// Concatenated text of a node and its descendants.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|node| self.text(node))
            .collect()
    }

    /// Elements whose `id` equals the given id, in document order.
    #[must_use]
    pub fn elements_with_id(&self, id: &str) -> Vec<NodeId> {
        self.descendants(BODY)
            .into_iter()
            .filter(|&node| self.element(node).and_then(|el| el.id.as_deref()) == Some(id))
            .collect()
    }

    /// First element whose `id` equals the given id.
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(BODY)
            .into_iter()
            .find(|&node| self.element(node).and_then(|el| el.id.as_deref()) == Some(id))
    }

    /// All fragments of an entity, in document order.
    #[must_use]
    pub fn entity_fragments(&self, entity_id: &str) -> Vec<NodeId> {
        self.descendants(BODY)
            .into_iter()
            .filter(|&node| self.entity_marker(node).is_some_and(|m| m.entity_id == entity_id))
            .collect()
    }

    /// Text of every fragment of an entity, concatenated in document order.
    #[must_use]
    pub fn entity_text(&self, entity_id: &str) -> String {
        self.entity_fragments(entity_id)
            .into_iter()
            .map(|node| self.text_content(node))
            .collect()
    }

    /// Ids of every structure element and entity present in the tree.
    #[must_use]
    pub fn live_ids(&self) -> HashSet<String> {
        let mut ids = HashSet::new();
        for node in self.descendants(BODY) {
            if let Some(element) = self.element(node) {
                if let Some(id) = &element.id {
                    ids.insert(id.clone());
                }
                if let Some(marker) = &element.entity {
                    ids.insert(marker.entity_id.clone());
                }
            }
        }
        ids
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> (Tree, NodeId, NodeId, NodeId) {
        let mut tree = Tree::new();
        let body = tree.body();
        let root = tree.append_element(body, Element::structural("TEI", "struct_1"));
        let p = tree.append_element(root, Element::structural("p", "struct_2"));
        let text = tree.append_text(p, "Hello world");
        (tree, root, p, text)
    }

    #[test]
    fn test_root_element() {
        let (tree, root, _, _) = sample();
        assert_eq!(tree.root_element(), Some(root));
    }

    #[test]
    fn test_navigation() {
        let (mut tree, root, p, text) = sample();
        let p2 = tree.append_element(root, Element::structural("p", "struct_3"));
        assert_eq!(tree.parent(text), Some(p));
        assert_eq!(tree.next_sibling(p), Some(p2));
        assert_eq!(tree.previous_sibling(p2), Some(p));
        assert_eq!(tree.previous_sibling(p), None);
        assert!(tree.is_ancestor(root, text));
        assert!(!tree.is_ancestor(p2, text));
    }

    #[test]
    fn test_descendants_in_document_order() {
        let (mut tree, root, p, text) = sample();
        let p2 = tree.append_element(root, Element::structural("p", "struct_3"));
        let text2 = tree.append_text(p2, "Bye");
        assert_eq!(tree.descendants(root), vec![p, text, p2, text2]);
        assert_eq!(tree.text_content(root), "Hello worldBye");
    }

    #[test]
    fn test_find_by_id() {
        let (tree, _, p, _) = sample();
        assert_eq!(tree.find_by_id("struct_2"), Some(p));
        assert_eq!(tree.find_by_id("struct_9"), None);
    }

    #[test]
    fn test_live_ids_include_entities() {
        let (mut tree, _, p, _) = sample();
        tree.append_element(
            p,
            Element::fragment(EntityMarker::new("ent_4", crate::types::EntityKind::Person, Boundary::Whole)),
        );
        let ids = tree.live_ids();
        assert!(ids.contains("struct_1"));
        assert!(ids.contains("ent_4"));
    }

    #[test]
    fn test_closest_ancestor() {
        let (tree, root, _, text) = sample();
        let found = tree.closest_ancestor(text, |el| el.tag.as_deref() == Some("TEI"));
        assert_eq!(found, Some(root));
    }
}
