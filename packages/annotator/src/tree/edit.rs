//! Structural mutations of the editable tree.
//!
//! These mirror the DOM operations the editing surface offers: splitting
//! text, wrapping and unwrapping nodes, surrounding a range and normalizing
//! adjacent text nodes. Invalid ranges are reported as
//! [`AnnotatorError::InvalidRange`] and leave the tree untouched.

use super::{Element, NodeId, Position, Tree, BODY};
use crate::error::{AnnotatorError, Result};

fn invalid(reason: impl Into<String>) -> AnnotatorError {
    AnnotatorError::InvalidRange(reason.into())
}

/// Byte index of the `chars`-th character, or the string length.
fn byte_index(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map_or(text.len(), |(index, _)| index)
}

impl Tree {
    /// Detach a node from its parent. The node keeps its own subtree and
    /// stays in the arena until the tree is [compacted](Tree::compacted).
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            if let Some(node) = self.nodes.get_mut(parent) {
                node.children.retain(|&child| child != id);
            }
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = None;
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_child(parent, usize::MAX, child);
    }

    /// Insert `child` at `index` among the children of `parent`, clamped to
    /// the number of children.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if parent == child || self.is_ancestor(child, parent) {
            return;
        }
        self.detach(child);
        if let Some(node) = self.nodes.get_mut(parent) {
            let index = index.min(node.children.len());
            node.children.insert(index, child);
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
    }

    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) -> Result<()> {
        self.detach(node);
        let parent = self
            .parent(reference)
            .ok_or_else(|| invalid(format!("node {reference} has no parent")))?;
        let index = self.index_in_parent(reference).unwrap_or(0);
        self.insert_child(parent, index, node);
        Ok(())
    }

    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) -> Result<()> {
        self.detach(node);
        let parent = self
            .parent(reference)
            .ok_or_else(|| invalid(format!("node {reference} has no parent")))?;
        let index = self.index_in_parent(reference).map_or(usize::MAX, |i| i + 1);
        self.insert_child(parent, index, node);
        Ok(())
    }

    pub fn remove_children(&mut self, id: NodeId) {
        for child in self.children(id).to_vec() {
            self.detach(child);
        }
    }

    /// Split a text node at a character offset.
    ///
    /// The node keeps `[..at]`; the returned new sibling holds `[at..]`.
    pub fn split_text(&mut self, id: NodeId, at: usize) -> Result<NodeId> {
        let text = self
            .text(id)
            .ok_or_else(|| invalid(format!("node {id} is not a text node")))?;
        let length = text.chars().count();
        if at > length {
            return Err(invalid(format!("offset {at} beyond text length {length}")));
        }
        let split = byte_index(text, at);
        let tail = text[split..].to_string();
        if let Some(text) = self.text_mut(id) {
            text.truncate(split);
        }
        let new = self.create_text(tail);
        if self.parent(id).is_some() {
            self.insert_after(id, new)?;
        }
        Ok(new)
    }

    /// Wrap a node in a new element placed at its position.
    pub fn wrap(&mut self, node: NodeId, element: Element) -> Result<NodeId> {
        let parent = self
            .parent(node)
            .ok_or_else(|| invalid(format!("node {node} has no parent")))?;
        let index = self.index_in_parent(node).unwrap_or(0);
        let wrapper = self.create_element(element);
        self.insert_child(parent, index, wrapper);
        self.append_child(wrapper, node);
        Ok(wrapper)
    }

    /// Replace an element by its children.
    pub fn unwrap(&mut self, node: NodeId) -> Result<()> {
        let parent = self
            .parent(node)
            .ok_or_else(|| invalid(format!("node {node} has no parent")))?;
        let index = self.index_in_parent(node).unwrap_or(0);
        let children = self.children(node).to_vec();
        self.detach(node);
        for (offset, child) in children.into_iter().enumerate() {
            self.insert_child(parent, index + offset, child);
        }
        Ok(())
    }

    /// Replace an element by a new one that adopts its children.
    pub fn replace_element(&mut self, node: NodeId, element: Element) -> Result<NodeId> {
        let replacement = self.create_element(element);
        self.insert_before(node, replacement)?;
        for child in self.children(node).to_vec() {
            self.append_child(replacement, child);
        }
        self.detach(node);
        Ok(replacement)
    }

    /// Wrap the content between two text positions sharing a parent.
    pub fn surround(&mut self, start: Position, end: Position, element: Element) -> Result<NodeId> {
        if !self.is_text(start.node) || !self.is_text(end.node) {
            return Err(invalid("range boundaries must be text nodes"));
        }
        let parent = self
            .parent(start.node)
            .ok_or_else(|| invalid("range start is detached"))?;
        if self.parent(end.node) != Some(parent) {
            return Err(invalid("range start and end do not share a parent"));
        }

        if start.node == end.node {
            if end.offset < start.offset {
                return Err(invalid("range end precedes start"));
            }
            let middle = self.split_text(start.node, start.offset)?;
            self.split_text(middle, end.offset - start.offset)?;
            return self.wrap(middle, element);
        }

        let start_index = self.index_in_parent(start.node).unwrap_or(0);
        let end_index = self.index_in_parent(end.node).unwrap_or(0);
        if end_index < start_index {
            return Err(invalid("range end precedes start"));
        }

        let first = self.split_text(start.node, start.offset)?;
        self.split_text(end.node, end.offset)?;
        let first_index = self.index_in_parent(first).unwrap_or(0);
        let last_index = self.index_in_parent(end.node).unwrap_or(first_index);
        let covered: Vec<NodeId> = self
            .children(parent)
            .get(first_index..=last_index)
            .map(<[NodeId]>::to_vec)
            .unwrap_or_default();

        let wrapper = self.create_element(element);
        self.insert_child(parent, first_index, wrapper);
        for node in covered {
            self.append_child(wrapper, node);
        }
        Ok(wrapper)
    }

    /// Copy of the tree holding only the nodes reachable from the body,
    /// renumbered in document order.
    #[must_use]
    pub fn compacted(&self) -> Tree {
        let mut compact = Tree::new();
        let mut pending: Vec<(NodeId, NodeId)> =
            self.children(BODY).iter().rev().map(|&child| (child, BODY)).collect();
        while let Some((node, parent)) = pending.pop() {
            let Some(data) = self.data(node) else {
                continue;
            };
            let copy = compact.push(data.clone());
            compact.append_child(parent, copy);
            pending.extend(self.children(node).iter().rev().map(|&child| (child, copy)));
        }
        compact
    }

    /// Insert a node at a caret position, splitting the text node there.
    pub fn insert_at(&mut self, position: Position, node: NodeId) -> Result<()> {
        let tail = self.split_text(position.node, position.offset)?;
        self.insert_before(tail, node)
    }

    /// Merge adjacent text nodes and drop empty ones below a node.
    pub fn normalize(&mut self, id: NodeId) {
        let mut parents = vec![id];
        parents.extend(self.descendants(id));
        for parent in parents {
            if self.is_text(parent) {
                continue;
            }
            let mut previous_text: Option<NodeId> = None;
            for child in self.children(parent).to_vec() {
                match self.text(child).map(str::to_string) {
                    Some(text) if text.is_empty() => self.detach(child),
                    Some(text) => match previous_text {
                        Some(previous) => {
                            if let Some(previous) = self.text_mut(previous) {
                                previous.push_str(&text);
                            }
                            self.detach(child);
                        }
                        None => previous_text = Some(child),
                    },
                    None => previous_text = None,
                }
            }
        }
    }

    /// Next node in document order that is not a descendant of `node`.
    fn following(&self, node: NodeId) -> Option<NodeId> {
        let mut current = node;
        loop {
            if let Some(next) = self.next_sibling(current) {
                return Some(next);
            }
            current = self.parent(current)?;
        }
    }

    /// The maximal nodes lying strictly between `start` and `end` in
    /// document order, excluding their ancestors.
    #[must_use]
    pub fn nodes_between(&self, start: NodeId, end: NodeId) -> Vec<NodeId> {
        let mut between = Vec::new();
        if start == end {
            return between;
        }
        let mut current = start;
        while let Some(mut next) = self.following(current) {
            while next != end && self.is_ancestor(next, end) {
                match self.children(next).first() {
                    Some(&child) => next = child,
                    None => break,
                }
            }
            if next == end {
                break;
            }
            between.push(next);
            current = next;
        }
        between
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Boundary, EntityMarker};
    use crate::types::EntityKind;
    use pretty_assertions::assert_eq;

    fn paragraph(text: &str) -> (Tree, NodeId, NodeId) {
        let mut tree = Tree::new();
        let body = tree.body();
        let p = tree.append_element(body, Element::structural("p", "struct_1"));
        let text = tree.append_text(p, text);
        (tree, p, text)
    }

    fn marker() -> Element {
        Element::fragment(EntityMarker::new("ent_1", EntityKind::Person, Boundary::Whole))
    }

    #[test]
    fn test_split_text_multibyte() {
        let (mut tree, p, text) = paragraph("Ærø ö");
        let tail = tree.split_text(text, 2).unwrap();
        assert_eq!(tree.text(text), Some("Ær"));
        assert_eq!(tree.text(tail), Some("ø ö"));
        assert_eq!(tree.children(p), &[text, tail]);
    }

    #[test]
    fn test_compacted_drops_detached_nodes() {
        let (mut tree, p, text) = paragraph("Hello Ada Lovelace");
        let wrapper = tree
            .surround(Position::new(text, 6), Position::new(text, 9), marker())
            .unwrap();
        tree.unwrap(wrapper).unwrap();
        tree.normalize(p);
        let orphan = tree.create_text("lost");
        assert_eq!(tree.parent(orphan), None);

        let compact = tree.compacted();
        assert_eq!(compact.nodes.len(), 3);
        assert!(compact.nodes.len() < tree.nodes.len());
        assert_eq!(compact.all_nodes(), vec![0, 1, 2]);
        let compact_p = compact.children(compact.body())[0];
        assert_eq!(compact.element(compact_p), tree.element(p));
        assert_eq!(compact.text_content(compact_p), "Hello Ada Lovelace");
        assert_eq!(compact.text_content(compact.body()), tree.text_content(tree.body()));
    }

    #[test]
    fn test_split_text_out_of_bounds() {
        let (mut tree, _, text) = paragraph("abc");
        assert!(tree.split_text(text, 4).is_err());
    }

    #[test]
    fn test_surround_within_text_node() {
        let (mut tree, p, text) = paragraph("Hello Ada Lovelace!");
        let wrapper = tree
            .surround(Position::new(text, 6), Position::new(text, 18), marker())
            .unwrap();
        assert_eq!(tree.text_content(wrapper), "Ada Lovelace");
        assert_eq!(tree.text_content(p), "Hello Ada Lovelace!");
        assert_eq!(tree.children(p).len(), 3);
    }

    #[test]
    fn test_surround_across_siblings() {
        let (mut tree, p, first) = paragraph("one ");
        let hi = tree.append_element(p, Element::structural("hi", "struct_2"));
        tree.append_text(hi, "two");
        let last = tree.append_text(p, " three");
        let wrapper = tree
            .surround(Position::new(first, 2), Position::new(last, 3), marker())
            .unwrap();
        assert_eq!(tree.text_content(wrapper), "e two th");
        assert_eq!(tree.text_content(p), "one two three");
    }

    #[test]
    fn test_surround_rejects_different_parents() {
        let (mut tree, _, first) = paragraph("one");
        let body = tree.body();
        let p2 = tree.append_element(body, Element::structural("p", "struct_2"));
        let second = tree.append_text(p2, "two");
        let result = tree.surround(Position::new(first, 0), Position::new(second, 1), marker());
        assert!(result.is_err());
    }

    #[test]
    fn test_unwrap_keeps_children_in_place() {
        let (mut tree, p, text) = paragraph("Hello Ada");
        let wrapper = tree
            .surround(Position::new(text, 6), Position::new(text, 9), marker())
            .unwrap();
        tree.unwrap(wrapper).unwrap();
        tree.normalize(p);
        assert_eq!(tree.children(p).len(), 1);
        assert_eq!(tree.text_content(p), "Hello Ada");
    }

    #[test]
    fn test_nodes_between_paragraphs() {
        let mut tree = Tree::new();
        let body = tree.body();
        let div = tree.append_element(body, Element::structural("div", "struct_1"));
        let p1 = tree.append_element(div, Element::structural("p", "struct_2"));
        let t1 = tree.append_text(p1, "first");
        let mid = tree.append_element(div, Element::structural("p", "struct_3"));
        tree.append_text(mid, "middle");
        let p2 = tree.append_element(div, Element::structural("p", "struct_4"));
        let t2 = tree.append_text(p2, "last");
        assert_eq!(tree.nodes_between(t1, t2), vec![mid]);
    }

    #[test]
    fn test_insert_at_splits_text() {
        let (mut tree, p, text) = paragraph("abcd");
        let node = tree.create_text("X");
        tree.insert_at(Position::new(text, 2), node).unwrap();
        assert_eq!(tree.text_content(p), "abXcd");
    }

    #[test]
    fn test_replace_element_adopts_children() {
        let (mut tree, p, text) = paragraph("abc");
        let replacement = tree
            .replace_element(p, Element::structural("head", "struct_1"))
            .unwrap();
        assert_eq!(tree.children(replacement), &[text]);
        assert_eq!(tree.parent(p), None);
    }
}
