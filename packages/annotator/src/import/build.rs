//! Building the editable tree from the parsed document.

use roxmltree::{Node, NodeType};

use super::{is_rdf_block, ImportContext};
use crate::config::{is_reserved_attribute, INVISIBLE_MARKER, OFFSET_ID_ATTR};
use crate::registry::Containment;
use crate::tree::{Boundary, Element, EntityMarker, NodeId, Tree};
use crate::types::{Attributes, EntityKind, StructNode};
use crate::xml::{find_child, get_tag_name, get_text, qualified_attributes, qualified_tag_name};

/// Build the tree below its body node, registering every structural
/// element on the way.
pub(super) fn build_tree(ctx: &mut ImportContext<'_>, root: Node<'_, '_>) -> Tree {
    let mut tree = Tree::new();
    let body = tree.body();
    build_node(ctx, &mut tree, body, root, false);
    tree
}

fn build_node(ctx: &mut ImportContext<'_>, tree: &mut Tree, parent: NodeId, node: Node<'_, '_>, force_inline: bool) {
    match node.node_type() {
        NodeType::Text => {
            if let Some(text) = node.text() {
                tree.append_text(parent, text);
            }
        }
        NodeType::Element if is_rdf_block(node) => {}
        NodeType::Element => match ctx.anchors.get(&node.id()).cloned() {
            Some((entity_id, kind)) => build_entity(ctx, tree, parent, node, &entity_id, kind),
            None => build_structure(ctx, tree, parent, node, force_inline),
        },
        _ => {}
    }
}

fn build_entity(
    ctx: &mut ImportContext<'_>,
    tree: &mut Tree,
    parent: NodeId,
    node: Node<'_, '_>,
    entity_id: &str,
    kind: EntityKind,
) {
    let mut marker = EntityMarker::new(entity_id, kind, Boundary::Whole);
    let containment = ctx.kinds.containment(kind);
    marker.note = containment == Containment::Marker;
    let mut element = Element::fragment(marker);
    element.tag = Some(ctx.schema.parent_tag_for(kind).to_string());
    element.id = Some(entity_id.to_string());
    let fragment = tree.append_element(parent, element);

    if containment == Containment::Marker {
        tree.append_text(fragment, INVISIBLE_MARKER.to_string());
    } else if ctx.owns_children(kind) {
        let text = ctx
            .schema
            .text_tag_for(kind)
            .and_then(|tag| find_child(node, tag))
            .map_or_else(|| get_text(node), get_text);
        tree.append_text(fragment, text);
    } else {
        for child in node.children() {
            build_node(ctx, tree, fragment, child, true);
        }
    }
}

fn build_structure(ctx: &mut ImportContext<'_>, tree: &mut Tree, parent: NodeId, node: Node<'_, '_>, force_inline: bool) {
    let tag = qualified_tag_name(node);
    let id = structure_id(ctx, node);
    let attributes: Attributes = qualified_attributes(node)
        .into_iter()
        .filter(|(name, _)| !is_reserved_attribute(name))
        .map(|(name, value)| (name, value.to_string()))
        .collect();
    let local = get_tag_name(node);
    let inline = force_inline || !ctx.schema.is_block_level(local);
    let text_allowed = ctx.schema.can_contain_text(local);

    let mut struct_node = StructNode::new(id.clone(), tag.clone());
    struct_node.attributes = attributes.clone();
    struct_node.can_contain_text = text_allowed;
    ctx.document.insert_struct(struct_node);

    let element = Element::structural(tag, id)
        .with_attributes(attributes)
        .with_inline(inline)
        .with_text_allowed(text_allowed);
    let created = tree.append_element(parent, element);
    if node.children().all(|child| !child.is_element() && !child.is_text()) {
        tree.append_text(created, INVISIBLE_MARKER.to_string());
        return;
    }
    for child in node.children() {
        build_node(ctx, tree, created, child, inline);
    }
}

/// Id of a structural element: the one a standoff selector addressed, an
/// unused `offsetId`, or a fresh one.
fn structure_id(ctx: &mut ImportContext<'_>, node: Node<'_, '_>) -> String {
    if let Some(id) = ctx.struct_ids.get(&node.id()) {
        return id.clone();
    }
    match node.attribute(OFFSET_ID_ATTR) {
        Some(id) if ctx.document.struct_node(id).is_none() && ctx.document.entity(id).is_none() => id.to_string(),
        _ => ctx.document.next_struct_id(),
    }
}
