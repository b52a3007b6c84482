//! Entities marked directly in the document with an `annotationId`.

use roxmltree::Node;

use super::{is_rdf_block, ImportContext, ImportWarning};
use crate::config::ANNOTATION_ID_ATTR;
use crate::types::{EntityAnnotation, EntityKind, Range};
use crate::xml::{element_children, get_tag_name};

/// Register every element bearing an `annotationId` that no RDF
/// annotation claimed already.
///
/// Such entities have no URIs yet and stay pending until they are
/// resolved.
pub(super) fn collect_inline_entities(ctx: &mut ImportContext<'_>, node: Node<'_, '_>) {
    for child in element_children(node) {
        if is_rdf_block(child) {
            continue;
        }
        if let Some((_, kind)) = ctx.anchors.get(&child.id()) {
            if !ctx.owns_children(*kind) {
                collect_inline_entities(ctx, child);
            }
            continue;
        }
        let Some(annotation_id) = child.attribute(ANNOTATION_ID_ATTR) else {
            collect_inline_entities(ctx, child);
            continue;
        };
        let tag = get_tag_name(child);
        let Some(kind) = kind_for_element(ctx, child) else {
            ctx.warn(ImportWarning::UnknownEntityTag { tag: tag.to_string() });
            collect_inline_entities(ctx, child);
            continue;
        };
        let kinds = ctx.kinds;
        let Some(handler) = kinds.get(kind) else {
            collect_inline_entities(ctx, child);
            continue;
        };

        let id = ctx.claim_entity_id(Some(annotation_id));
        let info = handler.info_from_element(child, ctx.schema);
        let mut entity = EntityAnnotation::new(id.clone(), kind).with_info(info);
        entity.annotation.range = Some(Range::Inline {
            node_id: id.clone(),
            xpath: format!("//{tag}[@{ANNOTATION_ID_ATTR}=\"{annotation_id}\"]"),
        });
        tracing::debug!(entity_id = %id, kind = %kind.as_str(), "registered inline entity");
        ctx.document.insert_entity(entity);
        ctx.anchors.insert(child.id(), (id, kind));

        if !handler.owns_children() {
            collect_inline_entities(ctx, child);
        }
    }
}

/// Entity kind of an element.
///
/// Several kinds can share a tag (a TEI `note` is a note, a citation or a
/// keyword); the first child element then tells them apart.
fn kind_for_element(ctx: &ImportContext<'_>, node: Node<'_, '_>) -> Option<EntityKind> {
    let tag = get_tag_name(node);
    let first_child = element_children(node).next().map(get_tag_name);
    let by_child = first_child.and_then(|child_tag| {
        ctx.kinds.registered_kinds().into_iter().find(|kind| {
            ctx.schema.tag_name_for_entity_type(*kind) == tag && ctx.schema.child_tag_for(*kind) == Some(child_tag)
        })
    });
    by_child.or_else(|| ctx.schema.entity_type_for_tag(tag))
}

#[cfg(test)]
mod tests {
    use crate::import::Importer;
    use crate::schema::tei;
    use crate::types::{EntityKind, Range};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_nested_inline_entities() {
        let xml = r#"<TEI><p><persName annotationId="ent_1">Lord <placeName annotationId="ent_2">Byron</placeName></persName></p></TEI>"#;
        let imported = Importer::new(tei()).import(xml).unwrap();
        assert_eq!(imported.document.entity("ent_1").unwrap().content, "Lord Byron");
        assert_eq!(imported.document.entity("ent_2").unwrap().kind, EntityKind::Place);
        assert_eq!(imported.tree.entity_text("ent_2"), "Byron");
    }

    #[test]
    fn test_duplicate_annotation_ids_get_fresh_ids() {
        let xml = r#"<TEI><p><persName annotationId="ent_1">Ada</persName> and <persName annotationId="ent_1">Ada</persName></p></TEI>"#;
        let imported = Importer::new(tei()).import(xml).unwrap();
        let doc = &imported.document;
        assert_eq!(doc.entity_count(), 2);
        let ids = doc.entity_ids();
        assert!(ids.contains(&"ent_1".to_string()));
        let other = ids.iter().find(|id| *id != "ent_1").unwrap();
        assert_eq!(imported.tree.entity_text(other), "Ada");
        assert!(matches!(
            &doc.entity(other).unwrap().annotation.range,
            Some(Range::Inline { node_id, .. }) if node_id == other
        ));
    }

    #[test]
    fn test_title_keeps_level() {
        let xml = r#"<TEI><p><title annotationId="ent_4" level="m">Frankenstein</title></p></TEI>"#;
        let imported = Importer::new(tei()).import(xml).unwrap();
        let title = imported.document.entity("ent_4").unwrap();
        assert_eq!(title.kind, EntityKind::Title);
        assert_eq!(title.content, "Frankenstein");
    }
}
