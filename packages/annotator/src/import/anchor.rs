//! Placing standoff entities and deriving entity contents.

use super::{ImportContext, ImportWarning, PendingStandoff};
use crate::error::{AnnotatorError, Result};
use crate::offset::{text_node_at_offset, Bias};
use crate::tagger::insert_boundary_tags;
use crate::text::title_from_content;
use crate::tree::{Position, TextRange, Tree};
use crate::types::TextAnchor;

/// Insert the fragments of every standoff entity.
///
/// An entity that cannot be placed stays registered without fragments
/// and is reported.
pub(super) fn anchor_standoff(ctx: &mut ImportContext<'_>, tree: &mut Tree) {
    for pending in std::mem::take(&mut ctx.standoff) {
        if let Err(err) = anchor_one(ctx, tree, &pending) {
            ctx.warn(ImportWarning::AnchoringFailed {
                entity_id: pending.entity_id.clone(),
                reason: err.to_string(),
            });
        }
    }
}

fn anchor_one(ctx: &ImportContext<'_>, tree: &mut Tree, pending: &PendingStandoff) -> Result<()> {
    let locate = |anchor: &TextAnchor, bias: Bias| -> Result<Position> {
        let parent = tree
            .find_by_id(&anchor.struct_id)
            .ok_or_else(|| AnnotatorError::UnknownId(anchor.struct_id.clone()))?;
        text_node_at_offset(tree, parent, anchor.offset, bias)
            .ok_or_else(|| AnnotatorError::InvalidRange(format!("offset {} past the end of {}", anchor.offset, anchor.xpath)))
    };
    let start = locate(&pending.start, Bias::Start)?;
    let end = locate(&pending.end, Bias::End)?;
    insert_boundary_tags(
        tree,
        &pending.entity_id,
        pending.kind,
        TextRange::new(start, end),
        ctx.kinds.containment(pending.kind),
        ctx.schema.parent_tag_for(pending.kind),
    )?;
    Ok(())
}

/// Content and title of every entity, from its fragments or its details.
pub(super) fn compute_contents(ctx: &mut ImportContext<'_>, tree: &Tree) {
    let kinds = ctx.kinds;
    for id in ctx.document.entity_ids() {
        let Some(entity) = ctx.document.entity_mut(&id) else {
            continue;
        };
        let Some(handler) = kinds.get(entity.kind) else {
            continue;
        };
        entity.content = handler.content(&entity.info.details, &tree.entity_text(&id));
        entity.title = title_from_content(&entity.content);
    }
}
