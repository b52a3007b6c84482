//! Registry configuration for the bundled entity kinds.

use super::core::KindRegistry;
use super::handlers::{
    CitationHandler, CorrectionHandler, DateHandler, KeywordHandler, LinkHandler, NamedHandler, NoteHandler,
    TitleHandler,
};
use crate::types::EntityKind;

/// Create a kind registry with a handler for every [`EntityKind`].
#[must_use]
pub fn create_kind_registry() -> KindRegistry {
    let mut registry = KindRegistry::new();

    // Kinds wrapping the selected text
    registry.register(NamedHandler::new(EntityKind::Person));
    registry.register(NamedHandler::new(EntityKind::Organization));
    registry.register(NamedHandler::new(EntityKind::Place));
    registry.register(TitleHandler);
    registry.register(DateHandler);
    registry.register(CorrectionHandler);
    registry.register(LinkHandler);

    // Kinds owning their content behind a collapsed marker
    registry.register(NoteHandler);
    registry.register(CitationHandler);
    registry.register(KeywordHandler);

    registry
}
