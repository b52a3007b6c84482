//! Kind registry mapping entity kinds to handlers.

use std::collections::HashMap;

use super::handler::{Containment, KindHandler};
use crate::config::CNT_NS;
use crate::types::EntityKind;

/// `rdf:type` of literal bodies shared by several kinds.
pub const CONTENT_AS_TEXT: &str = "http://www.w3.org/2011/content#ContentAsText";

/// Registry mapping entity kinds to handlers.
///
/// Replaces per-kind branching in importer, exporter and tagger with a
/// single lookup table.
pub struct KindRegistry {
    handlers: HashMap<EntityKind, Box<dyn KindHandler>>,
}

impl KindRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under the kind it reports.
    pub fn register(&mut self, handler: impl KindHandler + 'static) {
        self.handlers.insert(handler.kind(), Box::new(handler));
    }

    /// Get the handler for a kind.
    #[must_use]
    pub fn get(&self, kind: EntityKind) -> Option<&dyn KindHandler> {
        self.handlers.get(&kind).map(|h| h.as_ref())
    }

    #[must_use]
    pub fn has_handler(&self, kind: EntityKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Containment of a kind, `Wrap` when unregistered.
    #[must_use]
    pub fn containment(&self, kind: EntityKind) -> Containment {
        self.get(kind).map_or(Containment::Wrap, |h| h.containment())
    }

    /// Identify the kind of an annotation from its body type and motivation.
    ///
    /// A specific body type wins. Literal bodies (`cnt:ContentAsText`) and
    /// bodiless annotations are told apart by their motivation.
    #[must_use]
    pub fn kind_for_annotation(&self, body_type: Option<&str>, motivation: Option<&str>) -> Option<EntityKind> {
        let specific = body_type.filter(|uri| *uri != CONTENT_AS_TEXT && !uri.starts_with(CNT_NS));
        let mut kinds: Vec<EntityKind> = self.handlers.keys().copied().collect();
        kinds.sort();
        if let Some(uri) = specific {
            return kinds
                .into_iter()
                .find(|kind| self.get(*kind).and_then(|h| h.body_type()) == Some(uri));
        }
        let motivation = motivation?;
        kinds.into_iter().find(|kind| {
            self.get(*kind).is_some_and(|h| {
                h.motivation() == motivation && matches!(h.body_type(), None | Some(CONTENT_AS_TEXT))
            })
        })
    }

    /// Return all registered kinds in declaration order.
    #[must_use]
    pub fn registered_kinds(&self) -> Vec<EntityKind> {
        EntityKind::ALL
            .into_iter()
            .filter(|kind| self.handlers.contains_key(kind))
            .collect()
    }
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::new()
    }
}
