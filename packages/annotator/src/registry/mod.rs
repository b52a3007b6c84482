//! Per-kind lookup table.
//!
//! Every entity kind has one [`KindHandler`] describing how it is marked up
//! inline, how it is described in RDF and how its content is derived.
//! Importer, exporter and tagger dispatch through the [`KindRegistry`].

mod config;
mod core;
mod handler;
pub mod handlers;

pub use config::create_kind_registry;
pub use core::{KindRegistry, CONTENT_AS_TEXT};
pub use handler::{
    base_info, body_texts, certainty_from_uri, certainty_to_uri, entity_attributes, free_attributes, markup_or_escaped,
    BodyProperty, Containment, KindHandler, CERTAINTY_ATTR,
};
