//! Standoff Annotator
//!
//! An annotation engine that keeps an editable document tree and a
//! registry of semantic entities in sync with an XML document carrying
//! inline entity markup and RDF standoff annotations.
//! This library provides functionality for:
//! - Importing XML with embedded RDF/XML or JSON-LD annotations
//! - Exporting back to XML, falling back to standoff ranges for overlapping entities
//! - Tagging: inserting, editing, removing, copying and pasting entities and tags
//!
//! # Architecture
//!
//! - [`document`]: the registry of structure nodes, entities and triples
//! - [`offset`]: character offsets and xpointer addressing
//! - [`overlap`]: containment and overlap between entity spans
//! - [`import`] / [`export`]: conversion between XML and the editable tree
//! - [`tagger`]: mutation operations on the tree and registry
//! - [`registry`]: per-kind behavior, consulted by all of the above
//!
//! # Example
//!
//! ```ignore
//! use standoff_annotator::{schema::tei, Exporter, Importer};
//!
//! let mut imported = Importer::new(tei()).import(&xml)?;
//! let output = Exporter::new(tei()).export_document(&mut imported.document, &imported.tree, true, false)?;
//! println!("{}", output.xml());
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod events;
pub mod export;
pub mod import;
pub mod jsonld;
pub mod offset;
pub mod overlap;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod tagger;
pub mod text;
pub mod tree;
pub mod types;
pub mod undo;
pub mod xml;

// Re-export commonly used items
pub use document::Document;
pub use error::{AnnotatorError, Result};
pub use events::{Event, EventBus};
pub use export::{ExportOptions, ExportOutput, Exporter, RdfFormat};
pub use import::{ImportOptions, ImportWarning, Imported, Importer};
pub use offset::Xpointer;
pub use overlap::{determine_relationships, Interval, Relations};
pub use resolver::{IdentifierResolver, SequentialResolver};
pub use schema::{Schema, SchemaMapper};
pub use tagger::{Placement, SelectionStatus, Tagger};
pub use tree::{Position, TextRange, Tree};
pub use types::{EntityAnnotation, EntityInfo, EntityKind, KindInfo, Mode, Range, StructNode, Triple};
pub use undo::{NoopUndo, UndoHost};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, "0.1.0");
    }

    #[test]
    fn test_reexports() {
        let _kind = EntityKind::Person;
        let _mode = Mode::default();
        let _err = AnnotatorError::NoSelection;
    }
}
