//! Error types for the annotator.
//!
//! Fatal import failures and user-visible validation failures are
//! `AnnotatorError` values. Recoverable per-entity import anomalies are not
//! errors; they are collected as [`crate::import::ImportWarning`]s.

use thiserror::Error;

/// Main error type for the annotator library.
#[derive(Debug, Error)]
pub enum AnnotatorError {
    /// XML parsing failed.
    #[error("XML parsing failed: {0}")]
    XmlParse(#[from] roxmltree::Error),

    /// The declared root element is absent from the document.
    #[error("Root element <{0}> not found in document")]
    RootNotFound(String),

    /// An XPath expression could not be parsed or evaluated.
    #[error("Invalid XPath '{expression}': {reason}")]
    XPath { expression: String, reason: String },

    /// An xpointer string does not follow the supported grammar.
    #[error("Malformed xpointer: '{0}'")]
    Xpointer(String),

    /// Schema configuration could not be loaded.
    #[error("Schema configuration failed: {0}")]
    Schema(#[from] serde_yaml_ng::Error),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An entity was requested without a text selection.
    #[error("Please select some text before adding an entity")]
    NoSelection,

    /// The selection crosses existing markup while overlap is disabled.
    #[error("Selection overlaps existing markup and the document mode does not allow overlap")]
    OverlapNotAllowed,

    /// No entity or structure tag carries the given id.
    #[error("Unknown tag id: {0}")]
    UnknownId(String),

    /// Only entities can be copied.
    #[error("Structure tag {0} cannot be copied, only entities")]
    CannotCopyStructure(String),

    /// Paste was requested with an empty clipboard.
    #[error("No entity has been copied")]
    NothingToPaste,

    /// A tree mutation was attempted on an invalid range or node.
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// An identifier resolver call failed.
    #[error("Identifier resolution failed for {entity_id}: {reason}")]
    Resolution { entity_id: String, reason: String },

    /// Identifier resolution was cancelled before it settled.
    #[error("Identifier resolution cancelled for {0}")]
    ResolutionCancelled(String),
}

/// Result type alias for annotator operations.
pub type Result<T> = std::result::Result<T, AnnotatorError>;
