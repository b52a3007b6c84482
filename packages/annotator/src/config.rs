//! Configuration constants and validation functions for the annotator.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{AnnotatorError, Result};

/// Prefix of entity ids (`ent_12`).
pub const ENTITY_ID_PREFIX: &str = "ent_";

/// Prefix of structure node ids (`struct_7`).
pub const STRUCT_ID_PREFIX: &str = "struct_";

/// Attribute that declares an inline entity anchor in imported XML.
pub const ANNOTATION_ID_ATTR: &str = "annotationId";

/// Attribute that marks the ancestor a standoff offset is counted from.
pub const OFFSET_ID_ATTR: &str = "offsetId";

/// Editor-side attribute names that never reach exported XML and cannot be
/// edited by users.
pub const RESERVED_ATTRIBUTES: &[&str] = &["_entity", "_type", "_tag", "_textallowed", "id", "name", "class"];

/// Anchor attributes that only live between import steps or inside an
/// export snapshot.
pub const TRANSIENT_ATTRIBUTES: &[&str] = &[ANNOTATION_ID_ATTR, OFFSET_ID_ATTR, "cwrcStructId"];

/// Zero-width placeholder kept inside empty elements so the editing surface
/// does not collapse them. Stripped from exported output.
pub const INVISIBLE_MARKER: char = '\u{FEFF}';

/// XML declaration prepended to every export.
pub const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// Maximum number of characters of content used for an entity title.
pub const TITLE_MAX_CHARS: usize = 34;

/// Base URI used by the in-memory identifier resolver.
pub const DEFAULT_BASE_URI: &str = "http://id.cwrc.ca";

/// Substring identifying annotation descriptions by their `rdf:about` URI.
pub const ANNOTATION_URI_MARKER: &str = "id.cwrc.ca/annotation";

/// RDF syntax namespace.
pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

/// Custom namespace carrying mode, certainty, attributes and provenance.
pub const CW_NS: &str = "http://cwrc.ca/ns/cw#";

/// Open Annotation namespace.
pub const OA_NS: &str = "http://www.w3.org/ns/oa#";

/// Content-in-RDF namespace used for literal note, keyword and correction bodies.
pub const CNT_NS: &str = "http://www.w3.org/2011/content#";

/// XML Schema datatypes namespace (`xsd:date`).
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";

/// Namespace bound to the `xml:` prefix.
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// `rdf:datatype` value of descriptions whose text is a JSON-LD entity.
pub const JSON_LD_DATATYPE: &str = "http://www.w3.org/TR/json-ld/";

/// Trailing number of an id (`ent_12` -> `12`).
#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static ID_SUFFIX_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)$").expect("valid regex"));

/// Check whether an attribute belongs to the editor rather than the document.
///
/// Reserved names, transient anchor names and anything starting with `_`
/// are excluded from export and from user-editable attribute sets.
///
/// # Examples
/// ```
/// use standoff_annotator::config::is_reserved_attribute;
///
/// assert!(is_reserved_attribute("_tag"));
/// assert!(is_reserved_attribute("offsetId"));
/// assert!(!is_reserved_attribute("rend"));
/// ```
#[must_use]
pub fn is_reserved_attribute(name: &str) -> bool {
    name.starts_with('_') || RESERVED_ATTRIBUTES.contains(&name) || TRANSIENT_ATTRIBUTES.contains(&name)
}

/// Validate an XPath for use inside an xpointer.
///
/// # Arguments
/// * `xpath` - The expression to embed
///
/// # Returns
/// * `Ok(())` if the expression is non-empty and free of parentheses
/// * `Err(AnnotatorError::Xpointer)` otherwise
///
/// # Examples
/// ```
/// use standoff_annotator::config::validate_xpath;
///
/// assert!(validate_xpath("//p[@offsetId=\"struct_3\"]").is_ok());
/// assert!(validate_xpath("//p[position()=1]").is_err());
/// ```
pub fn validate_xpath(xpath: &str) -> Result<()> {
    if xpath.trim().is_empty() || xpath.contains(['(', ')']) {
        return Err(AnnotatorError::Xpointer(xpath.to_string()));
    }
    Ok(())
}

/// Largest imported id suffix the id counter follows. Larger suffixes are
/// left behind; the counter cannot realistically reach them.
pub const MAX_OBSERVED_ID_SUFFIX: u64 = u64::MAX / 2;

/// Extract the numeric suffix of an id, if any.
///
/// # Examples
/// ```
/// use standoff_annotator::config::id_suffix;
///
/// assert_eq!(id_suffix("struct_41"), Some(41));
/// assert_eq!(id_suffix("intro"), None);
/// ```
#[must_use]
pub fn id_suffix(id: &str) -> Option<u64> {
    ID_SUFFIX_PATTERN
        .captures(id)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
