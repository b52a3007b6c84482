//! Character offsets and the xpointer addressing scheme.
//!
//! Offsets are counted over the text content of an ancestor in document
//! order. A text node consisting of a single space, or only of the
//! invisible placeholder marker, counts as zero-width. Editing surfaces
//! insert such nodes as padding around inline markup, and they never
//! reach exported text as content.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::{validate_xpath, INVISIBLE_MARKER, OFFSET_ID_ATTR};
use crate::document::Document;
use crate::error::{AnnotatorError, Result};
use crate::tree::{NodeId, Position, Tree};

pub use crate::xml::resolve_xpath;

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static XPOINTER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^xpointer\((string-range\()?([^()]*)\)+$").expect("valid regex")
});

/// Width of a text node's data for offset purposes.
#[must_use]
pub fn text_width(text: &str) -> usize {
    if text == " " || text.chars().all(|c| c == INVISIBLE_MARKER) {
        return 0;
    }
    text.chars().count()
}

/// Width of all text below a node (or of the node itself if it is text).
#[must_use]
pub fn node_width(tree: &Tree, node: NodeId) -> usize {
    if let Some(text) = tree.text(node) {
        return text_width(text);
    }
    tree.descendants(node)
        .into_iter()
        .filter_map(|n| tree.text(n))
        .map(text_width)
        .sum()
}

/// Offset of the first descendant of `ancestor` matching `is_target`.
///
/// Returns `None` when no descendant matches. With `include_end` the
/// target's own text width is added, giving its end offset.
pub fn offset_of(
    tree: &Tree,
    ancestor: NodeId,
    is_target: impl Fn(&Tree, NodeId) -> bool,
    include_end: bool,
) -> Option<usize> {
    let mut offset = 0;
    for node in tree.descendants(ancestor) {
        if let Some(text) = tree.text(node) {
            offset += text_width(text);
        } else if is_target(tree, node) {
            if include_end {
                offset += node_width(tree, node);
            }
            return Some(offset);
        }
    }
    None
}

/// Which text node wins when an offset falls between two of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    /// Prefer the start of the following node (range starts).
    Start,
    /// Prefer the end of the preceding node (range ends).
    End,
}

/// Locate the text node containing a character offset of `parent`.
pub fn text_node_at_offset(tree: &Tree, parent: NodeId, offset: usize, bias: Bias) -> Option<Position> {
    let mut consumed = 0;
    let mut last: Option<(NodeId, usize)> = None;
    for node in tree.descendants(parent) {
        let Some(text) = tree.text(node) else {
            continue;
        };
        let width = text_width(text);
        if width == 0 {
            continue;
        }
        let reached = match bias {
            Bias::Start => consumed + width > offset,
            Bias::End => consumed + width >= offset,
        };
        if reached {
            return Some(Position::new(node, offset.saturating_sub(consumed)));
        }
        consumed += width;
        last = Some((node, width));
    }
    match last {
        Some((node, width)) if consumed == offset => Some(Position::new(node, width)),
        _ => None,
    }
}

/// Anchor of a standoff boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub xpath: String,
    pub struct_id: String,
    /// The structural ancestor the offset is counted from.
    pub node: NodeId,
}

/// Build the anchor for a node: its nearest structural ancestor, marked
/// with an `offsetId` attribute. A missing ancestor id is synthesized.
pub fn build_anchor(tree: &mut Tree, node: NodeId, document: &mut Document) -> Option<Anchor> {
    let ancestor = tree.closest_ancestor(node, |el| el.tag.is_some() && el.entity.is_none())?;
    let element = tree.element_mut(ancestor)?;
    let tag = element.tag.clone()?;
    let struct_id = match &element.id {
        Some(id) => id.clone(),
        None => {
            let id = document.next_struct_id();
            tracing::debug!(id = %id, tag = %tag, "synthesized anchor id");
            element.id = Some(id.clone());
            id
        }
    };
    element
        .attributes
        .insert(OFFSET_ID_ATTR.to_string(), struct_id.clone());
    Some(Anchor {
        xpath: format!("//{tag}[@{OFFSET_ID_ATTR}=\"{struct_id}\"]"),
        struct_id,
        node: ancestor,
    })
}

/// An XPath plus optional character offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xpointer {
    pub xpath: String,
    pub offset: Option<usize>,
}

impl Xpointer {
    /// Create an xpointer, rejecting XPaths with parentheses.
    pub fn new(xpath: impl Into<String>, offset: Option<usize>) -> Result<Self> {
        let xpath = xpath.into();
        validate_xpath(&xpath)?;
        Ok(Self { xpath, offset })
    }

    /// Parse `xpointer(string-range(XPATH,"",OFFSET))` or `xpointer(XPATH)`.
    ///
    /// # Examples
    /// ```
    /// use standoff_annotator::offset::Xpointer;
    ///
    /// let pointer = Xpointer::parse(r#"xpointer(string-range(//p[@offsetId="struct_2"],"",14))"#).unwrap();
    /// assert_eq!(pointer.xpath, r#"//p[@offsetId="struct_2"]"#);
    /// assert_eq!(pointer.offset, Some(14));
    /// ```
    pub fn parse(value: &str) -> Result<Self> {
        let malformed = || AnnotatorError::Xpointer(value.to_string());
        let caps = XPOINTER_PATTERN.captures(value.trim()).ok_or_else(malformed)?;
        let content = caps.get(2).map_or("", |m| m.as_str());
        if caps.get(1).is_none() {
            return Self::new(content.trim(), None).map_err(|_| malformed());
        }
        let parts: Vec<&str> = content.rsplitn(3, ',').collect();
        match parts.as_slice() {
            [offset, _, xpath] => {
                let offset = offset.trim().parse::<usize>().map_err(|_| malformed())?;
                Self::new(xpath.trim(), Some(offset)).map_err(|_| malformed())
            }
            [xpath] => Self::new(xpath.trim(), None).map_err(|_| malformed()),
            _ => Err(malformed()),
        }
    }
}

impl fmt::Display for Xpointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset {
            Some(offset) => write!(f, "xpointer(string-range({},\"\",{offset}))", self.xpath),
            None => write!(f, "xpointer({})", self.xpath),
        }
    }
}
