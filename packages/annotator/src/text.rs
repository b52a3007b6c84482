//! Text helpers for entity content and titles.

use regex::Regex;
use std::sync::LazyLock;

use crate::config::{INVISIBLE_MARKER, TITLE_MAX_CHARS};
use crate::xml::{decode_entities, get_text};

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static MARKUP_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[^>]+>").expect("valid regex"));

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static WHITESPACE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Remove anything that looks like a tag.
///
/// # Examples
/// ```
/// use standoff_annotator::text::strip_markup;
///
/// assert_eq!(strip_markup("<b>Ada</b> Lovelace"), "Ada Lovelace");
/// ```
#[must_use]
pub fn strip_markup(text: &str) -> String {
    MARKUP_PATTERN.replace_all(text, "").into_owned()
}

/// Trim at most one whitespace character from each end.
///
/// Returns the trimmed text and how many characters were removed at the
/// start and at the end.
///
/// # Examples
/// ```
/// use standoff_annotator::text::trim_one_whitespace;
///
/// assert_eq!(trim_one_whitespace("  Ada "), (" Ada".to_string(), 1, 1));
/// ```
#[must_use]
pub fn trim_one_whitespace(text: &str) -> (String, usize, usize) {
    let mut chars: Vec<char> = text.chars().collect();
    let mut leading = 0;
    let mut trailing = 0;
    if chars.last().is_some_and(|c| c.is_whitespace()) {
        chars.pop();
        trailing = 1;
    }
    if chars.first().is_some_and(|c| c.is_whitespace()) {
        chars.remove(0);
        leading = 1;
    }
    (chars.into_iter().collect(), leading, trailing)
}

/// Derive a short display title from entity content.
///
/// Whitespace is collapsed and long content is cut at
/// [`TITLE_MAX_CHARS`] characters with an ellipsis.
///
/// # Examples
/// ```
/// use standoff_annotator::text::title_from_content;
///
/// assert_eq!(title_from_content("  Ada\n  Lovelace "), "Ada Lovelace");
/// ```
#[must_use]
pub fn title_from_content(content: &str) -> String {
    let cleaned: String = content.chars().filter(|&c| c != INVISIBLE_MARKER).collect();
    let collapsed = WHITESPACE_PATTERN.replace_all(cleaned.trim(), " ");
    if collapsed.chars().count() <= TITLE_MAX_CHARS {
        return collapsed.into_owned();
    }
    let cut: String = collapsed.chars().take(TITLE_MAX_CHARS).collect();
    format!("{}…", cut.trim_end())
}

/// Plain text of a serialized XML fragment.
///
/// Falls back to stripping tags when the fragment is not well-formed.
#[must_use]
pub fn fragment_text(fragment: &str) -> String {
    let wrapped = format!("<fragment>{fragment}</fragment>");
    match roxmltree::Document::parse(&wrapped) {
        Ok(doc) => get_text(doc.root_element()),
        Err(_) => decode_entities(&strip_markup(fragment)).into_owned(),
    }
}
