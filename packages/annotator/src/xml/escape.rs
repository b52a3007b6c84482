//! Character data escaping.
//!
//! Text written to XML is first normalized: HTML entities that an editing
//! surface may have produced are decoded back to literal characters, then
//! only the XML-significant characters are escaped. The same logical
//! character is therefore never escaped twice.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

#[allow(clippy::expect_used)] // Static regex that is guaranteed to be valid
static ENTITY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#([0-9]+)|#[xX]([0-9a-fA-F]+)|([A-Za-z][A-Za-z0-9]*));").expect("valid regex")
});

/// Named HTML entities decoded by [`decode_entities`].
fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "shy" => '\u{ad}',
        "copy" => '©',
        "reg" => '®',
        "sect" => '§',
        "para" => '¶',
        "middot" => '·',
        "laquo" => '«',
        "raquo" => '»',
        "ndash" => '–',
        "mdash" => '—',
        "lsquo" => '‘',
        "rsquo" => '’',
        "ldquo" => '“',
        "rdquo" => '”',
        "hellip" => '…',
        _ => return None,
    };
    Some(c)
}

/// Decode HTML character references to literal characters.
///
/// Unknown named references are left untouched.
///
/// # Examples
/// ```
/// use standoff_annotator::xml::decode_entities;
///
/// assert_eq!(decode_entities("Fish &amp; Chips &#8212; &unknown;"), "Fish & Chips — &unknown;");
/// ```
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    ENTITY_PATTERN.replace_all(text, |caps: &Captures<'_>| {
        let decoded = if let Some(dec) = caps.get(1) {
            dec.as_str().parse::<u32>().ok().and_then(char::from_u32)
        } else if let Some(hex) = caps.get(2) {
            u32::from_str_radix(hex.as_str(), 16).ok().and_then(char::from_u32)
        } else {
            caps.get(3).and_then(|name| named_entity(name.as_str()))
        };
        match decoded {
            Some(c) => c.to_string(),
            None => caps[0].to_string(),
        }
    })
}

/// Escape `&`, `<` and `>`.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape text for use inside a double-quoted attribute value.
pub fn escape_attribute(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

/// Decode HTML entities, then escape for XML character data.
///
/// # Examples
/// ```
/// use standoff_annotator::xml::normalize_text;
///
/// assert_eq!(normalize_text("a &amp; b & c < d"), "a &amp; b &amp; c &lt; d");
/// ```
pub fn normalize_text(text: &str) -> String {
    escape_text(&decode_entities(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("<a & b>"), "&lt;a &amp; b&gt;");
        assert_eq!(escape_text("\"quoted\""), "\"quoted\"");
    }

    #[test]
    fn test_escape_attribute() {
        assert_eq!(escape_attribute("say \"hi\" & go"), "say &quot;hi&quot; &amp; go");
    }

    #[test]
    fn test_decode_numeric_entities() {
        assert_eq!(decode_entities("&#65;&#x42;&#X43;"), "ABC");
        assert_eq!(decode_entities("&#xFFFFFFFF;"), "&#xFFFFFFFF;");
    }

    #[test]
    fn test_normalize_never_double_escapes() {
        assert_eq!(normalize_text("&amp;amp;"), "&amp;amp;");
        assert_eq!(normalize_text("&lt;b&gt;"), "&lt;b&gt;");
        assert_eq!(normalize_text("caf&eacute;"), "caf&amp;eacute;");
    }
}
