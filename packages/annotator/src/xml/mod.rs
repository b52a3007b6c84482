//! XML helpers: navigation of parsed documents, fragment serialization,
//! escaping and a minimal XPath evaluator.

mod escape;
mod utils;
mod xpath;

pub use escape::{decode_entities, escape_attribute, escape_text, normalize_text};
pub use utils::{
    element_children, find_child, find_child_ns, find_children, find_children_ns, get_tag_name,
    get_text, has_tag, inner_xml, qualified_attributes, qualified_tag_name, serialize_node,
};
pub use xpath::{resolve_xpath, XPath};
