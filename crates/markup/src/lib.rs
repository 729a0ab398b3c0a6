//! A tolerant, owned HTML tree for server-side templates.
//!
//! Documents are tokenized with `quick-xml` and kept as a plain tree of
//! [`Node`]s that callers mutate in place. Text and attribute values are
//! stored raw; [`decode_entities`] turns them into plain strings when needed.

pub mod document;
pub mod error;
pub mod node;
mod parser;
pub mod serializer;

use std::borrow::Cow;

pub use document::Document;
pub use error::MarkupError;
pub use node::{Element, Node, is_void_element, splice, try_for_each_element_mut};
pub use serializer::serialize_nodes;

/// Decodes character and entity references (`&lt;`, `&#39;`, ...).
/// Text with malformed references is returned unchanged.
pub fn decode_entities(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }
    quick_xml::escape::unescape(raw).unwrap_or(Cow::Borrowed(raw))
}
