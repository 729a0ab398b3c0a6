//! Builds a [`Document`] from template text using `quick-xml` as tokenizer.
//!
//! The reader is configured for HTML rather than XML: end tag names are not
//! checked, unmatched end tags are dropped, attributes may be unquoted or
//! value-less, void elements never open a scope, and `script`/`style` bodies
//! are captured verbatim up to their closing tag.
use crate::document::Document;
use crate::error::MarkupError;
use crate::node::{Element, Node, is_raw_text_element, is_void_element};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::borrow::Cow;

pub fn parse(source: &str) -> Result<Document, MarkupError> {
    let prepared = escape_stray_text(source);
    let source = prepared.as_ref();
    let mut builder = TreeBuilder::default();
    let mut offset = 0;
    while offset < source.len() {
        offset = parse_segment(source, offset, &mut builder)?;
    }
    Ok(Document::from_nodes(builder.finish()))
}

/// Tokenizes `source[offset..]` until the input ends or a raw-text element
/// has been captured. Returns the offset to resume from.
fn parse_segment(source: &str, offset: usize, builder: &mut TreeBuilder) -> Result<usize, MarkupError> {
    let input = &source[offset..];
    let mut reader = Reader::from_str(input);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    config.check_comments = false;

    loop {
        let start = reader.buffer_position() as usize;
        let event = reader
            .read_event()
            .map_err(|e| MarkupError::syntax(offset + start, e))?;
        let end = reader.buffer_position() as usize;
        let raw = &input[start..end];

        match event {
            Event::Start(e) => {
                let mut el = element_from(&e, false);
                if el.is_void() {
                    builder.leaf(Node::Element(el));
                } else if is_raw_text_element(&el.name) {
                    let body_start = offset + end;
                    let (body_end, resume) = raw_text_end(source, body_start, &el.name);
                    el.set_text(&source[body_start..body_end]);
                    builder.leaf(Node::Element(el));
                    return Ok(resume);
                } else {
                    builder.open(el);
                }
            }
            Event::Empty(e) => builder.leaf(Node::Element(element_from(&e, true))),
            Event::End(e) => builder.close(&String::from_utf8_lossy(e.name().as_ref())),
            Event::Text(_) | Event::GeneralRef(_) => builder.text(raw),
            Event::Comment(e) => builder.leaf(Node::Comment(String::from_utf8_lossy(&e).into_owned())),
            Event::CData(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {
                builder.leaf(Node::Raw(raw.to_string()))
            }
            Event::Eof => return Ok(source.len()),
        }
    }
}

fn element_from(e: &BytesStart, self_closing: bool) -> Element {
    let attributes = e
        .html_attributes()
        .filter_map(|a| a.ok())
        .map(|a| {
            (
                String::from_utf8_lossy(a.key.as_ref()).into_owned(),
                String::from_utf8_lossy(&a.value).into_owned(),
            )
        })
        .collect();
    Element {
        name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
        attributes,
        children: Vec::new(),
        self_closing,
    }
}

/// Finds the closing tag of a raw-text element starting at `from`.
/// Returns `(body_end, resume)`; an unclosed body runs to the end of input.
fn raw_text_end(source: &str, from: usize, name: &str) -> (usize, usize) {
    let needle = format!("</{}", name.to_ascii_lowercase());
    let haystack = source[from..].to_ascii_lowercase();
    match haystack.find(&needle) {
        Some(rel) => {
            let body_end = from + rel;
            let resume = source[body_end..]
                .find('>')
                .map(|i| body_end + i + 1)
                .unwrap_or(source.len());
            (body_end, resume)
        }
        None => (source.len(), source.len()),
    }
}

#[derive(Default)]
struct TreeBuilder {
    root: Vec<Node>,
    open: Vec<Element>,
}

impl TreeBuilder {
    fn children(&mut self) -> &mut Vec<Node> {
        match self.open.last_mut() {
            Some(el) => &mut el.children,
            None => &mut self.root,
        }
    }

    fn leaf(&mut self, node: Node) {
        self.children().push(node);
    }

    fn text(&mut self, raw: &str) {
        if raw.is_empty() {
            return;
        }
        let children = self.children();
        match children.last_mut() {
            Some(Node::Text(prev)) => prev.push_str(raw),
            _ => children.push(Node::Text(raw.to_string())),
        }
    }

    fn open(&mut self, el: Element) {
        self.open.push(el);
    }

    /// Closes the innermost open element named `name`, implicitly closing
    /// anything opened inside it.
    fn close(&mut self, name: &str) {
        let Some(depth) = self.open.iter().rposition(|el| el.is(name)) else {
            if !is_void_element(name) {
                log::warn!("Ignoring unmatched closing tag </{}>", name);
            }
            return;
        };
        while self.open.len() > depth {
            self.pop();
        }
    }

    fn pop(&mut self) {
        if let Some(el) = self.open.pop() {
            self.children().push(Node::Element(el));
        }
    }

    fn finish(mut self) -> Vec<Node> {
        if let Some(el) = self.open.first() {
            log::debug!("Closing {} unclosed element(s), outermost <{}>", self.open.len(), el.name);
        }
        while !self.open.is_empty() {
            self.pop();
        }
        self.root
    }
}

/// Escapes `<` and `&` in text where they cannot start a tag or an entity
/// reference, so expressions like `#{ a < b && c }` survive tokenizing.
/// Tags, comments and raw-text bodies are copied unchanged.
pub(crate) fn escape_stray_text(source: &str) -> Cow<'_, str> {
    let bytes = source.as_bytes();
    let mut out = String::new();
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'<' if source[i..].starts_with("<!--") => {
                i = source[i + 4..].find("-->").map(|p| i + 4 + p + 3).unwrap_or(bytes.len());
            }
            b'<' if bytes
                .get(i + 1)
                .is_some_and(|b| b.is_ascii_alphabetic() || matches!(b, b'/' | b'!' | b'?')) =>
            {
                let tag_end = find_tag_end(bytes, i);
                let name = tag_name(&source[i + 1..tag_end]);
                let self_closed = source[i..tag_end].ends_with("/>");
                i = tag_end;
                if is_raw_text_element(name) && !self_closed {
                    i = raw_text_end(source, i, name).0;
                }
            }
            b'<' => {
                out.push_str(&source[copied..i]);
                out.push_str("&lt;");
                i += 1;
                copied = i;
            }
            b'&' if !is_entity_reference(&bytes[i..]) => {
                out.push_str(&source[copied..i]);
                out.push_str("&amp;");
                i += 1;
                copied = i;
            }
            _ => i += 1,
        }
    }

    if copied == 0 {
        Cow::Borrowed(source)
    } else {
        out.push_str(&source[copied..]);
        Cow::Owned(out)
    }
}

/// Index just past the `>` closing the tag at `start`, honouring quoted attribute values.
fn find_tag_end(bytes: &[u8], start: usize) -> usize {
    let mut quote: Option<u8> = None;
    for (i, &b) in bytes.iter().enumerate().skip(start + 1) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return i + 1,
            None => {}
        }
    }
    bytes.len()
}

fn tag_name(tag: &str) -> &str {
    let end = tag
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .unwrap_or(tag.len());
    &tag[..end]
}

fn is_entity_reference(bytes: &[u8]) -> bool {
    let body = &bytes[1..];
    let len = match body.first() {
        Some(b'#') => match body.get(1) {
            Some(b'x' | b'X') => body[2..].iter().take_while(|b| b.is_ascii_hexdigit()).count() + 2,
            _ => body[1..].iter().take_while(|b| b.is_ascii_digit()).count() + 1,
        },
        Some(b) if b.is_ascii_alphabetic() => body.iter().take_while(|b| b.is_ascii_alphanumeric()).count(),
        _ => return false,
    };
    let digits_present = match body.first() {
        Some(b'#') => len > 1 && !(len == 2 && matches!(body.get(1), Some(b'x' | b'X'))),
        _ => len > 0,
    };
    digits_present && body.get(len) == Some(&b';')
}
