//! The owned markup tree.
use crate::serializer;

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose body is kept as raw, unparsed text.
pub(crate) const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

pub(crate) fn is_raw_text_element(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

/// A single node of a parsed document.
///
/// Text and attribute values are stored exactly as written (entities are not
/// decoded), so a parse/serialize cycle leaves them untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
    /// Doctype, processing instruction or CDATA section, kept verbatim.
    Raw(String),
}

impl Node {
    pub fn text(content: impl Into<String>) -> Self {
        Node::Text(content.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    /// True for comments and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            Node::Text(t) => t.trim().is_empty(),
            Node::Comment(_) => true,
            _ => false,
        }
    }

    /// True if this is an element with the given tag name (ASCII case-insensitive).
    pub fn is_element(&self, name: &str) -> bool {
        self.as_element().is_some_and(|el| el.is(name))
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
    /// Written as `<br/>` in the source. Only honoured for void elements.
    pub self_closing: bool,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_text(mut self, content: impl Into<String>) -> Self {
        self.set_text(content);
        self
    }

    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn is_void(&self) -> bool {
        is_void_element(&self.name)
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Sets an attribute, replacing an existing one in place so attribute order is kept.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let index = self
            .attributes
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))?;
        Some(self.attributes.remove(index).1)
    }

    /// Concatenated raw text of the direct text children.
    ///
    /// For `script` and `style` this is the whole body.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Replaces all children with a single text node.
    pub fn set_text(&mut self, content: impl Into<String>) {
        let content = content.into();
        self.children.clear();
        if !content.is_empty() {
            self.children.push(Node::Text(content));
        }
    }

    /// Replaces the child at `index` with `replacement`, returning the old child.
    pub fn replace_child(&mut self, index: usize, replacement: Vec<Node>) -> Option<Node> {
        splice(&mut self.children, index, replacement)
    }

    pub fn remove_child(&mut self, index: usize) -> Option<Node> {
        (index < self.children.len()).then(|| self.children.remove(index))
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// All descendant elements named `name`, in document order.
    pub fn find_all(&self, name: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        collect(&self.children, name, &mut found);
        found
    }

    pub fn inner_html(&self) -> String {
        serializer::serialize_nodes(&self.children)
    }

    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        serializer::write_element(self, &mut out);
        out
    }
}

/// Replaces `nodes[index]` with the contents of `replacement`.
pub fn splice(nodes: &mut Vec<Node>, index: usize, replacement: Vec<Node>) -> Option<Node> {
    if index >= nodes.len() {
        return None;
    }
    nodes.splice(index..=index, replacement).next()
}

pub(crate) fn collect<'a>(nodes: &'a [Node], name: &str, found: &mut Vec<&'a Element>) {
    for node in nodes {
        if let Node::Element(el) = node {
            if el.is(name) {
                found.push(el);
            }
            collect(&el.children, name, found);
        }
    }
}

/// Visits every element below `nodes` depth-first, parents before children.
///
/// The callback may rewrite attributes and children; the walk descends into
/// whatever children the element has after the callback returns.
pub fn try_for_each_element_mut<E, F>(nodes: &mut [Node], f: &mut F) -> Result<(), E>
where
    F: FnMut(&mut Element) -> Result<(), E>,
{
    for node in nodes.iter_mut() {
        if let Node::Element(el) = node {
            f(el)?;
            try_for_each_element_mut(&mut el.children, f)?;
        }
    }
    Ok(())
}
