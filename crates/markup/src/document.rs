use crate::error::MarkupError;
use crate::node::{self, Element, Node};
use crate::{parser, serializer};
use std::fmt;

/// A parsed template: an ordered list of top-level nodes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub nodes: Vec<Node>,
}

impl Document {
    pub fn parse(source: &str) -> Result<Self, MarkupError> {
        parser::parse(source)
    }

    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }

    pub fn to_html(&self) -> String {
        serializer::serialize_nodes(&self.nodes)
    }

    /// All elements named `name`, in document order.
    pub fn find_all(&self, name: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        node::collect(&self.nodes, name, &mut found);
        found
    }

    pub fn first(&self, name: &str) -> Option<&Element> {
        self.find_all(name).into_iter().next()
    }

    /// The only top-level element, if the document has exactly one once
    /// whitespace and comments are ignored.
    pub fn single_root_element_mut(&mut self) -> Option<&mut Element> {
        let mut elements = self.nodes.iter_mut().filter(|n| !n.is_blank());
        match (elements.next(), elements.next()) {
            (Some(Node::Element(el)), None) => Some(el),
            _ => None,
        }
    }

    pub fn try_for_each_element_mut<E, F>(&mut self, mut f: F) -> Result<(), E>
    where
        F: FnMut(&mut Element) -> Result<(), E>,
    {
        node::try_for_each_element_mut(&mut self.nodes, &mut f)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_html())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_all_in_document_order() {
        let doc = Document::parse("<div><img src=\"a\"><p><img src=\"b\"></p></div><img src=\"c\">").unwrap();
        let srcs: Vec<_> = doc.find_all("IMG").iter().filter_map(|el| el.attribute("src")).collect();
        assert_eq!(srcs, vec!["a", "b", "c"]);
        assert_eq!(doc.first("p").map(|p| p.inner_html()), Some("<img src=\"b\">".to_string()));
    }

    #[test]
    fn test_single_root_element_ignores_whitespace() {
        let mut doc = Document::parse("\n  <nav class=\"x\">menu</nav>\n").unwrap();
        let root = doc.single_root_element_mut().unwrap();
        root.set_attribute("id", "top");
        assert_eq!(doc.to_html(), "\n  <nav class=\"x\" id=\"top\">menu</nav>\n");

        let mut two = Document::parse("<a></a><b></b>").unwrap();
        assert!(two.single_root_element_mut().is_none());
        let mut text = Document::parse("plain").unwrap();
        assert!(text.single_root_element_mut().is_none());
    }

    #[test]
    fn test_rewrite_attributes_in_place() {
        let mut doc = Document::parse("<p><img src=\"a.png\"></p>").unwrap();
        doc.try_for_each_element_mut::<(), _>(|el| {
            if el.is("img") {
                el.set_attribute("src", "/img/a.png");
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(doc.to_string(), "<p><img src=\"/img/a.png\"></p>");
    }
}
