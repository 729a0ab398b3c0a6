//! Writes a node tree back to HTML text.
use crate::node::{Element, Node};

pub fn serialize_nodes(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(node, &mut out);
    }
    out
}

pub(crate) fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Element(el) => write_element(el, out),
        Node::Text(text) => out.push_str(text),
        Node::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        Node::Raw(raw) => out.push_str(raw),
    }
}

pub(crate) fn write_element(el: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&el.name);
    for (name, value) in &el.attributes {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        // Values are stored raw; only the delimiter needs escaping.
        out.push_str(&value.replace('"', "&quot;"));
        out.push('"');
    }
    if el.is_void() {
        out.push_str(if el.self_closing { " />" } else { ">" });
        return;
    }
    out.push('>');
    for child in &el.children {
        write_node(child, out);
    }
    out.push_str("</");
    out.push_str(&el.name);
    out.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_element_with_attributes() {
        let el = Element::new("a")
            .with_attribute("href", "/x")
            .with_attribute("title", "say \"hi\"")
            .with_text("link");
        assert_eq!(el.outer_html(), r#"<a href="/x" title="say &quot;hi&quot;">link</a>"#);
    }

    #[test]
    fn test_serialize_void_elements() {
        let mut br = Element::new("br");
        assert_eq!(br.outer_html(), "<br>");
        br.self_closing = true;
        assert_eq!(br.outer_html(), "<br />");
        // Non-void elements always get a closing tag.
        let mut div = Element::new("div");
        div.self_closing = true;
        assert_eq!(div.outer_html(), "<div></div>");
    }

    #[test]
    fn test_serialize_comment_and_raw() {
        let nodes = vec![
            Node::Raw("<!DOCTYPE html>".into()),
            Node::Comment(" c ".into()),
            Node::text("x"),
        ];
        assert_eq!(serialize_nodes(&nodes), "<!DOCTYPE html><!-- c -->x");
    }
}
