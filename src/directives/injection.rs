use super::Renderer;
use crate::error::RenderError;
use serde_json::Value;
use trellis_expr::{Scope, value};
use trellis_markup::{Document, Node, serialize_nodes};

/// How an injected value is written into markup: `null`, `false` and `""`
/// vanish, integral numbers have no fraction, strings are written raw and
/// arrays/objects as JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null | Value::Bool(false) => String::new(),
        other => value::to_string(other),
    }
}

impl Renderer<'_> {
    /// Replaces `#{expression}` and `@{statements}` spans in the serialized
    /// markup and re-parses the result. Empty spans print nothing. Untouched
    /// documents are returned as they are.
    pub(crate) fn substitute_injections(&self, nodes: Vec<Node>, scope: &mut Scope) -> Result<Vec<Node>, RenderError> {
        let html = serialize_nodes(&nodes);
        match self.substitute(&html, scope)? {
            Some(rendered) => Ok(Document::parse(&rendered)?.into_nodes()),
            None => Ok(nodes),
        }
    }

    fn substitute(&self, html: &str, scope: &mut Scope) -> Result<Option<String>, RenderError> {
        let bytes = html.as_bytes();
        let mut out = String::new();
        let mut copied = 0;
        let mut changed = false;
        let mut i = 0;

        while i + 1 < bytes.len() {
            let sigil = bytes[i];
            let opens = |at: usize| matches!(bytes[at], b'@' | b'#') && bytes.get(at + 1) == Some(&b'{');

            if sigil == b'\\' && opens(i + 1) {
                // Escaped: drop the backslash, keep the delimiter as text.
                out.push_str(&html[copied..i]);
                copied = i + 1;
                changed = true;
                i += 3;
                continue;
            }
            if !opens(i) {
                i += 1;
                continue;
            }
            let Some(close) = matching_brace(html, i + 1) else {
                log::warn!("Unterminated {}{{ at byte {} left as text", sigil as char, i);
                i += 2;
                continue;
            };

            let code = &html[i + 2..close];
            let value = if code.trim().is_empty() {
                Value::Null
            } else if sigil == b'#' {
                self.evaluate(code, scope)?
            } else {
                self.execute(code, scope)?
            };
            let rendered = display_value(&value);
            log::trace!("{}{{{}}} -> {:?}", sigil as char, code.trim(), rendered);

            out.push_str(&html[copied..i]);
            out.push_str(&rendered);
            i = close + 1;
            copied = i;
            changed = true;
        }

        if !changed {
            return Ok(None);
        }
        out.push_str(&html[copied..]);
        Ok(Some(out))
    }
}

/// Index of the `}` closing the `{` at `open`, counting nested braces and
/// skipping braces inside quoted strings.
fn matching_brace(source: &str, open: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = open;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(_) if b == b'\\' => i += 1,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'\'' | b'"' | b'`' => quote = Some(b),
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&Value::Null), "");
        assert_eq!(display_value(&json!(false)), "");
        assert_eq!(display_value(&json!("")), "");
        assert_eq!(display_value(&json!(true)), "true");
        assert_eq!(display_value(&json!(0)), "0");
        assert_eq!(display_value(&json!(2.0)), "2");
        assert_eq!(display_value(&json!(2.5)), "2.5");
        assert_eq!(display_value(&json!("<b>x</b>")), "<b>x</b>");
        assert_eq!(display_value(&json!([1, "a"])), r#"[1,"a"]"#);
        assert_eq!(display_value(&json!({"a": 1})), r#"{"a":1}"#);
    }

    #[test]
    fn test_matching_brace_counts_depth() {
        let src = "@{ f({a: {b: 1}}) } tail";
        assert_eq!(matching_brace(src, 1), Some(18));
        assert_eq!(&src[..19], "@{ f({a: {b: 1}}) }");
    }

    #[test]
    fn test_matching_brace_skips_quoted_braces() {
        let src = "#{ '}' + \"{\" }";
        assert_eq!(matching_brace(src, 1), Some(src.len() - 1));
    }

    #[test]
    fn test_unterminated_brace() {
        assert_eq!(matching_brace("#{ a + (b", 1), None);
    }
}
