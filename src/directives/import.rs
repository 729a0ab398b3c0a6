use super::{Directive, Renderer};
use crate::assets::path::with_default_extension;
use crate::assets::{AssetKind, Resolved};
use crate::error::RenderError;
use std::path::Path;
use trellis_expr::Scope;
use trellis_markup::{Document, Element, Node, decode_entities, splice};

impl Renderer<'_> {
    /// Replaces every `import` with the nodes of the file it names.
    pub(crate) fn inline_imports(&mut self, path: &Path, nodes: &mut Vec<Node>, scope: &mut Scope) -> Result<(), RenderError> {
        let mut i = 0;
        while i < nodes.len() {
            let replacement = match &mut nodes[i] {
                Node::Element(el) if el.is(Directive::Import.tag()) => Some(self.expand_import(path, el, scope)?),
                Node::Element(el) => {
                    self.inline_imports(path, &mut el.children, scope)?;
                    None
                }
                _ => None,
            };
            match replacement {
                // Imported nodes were fully processed already.
                Some(imported) => {
                    let len = imported.len();
                    splice(nodes, i, imported);
                    i += len;
                }
                None => i += 1,
            }
        }
        Ok(())
    }

    fn expand_import(&mut self, path: &Path, import: &Element, scope: &mut Scope) -> Result<Vec<Node>, RenderError> {
        let src = import
            .attribute("src")
            .map(|s| decode_entities(s).trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| RenderError::malformed(Directive::Import.tag(), "missing 'src' attribute"))?;
        let src = with_default_extension(&src, "html");
        let base_dir = self.base_dir(path);

        let Resolved::Local { path: target, .. } = self.paths.resolve(&base_dir, &src) else {
            return Err(RenderError::malformed(
                Directive::Import.tag(),
                format!("cannot import remote '{}'", src),
            ));
        };
        let extension = target
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        log::debug!("Importing {} into {}", target.display(), path.display());

        let mut fragment = match extension.as_str() {
            "html" | "htm" | "xml" | "svg" => self.import_template(&target, scope)?,
            "js" | "mjs" => self.import_asset(AssetKind::Script, "script", &base_dir, &src)?,
            "css" => self.import_asset(AssetKind::Style, "style", &base_dir, &src)?,
            other => {
                return Err(RenderError::malformed(
                    Directive::Import.tag(),
                    format!("unsupported file type '.{}' in '{}'", other, src),
                ));
            }
        };

        if let Some(root) = fragment.single_root_element_mut() {
            for (name, value) in &import.attributes {
                if !name.eq_ignore_ascii_case("src") {
                    root.set_attribute(name.clone(), value.clone());
                }
            }
        }
        Ok(fragment.into_nodes())
    }

    fn import_template(&mut self, target: &Path, scope: &mut Scope) -> Result<Document, RenderError> {
        if self.import_depth >= self.config.max_import_depth {
            return Err(RenderError::malformed(
                Directive::Import.tag(),
                format!(
                    "nesting deeper than {} at {}",
                    self.config.max_import_depth,
                    target.display()
                ),
            ));
        }
        let source = self.load_template(target)?;
        let document = Document::parse(&source)?;

        self.import_depth += 1;
        let processed = self.process_template(target, document, scope);
        self.import_depth -= 1;
        processed
    }

    /// Wraps a resolved script or stylesheet in an inline element.
    fn import_asset(&mut self, kind: AssetKind, tag: &str, base_dir: &Path, src: &str) -> Result<Document, RenderError> {
        let resolution = self.assets().resolve(kind, base_dir, src)?;
        let content = resolution
            .record()
            .and_then(|record| record.content())
            .unwrap_or_default();
        Ok(Document::from_nodes(vec![Node::Element(
            Element::new(tag).with_text(content),
        )]))
    }
}
