//! The directive pipeline applied to every template, imported fragment and
//! repeat body.
//!
//! Stages run in a fixed order:
//! 1. conditionals (`if` / `elif` / `else`)
//! 2. iteration (`repeat`)
//! 3. inline expressions (`#{...}` and `@{...}`)
//! 4. imports (`import`)
//! 5. script tags, then style tags, then resource tags
//!
//! Repeat bodies and imported templates run through the whole pipeline
//! themselves, against the same scope.

mod asset_tags;
mod conditional;
mod import;
mod injection;
mod repeat;

pub use injection::display_value;

use crate::assets::{AssetResolver, PathResolver};
use crate::config::EngineConfig;
use crate::engine::EngineState;
use crate::error::RenderError;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use trellis_expr::{ExpressionEvaluator, Scope};
use trellis_markup::{Document, Node, decode_entities};
use trellis_traits::ResourceProvider;

/// The custom tags interpreted by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    If,
    Elif,
    Else,
    Repeat,
    Import,
}

impl Directive {
    pub const ALL: [Directive; 5] = [
        Directive::If,
        Directive::Elif,
        Directive::Else,
        Directive::Repeat,
        Directive::Import,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            Directive::If => "if",
            Directive::Elif => "elif",
            Directive::Else => "else",
            Directive::Repeat => "repeat",
            Directive::Import => "import",
        }
    }

    pub fn of(node: &Node) -> Option<Self> {
        let el = node.as_element()?;
        Self::ALL.into_iter().find(|d| el.is(d.tag()))
    }
}

/// Per-render processing state. Borrows the engine's caches for the whole render.
pub struct Renderer<'a> {
    paths: &'a PathResolver,
    provider: &'a dyn ResourceProvider,
    evaluator: &'a dyn ExpressionEvaluator,
    config: &'a EngineConfig,
    state: &'a mut EngineState,
    import_depth: usize,
}

impl<'a> Renderer<'a> {
    pub(crate) fn new(
        paths: &'a PathResolver,
        provider: &'a dyn ResourceProvider,
        evaluator: &'a dyn ExpressionEvaluator,
        config: &'a EngineConfig,
        state: &'a mut EngineState,
    ) -> Self {
        Self {
            paths,
            provider,
            evaluator,
            config,
            state,
            import_depth: 0,
        }
    }

    /// Runs every stage over `document`, which lives at `path`.
    pub fn process_template(
        &mut self,
        path: &Path,
        document: Document,
        scope: &mut Scope,
    ) -> Result<Document, RenderError> {
        let base_dir = self.base_dir(path);
        let mut nodes = document.into_nodes();

        self.resolve_conditionals(&mut nodes, scope)?;
        let mut fragments = Vec::new();
        self.expand_repeats(path, &mut nodes, scope, &mut fragments)?;
        let mut nodes = self.substitute_injections(nodes, scope)?;
        repeat::restore_fragments(&mut nodes, &mut fragments);
        self.inline_imports(path, &mut nodes, scope)?;
        self.rewrite_script_tags(&base_dir, &mut nodes)?;
        self.rewrite_style_tags(&base_dir, &mut nodes)?;
        self.rewrite_resource_tags(&base_dir, &mut nodes)?;

        Ok(Document::from_nodes(nodes))
    }

    /// Reads a template through the template cache.
    pub(crate) fn load_template(&mut self, path: &Path) -> Result<Arc<str>, RenderError> {
        if let Some(hit) = self.state.templates.get(path) {
            return Ok(Arc::clone(hit));
        }
        log::debug!("Loading template {}", path.display());
        let source: Arc<str> = Arc::from(self.provider.load_to_string(path)?);
        self.state.templates.insert(path.to_path_buf(), Arc::clone(&source));
        Ok(source)
    }

    fn assets(&mut self) -> AssetResolver<'_> {
        AssetResolver::new(self.paths, self.provider, &mut self.state.assets)
    }

    fn base_dir(&self, path: &Path) -> PathBuf {
        path.parent().unwrap_or(self.paths.views()).to_path_buf()
    }

    /// Evaluates an attribute or injection expression. Markup text is stored
    /// raw, so entity references are decoded first.
    fn evaluate(&self, expression: &str, scope: &Scope) -> Result<Value, RenderError> {
        let source = decode_entities(expression);
        self.evaluator
            .evaluate(&source, scope)
            .map_err(|e| RenderError::expression(&source, e))
    }

    fn execute(&self, statements: &str, scope: &mut Scope) -> Result<Value, RenderError> {
        let source = decode_entities(statements);
        self.evaluator
            .execute(&source, scope)
            .map_err(|e| RenderError::expression(&source, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_markup::Element;

    #[test]
    fn test_directive_of_node() {
        assert_eq!(Directive::of(&Node::Element(Element::new("IF"))), Some(Directive::If));
        assert_eq!(Directive::of(&Node::Element(Element::new("repeat"))), Some(Directive::Repeat));
        assert_eq!(Directive::of(&Node::Element(Element::new("div"))), None);
        assert_eq!(Directive::of(&Node::text("if")), None);
    }
}
