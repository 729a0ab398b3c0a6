use super::Renderer;
use crate::assets::path::split_suffix;
use crate::assets::{AssetKind, AssetResolver};
use crate::error::RenderError;
use std::path::Path;
use trellis_markup::{Element, Node, decode_entities, try_for_each_element_mut};

/// `type` values of `<script>` blocks whose body is JavaScript.
fn is_javascript(script: &Element) -> bool {
    match script.attribute("type").map(|t| t.trim().to_ascii_lowercase()) {
        None => true,
        Some(t) => t.is_empty() || t == "module" || t.ends_with("javascript") || t.ends_with("ecmascript"),
    }
}

fn is_stylesheet_link(link: &Element) -> bool {
    link.attribute("rel")
        .is_some_and(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("stylesheet")))
}

/// Points `attribute` at the servable path of the file it references.
/// Remote references are left as written.
fn rewrite_attribute(
    assets: &mut AssetResolver<'_>,
    el: &mut Element,
    attribute: &str,
    kind: AssetKind,
    base_dir: &Path,
) -> Result<(), RenderError> {
    let Some(raw) = el.attribute(attribute) else {
        return Ok(());
    };
    let (target, suffix) = split_suffix(raw);
    let target = decode_entities(target).trim().to_string();
    if target.is_empty() {
        return Ok(());
    }
    let Some(reference) = assets.resolve(kind, base_dir, &target)?.reference() else {
        return Ok(());
    };
    let rewritten = format!("{}{}", reference, suffix);
    if rewritten != raw {
        log::debug!("<{} {}> {} -> {}", el.name, attribute, raw, rewritten);
        el.set_attribute(attribute, rewritten);
    }
    Ok(())
}

impl Renderer<'_> {
    /// `script[src]` and inline JavaScript blocks.
    pub(crate) fn rewrite_script_tags(&mut self, base_dir: &Path, nodes: &mut [Node]) -> Result<(), RenderError> {
        let mut assets = self.assets();
        try_for_each_element_mut(nodes, &mut |el: &mut Element| {
            if !el.is("script") {
                return Ok(());
            }
            if el.has_attribute("src") {
                return rewrite_attribute(&mut assets, el, "src", AssetKind::Script, base_dir);
            }
            if is_javascript(el) {
                let body = el.text();
                if !body.trim().is_empty() {
                    let rewritten = assets.resolve_inline_script(base_dir, &body)?;
                    el.set_text(&*rewritten);
                }
            }
            Ok(())
        })
    }

    /// `link[rel=stylesheet]` and inline `style` blocks.
    pub(crate) fn rewrite_style_tags(&mut self, base_dir: &Path, nodes: &mut [Node]) -> Result<(), RenderError> {
        let mut assets = self.assets();
        try_for_each_element_mut(nodes, &mut |el: &mut Element| {
            if el.is("link") && is_stylesheet_link(el) {
                return rewrite_attribute(&mut assets, el, "href", AssetKind::Style, base_dir);
            }
            if el.is("style") {
                let body = el.text();
                if !body.trim().is_empty() {
                    let rewritten = assets.resolve_inline_style(base_dir, &body)?;
                    el.set_text(&*rewritten);
                }
            }
            Ok(())
        })
    }

    /// `img[src]` and every other `link[href]` (icons, preloads, manifests).
    pub(crate) fn rewrite_resource_tags(&mut self, base_dir: &Path, nodes: &mut [Node]) -> Result<(), RenderError> {
        let mut assets = self.assets();
        try_for_each_element_mut(nodes, &mut |el: &mut Element| {
            if el.is("img") {
                return rewrite_attribute(&mut assets, el, "src", AssetKind::Resource, base_dir);
            }
            if el.is("link") && !is_stylesheet_link(el) {
                return rewrite_attribute(&mut assets, el, "href", AssetKind::Resource, base_dir);
            }
            Ok(())
        })
    }
}
